//! Video title, description and tags.

use crate::lang::Language;
use crate::llm::LanguageModel;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+\s*[.)]|[-•・])\s*").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\u{3000}]+").unwrap());
static SCENE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+|チェックイン|注文|予約|空港|ホテル|レストラン|面接|受付|道案内|支払い").unwrap()
});
static LEARNING_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(で使える|でよく使う|便利|自然な|丁寧な|言い換え|言い方|フレーズ|例文|テンプレ|コツ|3選|5選|NG|OK|Pro)")
        .unwrap()
});

const TOP_KEYWORDS: [&str; 9] = [
    "ホテル", "空港", "レストラン", "自己紹介", "予約", "面接", "受付", "支払い", "道案内",
];

const LEARN_KEYWORDS: [&str; 31] = [
    "フレーズ", "表現", "例文", "言い方", "言い換え", "丁寧", "自然", "敬語", "発音", "リスニング",
    "スピーキング", "語彙", "単語", "文法", "練習", "実践", "基礎", "初心者", "上達", "コツ", "攻略",
    "頻出", "定番", "使える", "よく使う", "テンプレ", "3選", "5選", "NG", "OK", "Pro",
];

const TITLE_MAX: usize = 100;
const JA_TITLE_MAX: usize = 28;
const TITLE_MAX_OTHER: usize = 55;
const MAX_TAGS: usize = 15;

/// Strips list markers and collapses whitespace; never returns empty.
pub fn sanitize_title(raw: &str) -> String {
    sanitize_with_fallback(raw, "Auto Video")
}

pub(crate) fn sanitize_with_fallback(raw: &str, fallback: &str) -> String {
    let t = LIST_MARKER.replace(raw, "");
    let t = SPACES.replace_all(&t, " ").trim().to_string();
    if t.is_empty() {
        fallback.to_string()
    } else if t.chars().count() > TITLE_MAX {
        let mut cut: String = t.chars().take(TITLE_MAX - 3).collect();
        cut.push('…');
        cut
    } else {
        t
    }
}

/// Higher is better: scene keywords, learning vocabulary and brevity.
pub fn score_title(t: &str) -> i32 {
    let mut score = 0;
    if TOP_KEYWORDS.iter().any(|k| t.starts_with(k)) {
        score += 20;
    }
    if SCENE_WORD.is_match(t) {
        score += 15;
    }
    if LEARN_KEYWORDS.iter().any(|k| t.contains(k)) {
        score += 25;
    }
    if LEARNING_PHRASE.is_match(t) {
        score += 15;
    }
    let len = t.chars().count() as i32;
    score + (15 - (len - JA_TITLE_MAX as i32).max(0)).max(0)
}

fn title_prompt(topic: &str, lang: Language) -> String {
    if lang == Language::Ja {
        format!(
            "You are a YouTube copywriter.\n\
             Generate 5 concise Japanese titles (each at most 28 JP chars) for a short educational video.\n\
             Start with a strong scenario keyword and include a clear benefit.\n\
             Scenario/topic: {}\nReturn 5 lines only.",
            topic
        )
    } else {
        format!(
            "You are a YouTube copywriter.\n\
             Generate 5 concise {} titles (at most 55 chars) for a short educational video.\n\
             Topic: {}\nEach should be clear, emotional, and benefit-driven.\nReturn 5 lines only.",
            lang.name(),
            topic
        )
    }
}

/// Picks the best of the model's candidates for `title_lang`.
pub fn choose_title(raw: &str, topic: &str, title_lang: Language, audio_lang: Language) -> Option<String> {
    let candidates: Vec<String> = raw
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(sanitize_title)
        .collect();

    if title_lang != Language::Ja {
        return candidates
            .into_iter()
            .rev()
            .max_by_key(|c| c.chars().count())
            .map(|c| c.chars().take(TITLE_MAX_OTHER).collect());
    }

    let label = audio_lang.conversation_label_ja();
    candidates
        .into_iter()
        .map(|mut t| {
            if !TOP_KEYWORDS.iter().any(|k| t.starts_with(k)) {
                t = format!("{} {}", topic, t);
            }
            if let Some(label) = label.filter(|l| !t.contains(l)) {
                t = format!("{} {}", label, t);
            }
            t
        })
        // max_by_key keeps the last maximum; reverse so ties go to the first.
        .rev()
        .max_by_key(|t| score_title(t))
        .map(|t| t.chars().take(JA_TITLE_MAX).collect())
}

pub async fn make_title(llm: &dyn LanguageModel, topic: &str, title_lang: Language, audio_lang: Language) -> String {
    match llm.complete(&title_prompt(topic, title_lang), 0.7).await {
        Ok(raw) => choose_title(&raw, topic, title_lang, audio_lang).unwrap_or_else(|| sanitize_title(topic)),
        Err(e) => {
            warn!("Title generation failed, using the topic: {}", e);
            sanitize_title(topic)
        }
    }
}

/// Summary line followed by two or three hashtags.
pub async fn make_description(llm: &dyn LanguageModel, topic: &str, lang: Language) -> String {
    let summary_prompt = format!(
        "Write one catchy summary (at most 90 chars) in {} for a YouTube Shorts about \"{}\". \
         End with a simple call-to-action.",
        lang.name(),
        topic
    );
    let summary = match llm.complete(&summary_prompt, 0.5).await {
        Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
        Ok(_) => return topic.to_string(),
        Err(e) => {
            warn!("Description generation failed, using the topic: {}", e);
            return topic.to_string();
        }
    };

    let hashtag_prompt = format!(
        "List 2 or 3 short hashtags in {} related to conversation or learning.",
        lang.name()
    );
    match llm.complete(&hashtag_prompt, 0.3).await {
        Ok(tags) => {
            let tags = tags.split_whitespace().collect::<Vec<_>>().join(" ");
            if tags.is_empty() { summary } else { format!("{} {}", summary, tags) }
        }
        Err(e) => {
            warn!("Hashtag generation failed: {}", e);
            summary
        }
    }
}

pub fn make_tags(topic: &str, subs: &[Language]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let fixed = [
        "conversation",
        "speaking practice",
        "listening practice",
        "language learning",
        "subtitles",
    ];
    let candidates = std::iter::once(topic.trim().to_string())
        .chain(fixed.iter().map(|s| s.to_string()))
        .chain(subs.iter().map(|l| format!("{} subtitles", l.name())));
    for tag in candidates {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags.truncate(MAX_TAGS);
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    #[test]
    fn sanitizes_markers_and_length() {
        assert_eq!(sanitize_title("1. Hotel   check-in"), "Hotel check-in");
        assert_eq!(sanitize_title("・ホテル\u{3000}会話"), "ホテル 会話");
        assert_eq!(sanitize_title("   "), "Auto Video");
        let long = sanitize_title(&"a".repeat(120));
        assert_eq!(long.chars().count(), 98);
        assert!(long.ends_with('…'));
    }

    #[test]
    fn scores_learning_titles_higher() {
        assert_eq!(score_title("ホテルで使える丁寧フレーズ3選"), 90);
        assert_eq!(score_title("今日の話"), 15);
        assert!(score_title(&"長".repeat(40)) < score_title("長い"));
    }

    #[test]
    fn japanese_titles_get_topic_and_label() {
        let raw = "1. 今日のひとこと\n2. ホテルで使えるフレーズ3選\n";
        let title = choose_title(raw, "予約", Language::Ja, Language::En).unwrap();
        assert_eq!(title, "英会話 ホテルで使えるフレーズ3選");
    }

    #[test]
    fn other_languages_take_the_longest() {
        let raw = "Short one\nA much longer and more detailed title\n";
        let title = choose_title(raw, "x", Language::En, Language::En).unwrap();
        assert_eq!(title, "A much longer and more detailed title");
        assert_eq!(choose_title("\n\n", "x", Language::En, Language::En), None);
    }

    #[test]
    fn tags_are_unique_and_capped() {
        let tags = make_tags("conversation", &[Language::En, Language::Ja, Language::En]);
        assert_eq!(tags[0], "conversation");
        assert_eq!(tags.iter().filter(|t| *t == "conversation").count(), 1);
        assert_eq!(tags.last().unwrap(), "Japanese subtitles");
        assert_eq!(tags.len(), 7);
        assert!(make_tags("t", &Language::ALL).len() <= MAX_TAGS);
    }

    #[tokio::test]
    async fn title_falls_back_to_topic() {
        let model = ScriptedModel::new().fail();
        assert_eq!(make_title(&model, " hotel  talk ", Language::En, Language::En).await, "hotel talk");
    }

    #[tokio::test]
    async fn description_joins_summary_and_hashtags() {
        let model = ScriptedModel::new().reply("Learn check-in phrases!").reply("#English\n#Travel");
        let desc = make_description(&model, "hotel", Language::En).await;
        assert_eq!(desc, "Learn check-in phrases! #English #Travel");
    }
}
