//! Script generation: dialogue, narration and vocabulary drills.

use crate::lang::{Language, Speaker};
use crate::llm::LanguageModel;
use crate::mode::ContentMode;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

static SCRIPT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\d+[\).\-\s]*)?(?:[-•*]\s*)?(alice|bob|narrator|n)\s*[:：]\s*(.*)$")
        .unwrap()
});
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static JA_TERMINATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[。！？!?]$").unwrap());
static LIST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+[\).]?\s*").unwrap());
static EDGE_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^["“”'\s]+|["“”'\s]+$"#).unwrap());

const FALLBACK_VOCAB: [&str; 7] = [
    "check-in",
    "reservation",
    "checkout",
    "receipt",
    "elevator",
    "lobby",
    "upgrade",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub speaker: Speaker,
    pub text: String,
}

impl ScriptLine {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

pub struct DialogueGenerator<'a> {
    llm: &'a dyn LanguageModel,
}

impl<'a> DialogueGenerator<'a> {
    pub fn new(llm: &'a dyn LanguageModel) -> Self {
        Self { llm }
    }

    /// One short attention hook; empty when the model is unavailable.
    pub async fn seed_phrase(&self, topic: &str, lang: Language) -> String {
        let prompt = format!(
            "Write ONE short hook in {} that grabs attention for a 30–45s short video about: {}. \
             Start with a question or a bold contrast. ≤10 words. No quotes.",
            lang.name(),
            topic
        );
        match self.llm.complete(&prompt, 0.7).await {
            Ok(hook) => hook.trim().to_string(),
            Err(e) => {
                warn!("Hook generation failed, continuing without one: {}", e);
                String::new()
            }
        }
    }

    /// Exactly `mode.line_count(turns)` lines, padded with filler if needed.
    pub async fn generate(
        &self,
        topic: &str,
        lang: Language,
        turns: usize,
        seed_phrase: &str,
        mode: ContentMode,
    ) -> Vec<ScriptLine> {
        let target = mode.line_count(turns);
        let prompt = build_prompt(topic, lang, target, seed_phrase, mode);

        let mut lines = match self.llm.complete(&prompt, 0.45).await {
            Ok(raw) => extract_lines(&raw, mode),
            Err(e) => {
                warn!("Script generation failed, using filler lines: {}", e);
                Vec::new()
            }
        };

        lines.truncate(target);
        if lines.len() < target {
            warn!("Script came back short ({}/{}), padding", lines.len(), target);
        }
        while lines.len() < target {
            let speaker = speaker_for(mode, lines.len());
            lines.push(ScriptLine::new(speaker, lang.filler_line()));
        }

        let lines: Vec<ScriptLine> = lines
            .into_iter()
            .map(|l| ScriptLine::new(l.speaker, sanitize_line(lang, &l.text)))
            .collect();
        info!("Generated {} script lines ({})", lines.len(), mode.name());
        lines
    }

    /// `n` words for a vocabulary drill about `theme`.
    pub async fn vocab_list(&self, theme: &str, lang: Language, n: usize) -> Vec<String> {
        let prompt = format!(
            "List {} essential single or hyphenated words for {} context in {}. \
             Return ONLY one word per line, no numbering.",
            n,
            theme,
            lang.name()
        );
        match self.llm.complete(&prompt, 0.5).await {
            Ok(raw) => {
                let mut words: Vec<String> = Vec::new();
                for line in raw.lines() {
                    let word = LIST_NUMBER.replace(line.trim(), "").trim().to_string();
                    if !word.is_empty() && !words.contains(&word) {
                        words.push(word);
                    }
                }
                if words.len() >= n {
                    words.truncate(n);
                    return words;
                }
                warn!("Vocabulary list too short ({}/{}), using defaults", words.len(), n);
            }
            Err(e) => warn!("Vocabulary generation failed, using defaults: {}", e),
        }
        FALLBACK_VOCAB.iter().take(n).map(|w| w.to_string()).collect()
    }

    pub async fn example_sentence(&self, word: &str, lang: Language) -> String {
        let prompt = format!(
            "Write one short, natural example sentence (<=12 words) in {} using the word: {}. \
             No translation, no quotes.",
            lang.name(),
            word
        );
        match self.llm.complete(&prompt, 0.6).await {
            Ok(raw) if !raw.trim().is_empty() => EDGE_QUOTES.replace_all(&raw, "").to_string(),
            Ok(_) | Err(_) => format!("Let's practice the word {} in a short sentence.", word),
        }
    }

    /// word, word (translated in the subtitles), example sentence; per word.
    pub async fn vocab_script(&self, words: &[String], lang: Language) -> Vec<ScriptLine> {
        let mut lines = Vec::with_capacity(words.len() * 3);
        for word in words {
            let example = self.example_sentence(word, lang).await;
            lines.push(ScriptLine::new(Speaker::Narrator, word.clone()));
            lines.push(ScriptLine::new(Speaker::Narrator, word.clone()));
            lines.push(ScriptLine::new(Speaker::Narrator, example));
        }
        lines
    }
}

/// Splits a user-supplied word list on commas and newlines.
pub fn split_vocab_topic(topic: &str) -> Vec<String> {
    topic
        .replace('\r', "\n")
        .split(['\n', ','])
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn speaker_for(mode: ContentMode, index: usize) -> Speaker {
    if mode.is_two_speaker() {
        Speaker::for_turn(index)
    } else {
        Speaker::Narrator
    }
}

fn build_prompt(
    topic: &str,
    lang: Language,
    target: usize,
    seed_phrase: &str,
    mode: ContentMode,
) -> String {
    let topic_hint = if lang == Language::Ja {
        format!("「{}」", topic)
    } else {
        topic.to_string()
    };
    let (cast, order, prefix) = if mode.is_two_speaker() {
        (
            "between Alice and Bob",
            "Alternate strictly: Alice, Bob, Alice, Bob...",
            "Each line begins with 'Alice:' or 'Bob:'",
        )
    } else {
        (
            "spoken by a single narrator N",
            "Every line is spoken by the narrator N.",
            "Each line begins with 'N:'",
        )
    };

    format!(
        "You are a native-level {lang} script writer.\n\
         Write {shape} in {lang} {cast}.\n\n\
         Scene topic: {topic_hint}\n\
         Tone reference (seed phrase): \"{seed_phrase}\" \
         (use only as mood/style hint; do not repeat it literally).\n\n\
         Rules:\n\
         1) {order}\n\
         2) Produce exactly {target} lines.\n\
         3) {prefix} and contains one short, natural sentence.\n\
         4) {rules}\n\
         5) No ellipses beyond a single one (…); no emojis; no bullet points; no stage directions.\n\
         6) Keep it friendly, realistic, and concise.\n\
         7) Make the final line subtly echo the main topic or hook to feel loopable.\n\
         8) Output ONLY the script lines (no explanations).\n",
        lang = lang.name(),
        shape = mode.script_shape(),
        rules = lang.script_rules(),
    )
}

/// Picks the labelled lines out of a model reply, ignoring numbering and chatter.
pub fn extract_lines(raw: &str, mode: ContentMode) -> Vec<ScriptLine> {
    raw.lines()
        .filter_map(|line| SCRIPT_LINE.captures(line.trim()))
        .filter_map(|caps| {
            let label = caps.get(1)?.as_str().to_ascii_lowercase();
            let text = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
            let speaker = match label.as_str() {
                "alice" => Speaker::Alice,
                "bob" => Speaker::Bob,
                _ => Speaker::Narrator,
            };
            let wanted = match speaker {
                Speaker::Narrator => !mode.is_two_speaker(),
                _ => mode.is_two_speaker(),
            };
            wanted.then(|| ScriptLine::new(speaker, text))
        })
        .collect()
}

/// Light normalisation that never removes meaning.
pub fn sanitize_line(lang: Language, text: &str) -> String {
    let t = text.trim();
    if t.is_empty() {
        return lang.filler_line().to_string();
    }
    let t = t.replace("...", "…");
    let mut t = WHITESPACE.replace_all(&t, " ").trim().to_string();
    if lang.requires_terminator() && !JA_TERMINATOR.is_match(&t) {
        t.push('。');
    }
    t
}
