//! Picks today's topic when the command line says `AUTO`.

use crate::llm::LanguageModel;
use crate::mode::ContentMode;
use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

static LEADING_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[\s"“”'\-•・]+"#).unwrap());
static TRAILING_NOISE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\s"“”']+$"#).unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const MAX_TOPIC_CHARS: usize = 24;

const SEED_TOPICS: [&str; 12] = [
    "ホテルでのチェックイン会話",
    "ホテルでの朝食案内",
    "ホテルでの部屋設備の説明",
    "ホテルでのチェックアウト会話",
    "空港でのチェックイン会話",
    "空港での保安検査のやりとり",
    "空港での搭乗口アナウンスの受け答え",
    "機内でのやりとり",
    "レストランでの入店と席案内",
    "レストランでの注文会話",
    "料理の説明を聞く会話",
    "レストランでの会計会話",
];

const SCENES: [&str; 15] = [
    "自己紹介",
    "面接",
    "予約",
    "受付",
    "支払い",
    "道案内",
    "電話対応",
    "オンライン会議",
    "確認のやりとり",
    "依頼のやりとり",
    "謝罪",
    "予定変更",
    "レストランの注文",
    "空港のチェックイン",
    "ホテルのチェックイン",
];

const TARGETS: [&str; 9] = [
    "丁寧フレーズ",
    "基本表現",
    "依頼の言い方",
    "断り方",
    "確認フレーズ",
    "相槌",
    "クッション言葉",
    "時間の聞き方",
    "理由の伝え方",
];

const ENDINGS: [&str; 5] = ["3選", "一言", "言い方", "基本", "厳選"];

/// The topic argument as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicArg {
    Auto,
    Explicit(String),
}

impl TopicArg {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("auto") {
            TopicArg::Auto
        } else {
            TopicArg::Explicit(raw.to_string())
        }
    }
}

/// Topics are always produced in Japanese; each combo translates them.
pub async fn pick(mode: ContentMode, llm: &dyn LanguageModel) -> String {
    if mode.uses_learning_topic() {
        let topic = learning_topic(&mut rand::thread_rng());
        info!("[AUTO TOPIC] {}", topic);
        return topic;
    }

    let today = chrono::Local::now().date_naive();
    let prompt = format!(
        "Today is {}. 日本語で、{} 句読点や引用符なしで自然な1行だけ返してください。",
        today,
        mode.topic_guide()
    );
    let topic = match llm.complete(&prompt, 0.8).await {
        Ok(raw) => {
            let line = clean_line(&raw);
            if line.is_empty() || line.chars().any(|c| c.is_ascii_alphabetic()) {
                warn!("Rejected generated topic '{}', using a seed topic", line);
                seed_topic(&mut rand::thread_rng())
            } else {
                line.chars().take(MAX_TOPIC_CHARS).collect()
            }
        }
        Err(e) => {
            warn!("Topic generation failed, using a seed topic: {}", e);
            seed_topic(&mut rand::thread_rng())
        }
    };
    info!("[AUTO TOPIC] {}", topic);
    topic
}

/// `<scene>で使える<target><ending>`, e.g. "面接で使える丁寧フレーズ3選".
pub fn learning_topic(rng: &mut impl Rng) -> String {
    let scene = SCENES.choose(rng).copied().unwrap_or(SCENES[0]);
    let target = TARGETS.choose(rng).copied().unwrap_or(TARGETS[0]);
    let ending = ENDINGS.choose(rng).copied().unwrap_or(ENDINGS[0]);
    format!("{}で使える{}{}", scene, target, ending)
        .chars()
        .take(MAX_TOPIC_CHARS)
        .collect()
}

fn seed_topic(rng: &mut impl Rng) -> String {
    SEED_TOPICS.choose(rng).copied().unwrap_or(SEED_TOPICS[0]).to_string()
}

/// First line only, without surrounding quotes or list markers.
fn clean_line(raw: &str) -> String {
    let first = raw.trim().lines().next().unwrap_or("");
    let t = LEADING_NOISE.replace(first, "");
    let t = TRAILING_NOISE.replace(&t, "");
    WHITESPACE.replace_all(&t, " ").trim().to_string()
}
