//! Content modes and the per-mode structure of a script.

use crate::lang::Style;
use clap::ValueEnum;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    Dialogue,
    Howto,
    Listicle,
    Wisdom,
    Fact,
    Qa,
    Vocab,
}

impl ContentMode {
    pub fn name(self) -> &'static str {
        match self {
            ContentMode::Dialogue => "dialogue",
            ContentMode::Howto => "howto",
            ContentMode::Listicle => "listicle",
            ContentMode::Wisdom => "wisdom",
            ContentMode::Fact => "fact",
            ContentMode::Qa => "qa",
            ContentMode::Vocab => "vocab",
        }
    }

    /// Alice/Bob exchange rather than a single narrator.
    pub fn is_two_speaker(self) -> bool {
        matches!(self, ContentMode::Dialogue | ContentMode::Qa)
    }

    /// Number of script lines requested for `turns` turns.
    pub fn line_count(self, turns: usize) -> usize {
        if self.is_two_speaker() {
            turns * 2
        } else {
            turns
        }
    }

    /// Delivery style of line `idx` in a script of `total` lines.
    pub fn style_for_line(self, idx: usize, total: usize) -> Style {
        if idx == 0 {
            return Style::Energetic;
        }
        if idx + 1 == total {
            return match self {
                ContentMode::Wisdom | ContentMode::Fact => Style::Calm,
                _ => Style::Serious,
            };
        }
        match self {
            ContentMode::Howto | ContentMode::Listicle | ContentMode::Qa if idx == 2 || idx == 3 => {
                Style::Serious
            }
            _ => Style::Neutral,
        }
    }

    /// Topics for these modes come from the offline learning-topic formula.
    pub fn uses_learning_topic(self) -> bool {
        matches!(
            self,
            ContentMode::Dialogue | ContentMode::Qa | ContentMode::Howto | ContentMode::Listicle
        )
    }

    /// Japanese guide sentence describing what a topic for this mode looks like.
    pub fn topic_guide(self) -> &'static str {
        match self {
            ContentMode::Howto => {
                "30秒で実践できるコツ（例: 伝わりやすく話す3ステップ、集中力を上げるコツ3つ）。"
            }
            ContentMode::Listicle => {
                "3ポイントで学べるテーマ（例: 心を掴むコツ3つ、印象が良くなる言い回し3選）。"
            }
            ContentMode::Wisdom => {
                "短い知恵・名言（例: 先延ばしを防ぐ一言、続けるための小さな仕組み）。"
            }
            ContentMode::Fact => {
                "文化やコミュニケーションの豆知識（例: 相づちの違い、言葉の由来など）。"
            }
            ContentMode::Qa => {
                "誤解されやすいQ&A（例: NG→OK→Proの言い換え、あるあるの勘違い）。"
            }
            ContentMode::Dialogue | ContentMode::Vocab => {
                "誰でも遭遇する生活/仕事シーン名（例: チェックイン会話、注文会話、道を尋ねるやりとり）。"
            }
        }
    }

    /// Shape of the script, spelled out for the language model.
    pub fn script_shape(self) -> &'static str {
        match self {
            ContentMode::Dialogue => "a short, natural conversation",
            ContentMode::Qa => {
                "a question-and-answer exchange where Alice asks about a common mistake and Bob corrects it"
            }
            ContentMode::Howto => "a practical how-to with concrete steps",
            ContentMode::Listicle => "a short list of three memorable points",
            ContentMode::Wisdom => "a short piece of practical wisdom",
            ContentMode::Fact => "a surprising but true fact explained simply",
            ContentMode::Vocab => "a vocabulary drill",
        }
    }
}
