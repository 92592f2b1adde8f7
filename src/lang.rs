//! Language, speaker and delivery-style tables.
//!
//! Every language-specific rule in the pipeline is looked up here instead of
//! comparing language codes at the call site.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ja,
    Ko,
    Es,
    Pt,
    Id,
    Fr,
    De,
    It,
    Zh,
    Ar,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::En,
        Language::Ja,
        Language::Ko,
        Language::Es,
        Language::Pt,
        Language::Id,
        Language::Fr,
        Language::De,
        Language::It,
        Language::Zh,
        Language::Ar,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Es => "es",
            Language::Pt => "pt",
            Language::Id => "id",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Zh => "zh",
            Language::Ar => "ar",
        }
    }

    /// English name, used inside prompts and tags.
    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ja => "Japanese",
            Language::Ko => "Korean",
            Language::Es => "Spanish",
            Language::Pt => "Portuguese",
            Language::Id => "Indonesian",
            Language::Fr => "French",
            Language::De => "German",
            Language::It => "Italian",
            Language::Zh => "Chinese",
            Language::Ar => "Arabic",
        }
    }

    /// Short acknowledgement spoken when a generated line is missing.
    pub fn filler_line(self) -> &'static str {
        match self {
            Language::Ja => "はい。",
            Language::Ko => "네.",
            Language::Es => "Vale.",
            Language::Pt => "Certo.",
            Language::Id => "Oke.",
            _ => "Okay.",
        }
    }

    /// Label prepended to Japanese titles, e.g. "英会話" for English audio.
    pub fn conversation_label_ja(self) -> Option<&'static str> {
        match self {
            Language::En => Some("英会話"),
            Language::Ja => Some("日本語会話"),
            Language::Es => Some("スペイン語会話"),
            Language::Pt => Some("ポルトガル語会話"),
            Language::Ko => Some("韓国語会話"),
            Language::Id => Some("インドネシア語会話"),
            _ => None,
        }
    }

    /// Latin words are read out letter by letter by Japanese voices.
    pub fn strips_latin_for_speech(self) -> bool {
        matches!(self, Language::Ja)
    }

    /// Lines without a terminator make the voice trail off.
    pub fn requires_terminator(self) -> bool {
        matches!(self, Language::Ja)
    }

    /// Full-width sentence punctuation (。！？) instead of ASCII.
    pub fn full_width_punctuation(self) -> bool {
        matches!(self, Language::Ja)
    }

    /// Extra prompt constraint that keeps a script monolingual.
    pub fn script_rules(self) -> String {
        match self {
            Language::Ja => "This is a Japanese listening script. Use natural Japanese only. \
                 Avoid English words and romaji (Latin letters) except for proper nouns or codes \
                 (e.g., JAL, ANA, QRコード). Do not translate or explain such proper nouns; keep them as-is. \
                 Ignore any implication that English should appear even if the topic contains '英語'."
                .to_string(),
            other => format!(
                "Stay entirely in {}. Avoid mixing other languages.",
                other.name()
            ),
        }
    }

    /// Cheap check that `text` is already written in this language.
    pub fn looks_like(self, text: &str) -> bool {
        match self {
            Language::En => {
                let total = text.chars().count();
                let letters = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
                letters > 0 && letters >= (total as f64 * 0.3) as usize
            }
            Language::Ja => text.chars().any(is_cjk),
            Language::Ko => text.chars().any(is_hangul),
            _ => false,
        }
    }

    /// Accepts a translation only if it is plausibly in this language.
    pub fn guard_ok(self, text: &str) -> bool {
        match self {
            Language::Ja => {
                if !text.chars().any(is_cjk) {
                    return false;
                }
                let latin = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
                let limit = 3.max((text.chars().count() as f64 * 0.15) as usize);
                latin <= limit
            }
            Language::Ko => text.chars().any(is_hangul),
            Language::Zh => text.chars().any(is_cjk),
            _ => !text.chars().any(|c| is_cjk(c) || is_hangul(c)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.code() == code)
            .ok_or_else(|| format!("unsupported language code '{}'", s))
    }
}

/// Kana or CJK unified ideographs.
pub fn is_cjk(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{30ff}' | '\u{4e00}'..='\u{9fff}')
}

pub fn is_hangul(c: char) -> bool {
    matches!(c, '\u{ac00}'..='\u{d7af}')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    Alice,
    Bob,
    Narrator,
}

impl Speaker {
    pub fn label(self) -> &'static str {
        match self {
            Speaker::Alice => "Alice",
            Speaker::Bob => "Bob",
            Speaker::Narrator => "N",
        }
    }

    /// Alternating two-person cast: even lines Alice, odd lines Bob.
    pub fn for_turn(index: usize) -> Self {
        if index % 2 == 0 {
            Speaker::Alice
        } else {
            Speaker::Bob
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "alice" => Some(Speaker::Alice),
            "bob" => Some(Speaker::Bob),
            "n" => Some(Speaker::Narrator),
            _ => None,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Energetic,
    Calm,
    Serious,
    Neutral,
}
