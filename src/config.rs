//! Process-wide settings, built once in `main` and passed by reference.

use crate::error::{PipelineError, Result};
use crate::lang::Language;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Longest video accepted as a Short.
pub const MAX_SHORTS_SEC: f64 = 59.0;
/// Silence between consecutive lines.
pub const LINE_GAP_MS: u64 = 120;
/// Portrait output resolution.
pub const FRAME_W: u32 = 1080;
pub const FRAME_H: u32 = 1920;

const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TTS_MODEL: &str = "tts-1";
const FALLBACK_VOICES: (&str, &str) = ("alloy", "echo");

/// One independent run: speech language, subtitle rows and target account.
#[derive(Debug, Clone, Deserialize)]
pub struct Combo {
    pub audio: Language,
    pub subs: Vec<Language>,
    #[serde(default = "default_account")]
    pub account: String,
    #[serde(default)]
    pub title_lang: Option<Language>,
}

fn default_account() -> String {
    "default".to_string()
}

impl Combo {
    /// Explicit title language, else the second subtitle row, else the audio.
    pub fn title_language(&self) -> Language {
        self.title_lang
            .unwrap_or_else(|| self.subs.get(1).copied().unwrap_or(self.audio))
    }

    pub fn thumbnail_language(&self) -> Language {
        self.subs.get(1).copied().unwrap_or(self.audio)
    }
}

#[derive(Debug, Deserialize)]
struct CombosFile {
    combos: Vec<Combo>,
    #[serde(default)]
    voices: HashMap<Language, [String; 2]>,
}

#[derive(Debug, Clone)]
pub struct VocabSettings {
    pub words: usize,
    pub theme: String,
    /// Replace the second line of each word block with silence.
    pub silent_second: bool,
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub temp: PathBuf,
    pub output: PathBuf,
    pub tokens: PathBuf,
    pub fonts: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub combos: Vec<Combo>,
    voices: HashMap<Language, (String, String)>,
    pub openai_api_key: Option<String>,
    pub unsplash_access_key: Option<String>,
    pub chat_model: String,
    pub tts_model: String,
    pub vocab: VocabSettings,
    pub paths: Paths,
    pub max_shorts_sec: f64,
    pub gap_ms: u64,
}

impl Config {
    pub fn load(combos_path: &Path, paths: Paths) -> Result<Self> {
        let yaml = fs::read_to_string(combos_path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {}", combos_path.display(), e))
        })?;
        Self::from_yaml(&yaml, |key| std::env::var(key).ok(), paths)
    }

    /// Builds the config from YAML text and an environment lookup.
    pub fn from_yaml(
        yaml: &str,
        env: impl Fn(&str) -> Option<String>,
        paths: Paths,
    ) -> Result<Self> {
        let file: CombosFile = serde_yaml::from_str(yaml)?;
        if file.combos.is_empty() {
            return Err(PipelineError::Config("no combos defined".to_string()));
        }
        if let Some(combo) = file.combos.iter().find(|c| c.subs.is_empty()) {
            return Err(PipelineError::Config(format!(
                "combo for audio '{}' has no subtitle languages",
                combo.audio
            )));
        }

        let mut voices = default_voices();
        for (lang, [first, second]) in file.voices {
            voices.insert(lang, (first, second));
        }

        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let words = match non_empty("VOCAB_WORDS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                PipelineError::Config(format!("VOCAB_WORDS must be a number, got '{}'", raw))
            })?,
            None => 5,
        };

        Ok(Config {
            combos: file.combos,
            voices,
            openai_api_key: non_empty("OPENAI_API_KEY"),
            unsplash_access_key: non_empty("UNSPLASH_ACCESS_KEY"),
            chat_model: non_empty("OPENAI_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            tts_model: non_empty("OPENAI_TTS_MODEL")
                .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
            vocab: VocabSettings {
                words,
                theme: non_empty("VOCAB_THEME").unwrap_or_else(|| "hotel".to_string()),
                silent_second: non_empty("VOCAB_SILENT_SECOND").as_deref() == Some("1"),
            },
            paths,
            max_shorts_sec: MAX_SHORTS_SEC,
            gap_ms: LINE_GAP_MS,
        })
    }

    /// (first speaker / narrator voice, second speaker voice) for a language.
    pub fn voices_for(&self, lang: Language) -> (&str, &str) {
        self.voices
            .get(&lang)
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .unwrap_or(FALLBACK_VOICES)
    }

    pub fn budget_ms(&self) -> u64 {
        (self.max_shorts_sec * 1000.0) as u64
    }
}

fn default_voices() -> HashMap<Language, (String, String)> {
    [
        (Language::En, ("alloy", "echo")),
        (Language::Ja, ("nova", "onyx")),
        (Language::Ko, ("shimmer", "echo")),
        (Language::Es, ("nova", "onyx")),
        (Language::Pt, ("shimmer", "onyx")),
        (Language::Id, ("nova", "echo")),
    ]
    .into_iter()
    .map(|(lang, (a, b))| (lang, (a.to_string(), b.to_string())))
    .collect()
}

/// Single English combo rooted at `root`, no credentials.
#[cfg(test)]
pub fn test_config(root: &Path) -> Config {
    Config::from_yaml(
        "combos:\n  - audio: en\n    subs: [en, ja]\n",
        |_| None,
        Paths {
            temp: root.join("temp"),
            output: root.join("output"),
            tokens: root.join("tokens"),
            fonts: root.join("fonts"),
        },
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> Paths {
        Paths {
            temp: PathBuf::from("temp"),
            output: PathBuf::from("output"),
            tokens: PathBuf::from("tokens"),
            fonts: PathBuf::from("fonts"),
        }
    }

    const YAML: &str = r#"
combos:
  - audio: en
    subs: [en, ja]
    account: learner
  - audio: ja
    subs: [ja]
    title_lang: en
voices:
  en: [fable, onyx]
"#;

    #[test]
    fn parses_combos_with_defaults() {
        let config = Config::from_yaml(YAML, |_| None, paths()).unwrap();
        assert_eq!(config.combos.len(), 2);
        assert_eq!(config.combos[0].account, "learner");
        assert_eq!(config.combos[1].account, "default");
        assert_eq!(config.budget_ms(), 59_000);
        assert_eq!(config.gap_ms, 120);
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn title_language_falls_back_to_second_subtitle() {
        let config = Config::from_yaml(YAML, |_| None, paths()).unwrap();
        assert_eq!(config.combos[0].title_language(), Language::Ja);
        assert_eq!(config.combos[1].title_language(), Language::En);
        assert_eq!(config.combos[1].thumbnail_language(), Language::Ja);
    }

    #[test]
    fn yaml_voices_override_defaults() {
        let config = Config::from_yaml(YAML, |_| None, paths()).unwrap();
        assert_eq!(config.voices_for(Language::En), ("fable", "onyx"));
        assert_eq!(config.voices_for(Language::Ja), ("nova", "onyx"));
        assert_eq!(config.voices_for(Language::Ar), ("alloy", "echo"));
    }

    #[test]
    fn reads_environment() {
        let env = |key: &str| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "UNSPLASH_ACCESS_KEY" => Some("  ".to_string()),
            "VOCAB_WORDS" => Some("7".to_string()),
            "VOCAB_SILENT_SECOND" => Some("1".to_string()),
            _ => None,
        };
        let config = Config::from_yaml(YAML, env, paths()).unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert!(config.unsplash_access_key.is_none());
        assert_eq!(config.vocab.words, 7);
        assert_eq!(config.vocab.theme, "hotel");
        assert!(config.vocab.silent_second);
    }

    #[test]
    fn rejects_empty_combo_list_and_empty_subs() {
        assert!(Config::from_yaml("combos: []", |_| None, paths()).is_err());
        let yaml = "combos:\n  - audio: en\n    subs: []\n";
        assert!(matches!(
            Config::from_yaml(yaml, |_| None, paths()),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn rejects_bad_vocab_count() {
        let env = |key: &str| (key == "VOCAB_WORDS").then(|| "many".to_string());
        assert!(Config::from_yaml(YAML, env, paths()).is_err());
    }
}
