//! Subtitle translation with a script guard against mixed-language output.

use crate::lang::Language;
use crate::llm::{ChatMessage, LanguageModel};
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const MAX_RETRY: usize = 3;
const BACKOFF: Duration = Duration::from_millis(1500);

const BASE_RULES: &str = "Translate completely into the target language. \
    Do not keep any source-language words unless they are proper nouns. \
    Keep tone natural and suitable for short subtitles. \
    Return ONLY the translation text.";

pub struct Translator<'a> {
    llm: &'a dyn LanguageModel,
    backoff: Duration,
}

impl<'a> Translator<'a> {
    pub fn new(llm: &'a dyn LanguageModel) -> Self {
        Self {
            llm,
            backoff: BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Never fails: exhausted retries yield an "[XX unavailable]" marker.
    pub async fn translate(&self, text: &str, target: Language, source: Option<Language>) -> String {
        let txt = text.trim();
        if txt.is_empty() {
            return String::new();
        }
        if target.looks_like(txt) {
            return clean_line(txt);
        }

        let mut last_err = String::new();
        for strict in [false, true] {
            for attempt in 1..=MAX_RETRY {
                let messages = vec![
                    ChatMessage::system(system_prompt(target, source, strict)),
                    ChatMessage::user(txt),
                ];
                match self.llm.chat(messages, 0.2).await {
                    Ok(reply) => {
                        let out = clean_line(&reply);
                        if out.is_empty() {
                            last_err = "empty response".to_string();
                        } else if target.guard_ok(&out) {
                            return out;
                        } else {
                            debug!("Language guard rejected ({}): {:.40}", target, out);
                            last_err = format!("language guard failed (-> {}): {:.40}", target, out);
                        }
                    }
                    Err(e) => last_err = e.to_string(),
                }
                if attempt < MAX_RETRY && !self.backoff.is_zero() {
                    let jitter = rand::thread_rng().gen_range(0..1000);
                    sleep(self.backoff + Duration::from_millis(jitter)).await;
                }
            }
        }

        warn!("Translate error ({:.40} -> {}): {}", txt, target, last_err);
        format!("[{} unavailable]", target.code().to_uppercase())
    }
}

fn system_prompt(target: Language, source: Option<Language>, strict: bool) -> String {
    let source_name = source.map_or("Auto", Language::name);
    let mut prompt = format!(
        "You are a professional translator.\nSource language: {}\nTarget language: {}.\n{}",
        source_name,
        target.name(),
        BASE_RULES
    );
    if strict {
        prompt.push_str(
            " This is STRICT mode: output must be 100% in the target language, \
             no words from the source language.",
        );
    }
    prompt
}

fn clean_line(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    fn translator(model: &ScriptedModel) -> Translator<'_> {
        Translator::new(model).with_backoff(Duration::ZERO)
    }

    #[tokio::test]
    async fn empty_text_stays_empty() {
        let model = ScriptedModel::new();
        assert_eq!(translator(&model).translate("  ", Language::Ja, None).await, "");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn text_already_in_target_skips_the_model() {
        let model = ScriptedModel::new();
        let out = translator(&model)
            .translate("Nice  to\nmeet you", Language::En, None)
            .await;
        assert_eq!(out, "Nice to meet you");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn retries_until_the_guard_passes() {
        let model = ScriptedModel::new()
            .reply("それ bagus.")
            .fail()
            .reply("Itu bagus.");
        let out = translator(&model)
            .translate("それはいいね", Language::Id, Some(Language::Ja))
            .await;
        assert_eq!(out, "Itu bagus.");
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn switches_to_strict_mode_after_normal_attempts() {
        let model = ScriptedModel::new()
            .reply("")
            .reply("")
            .reply("")
            .reply("좋아요");
        let out = translator(&model).translate("Good", Language::Ko, None).await;
        assert_eq!(out, "좋아요");
        let prompts = model.prompts.lock().unwrap();
        assert!(!prompts[2].contains("STRICT"));
        assert!(prompts[3].contains("STRICT"));
    }

    #[tokio::test]
    async fn exhaustion_returns_marker() {
        let model = ScriptedModel::new();
        let out = translator(&model).translate("Hello", Language::Pt, None).await;
        assert_eq!(out, "[PT unavailable]");
        assert_eq!(model.calls(), 6);
    }

    #[test]
    fn prompt_names_both_languages() {
        let prompt = system_prompt(Language::Ja, Some(Language::En), false);
        assert!(prompt.contains("Source language: English"));
        assert!(prompt.contains("Target language: Japanese."));
        assert!(system_prompt(Language::Ja, None, true).contains("Source language: Auto"));
    }
}
