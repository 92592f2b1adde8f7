use crate::audio::{Clip, SPEECH_SPEC, write_pcm_wav};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::lang::{Language, Speaker, Style};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

static SPEAKER_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]+:\s*").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static LATIN_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]+").unwrap());
static STRAY_SYMBOLS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[#"'※＊*~`]"#).unwrap());
static TRAILING_MARKS_JA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[！!？?]+$").unwrap());
static TRAILING_MARKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[!?.]+$").unwrap());

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speaks one script line into a WAV clip at `out`.
    async fn synthesize(
        &self,
        lang: Language,
        speaker: Speaker,
        text: &str,
        style: Style,
        out: &Path,
    ) -> Result<Clip>;
}

/// Removes the speaker label and anything the voice would misread.
pub fn clean_for_tts(text: &str, lang: Language) -> String {
    let t = SPEAKER_LABEL.replace(text, "");
    let mut t = WHITESPACE.replace_all(&t, " ").trim().to_string();

    if lang.strips_latin_for_speech() {
        t = LATIN_WORD.replace_all(&t, "").into_owned();
        t = STRAY_SYMBOLS.replace_all(&t, "").into_owned();
        t = WHITESPACE.replace_all(&t, " ").trim().to_string();
    }

    if t.is_empty() { "。".to_string() } else { t }
}

/// Nudges intonation through punctuation only.
pub fn apply_style(text: &str, lang: Language, style: Style) -> String {
    let mut s = text.trim().to_string();
    let full_width = lang.full_width_punctuation();

    match style {
        Style::Energetic => {
            if full_width {
                s = s.replace('。', "！");
                if !s.ends_with(['！', '？']) {
                    s.push('！');
                }
            } else if !s.ends_with(['!', '?']) {
                s.push('!');
            }
        }
        Style::Calm => {
            if full_width {
                s = s.replace(['！', '!'], "。");
                if !s.ends_with('。') {
                    s.push('。');
                }
            } else {
                s = s.replace('!', ".");
                if !s.ends_with('.') {
                    s.push('.');
                }
            }
        }
        Style::Serious => {
            if full_width {
                s = TRAILING_MARKS_JA.replace(&s, "").into_owned();
                if !s.ends_with('。') {
                    s.push('。');
                }
            } else {
                s = TRAILING_MARKS.replace(&s, ".").into_owned();
                if !s.ends_with('.') {
                    s.push('.');
                }
            }
        }
        Style::Neutral => {}
    }
    s
}

/// Narration borrows the first speaker's voice.
pub fn voice_for<'a>(config: &'a Config, lang: Language, speaker: Speaker) -> &'a str {
    let (first, second) = config.voices_for(lang);
    match speaker {
        Speaker::Alice | Speaker::Narrator => first,
        Speaker::Bob => second,
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'static str,
}

pub struct OpenAiSpeech<'a> {
    client: reqwest::Client,
    config: &'a Config,
}

impl<'a> OpenAiSpeech<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech<'_> {
    async fn synthesize(
        &self,
        lang: Language,
        speaker: Speaker,
        text: &str,
        style: Style,
        out: &Path,
    ) -> Result<Clip> {
        let api_key = self
            .config
            .openai_api_key
            .as_deref()
            .ok_or_else(|| PipelineError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let input = apply_style(&clean_for_tts(text, lang), lang, style);
        let voice = voice_for(self.config, lang, speaker);
        debug!("TTS [{}/{}/{:?}] {}", lang, voice, style, input);

        let request = SpeechRequest {
            model: &self.config.tts_model,
            voice,
            input: &input,
            response_format: "pcm",
        };
        let res = self
            .client
            .post(SPEECH_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(PipelineError::Api {
                service: "speech".to_string(),
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let pcm = res.bytes().await?;
        let clip = write_pcm_wav(out, &pcm, SPEECH_SPEC)?;
        info!("Synthesized {} ({} ms)", out.display(), clip.duration_ms);
        Ok(clip)
    }
}
