//! Per-combo orchestration: script, voice, pack, master, render, publish.

use crate::audio::{Clip, SPEECH_SPEC, write_silence};
use crate::background;
use crate::config::{Combo, Config};
use crate::dialogue::{DialogueGenerator, ScriptLine, split_vocab_topic};
use crate::error::Result;
use crate::lang::Language;
use crate::llm::LanguageModel;
use crate::manifest;
use crate::mastering;
use crate::metadata;
use crate::mode::ContentMode;
use crate::render::{self, RenderJob};
use crate::thumbnail;
use crate::timeline;
use crate::topic::{self, TopicArg};
use crate::translate::Translator;
use crate::tts::SpeechSynthesizer;
use crate::upload::{Privacy, UploadRequest, YouTubeUploader};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Placeholder spoken in vocab mode when the topic is `AUTO`.
pub const AUTO_TOPIC: &str = "AUTO";
const VOCAB_SILENCE_MS: u64 = 900;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: ContentMode,
    pub turns: usize,
    pub privacy: Privacy,
    pub lines_only: bool,
    pub upload: bool,
    pub chunk: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    LinesOnly { manifest: PathBuf },
    Rendered { video: PathBuf },
    Uploaded { video: PathBuf, url: String },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Voiced script lines with one subtitle per configured language.
struct Voiced {
    script: Vec<ScriptLine>,
    clips: Vec<Clip>,
    subtitles: Vec<Vec<String>>,
}

pub struct Pipeline<'a> {
    config: &'a Config,
    llm: &'a dyn LanguageModel,
    tts: &'a dyn SpeechSynthesizer,
    translator: Translator<'a>,
    options: RunOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        llm: &'a dyn LanguageModel,
        tts: &'a dyn SpeechSynthesizer,
        options: RunOptions,
    ) -> Self {
        Self {
            config,
            llm,
            tts,
            translator: Translator::new(llm),
            options,
        }
    }

    pub fn with_translation_backoff(mut self, backoff: Duration) -> Self {
        self.translator = self.translator.with_backoff(backoff);
        self
    }

    /// `AUTO` picks a topic, except in vocab mode where it means "generate words".
    pub async fn resolve_topic(&self, arg: &TopicArg) -> String {
        match arg {
            TopicArg::Explicit(topic) => topic.clone(),
            TopicArg::Auto if self.options.mode == ContentMode::Vocab => AUTO_TOPIC.to_string(),
            TopicArg::Auto => topic::pick(self.options.mode, self.llm).await,
        }
    }

    /// Runs every combo in order; a failed combo does not stop the rest.
    pub async fn run_all(&self, topic: &str) -> Summary {
        let mut summary = Summary::default();
        for combo in &self.config.combos {
            info!(
                "=== Combo: {}, subs={:?}, account={}, title_lang={}, mode={} ===",
                combo.audio,
                combo.subs.iter().map(|l| l.code()).collect::<Vec<_>>(),
                combo.account,
                combo.title_language(),
                self.options.mode.name()
            );
            match self.run_one(topic, combo).await {
                Ok(outcome) => {
                    info!("Combo {} finished: {:?}", combo.audio, outcome);
                    summary.succeeded += 1;
                }
                Err(e) => {
                    error!("Combo {} failed: {}", combo.audio, e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    pub async fn run_one(&self, topic: &str, combo: &Combo) -> Result<Outcome> {
        let temp = &self.config.paths.temp;
        reset_dir(temp)?;

        let script = self.build_script(topic, combo.audio).await;
        let voiced = self.voice(script, combo, temp).await?;

        let full_raw = temp.join("full_raw.wav");
        let durations = timeline::concat_trim_to(
            &voiced.clips,
            self.config.gap_ms,
            self.config.budget_ms(),
            &full_raw,
        )?;
        let full = temp.join("full.mp3");
        mastering::enhance(&full_raw, &full)?;

        let query = match voiced.script.first() {
            Some(first) if self.options.mode == ContentMode::Vocab => first.text.as_str(),
            _ => topic,
        };
        let bg = background::fetch(self.config, query, temp).await?;
        info!("Background: {} (fallback={})", bg.path.display(), bg.fallback);

        let rows = manifest::build(&voiced.script, &voiced.subtitles, &durations);
        let manifest_path = temp.join("lines.json");
        manifest::write(&manifest_path, &rows)?;
        if self.options.lines_only {
            return Ok(Outcome::LinesOnly {
                manifest: manifest_path,
            });
        }

        let thumb = thumbnail::make(
            self.llm,
            &self.translator,
            topic,
            combo.thumbnail_language(),
            &bg.path,
            &self.config.paths.fonts,
            &temp.join("thumbnail.jpg"),
        )
        .await;

        let video = self.config.paths.output.join(output_name(combo, chrono::Local::now()));
        render::render(&RenderJob {
            manifest: &manifest_path,
            rows: combo.subs.len(),
            audio: &full,
            background: &bg.path,
            fonts_dir: &self.config.paths.fonts,
            work_dir: &temp.join("chunks"),
            out: &video,
            chunk: self.options.chunk,
        })?;
        if !self.options.upload {
            return Ok(Outcome::Rendered { video });
        }

        let title_lang = combo.title_language();
        let title = metadata::make_title(self.llm, topic, title_lang, combo.audio).await;
        let description = metadata::make_description(self.llm, topic, title_lang).await;
        let tags = metadata::make_tags(topic, &combo.subs);
        let uploader = YouTubeUploader::new(&self.config.paths.tokens)?;
        let url = uploader
            .publish(&UploadRequest {
                video: &video,
                title: &title,
                description: &description,
                tags: &tags,
                privacy: self.options.privacy,
                account: &combo.account,
                thumbnail: thumb.as_deref(),
                default_language: combo.audio,
            })
            .await?;
        Ok(Outcome::Uploaded { video, url })
    }

    async fn build_script(&self, topic: &str, audio: Language) -> Vec<ScriptLine> {
        let generator = DialogueGenerator::new(self.llm);
        let script = if self.options.mode == ContentMode::Vocab {
            let words = if topic.trim().eq_ignore_ascii_case(AUTO_TOPIC) {
                let vocab = &self.config.vocab;
                let theme = if audio == Language::En {
                    vocab.theme.clone()
                } else {
                    self.translator.translate(&vocab.theme, audio, Some(Language::En)).await
                };
                generator.vocab_list(&theme, audio, vocab.words).await
            } else {
                split_vocab_topic(topic)
            };
            generator.vocab_script(&words, audio).await
        } else {
            let localized = if audio == Language::Ja {
                topic.to_string()
            } else {
                self.translator.translate(topic, audio, None).await
            };
            let seed = generator.seed_phrase(&localized, audio).await;
            generator
                .generate(&localized, audio, self.options.turns, &seed, self.options.mode)
                .await
        };
        script.into_iter().filter(|l| !l.text.trim().is_empty()).collect()
    }

    async fn voice(&self, script: Vec<ScriptLine>, combo: &Combo, dir: &Path) -> Result<Voiced> {
        let total = script.len();
        let silent_second = self.options.mode == ContentMode::Vocab && self.config.vocab.silent_second;
        let mut clips = Vec::with_capacity(total);
        let mut subtitles = Vec::with_capacity(total);

        for (idx, line) in script.iter().enumerate() {
            let path = dir.join(format!("{:02}.wav", idx + 1));
            let clip = if silent_second && idx % 3 == 1 {
                write_silence(&path, VOCAB_SILENCE_MS, SPEECH_SPEC)?
            } else {
                let style = self.options.mode.style_for_line(idx, total);
                match self
                    .tts
                    .synthesize(combo.audio, line.speaker, &line.text, style, &path)
                    .await
                {
                    Ok(clip) => clip,
                    Err(e) => {
                        warn!("TTS failed for line {}, inserting silence: {}", idx + 1, e);
                        write_silence(&path, fallback_silence_ms(&line.text), SPEECH_SPEC)?
                    }
                }
            };
            clips.push(clip);

            let mut row = Vec::with_capacity(combo.subs.len());
            for lang in &combo.subs {
                if *lang == combo.audio {
                    row.push(line.text.clone());
                } else {
                    row.push(self.translator.translate(&line.text, *lang, Some(combo.audio)).await);
                }
            }
            subtitles.push(row);
        }
        info!("Voiced {} lines for {}", total, combo.audio);
        Ok(Voiced {
            script,
            clips,
            subtitles,
        })
    }
}

/// Silence long enough to keep the subtitle readable.
fn fallback_silence_ms(text: &str) -> u64 {
    (text.chars().count() as u64 * 80).clamp(500, 5000)
}

/// `<audio>-<subs joined by _>_<YYYYmmdd_HHMMSS>.mp4`
pub fn output_name<Tz: chrono::TimeZone>(combo: &Combo, now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let subs = combo.subs.iter().map(|l| l.code()).collect::<Vec<_>>().join("_");
    format!("{}-{}_{}.mp4", combo.audio, subs, now.format("%Y%m%d_%H%M%S"))
}

fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::lang::{Speaker, Style};
    use crate::llm::testing::ScriptedModel;
    use crate::tts::testing::SilentSynth;
    use chrono::TimeZone;

    fn options(mode: ContentMode) -> RunOptions {
        RunOptions {
            mode,
            turns: 2,
            privacy: Privacy::Unlisted,
            lines_only: true,
            upload: false,
            chunk: 9999,
        }
    }

    fn combo(audio: Language, subs: &[Language]) -> Combo {
        Combo {
            audio,
            subs: subs.to_vec(),
            account: "default".to_string(),
            title_lang: None,
        }
    }

    #[test]
    fn output_name_joins_languages_and_stamp() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let name = output_name(&combo(Language::En, &[Language::En, Language::Ja]), now);
        assert_eq!(name, "en-en_ja_20240506_070809.mp4");
    }

    #[test]
    fn fallback_silence_is_bounded() {
        assert_eq!(fallback_silence_ms(""), 500);
        assert_eq!(fallback_silence_ms("abcdefghij"), 800);
        assert_eq!(fallback_silence_ms(&"x".repeat(500)), 5000);
    }

    #[tokio::test]
    async fn auto_topic_passes_through_in_vocab_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let model = ScriptedModel::new();
        let synth = SilentSynth::default();
        let pipeline = Pipeline::new(&config, &model, &synth, options(ContentMode::Vocab));
        assert_eq!(pipeline.resolve_topic(&TopicArg::Auto).await, AUTO_TOPIC);
        assert_eq!(
            pipeline.resolve_topic(&TopicArg::Explicit("lobby".into())).await,
            "lobby"
        );
        let pipeline = Pipeline::new(&config, &model, &synth, options(ContentMode::Dialogue));
        assert!(pipeline.resolve_topic(&TopicArg::Auto).await.contains("で使える"));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn explicit_vocab_words_become_three_line_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let model = ScriptedModel::new().reply("The lobby is big.").reply("Take the elevator.");
        let synth = SilentSynth::default();
        let pipeline = Pipeline::new(&config, &model, &synth, options(ContentMode::Vocab));
        let script = pipeline.build_script("lobby, elevator", Language::En).await;
        let texts: Vec<&str> = script.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["lobby", "lobby", "The lobby is big.", "elevator", "elevator", "Take the elevator."]
        );
        assert!(script.iter().all(|l| l.speaker == Speaker::Narrator));
    }

    #[tokio::test]
    async fn voicing_falls_back_to_silence_and_translates_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let model = ScriptedModel::new().reply("こんにちは。").reply("さようなら。");
        let synth = SilentSynth {
            ms_per_char: 10,
            fail_on: Some("Bye.".to_string()),
            ..Default::default()
        };
        let pipeline = Pipeline::new(&config, &model, &synth, options(ContentMode::Dialogue))
            .with_translation_backoff(Duration::ZERO);
        let script = vec![
            ScriptLine::new(Speaker::Alice, "Hello."),
            ScriptLine::new(Speaker::Bob, "Bye."),
        ];
        let voiced = pipeline
            .voice(script, &combo(Language::En, &[Language::En, Language::Ja]), dir.path())
            .await
            .unwrap();

        // Energetic styling speaks "Hello.!", seven characters.
        assert_eq!(voiced.clips[0].duration_ms, 70);
        assert_eq!(voiced.clips[1].duration_ms, 500);
        assert_eq!(voiced.subtitles[0], vec!["Hello.", "こんにちは。"]);
        assert_eq!(voiced.subtitles[1], vec!["Bye.", "さようなら。"]);

        let spoken = synth.spoken.lock().unwrap();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].2, Style::Energetic);
    }

    #[tokio::test]
    async fn vocab_silent_second_line_skips_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.vocab.silent_second = true;
        let model = ScriptedModel::new();
        let synth = SilentSynth {
            ms_per_char: 10,
            ..Default::default()
        };
        let pipeline = Pipeline::new(&config, &model, &synth, options(ContentMode::Vocab));
        let script = vec![
            ScriptLine::new(Speaker::Narrator, "lobby"),
            ScriptLine::new(Speaker::Narrator, "lobby"),
            ScriptLine::new(Speaker::Narrator, "Meet me in the lobby."),
        ];
        let voiced = pipeline
            .voice(script, &combo(Language::En, &[Language::En]), dir.path())
            .await
            .unwrap();
        assert_eq!(voiced.clips[1].duration_ms, VOCAB_SILENCE_MS);
        assert_eq!(synth.spoken.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn run_all_counts_failed_combos() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();
        config.paths.temp = blocker.join("temp");
        let model = ScriptedModel::new();
        let synth = SilentSynth::default();
        let pipeline = Pipeline::new(&config, &model, &synth, options(ContentMode::Dialogue));
        let summary = pipeline.run_all("hotel").await;
        assert_eq!(
            summary,
            Summary {
                succeeded: 0,
                failed: config.combos.len()
            }
        );
    }
}
