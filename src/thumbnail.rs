//! Portrait thumbnail: blurred background, glass panel, two caption lines
//! ("scene" over "phrase") and a small "Lesson" badge.

use crate::config::{FRAME_H, FRAME_W};
use crate::error::Result;
use crate::ffmpeg::{self, FFMPEG, filter_path};
use crate::lang::Language;
use crate::llm::LanguageModel;
use crate::subtitle::{FONT_CJK, FONT_HANGUL, pick_font, wrap_for_script};
use crate::translate::Translator;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SCENE_MAX: usize = 22;
const PHRASE_MAX: usize = 24;
const BADGE_BASE: &str = "Lesson";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub scene: String,
    pub phrase: String,
}

impl Caption {
    /// Splits "scene|phrase"; a single segment is cut in half instead.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw
            .trim()
            .split('|')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let (scene, phrase) = match parts.as_slice() {
            [] => return None,
            [single] => {
                let chars: Vec<char> = single.chars().collect();
                let mid = (chars.len() / 2).clamp(1, 16).min(chars.len());
                (
                    chars[..mid].iter().collect::<String>(),
                    chars[mid..].iter().collect::<String>(),
                )
            }
            [scene, phrase, ..] => (scene.to_string(), phrase.to_string()),
        };
        Some(Caption {
            scene: scene.trim().chars().take(SCENE_MAX).collect(),
            phrase: phrase.trim().chars().take(PHRASE_MAX).collect(),
        })
    }
}

fn caption_prompt(topic: &str, lang: Language) -> String {
    format!(
        "You craft high-performing YouTube thumbnail captions.\n\
         Language: {} ONLY.\n\
         Return TWO ultra-short lines separated by a single '|' character:\n \
         - Line 1: the SCENE label (e.g., Hotel / Airport / Restaurant / At Work), at most 16 chars.\n \
         - Line 2: the key PHRASE learners will master, at most 20 chars.\n\
         Rules: no quotes/emojis, no surrounding punctuation, no translation, \
         use natural words in the requested language, avoid brand names.\n\
         Topic: {}\n\
         Output example (do not translate this example):\n\
         Hotel|Check-in made easy",
        lang.name(),
        topic
    )
}

pub async fn caption(llm: &dyn LanguageModel, topic: &str, lang: Language) -> Caption {
    let from_topic = || {
        Caption::parse(topic).unwrap_or_else(|| Caption {
            scene: BADGE_BASE.to_string(),
            phrase: String::new(),
        })
    };
    match llm.complete(&caption_prompt(topic, lang), 0.55).await {
        Ok(raw) => Caption::parse(&raw).unwrap_or_else(from_topic),
        Err(e) => {
            warn!("Thumbnail caption failed, using the topic: {}", e);
            from_topic()
        }
    }
}

/// Font file inside `fonts_dir` matching the script of `text`.
fn font_file(fonts_dir: &Path, text: &str) -> PathBuf {
    let file = match pick_font(text) {
        FONT_CJK => "NotoSansJP-Bold.ttf",
        FONT_HANGUL => "malgunbd.ttf",
        _ => "RobotoSerif_36pt-Bold.ttf",
    };
    fonts_dir.join(file)
}

struct TextLayer {
    textfile: PathBuf,
    fontfile: PathBuf,
    size: u32,
    y: u32,
}

fn thumbnail_filter(scene: &TextLayer, phrase: Option<&TextLayer>, badge: &TextLayer) -> String {
    let mut vf = format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},boxblur=2,\
         drawbox=x=0:y=0:w=iw:h=ih:color=black@0.35:t=fill,\
         drawbox=x=60:y=980:w=960:h=480:color=white@0.32:t=fill",
        w = FRAME_W,
        h = FRAME_H
    );
    for layer in std::iter::once(scene).chain(phrase) {
        let _ = write!(
            vf,
            ",drawtext=fontfile={}:textfile={}:fontsize={}:fontcolor=white:\
             borderw=5:bordercolor=black:line_spacing=14:x=(w-text_w)/2:y={}",
            filter_path(&layer.fontfile),
            filter_path(&layer.textfile),
            layer.size,
            layer.y
        );
    }
    let _ = write!(
        vf,
        ",drawtext=fontfile={}:textfile={}:fontsize={}:fontcolor=white:\
         box=1:boxcolor=black@0.6:boxborderw=16:x=36:y={}",
        filter_path(&badge.fontfile),
        filter_path(&badge.textfile),
        badge.size,
        badge.y
    );
    vf
}

fn draw(caption: &Caption, badge: &str, background: &Path, fonts_dir: &Path, out: &Path) -> Result<()> {
    let dir = out.parent().unwrap_or(Path::new("."));
    let write_text = |name: &str, lines: Vec<String>| -> Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, lines.join("\n"))?;
        Ok(path)
    };

    let scene = TextLayer {
        textfile: write_text("thumb_scene.txt", wrap_for_script(&caption.scene, 7, 12))?,
        fontfile: font_file(fonts_dir, &caption.scene),
        size: 132,
        y: 1030,
    };
    let phrase = if caption.phrase.is_empty() {
        None
    } else {
        Some(TextLayer {
            textfile: write_text("thumb_phrase.txt", wrap_for_script(&caption.phrase, 10, 16))?,
            fontfile: font_file(fonts_dir, &caption.phrase),
            size: 92,
            y: 1230,
        })
    };
    let badge = TextLayer {
        textfile: write_text("thumb_badge.txt", vec![badge.to_string()])?,
        fontfile: font_file(fonts_dir, badge),
        size: 64,
        y: 36,
    };

    let vf = thumbnail_filter(&scene, phrase.as_ref(), &badge);
    let background = background.to_string_lossy();
    let out = out.to_string_lossy();
    ffmpeg::run(
        FFMPEG,
        ["-y", "-i", &*background, "-vf", vf.as_str(), "-frames:v", "1", &*out],
        "drawing thumbnail",
    )
}

/// Builds the thumbnail; any failure is logged and yields `None`.
pub async fn make(
    llm: &dyn LanguageModel,
    translator: &Translator<'_>,
    topic: &str,
    lang: Language,
    background: &Path,
    fonts_dir: &Path,
    out: &Path,
) -> Option<PathBuf> {
    let caption = caption(llm, topic, lang).await;
    let badge = translator.translate(BADGE_BASE, lang, Some(Language::En)).await;
    match draw(&caption, &badge, background, fonts_dir, out) {
        Ok(()) => {
            info!("Thumbnail written to {} ({} | {})", out.display(), caption.scene, caption.phrase);
            Some(out.to_path_buf())
        }
        Err(e) => {
            warn!("Thumbnail generation failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    #[test]
    fn parses_scene_and_phrase() {
        assert_eq!(
            Caption::parse(" Hotel | Check-in made easy "),
            Some(Caption {
                scene: "Hotel".to_string(),
                phrase: "Check-in made easy".to_string()
            })
        );
        assert_eq!(Caption::parse(" | "), None);
    }

    #[test]
    fn caps_both_lines() {
        let c = Caption::parse(&format!("{}|{}", "s".repeat(30), "p".repeat(30))).unwrap();
        assert_eq!(c.scene.chars().count(), SCENE_MAX);
        assert_eq!(c.phrase.chars().count(), PHRASE_MAX);
    }

    #[test]
    fn single_segment_is_split() {
        let c = Caption::parse("空港でのチェックイン").unwrap();
        assert_eq!(c.scene, "空港でのチ");
        assert_eq!(c.phrase, "ェックイン");
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_topic() {
        let model = ScriptedModel::new().fail();
        let c = caption(&model, "Hotel check-in", Language::En).await;
        assert_eq!(c.scene, "Hotel c");
        assert_eq!(c.phrase, "heck-in");
    }

    #[test]
    fn font_follows_caption_script() {
        let dir = Path::new("fonts");
        assert_eq!(font_file(dir, "ホテル"), dir.join("NotoSansJP-Bold.ttf"));
        assert_eq!(font_file(dir, "호텔"), dir.join("malgunbd.ttf"));
        assert_eq!(font_file(dir, "Hotel"), dir.join("RobotoSerif_36pt-Bold.ttf"));
    }

    #[test]
    fn filter_draws_every_layer() {
        let layer = |name: &str| TextLayer {
            textfile: PathBuf::from(format!("t/{name}.txt")),
            fontfile: PathBuf::from("f.ttf"),
            size: 10,
            y: 1,
        };
        let (scene, badge) = (layer("scene"), layer("badge"));
        assert_eq!(thumbnail_filter(&scene, None, &badge).matches("drawtext=").count(), 2);
        let phrase = layer("phrase");
        let vf = thumbnail_filter(&scene, Some(&phrase), &badge);
        assert_eq!(vf.matches("drawtext=").count(), 3);
        assert!(vf.contains("textfile=t/phrase.txt"));
    }
}
