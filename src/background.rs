//! Portrait background image: Unsplash photo or a solid placeholder.

use crate::config::{Config, FRAME_H, FRAME_W};
use crate::error::{PipelineError, Result};
use crate::ffmpeg::{self, FFMPEG};
use rand::Rng;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const UNSPLASH_RANDOM_URL: &str = "https://api.unsplash.com/photos/random";
const FALLBACK_RGB: [u8; 3] = [10, 10, 10];

#[derive(Debug, Deserialize)]
struct RandomPhoto {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    pub path: PathBuf,
    /// True when the solid placeholder was used.
    pub fallback: bool,
}

/// Never fails on upstream problems; only disk I/O for the placeholder
/// can surface as an error.
pub async fn fetch(config: &Config, query: &str, dir: &Path) -> Result<Background> {
    let Some(key) = config.unsplash_access_key.as_deref() else {
        warn!("UNSPLASH_ACCESS_KEY not set, using a solid background");
        return solid(dir);
    };

    let fitted = dir.join("bg.png");
    match download_and_fit(key, query, dir, &fitted).await {
        Ok(()) => {
            info!("Background for '{}' written to {}", query, fitted.display());
            Ok(Background {
                path: fitted,
                fallback: false,
            })
        }
        Err(e) => {
            warn!("Background fetch failed, using a solid background: {}", e);
            solid(dir)
        }
    }
}

fn random_photo_url(query: &str, key: &str, sig: u32) -> String {
    format!(
        "{}?query={}&orientation=portrait&content_filter=high&client_id={}&sig={}",
        UNSPLASH_RANDOM_URL,
        urlencoding::encode(query),
        key,
        sig
    )
}

async fn download_and_fit(key: &str, query: &str, dir: &Path, out: &Path) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;

    let sig = rand::thread_rng().gen_range(1..=999_999);
    let res = client.get(random_photo_url(query, key, sig)).send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(PipelineError::Api {
            service: "unsplash".to_string(),
            status: status.as_u16(),
            body: res.text().await.unwrap_or_default(),
        });
    }
    let photo: RandomPhoto = res.json().await?;
    let image_url = photo.urls.regular.ok_or_else(|| PipelineError::Api {
        service: "unsplash".to_string(),
        status: status.as_u16(),
        body: "no image url".to_string(),
    })?;

    let bytes = client
        .get(image_url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    let raw = dir.join("bg_raw.jpg");
    fs::write(&raw, &bytes)?;
    fit_portrait(&raw, out)
}

/// Centre-crops any image to the portrait frame without letterboxing.
fn fit_portrait(input: &Path, out: &Path) -> Result<()> {
    let filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
        w = FRAME_W,
        h = FRAME_H
    );
    let input = input.to_string_lossy();
    let out = out.to_string_lossy();
    ffmpeg::run(
        FFMPEG,
        ["-y", "-i", &*input, "-vf", filter.as_str(), "-frames:v", "1", &*out],
        "fitting background",
    )
}

fn solid(dir: &Path) -> Result<Background> {
    let path = dir.join("bg.ppm");
    write_solid_ppm(&path, FRAME_W, FRAME_H, FALLBACK_RGB)?;
    Ok(Background {
        path,
        fallback: true,
    })
}

/// Binary PPM so the placeholder needs no encoder at all.
pub fn write_solid_ppm(path: &Path, width: u32, height: u32, rgb: [u8; 3]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write!(w, "P6\n{} {}\n255\n", width, height)?;
    let row: Vec<u8> = rgb.iter().copied().cycle().take(width as usize * 3).collect();
    for _ in 0..height {
        w.write_all(&row)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn url_is_portrait_and_escaped() {
        let url = random_photo_url("hotel lobby", "KEY", 42);
        assert!(url.starts_with("https://api.unsplash.com/photos/random?query=hotel%20lobby"));
        assert!(url.contains("&orientation=portrait&content_filter=high"));
        assert!(url.ends_with("&client_id=KEY&sig=42"));
    }

    #[test]
    fn solid_ppm_has_full_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.ppm");
        write_solid_ppm(&path, 4, 2, [10, 10, 10]).unwrap();
        let bytes = fs::read(&path).unwrap();
        let header = b"P6\n4 2\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(bytes.len(), header.len() + 4 * 2 * 3);
        assert!(bytes[header.len()..].iter().all(|b| *b == 10));
    }

    #[tokio::test]
    async fn missing_key_falls_back_to_solid() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let bg = fetch(&config, "hotel", dir.path()).await.unwrap();
        assert!(bg.fallback);
        let header = format!("P6\n{} {}\n255\n", FRAME_W, FRAME_H);
        let expected = header.len() as u64 + (FRAME_W * FRAME_H * 3) as u64;
        assert_eq!(fs::metadata(&bg.path).unwrap().len(), expected);
    }
}
