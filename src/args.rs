use crate::mode::ContentMode;
use crate::upload::Privacy;
use clap::Parser;
use std::path::PathBuf;

/// Generates and publishes short language-learning videos.
#[derive(Parser, Debug)]
#[clap(version)]
pub struct Args {
    /// Conversation topic, or AUTO to pick one
    pub topic: String,

    #[clap(long, default_value_t = 8)]
    pub turns: usize,

    #[clap(long, value_enum, default_value_t = Privacy::Unlisted)]
    pub privacy: Privacy,

    /// Stop after writing the manifest
    #[clap(long)]
    pub lines_only: bool,

    #[clap(long)]
    pub no_upload: bool,

    /// Manifest lines per rendered part
    #[clap(long, default_value_t = 9999, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk: u32,

    #[clap(long, value_enum, env = "CONTENT_MODE", default_value_t = ContentMode::Dialogue)]
    pub mode: ContentMode,

    #[clap(long, default_value = "combos.yaml")]
    pub combos: PathBuf,

    #[clap(long, default_value = "temp")]
    pub temp_dir: PathBuf,

    #[clap(long, default_value = "output")]
    pub output_dir: PathBuf,

    #[clap(long, default_value = "tokens")]
    pub tokens_dir: PathBuf,

    #[clap(long, default_value = "fonts")]
    pub fonts_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_single_short() {
        let args = Args::try_parse_from(["shortsgen", "AUTO"]).unwrap();
        assert_eq!(args.topic, "AUTO");
        assert_eq!(args.turns, 8);
        assert_eq!(args.privacy, Privacy::Unlisted);
        assert_eq!(args.chunk, 9999);
        assert!(!args.lines_only && !args.no_upload);
        assert_eq!(args.combos, PathBuf::from("combos.yaml"));
    }

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "shortsgen",
            "hotel",
            "--turns",
            "4",
            "--privacy",
            "private",
            "--mode",
            "wisdom",
            "--lines-only",
            "--chunk",
            "20",
        ])
        .unwrap();
        assert_eq!(args.turns, 4);
        assert_eq!(args.privacy, Privacy::Private);
        assert_eq!(args.mode, ContentMode::Wisdom);
        assert!(args.lines_only);
        assert_eq!(args.chunk, 20);
    }

    #[test]
    fn rejects_zero_chunk_and_unknown_privacy() {
        assert!(Args::try_parse_from(["shortsgen", "x", "--chunk", "0"]).is_err());
        assert!(Args::try_parse_from(["shortsgen", "x", "--privacy", "secret"]).is_err());
    }
}
