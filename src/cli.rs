use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "chaptersplit",
    version,
    about = "Split a chaptered audio/video file into tagged per-chapter MP3 files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Split(SplitArgs),
    Chapters(ChaptersArgs),
    Doctor,
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    #[arg(short = 'i', long)]
    pub input_file: PathBuf,

    #[arg(short = 'o', long)]
    pub output_dir: PathBuf,

    #[arg(short = 'a', long)]
    pub artist: String,

    #[arg(short = 'A', long)]
    pub album: String,

    #[arg(short = 'y', long)]
    pub year: String,

    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub quality: u8,

    #[arg(long, value_enum, default_value_t = TagEncoding::Latin1)]
    pub tag_encoding: TagEncoding,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ChaptersArgs {
    #[arg(short = 'i', long)]
    pub input_file: PathBuf,

    #[arg(long, default_value_t = false, conflicts_with = "json")]
    pub plan: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum TagEncoding {
    Latin1,
    Utf8,
}

impl TagEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latin1 => "latin1",
            Self::Utf8 => "utf8",
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn split_requires_every_metadata_flag() {
        let error = Cli::try_parse_from([
            "chaptersplit",
            "split",
            "-i",
            "book.m4b",
            "-o",
            "out",
            "-a",
            "Artist",
        ])
        .expect_err("album and year are missing");
        assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn split_parses_short_flags_and_defaults() {
        let cli = Cli::try_parse_from([
            "chaptersplit",
            "split",
            "-i",
            "book.m4b",
            "-o",
            "out",
            "-a",
            "Artist",
            "-A",
            "Album",
            "-y",
            "2019",
        ])
        .expect("complete command line");

        let Commands::Split(args) = cli.command else {
            panic!("expected split command");
        };
        assert_eq!(args.input_file, PathBuf::from("book.m4b"));
        assert_eq!(args.album, "Album");
        assert_eq!(args.quality, 4);
        assert_eq!(args.tag_encoding, TagEncoding::Latin1);
        assert!(args.manifest_path.is_none());
    }

    #[test]
    fn split_rejects_out_of_range_quality() {
        let error = Cli::try_parse_from([
            "chaptersplit",
            "split",
            "-i",
            "book.m4b",
            "-o",
            "out",
            "-a",
            "Artist",
            "-A",
            "Album",
            "-y",
            "2019",
            "--quality",
            "12",
        ])
        .expect_err("quality above 9");
        assert_eq!(error.kind(), ErrorKind::ValueValidation);
    }
}
