use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ChaptersArgs;
use crate::model::ChapterRecord;
use crate::naming::output_name;
use crate::plan::write_split_plan;
use crate::probe::ChapterExtractor;
use crate::tools::{MediaTools, ShellTools};

pub fn run(args: ChaptersArgs) -> Result<()> {
    let extractor = ChapterExtractor::ffprobe()?;
    let probe_text = ShellTools
        .probe(&args.input_file)
        .with_context(|| format!("failed to probe {}", args.input_file.display()))?;
    let extraction = extractor
        .parse(&probe_text)
        .with_context(|| format!("failed to extract chapters from {}", args.input_file.display()))?;

    info!(
        markers = extraction.marker_lines,
        titles = extraction.title_lines,
        chapters = extraction.chapters.len(),
        "parsed probe output"
    );
    let chapters = extraction.require_chapters()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &chapters).context("failed to write chapter json")?;
        writeln!(out)?;
    } else if args.plan {
        write_split_plan(&mut out, &chapters).context("failed to write split plan")?;
    } else {
        for chapter in &chapters {
            writeln!(out, "{}", describe_chapter(chapter))?;
        }
    }
    out.flush()?;

    Ok(())
}

pub fn describe_chapter(chapter: &ChapterRecord) -> String {
    format!(
        "{} (from {} to {})",
        output_name(chapter.index, &chapter.title),
        chapter.start,
        chapter.end
    )
}
