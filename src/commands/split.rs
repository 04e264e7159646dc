use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::{SplitArgs, TagEncoding};
use crate::model::{ChapterRecord, ManifestChapter, SplitPaths, SplitRunManifest};
use crate::naming::{AUDIO_EXTENSION, output_file_name};
use crate::plan::SplitPlanArtifact;
use crate::probe::{ChapterExtractor, ProbeLayout};
use crate::tools::{self, MediaTools, ShellTools, TrackTags};
use crate::util::{
    ensure_output_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

#[derive(Debug, Clone)]
pub struct SplitRequest {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub quality: u8,
    pub tag_encoding: TagEncoding,
}

impl SplitRequest {
    pub fn from_args(args: &SplitArgs) -> Self {
        Self {
            input_file: args.input_file.clone(),
            output_dir: args.output_dir.clone(),
            artist: args.artist.clone(),
            album: args.album.clone(),
            year: args.year.clone(),
            quality: args.quality,
            tag_encoding: args.tag_encoding,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub chapters: Vec<ChapterRecord>,
    pub audio_path: PathBuf,
    pub audio_reused: bool,
    pub outputs: Vec<PathBuf>,
}

pub fn run(args: SplitArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();

    if !args.input_file.is_file() {
        bail!("input file does not exist: {}", args.input_file.display());
    }
    ensure_output_directory(&args.output_dir)?;

    let request = SplitRequest::from_args(&args);
    let extractor = ChapterExtractor::ffprobe()?;
    let outcome = execute(&ShellTools, &extractor, &request)?;

    if let Some(manifest_path) = &args.manifest_path {
        let manifest = SplitRunManifest {
            manifest_version: 1,
            run_id: format!("split-{}", utc_compact_string(started_ts)),
            status: "completed".to_string(),
            started_at,
            updated_at: now_utc_string(),
            command: render_split_command(&args),
            input_sha256: sha256_file(&args.input_file)?,
            audio_reused: outcome.audio_reused,
            tool_versions: tools::collect_tool_versions(),
            paths: SplitPaths {
                input_file: args.input_file.display().to_string(),
                output_dir: args.output_dir.display().to_string(),
                audio_path: outcome.audio_path.display().to_string(),
            },
            chapter_count: outcome.chapters.len(),
            chapters: manifest_chapters(&outcome.chapters),
        };
        write_json_pretty(manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote split run manifest");
    }

    info!(
        chapters = outcome.chapters.len(),
        files = outcome.outputs.len(),
        output_dir = %args.output_dir.display(),
        "split completed"
    );

    Ok(())
}

// Nothing is encoded unless at least one chapter was extracted.
pub fn execute<L: ProbeLayout>(
    tools: &dyn MediaTools,
    extractor: &ChapterExtractor<L>,
    request: &SplitRequest,
) -> Result<SplitOutcome> {
    info!(input = %request.input_file.display(), "probing chapters");
    let probe_text = tools
        .probe(&request.input_file)
        .with_context(|| format!("failed to probe {}", request.input_file.display()))?;
    let chapters = extractor
        .parse(&probe_text)
        .and_then(|extraction| extraction.require_chapters())
        .with_context(|| {
            format!(
                "failed to extract chapters from {}",
                request.input_file.display()
            )
        })?;
    info!(chapters = chapters.len(), "extracted chapters");

    let (audio_path, audio_reused) = resolve_audio(tools, request)?;
    let outputs = split_chapters(tools, &audio_path, &chapters, &request.output_dir)?;
    tag_outputs(tools, request, &chapters, &outputs)?;

    Ok(SplitOutcome {
        chapters,
        audio_path,
        audio_reused,
        outputs,
    })
}

pub fn intermediate_audio_path(input_file: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input_file
        .file_stem()
        .with_context(|| format!("input file has no name: {}", input_file.display()))?;

    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(AUDIO_EXTENSION);
    Ok(output_dir.join(file_name))
}

fn resolve_audio(tools: &dyn MediaTools, request: &SplitRequest) -> Result<(PathBuf, bool)> {
    let audio_path = intermediate_audio_path(&request.input_file, &request.output_dir)?;

    if audio_path.exists() {
        info!(path = %audio_path.display(), "reusing existing intermediate audio");
        return Ok((audio_path, true));
    }

    info!(
        input = %request.input_file.display(),
        output = %audio_path.display(),
        quality = request.quality,
        "encoding intermediate audio"
    );
    if let Err(error) = tools.encode(&request.input_file, &audio_path, request.quality) {
        if let Err(cleanup) = tools::remove_partial(&audio_path) {
            warn!(error = %cleanup, "could not remove partial intermediate audio");
        }
        return Err(error)
            .with_context(|| format!("failed to encode {}", request.input_file.display()));
    }

    Ok((audio_path, false))
}

fn split_chapters(
    tools: &dyn MediaTools,
    audio_path: &Path,
    chapters: &[ChapterRecord],
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let plan = SplitPlanArtifact::create(chapters)?;
    info!(plan = %plan.path().display(), chapters = chapters.len(), "wrote split plan");

    match tools.split(audio_path, plan.path(), output_dir) {
        Ok(()) => plan.discard()?,
        Err(error) => {
            return match plan.preserve() {
                Ok(kept) => {
                    warn!(plan = %kept.display(), "splitter failed; split plan kept for inspection");
                    Err(error).with_context(|| {
                        format!(
                            "failed to split {} (plan kept at {})",
                            audio_path.display(),
                            kept.display()
                        )
                    })
                }
                Err(keep_error) => {
                    warn!(error = %keep_error, "splitter failed and the split plan could not be kept");
                    Err(error).with_context(|| format!("failed to split {}", audio_path.display()))
                }
            };
        }
    }

    let mut outputs = Vec::with_capacity(chapters.len());
    for chapter in chapters {
        let path = output_dir.join(output_file_name(chapter.index, &chapter.title));
        if !path.is_file() {
            bail!(
                "splitter did not produce expected chapter file: {}",
                path.display()
            );
        }
        outputs.push(path);
    }

    Ok(outputs)
}

fn tag_outputs(
    tools: &dyn MediaTools,
    request: &SplitRequest,
    chapters: &[ChapterRecord],
    outputs: &[PathBuf],
) -> Result<()> {
    let total = chapters.len();

    for (chapter, path) in chapters.iter().zip(outputs) {
        let tags = TrackTags {
            artist: &request.artist,
            album: &request.album,
            title: &chapter.title,
            year: &request.year,
            track: chapter.index + 1,
            total,
            encoding: request.tag_encoding,
        };
        tools
            .tag(path, &tags)
            .with_context(|| format!("failed to tag {}", path.display()))?;
    }

    info!(files = total, "tagged chapter files");
    Ok(())
}

fn manifest_chapters(chapters: &[ChapterRecord]) -> Vec<ManifestChapter> {
    chapters
        .iter()
        .map(|chapter| ManifestChapter {
            track: chapter.index + 1,
            title: chapter.title.clone(),
            start: chapter.start.to_string(),
            end: chapter.end.to_string(),
            file_name: output_file_name(chapter.index, &chapter.title),
        })
        .collect()
}

fn render_split_command(args: &SplitArgs) -> String {
    let mut command = vec![
        "chaptersplit".to_string(),
        "split".to_string(),
        "--input-file".to_string(),
        args.input_file.display().to_string(),
        "--output-dir".to_string(),
        args.output_dir.display().to_string(),
        "--artist".to_string(),
        args.artist.clone(),
        "--album".to_string(),
        args.album.clone(),
        "--year".to_string(),
        args.year.clone(),
        "--quality".to_string(),
        args.quality.to_string(),
        "--tag-encoding".to_string(),
        args.tag_encoding.as_str().to_string(),
    ];

    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }

    command.join(" ")
}
