use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::Path;
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

use crate::cli::TagEncoding;
use crate::model::ToolVersions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolRequirement {
    pub program: &'static str,
    pub package: &'static str,
    pub version_args: &'static [&'static str],
}

pub const FFPROBE: ToolRequirement = ToolRequirement {
    program: "ffprobe",
    package: "ffmpeg",
    version_args: &["-version"],
};
pub const FFMPEG: ToolRequirement = ToolRequirement {
    program: "ffmpeg",
    package: "ffmpeg",
    version_args: &["-version"],
};
pub const LAME: ToolRequirement = ToolRequirement {
    program: "lame",
    package: "lame",
    version_args: &["--version"],
};
pub const MP3SPLT: ToolRequirement = ToolRequirement {
    program: "mp3splt",
    package: "mp3splt",
    version_args: &["-v"],
};
pub const ID3TAG: ToolRequirement = ToolRequirement {
    program: "id3tag",
    package: "libid3-tools",
    version_args: &["--version"],
};

pub const PROBE_TOOLS: &[ToolRequirement] = &[FFPROBE];
pub const ALL_TOOLS: &[ToolRequirement] = &[FFPROBE, FFMPEG, LAME, MP3SPLT, ID3TAG];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingTools {
    by_package: BTreeMap<&'static str, Vec<&'static str>>,
}

impl MissingTools {
    pub fn is_empty(&self) -> bool {
        self.by_package.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = (&'static str, &[&'static str])> + '_ {
        self.by_package
            .iter()
            .map(|(package, programs)| (*package, programs.as_slice()))
    }

    fn insert(&mut self, requirement: &ToolRequirement) {
        let programs = self.by_package.entry(requirement.package).or_default();
        if !programs.contains(&requirement.program) {
            programs.push(requirement.program);
        }
    }
}

impl fmt::Display for MissingTools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .groups()
            .map(|(package, programs)| format!("{package} ({})", programs.join(", ")))
            .collect::<Vec<String>>();
        f.write_str(&rendered.join("; "))
    }
}

pub fn missing_tools(required: &[ToolRequirement]) -> MissingTools {
    find_missing(required, |program| which::which(program).is_ok())
}

pub fn find_missing(
    required: &[ToolRequirement],
    is_present: impl Fn(&str) -> bool,
) -> MissingTools {
    let mut missing = MissingTools::default();
    for requirement in required {
        if !is_present(requirement.program) {
            missing.insert(requirement);
        }
    }
    missing
}

pub fn command_version_optional(requirement: &ToolRequirement) -> Option<String> {
    let output = Command::new(requirement.program)
        .args(requirement.version_args)
        .stdin(Stdio::null())
        .output()
        .ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

pub fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        ffprobe: command_version_optional(&FFPROBE),
        ffmpeg: command_version_optional(&FFMPEG),
        lame: command_version_optional(&LAME),
        mp3splt: command_version_optional(&MP3SPLT),
        id3tag: command_version_optional(&ID3TAG),
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to execute {program}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} returned non-zero exit status ({status}){}", detail_suffix(.detail))]
    Failed {
        program: &'static str,
        status: ExitStatus,
        detail: String,
    },

    #[error("{field} value {value:?} cannot be encoded as Latin-1")]
    Unencodable { field: &'static str, value: String },
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags<'a> {
    pub artist: &'a str,
    pub album: &'a str,
    pub title: &'a str,
    pub year: &'a str,
    pub track: usize,
    pub total: usize,
    pub encoding: TagEncoding,
}

pub trait MediaTools {
    // stdout followed by stderr.
    fn probe(&self, input: &Path) -> Result<String>;

    fn encode(&self, input: &Path, output: &Path, quality: u8) -> Result<()>;

    fn split(&self, audio: &Path, plan: &Path, output_dir: &Path) -> Result<()>;

    fn tag(&self, file: &Path, tags: &TrackTags<'_>) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ShellTools;

impl MediaTools for ShellTools {
    fn probe(&self, input: &Path) -> Result<String> {
        let output = run_captured(FFPROBE.program, Command::new(FFPROBE.program).arg(input))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    fn encode(&self, input: &Path, output: &Path, quality: u8) -> Result<()> {
        run_pipeline(
            FFMPEG.program,
            Command::new(FFMPEG.program)
                .args(["-loglevel", "error", "-i"])
                .arg(input)
                .args(["-f", "wav", "-"]),
            LAME.program,
            Command::new(LAME.program)
                .arg("--quiet")
                .arg("-V")
                .arg(quality.to_string())
                .arg("-")
                .arg(output),
        )
    }

    fn split(&self, audio: &Path, plan: &Path, output_dir: &Path) -> Result<()> {
        let output = run_captured(
            MP3SPLT.program,
            Command::new(MP3SPLT.program)
                .arg("-A")
                .arg(plan)
                .arg("-d")
                .arg(output_dir)
                .arg(audio),
        )?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(tool = MP3SPLT.program, "{}", line.trim_end());
        }
        Ok(())
    }

    fn tag(&self, file: &Path, tags: &TrackTags<'_>) -> Result<()> {
        let args = tag_arguments(tags)?;
        run_captured(
            ID3TAG.program,
            Command::new(ID3TAG.program).args(&args).arg(file),
        )?;
        Ok(())
    }
}

pub fn tag_arguments(tags: &TrackTags<'_>) -> Result<Vec<OsString>, ToolError> {
    let track = tags.track.to_string();
    let total = tags.total.to_string();
    let fields = [
        ("--artist=", "artist", tags.artist),
        ("--album=", "album", tags.album),
        ("--song=", "title", tags.title),
        ("--year=", "year", tags.year),
        ("--track=", "track", track.as_str()),
        ("--total=", "total", total.as_str()),
    ];

    fields
        .into_iter()
        .map(|(flag, field, value)| -> Result<OsString, ToolError> {
            let mut argument = OsString::from(flag);
            argument.push(encode_tag_value(field, value, tags.encoding)?);
            Ok(argument)
        })
        .collect()
}

fn encode_tag_value(
    field: &'static str,
    value: &str,
    encoding: TagEncoding,
) -> Result<OsString, ToolError> {
    match encoding {
        TagEncoding::Utf8 => Ok(OsString::from(value)),
        TagEncoding::Latin1 => latin1_bytes(value)
            .map(os_string_from_bytes)
            .ok_or_else(|| ToolError::Unencodable {
                field,
                value: value.to_string(),
            }),
    }
}

fn latin1_bytes(value: &str) -> Option<Vec<u8>> {
    value
        .chars()
        .map(|character| u8::try_from(u32::from(character)).ok())
        .collect()
}

#[cfg(unix)]
fn os_string_from_bytes(bytes: Vec<u8>) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes)
}

// Command lines are UTF-16 off unix, so Latin-1 only restricts the character range there.
#[cfg(not(unix))]
fn os_string_from_bytes(bytes: Vec<u8>) -> OsString {
    bytes.into_iter().map(char::from).collect::<String>().into()
}

fn run_captured(program: &'static str, command: &mut Command) -> Result<Output> {
    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ToolError::Spawn { program, source })?;

    ensure_success(program, output.status, last_line(&output.stderr))?;
    Ok(output)
}

fn run_pipeline(
    producer: &'static str,
    producer_command: &mut Command,
    consumer: &'static str,
    consumer_command: &mut Command,
) -> Result<()> {
    let mut upstream = producer_command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|source| ToolError::Spawn {
            program: producer,
            source,
        })?;

    let pipe = upstream
        .stdout
        .take()
        .with_context(|| format!("{producer} stdout was not captured"))?;

    let consumed = match consumer_command.stdin(Stdio::from(pipe)).output() {
        Ok(output) => output,
        Err(source) => {
            let _ = upstream.kill();
            let _ = upstream.wait();
            return Err(ToolError::Spawn {
                program: consumer,
                source,
            }
            .into());
        }
    };

    let produced = upstream.wait().map_err(|source| ToolError::Spawn {
        program: producer,
        source,
    })?;

    // A consumer that exits early breaks the pipe under the producer.
    ensure_success(consumer, consumed.status, last_line(&consumed.stderr))?;
    ensure_success(producer, produced, String::new())?;
    Ok(())
}

fn ensure_success(
    program: &'static str,
    status: ExitStatus,
    detail: String,
) -> Result<(), ToolError> {
    if status.success() {
        Ok(())
    } else {
        Err(ToolError::Failed {
            program,
            status,
            detail,
        })
    }
}

fn last_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or_default()
        .to_string()
}

pub fn remove_partial(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => {
            Err(error).with_context(|| format!("failed to remove partial file {}", path.display()))
        }
    }
}
