use std::fmt;

use serde::{Serialize, Serializer};

/// A chapter boundary as printed by the probe, kept verbatim alongside its
/// value in seconds. Equality is textual.
#[derive(Debug, Clone)]
pub struct Timestamp {
    raw: String,
    seconds: f64,
}

impl Timestamp {
    pub fn parse(raw: &str) -> Option<Self> {
        let seconds = raw.parse::<f64>().ok()?;
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }

        Some(Self {
            raw: raw.to_string(),
            seconds,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Timestamp {}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterRecord {
    pub index: usize,
    pub title: String,
    pub start: Timestamp,
    pub end: Timestamp,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolVersions {
    pub ffprobe: Option<String>,
    pub ffmpeg: Option<String>,
    pub lame: Option<String>,
    pub mp3splt: Option<String>,
    pub id3tag: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitPaths {
    pub input_file: String,
    pub output_dir: String,
    pub audio_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestChapter {
    pub track: usize,
    pub title: String,
    pub start: String,
    pub end: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub input_sha256: String,
    pub audio_reused: bool,
    pub tool_versions: ToolVersions,
    pub paths: SplitPaths,
    pub chapter_count: usize,
    pub chapters: Vec<ManifestChapter>,
}
