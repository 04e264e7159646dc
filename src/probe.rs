use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use regex::Regex;
use thiserror::Error;

use crate::model::{ChapterRecord, Timestamp};
use crate::normalize::normalize_title;

pub const TITLE_LINE_OFFSET: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChapterError {
    #[error("probe output contains no chapter markers")]
    NoChapterMarkers,

    #[error("none of the {markers} chapter markers has a matching title line")]
    NoAlignedChapters { markers: usize },

    #[error("invalid chapter timestamp {value:?} on probe line {line}")]
    InvalidTimestamp { value: String, line: usize },

    #[error("chapter {title:?} does not end after it starts: {start} >= {end}")]
    InvalidSpan {
        title: String,
        start: String,
        end: String,
    },

    #[error("chapters are not contiguous: {end} != {next_start}")]
    NotContiguous { end: String, next_start: String },
}

pub trait ProbeLayout {
    fn chapter_span<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)>;

    fn chapter_title<'a>(&self, line: &'a str) -> Option<&'a str>;

    fn title_line_offset(&self) -> usize;
}

#[derive(Debug)]
pub struct FfprobeLayout {
    chapter_line: Regex,
    title_line: Regex,
}

impl FfprobeLayout {
    pub fn new() -> Result<Self> {
        Ok(Self {
            chapter_line: Regex::new(r"^    Chapter #\d+[.:]\d+: start ([\d.]+), end ([\d.]+)")
                .context("failed to compile chapter span regex")?,
            title_line: Regex::new(r"^      title           : (.*)")
                .context("failed to compile chapter title regex")?,
        })
    }
}

impl ProbeLayout for FfprobeLayout {
    fn chapter_span<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let captures = self.chapter_line.captures(line)?;
        Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
    }

    fn chapter_title<'a>(&self, line: &'a str) -> Option<&'a str> {
        let captures = self.title_line.captures(line)?;
        Some(captures.get(1)?.as_str())
    }

    fn title_line_offset(&self) -> usize {
        TITLE_LINE_OFFSET
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterExtraction {
    pub chapters: Vec<ChapterRecord>,
    pub marker_lines: usize,
    pub title_lines: usize,
}

impl ChapterExtraction {
    pub fn require_chapters(self) -> Result<Vec<ChapterRecord>, ChapterError> {
        if !self.chapters.is_empty() {
            return Ok(self.chapters);
        }

        if self.marker_lines == 0 {
            Err(ChapterError::NoChapterMarkers)
        } else {
            Err(ChapterError::NoAlignedChapters {
                markers: self.marker_lines,
            })
        }
    }
}

#[derive(Debug)]
pub struct ChapterExtractor<L = FfprobeLayout> {
    layout: L,
}

impl ChapterExtractor<FfprobeLayout> {
    pub fn ffprobe() -> Result<Self> {
        Ok(Self::new(FfprobeLayout::new()?))
    }
}

impl<L: ProbeLayout> ChapterExtractor<L> {
    pub fn new(layout: L) -> Self {
        Self { layout }
    }

    /// A span line only becomes a chapter when a title line sits exactly
    /// `title_line_offset` lines below it. Adjacent chapters must share their
    /// boundary verbatim.
    pub fn parse(&self, text: &str) -> Result<ChapterExtraction, ChapterError> {
        let offset = self.layout.title_line_offset();
        let mut titles: HashMap<usize, String> = HashMap::new();
        let mut spans: BTreeMap<usize, (&str, &str)> = BTreeMap::new();
        let mut title_lines = 0usize;

        for (position, line) in text.lines().enumerate() {
            if let Some((start, end)) = self.layout.chapter_span(line) {
                spans.insert(position, (start, end));
            } else if let Some(title) = self.layout.chapter_title(line) {
                title_lines += 1;
                if let Some(anchor) = position.checked_sub(offset) {
                    titles.insert(anchor, normalize_title(title));
                }
            }
        }

        let mut chapters = Vec::new();
        for (position, (start_raw, end_raw)) in &spans {
            let Some(title) = titles.remove(position) else {
                continue;
            };

            let start = parse_timestamp(start_raw, *position)?;
            let end = parse_timestamp(end_raw, *position)?;
            if start.seconds() >= end.seconds() {
                return Err(ChapterError::InvalidSpan {
                    title,
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }

            chapters.push(ChapterRecord {
                index: chapters.len(),
                title,
                start,
                end,
            });
        }

        ensure_contiguous(&chapters)?;

        Ok(ChapterExtraction {
            chapters,
            marker_lines: spans.len(),
            title_lines,
        })
    }
}

fn parse_timestamp(raw: &str, position: usize) -> Result<Timestamp, ChapterError> {
    Timestamp::parse(raw).ok_or_else(|| ChapterError::InvalidTimestamp {
        value: raw.to_string(),
        line: position + 1,
    })
}

fn ensure_contiguous(chapters: &[ChapterRecord]) -> Result<(), ChapterError> {
    for pair in chapters.windows(2) {
        if pair[0].end != pair[1].start {
            return Err(ChapterError::NotContiguous {
                end: pair[0].end.to_string(),
                next_start: pair[1].start.to_string(),
            });
        }
    }
    Ok(())
}
