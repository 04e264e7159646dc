use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::model::ChapterRecord;
use crate::naming::output_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlanLine {
    pub start: String,
    pub end: String,
    pub output_name: String,
}

pub fn plan_lines(chapters: &[ChapterRecord]) -> Vec<SplitPlanLine> {
    chapters
        .iter()
        .map(|chapter| SplitPlanLine {
            start: chapter.start.as_str().to_string(),
            end: chapter.end.as_str().to_string(),
            output_name: output_name(chapter.index, &chapter.title),
        })
        .collect()
}

pub fn write_split_plan<W: Write>(writer: &mut W, chapters: &[ChapterRecord]) -> io::Result<()> {
    for line in plan_lines(chapters) {
        writeln!(writer, "{}\t{}\t{}", line.start, line.end, line.output_name)?;
    }
    writer.flush()
}

#[cfg(test)]
pub fn parse_split_plan(text: &str) -> Result<Vec<SplitPlanLine>> {
    let mut lines = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let mut fields = raw.splitn(3, '\t');
        let (Some(start), Some(end), Some(name)) = (fields.next(), fields.next(), fields.next())
        else {
            anyhow::bail!("split plan line {} is not tab-separated: {raw:?}", index + 1);
        };

        lines.push(SplitPlanLine {
            start: start.to_string(),
            end: end.to_string(),
            output_name: name.to_string(),
        });
    }

    Ok(lines)
}

// Settled by `discard` or `preserve`; dropping it unsettled removes the file.
#[derive(Debug)]
pub struct SplitPlanArtifact {
    file: NamedTempFile,
}

impl SplitPlanArtifact {
    pub fn create(chapters: &[ChapterRecord]) -> Result<Self> {
        Self::create_in(&std::env::temp_dir(), chapters)
    }

    pub fn create_in(dir: &Path, chapters: &[ChapterRecord]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("chaptersplit-plan-")
            .suffix(".txt")
            .tempfile_in(dir)
            .with_context(|| format!("failed to create split plan in {}", dir.display()))?;

        write_split_plan(&mut file, chapters)
            .with_context(|| format!("failed to write split plan: {}", file.path().display()))?;
        file.as_file()
            .sync_all()
            .with_context(|| format!("failed to sync split plan: {}", file.path().display()))?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn discard(self) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file
            .close()
            .with_context(|| format!("failed to remove split plan: {}", path.display()))
    }

    pub fn preserve(self) -> Result<PathBuf> {
        let (_file, path) = self.file.keep().context("failed to keep split plan")?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::model::Timestamp;

    fn chapter(index: usize, title: &str, start: &str, end: &str) -> ChapterRecord {
        ChapterRecord {
            index,
            title: title.to_string(),
            start: Timestamp::parse(start).expect("valid start"),
            end: Timestamp::parse(end).expect("valid end"),
        }
    }

    fn sample_chapters() -> Vec<ChapterRecord> {
        vec![
            chapter(0, "Intro", "0.0", "10.0"),
            chapter(1, "Track One", "10.0", "25.5"),
            chapter(2, "AC/DC", "25.5", "31.25"),
        ]
    }

    #[test]
    fn write_split_plan_emits_tab_separated_lines() {
        let mut buffer = Vec::new();
        write_split_plan(&mut buffer, &sample_chapters()).expect("in-memory write");

        let text = String::from_utf8(buffer).expect("utf-8 plan");
        assert_eq!(
            text,
            "0.0\t10.0\t01. Intro\n10.0\t25.5\t02. Track One\n25.5\t31.25\t03. AC_DC\n"
        );
    }

    #[test]
    fn parse_split_plan_reads_back_written_lines() {
        let chapters = sample_chapters();
        let mut buffer = Vec::new();
        write_split_plan(&mut buffer, &chapters).expect("in-memory write");

        let parsed = parse_split_plan(&String::from_utf8(buffer).expect("utf-8 plan"))
            .expect("well-formed plan");
        assert_eq!(parsed, plan_lines(&chapters));
    }

    #[test]
    fn parse_split_plan_rejects_lines_without_three_fields() {
        let error = parse_split_plan("0.0\t10.0\n").expect_err("missing name field");
        assert!(error.to_string().contains("line 1"));
    }

    #[test]
    fn artifact_discard_removes_plan_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let artifact = SplitPlanArtifact::create_in(dir.path(), &sample_chapters())
            .expect("plan artifact");
        let path = artifact.path().to_path_buf();

        let contents = fs::read_to_string(&path).expect("plan is readable before discard");
        assert!(contents.starts_with("0.0\t10.0\t01. Intro\n"));

        artifact.discard().expect("discard");
        assert!(!path.exists());
    }

    #[test]
    fn artifact_preserve_keeps_plan_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let artifact = SplitPlanArtifact::create_in(dir.path(), &sample_chapters())
            .expect("plan artifact");
        let expected = artifact.path().to_path_buf();

        let kept = artifact.preserve().expect("preserve");
        assert_eq!(kept, expected);
        assert!(kept.exists());
        assert_eq!(
            parse_split_plan(&fs::read_to_string(&kept).expect("kept plan"))
                .expect("well-formed plan")
                .len(),
            3
        );
    }

    #[test]
    fn artifact_dropped_without_decision_is_removed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = {
            let artifact = SplitPlanArtifact::create_in(dir.path(), &sample_chapters())
                .expect("plan artifact");
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
