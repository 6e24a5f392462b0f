//! # Click log merger
//!
//! Every annotation session writes its own `bey_viewer_*.log`. The merger folds them
//! into the single deduplicated `master_log.txt` read by the table builder.
//!
//! Rules
//! -----------------
//! * Lines keep their **first-seen** order across files (files are read in the order
//!   given; [`find_click_logs`] sorts them by name).
//! * Duplicates are removed by **exact text**: `A 1 2` and `A 1.0 2.0` are two entries.
//!   The line terminator is not part of the text.
//! * Lines containing the `None` marker and blank lines are dropped.
use std::{collections::HashSet, io::Write};

use ahash::RandomState;
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use log::info;

use crate::{
    constants::{CLICK_LOG_PREFIX, NULL_MARKER},
    pipeline_errors::PipelineError,
};

/// Accumulates the distinct lines of several click logs.
#[derive(Debug, Default, Clone)]
pub struct LogMerger {
    lines: Vec<String>,
    seen: HashSet<String, RandomState>,
}

impl LogMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the lines of `content`, skipping duplicates and null-marked lines.
    ///
    /// Return
    /// ----------
    /// * The number of lines actually added.
    pub fn add_content(&mut self, content: &str) -> usize {
        let before = self.lines.len();

        for line in content.lines() {
            if line.trim().is_empty() || line.contains(NULL_MARKER) {
                continue;
            }
            if self.seen.insert(line.to_string()) {
                self.lines.push(line.to_string());
            }
        }

        self.lines.len() - before
    }

    /// Read one log file and add its lines.
    pub fn read_log(&mut self, path: &Utf8Path) -> Result<usize, PipelineError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| PipelineError::UnreadableFile {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(self.add_content(&content))
    }

    /// Distinct lines in first-seen order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Write the merged lines, one per line, replacing `out_file`.
    pub fn write_master_log(&self, out_file: &Utf8Path) -> Result<(), PipelineError> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(out_file)?);
        for line in &self.lines {
            writeln!(file, "{line}")?;
        }
        file.flush()?;
        Ok(())
    }
}

/// List the `bey_viewer*.log` files of `dir`, sorted by file name.
pub fn find_click_logs(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, PipelineError> {
    let mut logs = Vec::new();

    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        let name = entry.file_name();
        if name.starts_with(CLICK_LOG_PREFIX) && name.ends_with(".log") && entry.path().is_file() {
            logs.push(entry.path().to_path_buf());
        }
    }

    Ok(logs.into_iter().sorted().collect())
}

/// Merge the given logs into a [`LogMerger`].
///
/// A log that cannot be read fails the merge: a silently missing session would drop
/// its clicks from the table.
pub fn merge_logs<P: AsRef<Utf8Path>>(paths: &[P]) -> Result<LogMerger, PipelineError> {
    let mut merger = LogMerger::new();
    for path in paths {
        let added = merger.read_log(path.as_ref())?;
        info!("{}: {added} new clicks", path.as_ref());
    }
    Ok(merger)
}

/// Discover the click logs of `dir`, merge them and write `out_file`.
pub fn merge_log_dir(dir: &Utf8Path, out_file: &Utf8Path) -> Result<LogMerger, PipelineError> {
    let logs = find_click_logs(dir)?;
    info!("Merging {} click logs from {dir}", logs.len());

    let merger = merge_logs(&logs)?;
    merger.write_master_log(out_file)?;
    info!("Wrote {} distinct clicks to {out_file}", merger.len());
    Ok(merger)
}
