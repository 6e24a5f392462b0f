//! # Exposure staging
//!
//! Copies the selected raw exposures (see
//! [`CsvMetadata::select`](crate::records::metadata::CsvMetadata::select)) into the data
//! directory where the photometry runs. Staging is idempotent: a file whose base name
//! is already present is left untouched.
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

use crate::{
    batch::{run_pool, BatchReport},
    pipeline_errors::PipelineError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The exposure was copied to the given destination.
    Copied(Utf8PathBuf),
    /// The destination already existed; nothing was copied.
    AlreadyPresent(Utf8PathBuf),
}

impl StageOutcome {
    pub fn destination(&self) -> &Utf8Path {
        match self {
            StageOutcome::Copied(p) | StageOutcome::AlreadyPresent(p) => p,
        }
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Copied(p) => write!(f, "copied to {p}"),
            StageOutcome::AlreadyPresent(p) => write!(f, "already present at {p}"),
        }
    }
}

/// Copy one exposure into `data_dir`.
pub async fn stage_file(
    source: &Utf8Path,
    data_dir: &Utf8Path,
) -> Result<StageOutcome, PipelineError> {
    let Some(name) = source.file_name() else {
        return Err(PipelineError::SourceNotFound(source.to_path_buf()));
    };
    let destination = data_dir.join(name);

    if tokio::fs::try_exists(&destination).await? {
        debug!("{name} already staged");
        return Ok(StageOutcome::AlreadyPresent(destination));
    }
    if !tokio::fs::try_exists(source).await? {
        return Err(PipelineError::SourceNotFound(source.to_path_buf()));
    }

    tokio::fs::copy(source, &destination).await?;
    debug!("{source} -> {destination}");
    Ok(StageOutcome::Copied(destination))
}

/// Copy every exposure of `sources` into `data_dir` with at most `workers` copies in
/// flight. The data directory is created when missing.
pub async fn stage_exposures(
    sources: Vec<Utf8PathBuf>,
    data_dir: &Utf8Path,
    workers: usize,
) -> Result<BatchReport<StageOutcome>, PipelineError> {
    tokio::fs::create_dir_all(data_dir).await?;

    let data_dir = data_dir.to_path_buf();
    run_pool(sources, workers, move |source| {
        let data_dir = data_dir.clone();
        async move { stage_file(&source, &data_dir).await }
    })
    .await
}
