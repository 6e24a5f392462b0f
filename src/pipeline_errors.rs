use camino::Utf8PathBuf;
use thiserror::Error;

use crate::records::ParseRecordError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid file name pattern: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Unable to read {path}: {source}")]
    UnreadableFile {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed record at {path}:{line}: {reason}")]
    MalformedRecord {
        path: Utf8PathBuf,
        line: usize,
        reason: ParseRecordError,
    },

    #[error("No exposure metadata for rootname {0}")]
    MissingMetadata(String),

    #[error("No candidate stars loaded for rootname {0}")]
    MissingCandidates(String),

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("Source exposure not found: {0}")]
    SourceNotFound(Utf8PathBuf),

    #[error("Photometry failed on {image} with status {status}")]
    PhotometryFailed { image: Utf8PathBuf, status: String },

    #[error("Worker task failed: {0}")]
    WorkerJoinError(String),

    #[error("Unable to read the system clock: {0}")]
    ClockError(String),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::WorkerJoinError(err.to_string())
    }
}

impl From<hifitime::HifitimeError> for PipelineError {
    fn from(err: hifitime::HifitimeError) -> Self {
        PipelineError::ClockError(err.to_string())
    }
}

impl PartialEq for PipelineError {
    fn eq(&self, other: &Self) -> bool {
        use PipelineError::*;
        match (self, other) {
            // These errors are not comparable: equal when the variant matches
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (RegexError(_), RegexError(_)) => true,
            (UnreadableFile { path: a, .. }, UnreadableFile { path: b, .. }) => a == b,

            (
                MalformedRecord {
                    path: pa,
                    line: la,
                    reason: ra,
                },
                MalformedRecord {
                    path: pb,
                    line: lb,
                    reason: rb,
                },
            ) => pa == pb && la == lb && ra == rb,
            (MissingMetadata(a), MissingMetadata(b)) => a == b,
            (MissingCandidates(a), MissingCandidates(b)) => a == b,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (SourceNotFound(a), SourceNotFound(b)) => a == b,
            (
                PhotometryFailed {
                    image: ia,
                    status: sa,
                },
                PhotometryFailed {
                    image: ib,
                    status: sb,
                },
            ) => ia == ib && sa == sb,
            (WorkerJoinError(a), WorkerJoinError(b)) => a == b,
            (ClockError(a), ClockError(b)) => a == b,

            _ => false,
        }
    }
}
