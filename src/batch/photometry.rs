//! # Photometry stage
//!
//! Candidate stars come from an external photometry program run on each raw
//! `*_flt.fits` exposure; it writes the `<rootname>_2PH.uvrd` list next to the
//! exposure. The pipeline only drives it: the program is a [`PhotometryRunner`]
//! collaborator and [`run_photometry_batch`] fans it out over the worker pool.
use std::{future::Future, sync::Arc};

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use tokio::process::Command;

use crate::{
    batch::{run_pool, BatchReport},
    config::PipelineConfig,
    pipeline_errors::PipelineError,
};

/// Something that extracts the candidate stars of one exposure.
pub trait PhotometryRunner: Send + Sync + 'static {
    fn run(&self, image: &Utf8Path) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

/// Runs `executable <image>` as a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalPhotometry {
    executable: Utf8PathBuf,
    working_dir: Option<Utf8PathBuf>,
}

impl ExternalPhotometry {
    pub fn new(executable: impl Into<Utf8PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_dir: None,
        }
    }

    /// Run the program from `dir` (relative executables resolve against it).
    pub fn in_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The executable named by the configuration, run from the code directory.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.photometry_executable.clone()).in_dir(config.code_dir.clone())
    }

    pub fn executable(&self) -> &Utf8Path {
        &self.executable
    }
}

impl PhotometryRunner for ExternalPhotometry {
    async fn run(&self, image: &Utf8Path) -> Result<(), PipelineError> {
        let mut command = Command::new(self.executable.as_std_path());
        command.arg(image.as_std_path()).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir.as_std_path());
        }

        debug!("{} {image}", self.executable);
        let output = command.output().await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                warn!("{image}: {}", stderr.trim());
            }
            Err(PipelineError::PhotometryFailed {
                image: image.to_path_buf(),
                status: output.status.to_string(),
            })
        }
    }
}

/// Run `runner` on every image with at most `workers` in flight.
pub async fn run_photometry_batch<R: PhotometryRunner>(
    runner: Arc<R>,
    images: Vec<Utf8PathBuf>,
    workers: usize,
) -> Result<BatchReport<()>, PipelineError> {
    run_pool(images, workers, move |image| {
        let runner = Arc::clone(&runner);
        async move { runner.run(&image).await }
    })
    .await
}
