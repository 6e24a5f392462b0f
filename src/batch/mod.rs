//! # Batch execution over exposures
//!
//! Staging and photometry are both "run one independent job per exposure" stages.
//! They share a bounded worker pool built on the multi-threaded `tokio` runtime:
//!
//! * one task per unit, at most `workers` running at the same time (a
//!   [`tokio::sync::Semaphore`] hands out the slots),
//! * a failing unit is logged and recorded, it never cancels its siblings,
//! * results come back as a [`BatchReport`], in the order the units were given.
//!
//! ## Overview
//! -----------------
//! * [`run_pool`] – Generic driver: takes the units and an async job.
//! * [`photometry`] – The [`photometry::PhotometryRunner`] collaborator and the
//!   external-executable implementation.
//! * [`staging`] – Copies the selected raw exposures into the data directory.
//!
//! With the `progress` feature, [`run_pool`] renders a live progress bar.
//!
//! Example
//! -----------------
//! ```rust,no_run
//! use camino::Utf8PathBuf;
//! use dragons_breath::batch::run_pool;
//!
//! # async fn demo() -> Result<(), dragons_breath::pipeline_errors::PipelineError> {
//! let units = vec![Utf8PathBuf::from("a_flt.fits"), Utf8PathBuf::from("b_flt.fits")];
//! let report = run_pool(units, 4, |unit| async move { Ok(unit.as_str().len()) }).await?;
//! assert_eq!(report.succeeded.len(), 2);
//! # Ok(())
//! # }
//! ```
pub mod photometry;
#[cfg(feature = "progress")]
pub(crate) mod progress_bar;
pub mod staging;

use std::{fmt, future::Future, sync::Arc};

use camino::Utf8PathBuf;
use log::error;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::pipeline_errors::PipelineError;

/// Outcome of one batch: the units that succeeded with their value, and the units
/// that failed with their error. Both lists follow the input order.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub succeeded: Vec<(Utf8PathBuf, T)>,
    pub failed: Vec<(Utf8PathBuf, PipelineError)>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<T> fmt::Display for BatchReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Batch report")?;
            writeln!(f, "  units     : {}", self.total())?;
            writeln!(f, "  succeeded : {}", self.succeeded.len())?;
            write!(f, "  failed    : {}", self.failed.len())?;
            for (unit, err) in &self.failed {
                write!(f, "\n    {unit}: {err}")?;
            }
            Ok(())
        } else {
            write!(
                f,
                "{}/{} units succeeded",
                self.succeeded.len(),
                self.total()
            )
        }
    }
}

/// Run `job` once per unit with at most `workers` jobs in flight.
///
/// Arguments
/// -----------------
/// * `units`: the exposures to process.
/// * `workers`: the pool size, must be at least 1.
/// * `job`: the async work for one unit.
///
/// Return
/// ----------
/// * A [`BatchReport`] with one entry per unit, or
///   [`PipelineError::InvalidConfig`] for an empty pool and
///   [`PipelineError::WorkerJoinError`] if a worker task panicked.
pub async fn run_pool<T, F, Fut>(
    units: Vec<Utf8PathBuf>,
    workers: usize,
    job: F,
) -> Result<BatchReport<T>, PipelineError>
where
    T: Send + 'static,
    F: Fn(Utf8PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
{
    if workers == 0 {
        return Err(PipelineError::InvalidConfig(
            "a worker pool needs at least one worker".into(),
        ));
    }

    let slots = Arc::new(Semaphore::new(workers));
    let job = Arc::new(job);
    let total = units.len();

    #[cfg(feature = "progress")]
    let mut progress = progress_bar::BatchProgress::new(total);

    let mut tasks = JoinSet::new();
    for (index, unit) in units.into_iter().enumerate() {
        let slots = Arc::clone(&slots);
        let job = Arc::clone(&job);
        tasks.spawn(async move {
            let result = match slots.acquire_owned().await {
                Ok(_permit) => job(unit.clone()).await,
                Err(err) => Err(PipelineError::WorkerJoinError(err.to_string())),
            };
            (index, unit, result)
        });
    }

    let mut finished = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        let (index, unit, result) = joined?;
        if let Err(err) = &result {
            error!("{unit}: {err}");
        }

        #[cfg(feature = "progress")]
        progress.unit_done(&unit, result.is_ok());

        finished.push((index, unit, result));
    }

    #[cfg(feature = "progress")]
    progress.finish();

    finished.sort_by_key(|(index, _, _)| *index);

    let mut report = BatchReport::default();
    for (_, unit, result) in finished {
        match result {
            Ok(value) => report.succeeded.push((unit, value)),
            Err(err) => report.failed.push((unit, err)),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod batch_test {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    fn units(names: &[&str]) -> Vec<Utf8PathBuf> {
        names.iter().map(Utf8PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_failures_do_not_cancel_siblings() {
        let report = run_pool(units(&["a", "bad", "c"]), 2, |unit| async move {
            if unit.as_str() == "bad" {
                Err(PipelineError::SourceNotFound(unit))
            } else {
                Ok(unit.as_str().to_uppercase())
            }
        })
        .await
        .unwrap();

        assert_eq!(
            report.succeeded,
            vec![
                (Utf8PathBuf::from("a"), "A".to_string()),
                (Utf8PathBuf::from("c"), "C".to_string())
            ]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(
            report.failed[0].1,
            PipelineError::SourceNotFound(Utf8PathBuf::from("bad"))
        );
        assert!(!report.is_success());
        assert_eq!(format!("{report}"), "2/3 units succeeded");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_bound() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let names: Vec<String> = (0..12).map(|i| format!("u{i}")).collect();
        let units = names.iter().map(Utf8PathBuf::from).collect();

        let report = run_pool(units, 3, move |_| {
            let (running, peak) = (Arc::clone(&r), Arc::clone(&p));
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(report.succeeded.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_pool_rejected() {
        let res = run_pool(units(&["a"]), 0, |_| async { Ok(()) }).await;
        assert!(matches!(res, Err(PipelineError::InvalidConfig(_))));
    }
}
