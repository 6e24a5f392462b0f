mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use camino::{Utf8Path, Utf8PathBuf};
use common::Workspace;
use dragons_breath::{
    batch::{
        photometry::{run_photometry_batch, PhotometryRunner},
        staging::{stage_exposures, StageOutcome},
    },
    config::MatchPolicy,
    constants::FLT_SUFFIX,
    discovery::discover_fits,
    records::metadata::{CsvMetadata, ExposureSelection},
    PipelineError,
};

/// Writes an empty candidate list next to each image, failing on names containing "bad".
#[derive(Default)]
struct FakePhotometry {
    calls: AtomicUsize,
}

impl PhotometryRunner for FakePhotometry {
    async fn run(&self, image: &Utf8Path) -> Result<(), PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.as_str().contains("bad") {
            return Err(PipelineError::PhotometryFailed {
                image: image.to_path_buf(),
                status: "exit status: 2".into(),
            });
        }
        let rootname = image
            .file_stem()
            .and_then(|s| s.strip_suffix("_flt"))
            .unwrap_or_default();
        let out = image.with_file_name(format!("{rootname}_2PH.uvrd"));
        tokio::fs::write(out, b"").await?;
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stage_then_photometry() {
    let ws = Workspace::from_fixtures();
    let config = ws.config(MatchPolicy::FirstWins);

    let archive = ws.root.join("archive");
    std::fs::create_dir_all(&archive).unwrap();
    for root in ["X001", "X002", "X003"] {
        std::fs::write(archive.join(format!("{root}_flt.fits")), b"raw").unwrap();
    }

    // X003 is too short an exposure to be selected.
    let metadata = CsvMetadata::from_path(&ws.root.join("metadata.csv")).unwrap();
    let mut sources = metadata.select(&ExposureSelection::default());
    sources.iter_mut().for_each(|p| *p = ws.root.join(&*p));
    assert_eq!(sources.len(), 2);

    let report = stage_exposures(sources, &config.data_dir, config.staging_workers)
        .await
        .unwrap();
    assert!(report.is_success());
    assert!(report
        .succeeded
        .iter()
        .all(|(_, outcome)| matches!(outcome, StageOutcome::Copied(_))));

    std::fs::write(config.data_dir.join("bad_flt.fits"), b"corrupt").unwrap();
    let images = discover_fits(&config.data_dir, FLT_SUFFIX).unwrap();
    assert_eq!(images.len(), 3);

    let runner = Arc::new(FakePhotometry::default());
    let report = run_photometry_batch(Arc::clone(&runner), images, config.photometry_workers)
        .await
        .unwrap();

    assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(
        report.failed,
        vec![(
            config.data_dir.join("bad_flt.fits"),
            PipelineError::PhotometryFailed {
                image: config.data_dir.join("bad_flt.fits"),
                status: "exit status: 2".into(),
            }
        )]
    );
    assert!(config.data_dir.join("X001_2PH.uvrd").is_file());
    assert!(config.data_dir.join("X002_2PH.uvrd").is_file());
}

#[tokio::test]
async fn test_restaging_is_a_no_op() {
    let ws = Workspace::from_fixtures();
    let config = ws.config(MatchPolicy::FirstWins);
    let source = ws.root.join("X001_flt.fits");
    std::fs::write(&source, b"raw").unwrap();

    let first = stage_exposures(vec![source.clone()], &config.data_dir, 1)
        .await
        .unwrap();
    let second = stage_exposures(vec![source.clone()], &config.data_dir, 1)
        .await
        .unwrap();

    let dest: Utf8PathBuf = config.data_dir.join("X001_flt.fits");
    assert_eq!(first.succeeded[0].1, StageOutcome::Copied(dest.clone()));
    assert_eq!(second.succeeded[0].1, StageOutcome::AlreadyPresent(dest));
}
