mod common;

use common::{assert_click_columns, Workspace};
use dragons_breath::{
    analysis::read_table,
    build_master_table,
    config::MatchPolicy,
    log_merger::merge_log_dir,
    records::metadata::CsvMetadata,
    PipelineError,
};

fn merged_workspace() -> Workspace {
    let ws = Workspace::from_fixtures();
    let config = ws.config(MatchPolicy::FirstWins);
    merge_log_dir(&config.code_dir, &config.master_log_path()).unwrap();
    ws
}

#[test]
fn test_end_to_end_table() {
    let ws = merged_workspace();
    let config = ws.config(MatchPolicy::FirstWins);
    let metadata = CsvMetadata::from_path(&ws.root.join("metadata.csv")).unwrap();

    let build = build_master_table(&config, &metadata).unwrap();

    assert_eq!(
        ws.read("code/master_table.csv"),
        "X001,533,511,100,100,100,100,15,F606W,350.0\n\
         X001,-1,-1,-1,-1,900,900,12.5,F606W,350.0\n"
    );
    assert_eq!(build.rows.len(), 2);
    assert_click_columns(&build.rows[0], (533.0, 511.0), (100.0, 100.0));

    // The empty photometry list of X002 turns its click into a miss.
    assert_eq!(ws.read("code/mismatched.txt"), "X002\n");
    assert!(build.rows.iter().all(|r| r.object_id != "X002"));

    assert_eq!(build.failures.len(), 2);
    assert_eq!(
        build.failures["X003"],
        PipelineError::MissingCandidates("X003".into())
    );
    assert_eq!(
        build.failures["X004"],
        PipelineError::MissingMetadata("X004".into())
    );

    let stats = build.stats;
    assert_eq!(stats.exposures, 2);
    assert_eq!(stats.candidates, 2);
    assert_eq!(stats.clicks, 4);
    assert_eq!(stats.matched_clicks, 3);
    assert_eq!(stats.unmatched_clicks, 1);
    assert_eq!(stats.orphan_clicks, 0);
    assert_eq!(stats.collisions, 1);
    assert_eq!(stats.causing_candidates, 1);

    assert_eq!(read_table(&config.master_table_path()).unwrap(), build.rows);
}

#[test]
fn test_reject_ambiguous_drops_contested_star() {
    let ws = merged_workspace();
    let config = ws.config(MatchPolicy::RejectAmbiguous);
    let metadata = CsvMetadata::from_path(&ws.root.join("metadata.csv")).unwrap();

    let build = build_master_table(&config, &metadata).unwrap();

    // Both X001 clicks claim the same star.
    assert!(build.rows.iter().all(|r| !r.caused_artifact()));
    assert_eq!(build.stats.collisions, 1);
    assert_eq!(build.stats.causing_candidates, 0);
}

#[test]
fn test_mismatch_log_is_appended() {
    let ws = merged_workspace();
    let config = ws.config(MatchPolicy::FirstWins);
    let metadata = CsvMetadata::from_path(&ws.root.join("metadata.csv")).unwrap();

    build_master_table(&config, &metadata).unwrap();
    build_master_table(&config, &metadata).unwrap();

    assert_eq!(ws.read("code/mismatched.txt"), "X002\nX002\n");
}

#[test]
fn test_missing_master_log() {
    let ws = Workspace::from_fixtures();
    let config = ws.config(MatchPolicy::FirstWins);
    let metadata = CsvMetadata::from_path(&ws.root.join("metadata.csv")).unwrap();

    assert!(matches!(
        build_master_table(&config, &metadata),
        Err(PipelineError::UnreadableFile { .. })
    ));
}
