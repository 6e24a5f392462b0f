#![allow(dead_code)]

use approx::assert_relative_eq;
use camino::{Utf8Path, Utf8PathBuf};
use dragons_breath::{
    config::{MatchPolicy, PipelineConfig},
    TableRow,
};
use tempfile::TempDir;

/// A copy of `tests/data` in a temporary directory, so runs can write freely.
pub struct Workspace {
    _tmp: TempDir,
    pub root: Utf8PathBuf,
}

impl Workspace {
    pub fn from_fixtures() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap().to_path_buf();
        copy_dir(Utf8Path::new("tests/data"), &root);
        std::fs::create_dir_all(root.join("data")).unwrap();
        Workspace { _tmp: tmp, root }
    }

    pub fn config(&self, policy: MatchPolicy) -> PipelineConfig {
        PipelineConfig::builder()
            .completed_dir(self.root.join("completed"))
            .data_dir(self.root.join("data"))
            .code_dir(self.root.join("code"))
            .match_policy(policy)
            .build()
            .unwrap()
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root.join(rel)).unwrap()
    }
}

fn copy_dir(from: &Utf8Path, to: &Utf8Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in from.read_dir_utf8().unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
}

pub fn assert_click_columns(row: &TableRow, image: (f64, f64), physical: (f64, f64)) {
    assert_relative_eq!(row.image_x, image.0, epsilon = 1e-9);
    assert_relative_eq!(row.image_y, image.1, epsilon = 1e-9);
    assert_relative_eq!(row.physical_x, physical.0, epsilon = 1e-9);
    assert_relative_eq!(row.physical_y, physical.1, epsilon = 1e-9);
}
