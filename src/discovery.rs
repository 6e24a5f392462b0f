//! # Exposure discovery
//!
//! Exposures are identified by their HST rootname, which every product of the study
//! carries as a file name prefix: `<rootname>_bey.fits` for the annotated frames,
//! `<rootname>_flt.fits` for the calibrated exposures. This module turns a directory
//! listing into rootnames or paths.
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use regex::Regex;

use crate::{constants::Rootname, pipeline_errors::PipelineError};

/// Compile the `^<rootname>_<suffix>.fits$` pattern.
pub fn fits_pattern(suffix: &str) -> Result<Regex, PipelineError> {
    Ok(Regex::new(&format!(
        r"^(?P<root>[A-Za-z0-9]+)_{}\.fits$",
        regex::escape(suffix)
    ))?)
}

/// Extract the rootname from a file name, if it follows the pattern.
pub fn rootname_from_file_name(pattern: &Regex, file_name: &str) -> Option<Rootname> {
    pattern
        .captures(file_name)
        .and_then(|caps| caps.name("root"))
        .map(|root| root.as_str().to_string())
}

/// List the `<rootname>_<suffix>.fits` files of `dir`, sorted by path.
pub fn discover_fits(dir: &Utf8Path, suffix: &str) -> Result<Vec<Utf8PathBuf>, PipelineError> {
    let pattern = fits_pattern(suffix)?;
    let mut found = Vec::new();

    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        if rootname_from_file_name(&pattern, entry.file_name()).is_some() {
            found.push(entry.path().to_path_buf());
        }
    }

    Ok(found.into_iter().sorted().collect())
}

/// Rootnames of the `<rootname>_<suffix>.fits` files of `dir`, sorted and distinct.
pub fn discover_rootnames(dir: &Utf8Path, suffix: &str) -> Result<Vec<Rootname>, PipelineError> {
    let pattern = fits_pattern(suffix)?;

    let paths = discover_fits(dir, suffix)?;
    Ok(paths
        .iter()
        .filter_map(|p| p.file_name())
        .filter_map(|name| rootname_from_file_name(&pattern, name))
        .sorted()
        .dedup()
        .collect())
}
