//! # Exposure metadata
//!
//! The table builder only needs the filter and the exposure time of each exposure.
//! Both come from the quick-look database; this module hides the database behind the
//! [`MetadataSource`] lookup trait and ships [`CsvMetadata`], backed by a CSV export
//! of the relevant columns:
//!
//! ```text
//! rootname,filter,exptime,dir
//! ibcz01abq,F606W,350.0,/archive/12345
//! ```
//!
//! The `dir` column is optional; when present it locates the raw `_flt.fits` exposure
//! used by the staging step (see [`CsvMetadata::select`]).
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::{
    constants::{MetadataSet, Rootname, FLT_SUFFIX},
    pipeline_errors::PipelineError,
    records::ObjectMetadata,
};

/// Synchronous key-value lookup of exposure metadata.
pub trait MetadataSource {
    /// Return the metadata of `rootname`, or [`PipelineError::MissingMetadata`].
    fn lookup(&self, rootname: &str) -> Result<ObjectMetadata, PipelineError>;
}

impl MetadataSource for MetadataSet {
    fn lookup(&self, rootname: &str) -> Result<ObjectMetadata, PipelineError> {
        self.get(rootname)
            .cloned()
            .ok_or_else(|| PipelineError::MissingMetadata(rootname.to_string()))
    }
}

/// Selection criteria for exposures potentially affected by Dragon's Breath.
///
/// Defaults keep long exposures (`exptime > 300 s`) taken through F606W or F814W.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureSelection {
    pub min_exposure_time: f64,
    pub filters: Vec<String>,
}

impl Default for ExposureSelection {
    fn default() -> Self {
        ExposureSelection {
            min_exposure_time: 300.0,
            filters: vec!["F606W".into(), "F814W".into()],
        }
    }
}

impl ExposureSelection {
    /// Strictly longer than the minimum exposure time, and filter in the list.
    pub fn accepts(&self, metadata: &ObjectMetadata) -> bool {
        metadata.exposure_time > self.min_exposure_time
            && self.filters.iter().any(|f| f == &metadata.filter_name)
    }
}

#[derive(Debug, Deserialize)]
struct MetadataRecord {
    rootname: String,
    filter: String,
    exptime: f64,
    #[serde(default)]
    dir: Option<String>,
}

/// Metadata loaded from a CSV export of the exposure database.
#[derive(Debug, Clone, Default)]
pub struct CsvMetadata {
    records: MetadataSet,
    dirs: MetadataDirs,
}

type MetadataDirs = std::collections::BTreeMap<Rootname, Utf8PathBuf>;

impl CsvMetadata {
    /// Read a headed CSV export (`rootname,filter,exptime[,dir]`).
    ///
    /// Return
    /// ----------
    /// * `Err(PipelineError::CsvError)` on a missing file, a missing column or a
    ///   non-numeric exposure time.
    pub fn from_path(path: &Utf8Path) -> Result<Self, PipelineError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, PipelineError> {
        let mut metadata = CsvMetadata::default();

        for result in reader.deserialize() {
            let record: MetadataRecord = result?;
            if let Some(dir) = record.dir.filter(|d| !d.is_empty()) {
                metadata
                    .dirs
                    .insert(record.rootname.clone(), Utf8PathBuf::from(dir));
            }
            metadata.records.insert(
                record.rootname.clone(),
                ObjectMetadata::new(record.rootname, record.filter, record.exptime),
            );
        }

        Ok(metadata)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Paths of the raw `_flt.fits` exposures accepted by `selection`.
    ///
    /// Exposures without a `dir` column are not locatable and are left out.
    pub fn select(&self, selection: &ExposureSelection) -> Vec<Utf8PathBuf> {
        self.records
            .values()
            .filter(|m| selection.accepts(m))
            .filter_map(|m| {
                self.dirs
                    .get(&m.object_id)
                    .map(|dir| dir.join(format!("{}_{FLT_SUFFIX}.fits", m.object_id)))
            })
            .collect()
    }
}

impl MetadataSource for CsvMetadata {
    fn lookup(&self, rootname: &str) -> Result<ObjectMetadata, PipelineError> {
        self.records.lookup(rootname)
    }
}

#[cfg(test)]
mod metadata_test {
    use super::*;

    const EXPORT: &str = "\
rootname,filter,exptime,dir
ibcz01abq,F606W,350.0,/archive/a
ibcz02xyq,F814W,300.0,/archive/b
ibcz03klq,F475W,500,/archive/c
ibcz04mnq,F814W,1200.5,
";

    fn metadata() -> CsvMetadata {
        CsvMetadata::from_reader(csv::Reader::from_reader(EXPORT.as_bytes())).unwrap()
    }

    #[test]
    fn test_lookup() {
        let metadata = metadata();
        assert_eq!(metadata.len(), 4);
        assert_eq!(
            metadata.lookup("ibcz01abq"),
            Ok(ObjectMetadata::new("ibcz01abq", "F606W", 350.0))
        );
        assert_eq!(
            metadata.lookup("nope"),
            Err(PipelineError::MissingMetadata("nope".into()))
        );
    }

    #[test]
    fn test_selection() {
        let selection = ExposureSelection::default();
        assert!(selection.accepts(&ObjectMetadata::new("a", "F606W", 300.1)));
        assert!(!selection.accepts(&ObjectMetadata::new("a", "F606W", 300.0)));
        assert!(!selection.accepts(&ObjectMetadata::new("a", "F475W", 900.0)));

        // ibcz02xyq is exactly 300 s, ibcz03klq has the wrong filter and
        // ibcz04mnq has no directory.
        assert_eq!(
            metadata().select(&selection),
            vec![Utf8PathBuf::from("/archive/a/ibcz01abq_flt.fits")]
        );
    }

    #[test]
    fn test_bad_export() {
        let bad = "rootname,filter,exptime\nibcz01abq,F606W,long\n";
        assert!(matches!(
            CsvMetadata::from_reader(csv::Reader::from_reader(bad.as_bytes())),
            Err(PipelineError::CsvError(_))
        ));
    }
}
