//! # Anomaly prevalence
//!
//! Besides Dragon's Breath, the visual inspection of an image flags every anomaly and
//! known detector feature it shows. This module reduces those flags to the prevalence
//! figures of the study: the share of inspected images carrying at least one flag, and
//! the share of each flag among all flags raised.
//!
//! ## Overview
//! -----------------
//! * The flags come from a CSV export of the anomaly database, one row per inspected
//!   image, `0`/`1` (or empty) per flag column:
//!
//! ```text
//! rootname,proposal,dragons_breath,satellite_trail,persistence
//! ibcz01abq,12345,1,1,0
//! ibcz02xyq,12345,0,0,0
//! ```
//!
//! * Only images of finished proposals are counted. The proposal ids are listed one per
//!   line in [`DONE_CALS_NAME`] and [`DONE_GOS_NAME`]; a [`ProposalSet`] selects which
//!   of the two lists apply.
//! * An image raising several flags is counted once in
//!   [`AnomalyStats::images_with_flags`], and once per flag in the per-flag counts.
//! * Columns that name no known flag are ignored.
use std::{collections::BTreeMap, fmt, str::FromStr};

use ahash::AHashSet;
use camino::Utf8Path;
use log::debug;
use serde::Deserialize;
use smallvec::SmallVec;

use crate::{
    constants::{Rootname, DONE_CALS_NAME, DONE_GOS_NAME},
    pipeline_errors::PipelineError,
    records::ParseRecordError,
};

/// Anomalies recorded during the inspection.
pub const ANOMALIES: [&str; 8] = [
    "cr_shower",
    "data_transfer_error",
    "diamond",
    "dragons_breath",
    "earth_limb",
    "prominent_blobs",
    "scattered_light",
    "other",
];

/// Known detector features recorded during the inspection.
pub const KNOWN_FEATURES: [&str; 13] = [
    "calwf3_sub_error",
    "crosstalk",
    "cte_correction_error",
    "detector_filter_ghost",
    "diffraction_spike",
    "figure8_ghost",
    "fringing",
    "ir_banding",
    "persistence",
    "excessive_saturation",
    "guidestar_failure",
    "satellite_trail",
    "filter_ghost",
];

/// Which finished proposals the statistics cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProposalSet {
    Go,
    Cal,
    #[default]
    All,
}

impl ProposalSet {
    fn includes_cal(self) -> bool {
        matches!(self, ProposalSet::Cal | ProposalSet::All)
    }

    fn includes_go(self) -> bool {
        matches!(self, ProposalSet::Go | ProposalSet::All)
    }
}

impl fmt::Display for ProposalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalSet::Go => "go",
            ProposalSet::Cal => "cal",
            ProposalSet::All => "all",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ProposalSet {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "go" => Ok(ProposalSet::Go),
            "cal" => Ok(ProposalSet::Cal),
            "all" => Ok(ProposalSet::All),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown proposal set '{other}' (expected go, cal or all)"
            ))),
        }
    }
}

/// Finished proposal ids, split into calibration and GO programs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposalIds {
    set: ProposalSet,
    cal: Vec<String>,
    go: Vec<String>,
}

impl ProposalIds {
    pub fn new(set: ProposalSet, cal: Vec<String>, go: Vec<String>) -> Self {
        ProposalIds { set, cal, go }
    }

    /// Read the id lists of `set` from `dir`.
    ///
    /// Only the lists `set` needs are opened: `go` never reads [`DONE_CALS_NAME`].
    ///
    /// Return
    /// ----------
    /// * [`PipelineError::UnreadableFile`] if a needed list is missing.
    pub fn load(dir: &Utf8Path, set: ProposalSet) -> Result<Self, PipelineError> {
        let cal = if set.includes_cal() {
            read_id_list(&dir.join(DONE_CALS_NAME))?
        } else {
            Vec::new()
        };
        let go = if set.includes_go() {
            read_id_list(&dir.join(DONE_GOS_NAME))?
        } else {
            Vec::new()
        };
        Ok(ProposalIds { set, cal, go })
    }

    pub fn set(&self) -> ProposalSet {
        self.set
    }

    pub fn contains(&self, proposal: &str) -> bool {
        self.cal.iter().chain(&self.go).any(|id| id == proposal)
    }

    pub fn len(&self) -> usize {
        self.cal.len() + self.go.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_id_list(path: &Utf8Path) -> Result<Vec<String>, PipelineError> {
    let content =
        std::fs::read_to_string(path).map_err(|source| PipelineError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect())
}

/// Flags raised on one inspected image.
#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedImage {
    pub rootname: Rootname,
    pub proposal: String,
    pub flags: SmallVec<[&'static str; 4]>,
}

#[derive(Debug, Deserialize)]
struct ImageKey {
    rootname: String,
    proposal: String,
}

/// Read a headed anomaly flag export (`rootname,proposal,<flag columns>`).
pub fn read_anomaly_flags(path: &Utf8Path) -> Result<Vec<FlaggedImage>, PipelineError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    read_anomaly_flags_from(reader, path)
}

/// Same as [`read_anomaly_flags`] on an open reader; `source` only labels errors.
///
/// Return
/// ----------
/// * [`PipelineError::MalformedRecord`] when a flag cell is neither empty, `0` nor `1`.
/// * [`PipelineError::CsvError`] when `rootname` or `proposal` is missing.
pub fn read_anomaly_flags_from<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    source: &Utf8Path,
) -> Result<Vec<FlaggedImage>, PipelineError> {
    let headers = reader.headers()?.clone();
    let columns: Vec<(usize, &'static str)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            ANOMALIES
                .iter()
                .chain(KNOWN_FEATURES.iter())
                .find(|flag| **flag == name)
                .map(|flag| (i, *flag))
        })
        .collect();
    debug!("{source}: {} flag columns", columns.len());

    let mut images = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        let key: ImageKey = record.deserialize(Some(&headers))?;

        let mut flags = SmallVec::new();
        for &(i, flag) in &columns {
            match record.get(i).unwrap_or_default() {
                "" | "0" => {}
                "1" => flags.push(flag),
                value => {
                    return Err(PipelineError::MalformedRecord {
                        path: source.to_path_buf(),
                        line,
                        reason: ParseRecordError::InvalidFlag {
                            column: flag.to_string(),
                            value: value.to_string(),
                        },
                    })
                }
            }
        }

        images.push(FlaggedImage {
            rootname: key.rootname,
            proposal: key.proposal,
            flags,
        });
    }
    Ok(images)
}

/// Prevalence of anomalies and known features over the images of finished proposals.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyStats {
    proposals: ProposalSet,
    total_images: usize,
    images_with_flags: usize,
    anomalies: BTreeMap<&'static str, usize>,
    known_features: BTreeMap<&'static str, usize>,
}

impl AnomalyStats {
    /// Count the flags of `images` whose proposal is in `ids`.
    pub fn from_images(images: &[FlaggedImage], ids: &ProposalIds) -> Self {
        let mut anomalies: BTreeMap<_, _> = ANOMALIES.iter().map(|a| (*a, 0)).collect();
        let mut known_features: BTreeMap<_, _> =
            KNOWN_FEATURES.iter().map(|f| (*f, 0)).collect();
        let mut inspected = AHashSet::new();
        let mut flagged = AHashSet::new();

        for image in images.iter().filter(|i| ids.contains(&i.proposal)) {
            inspected.insert(image.rootname.as_str());
            for &flag in &image.flags {
                if let Some(count) = anomalies.get_mut(flag) {
                    *count += 1;
                } else if let Some(count) = known_features.get_mut(flag) {
                    *count += 1;
                }
                flagged.insert(image.rootname.as_str());
            }
        }

        AnomalyStats {
            proposals: ids.set(),
            total_images: inspected.len(),
            images_with_flags: flagged.len(),
            anomalies,
            known_features,
        }
    }

    pub fn total_images(&self) -> usize {
        self.total_images
    }

    /// Distinct images raising at least one flag.
    pub fn images_with_flags(&self) -> usize {
        self.images_with_flags
    }

    pub fn images_without_flags(&self) -> usize {
        self.total_images - self.images_with_flags
    }

    /// Occurrences of `flag`, whether an anomaly or a known feature. Zero for unknown names.
    pub fn count(&self, flag: &str) -> usize {
        self.anomalies
            .get(flag)
            .or_else(|| self.known_features.get(flag))
            .copied()
            .unwrap_or(0)
    }

    /// Flags raised over all images, an image with two flags counting twice.
    pub fn total_flags(&self) -> usize {
        self.anomalies.values().sum::<usize>() + self.known_features.values().sum::<usize>()
    }

    /// Percentage of images raising at least one flag, zero when nothing was inspected.
    pub fn affected_percent(&self) -> f64 {
        percent(self.images_with_flags, self.total_images)
    }

    /// Percentage of each flag among all flags raised: anomalies first, then known
    /// features, each group in name order.
    pub fn flag_percents(&self) -> Vec<(&'static str, f64)> {
        let total = self.total_flags();
        self.anomalies
            .iter()
            .chain(&self.known_features)
            .map(|(flag, &count)| (*flag, percent(count, total)))
            .collect()
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl fmt::Display for AnomalyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} images with anomalies or known features ({:.1}%)",
            self.proposals,
            self.images_with_flags,
            self.total_images,
            self.affected_percent()
        )?;

        if f.alternate() {
            let total = self.total_flags();
            for (group, counts) in [
                ("anomalies", &self.anomalies),
                ("known features", &self.known_features),
            ] {
                write!(f, "\n  {group}:")?;
                for (flag, &count) in counts.iter().filter(|&(_, &c)| c > 0) {
                    write!(
                        f,
                        "\n    {flag:<24}{count:>6}  {:>6.2}%",
                        percent(count, total)
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod anomalies_test {
    use super::*;

    const EXPORT: &str = "\
rootname,proposal,dragons_breath,satellite_trail,persistence,reviewer
ibcz01abq,12345,1,1,0,jd
ibcz02xyq,12345,0,0,,jd
ibcz03klq,12345,0,1,0,jd
ic0a01aaq,14000,1,0,1,ms
ic0a02bbq,99999,1,1,1,ms
";

    fn images() -> Vec<FlaggedImage> {
        read_anomaly_flags_from(
            csv::Reader::from_reader(EXPORT.as_bytes()),
            Utf8Path::new("flags.csv"),
        )
        .unwrap()
    }

    fn ids(set: ProposalSet) -> ProposalIds {
        let cal = if set == ProposalSet::Go { vec![] } else { vec!["14000".to_string()] };
        let go = if set == ProposalSet::Cal { vec![] } else { vec!["12345".to_string()] };
        ProposalIds::new(set, cal, go)
    }

    #[test]
    fn test_read_flags() {
        let images = images();
        assert_eq!(images.len(), 5);
        assert_eq!(images[0].rootname, "ibcz01abq");
        assert_eq!(images[0].flags.as_slice(), &["dragons_breath", "satellite_trail"]);
        assert!(images[1].flags.is_empty());
    }

    #[test]
    fn test_image_with_two_flags_counted_once() {
        let stats = AnomalyStats::from_images(&images(), &ids(ProposalSet::Go));

        assert_eq!(stats.total_images(), 3);
        assert_eq!(stats.images_with_flags(), 2);
        assert_eq!(stats.images_without_flags(), 1);
        assert_eq!(stats.count("dragons_breath"), 1);
        assert_eq!(stats.count("satellite_trail"), 2);
        assert_eq!(stats.count("persistence"), 0);
        assert_eq!(stats.count("not_a_flag"), 0);
        assert_eq!(stats.total_flags(), 3);
    }

    #[test]
    fn test_proposal_sets() {
        let images = images();

        let cal = AnomalyStats::from_images(&images, &ids(ProposalSet::Cal));
        assert_eq!(cal.total_images(), 1);
        assert_eq!(cal.images_with_flags(), 1);
        assert_eq!(cal.total_flags(), 2);

        // 99999 is not a finished proposal.
        let all = AnomalyStats::from_images(&images, &ids(ProposalSet::All));
        assert_eq!(all.total_images(), 4);
        assert_eq!(all.images_with_flags(), 3);
        assert_eq!(all.affected_percent(), 75.0);

        let percents: BTreeMap<_, _> = all.flag_percents().into_iter().collect();
        assert_eq!(percents["dragons_breath"], 40.0);
        assert_eq!(percents["satellite_trail"], 40.0);
        assert_eq!(percents["persistence"], 20.0);
        assert_eq!(percents["diamond"], 0.0);
    }

    #[test]
    fn test_display() {
        let stats = AnomalyStats::from_images(&images(), &ids(ProposalSet::Go));
        assert_eq!(
            format!("{stats}"),
            "go: 2/3 images with anomalies or known features (66.7%)"
        );

        let pretty = format!("{stats:#}");
        assert!(pretty.contains("\n  anomalies:\n    dragons_breath"));
        assert!(pretty.contains("satellite_trail              2   66.67%"));
        assert!(!pretty.contains("persistence"));
    }

    #[test]
    fn test_nothing_inspected() {
        let stats = AnomalyStats::from_images(&[], &ProposalIds::default());
        assert_eq!(stats.total_images(), 0);
        assert_eq!(stats.affected_percent(), 0.0);
    }

    #[test]
    fn test_bad_flag_value() {
        let bad = "rootname,proposal,diamond\nibcz01abq,12345,0\nibcz02xyq,12345,yes\n";
        assert_eq!(
            read_anomaly_flags_from(
                csv::Reader::from_reader(bad.as_bytes()),
                Utf8Path::new("flags.csv")
            ),
            Err(PipelineError::MalformedRecord {
                path: "flags.csv".into(),
                line: 3,
                reason: ParseRecordError::InvalidFlag {
                    column: "diamond".into(),
                    value: "yes".into(),
                },
            })
        );
    }

    #[test]
    fn test_load_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        std::fs::write(dir.join(DONE_GOS_NAME), "12345\n\n  13000 \n").unwrap();

        let go = ProposalIds::load(dir, ProposalSet::Go).unwrap();
        assert_eq!(go.len(), 2);
        assert!(go.contains("13000"));
        assert!(!go.contains("14000"));

        assert!(matches!(
            ProposalIds::load(dir, ProposalSet::All),
            Err(PipelineError::UnreadableFile { .. })
        ));
    }

    #[test]
    fn test_set_names() {
        for set in [ProposalSet::Go, ProposalSet::Cal, ProposalSet::All] {
            assert_eq!(set.to_string().parse::<ProposalSet>(), Ok(set));
        }
        assert!("both".parse::<ProposalSet>().is_err());
    }
}
