//! # Records: clicks, candidate stars and exposure metadata
//!
//! Typed records for the three inputs joined by the table builder, plus the readers
//! that turn the plain-text files of the study into grouped collections.
//!
//! Modules
//! -----------------
//! * [`click_reader`](crate::records::click_reader) – `object_id x y` click logs → [`ClickSet`](crate::constants::ClickSet).
//! * [`candidate_reader`](crate::records::candidate_reader) – `_2PH.uvrd` photometry files → [`CandidateSet`](crate::constants::CandidateSet).
//! * [`metadata`](crate::records::metadata) – filter / exposure time lookup behind the [`MetadataSource`](crate::records::metadata::MetadataSource) trait.
//!
//! Error policy
//! -----------------
//! * A malformed **click** line is skipped with a warning; the rest of the log is kept.
//! * A malformed **candidate** line fails the whole exposure, since a partial star list
//!   would silently bias the table.
use thiserror::Error;

use crate::{
    constants::{Pixel, Rootname, MAGNITUDE_COLUMN, NULL_MARKER},
    coordinates::{ImagePoint, PhysicalPoint},
};

pub mod candidate_reader;
pub mod click_reader;
pub mod metadata;

/// Line-level parsing errors for the plain-text inputs.
///
/// Variants
/// -----------------
/// * `NullMarker` – The line carries the `None` token written by the annotation tool.
/// * `WrongFieldCount` – Not enough (or too many) whitespace-separated fields.
/// * `InvalidNumber` – A coordinate field could not be parsed as a float; payload carries the field.
/// * `InvalidFlag` – An anomaly flag column holds something other than `0`, `1` or nothing.
#[derive(Error, Debug, PartialEq)]
pub enum ParseRecordError {
    #[error("The line contains the null marker")]
    NullMarker,
    #[error("Expected {expected} fields, found {found}")]
    WrongFieldCount { expected: usize, found: usize },
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Invalid value {value:?} for flag {column}")]
    InvalidFlag { column: String, value: String },
}

fn parse_pixel(field: &str) -> Result<Pixel, ParseRecordError> {
    field
        .parse::<Pixel>()
        .map_err(|_| ParseRecordError::InvalidNumber(field.to_string()))
}

/// One manual click on a bey frame, in image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickRecord {
    pub object_id: Rootname,
    pub image_x: Pixel,
    pub image_y: Pixel,
}

impl ClickRecord {
    pub fn new(object_id: impl Into<Rootname>, image_x: Pixel, image_y: Pixel) -> Self {
        ClickRecord {
            object_id: object_id.into(),
            image_x,
            image_y,
        }
    }

    /// Parse one `object_id x y` line of a click log.
    ///
    /// Return
    /// ----------
    /// * The parsed click, or a [`ParseRecordError`] if the line has the null marker,
    ///   a field count other than three, or a non-numeric coordinate.
    pub fn from_line(line: &str) -> Result<Self, ParseRecordError> {
        if line.contains(NULL_MARKER) {
            return Err(ParseRecordError::NullMarker);
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(ParseRecordError::WrongFieldCount {
                expected: 3,
                found: fields.len(),
            });
        }

        Ok(ClickRecord {
            object_id: fields[0].to_string(),
            image_x: parse_pixel(fields[1])?,
            image_y: parse_pixel(fields[2])?,
        })
    }

    pub fn image_point(&self) -> ImagePoint {
        ImagePoint::new(self.image_x, self.image_y)
    }
}

/// A cataloged star near an artifact, in physical coordinates.
///
/// The magnitude is kept as written in the photometry file and copied verbatim
/// into the output table.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateStar {
    pub object_id: Rootname,
    pub catalog_x: Pixel,
    pub catalog_y: Pixel,
    pub magnitude: String,
}

impl CandidateStar {
    pub fn new(
        object_id: impl Into<Rootname>,
        catalog_x: Pixel,
        catalog_y: Pixel,
        magnitude: impl Into<String>,
    ) -> Self {
        CandidateStar {
            object_id: object_id.into(),
            catalog_x,
            catalog_y,
            magnitude: magnitude.into(),
        }
    }

    /// Parse one line of a `_2PH.uvrd` file.
    ///
    /// Columns `0` and `1` hold the physical x/y position, column `6` the magnitude.
    /// Any extra column is ignored.
    pub fn from_line(object_id: &str, line: &str) -> Result<Self, ParseRecordError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() <= MAGNITUDE_COLUMN {
            return Err(ParseRecordError::WrongFieldCount {
                expected: MAGNITUDE_COLUMN + 1,
                found: fields.len(),
            });
        }

        Ok(CandidateStar {
            object_id: object_id.to_string(),
            catalog_x: parse_pixel(fields[0])?,
            catalog_y: parse_pixel(fields[1])?,
            magnitude: fields[MAGNITUDE_COLUMN].to_string(),
        })
    }

    pub fn physical_point(&self) -> PhysicalPoint {
        PhysicalPoint::new(self.catalog_x, self.catalog_y)
    }
}

/// Filter and exposure time of one exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMetadata {
    pub object_id: Rootname,
    pub filter_name: String,
    pub exposure_time: f64,
}

impl ObjectMetadata {
    pub fn new(
        object_id: impl Into<Rootname>,
        filter_name: impl Into<String>,
        exposure_time: f64,
    ) -> Self {
        ObjectMetadata {
            object_id: object_id.into(),
            filter_name: filter_name.into(),
            exposure_time,
        }
    }
}

#[cfg(test)]
mod records_test {
    use super::*;

    #[test]
    fn test_click_from_line() {
        assert_eq!(
            ClickRecord::from_line("ibcz01abq 533.25 511\n"),
            Ok(ClickRecord::new("ibcz01abq", 533.25, 511.0))
        );
        assert_eq!(
            ClickRecord::from_line("None 5 6"),
            Err(ParseRecordError::NullMarker)
        );
        assert_eq!(
            ClickRecord::from_line("ibcz01abq 533.25"),
            Err(ParseRecordError::WrongFieldCount {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            ClickRecord::from_line("ibcz01abq abc 511"),
            Err(ParseRecordError::InvalidNumber("abc".into()))
        );
    }

    #[test]
    fn test_candidate_from_line() {
        let line = "  1021.50   884.25  0.12  0.34  55  2  14.73  0.02";
        assert_eq!(
            CandidateStar::from_line("ibcz01abq", line),
            Ok(CandidateStar::new("ibcz01abq", 1021.5, 884.25, "14.73"))
        );

        assert_eq!(
            CandidateStar::from_line("ibcz01abq", "1 2 3 4 5 6"),
            Err(ParseRecordError::WrongFieldCount {
                expected: 7,
                found: 6
            })
        );
        assert_eq!(
            CandidateStar::from_line("ibcz01abq", "1 y 3 4 5 6 7"),
            Err(ParseRecordError::InvalidNumber("y".into()))
        );
    }

    #[test]
    fn test_magnitude_is_kept_verbatim() {
        let star = CandidateStar::from_line("x", "0 0 0 0 0 0 15.000").unwrap();
        assert_eq!(star.magnitude, "15.000");
    }
}
