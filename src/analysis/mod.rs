//! # Master table analysis
//!
//! Read-side of the pipeline: once the master table is written, these types reduce it
//! to the figures of the study.
//!
//! ## Overview
//! -----------------
//! * [`histogram::MagnitudeHistogram`] – stars per magnitude bin, causing vs. clean.
//! * [`heatmap::HeatMap`] – where the causing stars sit on the detector.
//! * [`anomalies::AnomalyStats`] – how many inspected images show any anomaly, and the
//!   share of each one. Reads the anomaly flag export instead of the master table.
//!
//! Rendering is left to the caller: grids can be exported with
//! [`heatmap::write_grid_csv`], histograms print as a text table.
//!
//! ```rust,no_run
//! use camino::Utf8Path;
//! use dragons_breath::analysis::{read_table, heatmap::HeatMap, histogram::MagnitudeHistogram};
//!
//! let rows = read_table(Utf8Path::new("code/master_table.csv")).unwrap();
//! println!("{}", MagnitudeHistogram::from_rows(&rows));
//!
//! let ratio = HeatMap::full(&rows).binned(15).unwrap().normalized();
//! assert_eq!(ratio.nrows(), 158);
//! ```
pub mod anomalies;
pub mod heatmap;
pub mod histogram;

pub use crate::table::table_io::read_table;
