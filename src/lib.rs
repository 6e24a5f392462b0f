//! Dragon's Breath artifact study pipeline.
//!
//! Hand-recorded clicks on annotated WFC3/UVIS frames are matched to the candidate
//! stars found by photometry, and the result is written as a master table for
//! analysis. See the module documentation for each stage.
pub mod analysis;
pub mod batch;
pub mod click_logger;
pub mod config;
pub mod constants;
pub mod coordinates;
pub mod discovery;
pub mod log_merger;
pub mod matcher;
pub mod pipeline_errors;
pub mod records;
pub mod table;

pub use config::{MatchPolicy, PipelineConfig};
pub use pipeline_errors::PipelineError;
pub use table::{build_master_table, TableRow};
