//! The batch pipeline.
//!
//! [`manifest`] reads the image sets to process, [`results`] accumulates the
//! optional result table and [`runner`] ties them to a provisioned model.

pub mod manifest;
pub mod results;
pub mod runner;

pub use manifest::{ManifestReader, ManifestRow};
pub use results::{ResultTable, TableSchema};
pub use runner::{BatchRunner, BatchStats, report_outcome, run_batch, run_batch_with};
