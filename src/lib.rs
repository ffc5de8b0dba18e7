//! # SubCell inference
//!
//! Batch inference for the SubCell protein localization models. Each image set
//! is a cell imaged in up to four fluorescence channels (red, yellow, blue,
//! green). The model turns the selected channels into a 1536-dimensional
//! embedding and a probability for each of 31 subcellular localization classes.
//!
//! ## Features
//!
//! - Layered configuration: defaults, command line, `config.yaml`
//! - Model weights downloaded on demand from a YAML URL manifest
//! - Grayscale channel loading with format sniffing for mislabeled files
//! - ONNX Runtime encoder and classifier sessions
//! - Top-3 class ranking, per-cell JSON outputs and an optional `result.csv`
//!
//! ## Modules
//!
//! * [`core`] - Configuration, constants, errors and logging setup
//! * [`models`] - The [`CellModel`](models::CellModel) seam, its ONNX Runtime implementation and model provisioning
//! * [`pipeline`] - Manifest reading, the result table and the batch driver
//! * [`processors`] - Channel selection, normalization and top-k ranking
//! * [`utils`] - Image loading
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use subcell_infer::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::resolve(ConfigOverlay::default(), Path::new("config.yaml"))?;
//! let fetcher = HttpFetcher::new()?;
//! let stats = run_batch(&config, &fetcher)?;
//! println!("processed {} image sets", stats.processed);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use subcell_infer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{ConfigOverlay, RunConfig, SubCellError, SubCellResult, init_tracing};
    pub use crate::models::{CellModel, HttpFetcher, OrtCellModel, Prediction};
    pub use crate::pipeline::{BatchStats, run_batch};
    pub use crate::processors::{ChannelSet, ClassRanker, ClassRanking};
}
