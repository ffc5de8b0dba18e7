//! Pre- and post-processing around the model.
//!
//! * `channels` - Fluorescence channel selection
//! * `normalization` - Per-channel min-max scaling and tensor stacking
//! * `topk` - Ranking of class probabilities

pub mod channels;
mod normalization;
pub mod topk;

pub use channels::{Channel, ChannelSet};
pub use normalization::*;
pub use topk::{ClassRanker, ClassRanking};
