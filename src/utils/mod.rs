//! Utility functions for the batch driver.

pub mod image;

pub use image::{dynamic_to_gray_array, load_gray_channel};
