//! The classification and embedding model.
//!
//! The driver only needs two things from a model: load it from a model
//! directory, and turn a list of channel planes into an embedding and a class
//! probability vector. [`CellModel`] is that seam; [`OrtCellModel`] is the ONNX
//! Runtime implementation used by the binary.

mod ort_infer;
pub mod ort_model;
pub mod provision;

pub use ort_infer::OrtInfer;
pub use ort_model::OrtCellModel;
pub use provision::{ArtifactFetcher, FetchResponse, HttpFetcher, ModelPaths, UrlManifest};

use crate::core::config::is_blank_yaml;
use crate::core::constants::{NUM_CLASSES, TOP_K};
use crate::core::{ProcessingStage, SubCellError, SubCellResult};
use crate::processors::ClassRanker;
use ndarray::Array2;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Output of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Pooled feature embedding.
    pub embedding: Vec<f32>,
    /// Probability of each localization class.
    pub probabilities: Vec<f32>,
}

/// A loaded classifier+encoder model.
pub trait CellModel {
    /// Runs the model on the channel planes of one cell.
    ///
    /// `channels` are in red, yellow, blue, green order restricted to the
    /// model's channel set. `output_stem` is the path prefix for any per-cell
    /// files the model writes.
    fn run(&mut self, channels: &[Array2<f32>], output_stem: &Path) -> SubCellResult<Prediction>;
}

/// Settings read from the `model_config` section of `model_config.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Override of the localization class table.
    #[serde(default)]
    pub class_names: Option<Vec<String>>,
    /// Encoder input tensor name. Defaults to the session's first input.
    #[serde(default)]
    pub encoder_input: Option<String>,
    /// Classifier input tensor name. Defaults to the session's first input.
    #[serde(default)]
    pub classifier_input: Option<String>,
    /// Apply softmax to the classifier output.
    #[serde(default = "default_softmax")]
    pub softmax: bool,
    /// Number of threads used to parallelize execution within nodes.
    #[serde(default)]
    pub intra_threads: Option<usize>,
    /// Remaining architecture keys, kept for logging.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_softmax() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            class_names: None,
            encoder_input: None,
            classifier_input: None,
            softmax: default_softmax(),
            intra_threads: None,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Deserialize)]
struct ModelConfigFile {
    #[serde(default)]
    model_config: Option<ModelConfig>,
}

impl ModelConfig {
    /// Reads the `model_config` section of a model configuration file.
    ///
    /// A file without that section yields the default configuration.
    pub fn from_file(path: &Path) -> SubCellResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SubCellError::io("read model configuration", path, e))?;
        Self::from_yaml_str(&contents).map_err(|e| SubCellError::yaml(path, e))
    }

    /// Parses the `model_config` section from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        if is_blank_yaml(contents) {
            return Ok(Self::default());
        }
        let file: Option<ModelConfigFile> = serde_yaml::from_str(contents)?;
        Ok(file.and_then(|f| f.model_config).unwrap_or_default())
    }

    /// Builds the class ranker for this model.
    ///
    /// # Errors
    ///
    /// Fails if an overriding class table does not have one name per class.
    pub fn class_ranker(&self) -> SubCellResult<ClassRanker> {
        match &self.class_names {
            None => Ok(ClassRanker::default()),
            Some(names) if names.len() == NUM_CLASSES => ClassRanker::new(names.clone(), TOP_K),
            Some(names) => Err(SubCellError::config_error_with_context(
                "class_names",
                &names.len().to_string(),
                &format!("expected {} class names", NUM_CLASSES),
            )),
        }
    }
}

fn stem_with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Writes `<stem>_embedding.json` and `<stem>_probabilities.json`.
pub fn save_prediction(output_stem: &Path, prediction: &Prediction) -> SubCellResult<()> {
    for (suffix, values) in [
        ("_embedding.json", &prediction.embedding),
        ("_probabilities.json", &prediction.probabilities),
    ] {
        let path = stem_with_suffix(output_stem, suffix);
        let json = serde_json::to_vec(values).map_err(|e| {
            SubCellError::processing_error(
                ProcessingStage::Output,
                &format!("serializing {}", path.display()),
                e,
            )
        })?;
        std::fs::write(&path, json).map_err(|e| SubCellError::io("write", &path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_defaults_when_section_missing() {
        let config = ModelConfig::from_yaml_str("other: 1\n").unwrap();
        assert!(config.softmax);
        assert!(config.class_names.is_none());

        let config = ModelConfig::from_yaml_str("").unwrap();
        assert!(config.encoder_input.is_none());
    }

    #[test]
    fn test_model_config_keeps_architecture_keys() {
        let yaml = "model_config:\n  vit_model:\n    hidden_size: 768\n  encoder_input: pixel_values\n  softmax: false\n";
        let config = ModelConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.encoder_input.as_deref(), Some("pixel_values"));
        assert!(!config.softmax);
        assert!(config.extra.contains_key("vit_model"));
    }

    #[test]
    fn test_class_ranker_override_must_match_class_count() {
        let config = ModelConfig {
            class_names: Some(vec!["a".to_string(), "b".to_string()]),
            ..Default::default()
        };
        assert!(config.class_ranker().is_err());

        let names: Vec<String> = (0..NUM_CLASSES).map(|i| format!("loc{i}")).collect();
        let config = ModelConfig {
            class_names: Some(names),
            ..Default::default()
        };
        let ranker = config.class_ranker().unwrap();
        assert_eq!(ranker.class_name(3), Some("loc3"));
    }

    #[test]
    fn test_save_prediction_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("cell_1");
        let prediction = Prediction {
            embedding: vec![0.5, 1.5],
            probabilities: vec![0.25, 0.75],
        };
        save_prediction(&stem, &prediction).unwrap();

        let embedding: Vec<f32> = serde_json::from_slice(
            &std::fs::read(dir.path().join("cell_1_embedding.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(embedding, vec![0.5, 1.5]);
        assert!(dir.path().join("cell_1_probabilities.json").exists());
    }
}
