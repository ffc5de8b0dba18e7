//! Run configuration.
//!
//! The configuration is assembled once at startup from three layers, each
//! overriding the keys set by the previous one:
//!
//! 1. built-in defaults ([`RunConfig::default`]),
//! 2. command line flags,
//! 3. the YAML configuration file (`config.yaml`).
//!
//! Every layer above the defaults is a [`ConfigOverlay`] in which unset keys are
//! `None`, so applying an overlay only touches what it names.

use crate::core::constants::{
    DEFAULT_MODEL_CHANNELS, DEFAULT_MODEL_TYPE, DEFAULT_MODELS_DIR, DEFAULT_PATH_LIST,
    DEFAULT_RESULT_CSV, DEFAULT_URLS_MANIFEST,
};
use crate::core::{SubCellError, SubCellResult};
use crate::processors::ChannelSet;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Fully resolved settings for one batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    /// Fluorescence channels the model consumes.
    pub model_channels: ChannelSet,
    /// Model variant, e.g. `mae_contrast_supcon_model` or `vit_supcon_model`.
    pub model_type: String,
    /// Download the model artifacts even if they already exist.
    pub update_model: bool,
    /// Collect predictions and embeddings into a CSV table.
    pub create_csv: bool,
    /// Root directory of the model artifacts.
    pub models_dir: PathBuf,
    /// YAML manifest of model download URLs.
    pub urls_manifest: PathBuf,
    /// Manifest of image sets to process.
    pub path_list: PathBuf,
    /// Destination of the result table.
    pub result_csv: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model_channels: DEFAULT_MODEL_CHANNELS
                .parse()
                .unwrap_or_default(),
            model_type: DEFAULT_MODEL_TYPE.to_string(),
            update_model: false,
            create_csv: false,
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            urls_manifest: PathBuf::from(DEFAULT_URLS_MANIFEST),
            path_list: PathBuf::from(DEFAULT_PATH_LIST),
            result_csv: PathBuf::from(DEFAULT_RESULT_CSV),
        }
    }
}

/// A partial configuration layer. Unset keys leave the lower layer untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigOverlay {
    pub model_channels: Option<String>,
    pub model_type: Option<String>,
    #[serde(deserialize_with = "deserialize_boolish")]
    pub update_model: Option<bool>,
    #[serde(deserialize_with = "deserialize_boolish")]
    pub create_csv: Option<bool>,
    pub models_dir: Option<PathBuf>,
    pub urls_manifest: Option<PathBuf>,
    pub path_list: Option<PathBuf>,
    pub result_csv: Option<PathBuf>,
}

impl RunConfig {
    /// Builds the configuration from the defaults, the command line layer and
    /// the YAML file at `config_file`, in increasing precedence.
    ///
    /// # Errors
    ///
    /// Fails if the configuration file is missing or malformed, or if the
    /// resulting channel set is invalid.
    pub fn resolve(cli: ConfigOverlay, config_file: &Path) -> SubCellResult<Self> {
        let file = ConfigOverlay::from_file(config_file)?;
        let mut config = Self::default();
        config.apply(cli)?;
        config.apply(file)?;
        Ok(config)
    }

    /// Applies an overlay on top of this configuration.
    pub fn apply(&mut self, overlay: ConfigOverlay) -> SubCellResult<()> {
        if let Some(channels) = overlay.model_channels {
            self.model_channels = channels.parse()?;
        }
        if let Some(model_type) = overlay.model_type {
            if model_type.trim().is_empty() {
                return Err(SubCellError::config_error_with_context(
                    "model_type",
                    &model_type,
                    "must not be empty",
                ));
            }
            self.model_type = model_type.trim().to_string();
        }
        if let Some(update_model) = overlay.update_model {
            self.update_model = update_model;
        }
        if let Some(create_csv) = overlay.create_csv {
            self.create_csv = create_csv;
        }
        if let Some(models_dir) = overlay.models_dir {
            self.models_dir = models_dir;
        }
        if let Some(urls_manifest) = overlay.urls_manifest {
            self.urls_manifest = urls_manifest;
        }
        if let Some(path_list) = overlay.path_list {
            self.path_list = path_list;
        }
        if let Some(result_csv) = overlay.result_csv {
            self.result_csv = result_csv;
        }
        Ok(())
    }

    /// Single-line rendering of the configuration for the run log.
    pub fn summary(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

impl ConfigOverlay {
    /// Reads an overlay from a YAML file.
    ///
    /// A file that is empty or only holds comments yields an empty overlay.
    pub fn from_file(path: &Path) -> SubCellResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SubCellError::io("read configuration file", path, e))?;
        Self::from_yaml_str(&contents).map_err(|e| SubCellError::yaml(path, e))
    }

    /// Parses an overlay from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        if is_blank_yaml(contents) {
            return Ok(Self::default());
        }
        let overlay: Option<Self> = serde_yaml::from_str(contents)?;
        Ok(overlay.unwrap_or_default())
    }
}

/// Returns true if a YAML document holds nothing but comments and markers.
pub(crate) fn is_blank_yaml(contents: &str) -> bool {
    contents.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

/// Interprets boolean-like text such as `true`, `False`, `yes` or `0`.
pub fn parse_boolish(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Clap value parser for boolean-like flags.
pub fn parse_boolish_arg(value: &str) -> Result<bool, String> {
    parse_boolish(value)
        .ok_or_else(|| format!("expected a boolean (true/false), got '{value}'"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Boolish {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn deserialize_boolish<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Boolish>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Boolish::Bool(value)) => Ok(Some(value)),
        Some(Boolish::Int(value)) => Ok(Some(value != 0)),
        Some(Boolish::Text(text)) => parse_boolish(&text)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a boolean, got '{text}'"))),
    }
}
