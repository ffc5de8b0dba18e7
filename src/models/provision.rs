//! Model artifact provisioning.
//!
//! Weights live under `models/<channels>/<model type>/`. They are downloaded
//! when either weight file is missing or when an update is forced; otherwise
//! the local copies are reused and no request is made. Download URLs come from
//! a YAML manifest keyed by channel set, model type and artifact kind:
//!
//! ```yaml
//! rybg:
//!   mae_contrast_supcon_model:
//!     classifier: https://example.org/rybg/mae/classifier.pth
//!     encoder: https://example.org/rybg/mae/encoder.pth
//! ```

use crate::core::constants::{CLASSIFIER_FILE, ENCODER_FILE, MODEL_CONFIG_FILE};
use crate::core::config::is_blank_yaml;
use crate::core::{ProcessingStage, RunConfig, SubCellError, SubCellResult};
use crate::processors::ChannelSet;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Local locations of one model's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    /// Directory holding the artifacts.
    pub dir: PathBuf,
    /// Encoder weights.
    pub encoder: PathBuf,
    /// Classifier weights.
    pub classifier: PathBuf,
    /// Model configuration.
    pub model_config: PathBuf,
}

impl ModelPaths {
    /// Computes the artifact paths for a channel set and model type.
    pub fn new(models_dir: &Path, channels: &ChannelSet, model_type: &str) -> Self {
        let dir = models_dir.join(channels.to_string()).join(model_type);
        Self {
            encoder: dir.join(ENCODER_FILE),
            classifier: dir.join(CLASSIFIER_FILE),
            model_config: dir.join(MODEL_CONFIG_FILE),
            dir,
        }
    }

    /// Path of the given weight artifact.
    pub fn artifact(&self, artifact: Artifact) -> &Path {
        match artifact {
            Artifact::Classifier => &self.classifier,
            Artifact::Encoder => &self.encoder,
        }
    }

    /// Returns true if both weight files exist.
    pub fn weights_present(&self) -> bool {
        self.encoder.is_file() && self.classifier.is_file()
    }
}

/// A downloadable weight file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Classifier,
    Encoder,
}

impl Artifact {
    /// Download order.
    pub const ALL: [Artifact; 2] = [Artifact::Classifier, Artifact::Encoder];

    /// Key of this artifact in the URL manifest.
    pub fn key(self) -> &'static str {
        match self {
            Artifact::Classifier => "classifier",
            Artifact::Encoder => "encoder",
        }
    }

    /// Local file name of this artifact.
    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Classifier => CLASSIFIER_FILE,
            Artifact::Encoder => ENCODER_FILE,
        }
    }
}

/// Download URLs keyed by channel set, model type and artifact kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct UrlManifest(BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>);

impl UrlManifest {
    /// Reads a URL manifest from a YAML file.
    pub fn from_file(path: &Path) -> SubCellResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SubCellError::io("read model URL manifest", path, e))?;
        Self::from_yaml_str(&contents).map_err(|e| SubCellError::yaml(path, e))
    }

    /// Parses a URL manifest from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        if is_blank_yaml(contents) {
            return Ok(Self::default());
        }
        let manifest: Option<Self> = serde_yaml::from_str(contents)?;
        Ok(manifest.unwrap_or_default())
    }

    /// Looks up the URL of one artifact.
    pub fn url(&self, channels: &str, model_type: &str, artifact: Artifact) -> SubCellResult<&str> {
        self.0
            .get(channels)
            .and_then(|types| types.get(model_type))
            .and_then(|artifacts| artifacts.get(artifact.key()))
            .map(String::as_str)
            .ok_or_else(|| {
                SubCellError::config_error(format!(
                    "no {} URL for channels '{}' and model type '{}'",
                    artifact.key(),
                    channels,
                    model_type
                ))
            })
    }
}

/// Status and body of an artifact download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body. Only read for successful responses.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Only a plain 200 counts as a usable artifact.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Retrieves artifact bytes from a URL.
pub trait ArtifactFetcher {
    /// Performs one request. Transport failures are errors; HTTP error
    /// statuses are returned as responses.
    fn fetch(&self, url: &str) -> SubCellResult<FetchResponse>;
}

/// Blocking HTTP fetcher without a request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> SubCellResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| {
                SubCellError::processing_error(
                    ProcessingStage::Provisioning,
                    "building the HTTP client",
                    e,
                )
            })?;
        Ok(Self { client })
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> SubCellResult<FetchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| SubCellError::http(url, e))?;
        let status = response.status().as_u16();
        let body = if status == 200 {
            response
                .bytes()
                .map_err(|e| SubCellError::http(url, e))?
                .to_vec()
        } else {
            Vec::new()
        };
        Ok(FetchResponse { status, body })
    }
}

/// What provisioning did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Both weight files were present and no update was requested.
    Reused,
    /// A download round was performed.
    Downloaded {
        /// Artifacts written to disk.
        updated: Vec<Artifact>,
        /// Artifacts whose URL did not answer with 200.
        not_found: Vec<Artifact>,
    },
}

/// Ensures the model artifacts for `config` exist locally.
///
/// A non-200 response logs a warning and leaves any existing file in place, so
/// a failed download only surfaces later when the model is loaded.
pub fn provision(
    config: &RunConfig,
    fetcher: &dyn ArtifactFetcher,
) -> SubCellResult<(ModelPaths, ProvisionOutcome)> {
    let paths = ModelPaths::new(
        &config.models_dir,
        &config.model_channels,
        &config.model_type,
    );

    if paths.weights_present() && !config.update_model {
        return Ok((paths, ProvisionOutcome::Reused));
    }

    info!("- Downloading models...");
    let manifest = UrlManifest::from_file(&config.urls_manifest)?;
    let channels = config.model_channels.to_string();

    let mut updated = Vec::new();
    let mut not_found = Vec::new();
    for artifact in Artifact::ALL {
        let url = manifest.url(&channels, &config.model_type, artifact)?;
        let response = fetcher.fetch(url)?;
        if response.is_ok() {
            let target = paths.artifact(artifact);
            std::fs::create_dir_all(&paths.dir)
                .map_err(|e| SubCellError::io("create model directory", &paths.dir, e))?;
            std::fs::write(target, &response.body)
                .map_err(|e| SubCellError::io("write", target, e))?;
            info!("  - {} updated.", artifact.file_name());
            updated.push(artifact);
        } else {
            warn!("  - {} url not found.", artifact.file_name());
            debug!(url, status = response.status, "artifact download rejected");
            not_found.push(artifact);
        }
    }

    Ok((paths, ProvisionOutcome::Downloaded { updated, not_found }))
}
