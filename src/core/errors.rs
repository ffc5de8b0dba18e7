//! Error types for the batch inference driver.
//!
//! Every fallible operation in the crate returns [`SubCellError`]. The binary
//! logs the first error it sees together with its source chain and stops the
//! batch, so error messages carry enough context to be useful on one line.

use std::path::Path;
use thiserror::Error;

/// Enum representing the stage of a batch run in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Resolving the run configuration.
    Configuration,
    /// Downloading or locating model artifacts.
    Provisioning,
    /// Reading the image-set manifest.
    Manifest,
    /// Writing result files.
    Output,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Configuration => write!(f, "configuration"),
            ProcessingStage::Provisioning => write!(f, "model provisioning"),
            ProcessingStage::Manifest => write!(f, "manifest"),
            ProcessingStage::Output => write!(f, "output"),
        }
    }
}

/// Errors that can occur while running a batch.
#[derive(Error, Debug)]
pub enum SubCellError {
    /// A channel image could not be decoded.
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        /// Path of the image that failed to load.
        path: String,
        /// The underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// A file could not be read or written.
    #[error("{context}: {source}")]
    Io {
        /// What was being done when the error occurred.
        context: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A YAML document could not be parsed.
    #[error("failed to parse {path}: {source}")]
    Yaml {
        /// Path of the YAML document.
        path: String,
        /// The underlying parser error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error indicating invalid input data.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// A processing step failed.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of the run where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error while downloading a model artifact.
    #[error("request to {url} failed: {source}")]
    Http {
        /// URL that was requested.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Error from the ONNX Runtime session.
    #[error("model '{model}' {operation} failed: {source}")]
    Inference {
        /// Which model (encoder, classifier) failed.
        model: String,
        /// The operation that failed.
        operation: String,
        /// The underlying runtime error.
        #[source]
        source: ort::Error,
    },

    /// Error from tensor shape operations.
    #[error("tensor shape: {0}")]
    Tensor(#[from] ndarray::ShapeError),

    /// Error while writing the result table.
    #[error("result table: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenient result alias used across the crate.
pub type SubCellResult<T> = Result<T, SubCellError>;

impl SubCellError {
    /// Creates an IO error annotated with the operation and path involved.
    pub fn io(action: &str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context: format!("failed to {} {}", action, path.display()),
            source,
        }
    }

    /// Creates an image load error for the given path.
    pub fn image_load(path: &Path, source: image::ImageError) -> Self {
        Self::ImageLoad {
            path: path.display().to_string(),
            source,
        }
    }

    /// Creates a YAML parse error for the given document.
    pub fn yaml(path: &Path, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.display().to_string(),
            source,
        }
    }

    /// Creates an error for configuration problems.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates an error for configuration problems tied to a specific field.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!(
                "Configuration error in field '{}' with value '{}': {}",
                field, value, reason
            ),
        }
    }

    /// Creates an error for invalid input data.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a processing error for the given stage.
    pub fn processing_error(
        kind: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for a failed HTTP request.
    pub fn http(url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            source,
        }
    }

    /// Creates an error for a failed ONNX Runtime operation.
    pub fn inference_error(model: &str, operation: &str, source: ort::Error) -> Self {
        Self::Inference {
            model: model.to_string(),
            operation: operation.to_string(),
            source,
        }
    }

    /// Returns the error message followed by every distinct source message.
    ///
    /// Variants that already embed their source in the message are not repeated.
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let text = err.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = err.source();
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_with_context_names_field() {
        let err = SubCellError::config_error_with_context("model_channels", "rxz", "bad letter");
        let message = err.to_string();
        assert!(message.contains("model_channels"));
        assert!(message.contains("rxz"));
        assert!(message.contains("bad letter"));
    }

    #[test]
    fn test_chain_message_does_not_repeat_embedded_source() {
        let err = SubCellError::io(
            "read",
            Path::new("path_list.csv"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let message = err.chain_message();
        assert_eq!(message, "failed to read path_list.csv: no such file");
    }

    #[test]
    fn test_chain_message_appends_boxed_source() {
        let err = SubCellError::processing_error(
            ProcessingStage::Output,
            "writing embedding",
            std::io::Error::other("disk full"),
        );
        let message = err.chain_message();
        assert_eq!(message, "output failed: writing embedding: disk full");
    }
}
