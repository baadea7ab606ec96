//! Error types for the choropleth_extract library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for choropleth_extract operations
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Error types for legend interpretation and dataset assembly
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Image file could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoad {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The swatch scan left the image before finding a color change
    #[error("No swatch found for legend token '{token}': {reason}")]
    SwatchNotFound { token: String, reason: String },

    /// A map has no legend entry that can produce a value
    #[error("Map '{file_name}' has no usable legend entries")]
    EmptyLegend { file_name: String },

    /// A tabular artifact does not match its schema
    #[error("Schema mismatch in {artifact}: {message}")]
    Schema { artifact: String, message: String },

    /// CSV reading or writing failed
    #[error("CSV error in {artifact}")]
    Csv {
        artifact: String,
        #[source]
        source: csv::Error,
    },

    /// Filesystem access failed
    #[error("I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// An external model (classifier, segmenter, OCR) failed for one map
    #[error("{stage} failed: {message}")]
    Collaborator { stage: String, message: String },

    /// Generic processing error
    #[error("Processing error: {0}")]
    Processing(String),
}

impl ExtractionError {
    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoad {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a CSV error tagged with the artifact it came from
    pub fn csv(artifact: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            artifact: artifact.into(),
            source,
        }
    }

    /// Create an I/O error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn schema(artifact: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            artifact: artifact.into(),
            message: message.into(),
        }
    }

    pub fn collaborator(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Check if this error only affects one legend entry or one map.
    ///
    /// Recoverable errors are logged and skipped; the batch keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExtractionError::SwatchNotFound { .. }
                | ExtractionError::EmptyLegend { .. }
                | ExtractionError::Collaborator { .. }
                | ExtractionError::ImageLoad { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            ExtractionError::ImageLoad { .. } => {
                "Could not load the map image. Please check the file format and try again."
                    .to_string()
            }
            ExtractionError::SwatchNotFound { token, .. } => {
                format!("Could not find the legend color next to '{}'.", token)
            }
            ExtractionError::EmptyLegend { file_name } => {
                format!("No legend values could be read from '{}'.", file_name)
            }
            ExtractionError::Schema { artifact, .. } | ExtractionError::Csv { artifact, .. } => {
                format!("The file '{}' is not in the expected format.", artifact)
            }
            _ => "Map processing failed. Please try with a different image.".to_string(),
        }
    }
}
