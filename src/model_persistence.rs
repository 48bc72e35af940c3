//! Detector artifact persistence
//!
//! The fitted detector (scaler parameters, reference points, threshold) is
//! saved as one aprender `.apr` file together with metadata describing how it
//! was trained. The file is written to a temporary sibling and renamed into
//! place, so readers never observe a partial artifact.
//!
//! Artifacts carry a format version and the feature list; loading rejects
//! either mismatch instead of silently scoring with the wrong features.

use crate::dataset::FEATURE_COLUMNS;
use crate::detector::FittedDetector;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bumped whenever the serialized layout or the feature set changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Errors that can occur during model persistence operations
#[derive(Error, Debug)]
pub enum ModelPersistenceError {
    #[error("Failed to save model: {0}")]
    SaveError(String),

    #[error("Failed to load model: {0}")]
    LoadError(String),

    #[error("Model file not found: {0}")]
    FileNotFound(String),

    #[error("Model version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: String, found: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for model persistence operations
pub type Result<T> = std::result::Result<T, ModelPersistenceError>;

/// Metadata for a persisted detector
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelMetadata {
    /// Crate version that created this model
    pub crate_version: String,
    /// Artifact layout version
    pub format_version: u32,
    /// When the model was trained (seconds since the Unix epoch)
    pub trained_at: String,
    /// Number of samples used for training
    pub training_samples: usize,
    /// Feature columns, in vector order
    pub features: Vec<String>,
    /// SHA-256 of the training dataset file
    pub dataset_sha256: Option<String>,
    /// Model-specific hyperparameters
    pub hyperparameters: HashMap<String, String>,
    /// Optional description
    pub description: Option<String>,
}

impl ModelMetadata {
    /// Create new metadata with current timestamp
    pub fn new(training_samples: usize) -> Self {
        Self {
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at: unix_timestamp(),
            training_samples,
            features: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            dataset_sha256: None,
            hyperparameters: HashMap::new(),
            description: None,
        }
    }

    /// Add a hyperparameter
    pub fn with_hyperparameter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.hyperparameters.insert(key.into(), value.to_string());
        self
    }

    /// Record the training dataset fingerprint
    pub fn with_dataset_sha256(mut self, sha: impl Into<String>) -> Self {
        self.dataset_sha256 = Some(sha.into());
        self
    }

    /// Add a description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", duration.as_secs())
}

/// Detector plus metadata, the unit written to disk
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectorArtifact {
    pub detector: FittedDetector,
    pub metadata: ModelMetadata,
}

/// Options for saving models
#[derive(Debug, Clone)]
pub struct PersistenceOptions {
    /// Enable compression (default: true)
    pub compress: bool,
    /// Model name
    pub name: Option<String>,
    /// Model description
    pub description: Option<String>,
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        Self {
            compress: true,
            name: None,
            description: None,
        }
    }
}

impl PersistenceOptions {
    /// Create new options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set model name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set model description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Save a detector artifact to .apr format
pub fn save_detector(
    artifact: &DetectorArtifact,
    path: impl AsRef<Path>,
    options: PersistenceOptions,
) -> Result<()> {
    use aprender::format::{save, Compression, ModelType, SaveOptions};

    let compression = if options.compress {
        Compression::ZstdDefault
    } else {
        Compression::None
    };

    let mut save_options = SaveOptions::new().with_compression(compression);

    if let Some(name) = options.name {
        save_options = save_options.with_name(name);
    }
    if let Some(desc) = options.description {
        save_options = save_options.with_description(desc);
    }

    let path = path.as_ref();
    let staging = staging_path(path);

    if let Err(e) = save(artifact, ModelType::Custom, &staging, save_options) {
        let _ = std::fs::remove_file(&staging);
        return Err(ModelPersistenceError::SaveError(e.to_string()));
    }
    std::fs::rename(&staging, path)?;

    tracing::info!(
        path = %path.display(),
        reference_points = artifact.detector.reference_points.len(),
        "Saved detector artifact"
    );
    Ok(())
}

/// Load a detector artifact from .apr format, checking version and features
pub fn load_detector(path: impl AsRef<Path>) -> Result<DetectorArtifact> {
    use aprender::format::{load, ModelType};

    if !path.as_ref().exists() {
        return Err(ModelPersistenceError::FileNotFound(
            path.as_ref().display().to_string(),
        ));
    }

    let artifact = load::<DetectorArtifact>(path.as_ref(), ModelType::Custom)
        .map_err(|e| ModelPersistenceError::LoadError(e.to_string()))?;

    check_compatible(&artifact.metadata)?;
    Ok(artifact)
}

fn check_compatible(metadata: &ModelMetadata) -> Result<()> {
    if metadata.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(ModelPersistenceError::VersionMismatch {
            expected: ARTIFACT_FORMAT_VERSION.to_string(),
            found: metadata.format_version.to_string(),
        });
    }

    let expected: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
    if metadata.features != expected {
        return Err(ModelPersistenceError::VersionMismatch {
            expected: format!("features {:?}", expected),
            found: format!("features {:?}", metadata.features),
        });
    }

    Ok(())
}

/// Generate a status line for model information
pub fn model_status_line(metadata: &ModelMetadata) -> String {
    format!(
        "model: phantom-jam v{} (format {}), trained with {} samples",
        metadata.crate_version, metadata.format_version, metadata.training_samples
    )
}
