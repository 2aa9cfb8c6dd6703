use std::io;

use thiserror::Error;

/// Fatal problems found while loading or summarising a feature.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("I/O error reading feature: {0}")]
    Io(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("feature is not a JSON object")]
    NotAnObject,

    #[error("unexpected GeoJSON type {0:?}, expected \"Feature\"")]
    NotAFeature(String),

    #[error("feature has no properties object")]
    MissingProperties,

    #[error("missing or invalid property {0}")]
    InvalidProperty(&'static str),
}

/// Non-fatal findings. A feature with warnings is still loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureWarning {
    #[error("missing property {0}")]
    MissingProperty(&'static str),

    #[error("missing geometry")]
    MissingGeometry,
}

/// Failures while writing the footer and releasing the sink.
///
/// The close is attempted even when the footer write fails, so both can be
/// set at once.
#[derive(Debug, Error)]
#[error("{}", describe_finalize(.footer, .close))]
pub struct FinalizeError {
    pub footer: Option<io::Error>,
    pub close: Option<io::Error>,
}

fn describe_finalize(footer: &Option<io::Error>, close: &Option<io::Error>) -> String {
    match (footer, close) {
        (Some(f), Some(c)) => format!("failed to write footer: {f}; failed to close sink: {c}"),
        (Some(f), None) => format!("failed to write footer: {f}"),
        (None, Some(c)) => format!("failed to close sink: {c}"),
        (None, None) => "finalize failed".to_string(),
    }
}

/// Which lifecycle step an [`EncoderError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Opening write failed, no encoder exists.
    Construction,
    /// One feature was lost, the stream continues.
    Encode,
    /// Footer or close failed, the stream is over.
    Finalize,
}

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("failed to write feature collection header: {0}")]
    Open(#[source] io::Error),

    #[error("failed to encode feature: {0}")]
    Feature(#[from] FeatureError),

    #[error("failed to write feature: {0}")]
    Write(#[source] io::Error),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),

    #[error("encoder is closed")]
    Closed,
}

impl EncoderError {
    pub fn phase(&self) -> ErrorPhase {
        match self {
            EncoderError::Open(_) => ErrorPhase::Construction,
            EncoderError::Feature(_) | EncoderError::Write(_) | EncoderError::Closed => {
                ErrorPhase::Encode
            }
            EncoderError::Finalize(_) => ErrorPhase::Finalize,
        }
    }
}
