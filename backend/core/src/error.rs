use thiserror::Error;

/// Top-level error type for the PlateLens pipeline.
///
/// Stage failures are recorded on the run as a `RunError`; this type covers
/// what is rejected before a run starts.
#[derive(Debug, Error)]
pub enum PlateLensError {
    /// Bad or missing upload. Surfaced before any stage runs.
    #[error("{0}")]
    InvalidInput(String),

    #[error("invalid image data: {0}")]
    InvalidImage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
