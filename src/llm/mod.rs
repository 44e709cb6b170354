pub mod anthropic;
pub mod types;

use thiserror::Error;

/// Errors from the hosted inference service
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Network error talking to the inference API: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },
}
