//! Error types for codec operations.

use thiserror::Error;

/// Errors that can occur in a codec engine implementation.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Encoder initialization failed.
    #[error("Encoder initialization failed: {0}")]
    EncoderInit(String),

    /// Decoder initialization failed.
    #[error("Decoder initialization failed: {0}")]
    DecoderInit(String),

    /// Encoding a frame failed.
    #[error("Encoding error: {0}")]
    Encode(String),

    /// Decoding an access unit failed.
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid input data.
    #[error("Invalid input data: {0}")]
    InvalidInput(String),

    /// Codec not initialized.
    #[error("Codec not initialized")]
    NotInitialized,
}
