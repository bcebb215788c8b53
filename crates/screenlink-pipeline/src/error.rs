//! Error types for the pipeline layer.

use thiserror::Error;

use screenlink_codec::CodecError;
use screenlink_rtp::RtpError;

/// Errors that can occur while running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Codec engine failure.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// RTP layer failure.
    #[error("RTP error: {0}")]
    Rtp(#[from] RtpError),

    /// Worker thread could not be spawned.
    #[error("Worker spawn failed: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// Worker thread is no longer running.
    #[error("Worker thread unavailable")]
    WorkerUnavailable,
}
