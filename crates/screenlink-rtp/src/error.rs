//! Error types for the RTP layer.

use thiserror::Error;

/// Errors that can occur in the RTP layer.
///
/// All of these are per-packet or per-call: none is fatal to a
/// pipeline, and the stream self-heals on the next keyframe.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RtpError {
    /// Datagram is not an RTP packet (truncated header or wrong
    /// version bits).
    #[error("not an RTP packet: {0}")]
    NotRtp(&'static str),

    /// Caller handed the packetizer input it must reject.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}
