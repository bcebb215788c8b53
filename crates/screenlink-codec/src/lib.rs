//! Codec engine interfaces.
//!
//! The H.264 encode/decode engine is an external collaborator: this
//! crate defines the seam it plugs into without providing an
//! implementation. It holds the raw frame and decoded picture types,
//! the `VideoEncoder`/`VideoDecoder` traits, and the encoder
//! configuration.

mod error;
mod frame;

pub use error::CodecError;
pub use frame::{DecodedPicture, RawFrame};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// RTP clock rate for video, in Hz (RFC 6184 §8.1).
pub const VIDEO_CLOCK_HZ: u32 = 90_000;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Video encoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEncoderConfig {
    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Target frames per second.
    pub fps: u32,

    /// Target bitrate in kbps.
    pub bitrate_kbps: u32,

    /// Keyframe interval in frames.
    pub keyframe_interval: u32,
}

impl Default for VideoEncoderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            fps: 15,
            bitrate_kbps: 4000,
            keyframe_interval: 10,
        }
    }
}

/// One coded picture produced by the encoder.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Annex-B byte stream (start codes included; may hold several NAL
    /// units, e.g. SPS + PPS + IDR slice for a keyframe).
    pub data: Bytes,

    /// Presentation timestamp on the 90 kHz RTP clock.
    pub timestamp: u32,
}

/// Trait for video encoders.
pub trait VideoEncoder: Send {
    /// Encode one raw frame.
    ///
    /// Returns zero or more coded pictures in emission order; realtime
    /// encoders configured without B-frames return at most one.
    fn encode(&mut self, frame: &RawFrame) -> CodecResult<Vec<EncodedFrame>>;

    /// Get encoder name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Trait for video decoders.
pub trait VideoDecoder: Send {
    /// Decode one access unit (concatenated Annex-B NAL units).
    ///
    /// Returns zero or more decoded pictures; a decoder buffering for
    /// reference frames may legitimately return none.
    fn decode(&mut self, access_unit: &[u8]) -> CodecResult<Vec<DecodedPicture>>;

    /// Get decoder name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Map a frame-counter PTS to a 90 kHz RTP timestamp.
///
/// Frames are stamped `pts * (90000 / fps)`, so consecutive frames at a
/// fixed rate advance the RTP clock by a constant increment (6000 at
/// 15 fps, 3000 at 30 fps).
pub fn pts_to_rtp_timestamp(pts: u64, fps: u32) -> u32 {
    let fps = if fps > 0 { fps } else { 30 };
    (pts * u64::from(VIDEO_CLOCK_HZ / fps)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_increment_at_15fps() {
        assert_eq!(pts_to_rtp_timestamp(0, 15), 0);
        assert_eq!(pts_to_rtp_timestamp(1, 15), 6000);
        assert_eq!(pts_to_rtp_timestamp(2, 15), 12000);
    }

    #[test]
    fn timestamp_zero_fps_falls_back() {
        assert_eq!(pts_to_rtp_timestamp(1, 0), 3000);
    }

    #[test]
    fn timestamp_wraps_at_u32() {
        // Long-running sessions wrap the 32-bit RTP clock.
        let pts = (u64::from(u32::MAX) / 3000) + 2;
        let ts = pts_to_rtp_timestamp(pts, 30);
        assert!(ts < 6000);
    }

    #[test]
    fn default_config_matches_realtime_profile() {
        let config = VideoEncoderConfig::default();
        assert_eq!((config.width, config.height), (640, 360));
        assert_eq!(config.fps, 15);
        assert_eq!(config.bitrate_kbps, 4000);
    }

    #[test]
    fn picture_validation() {
        let pic = DecodedPicture {
            y: vec![0u8; 64 * 4].into(),
            u: vec![0u8; 32 * 2].into(),
            v: vec![0u8; 32 * 2].into(),
            strides: [64, 32, 32],
            width: 64,
            height: 4,
        };
        assert!(pic.is_valid());

        let truncated = DecodedPicture {
            y: vec![0u8; 16].into(),
            ..pic
        };
        assert!(!truncated.is_valid());
    }
}
