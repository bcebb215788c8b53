//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use screenlink_codec::VideoEncoderConfig;
use screenlink_rtp::DEFAULT_MAX_PAYLOAD;

/// Configuration for a pipeline, supplied at construction.
///
/// These are the only externally configurable numeric parameters of
/// the media layer; everything else (payload type, clock rate, wire
/// layout) is fixed by the protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Encoded width in pixels.
    pub width: u32,

    /// Encoded height in pixels.
    pub height: u32,

    /// Target frames per second.
    pub fps: u32,

    /// Target bitrate in kbps.
    pub bitrate_kbps: u32,

    /// Maximum RTP payload size in bytes; NALs above this are
    /// fragmented (FU-A).
    pub max_rtp_payload: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            fps: 15,
            bitrate_kbps: 4000,
            max_rtp_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl PipelineConfig {
    /// Derive the encoder configuration for this pipeline.
    pub fn encoder_config(&self) -> VideoEncoderConfig {
        VideoEncoderConfig {
            width: self.width,
            height: self.height,
            fps: self.fps,
            bitrate_kbps: self.bitrate_kbps,
            ..VideoEncoderConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_realtime_profile() {
        let config = PipelineConfig::default();
        assert_eq!((config.width, config.height), (640, 360));
        assert_eq!(config.fps, 15);
        assert_eq!(config.max_rtp_payload, 1100);
    }

    #[test]
    fn encoder_config_carries_pipeline_numbers() {
        let config = PipelineConfig {
            width: 1280,
            height: 720,
            fps: 30,
            bitrate_kbps: 8000,
            ..PipelineConfig::default()
        };
        let enc = config.encoder_config();
        assert_eq!((enc.width, enc.height, enc.fps), (1280, 720, 30));
        assert_eq!(enc.bitrate_kbps, 8000);
    }
}
