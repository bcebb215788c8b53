//! H.264 RTP media transport: packetization and reassembly.
//!
//! This crate is the wire layer of the screenlink pipeline. The send
//! side turns Annex-B NAL units into RTP packets (single NAL or FU-A
//! fragmented, RFC 6184); the receive side validates inbound datagrams,
//! reassembles fragments, groups NALs into access units by timestamp,
//! and repairs keyframes that arrive without parameter sets.
//!
//! Entry points return typed outcomes and errors instead of logging;
//! the pipeline layer decides sink and severity.

mod assembler;
mod depacketizer;
mod error;
mod nal;
mod packet;
mod packetizer;

pub use assembler::{AccessUnit, FrameAssembler, ParameterSetCache};
pub use depacketizer::{H264Depacketizer, PacketOutcome, TimedNal};
pub use error::RtpError;
pub use nal::{parse_annex_b, NalUnit, NalUnitType, NAL_TYPE_FU_A, START_CODE};
pub use packet::{RtpHeader, RtpPacket, RTP_HEADER_LEN};
pub use packetizer::H264Packetizer;

/// RTP payload type for dynamically-assigned H.264 video (RFC 3551).
pub const H264_PAYLOAD_TYPE: u8 = 96;

/// RTP clock rate for video, in Hz (RFC 6184 §8.1).
pub const VIDEO_CLOCK_RATE: u32 = 90_000;

/// Default maximum RTP payload size in bytes.
///
/// Keeps packets under a common 1500-byte path MTU after RTP, UDP, and
/// IP overhead.
pub const DEFAULT_MAX_PAYLOAD: usize = 1100;

/// Result type for RTP operations.
pub type RtpResult<T> = Result<T, RtpError>;
