//! H.264 RTP depacketization: single-NAL passthrough and FU-A
//! reassembly (RFC 6184).

use bytes::{BufMut, Bytes, BytesMut};

use crate::nal::{NalUnit, NalUnitType, NAL_TYPE_FU_A};
use crate::packet::{RtpHeader, RTP_HEADER_LEN};
use crate::RtpResult;

/// A complete NAL unit tagged with its packet's RTP timestamp.
#[derive(Debug, Clone)]
pub struct TimedNal {
    /// The reassembled (or passed-through) NAL unit.
    pub nal: NalUnit,

    /// RTP timestamp shared by every packet of this NAL.
    pub timestamp: u32,
}

/// What became of one inbound packet.
///
/// The depacketizer reports data-path events as values instead of
/// logging them; the caller decides sink and severity.
#[derive(Debug, Clone)]
pub enum PacketOutcome {
    /// A complete NAL unit is available.
    Nal(TimedNal),

    /// A fragment was absorbed into the in-progress NAL.
    Buffering,

    /// A continuation fragment arrived out of order; the partial NAL
    /// was discarded. The next complete NAL is unaffected.
    SequenceGap {
        /// Sequence number the reassembler was waiting for.
        expected: u16,
        /// Sequence number that actually arrived.
        got: u16,
    },

    /// Packet consumed with no effect: empty payload, a continuation
    /// with no fragment in progress, or an unrecognized packetization
    /// mode (kept non-fatal for forward compatibility).
    Ignored,
}

/// In-progress FU-A reassembly state.
///
/// Armed by a fragment carrying the start bit, extended by strictly
/// in-order continuations, consumed by the end bit. A sequence gap or
/// a timestamp change discards the partial NAL; the reassembler never
/// reorders or interpolates.
#[derive(Debug, Default)]
struct FragmentState {
    buffer: BytesMut,
    expected_seq: u16,
    timestamp: u32,
    active: bool,
}

impl FragmentState {
    fn arm(&mut self, reconstructed_header: u8, chunk: &[u8], header: &RtpHeader) {
        self.buffer.clear();
        self.buffer.put_u8(reconstructed_header);
        self.buffer.put_slice(chunk);
        self.expected_seq = header.sequence.wrapping_add(1);
        self.timestamp = header.timestamp;
        self.active = true;
    }

    fn extend(&mut self, chunk: &[u8], sequence: u16) {
        self.buffer.put_slice(chunk);
        self.expected_seq = sequence.wrapping_add(1);
    }

    fn take(&mut self) -> Bytes {
        self.active = false;
        self.buffer.split().freeze()
    }

    fn abort(&mut self) {
        self.active = false;
        self.buffer.clear();
    }
}

/// Per-connection H.264 depacketizer.
///
/// Feed every inbound datagram to [`on_packet`](Self::on_packet);
/// complete NAL units come back tagged with their RTP timestamp, ready
/// for access-unit grouping.
#[derive(Debug, Default)]
pub struct H264Depacketizer {
    fragment: FragmentState,
}

impl H264Depacketizer {
    /// Create a depacketizer with no fragment in progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one inbound RTP datagram.
    ///
    /// Validates the fixed header (`NotRtp` on truncation or wrong
    /// version bits), passes single NAL units straight through, and
    /// runs the FU-A state machine for fragmented ones.
    pub fn on_packet(&mut self, datagram: &[u8]) -> RtpResult<PacketOutcome> {
        let header = RtpHeader::parse(datagram)?;
        let payload = &datagram[RTP_HEADER_LEN..];

        if payload.is_empty() {
            return Ok(PacketOutcome::Ignored);
        }

        // A fragment never spans timestamps; a new frame while one is
        // in progress means the tail of the previous NAL was lost.
        if self.fragment.active && header.timestamp != self.fragment.timestamp {
            self.fragment.abort();
        }

        let packet_type = payload[0] & 0x1F;
        match packet_type {
            1..=23 => Ok(PacketOutcome::Nal(TimedNal {
                nal: NalUnit {
                    nal_type: NalUnitType::from(payload[0]),
                    data: Bytes::copy_from_slice(payload),
                },
                timestamp: header.timestamp,
            })),
            NAL_TYPE_FU_A if payload.len() >= 2 => Ok(self.on_fragment(&header, payload)),
            // STAP-A/B, MTAP, or reserved values: modes this protocol
            // subset does not implement.
            _ => Ok(PacketOutcome::Ignored),
        }
    }

    /// True while a fragmented NAL is being accumulated.
    pub fn fragment_in_progress(&self) -> bool {
        self.fragment.active
    }

    fn on_fragment(&mut self, header: &RtpHeader, payload: &[u8]) -> PacketOutcome {
        let fu_indicator = payload[0];
        let fu_header = payload[1];
        let start = fu_header & 0x80 != 0;
        let end = fu_header & 0x40 != 0;
        let chunk = &payload[2..];

        if start {
            // Original NAL header: F/NRI from the indicator, type from
            // the FU header.
            let reconstructed = (fu_indicator & 0xE0) | (fu_header & 0x1F);
            self.fragment.arm(reconstructed, chunk, header);
        } else if self.fragment.active {
            if header.sequence != self.fragment.expected_seq {
                let expected = self.fragment.expected_seq;
                self.fragment.abort();
                return PacketOutcome::SequenceGap {
                    expected,
                    got: header.sequence,
                };
            }
            self.fragment.extend(chunk, header.sequence);
        } else {
            // Continuation with no start seen (head of the NAL lost).
            return PacketOutcome::Ignored;
        }

        if end {
            // The armed buffer always starts with the reconstructed
            // NAL header byte.
            let data = self.fragment.take();
            let nal_type = NalUnitType::from(data[0]);
            return PacketOutcome::Nal(TimedNal {
                nal: NalUnit { nal_type, data },
                timestamp: header.timestamp,
            });
        }

        PacketOutcome::Buffering
    }
}
