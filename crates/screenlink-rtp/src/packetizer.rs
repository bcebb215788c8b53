//! H.264 RTP packetization (RFC 6184).

use bytes::{BufMut, Bytes, BytesMut};
use rand::RngExt;

use crate::error::RtpError;
use crate::nal::NAL_TYPE_FU_A;
use crate::packet::{RtpHeader, RtpPacket};
use crate::{RtpResult, DEFAULT_MAX_PAYLOAD, H264_PAYLOAD_TYPE};

/// Converts H.264 NAL units into RTP packets.
///
/// Two packetization modes from RFC 6184:
///
/// - **Single NAL Unit** (§5.6): a NAL no larger than the payload cap
///   travels as-is in one packet, marker bit set. Each NAL is treated
///   as self-contained, so every single-NAL packet carries the marker;
///   receivers must group frames by timestamp, not by marker.
///
/// - **FU-A fragmentation** (§5.8): a larger NAL is split across
///   packets. The original NAL header byte is stripped and each
///   fragment is prefixed with two bytes:
///
///   ```text
///   FU indicator:  [F|NRI|Type=28]     (1 byte)
///   FU header:     [S|E|R|NAL_Type]    (1 byte)
///   ```
///
///   S is set on the first fragment, E (and the marker bit) on the
///   last, R is always zero.
///
/// The sequence number advances by exactly one per emitted packet,
/// wrapping at 16 bits. All packets of one NAL share its timestamp.
/// The SSRC is fixed for the packetizer's lifetime.
#[derive(Debug)]
pub struct H264Packetizer {
    payload_type: u8,
    ssrc: u32,
    sequence: u16,
    max_payload: usize,
}

impl H264Packetizer {
    /// Create a packetizer with a random SSRC (RFC 3550 §8.1) and the
    /// default payload cap.
    pub fn new() -> Self {
        Self {
            payload_type: H264_PAYLOAD_TYPE,
            ssrc: rand::rng().random::<u32>(),
            sequence: 0,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Override the SSRC.
    pub fn with_ssrc(mut self, ssrc: u32) -> Self {
        self.ssrc = ssrc;
        self
    }

    /// Override the maximum payload size per packet.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        debug_assert!(max_payload > 2, "payload cap must exceed the FU prefix");
        self.max_payload = max_payload;
        self
    }

    /// This sender's SSRC.
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// The sequence number the next packet will carry.
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }

    /// Packetize one NAL unit (header byte + payload, no start code).
    ///
    /// Returns one packet for a NAL within the payload cap, otherwise
    /// the FU-A fragment sequence. An empty NAL is rejected before any
    /// packet is emitted.
    pub fn packetize(&mut self, nal: &[u8], timestamp: u32) -> RtpResult<Vec<RtpPacket>> {
        if nal.is_empty() {
            return Err(RtpError::InvalidInput("empty NAL unit"));
        }

        if nal.len() <= self.max_payload {
            let packet = RtpPacket {
                header: self.next_header(true, timestamp),
                payload: Bytes::copy_from_slice(nal),
            };
            return Ok(vec![packet]);
        }

        Ok(self.fragment(nal, timestamp))
    }

    /// FU-A fragmentation (RFC 6184 §5.8).
    fn fragment(&mut self, nal: &[u8], timestamp: u32) -> Vec<RtpPacket> {
        let nal_header = nal[0];
        let nal_type = nal_header & 0x1F;
        // FU indicator keeps the original F/NRI bits, type becomes 28.
        let fu_indicator = (nal_header & 0xE0) | NAL_TYPE_FU_A;

        let payload = &nal[1..];
        let max_fragment = self.max_payload - 2;
        let fragment_count = payload.len().div_ceil(max_fragment);

        let mut packets = Vec::with_capacity(fragment_count);
        for (index, chunk) in payload.chunks(max_fragment).enumerate() {
            let first = index == 0;
            let last = index == fragment_count - 1;

            let mut fu_header = nal_type;
            if first {
                fu_header |= 0x80;
            }
            if last {
                fu_header |= 0x40;
            }

            let mut body = BytesMut::with_capacity(2 + chunk.len());
            body.put_u8(fu_indicator);
            body.put_u8(fu_header);
            body.put_slice(chunk);

            packets.push(RtpPacket {
                header: self.next_header(last, timestamp),
                payload: body.freeze(),
            });
        }

        packets
    }

    /// Build the next header, advancing the sequence number.
    fn next_header(&mut self, marker: bool, timestamp: u32) -> RtpHeader {
        let header = RtpHeader {
            marker,
            payload_type: self.payload_type,
            sequence: self.sequence,
            timestamp,
            ssrc: self.ssrc,
        };
        self.sequence = self.sequence.wrapping_add(1);
        header
    }
}

impl Default for H264Packetizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_packetizer() -> H264Packetizer {
        H264Packetizer::new().with_ssrc(0xAABBCCDD)
    }

    /// A NAL of `len` bytes with a plausible IDR header.
    fn idr_nal(len: usize) -> Vec<u8> {
        let mut nal = vec![0x65];
        nal.extend((1..len).map(|i| (i % 251) as u8));
        nal
    }

    #[test]
    fn small_nal_single_packet_with_marker() {
        let mut p = make_packetizer();
        let nal = [0x65, 0xAA, 0xBB, 0xCC];
        let packets = p.packetize(&nal, 9000).unwrap();
        assert_eq!(packets.len(), 1);
        assert!(packets[0].header.marker);
        assert_eq!(packets[0].header.timestamp, 9000);
        assert_eq!(packets[0].payload.as_ref(), &nal);
    }

    #[test]
    fn boundary_nal_not_fragmented() {
        let mut p = make_packetizer();
        let nal = idr_nal(DEFAULT_MAX_PAYLOAD);
        let packets = p.packetize(&nal, 0).unwrap();
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn fragment_count_matches_payload_split() {
        let mut p = make_packetizer();
        for size in [
            DEFAULT_MAX_PAYLOAD + 1,
            DEFAULT_MAX_PAYLOAD * 2,
            DEFAULT_MAX_PAYLOAD * 3 + 17,
        ] {
            let nal = idr_nal(size);
            let packets = p.packetize(&nal, 0).unwrap();
            let expected = (size - 1).div_ceil(DEFAULT_MAX_PAYLOAD - 2);
            assert_eq!(packets.len(), expected, "size {}", size);
        }
    }

    #[test]
    fn fragment_headers_and_marker() {
        let mut p = make_packetizer();
        let nal = idr_nal(DEFAULT_MAX_PAYLOAD * 2);
        let packets = p.packetize(&nal, 180_000).unwrap();
        assert!(packets.len() > 1);

        for (i, packet) in packets.iter().enumerate() {
            let fu_indicator = packet.payload[0];
            let fu_header = packet.payload[1];
            let last = i == packets.len() - 1;

            assert_eq!(fu_indicator & 0x1F, NAL_TYPE_FU_A);
            assert_eq!(fu_indicator & 0xE0, 0x65 & 0xE0); // F/NRI preserved
            assert_eq!(fu_header & 0x1F, 5); // original type
            assert_eq!(fu_header & 0x80 != 0, i == 0); // S
            assert_eq!(fu_header & 0x40 != 0, last); // E
            assert_eq!(packet.header.marker, last);
            assert_eq!(packet.header.timestamp, 180_000);
        }
    }

    #[test]
    fn fragments_reconstruct_original_payload() {
        let mut p = make_packetizer();
        let nal = idr_nal(DEFAULT_MAX_PAYLOAD * 2 + 333);
        let packets = p.packetize(&nal, 0).unwrap();

        let mut rebuilt = vec![(packets[0].payload[0] & 0xE0) | (packets[0].payload[1] & 0x1F)];
        for packet in &packets {
            rebuilt.extend_from_slice(&packet.payload[2..]);
        }
        assert_eq!(rebuilt, nal);
    }

    #[test]
    fn sequence_increments_across_calls() {
        let mut p = make_packetizer();
        let small = idr_nal(100);
        let large = idr_nal(DEFAULT_MAX_PAYLOAD * 2);

        let mut expected = 0u16;
        for nal in [&small, &large, &small] {
            for packet in p.packetize(nal, 0).unwrap() {
                assert_eq!(packet.header.sequence, expected);
                expected = expected.wrapping_add(1);
            }
        }
        assert_eq!(p.next_sequence(), expected);
    }

    #[test]
    fn sequence_wraps() {
        let mut p = make_packetizer();
        p.sequence = u16::MAX;
        let first = p.packetize(&[0x65, 0x01], 0).unwrap();
        let second = p.packetize(&[0x65, 0x02], 0).unwrap();
        assert_eq!(first[0].header.sequence, u16::MAX);
        assert_eq!(second[0].header.sequence, 0);
    }

    #[test]
    fn empty_nal_rejected() {
        let mut p = make_packetizer();
        assert!(matches!(
            p.packetize(&[], 0),
            Err(RtpError::InvalidInput(_))
        ));
        assert_eq!(p.next_sequence(), 0); // nothing emitted
    }

    #[test]
    fn ssrc_constant_across_packets() {
        let mut p = H264Packetizer::new();
        let ssrc = p.ssrc();
        let packets = p.packetize(&idr_nal(DEFAULT_MAX_PAYLOAD * 2), 0).unwrap();
        assert!(packets.iter().all(|pk| pk.header.ssrc == ssrc));
    }

    #[test]
    fn random_ssrc_differs() {
        assert_ne!(H264Packetizer::new().ssrc(), H264Packetizer::new().ssrc());
    }
}
