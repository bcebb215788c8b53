//! RTP fixed-header wire codec.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::RtpError;
use crate::RtpResult;

/// Size of the RTP fixed header in bytes.
pub const RTP_HEADER_LEN: usize = 12;

/// RTP fixed header fields (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Only the RFC 3550 subset this protocol uses is modeled: version is
/// always 2, padding, extension, and CSRC count are always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    /// Marker bit.
    pub marker: bool,

    /// Payload type (7 bits).
    pub payload_type: u8,

    /// Sequence number.
    pub sequence: u16,

    /// Media timestamp on the 90 kHz clock.
    pub timestamp: u32,

    /// Synchronization source identifier.
    pub ssrc: u32,
}

impl RtpHeader {
    /// Serialize to the 12-byte wire format.
    pub fn to_bytes(&self) -> [u8; RTP_HEADER_LEN] {
        let mut buf = [0u8; RTP_HEADER_LEN];
        // V=2, P=0, X=0, CC=0
        buf[0] = 0x80;
        buf[1] = (u8::from(self.marker) << 7) | (self.payload_type & 0x7F);
        buf[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        buf
    }

    /// Parse the fixed header from the start of a datagram.
    ///
    /// Rejects anything shorter than 12 bytes or whose version bits are
    /// not `10` (version 2).
    pub fn parse(data: &[u8]) -> RtpResult<Self> {
        if data.len() < RTP_HEADER_LEN {
            return Err(RtpError::NotRtp("truncated header"));
        }
        if data[0] & 0xC0 != 0x80 {
            return Err(RtpError::NotRtp("version bits"));
        }
        Ok(Self {
            marker: data[1] & 0x80 != 0,
            payload_type: data[1] & 0x7F,
            sequence: u16::from_be_bytes([data[2], data[3]]),
            timestamp: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            ssrc: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        })
    }
}

/// A complete RTP packet: fixed header plus payload.
#[derive(Debug, Clone)]
pub struct RtpPacket {
    /// Header fields.
    pub header: RtpHeader,

    /// Payload bytes (everything after the fixed header).
    pub payload: Bytes,
}

impl RtpPacket {
    /// Serialize to raw datagram bytes.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RTP_HEADER_LEN + self.payload.len());
        buf.put_slice(&self.header.to_bytes());
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Parse a raw datagram into header and payload.
    pub fn parse(data: &[u8]) -> RtpResult<Self> {
        let header = RtpHeader::parse(data)?;
        Ok(Self {
            header,
            payload: Bytes::copy_from_slice(&data[RTP_HEADER_LEN..]),
        })
    }

    /// Total packet size in bytes.
    pub fn len(&self) -> usize {
        RTP_HEADER_LEN + self.payload.len()
    }

    /// True if the packet carries no payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
