//! Access-unit assembly: timestamp grouping, SPS/PPS caching, and IDR
//! repair.

use bytes::{BufMut, Bytes, BytesMut};

use crate::depacketizer::TimedNal;
use crate::nal::{NalUnit, NalUnitType, START_CODE};

/// Cache of the most recently observed SPS and PPS payloads.
///
/// Payloads are stored without start codes and overwritten on every
/// observation, so the cache always reflects the stream's current
/// decoder configuration.
#[derive(Debug, Default)]
pub struct ParameterSetCache {
    sps: Option<Bytes>,
    pps: Option<Bytes>,
}

impl ParameterSetCache {
    /// Record `nal` if it is a parameter set; otherwise do nothing.
    pub fn observe(&mut self, nal: &NalUnit) {
        match nal.nal_type {
            NalUnitType::Sps => self.sps = Some(nal.data.clone()),
            NalUnitType::Pps => self.pps = Some(nal.data.clone()),
            _ => {}
        }
    }

    /// True once both an SPS and a PPS have been seen.
    pub fn is_warm(&self) -> bool {
        self.sps.is_some() && self.pps.is_some()
    }

    /// Most recent SPS payload.
    pub fn sps(&self) -> Option<&Bytes> {
        self.sps.as_ref()
    }

    /// Most recent PPS payload.
    pub fn pps(&self) -> Option<&Bytes> {
        self.pps.as_ref()
    }
}

/// One decodable access unit: every NAL sharing an RTP timestamp,
/// serialized as an Annex-B byte stream.
#[derive(Debug, Clone)]
pub struct AccessUnit {
    /// RTP timestamp shared by the grouped NALs.
    pub timestamp: u32,

    /// Concatenated NAL units, each preceded by a 4-byte start code.
    pub data: Bytes,

    /// Number of NALs the group itself contained (prepended parameter
    /// sets not counted).
    pub nal_count: usize,

    /// The group contained an IDR slice.
    pub contains_idr: bool,

    /// Cached SPS/PPS were prepended ahead of the group's own NALs.
    pub repaired: bool,

    /// An IDR group lacked in-band parameter sets and the cache could
    /// not supply them; the unit is likely undecodable until the next
    /// parameter sets arrive.
    pub missing_parameter_sets: bool,
}

/// Groups NAL units into access units by RTP timestamp.
///
/// Frame boundaries are determined solely by timestamp transition,
/// never by the marker bit, which differs between sender
/// implementations. A NAL with a new timestamp flushes the pending
/// group before being accumulated.
///
/// IDR repair: a flushed group containing an IDR slice but missing
/// in-band SPS or PPS gets the cached parameter sets prepended (SPS
/// first), each with a fresh start code, so keyframes stay decodable
/// with encoders or transports that omit them.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    cache: ParameterSetCache,
    pending: Vec<NalUnit>,
    timestamp: u32,
    collecting: bool,
    has_idr: bool,
}

impl FrameAssembler {
    /// Create an assembler with an empty group and a cold cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one NAL unit.
    ///
    /// Returns the previous access unit when `nal`'s timestamp starts a
    /// new group, `None` otherwise.
    pub fn push(&mut self, nal: TimedNal) -> Option<AccessUnit> {
        let flushed = if self.collecting && nal.timestamp != self.timestamp {
            self.flush()
        } else {
            None
        };

        if !self.collecting {
            self.timestamp = nal.timestamp;
            self.collecting = true;
        }

        self.cache.observe(&nal.nal);
        if nal.nal.nal_type == NalUnitType::IdrSlice {
            self.has_idr = true;
        }
        self.pending.push(nal.nal);

        flushed
    }

    /// Flush the pending group, if any.
    ///
    /// A group with zero accumulated bytes is discarded silently.
    pub fn flush(&mut self) -> Option<AccessUnit> {
        if !self.collecting {
            return None;
        }

        let nals = std::mem::take(&mut self.pending);
        let contains_idr = std::mem::replace(&mut self.has_idr, false);
        self.collecting = false;

        let payload_len: usize = nals.iter().map(|n| n.data.len()).sum();
        if payload_len == 0 {
            return None;
        }

        let has_sps = nals.iter().any(|n| n.nal_type == NalUnitType::Sps);
        let has_pps = nals.iter().any(|n| n.nal_type == NalUnitType::Pps);
        let needs_repair = contains_idr && (!has_sps || !has_pps);

        let mut repaired = false;
        let mut missing_parameter_sets = false;
        let mut buf = BytesMut::with_capacity(payload_len + (nals.len() + 2) * START_CODE.len());

        if needs_repair {
            if let (Some(sps), Some(pps)) = (self.cache.sps(), self.cache.pps()) {
                buf.put_slice(&START_CODE);
                buf.put_slice(sps);
                buf.put_slice(&START_CODE);
                buf.put_slice(pps);
                repaired = true;
            } else {
                missing_parameter_sets = true;
            }
        }

        for nal in &nals {
            buf.put_slice(&START_CODE);
            buf.put_slice(&nal.data);
        }

        Some(AccessUnit {
            timestamp: self.timestamp,
            data: buf.freeze(),
            nal_count: nals.len(),
            contains_idr,
            repaired,
            missing_parameter_sets,
        })
    }

    /// The parameter-set cache owned by this assembler.
    pub fn cache(&self) -> &ParameterSetCache {
        &self.cache
    }
}
