//! Per-pipeline counters and metric snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Send-side counters, shared between the producer and the worker.
#[derive(Debug, Default)]
pub struct SendStats {
    frames_captured: AtomicU64,
    frames_encoded: AtomicU64,
    busy_drops: AtomicU64,
    encode_errors: AtomicU64,
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl SendStats {
    pub(crate) fn record_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_encoded(&self) {
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_busy_drop(&self) {
        self.busy_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_encode_error(&self) {
        self.encode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_packet(&self, bytes: usize) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SendMetrics {
        SendMetrics {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_encoded: self.frames_encoded.load(Ordering::Relaxed),
            busy_drops: self.busy_drops.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

/// Send-side metrics snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMetrics {
    /// Frames offered by the capture collaborator.
    pub frames_captured: u64,

    /// Frames that completed encoding.
    pub frames_encoded: u64,

    /// Frames dropped because an encode was already in flight.
    pub busy_drops: u64,

    /// Frames the encoder failed on.
    pub encode_errors: u64,

    /// RTP packets handed to the transport.
    pub packets_sent: u64,

    /// Total RTP bytes handed to the transport.
    pub bytes_sent: u64,
}

/// Receive-side counters.
#[derive(Debug, Default)]
pub struct RecvStats {
    packets_received: AtomicU64,
    not_rtp_drops: AtomicU64,
    sequence_gaps: AtomicU64,
    access_units: AtomicU64,
    repaired_units: AtomicU64,
    missing_parameter_sets: AtomicU64,
    pictures_rendered: AtomicU64,
    decode_errors: AtomicU64,
}

impl RecvStats {
    pub(crate) fn record_packet(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_not_rtp(&self) {
        self.not_rtp_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sequence_gap(&self) {
        self.sequence_gaps.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_access_unit(&self) {
        self.access_units.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_repaired(&self) {
        self.repaired_units.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_missing_parameter_sets(&self) {
        self.missing_parameter_sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_picture(&self) {
        self.pictures_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> RecvMetrics {
        RecvMetrics {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            not_rtp_drops: self.not_rtp_drops.load(Ordering::Relaxed),
            sequence_gaps: self.sequence_gaps.load(Ordering::Relaxed),
            access_units: self.access_units.load(Ordering::Relaxed),
            repaired_units: self.repaired_units.load(Ordering::Relaxed),
            missing_parameter_sets: self.missing_parameter_sets.load(Ordering::Relaxed),
            pictures_rendered: self.pictures_rendered.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// Receive-side metrics snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecvMetrics {
    /// Datagrams pushed into the pipeline.
    pub packets_received: u64,

    /// Datagrams dropped for failing RTP header validation.
    pub not_rtp_drops: u64,

    /// Partial NALs discarded after a fragment sequence gap.
    pub sequence_gaps: u64,

    /// Access units assembled and handed to the decoder.
    pub access_units: u64,

    /// Access units with cached SPS/PPS prepended.
    pub repaired_units: u64,

    /// IDR units flushed without parameter sets (cold cache).
    pub missing_parameter_sets: u64,

    /// Decoded pictures forwarded to the render sink.
    pub pictures_rendered: u64,

    /// Access units the decoder failed on.
    pub decode_errors: u64,
}
