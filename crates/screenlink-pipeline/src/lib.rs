//! Realtime send/receive pipelines.
//!
//! This crate wires the RTP layer to its external collaborators. The
//! send pipeline takes captured frames through encode and
//! packetization on a worker thread with single-slot busy-drop
//! backpressure; the receive pipeline turns inbound datagrams back
//! into decoded pictures synchronously, in arrival order.
//!
//! Capture, codec engine, transport channel, and render surface are
//! all collaborators behind seams: frames come in via
//! [`SendPipeline::submit_frame`], packets leave via [`PacketSink`],
//! datagrams come in via [`ReceivePipeline::on_packet`], and pictures
//! leave via [`RenderSink`].

mod config;
mod error;
mod metrics;
mod recv;
mod send;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use metrics::{RecvMetrics, RecvStats, SendMetrics, SendStats};
pub use recv::ReceivePipeline;
pub use send::SendPipeline;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use screenlink_codec::DecodedPicture;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Lifecycle state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PipelineState {
    /// Not started.
    #[default]
    Idle,

    /// Worker running, accepting frames.
    Running,

    /// Stopped; the worker has been joined.
    Stopped,
}

impl PipelineState {
    /// Check if the pipeline is accepting work.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Transport channel seam: receives serialized RTP packets.
///
/// Calls are fire-and-forget; the pipeline preserves packet order, and
/// the sink must not reorder.
pub trait PacketSink: Send {
    /// Hand one RTP packet to the transport.
    fn send(&mut self, packet: Bytes);
}

impl<F: FnMut(Bytes) + Send> PacketSink for F {
    fn send(&mut self, packet: Bytes) {
        self(packet)
    }
}

/// Render surface seam: receives decoded pictures in presentation
/// order.
pub trait RenderSink: Send {
    /// Hand one decoded picture to the render surface.
    fn render(&mut self, picture: DecodedPicture);
}

impl<F: FnMut(DecodedPicture) + Send> RenderSink for F {
    fn render(&mut self, picture: DecodedPicture) {
        self(picture)
    }
}
