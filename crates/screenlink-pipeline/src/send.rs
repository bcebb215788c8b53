//! Send pipeline: capture hand-off, encode worker, packetization.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use screenlink_codec::{EncodedFrame, RawFrame, VideoEncoder};
use screenlink_rtp::{parse_annex_b, H264Packetizer};

use crate::metrics::{SendMetrics, SendStats};
use crate::{PacketSink, PipelineConfig, PipelineResult, PipelineState};

/// Hand-off message to the encode worker.
enum WorkerMessage {
    /// Encode and packetize this frame.
    Frame(RawFrame),

    /// Finish in-flight work, then exit.
    Shutdown,
}

/// The send side of the pipeline.
///
/// The capture collaborator calls [`submit_frame`](Self::submit_frame)
/// on every capture event; encode and packetization run on a dedicated
/// worker thread that owns the encoder, the packetizer, and the packet
/// sink.
///
/// Backpressure is a single in-flight slot guarded by a busy flag:
/// while an encode is outstanding, new frames are dropped and counted
/// rather than queued, so the stream always carries the freshest
/// picture and the producer never blocks. The flag is set here on
/// dispatch and cleared by the worker on completion.
pub struct SendPipeline {
    frame_tx: Sender<WorkerMessage>,
    busy: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    state: Arc<RwLock<PipelineState>>,
    stats: Arc<SendStats>,
    worker: Option<JoinHandle<()>>,
}

impl SendPipeline {
    /// Spawn the encode worker and start accepting frames.
    pub fn start(
        config: &PipelineConfig,
        encoder: Box<dyn VideoEncoder>,
        sink: Box<dyn PacketSink>,
    ) -> PipelineResult<Self> {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(1);
        let busy = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(SendStats::default());

        let packetizer = H264Packetizer::new().with_max_payload(config.max_rtp_payload);
        let ssrc = packetizer.ssrc();

        let worker = thread::Builder::new().name("screenlink-send".into()).spawn({
            let busy = Arc::clone(&busy);
            let stats = Arc::clone(&stats);
            move || send_worker(frame_rx, encoder, packetizer, sink, busy, stats)
        })?;

        info!(
            ssrc = format_args!("{:#010X}", ssrc),
            fps = config.fps,
            "Send pipeline started"
        );

        Ok(Self {
            frame_tx,
            busy,
            running,
            state: Arc::new(RwLock::new(PipelineState::Running)),
            stats,
            worker: Some(worker),
        })
    }

    /// Offer one captured frame.
    ///
    /// Returns `true` if the frame was handed to the worker, `false`
    /// if it was dropped (encode in flight, or pipeline stopped). Never
    /// blocks.
    pub fn submit_frame(&self, frame: RawFrame) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        self.stats.record_captured();

        if self.busy.swap(true, Ordering::AcqRel) {
            self.stats.record_busy_drop();
            return false;
        }

        match self.frame_tx.try_send(WorkerMessage::Frame(frame)) {
            Ok(()) => true,
            Err(_) => {
                // Worker gone; release the slot so stop() stays clean.
                self.busy.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        *self.state.read()
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> SendMetrics {
        self.stats.snapshot()
    }

    /// Stop the pipeline: drain the in-flight frame, then join the
    /// worker. Idempotent.
    pub fn stop(&mut self) {
        if self.worker.is_none() {
            return;
        }

        self.running.store(false, Ordering::Release);

        // The shutdown message queues behind any in-flight frame, so
        // the worker finishes it before exiting (drain-then-stop).
        let _ = self.frame_tx.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }

        *self.state.write() = PipelineState::Stopped;

        let m = self.stats.snapshot();
        info!(
            frames = m.frames_captured,
            encoded = m.frames_encoded,
            dropped_busy = m.busy_drops,
            packets = m.packets_sent,
            "Send pipeline stopped"
        );
    }
}

impl Drop for SendPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn send_worker(
    frames: Receiver<WorkerMessage>,
    mut encoder: Box<dyn VideoEncoder>,
    mut packetizer: H264Packetizer,
    mut sink: Box<dyn PacketSink>,
    busy: Arc<AtomicBool>,
    stats: Arc<SendStats>,
) {
    debug!(encoder = encoder.name(), "Send worker started");

    while let Ok(message) = frames.recv() {
        let frame = match message {
            WorkerMessage::Frame(frame) => frame,
            WorkerMessage::Shutdown => break,
        };

        match encoder.encode(&frame) {
            Ok(pictures) => {
                for picture in &pictures {
                    packetize_picture(picture, &mut packetizer, sink.as_mut(), &stats);
                }
                stats.record_encoded();
            }
            Err(e) => {
                warn!(sequence = frame.sequence, "Encode failed: {}", e);
                stats.record_encode_error();
            }
        }

        // Completion signal: the producer may dispatch the next frame.
        busy.store(false, Ordering::Release);
    }

    debug!("Send worker stopped");
}

/// Split one coded picture into NAL units and send each as RTP.
fn packetize_picture(
    picture: &EncodedFrame,
    packetizer: &mut H264Packetizer,
    sink: &mut dyn PacketSink,
    stats: &SendStats,
) {
    for nal in parse_annex_b(&picture.data) {
        match packetizer.packetize(&nal.data, picture.timestamp) {
            Ok(packets) => {
                for packet in packets {
                    stats.record_packet(packet.len());
                    sink.send(packet.to_bytes());
                }
            }
            Err(e) => warn!(timestamp = picture.timestamp, "Packetize failed: {}", e),
        }
    }
}
