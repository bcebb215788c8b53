//! Receive pipeline: depacketize, assemble, decode, render.

use std::sync::Arc;

use tracing::{debug, warn};

use screenlink_codec::VideoDecoder;
use screenlink_rtp::{AccessUnit, FrameAssembler, H264Depacketizer, PacketOutcome};

use crate::metrics::{RecvMetrics, RecvStats};
use crate::RenderSink;

/// The receive side of the pipeline.
///
/// The transport collaborator pushes every inbound datagram into
/// [`on_packet`](Self::on_packet); depacketization, access-unit
/// assembly, decode, and render forwarding all run synchronously
/// within that call, so pictures reach the render sink in arrival
/// order without any internal locking.
///
/// The RTP layer reports its data-path events as values; this is where
/// they are mapped to log severity and counters. None of them stops
/// the pipeline, which self-heals on the next keyframe.
pub struct ReceivePipeline {
    depacketizer: H264Depacketizer,
    assembler: FrameAssembler,
    decoder: Box<dyn VideoDecoder>,
    sink: Box<dyn RenderSink>,
    stats: Arc<RecvStats>,
}

impl ReceivePipeline {
    /// Create a receive pipeline around a decoder and a render sink.
    pub fn new(decoder: Box<dyn VideoDecoder>, sink: Box<dyn RenderSink>) -> Self {
        Self {
            depacketizer: H264Depacketizer::new(),
            assembler: FrameAssembler::new(),
            decoder,
            sink,
            stats: Arc::new(RecvStats::default()),
        }
    }

    /// Process one inbound datagram.
    pub fn on_packet(&mut self, datagram: &[u8]) {
        self.stats.record_packet();

        let outcome = match self.depacketizer.on_packet(datagram) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(len = datagram.len(), "Dropping datagram: {}", e);
                self.stats.record_not_rtp();
                return;
            }
        };

        match outcome {
            PacketOutcome::Nal(timed) => {
                if let Some(unit) = self.assembler.push(timed) {
                    self.decode_unit(unit);
                }
            }
            PacketOutcome::SequenceGap { expected, got } => {
                debug!(expected, got, "Fragment sequence gap, partial NAL discarded");
                self.stats.record_sequence_gap();
            }
            PacketOutcome::Buffering | PacketOutcome::Ignored => {}
        }
    }

    /// Flush the final pending frame, e.g. at teardown.
    pub fn flush(&mut self) {
        if let Some(unit) = self.assembler.flush() {
            self.decode_unit(unit);
        }
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> RecvMetrics {
        self.stats.snapshot()
    }

    fn decode_unit(&mut self, unit: AccessUnit) {
        self.stats.record_access_unit();

        if unit.repaired {
            debug!(
                timestamp = unit.timestamp,
                "Prepended cached parameter sets to keyframe"
            );
            self.stats.record_repaired();
        }
        if unit.missing_parameter_sets {
            warn!(
                timestamp = unit.timestamp,
                "Keyframe flushed without parameter sets, decode may fail"
            );
            self.stats.record_missing_parameter_sets();
        }

        match self.decoder.decode(&unit.data) {
            Ok(pictures) => {
                for picture in pictures {
                    self.stats.record_picture();
                    self.sink.render(picture);
                }
            }
            Err(e) => {
                warn!(timestamp = unit.timestamp, "Decode failed: {}", e);
                self.stats.record_decode_error();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use parking_lot::Mutex;

    use screenlink_codec::{CodecResult, DecodedPicture};
    use screenlink_rtp::{H264Packetizer, START_CODE};

    const SPS: &[u8] = &[0x67, 0x42, 0x00, 0x1E];
    const PPS: &[u8] = &[0x68, 0xCE, 0x3C, 0x80];
    const IDR: &[u8] = &[0x65, 0x88, 0x84, 0x00];
    const SLICE: &[u8] = &[0x41, 0x9A, 0x02, 0x05];

    /// Decoder that records every access unit and emits one picture
    /// per unit.
    struct RecordingDecoder {
        units: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl VideoDecoder for RecordingDecoder {
        fn decode(&mut self, access_unit: &[u8]) -> CodecResult<Vec<DecodedPicture>> {
            self.units.lock().push(access_unit.to_vec());
            Ok(vec![DecodedPicture {
                y: Bytes::from_static(&[0; 4]),
                u: Bytes::from_static(&[0; 1]),
                v: Bytes::from_static(&[0; 1]),
                strides: [2, 1, 1],
                width: 2,
                height: 2,
            }])
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct Harness {
        pipeline: ReceivePipeline,
        units: Arc<Mutex<Vec<Vec<u8>>>>,
        rendered: Arc<Mutex<usize>>,
    }

    fn harness() -> Harness {
        let units = Arc::new(Mutex::new(Vec::new()));
        let rendered = Arc::new(Mutex::new(0));
        let sink = {
            let rendered = Arc::clone(&rendered);
            Box::new(move |_picture: DecodedPicture| *rendered.lock() += 1)
        };
        let pipeline = ReceivePipeline::new(
            Box::new(RecordingDecoder {
                units: Arc::clone(&units),
            }),
            sink,
        );
        Harness {
            pipeline,
            units,
            rendered,
        }
    }

    fn annex_b(nals: &[&[u8]]) -> Vec<u8> {
        let mut buf = Vec::new();
        for nal in nals {
            buf.extend_from_slice(&START_CODE);
            buf.extend_from_slice(nal);
        }
        buf
    }

    /// Feed every NAL of one frame through the packetizer into the
    /// pipeline.
    fn feed_frame(h: &mut Harness, p: &mut H264Packetizer, nals: &[&[u8]], timestamp: u32) {
        for nal in nals {
            for packet in p.packetize(nal, timestamp).unwrap() {
                h.pipeline.on_packet(&packet.to_bytes());
            }
        }
    }

    #[test]
    fn frames_decode_in_timestamp_groups() {
        let mut h = harness();
        let mut p = H264Packetizer::new().with_ssrc(0x42);

        feed_frame(&mut h, &mut p, &[SPS, PPS, IDR], 0);
        feed_frame(&mut h, &mut p, &[SLICE], 6000);
        // First group flushed when the second timestamp appeared.
        assert_eq!(h.units.lock().len(), 1);
        assert_eq!(h.units.lock()[0], annex_b(&[SPS, PPS, IDR]));

        h.pipeline.flush();
        assert_eq!(h.units.lock().len(), 2);
        assert_eq!(h.units.lock()[1], annex_b(&[SLICE]));

        let m = h.pipeline.metrics();
        assert_eq!(m.access_units, 2);
        assert_eq!(m.pictures_rendered, 2);
        assert_eq!(*h.rendered.lock(), 2);
    }

    #[test]
    fn large_nal_round_trips_through_fragments() {
        let mut h = harness();
        let mut p = H264Packetizer::new().with_ssrc(0x42);

        let mut big = vec![0x65u8];
        big.extend((1..5000).map(|i| (i % 256) as u8));

        feed_frame(&mut h, &mut p, &[&big], 0);
        feed_frame(&mut h, &mut p, &[SLICE], 6000);

        let units = h.units.lock();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0], annex_b(&[&big]));
    }

    #[test]
    fn non_rtp_datagrams_counted_and_dropped() {
        let mut h = harness();
        h.pipeline.on_packet(&[0x47, 0x11, 0x22]); // MPEG-TS sync byte
        h.pipeline.on_packet(&[]);

        let m = h.pipeline.metrics();
        assert_eq!(m.packets_received, 2);
        assert_eq!(m.not_rtp_drops, 2);
        assert_eq!(m.access_units, 0);
    }

    #[test]
    fn lost_fragment_drops_frame_but_not_stream() {
        let mut h = harness();
        let mut p = H264Packetizer::new().with_ssrc(0x42);

        let mut big = vec![0x65u8];
        big.extend((1..4000).map(|i| (i % 256) as u8));
        let packets = p.packetize(&big, 0).unwrap();
        assert!(packets.len() >= 3);

        // Middle fragment lost in transit.
        for (i, packet) in packets.iter().enumerate() {
            if i != 1 {
                h.pipeline.on_packet(&packet.to_bytes());
            }
        }
        assert_eq!(h.pipeline.metrics().sequence_gaps, 1);

        // The next frame is unaffected.
        feed_frame(&mut h, &mut p, &[SLICE], 6000);
        feed_frame(&mut h, &mut p, &[SLICE], 12000);

        let units = h.units.lock();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0], annex_b(&[SLICE]));
    }

    #[test]
    fn bare_keyframe_repaired_from_cache() {
        let mut h = harness();
        let mut p = H264Packetizer::new().with_ssrc(0x42);

        // Keyframe with in-band parameter sets warms the cache.
        feed_frame(&mut h, &mut p, &[SPS, PPS, IDR], 0);
        // Later keyframe arrives bare.
        feed_frame(&mut h, &mut p, &[IDR], 6000);
        feed_frame(&mut h, &mut p, &[SLICE], 12000);

        let units = h.units.lock();
        assert_eq!(units.len(), 2);
        assert_eq!(units[1], annex_b(&[SPS, PPS, IDR]));
        drop(units);

        let m = h.pipeline.metrics();
        assert_eq!(m.repaired_units, 1);
        assert_eq!(m.missing_parameter_sets, 0);
    }

    #[test]
    fn bare_keyframe_with_cold_cache_flagged() {
        let mut h = harness();
        let mut p = H264Packetizer::new().with_ssrc(0x42);

        feed_frame(&mut h, &mut p, &[IDR], 0);
        h.pipeline.flush();

        let m = h.pipeline.metrics();
        assert_eq!(m.missing_parameter_sets, 1);
        assert_eq!(m.repaired_units, 0);
        // Still handed to the decoder; failure is the decoder's call.
        assert_eq!(m.access_units, 1);
    }

    #[test]
    fn decode_error_is_contained() {
        struct FailingDecoder;
        impl VideoDecoder for FailingDecoder {
            fn decode(&mut self, _: &[u8]) -> CodecResult<Vec<DecodedPicture>> {
                Err(screenlink_codec::CodecError::Decode("corrupt unit".into()))
            }
            fn name(&self) -> &'static str {
                "failing"
            }
        }

        let rendered = Arc::new(Mutex::new(0usize));
        let sink = {
            let rendered = Arc::clone(&rendered);
            Box::new(move |_p: DecodedPicture| *rendered.lock() += 1)
        };
        let mut pipeline = ReceivePipeline::new(Box::new(FailingDecoder), sink);

        let mut p = H264Packetizer::new().with_ssrc(0x42);
        for packet in p.packetize(SLICE, 0).unwrap() {
            pipeline.on_packet(&packet.to_bytes());
        }
        pipeline.flush();

        let m = pipeline.metrics();
        assert_eq!(m.decode_errors, 1);
        assert_eq!(m.pictures_rendered, 0);
        assert_eq!(*rendered.lock(), 0);
    }
}
