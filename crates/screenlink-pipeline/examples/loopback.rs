//! Loopback demo: send pipeline → in-memory channel → receive
//! pipeline, with a toy codec standing in for the real engine.
//!
//! Run with: `cargo run --example loopback`

use anyhow::Result;
use bytes::Bytes;
use crossbeam_channel::unbounded;

use screenlink_codec::{
    pts_to_rtp_timestamp, CodecResult, DecodedPicture, EncodedFrame, RawFrame, VideoDecoder,
    VideoEncoder,
};
use screenlink_pipeline::{PipelineConfig, ReceivePipeline, SendPipeline};
use screenlink_rtp::START_CODE;

/// Toy encoder: emits a canned keyframe (SPS + PPS + IDR) for the
/// first frame, then canned P-slices.
struct ToyEncoder {
    fps: u32,
    frames: u64,
}

impl VideoEncoder for ToyEncoder {
    fn encode(&mut self, frame: &RawFrame) -> CodecResult<Vec<EncodedFrame>> {
        const SPS: &[u8] = &[0x67, 0x42, 0x00, 0x1E, 0x8C, 0x8D, 0x40];
        const PPS: &[u8] = &[0x68, 0xCE, 0x3C, 0x80];
        const IDR: &[u8] = &[0x65, 0x88, 0x84, 0x21, 0xFF, 0x00, 0x33];
        const SLICE: &[u8] = &[0x41, 0x9A, 0x24, 0x6C, 0x41, 0x4F];

        let nals: &[&[u8]] = if self.frames == 0 {
            &[SPS, PPS, IDR]
        } else {
            &[SLICE]
        };

        let mut data = Vec::new();
        for nal in nals {
            data.extend_from_slice(&START_CODE);
            data.extend_from_slice(nal);
        }

        self.frames += 1;
        Ok(vec![EncodedFrame {
            data: data.into(),
            timestamp: pts_to_rtp_timestamp(frame.sequence, self.fps),
        }])
    }

    fn name(&self) -> &'static str {
        "toy"
    }
}

/// Toy decoder: emits one gray picture per access unit.
struct ToyDecoder {
    width: u32,
    height: u32,
}

impl VideoDecoder for ToyDecoder {
    fn decode(&mut self, _access_unit: &[u8]) -> CodecResult<Vec<DecodedPicture>> {
        let (w, h) = (self.width as usize, self.height as usize);
        Ok(vec![DecodedPicture {
            y: vec![0x80; w * h].into(),
            u: vec![0x80; w * h / 4].into(),
            v: vec![0x80; w * h / 4].into(),
            strides: [w, w / 2, w / 2],
            width: self.width,
            height: self.height,
        }])
    }

    fn name(&self) -> &'static str {
        "toy"
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let config = PipelineConfig::default();

    // In-memory stand-in for the transport channel.
    let (packet_tx, packet_rx) = unbounded::<Bytes>();

    let mut send = SendPipeline::start(
        &config,
        Box::new(ToyEncoder {
            fps: config.fps,
            frames: 0,
        }),
        Box::new(move |packet: Bytes| {
            let _ = packet_tx.send(packet);
        }),
    )?;

    let mut recv = ReceivePipeline::new(
        Box::new(ToyDecoder {
            width: config.width,
            height: config.height,
        }),
        Box::new(|picture: DecodedPicture| {
            tracing::info!(
                width = picture.width,
                height = picture.height,
                "Picture rendered"
            );
        }),
    );

    // Drive a few capture events, pacing like a 15 fps timer.
    let frame_data = Bytes::from(vec![0u8; (config.width * config.height * 4) as usize]);
    for sequence in 0..30 {
        let frame = RawFrame::new(frame_data.clone(), config.width, config.height, sequence);
        send.submit_frame(frame);
        std::thread::sleep(std::time::Duration::from_millis(1000 / u64::from(config.fps)));
    }
    send.stop();

    // Deliver everything that reached the "network".
    while let Ok(packet) = packet_rx.try_recv() {
        recv.on_packet(&packet);
    }
    recv.flush();

    let sent = send.metrics();
    let received = recv.metrics();
    tracing::info!(
        frames = sent.frames_encoded,
        dropped = sent.busy_drops,
        packets = sent.packets_sent,
        "Send side done"
    );
    tracing::info!(
        units = received.access_units,
        pictures = received.pictures_rendered,
        "Receive side done"
    );

    Ok(())
}
