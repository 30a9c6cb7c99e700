//! Replay - run a capture through the decoder and print JSON lines.
//!
//! This example demonstrates:
//! - Feeding a raw capture file through [`ReaderSource`]
//! - Writing samples to stdout with [`JsonLinesSink`], or [`MsgPackSink`]
//!   with `--msgpack`
//! - Stopping the read loop with Ctrl-C through a shutdown handle
//!
//! Logs go to stderr; stdout carries only samples.
//!
//! # Running
//!
//! ```text
//! cargo run --example replay -- capture.bin [--sync-last] [--carry-over] [--msgpack]
//! RUST_LOG=debug cargo run --example replay
//! ```
//!
//! Without a capture path a synthetic stream is generated and delivered
//! through a notification channel in misaligned chunks.

use std::time::Duration;

use berrymed_oximeter::sink::{JsonLinesSink, MsgPackSink, SampleSink};
use berrymed_oximeter::transport::{gatt, ChannelSource, ReaderSource, SampleSource};
use berrymed_oximeter::{shutdown_channel, BitOrder, Framing, Packet, PulseReader, Sample};
use bytes::Bytes;
use chrono::Utc;
use tracing_subscriber::EnvFilter;

/// Notification size used for the synthetic stream.
const SYNTHETIC_CHUNK: usize = 7;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let order = if args.iter().any(|a| a == "--sync-last") {
        BitOrder::SyncLast
    } else {
        BitOrder::SyncFirst
    };
    let framing = if args.iter().any(|a| a == "--carry-over") {
        Framing::CarryOver
    } else {
        Framing::PerDelivery
    };
    let path = args.iter().find(|a| !a.starts_with("--"));

    let mut source: Box<dyn SampleSource> = match path {
        Some(path) => {
            tracing::info!("Replaying capture {}", path);
            let file = tokio::fs::File::open(path).await?;
            Box::new(ReaderSource::new(file))
        }
        None => {
            tracing::info!(
                "No capture given, simulating {} (service {}, characteristic {})",
                gatt::DEVICE_NAME,
                gatt::DATA_SERVICE_UUID,
                gatt::RECEIVE_CHARACTERISTIC_UUID
            );
            Box::new(synthetic_source(order)?)
        }
    };

    let (handle, signal) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Terminating pulse reader");
            handle.shutdown();
        }
    });

    let mut reader = PulseReader::builder()
        .bit_order(order)
        .framing(framing)
        .poll_interval(Duration::from_millis(20))
        .build();
    let stdout = std::io::stdout().lock();
    let mut sink: Box<dyn SampleSink> = if args.iter().any(|a| a == "--msgpack") {
        Box::new(MsgPackSink::new(stdout))
    } else {
        Box::new(JsonLinesSink::new(stdout))
    };

    let stats = reader.run(&mut source, &mut *sink, signal).await?;
    tracing::info!(
        "Done: {} samples, {} framing mismatches, {} field errors",
        stats.samples,
        stats.framing_mismatches,
        stats.field_errors
    );
    Ok(())
}

/// Encode a slowly varying reading and push it through a channel, as a BLE
/// notification callback would.
fn synthetic_source(order: BitOrder) -> berrymed_oximeter::Result<ChannelSource> {
    let mut stream = Vec::new();
    for i in 0..100u8 {
        let sample = Sample {
            signal_strength: 6,
            has_signal: true,
            probe_unplugged: false,
            pulse_beep: i % 20 == 0,
            pleth: (i % 25) * 5,
            bargraph: (i % 25) / 4,
            no_finger: false,
            pulse_research: false,
            pulse_rate: 70 + i % 5,
            spo2: 97 + i % 2,
            timestamp: Utc::now(),
        };
        stream.extend_from_slice(Packet::encode(&sample, order)?.as_bytes());
    }

    let (tx, source) = ChannelSource::new();
    tokio::spawn(async move {
        for chunk in stream.chunks(SYNTHETIC_CHUNK) {
            if tx.send(Bytes::copy_from_slice(chunk)).await.is_err() {
                break;
            }
        }
    });
    Ok(source)
}
