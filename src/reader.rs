//! Reader builder and runtime loop.
//!
//! The [`ReaderBuilder`] configures bit order, framing mode and pacing. The
//! resulting [`PulseReader`] does the per-delivery pass:
//! 1. Split the delivery into frame candidates
//! 2. Decode each candidate
//! 3. Hand samples to the sink in order, report rejections
//!
//! [`PulseReader::run`] drives that pass from a [`SampleSource`] until the
//! transport closes or shutdown is requested.
//!
//! # Example
//!
//! ```
//! use berrymed_oximeter::transport::ChannelSource;
//! use berrymed_oximeter::{shutdown_channel, BitOrder, PulseReader, Sample};
//! use bytes::Bytes;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> berrymed_oximeter::Result<()> {
//! let mut reader = PulseReader::builder()
//!     .bit_order(BitOrder::SyncFirst)
//!     .poll_interval(std::time::Duration::ZERO)
//!     .build();
//!
//! let (tx, mut source) = ChannelSource::new();
//! tx.send(Bytes::from_static(&[0x96, 0x2A, 0x05, 0x48, 0x62])).await.unwrap();
//! drop(tx);
//!
//! let (_handle, signal) = shutdown_channel();
//! let mut samples: Vec<Sample> = Vec::new();
//! let stats = reader.run(&mut source, &mut samples, signal).await?;
//!
//! assert_eq!(stats.samples, 1);
//! assert_eq!(samples[0].spo2, 98);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::decoder::Decoder;
use crate::error::{OximeterError, RejectReason, Result};
use crate::protocol::{
    split_on_mask, BitOrder, ByteLayout, FrameBuffer, FRAME_LEN, PACKET_SCHEMA,
};
use crate::sink::SampleSink;
use crate::transport::SampleSource;

/// Initial capacity of the carry-over buffer.
const CARRY_CAPACITY: usize = 256;

/// Default pause between reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How frame candidates are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Split each delivery on its own; partial packets at delivery edges
    /// are dropped.
    #[default]
    PerDelivery,
    /// Carry an incomplete trailing group into the next delivery.
    CarryOver,
}

/// Configuration for the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Bit order for marker predicate and field layout.
    pub bit_order: BitOrder,
    /// Framing mode.
    pub framing: Framing,
    /// Pause after each read.
    pub poll_interval: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            bit_order: BitOrder::default(),
            framing: Framing::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Outcome of one delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Samples handed to the sink.
    pub decoded: usize,
    /// Groups dropped for having the wrong length.
    pub framing_mismatches: usize,
    /// Groups dropped because a byte did not fit its layout.
    pub field_errors: usize,
}

impl DeliveryReport {
    /// Total dropped groups.
    pub fn rejected(&self) -> usize {
        self.framing_mismatches + self.field_errors
    }
}

/// Counters accumulated over the reader's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    /// Non-empty deliveries processed.
    pub deliveries: u64,
    /// Reads that returned nothing.
    pub empty_reads: u64,
    /// Bytes received.
    pub bytes: u64,
    /// Samples decoded.
    pub samples: u64,
    /// Groups dropped for length.
    pub framing_mismatches: u64,
    /// Groups dropped for layout errors.
    pub field_errors: u64,
}

impl ReaderStats {
    fn record(&mut self, report: &DeliveryReport) {
        self.samples += report.decoded as u64;
        self.framing_mismatches += report.framing_mismatches as u64;
        self.field_errors += report.field_errors as u64;
    }
}

/// Builder for configuring and creating a [`PulseReader`].
#[derive(Debug, Clone)]
pub struct ReaderBuilder {
    config: ReaderConfig,
    schema: &'static [ByteLayout; FRAME_LEN],
}

impl Default for ReaderBuilder {
    fn default() -> Self {
        Self {
            config: ReaderConfig::default(),
            schema: &PACKET_SCHEMA,
        }
    }
}

impl ReaderBuilder {
    /// Create a new reader builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bit order.
    ///
    /// Default: [`BitOrder::SyncFirst`]
    pub fn bit_order(mut self, order: BitOrder) -> Self {
        self.config.bit_order = order;
        self
    }

    /// Set the framing mode.
    ///
    /// Default: [`Framing::PerDelivery`]
    pub fn framing(mut self, framing: Framing) -> Self {
        self.config.framing = framing;
        self
    }

    /// Set the pause applied after every read in [`PulseReader::run`].
    ///
    /// Default: 20 ms
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Replace the packet layout table.
    ///
    /// Default: [`PACKET_SCHEMA`]
    pub fn schema(mut self, schema: &'static [ByteLayout; FRAME_LEN]) -> Self {
        self.schema = schema;
        self
    }

    /// Build the reader.
    pub fn build(self) -> PulseReader {
        PulseReader::with_decoder(
            self.config,
            Decoder::with_schema(self.schema, self.config.bit_order),
        )
    }
}

/// Framing and decoding pipeline for one device.
#[derive(Debug)]
pub struct PulseReader {
    config: ReaderConfig,
    decoder: Decoder,
    /// Marker mask derived from the decoder's layout.
    marker: u8,
    /// Present only in carry-over mode.
    carry: Option<FrameBuffer>,
    stats: ReaderStats,
}

impl PulseReader {
    /// Create a new reader builder.
    pub fn builder() -> ReaderBuilder {
        ReaderBuilder::new()
    }

    /// Create a reader from a configuration.
    pub fn new(config: ReaderConfig) -> Self {
        Self::with_decoder(config, Decoder::new(config.bit_order))
    }

    /// Create a reader around an existing decoder.
    ///
    /// Frames are split on the decoder's position-0 sync bit.
    fn with_decoder(config: ReaderConfig, decoder: Decoder) -> Self {
        let marker = decoder.sync_mask();
        let carry = match config.framing {
            Framing::PerDelivery => None,
            Framing::CarryOver => Some(FrameBuffer::with_mask(CARRY_CAPACITY, marker)),
        };
        Self {
            config,
            decoder,
            marker,
            carry,
            stats: ReaderStats::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Counters so far.
    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Run one delivery through framer and decoder.
    ///
    /// Per-frame failures are reported to the sink and counted; they never
    /// abort the delivery. A sink error does, and is returned.
    pub fn process<K>(&mut self, delivery: &[u8], sink: &mut K) -> Result<DeliveryReport>
    where
        K: SampleSink + ?Sized,
    {
        if delivery.is_empty() {
            self.stats.empty_reads += 1;
            return Ok(DeliveryReport::default());
        }
        self.stats.deliveries += 1;
        self.stats.bytes += delivery.len() as u64;

        let mut report = DeliveryReport::default();
        let result = match self.carry.as_mut() {
            None => split_on_mask(delivery, self.marker)
                .try_for_each(|group| handle_group(&self.decoder, group, sink, &mut report)),
            Some(buffer) => buffer
                .push(delivery)
                .iter()
                .try_for_each(|group| handle_group(&self.decoder, group, sink, &mut report)),
        };
        self.stats.record(&report);
        result.map(|()| report)
    }

    /// Drain the group still held by carry-over framing and decode it.
    ///
    /// A no-op in per-delivery mode.
    pub fn finish<K>(&mut self, sink: &mut K) -> Result<DeliveryReport>
    where
        K: SampleSink + ?Sized,
    {
        let mut report = DeliveryReport::default();
        if let Some(rest) = self.carry.as_mut().and_then(FrameBuffer::flush) {
            handle_group(&self.decoder, &rest, sink, &mut report)?;
        }
        self.stats.record(&report);
        Ok(report)
    }

    /// Read deliveries from `source` until the transport closes or
    /// `shutdown` fires.
    ///
    /// `ConnectionClosed` ends the loop normally; every other transport
    /// error is returned unchanged.
    pub async fn run<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        mut shutdown: ShutdownSignal,
    ) -> Result<ReaderStats>
    where
        S: SampleSource + ?Sized,
        K: SampleSink + ?Sized,
    {
        tracing::info!(
            "Reading pulse data (bit order {:?}, framing {:?})",
            self.config.bit_order,
            self.config.framing
        );

        loop {
            if shutdown.is_shutdown() {
                tracing::info!("Shutdown requested, stopping reader");
                break;
            }

            let read = tokio::select! {
                biased;
                _ = shutdown.wait() => continue,
                read = source.read_value() => read,
            };

            let delivery = match read {
                Ok(delivery) => delivery,
                Err(OximeterError::ConnectionClosed) => {
                    tracing::info!("Transport closed, stopping reader");
                    break;
                }
                Err(e) => {
                    tracing::error!("Transport error: {}", e);
                    return Err(e);
                }
            };

            let report = self.process(&delivery, sink)?;
            if report.rejected() > 0 {
                tracing::debug!(
                    "Delivery of {} bytes: {} samples, {} dropped",
                    delivery.len(),
                    report.decoded,
                    report.rejected()
                );
            }

            if !self.config.poll_interval.is_zero() {
                tokio::select! {
                    biased;
                    _ = shutdown.wait() => {}
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }

        self.finish(sink)?;
        Ok(self.stats)
    }
}

impl Default for PulseReader {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}

/// Decode one group and route the result.
fn handle_group<K>(
    decoder: &Decoder,
    group: &[u8],
    sink: &mut K,
    report: &mut DeliveryReport,
) -> Result<()>
where
    K: SampleSink + ?Sized,
{
    let err = match decoder.decode(group) {
        Ok(sample) => {
            sink.on_sample(sample)?;
            report.decoded += 1;
            return Ok(());
        }
        Err(e) => e,
    };

    match err.reject_reason() {
        Some(reason @ RejectReason::FramingMismatch) => {
            tracing::debug!("Discarding broken packet: {}", err);
            report.framing_mismatches += 1;
            sink.on_reject(reason, &err);
            Ok(())
        }
        Some(reason @ RejectReason::FieldDecode) => {
            tracing::warn!("Error on parsing packet data: {}", err);
            report.field_errors += 1;
            sink.on_reject(reason, &err);
            Ok(())
        }
        None => Err(err),
    }
}

/// Create a linked shutdown handle and signal.
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx: Arc::new(tx) }, ShutdownSignal { rx })
}

/// Requests shutdown of every linked [`ShutdownSignal`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Request shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    /// Create another signal linked to this handle.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes a [`ShutdownHandle`].
///
/// If every handle is dropped without requesting shutdown, the signal never
/// fires.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown was requested.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is requested.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
