//! Output side of the pipeline.
//!
//! A [`SampleSink`] receives every decoded sample in arrival order and is
//! told about every dropped frame through [`SampleSink::on_reject`].
//!
//! Stock sinks:
//! - `Vec<Sample>` - collect in memory
//! - [`FnSink`] - wrap a closure
//! - [`ChannelSink`] - forward to a tokio mpsc channel
//! - [`JsonLinesSink`] - write newline-delimited JSON to any `io::Write`
//! - [`MsgPackSink`] - write concatenated MessagePack maps to any `io::Write`

use std::io::Write;

use tokio::sync::mpsc;

use crate::codec::{JsonCodec, MsgPackCodec};
use crate::error::{OximeterError, RejectReason, Result};
use crate::sample::Sample;

/// Consumer of decoded samples.
pub trait SampleSink {
    /// Called once per decoded sample.
    ///
    /// An error stops the current delivery and is returned to the caller.
    fn on_sample(&mut self, sample: Sample) -> Result<()>;

    /// Called once per dropped frame. Default: ignore.
    fn on_reject(&mut self, reason: RejectReason, error: &OximeterError) {
        let _ = (reason, error);
    }
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn on_sample(&mut self, sample: Sample) -> Result<()> {
        (**self).on_sample(sample)
    }

    fn on_reject(&mut self, reason: RejectReason, error: &OximeterError) {
        (**self).on_reject(reason, error);
    }
}

impl SampleSink for Vec<Sample> {
    fn on_sample(&mut self, sample: Sample) -> Result<()> {
        self.push(sample);
        Ok(())
    }
}

/// Sink backed by a closure.
pub struct FnSink<F>(pub F);

impl<F> SampleSink for FnSink<F>
where
    F: FnMut(Sample),
{
    fn on_sample(&mut self, sample: Sample) -> Result<()> {
        (self.0)(sample);
        Ok(())
    }
}

/// Sink forwarding samples to an async consumer.
///
/// The channel is unbounded because the decode pass is synchronous and
/// must not wait on the consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Sample>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Sample>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Wrap an existing sender.
    pub fn from_sender(tx: mpsc::UnboundedSender<Sample>) -> Self {
        Self { tx }
    }
}

impl SampleSink for ChannelSink {
    fn on_sample(&mut self, sample: Sample) -> Result<()> {
        self.tx.send(sample).map_err(|_| OximeterError::SinkClosed)
    }
}

/// Sink writing one JSON object per line.
///
/// Rejections are not written; they are counted and available through
/// [`JsonLinesSink::rejected`].
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
    rejected: u64,
}

impl<W: Write> JsonLinesSink<W> {
    /// Create a sink over `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            rejected: 0,
        }
    }

    /// Number of samples written.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Number of frames rejected upstream.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SampleSink for JsonLinesSink<W> {
    fn on_sample(&mut self, sample: Sample) -> Result<()> {
        let line = JsonCodec::encode_line(&sample)?;
        self.writer.write_all(&line)?;
        // Consumers tail the output; do not hold samples in the buffer
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn on_reject(&mut self, _reason: RejectReason, _error: &OximeterError) {
        self.rejected += 1;
    }
}

/// Sink writing one MessagePack map per sample, back to back.
///
/// Samples are encoded into a reused scratch buffer and written whole.
pub struct MsgPackSink<W: Write> {
    writer: W,
    scratch: Vec<u8>,
    written: u64,
    rejected: u64,
}

impl<W: Write> MsgPackSink<W> {
    /// Create a sink over `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            scratch: Vec::with_capacity(128),
            written: 0,
            rejected: 0,
        }
    }

    /// Number of samples written.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Number of frames rejected upstream.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SampleSink for MsgPackSink<W> {
    fn on_sample(&mut self, sample: Sample) -> Result<()> {
        self.scratch.clear();
        MsgPackCodec::encode_into(&sample, &mut self.scratch)?;
        self.writer.write_all(&self.scratch)?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn on_reject(&mut self, _reason: RejectReason, _error: &OximeterError) {
        self.rejected += 1;
    }
}
