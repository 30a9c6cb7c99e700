//! Delivery sources.
//!
//! # Example
//!
//! ```
//! use berrymed_oximeter::transport::{ReaderSource, SampleSource};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let capture: &[u8] = &[0x80, 0x10, 0x00, 0x48, 0x62];
//! let mut source = ReaderSource::new(capture);
//!
//! let delivery = source.read_value().await.unwrap();
//! assert_eq!(delivery.len(), 5);
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use crate::error::{OximeterError, Result};

/// Bytes requested per read from an `AsyncRead` (one BLE notification).
pub const DEFAULT_READ_SIZE: usize = 20;

/// Default capacity of the notification channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Boxed future returned by sources.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Capability to read the next raw delivery.
///
/// - `Ok` with an empty buffer means "nothing yet"
/// - `Err(ConnectionClosed)` means no more data will arrive
/// - any other error is a transport failure and is passed through unchanged
pub trait SampleSource: Send {
    /// Read the next available buffer.
    fn read_value(&mut self) -> BoxFuture<'_, Result<Bytes>>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read_value(&mut self) -> BoxFuture<'_, Result<Bytes>> {
        (**self).read_value()
    }
}

/// Source reading from any `AsyncRead`.
pub struct ReaderSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Read in chunks of [`DEFAULT_READ_SIZE`] bytes.
    pub fn new(reader: R) -> Self {
        Self::with_read_size(reader, DEFAULT_READ_SIZE)
    }

    /// Read in chunks of at most `read_size` bytes.
    pub fn with_read_size(reader: R, read_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0u8; read_size.max(1)],
        }
    }

    /// Recover the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> SampleSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    fn read_value(&mut self) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move {
            let n = self.reader.read(&mut self.buf).await?;
            if n == 0 {
                return Err(OximeterError::ConnectionClosed);
            }
            Ok(Bytes::copy_from_slice(&self.buf[..n]))
        })
    }
}

/// Sending half handed to a notification callback.
pub type NotificationSender = mpsc::Sender<Bytes>;

/// Source fed by notification callbacks.
///
/// The radio stack's callback pushes each payload into the
/// [`NotificationSender`]; dropping every sender closes the source.
pub struct ChannelSource {
    rx: mpsc::Receiver<Bytes>,
}

impl ChannelSource {
    /// Create a source with [`DEFAULT_CHANNEL_CAPACITY`].
    pub fn new() -> (NotificationSender, Self) {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a source with a custom channel capacity.
    pub fn with_capacity(capacity: usize) -> (NotificationSender, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

impl SampleSource for ChannelSource {
    fn read_value(&mut self) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move { self.rx.recv().await.ok_or(OximeterError::ConnectionClosed) })
    }
}
