//! Sinks receiving serialized wire messages

use tokio::sync::mpsc;

use crate::{EcmError, Result};

/// Destination for one client's message stream.
///
/// A failed `send` means the client is gone; the streaming loop stops and never
/// calls `send` again.
#[async_trait::async_trait]
pub trait FrameSink: Send + 'static {
    /// Push one UTF-8 text message.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Tell the client the stream is over. Called when a loop is cancelled.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that forwards messages into a bounded channel.
///
/// Useful for embedding the streaming loop behind a transport other than the
/// built-in WebSocket server. Dropping the receiver disconnects the sink.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes it.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait::async_trait]
impl FrameSink for ChannelSink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.tx.send(text).await.map_err(|_| EcmError::sink_closed("receiver dropped"))
    }
}
