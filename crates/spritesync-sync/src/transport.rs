//! Transport abstraction for the sync connection.
//!
//! The transport owns the socket below the payload layer. The engine hands
//! it one encoded message per frame and is told about socket activity
//! through [`SocketEvent`]s. Implementations may be a WebSocket client, a
//! channel into an async task, or the in-memory recorder used in tests.

use bytes::Bytes;

use crate::error::Result;

/// Where the peer listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// WebSocket URL of the peer.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Socket activity reported back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The connection is established.
    Opened,
    /// One binary frame arrived.
    Binary(Bytes),
    /// The connection closed or failed.
    Closed,
}

/// Transport trait for the single peer connection.
///
/// None of these calls block: `open` starts connecting and completion is
/// reported later as [`SocketEvent::Opened`].
pub trait Transport {
    /// Start connecting to `endpoint`.
    fn open(&mut self, endpoint: &Endpoint) -> Result<()>;

    /// Send one binary frame.
    fn send(&mut self, frame: Bytes) -> Result<()>;

    /// Close the socket. Closing an idle transport does nothing.
    fn close(&mut self);
}

/// A recording transport for tests.
pub mod memory {
    use super::*;
    use spritesync_core::{OutboundMessage, WireMessage};

    /// Records everything sent instead of delivering it.
    #[derive(Debug, Default)]
    pub struct MemoryTransport {
        endpoint: Option<Endpoint>,
        sent: Vec<Bytes>,
        open_count: usize,
        close_count: usize,
    }

    impl MemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// The endpoint of the last `open`, while open.
        pub fn endpoint(&self) -> Option<&Endpoint> {
            self.endpoint.as_ref()
        }

        pub fn sent(&self) -> &[Bytes] {
            &self.sent
        }

        pub fn open_count(&self) -> usize {
            self.open_count
        }

        pub fn close_count(&self) -> usize {
            self.close_count
        }

        /// Drain recorded frames.
        pub fn take_sent(&mut self) -> Vec<Bytes> {
            std::mem::take(&mut self.sent)
        }

        /// Drain recorded frames and decode them.
        pub fn take_messages(&mut self) -> Result<Vec<OutboundMessage>> {
            self.take_sent()
                .iter()
                .map(|frame| OutboundMessage::decode(frame).map_err(Into::into))
                .collect()
        }
    }

    impl Transport for MemoryTransport {
        fn open(&mut self, endpoint: &Endpoint) -> Result<()> {
            self.endpoint = Some(endpoint.clone());
            self.open_count += 1;
            Ok(())
        }

        fn send(&mut self, frame: Bytes) -> Result<()> {
            self.sent.push(frame);
            Ok(())
        }

        fn close(&mut self) {
            if self.endpoint.take().is_some() {
                self.close_count += 1;
            }
        }
    }
}

/// A transport that forwards commands to an async socket task.
pub mod channel {
    use super::*;
    use crate::error::SyncError;
    use tokio::sync::mpsc;

    /// Work for the task that owns the real socket.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TransportCommand {
        Connect(Endpoint),
        Frame(Bytes),
        Close,
    }

    /// Non-blocking transport backed by an unbounded channel.
    #[derive(Debug, Clone)]
    pub struct ChannelTransport {
        tx: mpsc::UnboundedSender<TransportCommand>,
    }

    /// Create a transport and the receiver its socket task drains.
    pub fn channel() -> (ChannelTransport, mpsc::UnboundedReceiver<TransportCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelTransport { tx }, rx)
    }

    impl ChannelTransport {
        fn push(&self, command: TransportCommand) -> Result<()> {
            self.tx
                .send(command)
                .map_err(|_| SyncError::Transport("socket task has stopped".into()))
        }
    }

    impl Transport for ChannelTransport {
        fn open(&mut self, endpoint: &Endpoint) -> Result<()> {
            self.push(TransportCommand::Connect(endpoint.clone()))
        }

        fn send(&mut self, frame: Bytes) -> Result<()> {
            self.push(TransportCommand::Frame(frame))
        }

        fn close(&mut self) {
            if self.push(TransportCommand::Close).is_err() {
                tracing::debug!("close requested after socket task stopped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::channel::{channel, TransportCommand};
    use super::memory::MemoryTransport;
    use super::*;
    use crate::error::SyncError;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(Endpoint::new("localhost", 34613).url(), "ws://localhost:34613");
    }

    #[test]
    fn test_memory_transport_records() {
        let mut transport = MemoryTransport::new();
        transport.open(&Endpoint::new("h", 2000)).unwrap();
        transport.send(Bytes::from_static(b"A\0\0\0\0")).unwrap();
        assert_eq!(transport.sent().len(), 1);

        let messages = transport.take_messages().unwrap();
        assert_eq!(
            messages,
            vec![spritesync_core::OutboundMessage::ActiveSprite {
                name: String::new()
            }]
        );
        assert!(transport.sent().is_empty());

        transport.close();
        transport.close();
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn test_channel_transport_forwards_commands() {
        let (mut transport, mut rx) = channel();
        let endpoint = Endpoint::new("localhost", 34613);

        transport.open(&endpoint).unwrap();
        transport.send(Bytes::from_static(b"frame")).unwrap();
        transport.close();

        assert_eq!(rx.recv().await, Some(TransportCommand::Connect(endpoint)));
        assert_eq!(
            rx.recv().await,
            Some(TransportCommand::Frame(Bytes::from_static(b"frame")))
        );
        assert_eq!(rx.recv().await, Some(TransportCommand::Close));
    }

    #[tokio::test]
    async fn test_channel_transport_reports_stopped_task() {
        let (mut transport, rx) = channel();
        drop(rx);
        let result = transport.send(Bytes::from_static(b"frame"));
        assert!(matches!(result, Err(SyncError::Transport(_))));
        transport.close();
    }
}
