//! Connection Lifecycle: one peer socket and its three states.

use spritesync_core::{OutboundMessage, WireMessage};
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::transport::{Endpoint, Transport};

/// Where the single peer connection stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Owns the transport and tracks its state.
#[derive(Debug)]
pub struct Connection<T> {
    transport: T,
    state: ConnectionState,
    endpoint: Option<Endpoint>,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            endpoint: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// The endpoint of the last connect attempt.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Start connecting. Only valid while disconnected.
    pub fn connect(&mut self, endpoint: Endpoint) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                to: ConnectionState::Connecting,
            });
        }
        info!(url = %endpoint.url(), "connecting");
        self.transport.open(&endpoint)?;
        self.endpoint = Some(endpoint);
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Drop the current socket and connect again to the last endpoint.
    pub fn reconnect(&mut self) -> Result<()> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or_else(|| SyncError::Transport("no endpoint to reconnect to".into()))?;
        self.close();
        self.connect(endpoint)
    }

    /// The socket reported it is open.
    pub fn on_opened(&mut self) -> Result<()> {
        if self.state != ConnectionState::Connecting {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                to: ConnectionState::Connected,
            });
        }
        self.state = ConnectionState::Connected;
        info!("connected");
        Ok(())
    }

    /// The socket reported it closed or failed.
    pub fn on_closed(&mut self) {
        if self.state != ConnectionState::Disconnected {
            info!(from = ?self.state, "disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Encode and send one message as one frame.
    pub fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        let frame = message.encode()?;
        debug!(kind = message.kind(), len = frame.len(), "sending");
        self.transport.send(frame)
    }

    /// Close the socket from this side.
    pub fn close(&mut self) {
        if self.state != ConnectionState::Disconnected {
            self.transport.close();
        }
        self.on_closed();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
