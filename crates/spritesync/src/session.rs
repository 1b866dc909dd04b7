//! Sync sessions and the launcher that guarantees there is only one.
//!
//! A [`SyncSession`] is the context object the editor's callbacks receive:
//! socket activity goes to [`SyncSession::on_socket_event`], and the
//! editor's idle or change hook calls [`SyncSession::pump`]. The
//! [`SessionLauncher`] owns at most one session at a time.

use spritesync_host::DocumentHost;
use spritesync_sync::{ConnectionState, SocketEvent, SyncEngine, Transport};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// A snapshot of what a session is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub url: String,
    /// Token of the peer's current file; empty before the first texture list.
    pub session_token: String,
    /// Textures the peer tracks.
    pub tracked_textures: usize,
    /// Documents bound to a peer session.
    pub bound_documents: usize,
}

/// One running sync session.
pub struct SyncSession<H: DocumentHost, T> {
    engine: SyncEngine<H, T>,
    config: SessionConfig,
}

impl<H: DocumentHost, T: Transport> SyncSession<H, T> {
    fn new(host: H, transport: T, config: SessionConfig) -> Self {
        let engine = SyncEngine::new(host, transport, config.engine_config());
        Self { engine, config }
    }

    pub fn engine(&self) -> &SyncEngine<H, T> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SyncEngine<H, T> {
        &mut self.engine
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.engine.state()
    }

    /// Connect to the configured peer.
    pub fn connect(&mut self) -> Result<()> {
        self.engine.connect(self.config.endpoint())?;
        Ok(())
    }

    /// Drop the connection and connect again.
    ///
    /// Starts a fresh connection when none was ever made.
    pub fn reconnect(&mut self) -> Result<()> {
        if self.engine.state() == ConnectionState::Disconnected {
            return self.connect();
        }
        self.engine.reconnect()?;
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.engine.disconnect();
    }

    /// Feed one socket event to the engine.
    pub fn on_socket_event(&mut self, event: SocketEvent) -> Result<()> {
        self.engine.handle_socket_event(event)?;
        Ok(())
    }

    /// Handle host events queued since the last call.
    pub fn pump(&mut self) -> usize {
        let handled = self.engine.pump_host_events();
        if handled > 0 {
            debug!(events = handled, "host events pumped");
        }
        handled
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.engine.state(),
            url: self.config.endpoint().url(),
            session_token: self.engine.entries().session_token().to_string(),
            tracked_textures: self.engine.entries().len(),
            bound_documents: self.engine.registry().len(),
        }
    }
}

/// Owns at most one [`SyncSession`].
pub struct SessionLauncher<H: DocumentHost, T> {
    session: Option<SyncSession<H, T>>,
}

impl<H: DocumentHost, T> Default for SessionLauncher<H, T> {
    fn default() -> Self {
        Self { session: None }
    }
}

impl<H: DocumentHost, T: Transport> SessionLauncher<H, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Start a session over `host` and `transport`.
    ///
    /// Fails with [`SessionError::AlreadyRunning`] while another session
    /// exists. Connects immediately when `autostart` is set.
    pub fn start(
        &mut self,
        host: H,
        transport: T,
        config: SessionConfig,
    ) -> Result<&mut SyncSession<H, T>> {
        if self.session.is_some() {
            return Err(SessionError::AlreadyRunning);
        }
        config.validate()?;

        let mut session = SyncSession::new(host, transport, config);
        if session.config.autostart {
            session.connect()?;
        }
        if session.config.autoshow {
            let status = session.status();
            info!(url = %status.url, state = ?status.state, "sync session started");
        }
        Ok(self.session.insert(session))
    }

    pub fn session(&self) -> Option<&SyncSession<H, T>> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut SyncSession<H, T>> {
        self.session.as_mut()
    }

    /// Stop the running session and hand back its host and transport.
    pub fn stop(&mut self) -> Result<(H, T)> {
        let session = self.session.take().ok_or(SessionError::NotRunning)?;
        info!("sync session stopped");
        Ok(session.engine.shutdown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spritesync_host::{MemoryHost, NewDocument};
    use spritesync_sync::MemoryTransport;

    type Launcher = SessionLauncher<MemoryHost, MemoryTransport>;

    #[test]
    fn test_single_session() {
        let mut launcher = Launcher::new();
        launcher
            .start(MemoryHost::new(), MemoryTransport::new(), SessionConfig::default())
            .unwrap();
        assert!(launcher.is_running());

        let second = launcher.start(
            MemoryHost::new(),
            MemoryTransport::new(),
            SessionConfig::default(),
        );
        assert!(matches!(second, Err(SessionError::AlreadyRunning)));

        launcher.stop().unwrap();
        assert!(!launcher.is_running());
        assert!(matches!(launcher.stop(), Err(SessionError::NotRunning)));
    }

    #[test]
    fn test_autostart_connects() {
        let mut launcher = Launcher::new();
        let config = SessionConfig {
            autostart: true,
            ..SessionConfig::default()
        };
        let session = launcher
            .start(MemoryHost::new(), MemoryTransport::new(), config)
            .unwrap();
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert_eq!(
            session.engine().transport().endpoint().map(|e| e.url()),
            Some("ws://localhost:34613".to_string())
        );
    }

    #[test]
    fn test_invalid_config_does_not_start() {
        let mut launcher = Launcher::new();
        let config = SessionConfig {
            port: 22,
            ..SessionConfig::default()
        };
        assert!(matches!(
            launcher.start(MemoryHost::new(), MemoryTransport::new(), config),
            Err(SessionError::Config(_))
        ));
        assert!(!launcher.is_running());
    }

    #[test]
    fn test_stop_unwatches_and_closes() {
        let mut host = MemoryHost::new();
        host.create_document(&NewDocument::rgb("a", 1, 1)).unwrap();
        host.take_events();

        let mut launcher = Launcher::new();
        let session = launcher
            .start(host, MemoryTransport::new(), SessionConfig::default())
            .unwrap();
        session.connect().unwrap();
        session.on_socket_event(SocketEvent::Opened).unwrap();
        assert_eq!(session.state(), ConnectionState::Connected);

        let (mut host, transport) = launcher.stop().unwrap();
        assert_eq!(transport.close_count(), 1);

        // Edits after stopping no longer reach anyone.
        let doc = host.active_document().unwrap();
        host.paint_pixel(&doc, 1, 0, 0, [1, 2, 3, 255]).unwrap();
        assert!(host.take_events().is_empty());
    }

    #[test]
    fn test_reconnect_from_idle() {
        let mut launcher = Launcher::new();
        let session = launcher
            .start(MemoryHost::new(), MemoryTransport::new(), SessionConfig::default())
            .unwrap();
        session.reconnect().unwrap();
        assert_eq!(session.state(), ConnectionState::Connecting);

        session.on_socket_event(SocketEvent::Opened).unwrap();
        session.reconnect().unwrap();
        assert_eq!(session.engine().transport().open_count(), 2);
    }

    #[test]
    fn test_status() {
        let mut launcher = Launcher::new();
        let config = SessionConfig {
            autoshow: true,
            port: 40000,
            ..SessionConfig::default()
        };
        let session = launcher
            .start(MemoryHost::new(), MemoryTransport::new(), config)
            .unwrap();
        let status = session.status();
        assert_eq!(status.state, ConnectionState::Disconnected);
        assert_eq!(status.url, "ws://localhost:40000");
        assert_eq!(status.tracked_textures, 0);
        assert!(status.session_token.is_empty());
    }
}
