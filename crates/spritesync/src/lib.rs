//! # Spritesync
//!
//! Live synchronization of sprite documents in a pixel-art editor with a
//! peer application that uses them as textures.
//!
//! ## Overview
//!
//! One persistent socket carries tagged binary messages in both directions:
//!
//! - **Local edits** become single-frame images, whole spritesheets, or
//!   timing-only frame updates for the peer
//! - **Peer messages** create, resize, repaint, open or focus documents, and
//!   draw UV overlays onto reference layers
//! - **Texture lists** from the peer decide which documents are synced and
//!   under which peer file
//!
//! ## Usage
//!
//! ```rust
//! use spritesync::{SessionConfig, SessionLauncher};
//! use spritesync::host::MemoryHost;
//! use spritesync::sync::{MemoryTransport, SocketEvent};
//!
//! let mut launcher = SessionLauncher::new();
//! let session = launcher
//!     .start(MemoryHost::new(), MemoryTransport::new(), SessionConfig::default())
//!     .unwrap();
//!
//! session.connect().unwrap();
//! session.on_socket_event(SocketEvent::Opened).unwrap();
//! session.pump();
//!
//! let (_host, _transport) = launcher.stop().unwrap();
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `spritesync::core` - Messages, flags and the wire codec
//! - `spritesync::host` - The editor capability and the in-memory editor
//! - `spritesync::sync` - The sync engine, registry and transports

pub mod config;
pub mod error;
pub mod session;

// Re-export component crates
pub use spritesync_core as core;
pub use spritesync_host as host;
pub use spritesync_sync as sync;

// Re-export main types for convenience
pub use config::{SessionConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{Result, SessionError};
pub use session::{SessionLauncher, SessionStatus, SyncSession};

// Re-export commonly used types
pub use spritesync_core::{InboundMessage, OutboundMessage, SyncFlags, WireMessage};
pub use spritesync_host::DocumentHost;
pub use spritesync_sync::{ConnectionState, Endpoint, SocketEvent, SyncEngine, Transport};
