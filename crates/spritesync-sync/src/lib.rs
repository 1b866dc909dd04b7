//! # Spritesync Sync
//!
//! The synchronization core: keeps documents open in a host editor mirrored
//! against a peer application over one persistent socket.
//!
//! ## Overview
//!
//! The [`SyncEngine`] is driven entirely by callbacks on the editor's
//! thread. It never blocks on the network and never spawns work of its own.
//! Local change events decide what to transmit (a single frame, a whole
//! spritesheet, a timing-only frame update, or nothing); peer messages are
//! applied to documents with local change processing suspended so they do
//! not echo back.
//!
//! ## Key Types
//!
//! - [`SyncEngine`] - The sync state machine
//! - [`DocumentRegistry`] - Stable bindings for transient document handles
//! - [`SyncEntryTable`] - The peer's authoritative texture list
//! - [`PixelTransfer`] - Image, spritesheet and frame-update payloads
//! - [`OverlayRenderer`] - UV overlays, including palette conversion
//! - [`Connection`] / [`Transport`] - The single peer connection
//!
//! ## Message Flow
//!
//! ```text
//! Editor                    SyncEngine                     Peer
//!   |-- SiteChanged -------->|                              |
//!   |                        |-- Image / Spritesheet ------>|
//!   |                        |-- ActiveSprite ------------->|
//!   |                        |<----------- TextureList -----|
//!   |<-- create / resize ----|<----------- Image -----------|
//!   |   (events discarded)   |                              |
//! ```

pub mod connection;
pub mod engine;
pub mod entries;
pub mod error;
pub mod overlay;
pub mod registry;
pub mod transfer;
pub mod transport;

pub use connection::{Connection, ConnectionState};
pub use engine::{DispatchReport, EngineConfig, SyncEngine, DEFAULT_OVERLAY_LAYER};
pub use entries::SyncEntryTable;
pub use error::{Result, SyncError};
pub use overlay::{OverlayRenderer, ALPHA_THRESHOLD};
pub use registry::{Binding, DocumentId, DocumentRegistry};
pub use transfer::{FrameRange, PixelTransfer};
pub use transport::{
    channel::{channel, ChannelTransport, TransportCommand},
    memory::MemoryTransport,
    Endpoint, SocketEvent, Transport,
};
