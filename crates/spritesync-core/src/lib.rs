//! # Spritesync Core
//!
//! Pure primitives for sprite document synchronization: sync flags, color
//! modes, the tagged wire messages exchanged with the peer, and their binary
//! codec.
//!
//! This crate contains no I/O and no state. It is pure encoding and decoding
//! over byte buffers.
//!
//! ## Key Types
//!
//! - [`OutboundMessage`] - Messages this side sends to the peer
//! - [`InboundMessage`] - Messages the peer sends to this side
//! - [`SyncFlags`] - Per-texture sync attributes (animated, show UV)
//! - [`WireMessage`] - Shared encode/decode behaviour, including batching
//!
//! ## Wire Format
//!
//! Every message is a one-byte tag followed by a tag-specific payload. All
//! integers are little-endian; strings and pixel blobs are prefixed with a
//! `u32` byte length. See the [`codec`] module.
//!
//! ```rust
//! use spritesync_core::{OutboundMessage, WireMessage};
//!
//! let msg = OutboundMessage::ActiveSprite { name: "hero.aseprite".into() };
//! let bytes = msg.encode().unwrap();
//! assert_eq!(OutboundMessage::decode(&bytes).unwrap(), msg);
//! ```

pub mod codec;
pub mod error;
pub mod messages;
pub mod types;

pub use codec::{unbatch, Reader, WireMessage, MAX_BATCH_DEPTH};
pub use error::{CodecError, Result};
pub use messages::{
    tags, FrameUpdatePayload, ImagePayload, InboundMessage, NewSpritePayload, NewTexturePayload,
    OutboundMessage, SheetFrame, SpritesheetPayload, TextureEntry, UvOverlayPayload,
};
pub use types::{AnimationDirection, ColorMode, FrameTiming, SyncFlags, TagInfo};
