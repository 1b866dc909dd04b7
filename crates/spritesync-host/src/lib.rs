//! # Spritesync Host
//!
//! The host editor's document model, consumed as an opaque capability.
//!
//! ## Overview
//!
//! The sync engine never owns documents. It reaches them through the
//! [`DocumentHost`] trait: enumerate open documents, read names, frames,
//! tags and palettes, composite a frame into a caller-provided buffer, and
//! apply the handful of edits remote messages require.
//!
//! Handles handed out by a host are transient. Two handles for the same
//! document need not be equal, and comparing against a closed document is an
//! error. The only supported comparison is [`DocumentHost::same_document`].
//!
//! ## Key Types
//!
//! - [`DocumentHost`] - The capability trait
//! - [`MemoryHost`] - A complete in-memory editor, for tests and headless use
//! - [`PixelBuffer`] - Reusable RGBA render target
//! - [`HostEvent`] - Change notifications queued by the host
//!
//! ## Frame Numbering
//!
//! Hosts number frames from one, the way the editor shows them. Conversion
//! to the zero-based wire numbering happens in the sync engine.

pub mod error;
pub mod memory;
pub mod model;
pub mod traits;

pub use error::{HostError, Result};
pub use memory::{DocHandle, LayerView, MemoryHost};
pub use model::{
    DocumentInfo, LayerId, LayerSpec, NewDocument, Palette, PixelBuffer, PixelFormat, PixelImage,
    TagSpan,
};
pub use traits::{DocumentHost, HostEvent};
