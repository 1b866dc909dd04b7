//! # Spritesync Testkit
//!
//! Testing utilities for spritesync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known messages with their exact wire bytes
//! - **Generators**: Proptest strategies for every message and payload
//! - **Fixtures**: A connected engine over an in-memory editor, and a scripted peer
//!
//! ## Golden Vectors
//!
//! ```rust
//! use spritesync_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! verify_all_vectors().unwrap();
//! for vector in all_vectors() {
//!     println!("{}: {}", vector.name, vector.hex);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use spritesync_core::{InboundMessage, WireMessage};
//! use spritesync_testkit::generators::inbound_leaf;
//!
//! proptest! {
//!     #[test]
//!     fn decode_inverts_encode(message in inbound_leaf()) {
//!         let bytes = message.encode().unwrap();
//!         prop_assert_eq!(InboundMessage::decode(&bytes).unwrap(), message);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use spritesync_core::SyncFlags;
//! use spritesync_testkit::fixtures::{EngineFixture, FakePeer};
//!
//! let mut fixture = EngineFixture::new().unwrap();
//! fixture.open_document("hero", 4, 4).unwrap();
//!
//! let mut peer = FakePeer::new();
//! peer.track("hero", SyncFlags::empty());
//! fixture.deliver_message(&peer.texture_list()).unwrap();
//! assert!(!fixture.sent().unwrap().is_empty());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{random_session_token, EngineFixture, FakePeer, TestEngine};
