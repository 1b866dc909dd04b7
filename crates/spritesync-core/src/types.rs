//! Small value types shared by messages and the sync engine.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

bitflags! {
    /// Sync attributes the peer attaches to a texture.
    ///
    /// Bits this side does not understand are kept as-is so they survive a
    /// decode/encode round trip.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SyncFlags: u16 {
        /// Sync the whole animation as a spritesheet.
        const ANIMATED = 0x0001;
        /// The peer draws UV overlays onto this sprite.
        const SHOW_UV = 0x0002;
    }
}

impl SyncFlags {
    /// Decode from the wire, retaining unknown bits.
    pub const fn from_wire(bits: u16) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Whether the whole animation is synced.
    pub const fn is_animated(&self) -> bool {
        self.contains(Self::ANIMATED)
    }
}

/// Pixel storage mode of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ColorMode {
    /// 32-bit RGBA.
    #[default]
    Rgb = 0,
    /// Palette indices.
    Indexed = 1,
    /// 256 levels of gray, stored as palette indices.
    Grayscale = 2,
}

impl ColorMode {
    /// Wire byte for this mode.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse the wire byte.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ColorMode::Rgb),
            1 => Ok(ColorMode::Indexed),
            2 => Ok(ColorMode::Grayscale),
            other => Err(CodecError::InvalidField(format!("color mode {other}"))),
        }
    }

    /// Whether pixels are palette indices rather than RGBA.
    pub const fn is_paletted(self) -> bool {
        !matches!(self, ColorMode::Rgb)
    }
}

/// Tag playback direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum AnimationDirection {
    #[default]
    Forward = 0,
    Reverse = 1,
    PingPong = 2,
}

impl AnimationDirection {
    /// Normalized direction code sent on the wire.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse the normalized direction code.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(AnimationDirection::Forward),
            1 => Ok(AnimationDirection::Reverse),
            2 => Ok(AnimationDirection::PingPong),
            other => Err(CodecError::InvalidField(format!("animation direction {other}"))),
        }
    }
}

/// Timing for one frame, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameTiming {
    /// Zero-based frame number.
    pub index: u16,
    /// Frame duration in milliseconds.
    pub duration_ms: u16,
}

/// A timeline tag as transmitted: zero-based inclusive range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TagInfo {
    pub name: String,
    pub from: u16,
    pub to: u16,
    pub direction: AnimationDirection,
}
