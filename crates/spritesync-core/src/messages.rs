//! Wire message types.
//!
//! The protocol is asymmetric: the same tag byte can mean different things
//! depending on direction (`O` and `F` in particular), so each direction has
//! its own enum. Both can be encoded and decoded; a peer simply uses the
//! opposite pair.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{count_u16, count_u32, put_blob, put_string, Reader, WireMessage};
use crate::error::{CodecError, Result};
use crate::types::{AnimationDirection, ColorMode, FrameTiming, SyncFlags, TagInfo};

/// Tag bytes.
pub mod tags {
    pub const ACTIVE_SPRITE: u8 = b'A';
    pub const IMAGE: u8 = b'I';
    pub const SPRITESHEET: u8 = b'G';
    pub const FRAME_UPDATE: u8 = b'F';
    pub const CHANGE_NAME: u8 = b'C';
    pub const NEW_TEXTURE: u8 = b'O';
    pub const TEXTURE_LIST: u8 = b'L';
    pub const NEW_SPRITE: u8 = b'S';
    pub const UV_OVERLAY: u8 = b'M';
    pub const OPEN_SPRITE: u8 = b'O';
    pub const FOCUS: u8 = b'F';
    pub const PEEK: u8 = b'P';
    pub const BATCH: u8 = b'[';
}

/// A single frame of pixels, sent in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImagePayload {
    pub width: u16,
    pub height: u16,
    /// Zero-based frame number.
    pub frame: u16,
    pub flags: SyncFlags,
    /// Document name; empty for an anonymous image.
    pub name: String,
    /// RGBA pixels, row-major.
    pub pixels: Bytes,
}

/// One frame of a spritesheet: timing plus its pixels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetFrame {
    pub timing: FrameTiming,
    pub pixels: Bytes,
}

/// The whole animation: every frame, its timing, and all tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpritesheetPayload {
    pub width: u16,
    pub height: u16,
    pub name: String,
    /// Zero-based first frame of the visible range.
    pub first_visible_frame: i32,
    /// Zero-based active frame.
    pub active_frame: u32,
    pub frames: Vec<SheetFrame>,
    /// Name of the active tag, empty if none.
    pub active_tag: String,
    pub tags: Vec<TagInfo>,
}

/// Timing-only update sent on frame navigation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameUpdatePayload {
    /// Zero-based active frame.
    pub active_frame: u32,
    pub name: String,
    /// Zero-based first frame of the visible range.
    pub first_visible_frame: u32,
    /// Timings for every frame in the visible range.
    pub frames: Vec<FrameTiming>,
}

/// Request for the peer to create a texture. Exactly one field is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTexturePayload {
    name: String,
    path: String,
}

impl NewTexturePayload {
    /// A texture for an unsaved document, known by name only.
    pub fn from_name(name: impl Into<String>) -> Result<Self> {
        Self::new(name.into(), String::new())
    }

    /// A texture backed by a file on disk.
    pub fn from_path(path: impl Into<String>) -> Result<Self> {
        Self::new(String::new(), path.into())
    }

    fn new(name: String, path: String) -> Result<Self> {
        if name.is_empty() == path.is_empty() {
            return Err(CodecError::InvalidField(
                "new texture needs exactly one of name or path".into(),
            ));
        }
        Ok(Self { name, path })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Peer request to create a blank sprite.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewSpritePayload {
    pub color_mode: ColorMode,
    pub width: u16,
    pub height: u16,
    pub flags: SyncFlags,
    pub name: String,
}

/// Reference bitmap to lay over a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UvOverlayPayload {
    /// Layer opacity, 0-255.
    pub opacity: u8,
    pub width: u16,
    pub height: u16,
    /// Name of the layer to create or replace.
    pub layer: String,
    /// Target document name; empty means the active document.
    pub target: String,
    /// RGBA pixels, row-major.
    pub pixels: Bytes,
}

/// A texture name with its sync attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextureEntry {
    pub name: String,
    pub flags: SyncFlags,
}

impl TextureEntry {
    pub fn new(name: impl Into<String>, flags: SyncFlags) -> Self {
        Self {
            name: name.into(),
            flags,
        }
    }
}

/// Messages sent from this side to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// The sprite currently in focus; empty when nothing tracked is active.
    ActiveSprite { name: String },
    /// One frame of pixels.
    Image(ImagePayload),
    /// Every frame plus timing and tags.
    Spritesheet(SpritesheetPayload),
    /// Timing for the visible range, without pixels.
    FrameUpdate(FrameUpdatePayload),
    /// A tracked document was renamed.
    ChangeName { from: String, to: String },
    /// Ask the peer to create a texture.
    NewTexture(NewTexturePayload),
    /// Several messages in one frame.
    Batch(Vec<OutboundMessage>),
}

impl OutboundMessage {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::ActiveSprite { .. } => "ActiveSprite",
            OutboundMessage::Image(_) => "Image",
            OutboundMessage::Spritesheet(_) => "Spritesheet",
            OutboundMessage::FrameUpdate(_) => "FrameUpdate",
            OutboundMessage::ChangeName { .. } => "ChangeName",
            OutboundMessage::NewTexture(_) => "NewTexture",
            OutboundMessage::Batch(_) => "Batch",
        }
    }
}

/// Messages sent from the peer to this side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Create or update a document from pixels.
    Image(ImagePayload),
    /// Create a blank document.
    NewSprite(NewSpritePayload),
    /// Draw a reference overlay on a document.
    UvOverlay(UvOverlayPayload),
    /// The peer's authoritative list of tracked textures.
    TextureList {
        session_token: String,
        entries: Vec<TextureEntry>,
    },
    /// Open (or focus) a file by absolute path.
    OpenSprite { path: String, flags: SyncFlags },
    /// Switch to an open document by name.
    Focus { name: String },
    /// Send the contents of these files without showing them.
    Peek { entries: Vec<TextureEntry> },
    /// Several messages in one frame.
    Batch(Vec<InboundMessage>),
}

impl InboundMessage {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Image(_) => "Image",
            InboundMessage::NewSprite(_) => "NewSprite",
            InboundMessage::UvOverlay(_) => "UvOverlay",
            InboundMessage::TextureList { .. } => "TextureList",
            InboundMessage::OpenSprite { .. } => "OpenSprite",
            InboundMessage::Focus { .. } => "Focus",
            InboundMessage::Peek { .. } => "Peek",
            InboundMessage::Batch(_) => "Batch",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared payload encoders
// ─────────────────────────────────────────────────────────────────────────────

fn encode_image(out: &mut BytesMut, image: &ImagePayload) -> Result<()> {
    out.put_u16_le(image.width);
    out.put_u16_le(image.height);
    out.put_u16_le(image.frame);
    out.put_u16_le(image.flags.bits());
    put_string(out, "image name", &image.name)?;
    put_blob(out, "image pixels", &image.pixels)
}

fn decode_image(r: &mut Reader<'_>) -> Result<ImagePayload> {
    Ok(ImagePayload {
        width: r.u16()?,
        height: r.u16()?,
        frame: r.u16()?,
        flags: SyncFlags::from_wire(r.u16()?),
        name: r.string()?,
        pixels: r.blob()?,
    })
}

fn encode_timing(out: &mut BytesMut, timing: &FrameTiming) {
    out.put_u16_le(timing.index);
    out.put_u16_le(timing.duration_ms);
}

fn decode_timing(r: &mut Reader<'_>) -> Result<FrameTiming> {
    Ok(FrameTiming {
        index: r.u16()?,
        duration_ms: r.u16()?,
    })
}

fn encode_entries(out: &mut BytesMut, entries: &[TextureEntry]) -> Result<()> {
    for entry in entries {
        put_string(out, "texture name", &entry.name)?;
        out.put_u16_le(entry.flags.bits());
    }
    Ok(())
}

fn decode_entry(r: &mut Reader<'_>) -> Result<TextureEntry> {
    Ok(TextureEntry {
        name: r.string()?,
        flags: SyncFlags::from_wire(r.u16()?),
    })
}

fn encode_spritesheet(out: &mut BytesMut, sheet: &SpritesheetPayload) -> Result<()> {
    out.put_u16_le(sheet.width);
    out.put_u16_le(sheet.height);
    put_string(out, "sheet name", &sheet.name)?;
    out.put_i32_le(sheet.first_visible_frame);
    out.put_u32_le(count_u32("frame count", sheet.frames.len())?);
    out.put_u32_le(sheet.active_frame);

    for frame in &sheet.frames {
        encode_timing(out, &frame.timing);
    }

    out.put_u32_le(count_u32("tag count", sheet.tags.len())?);
    put_string(out, "active tag", &sheet.active_tag)?;
    for tag in &sheet.tags {
        put_string(out, "tag name", &tag.name)?;
        out.put_u16_le(tag.from);
        out.put_u16_le(tag.to);
        out.put_u8(tag.direction.to_u8());
    }

    for frame in &sheet.frames {
        put_blob(out, "frame pixels", &frame.pixels)?;
    }
    Ok(())
}

fn decode_spritesheet(r: &mut Reader<'_>) -> Result<SpritesheetPayload> {
    let width = r.u16()?;
    let height = r.u16()?;
    let name = r.string()?;
    let first_visible_frame = r.i32()?;
    let frame_count = r.u32()? as usize;
    let active_frame = r.u32()?;

    // Each timing is 4 bytes; reject absurd counts before allocating.
    if frame_count > r.remaining() / 4 {
        return Err(CodecError::InvalidField(format!("frame count {frame_count}")));
    }
    let mut timings = Vec::with_capacity(frame_count);
    for _ in 0..frame_count {
        timings.push(decode_timing(r)?);
    }

    let tag_count = r.u32()? as usize;
    let active_tag = r.string()?;
    let mut tags = Vec::new();
    for _ in 0..tag_count {
        tags.push(TagInfo {
            name: r.string()?,
            from: r.u16()?,
            to: r.u16()?,
            direction: AnimationDirection::from_u8(r.u8()?)?,
        });
    }

    let mut frames = Vec::with_capacity(frame_count);
    for timing in timings {
        frames.push(SheetFrame {
            timing,
            pixels: r.blob()?,
        });
    }

    Ok(SpritesheetPayload {
        width,
        height,
        name,
        first_visible_frame,
        active_frame,
        frames,
        active_tag,
        tags,
    })
}

fn encode_frame_update(out: &mut BytesMut, update: &FrameUpdatePayload) -> Result<()> {
    out.put_u32_le(update.active_frame);
    put_string(out, "frame update name", &update.name)?;
    out.put_u32_le(update.first_visible_frame);
    out.put_u32_le(count_u32("frame count", update.frames.len())?);
    for timing in &update.frames {
        encode_timing(out, timing);
    }
    Ok(())
}

fn decode_frame_update(r: &mut Reader<'_>) -> Result<FrameUpdatePayload> {
    let active_frame = r.u32()?;
    let name = r.string()?;
    let first_visible_frame = r.u32()?;
    let count = r.u32()? as usize;
    if count > r.remaining() / 4 {
        return Err(CodecError::InvalidField(format!("frame count {count}")));
    }
    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        frames.push(decode_timing(r)?);
    }
    Ok(FrameUpdatePayload {
        active_frame,
        name,
        first_visible_frame,
        frames,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Direction impls
// ─────────────────────────────────────────────────────────────────────────────

impl WireMessage for OutboundMessage {
    fn tag(&self) -> u8 {
        match self {
            OutboundMessage::ActiveSprite { .. } => tags::ACTIVE_SPRITE,
            OutboundMessage::Image(_) => tags::IMAGE,
            OutboundMessage::Spritesheet(_) => tags::SPRITESHEET,
            OutboundMessage::FrameUpdate(_) => tags::FRAME_UPDATE,
            OutboundMessage::ChangeName { .. } => tags::CHANGE_NAME,
            OutboundMessage::NewTexture(_) => tags::NEW_TEXTURE,
            OutboundMessage::Batch(_) => tags::BATCH,
        }
    }

    fn encode_body(&self, out: &mut BytesMut) -> Result<()> {
        match self {
            OutboundMessage::ActiveSprite { name } => put_string(out, "active sprite", name),
            OutboundMessage::Image(image) => encode_image(out, image),
            OutboundMessage::Spritesheet(sheet) => encode_spritesheet(out, sheet),
            OutboundMessage::FrameUpdate(update) => encode_frame_update(out, update),
            OutboundMessage::ChangeName { from, to } => {
                put_string(out, "old name", from)?;
                put_string(out, "new name", to)
            }
            OutboundMessage::NewTexture(texture) => {
                put_string(out, "texture name", &texture.name)?;
                put_string(out, "texture path", &texture.path)
            }
            // Batches are framed by `encode_into`.
            OutboundMessage::Batch(_) => Ok(()),
        }
    }

    fn decode_body(tag: u8, r: &mut Reader<'_>) -> Result<Self> {
        match tag {
            tags::ACTIVE_SPRITE => Ok(OutboundMessage::ActiveSprite { name: r.string()? }),
            tags::IMAGE => Ok(OutboundMessage::Image(decode_image(r)?)),
            tags::SPRITESHEET => Ok(OutboundMessage::Spritesheet(decode_spritesheet(r)?)),
            tags::FRAME_UPDATE => Ok(OutboundMessage::FrameUpdate(decode_frame_update(r)?)),
            tags::CHANGE_NAME => Ok(OutboundMessage::ChangeName {
                from: r.string()?,
                to: r.string()?,
            }),
            tags::NEW_TEXTURE => {
                let name = r.string()?;
                let path = r.string()?;
                Ok(OutboundMessage::NewTexture(NewTexturePayload::new(name, path)?))
            }
            other => Err(CodecError::UnknownTag(other)),
        }
    }

    fn batch(messages: Vec<Self>) -> Self {
        OutboundMessage::Batch(messages)
    }

    fn as_batch(&self) -> Option<&[Self]> {
        match self {
            OutboundMessage::Batch(messages) => Some(messages),
            _ => None,
        }
    }
}

impl WireMessage for InboundMessage {
    fn tag(&self) -> u8 {
        match self {
            InboundMessage::Image(_) => tags::IMAGE,
            InboundMessage::NewSprite(_) => tags::NEW_SPRITE,
            InboundMessage::UvOverlay(_) => tags::UV_OVERLAY,
            InboundMessage::TextureList { .. } => tags::TEXTURE_LIST,
            InboundMessage::OpenSprite { .. } => tags::OPEN_SPRITE,
            InboundMessage::Focus { .. } => tags::FOCUS,
            InboundMessage::Peek { .. } => tags::PEEK,
            InboundMessage::Batch(_) => tags::BATCH,
        }
    }

    fn encode_body(&self, out: &mut BytesMut) -> Result<()> {
        match self {
            InboundMessage::Image(image) => encode_image(out, image),
            InboundMessage::NewSprite(sprite) => {
                out.put_u8(sprite.color_mode.to_u8());
                out.put_u16_le(sprite.width);
                out.put_u16_le(sprite.height);
                out.put_u16_le(sprite.flags.bits());
                put_string(out, "sprite name", &sprite.name)
            }
            InboundMessage::UvOverlay(overlay) => {
                out.put_u8(overlay.opacity);
                out.put_u16_le(overlay.width);
                out.put_u16_le(overlay.height);
                put_string(out, "overlay layer", &overlay.layer)?;
                put_string(out, "overlay target", &overlay.target)?;
                put_blob(out, "overlay pixels", &overlay.pixels)
            }
            InboundMessage::TextureList {
                session_token,
                entries,
            } => {
                put_string(out, "session token", session_token)?;
                encode_entries(out, entries)
            }
            InboundMessage::OpenSprite { path, flags } => {
                put_string(out, "sprite path", path)?;
                out.put_u16_le(flags.bits());
                Ok(())
            }
            InboundMessage::Focus { name } => put_string(out, "focus name", name),
            InboundMessage::Peek { entries } => {
                out.put_u16_le(count_u16("peek count", entries.len())?);
                encode_entries(out, entries)
            }
            // Batches are framed by `encode_into`.
            InboundMessage::Batch(_) => Ok(()),
        }
    }

    fn decode_body(tag: u8, r: &mut Reader<'_>) -> Result<Self> {
        match tag {
            tags::IMAGE => Ok(InboundMessage::Image(decode_image(r)?)),
            tags::NEW_SPRITE => Ok(InboundMessage::NewSprite(NewSpritePayload {
                color_mode: ColorMode::from_u8(r.u8()?)?,
                width: r.u16()?,
                height: r.u16()?,
                flags: SyncFlags::from_wire(r.u16()?),
                name: r.string()?,
            })),
            tags::UV_OVERLAY => Ok(InboundMessage::UvOverlay(UvOverlayPayload {
                opacity: r.u8()?,
                width: r.u16()?,
                height: r.u16()?,
                layer: r.string()?,
                target: r.string()?,
                pixels: r.blob()?,
            })),
            tags::TEXTURE_LIST => {
                let session_token = r.string()?;
                let mut entries = Vec::new();
                while !r.is_empty() {
                    entries.push(decode_entry(r)?);
                }
                Ok(InboundMessage::TextureList {
                    session_token,
                    entries,
                })
            }
            tags::OPEN_SPRITE => Ok(InboundMessage::OpenSprite {
                path: r.string()?,
                flags: SyncFlags::from_wire(r.u16()?),
            }),
            tags::FOCUS => Ok(InboundMessage::Focus { name: r.string()? }),
            tags::PEEK => {
                let count = r.u16()?;
                let mut entries = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    entries.push(decode_entry(r)?);
                }
                Ok(InboundMessage::Peek { entries })
            }
            other => Err(CodecError::UnknownTag(other)),
        }
    }

    fn batch(messages: Vec<Self>) -> Self {
        InboundMessage::Batch(messages)
    }

    fn as_batch(&self) -> Option<&[Self]> {
        match self {
            InboundMessage::Batch(messages) => Some(messages),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_sheet() -> SpritesheetPayload {
        SpritesheetPayload {
            width: 2,
            height: 1,
            name: "walk.aseprite".into(),
            first_visible_frame: 0,
            active_frame: 1,
            frames: vec![
                SheetFrame {
                    timing: FrameTiming { index: 0, duration_ms: 100 },
                    pixels: Bytes::from_static(&[1; 8]),
                },
                SheetFrame {
                    timing: FrameTiming { index: 1, duration_ms: 150 },
                    pixels: Bytes::from_static(&[2; 8]),
                },
            ],
            active_tag: "walk".into(),
            tags: vec![TagInfo {
                name: "walk".into(),
                from: 0,
                to: 1,
                direction: AnimationDirection::PingPong,
            }],
        }
    }

    #[test]
    fn test_image_layout() {
        let msg = OutboundMessage::Image(ImagePayload {
            width: 1,
            height: 1,
            frame: 3,
            flags: SyncFlags::SHOW_UV,
            name: "a".into(),
            pixels: Bytes::from_static(&[9, 8, 7, 6]),
        });
        let bytes = msg.encode().unwrap();
        assert_eq!(
            &bytes[..],
            &[
                b'I', 1, 0, 1, 0, 3, 0, 2, 0, // header
                1, 0, 0, 0, b'a', // name
                4, 0, 0, 0, 9, 8, 7, 6, // pixels
            ]
        );
        assert_eq!(OutboundMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_spritesheet_roundtrip() {
        let msg = OutboundMessage::Spritesheet(sample_sheet());
        let bytes = msg.encode().unwrap();
        assert_eq!(bytes[0], b'G');
        assert_eq!(OutboundMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_spritesheet_negative_first_frame() {
        let mut sheet = sample_sheet();
        sheet.first_visible_frame = -1;
        let msg = OutboundMessage::Spritesheet(sheet);
        let decoded = OutboundMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_new_texture_needs_exactly_one_field() {
        assert!(NewTexturePayload::from_name("").is_err());
        assert!(NewTexturePayload::from_path("").is_err());
        let texture = NewTexturePayload::from_path("/tmp/a.png").unwrap();
        assert_eq!(texture.name(), "");
        assert_eq!(texture.path(), "/tmp/a.png");

        // Both empty on the wire is rejected by the decoder.
        let bytes = [b'O', 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            OutboundMessage::decode(&bytes),
            Err(CodecError::InvalidField(_))
        ));
    }

    #[test]
    fn test_direction_specific_tags() {
        // 'F' is a focus request inbound and a frame update outbound.
        let focus = InboundMessage::Focus { name: "a".into() }.encode().unwrap();
        assert_eq!(focus[0], b'F');
        assert!(OutboundMessage::decode(&focus).is_err());

        // Spritesheets are never received.
        let sheet = OutboundMessage::Spritesheet(sample_sheet()).encode().unwrap();
        assert_eq!(
            InboundMessage::decode(&sheet).unwrap_err(),
            CodecError::UnknownTag(b'G')
        );
    }

    #[test]
    fn test_texture_list_reads_to_end() {
        let msg = InboundMessage::TextureList {
            session_token: "/home/me/scene.blend".into(),
            entries: vec![
                TextureEntry::new("a.png", SyncFlags::ANIMATED),
                TextureEntry::new("b", SyncFlags::empty()),
            ],
        };
        let bytes = msg.encode().unwrap();
        assert_eq!(InboundMessage::decode(&bytes).unwrap(), msg);

        // A dangling partial entry fails instead of being ignored.
        let mut truncated = bytes.to_vec();
        truncated.truncate(bytes.len() - 1);
        assert!(InboundMessage::decode(&truncated).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = InboundMessage::Focus { name: "a".into() }
            .encode()
            .unwrap()
            .to_vec();
        bytes.push(0);
        assert_eq!(
            InboundMessage::decode(&bytes).unwrap_err(),
            CodecError::TrailingBytes(1)
        );
    }

    #[test]
    fn test_new_sprite_invalid_color_mode() {
        let mut bytes = InboundMessage::NewSprite(NewSpritePayload {
            name: "x".into(),
            ..Default::default()
        })
        .encode()
        .unwrap()
        .to_vec();
        bytes[1] = 9;
        assert!(matches!(
            InboundMessage::decode(&bytes),
            Err(CodecError::InvalidField(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_image_roundtrip(
            width in any::<u16>(),
            height in any::<u16>(),
            frame in any::<u16>(),
            flags in any::<u16>(),
            name in ".{0,32}",
            pixels in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            let image = ImagePayload {
                width,
                height,
                frame,
                flags: SyncFlags::from_wire(flags),
                name,
                pixels: Bytes::from(pixels),
            };
            let inbound = InboundMessage::Image(image.clone());
            let outbound = OutboundMessage::Image(image);
            prop_assert_eq!(InboundMessage::decode(&inbound.encode().unwrap()).unwrap(), inbound);
            prop_assert_eq!(OutboundMessage::decode(&outbound.encode().unwrap()).unwrap(), outbound);
        }

        #[test]
        fn prop_change_name_roundtrip(from in ".{0,64}", to in ".{0,64}") {
            let msg = OutboundMessage::ChangeName { from, to };
            prop_assert_eq!(OutboundMessage::decode(&msg.encode().unwrap()).unwrap(), msg);
        }

        #[test]
        fn prop_overlay_roundtrip(
            opacity in any::<u8>(),
            width in any::<u16>(),
            height in any::<u16>(),
            layer in ".{0,16}",
            target in ".{0,16}",
            pixels in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let msg = InboundMessage::UvOverlay(UvOverlayPayload {
                opacity,
                width,
                height,
                layer,
                target,
                pixels: Bytes::from(pixels),
            });
            prop_assert_eq!(InboundMessage::decode(&msg.encode().unwrap()).unwrap(), msg);
        }
    }
}
