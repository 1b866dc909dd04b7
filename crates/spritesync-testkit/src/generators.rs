//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use spritesync_core::{
    AnimationDirection, ColorMode, FrameTiming, FrameUpdatePayload, ImagePayload, InboundMessage,
    NewSpritePayload, NewTexturePayload, OutboundMessage, SheetFrame, SpritesheetPayload,
    SyncFlags, TagInfo, TextureEntry, UvOverlayPayload,
};

/// Generate sync flags, including unknown bits.
pub fn sync_flags() -> impl Strategy<Value = SyncFlags> {
    any::<u16>().prop_map(SyncFlags::from_wire)
}

pub fn color_mode() -> impl Strategy<Value = ColorMode> {
    prop_oneof![
        Just(ColorMode::Rgb),
        Just(ColorMode::Indexed),
        Just(ColorMode::Grayscale),
    ]
}

pub fn direction() -> impl Strategy<Value = AnimationDirection> {
    prop_oneof![
        Just(AnimationDirection::Forward),
        Just(AnimationDirection::Reverse),
        Just(AnimationDirection::PingPong),
    ]
}

/// A texture or document name, possibly empty, possibly non-ASCII.
pub fn name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z]{1,12}",
        "/[a-z]{1,8}/[a-z]{1,8}\\.aseprite",
        "\\PC{1,16}",
    ]
}

/// Arbitrary payload bytes up to `max_len`.
pub fn pixels(max_len: usize) -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..=max_len).prop_map(Bytes::from)
}

pub fn frame_timing() -> impl Strategy<Value = FrameTiming> {
    (any::<u16>(), any::<u16>()).prop_map(|(index, duration_ms)| FrameTiming { index, duration_ms })
}

pub fn texture_entry() -> impl Strategy<Value = TextureEntry> {
    (name(), sync_flags()).prop_map(|(name, flags)| TextureEntry { name, flags })
}

pub fn image_payload() -> impl Strategy<Value = ImagePayload> {
    (
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        sync_flags(),
        name(),
        pixels(64),
    )
        .prop_map(|(width, height, frame, flags, name, pixels)| ImagePayload {
            width,
            height,
            frame,
            flags,
            name,
            pixels,
        })
}

pub fn tag_info() -> impl Strategy<Value = TagInfo> {
    (name(), any::<u16>(), any::<u16>(), direction()).prop_map(|(name, from, to, direction)| {
        TagInfo {
            name,
            from,
            to,
            direction,
        }
    })
}

pub fn spritesheet_payload() -> impl Strategy<Value = SpritesheetPayload> {
    (
        (any::<u16>(), any::<u16>(), name(), any::<i32>(), any::<u32>()),
        prop::collection::vec((frame_timing(), pixels(32)), 0..5),
        name(),
        prop::collection::vec(tag_info(), 0..4),
    )
        .prop_map(
            |((width, height, name, first_visible_frame, active_frame), frames, active_tag, tags)| {
                SpritesheetPayload {
                    width,
                    height,
                    name,
                    first_visible_frame,
                    active_frame,
                    frames: frames
                        .into_iter()
                        .map(|(timing, pixels)| SheetFrame { timing, pixels })
                        .collect(),
                    active_tag,
                    tags,
                }
            },
        )
}

pub fn frame_update_payload() -> impl Strategy<Value = FrameUpdatePayload> {
    (
        any::<u32>(),
        name(),
        any::<u32>(),
        prop::collection::vec(frame_timing(), 0..8),
    )
        .prop_map(
            |(active_frame, name, first_visible_frame, frames)| FrameUpdatePayload {
                active_frame,
                name,
                first_visible_frame,
                frames,
            },
        )
}

/// Exactly one of name and path is set.
pub fn new_texture_payload() -> impl Strategy<Value = NewTexturePayload> {
    ("[a-z]{1,12}", any::<bool>()).prop_filter_map("valid request", |(value, by_path)| {
        if by_path {
            NewTexturePayload::from_path(format!("/{value}.png")).ok()
        } else {
            NewTexturePayload::from_name(value).ok()
        }
    })
}

pub fn new_sprite_payload() -> impl Strategy<Value = NewSpritePayload> {
    (color_mode(), any::<u16>(), any::<u16>(), sync_flags(), name()).prop_map(
        |(color_mode, width, height, flags, name)| NewSpritePayload {
            color_mode,
            width,
            height,
            flags,
            name,
        },
    )
}

pub fn uv_overlay_payload() -> impl Strategy<Value = UvOverlayPayload> {
    (any::<u8>(), any::<u16>(), any::<u16>(), name(), name(), pixels(64)).prop_map(
        |(opacity, width, height, layer, target, pixels)| UvOverlayPayload {
            opacity,
            width,
            height,
            layer,
            target,
            pixels,
        },
    )
}

/// Any outbound message except a batch.
pub fn outbound_leaf() -> impl Strategy<Value = OutboundMessage> {
    prop_oneof![
        name().prop_map(|name| OutboundMessage::ActiveSprite { name }),
        image_payload().prop_map(OutboundMessage::Image),
        spritesheet_payload().prop_map(OutboundMessage::Spritesheet),
        frame_update_payload().prop_map(OutboundMessage::FrameUpdate),
        (name(), name()).prop_map(|(from, to)| OutboundMessage::ChangeName { from, to }),
        new_texture_payload().prop_map(OutboundMessage::NewTexture),
    ]
}

/// Any inbound message except a batch.
pub fn inbound_leaf() -> impl Strategy<Value = InboundMessage> {
    prop_oneof![
        image_payload().prop_map(InboundMessage::Image),
        new_sprite_payload().prop_map(InboundMessage::NewSprite),
        uv_overlay_payload().prop_map(InboundMessage::UvOverlay),
        (name(), prop::collection::vec(texture_entry(), 0..6)).prop_map(
            |(session_token, entries)| InboundMessage::TextureList {
                session_token,
                entries,
            }
        ),
        (name(), sync_flags()).prop_map(|(path, flags)| InboundMessage::OpenSprite { path, flags }),
        name().prop_map(|name| InboundMessage::Focus { name }),
        prop::collection::vec(texture_entry(), 0..6)
            .prop_map(|entries| InboundMessage::Peek { entries }),
    ]
}

/// A non-empty run of outbound leaves for batching.
pub fn outbound_sequence() -> impl Strategy<Value = Vec<OutboundMessage>> {
    prop::collection::vec(outbound_leaf(), 1..8)
}

/// A non-empty run of inbound leaves for batching.
pub fn inbound_sequence() -> impl Strategy<Value = Vec<InboundMessage>> {
    prop::collection::vec(inbound_leaf(), 1..8)
}
