//! Golden wire vectors.
//!
//! Each vector pins the exact bytes of one message so that both ends of the
//! socket agree on the layout. Vectors can be exported as JSON for a peer
//! implementation to check against.

use anyhow::{bail, Context};
use bytes::Bytes;
use serde::Serialize;

use spritesync_core::{
    ColorMode, FrameTiming, FrameUpdatePayload, ImagePayload, InboundMessage, NewSpritePayload,
    NewTexturePayload, OutboundMessage, SyncFlags, TextureEntry, UvOverlayPayload, WireMessage,
};

/// Which direction a vector travels.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorMessage {
    Outbound(OutboundMessage),
    Inbound(InboundMessage),
}

impl VectorMessage {
    pub fn encode(&self) -> spritesync_core::Result<Bytes> {
        match self {
            VectorMessage::Outbound(m) => m.encode(),
            VectorMessage::Inbound(m) => m.encode(),
        }
    }

    fn direction(&self) -> &'static str {
        match self {
            VectorMessage::Outbound(_) => "outbound",
            VectorMessage::Inbound(_) => "inbound",
        }
    }

    fn matches(&self, bytes: &[u8]) -> anyhow::Result<bool> {
        Ok(match self {
            VectorMessage::Outbound(m) => &OutboundMessage::decode(bytes)? == m,
            VectorMessage::Inbound(m) => &InboundMessage::decode(bytes)? == m,
        })
    }
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub message: VectorMessage,
    /// Expected frame bytes (hex).
    pub hex: &'static str,
}

/// Serializable form of a vector, for export.
#[derive(Debug, Serialize)]
pub struct ExportedVector {
    pub name: &'static str,
    pub direction: &'static str,
    pub kind: &'static str,
    pub hex: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    use VectorMessage::{Inbound, Outbound};

    let mut vectors = vec![
        GoldenVector {
            name: "ActiveSprite hero",
            message: Outbound(OutboundMessage::ActiveSprite {
                name: "hero".into(),
            }),
            hex: "41040000006865726f",
        },
        GoldenVector {
            name: "ActiveSprite with no document",
            message: Outbound(OutboundMessage::ActiveSprite {
                name: String::new(),
            }),
            hex: "4100000000",
        },
        GoldenVector {
            name: "ChangeName a to b",
            message: Outbound(OutboundMessage::ChangeName {
                from: "a".into(),
                to: "b".into(),
            }),
            hex: "4301000000610100000062",
        },
        GoldenVector {
            name: "Image 1x1 animated",
            message: Outbound(OutboundMessage::Image(ImagePayload {
                width: 1,
                height: 1,
                frame: 0,
                flags: SyncFlags::ANIMATED,
                name: "a".into(),
                pixels: Bytes::from_static(&[0xff, 0x00, 0x00, 0x80]),
            })),
            hex: "490100010000000100010000006104000000ff000080",
        },
        GoldenVector {
            name: "FrameUpdate single frame",
            message: Outbound(OutboundMessage::FrameUpdate(FrameUpdatePayload {
                active_frame: 1,
                name: "a".into(),
                first_visible_frame: 0,
                frames: vec![FrameTiming {
                    index: 0,
                    duration_ms: 100,
                }],
            })),
            hex: "46010000000100000061000000000100000000006400",
        },
        GoldenVector {
            name: "Batch of one empty ActiveSprite",
            message: Outbound(OutboundMessage::Batch(vec![
                OutboundMessage::ActiveSprite {
                    name: String::new(),
                },
            ])),
            hex: "5b0100050000004100000000",
        },
        GoldenVector {
            name: "TextureList one entry",
            message: Inbound(InboundMessage::TextureList {
                session_token: "t".into(),
                entries: vec![TextureEntry::new("a", SyncFlags::SHOW_UV)],
            }),
            hex: "4c010000007401000000610200",
        },
        GoldenVector {
            name: "OpenSprite animated",
            message: Inbound(InboundMessage::OpenSprite {
                path: "/a".into(),
                flags: SyncFlags::ANIMATED,
            }),
            hex: "4f020000002f610100",
        },
        GoldenVector {
            name: "Focus a",
            message: Inbound(InboundMessage::Focus { name: "a".into() }),
            hex: "460100000061",
        },
        GoldenVector {
            name: "NewSprite indexed 2x3",
            message: Inbound(InboundMessage::NewSprite(NewSpritePayload {
                color_mode: ColorMode::Indexed,
                width: 2,
                height: 3,
                flags: SyncFlags::empty(),
                name: "s".into(),
            })),
            hex: "53010200030000000100000073",
        },
        GoldenVector {
            name: "UvOverlay 1x1",
            message: Inbound(InboundMessage::UvOverlay(UvOverlayPayload {
                opacity: 128,
                width: 1,
                height: 1,
                layer: String::new(),
                target: "t".into(),
                pixels: Bytes::from_static(&[0x00, 0xff, 0x00, 0x80]),
            })),
            hex: "4d80010001000000000001000000740400000000ff0080",
        },
        GoldenVector {
            name: "Peek one entry",
            message: Inbound(InboundMessage::Peek {
                entries: vec![TextureEntry::new("a", SyncFlags::ANIMATED)],
            }),
            hex: "50010001000000610100",
        },
    ];

    if let Ok(request) = NewTexturePayload::from_name("n") {
        vectors.push(GoldenVector {
            name: "NewTexture by name",
            message: Outbound(OutboundMessage::NewTexture(request)),
            hex: "4f010000006e00000000",
        });
    }
    vectors
}

/// Decode a vector's hex, ignoring spaces.
pub fn vector_bytes(vector: &GoldenVector) -> anyhow::Result<Vec<u8>> {
    let compact: String = vector.hex.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).with_context(|| format!("vector {:?} has malformed hex", vector.name))
}

/// Check every vector encodes to its bytes and decodes back.
pub fn verify_all_vectors() -> anyhow::Result<()> {
    for vector in all_vectors() {
        let expected = vector_bytes(&vector)?;
        let actual = vector
            .message
            .encode()
            .with_context(|| format!("encoding {:?}", vector.name))?;
        if actual.as_ref() != expected.as_slice() {
            bail!(
                "vector {:?}: expected {}, got {}",
                vector.name,
                hex::encode(&expected),
                hex::encode(&actual)
            );
        }
        if !vector.message.matches(&expected)? {
            bail!("vector {:?} does not decode to its message", vector.name);
        }
    }
    Ok(())
}

/// All vectors as a JSON array.
pub fn export_json() -> anyhow::Result<String> {
    let exported: Vec<ExportedVector> = all_vectors()
        .into_iter()
        .map(|vector| ExportedVector {
            name: vector.name,
            direction: vector.message.direction(),
            kind: match &vector.message {
                VectorMessage::Outbound(m) => m.kind(),
                VectorMessage::Inbound(m) => m.kind(),
            },
            hex: vector.hex,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&exported)?)
}
