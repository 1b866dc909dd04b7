//! Test fixtures and helpers.
//!
//! [`EngineFixture`] wires a connected [`SyncEngine`] to a [`MemoryHost`]
//! and a recording transport. [`FakePeer`] plays the other application:
//! it owns a texture list, builds the frames it would send, and keeps its
//! list in step with the `ChangeName` messages it receives.

use anyhow::{bail, Context};
use bytes::Bytes;
use rand::RngCore;
use spritesync_core::{
    InboundMessage, OutboundMessage, SyncFlags, TextureEntry, UvOverlayPayload, WireMessage,
};
use spritesync_host::{DocHandle, DocumentHost, MemoryHost, NewDocument};
use spritesync_sync::{
    DispatchReport, EngineConfig, Endpoint, MemoryTransport, SocketEvent, SyncEngine,
};

/// Engine type used throughout the fixtures.
pub type TestEngine = SyncEngine<MemoryHost, MemoryTransport>;

/// A connected engine over an in-memory editor.
pub struct EngineFixture {
    pub engine: TestEngine,
}

impl EngineFixture {
    /// An empty editor, already connected.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_host(MemoryHost::new())
    }

    /// Connect an engine over `host`, discarding the greeting.
    pub fn with_host(host: MemoryHost) -> anyhow::Result<Self> {
        let mut engine = SyncEngine::new(host, MemoryTransport::new(), EngineConfig::default());
        engine.connect(Endpoint::new("localhost", 34613))?;
        engine.handle_socket_event(SocketEvent::Opened)?;
        let mut fixture = Self { engine };
        fixture.sent()?;
        Ok(fixture)
    }

    pub fn host(&self) -> &MemoryHost {
        self.engine.host()
    }

    pub fn host_mut(&mut self) -> &mut MemoryHost {
        self.engine.host_mut()
    }

    /// Create an RGB document, make it active and let the engine notice.
    pub fn open_document(&mut self, name: &str, width: u32, height: u32) -> anyhow::Result<DocHandle> {
        let doc = self
            .host_mut()
            .create_document(&NewDocument::rgb(name, width, height))?;
        self.engine.pump_host_events();
        Ok(doc)
    }

    /// Deliver host events queued since the last call.
    pub fn pump(&mut self) -> usize {
        self.engine.pump_host_events()
    }

    /// Deliver one frame from the peer.
    pub fn deliver(&mut self, frame: Bytes) -> anyhow::Result<()> {
        self.engine.handle_socket_event(SocketEvent::Binary(frame))?;
        Ok(())
    }

    /// Deliver one message from the peer and report what happened.
    pub fn deliver_message(&mut self, message: &InboundMessage) -> anyhow::Result<DispatchReport> {
        let frame = message.encode().context("encoding inbound message")?;
        Ok(self.engine.handle_frame(&frame))
    }

    /// Drain what the engine sent, flattening batches.
    pub fn sent(&mut self) -> anyhow::Result<Vec<OutboundMessage>> {
        let messages = self.engine.transport_mut().take_messages()?;
        Ok(flatten(messages))
    }
}

fn flatten(messages: Vec<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        match message {
            OutboundMessage::Batch(inner) => out.extend(flatten(inner)),
            other => out.push(other),
        }
    }
    out
}

/// Random session token for an unsaved peer file: 4 random bytes as hex.
pub fn random_session_token() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// A scripted peer application.
#[derive(Debug, Clone)]
pub struct FakePeer {
    session_token: String,
    textures: Vec<TextureEntry>,
}

impl Default for FakePeer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePeer {
    /// A peer working on an unsaved file.
    pub fn new() -> Self {
        Self::with_token(random_session_token())
    }

    /// A peer whose file is saved at `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            session_token: token.into(),
            textures: Vec::new(),
        }
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Switch to another file, keeping the tracked textures.
    pub fn switch_session(&mut self, token: impl Into<String>) {
        self.session_token = token.into();
    }

    /// Start tracking a texture, or update its flags.
    pub fn track(&mut self, name: &str, flags: SyncFlags) -> &mut Self {
        match self.textures.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.flags = flags,
            None => self.textures.push(TextureEntry::new(name, flags)),
        }
        self
    }

    pub fn untrack(&mut self, name: &str) -> &mut Self {
        self.textures.retain(|entry| entry.name != name);
        self
    }

    pub fn textures(&self) -> &[TextureEntry] {
        &self.textures
    }

    pub fn texture_list(&self) -> InboundMessage {
        InboundMessage::TextureList {
            session_token: self.session_token.clone(),
            entries: self.textures.clone(),
        }
    }

    /// A solid-color image message.
    pub fn image(&self, name: &str, width: u16, height: u16, rgba: [u8; 4]) -> InboundMessage {
        let pixels: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        let flags = self
            .textures
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.flags)
            .unwrap_or_default();
        InboundMessage::Image(spritesync_core::ImagePayload {
            width,
            height,
            frame: 0,
            flags,
            name: name.to_string(),
            pixels: Bytes::from(pixels),
        })
    }

    /// A UV overlay with a single opaque pixel at (0, 0).
    pub fn overlay(&self, target: &str, width: u16, height: u16, rgb: [u8; 3]) -> InboundMessage {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        if let Some(first) = pixels.get_mut(0..4) {
            first.copy_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        InboundMessage::UvOverlay(UvOverlayPayload {
            opacity: 255,
            width,
            height,
            layer: String::new(),
            target: target.to_string(),
            pixels: Bytes::from(pixels),
        })
    }

    /// Encode several messages as one batch frame.
    pub fn batch(&self, messages: Vec<InboundMessage>) -> anyhow::Result<Bytes> {
        Ok(InboundMessage::Batch(messages).encode()?)
    }

    /// Update local state from what the engine sent.
    ///
    /// Renames are applied to the texture list. Fails if the engine renamed
    /// a texture this peer does not track.
    pub fn observe(&mut self, messages: &[OutboundMessage]) -> anyhow::Result<()> {
        for message in messages {
            if let OutboundMessage::ChangeName { from, to } = message {
                let Some(entry) = self.textures.iter_mut().find(|entry| &entry.name == from) else {
                    bail!("rename of untracked texture {from:?}");
                };
                entry.name = to.clone();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_token_shape() {
        let token = random_session_token();
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fixture_round_trip() {
        let mut fixture = EngineFixture::new().unwrap();
        let mut peer = FakePeer::with_token("/blend/scene.blend");
        fixture.open_document("hero", 2, 2).unwrap();
        fixture.sent().unwrap();

        peer.track("hero", SyncFlags::empty());
        fixture.deliver_message(&peer.texture_list()).unwrap();
        let messages = fixture.sent().unwrap();
        assert!(messages
            .iter()
            .any(|m| matches!(m, OutboundMessage::Image(image) if image.name == "hero")));
    }

    #[test]
    fn test_peer_follows_renames() {
        let mut peer = FakePeer::new();
        peer.track("a", SyncFlags::ANIMATED);
        peer.observe(&[OutboundMessage::ChangeName {
            from: "a".into(),
            to: "b".into(),
        }])
        .unwrap();
        assert_eq!(peer.textures()[0].name, "b");

        assert!(peer
            .observe(&[OutboundMessage::ChangeName {
                from: "zzz".into(),
                to: "c".into(),
            }])
            .is_err());
    }

    #[test]
    fn test_solid_image_size() {
        let peer = FakePeer::new();
        let InboundMessage::Image(image) = peer.image("x", 3, 2, [1, 2, 3, 4]) else {
            unreachable!()
        };
        assert_eq!(image.pixels.len(), 24);
        assert_eq!(&image.pixels[20..24], &[1, 2, 3, 4]);
    }
}
