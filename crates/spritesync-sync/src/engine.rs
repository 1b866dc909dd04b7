//! Sync State Machine.
//!
//! [`SyncEngine`] reacts to three kinds of input, all delivered on the
//! editor's thread:
//!
//! - host events (active document or frame changed, content edited, the set
//!   of open documents changed), fed through [`SyncEngine::handle_host_event`]
//!   or [`SyncEngine::pump_host_events`];
//! - socket events, fed through [`SyncEngine::handle_socket_event`];
//! - local UI actions ([`SyncEngine::set_active_flag`],
//!   [`SyncEngine::request_new_texture`]).
//!
//! Applying a peer message edits documents, and those edits queue host events
//! of their own. Such edits run inside a suppressed scope: queued events are
//! discarded when the scope ends and a single reconciliation runs instead.

use std::mem;

use spritesync_core::{
    unbatch, ImagePayload, InboundMessage, NewSpritePayload, NewTexturePayload, OutboundMessage,
    SyncFlags, TextureEntry, UvOverlayPayload,
};
use spritesync_host::{DocumentHost, HostError, HostEvent, NewDocument, PixelFormat, PixelImage};
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionState};
use crate::entries::SyncEntryTable;
use crate::error::Result;
use crate::overlay::{palettize, OverlayRenderer};
use crate::registry::{same_document, DocumentRegistry};
use crate::transfer::PixelTransfer;
use crate::transport::{Endpoint, SocketEvent, Transport};

/// Layer used for UV overlays that arrive without a layer name.
pub const DEFAULT_OVERLAY_LAYER: &str = "UVMap";

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub overlay_layer: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overlay_layer: DEFAULT_OVERLAY_LAYER.to_string(),
        }
    }
}

/// Outcome of one inbound frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages decoded and applied.
    pub applied: usize,
    /// Messages that failed to decode or to apply.
    pub rejected: usize,
}

#[derive(Debug)]
struct Watched<D> {
    handle: D,
    /// Name when watching started or was last reconciled.
    name: String,
    frame: Option<u32>,
}

/// Keeps host documents and the peer in step.
pub struct SyncEngine<H: DocumentHost, T> {
    host: H,
    connection: Connection<T>,
    registry: DocumentRegistry<H::Handle>,
    entries: SyncEntryTable,
    transfer: PixelTransfer,
    overlay: OverlayRenderer,
    config: EngineConfig,
    watched: Option<Watched<H::Handle>>,
    suspend_depth: u32,
    /// A document became tracked while suppressed; announce the active one.
    announce: bool,
}

impl<H: DocumentHost, T: Transport> SyncEngine<H, T> {
    pub fn new(host: H, transport: T, config: EngineConfig) -> Self {
        let mut engine = Self {
            host,
            connection: Connection::new(transport),
            registry: DocumentRegistry::new(),
            entries: SyncEntryTable::new(),
            transfer: PixelTransfer::new(),
            overlay: OverlayRenderer::new(),
            config,
            watched: None,
            suspend_depth: 0,
            announce: false,
        };
        engine.registry.unbind_closed(&engine.host);
        engine
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn transport(&self) -> &T {
        self.connection.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.connection.transport_mut()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn registry(&self) -> &DocumentRegistry<H::Handle> {
        &self.registry
    }

    pub fn entries(&self) -> &SyncEntryTable {
        &self.entries
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop watching, close the socket and hand back the host and transport.
    pub fn shutdown(mut self) -> (H, T) {
        if let Some(watched) = self.watched.take() {
            self.host.unwatch(&watched.handle);
        }
        self.connection.close();
        (self.host, self.connection.into_transport())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn connect(&mut self, endpoint: Endpoint) -> Result<()> {
        self.connection.connect(endpoint)
    }

    pub fn reconnect(&mut self) -> Result<()> {
        self.pause_watching();
        self.connection.reconnect()
    }

    pub fn disconnect(&mut self) {
        self.connection.close();
        self.pause_watching();
    }

    pub fn handle_socket_event(&mut self, event: SocketEvent) -> Result<()> {
        match event {
            SocketEvent::Opened => self.on_opened(),
            SocketEvent::Binary(frame) => {
                if !self.connection.is_connected() {
                    debug!(len = frame.len(), "frame ignored while not connected");
                    return Ok(());
                }
                let report = self.handle_frame(&frame);
                debug!(
                    applied = report.applied,
                    rejected = report.rejected,
                    "inbound frame handled"
                );
                Ok(())
            }
            SocketEvent::Closed => {
                self.connection.on_closed();
                self.pause_watching();
                Ok(())
            }
        }
    }

    fn on_opened(&mut self) -> Result<()> {
        self.connection.on_opened()?;
        self.entries.clear();
        if let Some(previous) = self.watched.take() {
            self.host.unwatch(&previous.handle);
        }
        if let Some(doc) = self.host.active_document() {
            self.watch(doc)?;
        }
        self.send_active_sprite()
    }

    fn pause_watching(&mut self) {
        if let Some(watched) = &self.watched {
            self.host.unwatch(&watched.handle);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Host events
    // ─────────────────────────────────────────────────────────────────────────

    /// Drain and handle every queued host event. Failures are logged.
    ///
    /// Returns how many events were handled.
    pub fn pump_host_events(&mut self) -> usize {
        let events = self.host.take_events();
        let count = events.len();
        for event in events {
            if let Err(e) = self.handle_host_event(event) {
                warn!(error = %e, "host event failed");
            }
        }
        count
    }

    pub fn handle_host_event(&mut self, event: HostEvent<H::Handle>) -> Result<()> {
        if self.suspend_depth > 0 {
            debug!("host event ignored while suspended");
            return Ok(());
        }
        match event {
            HostEvent::SiteChanged => self.on_site_changed(),
            HostEvent::DocumentChanged(doc) => self.on_document_changed(&doc),
            HostEvent::DocumentsChanged => {
                self.registry.unbind_closed(&self.host);
                Ok(())
            }
        }
    }

    fn on_site_changed(&mut self) -> Result<()> {
        let active = self.host.active_document();
        let frame = self.host.active_frame();

        let same_frame = match (&self.watched, &active) {
            (None, None) => return Ok(()),
            (Some(watched), Some(doc)) if same_document(&self.host, &watched.handle, doc) => {
                Some(watched.frame == frame)
            }
            _ => None,
        };

        match (same_frame, active) {
            (Some(true), _) => Ok(()),
            (Some(false), Some(doc)) => {
                if let Some(watched) = self.watched.as_mut() {
                    watched.frame = frame;
                }
                self.on_frame_changed(&doc, frame.unwrap_or(1))
            }
            (_, active) => self.switch_document(active),
        }
    }

    fn switch_document(&mut self, active: Option<H::Handle>) -> Result<()> {
        if let Err(e) = self.check_rename() {
            warn!(error = %e, "rename check failed");
        }
        if let Some(previous) = self.watched.take() {
            self.host.unwatch(&previous.handle);
        }
        self.registry.unbind_closed(&self.host);

        if let Some(doc) = active {
            self.watch(doc.clone())?;
            let flags = self
                .connection
                .is_connected()
                .then(|| self.tracked_flags(&doc))
                .flatten();
            if let Some(flags) = flags {
                let frame = self.host.active_frame().unwrap_or(1);
                self.transmit(&doc, flags, frame)?;
            }
        }
        self.send_active_sprite()
    }

    fn watch(&mut self, doc: H::Handle) -> Result<()> {
        let info = self.host.document_info(&doc)?;
        if self.connection.is_connected() {
            self.host.watch(&doc)?;
        }
        if let Some(flags) = self.entries.get(&info.name) {
            self.registry
                .bind(&self.host, &doc, self.entries.session_token(), flags);
        }
        debug!(name = %info.name, "watching document");
        self.watched = Some(Watched {
            handle: doc,
            name: info.name,
            frame: self.host.active_frame(),
        });
        Ok(())
    }

    /// Notice a rename of the watched document and tell the peer about it.
    fn check_rename(&mut self) -> Result<()> {
        let Some(watched) = self.watched.as_mut() else {
            return Ok(());
        };
        let name = match self.host.document_info(&watched.handle) {
            Ok(info) => info.name,
            Err(HostError::StaleDocument) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if name == watched.name {
            return Ok(());
        }

        let old = mem::replace(&mut watched.name, name.clone());
        if old.is_empty() || !self.entries.rename(&old, &name) {
            debug!(from = %old, to = %name, "untracked document renamed");
            return Ok(());
        }
        info!(from = %old, to = %name, "tracked document renamed");
        self.send(OutboundMessage::ChangeName {
            from: old,
            to: name,
        })
    }

    fn on_document_changed(&mut self, doc: &H::Handle) -> Result<()> {
        let is_watched = self
            .watched
            .as_ref()
            .is_some_and(|watched| same_document(&self.host, &watched.handle, doc));
        if !is_watched {
            return Ok(());
        }
        self.check_rename()?;
        self.resync(doc)
    }

    fn on_frame_changed(&mut self, doc: &H::Handle, frame: u32) -> Result<()> {
        if !self.connection.is_connected() {
            return Ok(());
        }
        let Some(flags) = self.tracked_flags(doc) else {
            return Ok(());
        };
        if flags.is_animated() {
            let update = PixelTransfer::frame_update(&self.host, doc, frame)?;
            self.send(OutboundMessage::FrameUpdate(update))
        } else {
            let image = self.transfer.image(&self.host, doc, frame, flags)?;
            self.send(OutboundMessage::Image(image))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outbound
    // ─────────────────────────────────────────────────────────────────────────

    /// Sync attributes of `doc` if it is tracked by the live session.
    ///
    /// Requires both a sync entry under the document's current name and a
    /// binding whose origin is the current session token.
    pub fn tracked_flags(&self, doc: &H::Handle) -> Option<SyncFlags> {
        let info = self.host.document_info(doc).ok()?;
        let flags = self.entries.get(&info.name)?;
        let binding = self.registry.lookup(&self.host, doc)?;
        binding
            .is_valid_for(self.entries.session_token())
            .then_some(flags)
    }

    fn resync(&mut self, doc: &H::Handle) -> Result<()> {
        if !self.connection.is_connected() {
            return Ok(());
        }
        let Some(flags) = self.tracked_flags(doc) else {
            return Ok(());
        };
        let frame = self.host.active_frame().unwrap_or(1);
        self.transmit(doc, flags, frame)
    }

    /// Spritesheet for animated documents, a single image otherwise.
    fn transmit(&mut self, doc: &H::Handle, flags: SyncFlags, frame: u32) -> Result<()> {
        let message = if flags.is_animated() {
            OutboundMessage::Spritesheet(self.transfer.spritesheet(&self.host, doc, frame)?)
        } else {
            OutboundMessage::Image(self.transfer.image(&self.host, doc, frame, flags)?)
        };
        self.send(message)
    }

    fn send_active_sprite(&mut self) -> Result<()> {
        self.announce = false;
        let name = self
            .host
            .active_document()
            .filter(|doc| self.tracked_flags(doc).is_some())
            .and_then(|doc| self.host.document_info(&doc).ok())
            .map(|info| info.name)
            .unwrap_or_default();
        self.send(OutboundMessage::ActiveSprite { name })
    }

    /// Local changes are dropped while disconnected.
    fn send(&mut self, message: OutboundMessage) -> Result<()> {
        if !self.connection.is_connected() {
            debug!(kind = message.kind(), "not connected, dropping");
            return Ok(());
        }
        self.connection.send(&message)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local actions
    // ─────────────────────────────────────────────────────────────────────────

    /// Ask the peer to create a texture for the active document: by path
    /// when it has been saved, by name otherwise.
    pub fn request_new_texture(&mut self) -> Result<()> {
        let doc = self
            .host
            .active_document()
            .ok_or_else(|| HostError::NotFound("active document".into()))?;
        let name = self.host.document_info(&doc)?.name;
        if name.is_empty() {
            return Err(HostError::InvalidArgument("document has no name".into()).into());
        }
        let payload = if name.contains('/') || name.contains('\\') {
            NewTexturePayload::from_path(name)?
        } else {
            NewTexturePayload::from_name(name)?
        };
        self.connection
            .send(&OutboundMessage::NewTexture(payload))
    }

    /// Toggle an attribute of the active document and resync it.
    ///
    /// Returns false when the active document is not tracked.
    pub fn set_active_flag(&mut self, flag: SyncFlags, value: bool) -> Result<bool> {
        let Some(doc) = self.host.active_document() else {
            return Ok(false);
        };
        let name = self.host.document_info(&doc)?.name;
        if !self.entries.set_flag(&name, flag, value) {
            return Ok(false);
        }
        if let Some(binding) = self.registry.lookup_mut(&self.host, &doc) {
            if flag.contains(SyncFlags::ANIMATED) {
                binding.animated = value;
            }
            if flag.contains(SyncFlags::SHOW_UV) {
                binding.show_uv = value;
            }
        }
        info!(name = %name, ?flag, value, "sync flag changed");
        self.resync(&doc)?;
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound
    // ─────────────────────────────────────────────────────────────────────────

    /// Decode and apply one frame from the peer.
    ///
    /// Batches are unwrapped in order. A sub-message that fails to decode or
    /// apply is logged and skipped; the rest still run.
    pub fn handle_frame(&mut self, frame: &[u8]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for decoded in unbatch::<InboundMessage>(frame) {
            match decoded {
                Ok(message) => {
                    let kind = message.kind();
                    match self.dispatch(message) {
                        Ok(()) => report.applied += 1,
                        Err(e) => {
                            report.rejected += 1;
                            warn!(kind, error = %e, "inbound message failed");
                        }
                    }
                }
                Err(e) => {
                    report.rejected += 1;
                    warn!(error = %e, "malformed inbound message skipped");
                }
            }
        }
        report
    }

    /// Apply one decoded message.
    pub fn dispatch(&mut self, message: InboundMessage) -> Result<()> {
        debug!(kind = message.kind(), "dispatching");
        match message {
            InboundMessage::Image(image) => self.suppressed(|engine| engine.apply_image(image)),
            InboundMessage::NewSprite(sprite) => {
                self.suppressed(|engine| engine.apply_new_sprite(sprite))
            }
            InboundMessage::UvOverlay(overlay) => {
                self.suppressed(|engine| engine.apply_overlay(overlay))
            }
            InboundMessage::TextureList {
                session_token,
                entries,
            } => self.apply_texture_list(session_token, entries),
            InboundMessage::OpenSprite { path, flags } => {
                self.suppressed(|engine| engine.apply_open_sprite(path, flags))
            }
            InboundMessage::Focus { name } => self.suppressed(|engine| engine.apply_focus(&name)),
            InboundMessage::Peek { entries } => self.peek(entries),
            InboundMessage::Batch(messages) => {
                for message in messages {
                    let kind = message.kind();
                    if let Err(e) = self.dispatch(message) {
                        warn!(kind, error = %e, "batched message failed");
                    }
                }
                Ok(())
            }
        }
    }

    /// Run `apply` with local change processing suspended, then reconcile
    /// once.
    fn suppressed<R>(&mut self, apply: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let result = self.without_reconcile(apply);
        if self.suspend_depth == 0 {
            self.on_site_changed()?;
            if mem::take(&mut self.announce) {
                self.send_active_sprite()?;
            }
        }
        result
    }

    /// Run `apply` with local change processing suspended. Host events it
    /// causes are discarded.
    fn without_reconcile<R>(&mut self, apply: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        if self.suspend_depth == 0 {
            self.pump_host_events();
        }
        self.suspend_depth += 1;
        let result = apply(self);
        self.suspend_depth -= 1;

        if self.suspend_depth == 0 {
            let discarded = self.host.take_events().len();
            self.registry.unbind_closed(&self.host);
            debug!(discarded, "local change processing resumed");
        }
        result
    }

    fn find_by_name(&self, name: &str) -> Option<H::Handle> {
        self.host.open_documents().into_iter().find(|doc| {
            self.host
                .document_info(doc)
                .map(|info| info.name == name)
                .unwrap_or(false)
        })
    }

    fn track(&mut self, doc: &H::Handle, name: &str, flags: SyncFlags) {
        let was_tracked = self.tracked_flags(doc).is_some();
        self.entries.insert(name, flags);
        self.registry
            .bind(&self.host, doc, self.entries.session_token(), flags);
        if !was_tracked {
            self.announce = true;
        }
    }

    fn focus_or_create(&mut self, name: &str, spec: &NewDocument) -> Result<H::Handle> {
        let existing = if name.is_empty() {
            None
        } else {
            self.find_by_name(name)
        };
        match existing {
            Some(doc) => {
                self.host.set_active(&doc)?;
                Ok(doc)
            }
            None => Ok(self.host.create_document(spec)?),
        }
    }

    fn apply_image(&mut self, image: ImagePayload) -> Result<()> {
        let (width, height) = (image.width as u32, image.height as u32);
        let rgba = PixelImage::from_data(width, height, PixelFormat::Rgba, image.pixels.to_vec())?;
        let doc = self.focus_or_create(&image.name, &NewDocument::rgb(&image.name, width, height))?;

        let info = self.host.document_info(&doc)?;
        if info.width != width || info.height != height {
            self.host.resize(&doc, width, height)?;
        }
        let pixels = if info.color_mode.is_paletted() {
            let palette = self.host.palette(&doc)?;
            let indices = palettize(&rgba.data, &palette, 0);
            PixelImage::from_data(width, height, PixelFormat::Indexed, indices)?
        } else {
            rgba
        };
        let frame = (image.frame as u32 + 1).min(info.frame_count);
        self.host.write_frame_pixels(&doc, frame, pixels)?;

        if !image.name.is_empty() {
            self.track(&doc, &image.name, image.flags);
        }
        info!(name = %image.name, width, height, "image applied");
        Ok(())
    }

    fn apply_new_sprite(&mut self, sprite: NewSpritePayload) -> Result<()> {
        let spec = NewDocument::rgb(&sprite.name, sprite.width as u32, sprite.height as u32)
            .with_color_mode(sprite.color_mode);
        let doc = self.focus_or_create(&sprite.name, &spec)?;
        if !sprite.name.is_empty() {
            self.track(&doc, &sprite.name, sprite.flags);
        }
        info!(name = %sprite.name, mode = ?sprite.color_mode, "sprite created");
        Ok(())
    }

    fn apply_overlay(&mut self, overlay: UvOverlayPayload) -> Result<()> {
        let target = if overlay.target.is_empty() {
            self.host.active_document()
        } else {
            self.find_by_name(&overlay.target)
        };
        let doc = target
            .ok_or_else(|| HostError::NotFound(format!("overlay target {:?}", overlay.target)))?;
        let layer = if overlay.layer.is_empty() {
            self.config.overlay_layer.as_str()
        } else {
            overlay.layer.as_str()
        };
        self.overlay.apply(&mut self.host, &doc, &overlay, layer)?;
        Ok(())
    }

    fn apply_texture_list(&mut self, token: String, entries: Vec<TextureEntry>) -> Result<()> {
        self.entries.replace(token, entries);

        let mut rebound = 0;
        for doc in self.host.open_documents() {
            let Ok(info) = self.host.document_info(&doc) else {
                continue;
            };
            if let Some(flags) = self.entries.get(&info.name) {
                self.registry
                    .bind(&self.host, &doc, self.entries.session_token(), flags);
                rebound += 1;
            }
        }
        info!(
            token = %self.entries.session_token(),
            entries = self.entries.len(),
            rebound,
            "texture list applied"
        );

        if let Some(doc) = self.host.active_document() {
            if let Some(flags) = self.tracked_flags(&doc) {
                let frame = self.host.active_frame().unwrap_or(1);
                self.transmit(&doc, flags, frame)?;
            }
        }
        self.send_active_sprite()
    }

    fn apply_open_sprite(&mut self, path: String, flags: SyncFlags) -> Result<()> {
        let doc = match self.find_by_name(&path) {
            Some(doc) => {
                self.host.set_active(&doc)?;
                doc
            }
            None => self.host.open_file(&path, true)?,
        };
        self.track(&doc, &path, flags);
        info!(path = %path, "sprite opened");
        Ok(())
    }

    fn apply_focus(&mut self, name: &str) -> Result<()> {
        match self.find_by_name(name) {
            Some(doc) => self.host.set_active(&doc)?,
            None => debug!(name, "focus target not open"),
        }
        Ok(())
    }

    /// Send each named texture without disturbing the visible state.
    fn peek(&mut self, entries: Vec<TextureEntry>) -> Result<()> {
        let previous = self.host.active_document();
        self.without_reconcile(|engine| {
            for entry in &entries {
                if let Err(e) = engine.peek_one(entry) {
                    warn!(name = %entry.name, error = %e, "peek failed");
                }
            }
            if let Some(previous) = previous {
                let moved = engine
                    .host
                    .active_document()
                    .map_or(true, |now| !same_document(&engine.host, &now, &previous));
                if moved && engine.host.document_info(&previous).is_ok() {
                    engine.host.set_active(&previous)?;
                }
            }
            Ok(())
        })
    }

    fn peek_one(&mut self, entry: &TextureEntry) -> Result<()> {
        let (doc, opened) = match self.find_by_name(&entry.name) {
            Some(doc) => (doc, false),
            None => (self.host.open_file(&entry.name, false)?, true),
        };
        let sent = self.transmit(&doc, entry.flags, 1);
        if opened {
            self.host.close_document(&doc)?;
        }
        sent
    }
}
