//! In-memory implementation of the DocumentHost trait.
//!
//! A small but complete editor model: documents with frames, layers, cels,
//! tags and palettes, a virtual disk for `open_file`, and an event queue.
//! Handles carry a slot generation, so a handle to a closed document stays
//! stale even after its slot is reused.

use std::cell::Cell;
use std::collections::HashMap;
use std::mem;

use spritesync_core::ColorMode;
use tracing::debug;

use crate::error::{HostError, Result};
use crate::model::{
    DocumentInfo, LayerId, LayerSpec, NewDocument, Palette, PixelBuffer, PixelFormat, PixelImage,
    TagSpan,
};
use crate::traits::{DocumentHost, HostEvent};

const DEFAULT_FRAME_DURATION_MS: u32 = 100;

/// Handle to a [`MemoryHost`] document.
///
/// Deliberately not `PartialEq`: compare through
/// [`DocumentHost::same_document`].
#[derive(Debug, Clone)]
pub struct DocHandle {
    slot: usize,
    generation: u32,
}

/// Read-only view of a layer, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerView {
    pub id: LayerId,
    pub name: String,
    pub opacity: u8,
    pub reference: bool,
    /// Cels keyed by one-based frame number, sorted.
    pub cels: Vec<(u32, PixelImage)>,
}

#[derive(Debug, Clone)]
struct MemoryLayer {
    id: LayerId,
    name: String,
    opacity: u8,
    reference: bool,
    cels: HashMap<u32, PixelImage>,
}

#[derive(Debug, Clone)]
struct MemoryDocument {
    name: String,
    width: u32,
    height: u32,
    color_mode: ColorMode,
    durations: Vec<u32>,
    layers: Vec<MemoryLayer>,
    tags: Vec<TagSpan>,
    active_tag: Option<String>,
    palette: Palette,
    current_frame: u32,
    watched: bool,
    visible: bool,
    next_layer_id: u32,
}

impl MemoryDocument {
    fn new(spec: &NewDocument) -> Self {
        let palette = match spec.color_mode {
            ColorMode::Rgb | ColorMode::Indexed => Palette::basic(),
            ColorMode::Grayscale => Palette::grayscale(),
        };
        let mut doc = Self {
            name: spec.name.clone(),
            width: spec.width,
            height: spec.height,
            color_mode: spec.color_mode,
            durations: vec![DEFAULT_FRAME_DURATION_MS],
            layers: Vec::new(),
            tags: Vec::new(),
            active_tag: None,
            palette,
            current_frame: 1,
            watched: false,
            visible: true,
            next_layer_id: 1,
        };
        let background = doc.blank_cel();
        let id = doc.allocate_layer_id();
        doc.layers.push(MemoryLayer {
            id,
            name: "Layer 1".into(),
            opacity: 255,
            reference: false,
            cels: HashMap::from([(1, background)]),
        });
        doc
    }

    fn format(&self) -> PixelFormat {
        if self.color_mode.is_paletted() {
            PixelFormat::Indexed
        } else {
            PixelFormat::Rgba
        }
    }

    fn blank_cel(&self) -> PixelImage {
        match self.format() {
            PixelFormat::Rgba => PixelImage::blank(self.width, self.height, PixelFormat::Rgba),
            PixelFormat::Indexed => {
                PixelImage::filled_index(self.width, self.height, self.palette.transparent_index)
            }
        }
    }

    fn allocate_layer_id(&mut self) -> LayerId {
        let id = LayerId(self.next_layer_id);
        self.next_layer_id += 1;
        id
    }

    fn frame_count(&self) -> u32 {
        self.durations.len() as u32
    }

    fn check_frame(&self, frame: u32) -> Result<()> {
        if frame == 0 || frame > self.frame_count() {
            return Err(HostError::InvalidArgument(format!(
                "frame {frame} out of range 1..={}",
                self.frame_count()
            )));
        }
        Ok(())
    }

    fn paint_layer_mut(&mut self) -> Result<&mut MemoryLayer> {
        self.layers
            .iter_mut()
            .find(|layer| !layer.reference)
            .ok_or_else(|| HostError::NotFound("paintable layer".into()))
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut MemoryLayer> {
        self.layers
            .iter_mut()
            .find(|layer| layer.id == id)
            .ok_or_else(|| HostError::NotFound(format!("layer {}", id.0)))
    }

    /// Source color of a cel pixel as straight RGBA.
    fn cel_color(&self, cel: &PixelImage, x: u32, y: u32) -> [u8; 4] {
        let px = cel.pixel(x, y);
        match cel.format {
            PixelFormat::Rgba => [px[0], px[1], px[2], px[3]],
            PixelFormat::Indexed => {
                if px[0] == self.palette.transparent_index {
                    [0, 0, 0, 0]
                } else {
                    self.palette.get(px[0]).unwrap_or([0, 0, 0, 0])
                }
            }
        }
    }
}

/// Straight-alpha "over" of `src` onto `dst`.
fn blend_over(dst: &mut [u8], src: [u8; 4], opacity: u8) {
    let sa = src[3] as u32 * opacity as u32 / 255;
    if sa == 0 {
        return;
    }
    let da = dst[3] as u32;
    let out_a = sa + da * (255 - sa) / 255;
    if out_a == 0 {
        return;
    }
    for c in 0..3 {
        let sc = src[c] as u32;
        let dc = dst[c] as u32;
        dst[c] = ((sc * sa + dc * da * (255 - sa) / 255) / out_a) as u8;
    }
    dst[3] = out_a as u8;
}

/// Crop or pad `image` to a new size, anchored top-left.
fn resize_image(image: &PixelImage, width: u32, height: u32, fill: u8) -> PixelImage {
    let bpp = image.format.bytes_per_pixel();
    let mut data = vec![fill; width as usize * height as usize * bpp];
    let copy_w = image.width.min(width) as usize * bpp;
    for y in 0..image.height.min(height) as usize {
        let src = y * image.width as usize * bpp;
        let dst = y * width as usize * bpp;
        data[dst..dst + copy_w].copy_from_slice(&image.data[src..src + copy_w]);
    }
    PixelImage {
        width,
        height,
        format: image.format,
        data,
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    doc: Option<MemoryDocument>,
}

/// In-memory editor.
#[derive(Debug, Default)]
pub struct MemoryHost {
    slots: Vec<Slot>,
    active: Option<usize>,
    play_all: bool,
    files: HashMap<String, MemoryDocument>,
    events: Vec<HostEvent<DocHandle>>,
    renders: Cell<usize>,
}

impl MemoryHost {
    /// Create an editor with no documents.
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, slot: usize) -> DocHandle {
        DocHandle {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn doc(&self, handle: &DocHandle) -> Result<&MemoryDocument> {
        self.slots
            .get(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.doc.as_ref())
            .ok_or(HostError::StaleDocument)
    }

    fn doc_mut(&mut self, handle: &DocHandle) -> Result<&mut MemoryDocument> {
        self.slots
            .get_mut(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.doc.as_mut())
            .ok_or(HostError::StaleDocument)
    }

    fn changed(&mut self, handle: &DocHandle) {
        if self.doc(handle).map(|doc| doc.watched).unwrap_or(false) {
            let handle = self.handle(handle.slot);
            self.events.push(HostEvent::DocumentChanged(handle));
        }
    }

    fn insert(&mut self, doc: MemoryDocument) -> DocHandle {
        let slot = match self.slots.iter().position(|slot| slot.doc.is_none()) {
            Some(free) => {
                self.slots[free].doc = Some(doc);
                free
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    doc: Some(doc),
                });
                self.slots.len() - 1
            }
        };
        self.events.push(HostEvent::DocumentsChanged);
        self.handle(slot)
    }

    fn activate(&mut self, slot: usize) {
        if let Some(doc) = self.slots[slot].doc.as_mut() {
            doc.visible = true;
        }
        if self.active != Some(slot) {
            self.active = Some(slot);
        }
        self.events.push(HostEvent::SiteChanged);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scripting helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Put a blank document on the virtual disk under `path`.
    pub fn store_file(&mut self, path: &str, spec: NewDocument) {
        let mut doc = MemoryDocument::new(&spec);
        doc.name = path.to_string();
        self.files.insert(path.to_string(), doc);
    }

    /// Save a document to the virtual disk, renaming it to `path`.
    pub fn save_as(&mut self, handle: &DocHandle, path: &str) -> Result<()> {
        let doc = self.doc_mut(handle)?;
        doc.name = path.to_string();
        let mut stored = doc.clone();
        stored.watched = false;
        self.files.insert(path.to_string(), stored);
        self.changed(handle);
        Ok(())
    }

    /// Whether `path` exists on the virtual disk.
    pub fn file_exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Append a frame with a blank cel. Returns its one-based number.
    pub fn add_frame(&mut self, handle: &DocHandle, duration_ms: u32) -> Result<u32> {
        let doc = self.doc_mut(handle)?;
        doc.durations.push(duration_ms);
        let frame = doc.frame_count();
        let blank = doc.blank_cel();
        doc.paint_layer_mut()?.cels.insert(frame, blank);
        self.changed(handle);
        Ok(frame)
    }

    pub fn set_frame_duration(&mut self, handle: &DocHandle, frame: u32, ms: u32) -> Result<()> {
        let doc = self.doc_mut(handle)?;
        doc.check_frame(frame)?;
        doc.durations[frame as usize - 1] = ms;
        self.changed(handle);
        Ok(())
    }

    pub fn add_tag(&mut self, handle: &DocHandle, tag: TagSpan) -> Result<()> {
        let doc = self.doc_mut(handle)?;
        doc.check_frame(tag.from)?;
        doc.check_frame(tag.to)?;
        doc.tags.push(tag);
        self.changed(handle);
        Ok(())
    }

    /// Constrain playback to a tag, or clear it with `None`.
    pub fn set_active_tag(&mut self, handle: &DocHandle, name: Option<&str>) -> Result<()> {
        let doc = self.doc_mut(handle)?;
        if let Some(name) = name {
            if !doc.tags.iter().any(|tag| tag.name == name) {
                return Err(HostError::NotFound(format!("tag {name}")));
            }
        }
        doc.active_tag = name.map(str::to_string);
        Ok(())
    }

    /// Move the active document's playhead.
    pub fn set_active_frame(&mut self, frame: u32) -> Result<()> {
        let slot = self
            .active
            .ok_or_else(|| HostError::NotFound("active document".into()))?;
        let handle = self.handle(slot);
        let doc = self.doc_mut(&handle)?;
        doc.check_frame(frame)?;
        doc.current_frame = frame;
        self.events.push(HostEvent::SiteChanged);
        Ok(())
    }

    pub fn set_play_all(&mut self, play_all: bool) {
        self.play_all = play_all;
    }

    pub fn set_palette(&mut self, handle: &DocHandle, palette: Palette) -> Result<()> {
        self.doc_mut(handle)?.palette = palette;
        self.changed(handle);
        Ok(())
    }

    /// Paint one RGBA pixel on the first paintable layer of an RGB document.
    pub fn paint_pixel(
        &mut self,
        handle: &DocHandle,
        frame: u32,
        x: u32,
        y: u32,
        rgba: [u8; 4],
    ) -> Result<()> {
        self.paint(handle, frame, x, y, &rgba)
    }

    /// Paint one palette index on the first paintable layer of a paletted
    /// document.
    pub fn paint_index(
        &mut self,
        handle: &DocHandle,
        frame: u32,
        x: u32,
        y: u32,
        index: u8,
    ) -> Result<()> {
        self.paint(handle, frame, x, y, &[index])
    }

    fn paint(&mut self, handle: &DocHandle, frame: u32, x: u32, y: u32, value: &[u8]) -> Result<()> {
        let doc = self.doc_mut(handle)?;
        doc.check_frame(frame)?;
        if x >= doc.width || y >= doc.height {
            return Err(HostError::InvalidArgument(format!("pixel ({x}, {y}) outside canvas")));
        }
        let bpp = doc.format().bytes_per_pixel();
        if value.len() != bpp {
            return Err(HostError::InvalidArgument(format!(
                "{} bytes per pixel expected",
                bpp
            )));
        }
        let blank = doc.blank_cel();
        let width = doc.width;
        let cel = doc.paint_layer_mut()?.cels.entry(frame).or_insert(blank);
        let offset = (y as usize * width as usize + x as usize) * bpp;
        cel.data[offset..offset + bpp].copy_from_slice(value);
        self.changed(handle);
        Ok(())
    }

    /// Every layer, bottom to top.
    pub fn layers(&self, handle: &DocHandle) -> Result<Vec<LayerView>> {
        let doc = self.doc(handle)?;
        Ok(doc
            .layers
            .iter()
            .map(|layer| {
                let mut cels: Vec<(u32, PixelImage)> = layer
                    .cels
                    .iter()
                    .map(|(frame, image)| (*frame, image.clone()))
                    .collect();
                cels.sort_by_key(|(frame, _)| *frame);
                LayerView {
                    id: layer.id,
                    name: layer.name.clone(),
                    opacity: layer.opacity,
                    reference: layer.reference,
                    cels,
                }
            })
            .collect())
    }

    /// Whether the document is shown in a tab.
    pub fn is_visible(&self, handle: &DocHandle) -> Result<bool> {
        Ok(self.doc(handle)?.visible)
    }

    /// Whether the document is still open.
    pub fn is_open(&self, handle: &DocHandle) -> bool {
        self.doc(handle).is_ok()
    }

    /// Frames composited so far.
    pub fn render_count(&self) -> usize {
        self.renders.get()
    }

    pub fn document_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.doc.is_some()).count()
    }

    /// Find an open document by stored name.
    pub fn find_by_name(&self, name: &str) -> Option<DocHandle> {
        self.slots
            .iter()
            .position(|slot| slot.doc.as_ref().is_some_and(|doc| doc.name == name))
            .map(|slot| self.handle(slot))
    }
}

impl DocumentHost for MemoryHost {
    type Handle = DocHandle;

    fn open_documents(&self) -> Vec<DocHandle> {
        (0..self.slots.len())
            .filter(|&slot| self.slots[slot].doc.is_some())
            .map(|slot| self.handle(slot))
            .collect()
    }

    fn active_document(&self) -> Option<DocHandle> {
        self.active
            .filter(|&slot| self.slots[slot].doc.is_some())
            .map(|slot| self.handle(slot))
    }

    fn active_frame(&self) -> Option<u32> {
        self.active
            .and_then(|slot| self.slots[slot].doc.as_ref())
            .map(|doc| doc.current_frame)
    }

    fn same_document(&self, a: &DocHandle, b: &DocHandle) -> Result<bool> {
        self.doc(a)?;
        self.doc(b)?;
        Ok(a.slot == b.slot)
    }

    fn document_info(&self, doc: &DocHandle) -> Result<DocumentInfo> {
        let doc = self.doc(doc)?;
        Ok(DocumentInfo {
            name: doc.name.clone(),
            width: doc.width,
            height: doc.height,
            color_mode: doc.color_mode,
            frame_count: doc.frame_count(),
        })
    }

    fn frame_durations(&self, doc: &DocHandle) -> Result<Vec<u32>> {
        Ok(self.doc(doc)?.durations.clone())
    }

    fn tags(&self, doc: &DocHandle) -> Result<Vec<TagSpan>> {
        Ok(self.doc(doc)?.tags.clone())
    }

    fn active_tag(&self, doc: &DocHandle) -> Result<Option<TagSpan>> {
        let doc = self.doc(doc)?;
        Ok(doc
            .active_tag
            .as_ref()
            .and_then(|name| doc.tags.iter().find(|tag| &tag.name == name))
            .cloned())
    }

    fn play_all(&self) -> bool {
        self.play_all
    }

    fn render_frame(&self, doc: &DocHandle, frame: u32, target: &mut PixelBuffer) -> Result<()> {
        let doc = self.doc(doc)?;
        doc.check_frame(frame)?;
        self.renders.set(self.renders.get() + 1);
        if target.width() != doc.width || target.height() != doc.height {
            return Err(HostError::InvalidArgument(format!(
                "render target is {}x{}, document is {}x{}",
                target.width(),
                target.height(),
                doc.width,
                doc.height
            )));
        }

        target.clear();
        let width = doc.width;
        let out = target.as_bytes_mut();
        for layer in doc.layers.iter().filter(|layer| !layer.reference) {
            let Some(cel) = layer.cels.get(&frame) else {
                continue;
            };
            for y in 0..doc.height {
                for x in 0..width {
                    let color = doc.cel_color(cel, x, y);
                    let offset = (y as usize * width as usize + x as usize) * 4;
                    blend_over(&mut out[offset..offset + 4], color, layer.opacity);
                }
            }
        }
        Ok(())
    }

    fn palette(&self, doc: &DocHandle) -> Result<Palette> {
        Ok(self.doc(doc)?.palette.clone())
    }

    fn find_layer(&self, doc: &DocHandle, name: &str) -> Result<Option<LayerId>> {
        Ok(self
            .doc(doc)?
            .layers
            .iter()
            .find(|layer| layer.name == name)
            .map(|layer| layer.id))
    }

    fn create_document(&mut self, spec: &NewDocument) -> Result<DocHandle> {
        if spec.width == 0 || spec.height == 0 {
            return Err(HostError::InvalidArgument("empty canvas".into()));
        }
        let handle = self.insert(MemoryDocument::new(spec));
        self.activate(handle.slot);
        debug!(name = %spec.name, "created document");
        Ok(handle)
    }

    fn open_file(&mut self, path: &str, visible: bool) -> Result<DocHandle> {
        let mut doc = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| HostError::NotFound(path.to_string()))?;
        doc.visible = visible;
        doc.current_frame = 1;
        let handle = self.insert(doc);
        if visible {
            self.activate(handle.slot);
        }
        debug!(path, visible, "opened document");
        Ok(handle)
    }

    fn close_document(&mut self, doc: &DocHandle) -> Result<()> {
        self.doc(doc)?;
        let slot = &mut self.slots[doc.slot];
        slot.doc = None;
        slot.generation += 1;
        self.events.push(HostEvent::DocumentsChanged);

        if self.active == Some(doc.slot) {
            self.active = self
                .slots
                .iter()
                .rposition(|slot| slot.doc.as_ref().is_some_and(|d| d.visible));
            self.events.push(HostEvent::SiteChanged);
        }
        Ok(())
    }

    fn set_active(&mut self, doc: &DocHandle) -> Result<()> {
        self.doc(doc)?;
        self.activate(doc.slot);
        Ok(())
    }

    fn set_name(&mut self, doc: &DocHandle, name: &str) -> Result<()> {
        self.doc_mut(doc)?.name = name.to_string();
        self.changed(doc);
        Ok(())
    }

    fn resize(&mut self, handle: &DocHandle, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(HostError::InvalidArgument("empty canvas".into()));
        }
        let doc = self.doc_mut(handle)?;
        let fill = match doc.format() {
            PixelFormat::Rgba => 0,
            PixelFormat::Indexed => doc.palette.transparent_index,
        };
        for layer in &mut doc.layers {
            for cel in layer.cels.values_mut() {
                *cel = resize_image(cel, width, height, fill);
            }
        }
        doc.width = width;
        doc.height = height;
        self.changed(handle);
        Ok(())
    }

    fn write_frame_pixels(&mut self, handle: &DocHandle, frame: u32, image: PixelImage) -> Result<()> {
        let doc = self.doc_mut(handle)?;
        doc.check_frame(frame)?;
        if image.width != doc.width || image.height != doc.height {
            return Err(HostError::InvalidArgument(format!(
                "frame is {}x{}, canvas is {}x{}",
                image.width, image.height, doc.width, doc.height
            )));
        }
        if image.format != doc.format() {
            return Err(HostError::InvalidArgument(format!(
                "{:?} pixels written to a {:?} document",
                image.format, doc.color_mode
            )));
        }
        doc.paint_layer_mut()?.cels.insert(frame, image);
        self.changed(handle);
        Ok(())
    }

    fn create_layer(&mut self, handle: &DocHandle, spec: &LayerSpec) -> Result<LayerId> {
        let doc = self.doc_mut(handle)?;
        let id = doc.allocate_layer_id();
        doc.layers.push(MemoryLayer {
            id,
            name: spec.name.clone(),
            opacity: spec.opacity,
            reference: spec.reference,
            cels: HashMap::new(),
        });
        self.changed(handle);
        Ok(id)
    }

    fn set_layer_image(&mut self, handle: &DocHandle, layer: LayerId, image: PixelImage) -> Result<()> {
        let doc = self.doc_mut(handle)?;
        if image.width != doc.width || image.height != doc.height {
            return Err(HostError::InvalidArgument(format!(
                "cel is {}x{}, canvas is {}x{}",
                image.width, image.height, doc.width, doc.height
            )));
        }
        if image.format != doc.format() {
            return Err(HostError::InvalidArgument(format!(
                "{:?} cel on a {:?} document",
                image.format, doc.color_mode
            )));
        }
        let frame = doc.current_frame;
        let layer = doc.layer_mut(layer)?;
        layer.cels.clear();
        layer.cels.insert(frame, image);
        self.changed(handle);
        Ok(())
    }

    fn watch(&mut self, doc: &DocHandle) -> Result<()> {
        self.doc_mut(doc)?.watched = true;
        Ok(())
    }

    fn unwatch(&mut self, doc: &DocHandle) {
        if let Ok(doc) = self.doc_mut(doc) {
            doc.watched = false;
        }
    }

    fn take_events(&mut self) -> Vec<HostEvent<DocHandle>> {
        mem::take(&mut self.events)
    }
}
