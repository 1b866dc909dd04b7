//! DocumentHost trait: the consumed editor capability.
//!
//! This trait lets the sync engine run against any editor. Implementations
//! include real editor bindings and [`MemoryHost`](crate::MemoryHost) for
//! tests.

use crate::error::Result;
use crate::model::{
    DocumentInfo, LayerId, LayerSpec, NewDocument, Palette, PixelBuffer, PixelImage, TagSpan,
};

/// A change notification from the host.
///
/// Hosts queue these as they happen; the owner of the engine drains them
/// with [`DocumentHost::take_events`] and feeds them back in order.
#[derive(Debug, Clone)]
pub enum HostEvent<H> {
    /// The active document or active frame may have changed.
    SiteChanged,
    /// A watched document's content changed.
    DocumentChanged(H),
    /// A document was opened or closed.
    DocumentsChanged,
}

/// The DocumentHost trait: synchronous access to the editor's documents.
///
/// All calls happen on the editor's own thread from within its callbacks;
/// none of them may block on I/O beyond what the editor itself does.
///
/// # Design Notes
///
/// - **Transient handles**: `Handle` is neither `Eq` nor `Hash`. Identity is
///   only available through [`same_document`](Self::same_document), which
///   fails for a handle whose document has been closed.
/// - **One-based frames**: every frame number crossing this trait counts
///   from one, as the editor's timeline does.
/// - **Queued events**: mutations do not call back into the engine. They
///   queue [`HostEvent`]s, so edits made while applying a remote message can
///   be recognised and dropped.
pub trait DocumentHost {
    /// Transient reference to an open document.
    type Handle: Clone + std::fmt::Debug;

    // ─────────────────────────────────────────────────────────────────────────
    // Enumeration
    // ─────────────────────────────────────────────────────────────────────────

    /// All currently open documents, in tab order.
    fn open_documents(&self) -> Vec<Self::Handle>;

    /// The document in focus, if any.
    fn active_document(&self) -> Option<Self::Handle>;

    /// One-based active frame of the active document.
    fn active_frame(&self) -> Option<u32>;

    /// Whether two handles refer to the same document.
    ///
    /// # Errors
    /// `StaleDocument` if either handle's document has been closed.
    fn same_document(&self, a: &Self::Handle, b: &Self::Handle) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Reading
    // ─────────────────────────────────────────────────────────────────────────

    /// Name, dimensions, color mode and frame count.
    fn document_info(&self, doc: &Self::Handle) -> Result<DocumentInfo>;

    /// Duration of every frame in milliseconds, in frame order.
    fn frame_durations(&self, doc: &Self::Handle) -> Result<Vec<u32>>;

    /// All timeline tags.
    fn tags(&self, doc: &Self::Handle) -> Result<Vec<TagSpan>>;

    /// The tag the playback is constrained to, if any.
    fn active_tag(&self, doc: &Self::Handle) -> Result<Option<TagSpan>>;

    /// Whether playback ignores the active tag and runs the whole timeline.
    fn play_all(&self) -> bool;

    /// Composite the visible layers of `frame` into `target`.
    ///
    /// `target` must already have the document's dimensions. Reference
    /// layers are not part of the composite.
    fn render_frame(&self, doc: &Self::Handle, frame: u32, target: &mut PixelBuffer)
        -> Result<()>;

    /// The active palette.
    fn palette(&self, doc: &Self::Handle) -> Result<Palette>;

    /// Find a layer by name.
    fn find_layer(&self, doc: &Self::Handle, name: &str) -> Result<Option<LayerId>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a blank single-frame document and make it active.
    fn create_document(&mut self, spec: &NewDocument) -> Result<Self::Handle>;

    /// Open a file. Hidden documents do not become active.
    fn open_file(&mut self, path: &str, visible: bool) -> Result<Self::Handle>;

    /// Close a document without saving.
    fn close_document(&mut self, doc: &Self::Handle) -> Result<()>;

    /// Focus a document.
    fn set_active(&mut self, doc: &Self::Handle) -> Result<()>;

    /// Change the stored name without saving.
    fn set_name(&mut self, doc: &Self::Handle, name: &str) -> Result<()>;

    /// Resize the canvas.
    fn resize(&mut self, doc: &Self::Handle, width: u32, height: u32) -> Result<()>;

    /// Replace the pixels of `frame` on the document's first paintable layer.
    ///
    /// `image` must have the canvas dimensions and the document's pixel
    /// format: indices for paletted documents, RGBA otherwise.
    fn write_frame_pixels(&mut self, doc: &Self::Handle, frame: u32, image: PixelImage)
        -> Result<()>;

    /// Add a layer at the top of the stack.
    fn create_layer(&mut self, doc: &Self::Handle, spec: &LayerSpec) -> Result<LayerId>;

    /// Replace a layer's single cel with `image`.
    fn set_layer_image(
        &mut self,
        doc: &Self::Handle,
        layer: LayerId,
        image: PixelImage,
    ) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Start emitting `DocumentChanged` for `doc`.
    fn watch(&mut self, doc: &Self::Handle) -> Result<()>;

    /// Stop emitting `DocumentChanged` for `doc`. Stale handles are ignored.
    fn unwatch(&mut self, doc: &Self::Handle);

    /// Drain queued events.
    fn take_events(&mut self) -> Vec<HostEvent<Self::Handle>>;
}
