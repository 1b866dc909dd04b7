//! Document Registry: durable bindings for transient host handles.
//!
//! Host handles cannot be hashed and may go stale at any time, so the
//! registry is an arena of records, each holding a handle and a stable
//! [`DocumentId`]. Lookups walk the arena with a guarded equality probe:
//! a comparison that fails because a document was closed counts as "not
//! equal".

use spritesync_core::SyncFlags;
use spritesync_host::DocumentHost;
use tracing::debug;

/// Stable identifier assigned on first sight of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Per-document sync record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Session token of the peer that declared this document tracked.
    pub origin: String,
    pub animated: bool,
    pub show_uv: bool,
}

impl Binding {
    pub fn new(origin: impl Into<String>, flags: SyncFlags) -> Self {
        Self {
            origin: origin.into(),
            animated: flags.contains(SyncFlags::ANIMATED),
            show_uv: flags.contains(SyncFlags::SHOW_UV),
        }
    }

    pub fn flags(&self) -> SyncFlags {
        let mut flags = SyncFlags::empty();
        flags.set(SyncFlags::ANIMATED, self.animated);
        flags.set(SyncFlags::SHOW_UV, self.show_uv);
        flags
    }

    /// A binding only counts for the session that created it.
    pub fn is_valid_for(&self, session_token: &str) -> bool {
        self.origin == session_token
    }
}

#[derive(Debug)]
struct Record<H> {
    id: DocumentId,
    handle: H,
    binding: Binding,
}

/// Guarded identity comparison. Stale handles compare unequal.
pub fn same_document<D: DocumentHost>(host: &D, a: &D::Handle, b: &D::Handle) -> bool {
    host.same_document(a, b).unwrap_or(false)
}

/// Maps open documents to their [`Binding`]s.
#[derive(Debug)]
pub struct DocumentRegistry<H> {
    records: Vec<Record<H>>,
    next_id: u64,
}

impl<H> Default for DocumentRegistry<H> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }
}

impl<H: Clone> DocumentRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    fn position<D>(&self, host: &D, doc: &H) -> Option<usize>
    where
        D: DocumentHost<Handle = H>,
    {
        self.records
            .iter()
            .position(|record| same_document(host, &record.handle, doc))
    }

    /// Bind `doc`, replacing any existing binding for it.
    pub fn bind<D>(&mut self, host: &D, doc: &H, origin: &str, flags: SyncFlags) -> DocumentId
    where
        D: DocumentHost<Handle = H>,
    {
        let binding = Binding::new(origin, flags);
        if let Some(pos) = self.position(host, doc) {
            let record = &mut self.records[pos];
            record.binding = binding;
            return record.id;
        }

        let id = DocumentId(self.next_id);
        self.next_id += 1;
        debug!(id = id.0, origin, "bound document");
        self.records.push(Record {
            id,
            handle: doc.clone(),
            binding,
        });
        id
    }

    pub fn lookup<D>(&self, host: &D, doc: &H) -> Option<&Binding>
    where
        D: DocumentHost<Handle = H>,
    {
        self.position(host, doc).map(|pos| &self.records[pos].binding)
    }

    pub fn lookup_mut<D>(&mut self, host: &D, doc: &H) -> Option<&mut Binding>
    where
        D: DocumentHost<Handle = H>,
    {
        self.position(host, doc)
            .map(move |pos| &mut self.records[pos].binding)
    }

    pub fn id_of<D>(&self, host: &D, doc: &H) -> Option<DocumentId>
    where
        D: DocumentHost<Handle = H>,
    {
        self.position(host, doc).map(|pos| self.records[pos].id)
    }

    /// Drop every record whose document is no longer open.
    ///
    /// Probes against the host's live document list rather than the
    /// registry's own, possibly stale, handles. Returns how many records were
    /// dropped.
    pub fn unbind_closed<D>(&mut self, host: &D) -> usize
    where
        D: DocumentHost<Handle = H>,
    {
        let open = host.open_documents();
        let before = self.records.len();
        self.records.retain(|record| {
            open.iter()
                .any(|live| same_document(host, &record.handle, live))
        });
        let dropped = before - self.records.len();
        if dropped > 0 {
            debug!(dropped, "unbound closed documents");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record, in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (DocumentId, &H, &Binding)> {
        self.records
            .iter()
            .map(|record| (record.id, &record.handle, &record.binding))
    }
}
