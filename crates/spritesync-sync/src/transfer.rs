//! Pixel Transfer: builds image, spritesheet and frame-update payloads.
//!
//! Host frames are one-based; everything written to the wire is zero-based.

use bytes::Bytes;
use spritesync_core::{
    CodecError, FrameTiming, FrameUpdatePayload, ImagePayload, SheetFrame, SpritesheetPayload,
    SyncFlags, TagInfo,
};
use spritesync_host::{DocumentHost, PixelBuffer};

use crate::error::Result;

/// Inclusive one-based frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub from: u32,
    pub to: u32,
}

impl FrameRange {
    /// `from..=to` limited to the frames a document of `count` frames has.
    pub fn within(from: u32, to: u32, count: u32) -> Self {
        Self {
            from: from.max(1),
            to: to.min(count),
        }
    }
}

/// Timing of every frame in `range` that `durations` covers.
fn range_timings(durations: &[u32], range: FrameRange) -> Result<Vec<FrameTiming>> {
    (range.from..=range.to)
        .filter_map(|frame| {
            (frame as usize)
                .checked_sub(1)
                .and_then(|i| durations.get(i))
                .map(|ms| (frame, *ms))
        })
        .map(|(frame, ms)| {
            Ok(FrameTiming {
                index: wire_frame(frame)?,
                duration_ms: wire_duration(ms),
            })
        })
        .collect()
}

fn wire_u16(field: &'static str, value: u32) -> Result<u16> {
    u16::try_from(value).map_err(|_| {
        CodecError::FieldTooLarge {
            field,
            len: value as usize,
        }
        .into()
    })
}

/// Zero-based wire frame index for a one-based host frame.
fn wire_frame(frame: u32) -> Result<u16> {
    wire_u16("frame", frame.saturating_sub(1))
}

fn wire_duration(ms: u32) -> u16 {
    ms.min(u16::MAX as u32) as u16
}

/// Renders documents into one reusable buffer.
#[derive(Debug, Default)]
pub struct PixelTransfer {
    buffer: PixelBuffer,
}

impl PixelTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The scratch buffer, for inspection.
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Composite one frame and copy it out.
    pub fn render<D: DocumentHost>(
        &mut self,
        host: &D,
        doc: &D::Handle,
        frame: u32,
    ) -> Result<Bytes> {
        let info = host.document_info(doc)?;
        self.buffer.ensure_size(info.width, info.height);
        host.render_frame(doc, frame, &mut self.buffer)?;
        Ok(Bytes::copy_from_slice(self.buffer.as_bytes()))
    }

    /// Frames currently playing: the active tag's range, or everything when
    /// there is no tag or "play all" is on.
    pub fn visible_range<D: DocumentHost>(host: &D, doc: &D::Handle) -> Result<FrameRange> {
        let count = host.document_info(doc)?.frame_count;
        let tag = if host.play_all() {
            None
        } else {
            host.active_tag(doc)?
        };
        Ok(match tag {
            Some(tag) => FrameRange::within(tag.from, tag.to, count),
            None => FrameRange::within(1, count, count),
        })
    }

    /// A single frame.
    pub fn image<D: DocumentHost>(
        &mut self,
        host: &D,
        doc: &D::Handle,
        frame: u32,
        flags: SyncFlags,
    ) -> Result<ImagePayload> {
        let info = host.document_info(doc)?;
        let pixels = self.render(host, doc, frame)?;
        Ok(ImagePayload {
            width: wire_u16("width", info.width)?,
            height: wire_u16("height", info.height)?,
            frame: wire_frame(frame)?,
            flags,
            name: info.name,
            pixels,
        })
    }

    /// Every frame with timing and tags.
    pub fn spritesheet<D: DocumentHost>(
        &mut self,
        host: &D,
        doc: &D::Handle,
        active_frame: u32,
    ) -> Result<SpritesheetPayload> {
        let info = host.document_info(doc)?;
        let durations = host.frame_durations(doc)?;
        let range = Self::visible_range(host, doc)?;

        let mut frames = Vec::with_capacity(durations.len());
        for (i, ms) in durations.iter().enumerate() {
            let frame = i as u32 + 1;
            frames.push(SheetFrame {
                timing: FrameTiming {
                    index: wire_frame(frame)?,
                    duration_ms: wire_duration(*ms),
                },
                pixels: self.render(host, doc, frame)?,
            });
        }

        let tags = host
            .tags(doc)?
            .into_iter()
            .map(|tag| {
                Ok(TagInfo {
                    from: wire_frame(tag.from)?,
                    to: wire_frame(tag.to)?,
                    direction: tag.direction,
                    name: tag.name,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let active_tag = host
            .active_tag(doc)?
            .map(|tag| tag.name)
            .unwrap_or_default();

        Ok(SpritesheetPayload {
            width: wire_u16("width", info.width)?,
            height: wire_u16("height", info.height)?,
            name: info.name,
            first_visible_frame: range.from as i32 - 1,
            active_frame: active_frame.saturating_sub(1),
            frames,
            active_tag,
            tags,
        })
    }

    /// Timing for the visible range only.
    pub fn frame_update<D: DocumentHost>(
        host: &D,
        doc: &D::Handle,
        active_frame: u32,
    ) -> Result<FrameUpdatePayload> {
        let info = host.document_info(doc)?;
        let durations = host.frame_durations(doc)?;
        let range = Self::visible_range(host, doc)?;

        let frames = range_timings(&durations, range)?;

        Ok(FrameUpdatePayload {
            active_frame: active_frame.saturating_sub(1),
            name: info.name,
            first_visible_frame: range.from.saturating_sub(1),
            frames,
        })
    }
}
