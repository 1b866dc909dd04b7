//! Overlay Renderer: draws a received UV bitmap as a reference layer.
//!
//! RGB documents receive the bitmap as-is, stretched to the canvas with
//! nearest-neighbour sampling. Paletted documents get a single
//! representative palette color for every pixel above the alpha threshold;
//! everything else is the transparent index.

use std::collections::HashMap;

use spritesync_core::{CodecError, UvOverlayPayload};
use spritesync_host::{DocumentHost, LayerId, LayerSpec, Palette, PixelFormat, PixelImage};
use tracing::debug;

use crate::error::Result;

/// Source pixels with alpha at or below this are not drawn on paletted
/// documents.
pub const ALPHA_THRESHOLD: u8 = 64;

/// Nearest-neighbour resample of a packed image.
pub fn stretch_nearest(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    bytes_per_pixel: usize,
    dst_width: u32,
    dst_height: u32,
    fill: u8,
) -> Vec<u8> {
    let mut out = vec![fill; dst_width as usize * dst_height as usize * bytes_per_pixel];
    if src_width == 0 || src_height == 0 {
        return out;
    }
    for y in 0..dst_height as u64 {
        let sy = y * src_height as u64 / dst_height as u64;
        for x in 0..dst_width as u64 {
            let sx = x * src_width as u64 / dst_width as u64;
            let s = (sy as usize * src_width as usize + sx as usize) * bytes_per_pixel;
            let d = (y as usize * dst_width as usize + x as usize) * bytes_per_pixel;
            out[d..d + bytes_per_pixel].copy_from_slice(&src[s..s + bytes_per_pixel]);
        }
    }
    out
}

/// Palette index closest to `rgb` by squared distance, skipping the
/// transparent index.
pub fn nearest_index(palette: &Palette, rgb: [u8; 3]) -> Option<u8> {
    palette
        .colors
        .iter()
        .enumerate()
        .take(256)
        .filter(|(i, _)| *i as u8 != palette.transparent_index)
        .min_by_key(|(_, color)| {
            (0..3)
                .map(|c| {
                    let d = color[c] as i32 - rgb[c] as i32;
                    (d * d) as u32
                })
                .sum::<u32>()
        })
        .map(|(i, _)| i as u8)
}

/// Map RGBA to palette indices with one shared representative color.
///
/// The representative is resolved from the first pixel above `threshold`
/// and reused for every other such pixel.
pub fn quantize(rgba: &[u8], palette: &Palette, threshold: u8) -> Vec<u8> {
    let mut representative: Option<Option<u8>> = None;
    rgba.chunks_exact(4)
        .map(|px| {
            if px[3] <= threshold {
                return palette.transparent_index;
            }
            let index =
                *representative.get_or_insert_with(|| nearest_index(palette, [px[0], px[1], px[2]]));
            index.unwrap_or(palette.transparent_index)
        })
        .collect()
}

/// Map RGBA to palette indices, each pixel to its own nearest color.
///
/// Pixels with alpha at or below `threshold` become the transparent index.
pub fn palettize(rgba: &[u8], palette: &Palette, threshold: u8) -> Vec<u8> {
    let mut seen: HashMap<[u8; 3], u8> = HashMap::new();
    rgba.chunks_exact(4)
        .map(|px| {
            if px[3] <= threshold {
                return palette.transparent_index;
            }
            let rgb = [px[0], px[1], px[2]];
            *seen.entry(rgb).or_insert_with(|| {
                nearest_index(palette, rgb).unwrap_or(palette.transparent_index)
            })
        })
        .collect()
}

/// Applies overlays to documents.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    threshold: u8,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self {
            threshold: ALPHA_THRESHOLD,
        }
    }
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `overlay` onto `doc` in the layer called `layer_name`, creating
    /// it as a top reference layer if missing. The layer ends up with a
    /// single cel holding the overlay.
    pub fn apply<D: DocumentHost>(
        &self,
        host: &mut D,
        doc: &D::Handle,
        overlay: &UvOverlayPayload,
        layer_name: &str,
    ) -> Result<LayerId> {
        let (width, height) = (overlay.width as u32, overlay.height as u32);
        let expected = width as usize * height as usize * 4;
        if overlay.pixels.len() != expected {
            return Err(CodecError::InvalidField(format!(
                "overlay of {width}x{height} needs {expected} bytes, got {}",
                overlay.pixels.len()
            ))
            .into());
        }

        let info = host.document_info(doc)?;
        let layer = match host.find_layer(doc, layer_name)? {
            Some(layer) => layer,
            None => host.create_layer(
                doc,
                &LayerSpec {
                    name: layer_name.to_string(),
                    opacity: overlay.opacity,
                    reference: true,
                },
            )?,
        };

        let image = if info.color_mode.is_paletted() {
            let palette = host.palette(doc)?;
            let indices = quantize(&overlay.pixels, &palette, self.threshold);
            PixelImage {
                width: info.width,
                height: info.height,
                format: PixelFormat::Indexed,
                data: stretch_nearest(
                    &indices,
                    width,
                    height,
                    1,
                    info.width,
                    info.height,
                    palette.transparent_index,
                ),
            }
        } else {
            PixelImage {
                width: info.width,
                height: info.height,
                format: PixelFormat::Rgba,
                data: stretch_nearest(&overlay.pixels, width, height, 4, info.width, info.height, 0),
            }
        };

        host.set_layer_image(doc, layer, image)?;
        debug!(layer = layer_name, width, height, "overlay applied");
        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use spritesync_core::ColorMode;
    use spritesync_host::{MemoryHost, NewDocument};

    fn payload(width: u16, height: u16, pixels: Vec<u8>) -> UvOverlayPayload {
        UvOverlayPayload {
            opacity: 128,
            width,
            height,
            layer: "UVMap".into(),
            target: String::new(),
            pixels: Bytes::from(pixels),
        }
    }

    fn four_color_palette() -> Palette {
        Palette::new(
            vec![
                [0, 0, 0, 0],
                [250, 10, 10, 255],
                [10, 250, 10, 255],
                [10, 10, 250, 255],
            ],
            0,
        )
    }

    #[test]
    fn test_indexed_overlay_single_color() {
        let mut host = MemoryHost::new();
        let doc = host
            .create_document(&NewDocument::rgb("i", 2, 2).with_color_mode(ColorMode::Indexed))
            .unwrap();
        host.set_palette(&doc, four_color_palette()).unwrap();

        let mut pixels = vec![0u8; 16];
        pixels[8..12].copy_from_slice(&[0, 200, 30, 255]);
        let layer = OverlayRenderer::new()
            .apply(&mut host, &doc, &payload(2, 2, pixels), "UVMap")
            .unwrap();

        let view = host
            .layers(&doc)
            .unwrap()
            .into_iter()
            .find(|view| view.id == layer)
            .unwrap();
        assert!(view.reference);
        assert_eq!(view.opacity, 128);
        assert_eq!(view.cels.len(), 1);
        assert_eq!(view.cels[0].1.data, vec![0, 0, 2, 0]);
    }

    #[test]
    fn test_representative_shared_across_pixels() {
        let palette = four_color_palette();
        let rgba = [
            250, 0, 0, 255, // red-ish picks index 1
            0, 0, 255, 255, // reuses index 1
            0, 0, 255, 64, // at threshold: transparent
        ];
        assert_eq!(quantize(&rgba, &palette, ALPHA_THRESHOLD), vec![1, 1, 0]);
    }

    #[test]
    fn test_palettize_maps_each_pixel() {
        let palette = four_color_palette();
        let rgba = [
            250, 0, 0, 255, //
            0, 0, 250, 255, //
            250, 0, 0, 1, //
            0, 0, 0, 0,
        ];
        assert_eq!(palettize(&rgba, &palette, 0), vec![1, 3, 1, 0]);
    }

    #[test]
    fn test_nearest_skips_transparent_index() {
        let palette = Palette::new(vec![[0, 0, 0, 0], [255, 255, 255, 255]], 0);
        assert_eq!(nearest_index(&palette, [0, 0, 0]), Some(1));
        let only_transparent = Palette::new(vec![[0, 0, 0, 0]], 0);
        assert_eq!(nearest_index(&only_transparent, [0, 0, 0]), None);
    }

    #[test]
    fn test_rgb_overlay_stretched_to_canvas() {
        let mut host = MemoryHost::new();
        let doc = host.create_document(&NewDocument::rgb("a", 4, 2)).unwrap();
        let pixels = vec![
            1, 1, 1, 255, 2, 2, 2, 255, //
        ];
        let layer = OverlayRenderer::new()
            .apply(&mut host, &doc, &payload(2, 1, pixels), "UVMap")
            .unwrap();

        let view = host
            .layers(&doc)
            .unwrap()
            .into_iter()
            .find(|view| view.id == layer)
            .unwrap();
        let data = &view.cels[0].1.data;
        assert_eq!(data.len(), 4 * 2 * 4);
        assert_eq!(&data[0..4], &[1, 1, 1, 255]);
        assert_eq!(&data[4..8], &[1, 1, 1, 255]);
        assert_eq!(&data[8..12], &[2, 2, 2, 255]);
        assert_eq!(&data[16..20], &[1, 1, 1, 255]);
    }

    #[test]
    fn test_existing_layer_reused() {
        let mut host = MemoryHost::new();
        let doc = host.create_document(&NewDocument::rgb("a", 1, 1)).unwrap();
        let renderer = OverlayRenderer::new();
        let first = renderer
            .apply(&mut host, &doc, &payload(1, 1, vec![0, 0, 0, 255]), "UVMap")
            .unwrap();
        let second = renderer
            .apply(&mut host, &doc, &payload(1, 1, vec![9, 9, 9, 255]), "UVMap")
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(host.layers(&doc).unwrap().len(), 2);
    }

    #[test]
    fn test_wrong_pixel_length_rejected() {
        let mut host = MemoryHost::new();
        let doc = host.create_document(&NewDocument::rgb("a", 1, 1)).unwrap();
        let result = OverlayRenderer::new().apply(&mut host, &doc, &payload(2, 2, vec![0; 4]), "UVMap");
        assert!(result.is_err());
        assert_eq!(host.layers(&doc).unwrap().len(), 1);
    }

    proptest::proptest! {
        #[test]
        fn prop_stretch_fills_target(
            sw in 1u32..8,
            sh in 1u32..8,
            dw in 1u32..16,
            dh in 1u32..16,
            seed in proptest::prelude::any::<u8>(),
        ) {
            let src: Vec<u8> = (0..sw * sh).map(|i| seed.wrapping_add(i as u8)).collect();
            let out = stretch_nearest(&src, sw, sh, 1, dw, dh, 0);
            proptest::prop_assert_eq!(out.len(), (dw * dh) as usize);
            proptest::prop_assert!(out.iter().all(|v| src.contains(v)));
            if (sw, sh) == (dw, dh) {
                proptest::prop_assert_eq!(out, src);
            }
        }
    }
}
