//! Tile rasterizer: composes the map view into a PNG snapshot.

use super::fetch::{is_same_origin, ResourceFetcher};
use super::{CaptureOptions, RenderedSnapshot, SnapshotCapture};
use crate::map_view::{ViewHandle, ViewState};
use crate::{Error, Result};
use image::{imageops, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

/// Map background shown where tiles are missing.
const BACKGROUND: Rgba<u8> = Rgba([221, 221, 221, 255]);
const PIN_FILL: Rgba<u8> = Rgba([42, 129, 203, 255]);
const PIN_CORE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const POPUP_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const POPUP_BORDER: Rgba<u8> = Rgba([180, 180, 180, 255]);

/// Hot-spot of the marker icon, measured from its top-left corner.
pub const MARKER_ANCHOR: (i64, i64) = (12, 41);

/// Captures a view by drawing its tiles, markers and open label overlay.
pub struct TileRasterizer {
    fetcher: Arc<dyn ResourceFetcher>,
    page_origin: String,
}

impl TileRasterizer {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, page_origin: impl Into<String>) -> Self {
        Self {
            fetcher,
            page_origin: page_origin.into(),
        }
    }

    /// Fetch and decode an image for drawing.
    ///
    /// Load failures are not errors (the slot stays empty); drawing a
    /// foreign resource without cross-origin safety is.
    fn load(&self, url: &str, options: &CaptureOptions) -> Result<Option<RgbaImage>> {
        let bytes = match self.fetcher.fetch(url) {
            Ok(b) => b,
            Err(e) => {
                log::debug!("skipping {}: {}", url, e);
                return Ok(None);
            }
        };
        let img = match image::load_from_memory(&bytes) {
            Ok(i) => i.to_rgba8(),
            Err(e) => {
                log::debug!("undecodable image {}: {}", url, e);
                return Ok(None);
            }
        };
        if !options.cross_origin_safe && !is_same_origin(url, &self.page_origin) {
            return Err(Error::CaptureError(format!(
                "canvas tainted by cross-origin resource {}",
                url
            )));
        }
        Ok(Some(img))
    }

    fn draw(&self, state: &ViewState, options: &CaptureOptions) -> Result<RgbaImage> {
        let mut canvas =
            RgbaImage::from_pixel(state.viewport.width, state.viewport.height, BACKGROUND);

        let tiles = state.visible_tiles();
        let mut drawn = 0usize;
        for tile in &tiles {
            if let Some(img) = self.load(&tile.url, options)? {
                imageops::overlay(&mut canvas, &img, tile.offset_x, tile.offset_y);
                drawn += 1;
            }
        }
        log::debug!("drew {}/{} tiles at zoom {}", drawn, tiles.len(), state.zoom);

        let icon = match state.marker_icon_url.as_deref() {
            Some(url) => self.load(url, options)?,
            None => None,
        };

        for marker in &state.markers {
            let (x, y) = state.to_view_pixel(marker.position);
            let (x, y) = (x.round() as i64, y.round() as i64);
            match &icon {
                Some(icon) => {
                    imageops::overlay(&mut canvas, icon, x - MARKER_ANCHOR.0, y - MARKER_ANCHOR.1)
                }
                None => draw_pin(&mut canvas, x, y),
            }
        }

        if let Some(marker) = state.open_popup.and_then(|i| state.markers.get(i)) {
            let (x, y) = state.to_view_pixel(marker.position);
            draw_popup(&mut canvas, x.round() as i64, y.round() as i64, &marker.label);
        }

        Ok(canvas)
    }
}

impl SnapshotCapture for TileRasterizer {
    fn capture(&self, view: &ViewHandle, options: &CaptureOptions) -> Result<RenderedSnapshot> {
        let state = view.current();
        let canvas = self.draw(&state, options)?;

        let mut png = Cursor::new(Vec::new());
        canvas
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| Error::CaptureError(format!("PNG encoding failed: {}", e)))?;

        Ok(RenderedSnapshot {
            width: canvas.width(),
            height: canvas.height(),
            png_data: png.into_inner(),
        })
    }
}

fn put(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(canvas.width()) && y < i64::from(canvas.height()) {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_rect(canvas: &mut RgbaImage, x: i64, y: i64, w: i64, h: i64, color: Rgba<u8>) {
    for py in y..y + h {
        for px in x..x + w {
            put(canvas, px, py, color);
        }
    }
}

/// Teardrop pin whose tip sits on (x, y).
fn draw_pin(canvas: &mut RgbaImage, x: i64, y: i64) {
    let (cx, cy, r) = (x, y - 28, 10i64);
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = dx * dx + dy * dy;
            if d2 <= r * r {
                let color = if d2 <= 16 { PIN_CORE } else { PIN_FILL };
                put(canvas, cx + dx, cy + dy, color);
            }
        }
    }
    // taper from the bottom of the head to the tip
    let span = y - (cy + r / 2);
    for row in 0..=span {
        let half = r * (span - row) / span.max(1);
        for dx in -half..=half {
            put(canvas, x + dx, cy + r / 2 + row, PIN_FILL);
        }
    }
}

/// Label overlay box above a marker, sized from the label length.
fn draw_popup(canvas: &mut RgbaImage, x: i64, y: i64, label: &str) {
    let w = (label.chars().count() as i64 * 7 + 20).clamp(60, 300);
    let h = 30;
    let left = x - w / 2;
    let top = y - MARKER_ANCHOR.1 - 10 - h;
    fill_rect(canvas, left - 1, top - 1, w + 2, h + 2, POPUP_BORDER);
    fill_rect(canvas, left, top, w, h, POPUP_FILL);
    for row in 0..6 {
        for dx in -(6 - row)..=(6 - row) {
            put(canvas, x + dx, top + h + row, POPUP_FILL);
        }
    }
}
