//! Map view model: camera, tile layer, markers and label overlays.
//!
//! A `MapView` holds the live camera state of the map canvas. Once mounted it
//! hands out a [`ViewHandle`], a cheap, cloneable reference onto that state
//! which capture backends read at capture time, so a capture always reflects
//! the current pan/zoom/popup state rather than the state at mount time.

use crate::geo::{self, GeoPoint, MarkerRecord, TILE_SIZE};
use crate::{Error, Result, Viewport};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Deepest zoom level any tile source may declare.
pub const MAX_ZOOM: u8 = 30;
/// Largest viewport edge, in pixels, that can be captured.
pub const MAX_VIEWPORT_EDGE: u32 = 8192;

/// Slippy-map tile layer definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSource {
    /// URL template with `{s}`, `{z}`, `{x}` and `{y}` placeholders
    pub url_template: String,
    /// Values substituted for `{s}`
    pub subdomains: Vec<String>,
    /// Attribution required by the tile provider
    pub attribution: String,
    /// Highest zoom level the provider serves
    pub max_zoom: u8,
}

impl Default for TileSource {
    fn default() -> Self {
        Self {
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            subdomains: vec!["a".into(), "b".into(), "c".into()],
            attribution: "© OpenStreetMap contributors".to_string(),
            max_zoom: 19,
        }
    }
}

impl TileSource {
    /// Expand the template for one tile.
    ///
    /// The subdomain is picked from `(x + y) % n` so a given tile always maps
    /// to the same host.
    pub fn url(&self, z: u8, x: u32, y: u32) -> String {
        let s = if self.subdomains.is_empty() {
            ""
        } else {
            let idx = (u64::from(x) + u64::from(y)) % self.subdomains.len() as u64;
            self.subdomains[idx as usize].as_str()
        };
        self.url_template
            .replace("{s}", s)
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

/// Initial configuration of the map canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapViewConfig {
    pub center: GeoPoint,
    pub zoom: u8,
    /// Size of the rendered region in pixels
    pub viewport: Viewport,
    pub tiles: TileSource,
    pub markers: Vec<MarkerRecord>,
    /// Marker icon; a built-in pin is drawn when unset or unreachable
    pub marker_icon_url: Option<String>,
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            center: geo::PARIS,
            zoom: 2,
            viewport: Viewport::default(),
            tiles: TileSource::default(),
            markers: geo::default_markers(),
            marker_icon_url: Some(
                "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.7.1/images/marker-icon.png"
                    .to_string(),
            ),
        }
    }
}

impl MapViewConfig {
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError("viewport must not be empty".into()));
        }
        if self.viewport.width > MAX_VIEWPORT_EDGE || self.viewport.height > MAX_VIEWPORT_EDGE {
            return Err(Error::ConfigError(format!(
                "viewport {}x{} exceeds {} pixels per edge",
                self.viewport.width, self.viewport.height, MAX_VIEWPORT_EDGE
            )));
        }
        if self.tiles.max_zoom > MAX_ZOOM {
            return Err(Error::ConfigError(format!(
                "tile source maximum zoom {} exceeds {}",
                self.tiles.max_zoom, MAX_ZOOM
            )));
        }
        if self.zoom > self.tiles.max_zoom {
            return Err(Error::ConfigError(format!(
                "zoom {} exceeds tile source maximum {}",
                self.zoom, self.tiles.max_zoom
            )));
        }
        if !["{z}", "{x}", "{y}"]
            .iter()
            .all(|p| self.tiles.url_template.contains(p))
        {
            return Err(Error::ConfigError(format!(
                "tile template {:?} must contain {{z}}, {{x}} and {{y}}",
                self.tiles.url_template
            )));
        }
        self.center.validate()?;
        for m in &self.markers {
            m.position.validate()?;
        }
        Ok(())
    }
}

/// One tile needed to cover the viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub url: String,
    /// Position of the tile's top-left corner inside the viewport
    pub offset_x: i64,
    pub offset_y: i64,
}

/// Current camera and overlay state of a map view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub center: GeoPoint,
    pub zoom: u8,
    pub viewport: Viewport,
    pub tiles: TileSource,
    pub markers: Vec<MarkerRecord>,
    pub marker_icon_url: Option<String>,
    /// Index of the marker whose label overlay is open
    pub open_popup: Option<usize>,
}

impl ViewState {
    fn top_left(&self) -> (f64, f64) {
        let (cx, cy) = geo::project(self.center, self.zoom);
        (
            cx - f64::from(self.viewport.width) / 2.0,
            cy - f64::from(self.viewport.height) / 2.0,
        )
    }

    /// Position of a geographic point inside the viewport, in pixels.
    pub fn to_view_pixel(&self, point: GeoPoint) -> (f64, f64) {
        let (left, top) = self.top_left();
        let (x, y) = geo::project(point, self.zoom);
        (x - left, y - top)
    }

    /// Tiles covering the viewport, row by row.
    ///
    /// Columns wrap around the antimeridian; rows beyond the poles are skipped.
    pub fn visible_tiles(&self) -> Vec<TileRequest> {
        let (left, top) = self.top_left();
        let tile = f64::from(TILE_SIZE);
        let n = 1i64 << self.zoom;
        let right = left + f64::from(self.viewport.width);
        let bottom = top + f64::from(self.viewport.height);

        let (x0, x1) = ((left / tile).floor() as i64, ((right - 1.0) / tile).floor() as i64);
        let (y0, y1) = ((top / tile).floor() as i64, ((bottom - 1.0) / tile).floor() as i64);

        let mut out = Vec::new();
        for ty in y0.max(0)..=y1.min(n - 1) {
            for tx in x0..=x1 {
                let wx = tx.rem_euclid(n) as u32;
                let wy = ty as u32;
                out.push(TileRequest {
                    z: self.zoom,
                    x: wx,
                    y: wy,
                    url: self.tiles.url(self.zoom, wx, wy),
                    offset_x: (tx as f64 * tile - left).round() as i64,
                    offset_y: (ty as f64 * tile - top).round() as i64,
                });
            }
        }
        out
    }

    /// Label of the marker whose overlay is open.
    pub fn open_label(&self) -> Option<&str> {
        self.open_popup
            .and_then(|i| self.markers.get(i))
            .map(|m| m.label.as_str())
    }
}

/// Live reference onto a mounted map view's state.
#[derive(Debug, Clone)]
pub struct ViewHandle {
    state: Arc<RwLock<ViewState>>,
}

impl ViewHandle {
    /// Copy of the state as it is right now.
    pub fn current(&self) -> ViewState {
        read(&self.state).clone()
    }

    pub fn viewport(&self) -> Viewport {
        read(&self.state).viewport
    }
}

fn read(state: &RwLock<ViewState>) -> RwLockReadGuard<'_, ViewState> {
    state.read().unwrap_or_else(|e| e.into_inner())
}

fn write(state: &RwLock<ViewState>) -> RwLockWriteGuard<'_, ViewState> {
    state.write().unwrap_or_else(|e| e.into_inner())
}

/// Interactive, pannable and zoomable map canvas.
pub struct MapView {
    state: Arc<RwLock<ViewState>>,
    mounted: bool,
}

impl MapView {
    pub fn new(config: MapViewConfig) -> Result<Self> {
        config.validate()?;
        let state = ViewState {
            center: config.center,
            zoom: config.zoom,
            viewport: config.viewport,
            tiles: config.tiles,
            markers: config.markers,
            marker_icon_url: config.marker_icon_url,
            open_popup: None,
        };
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            mounted: false,
        })
    }

    /// Attach the view to its region and return the root handle.
    pub fn mount(&mut self) -> ViewHandle {
        self.mounted = true;
        log::debug!("map view mounted ({:?})", read(&self.state).viewport);
        ViewHandle {
            state: Arc::clone(&self.state),
        }
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    /// Root handle, `None` until the view is mounted.
    pub fn root(&self) -> Option<ViewHandle> {
        self.mounted.then(|| ViewHandle {
            state: Arc::clone(&self.state),
        })
    }

    pub fn pan_to(&mut self, center: GeoPoint) -> Result<()> {
        center.validate()?;
        write(&self.state).center = center;
        Ok(())
    }

    pub fn set_zoom(&mut self, zoom: u8) -> Result<()> {
        let mut state = write(&self.state);
        if zoom > state.tiles.max_zoom.min(MAX_ZOOM) {
            return Err(Error::ConfigError(format!(
                "zoom {} exceeds tile source maximum {}",
                zoom, state.tiles.max_zoom
            )));
        }
        state.zoom = zoom;
        Ok(())
    }

    /// Toggle the label overlay of marker `index`, closing any other one.
    ///
    /// Returns the label now shown, if any.
    pub fn click_marker(&mut self, index: usize) -> Option<String> {
        let mut state = write(&self.state);
        if index >= state.markers.len() {
            return None;
        }
        state.open_popup = match state.open_popup {
            Some(i) if i == index => None,
            _ => Some(index),
        };
        state.open_label().map(str::to_string)
    }

    pub fn open_popup(&self) -> Option<String> {
        read(&self.state).open_label().map(str::to_string)
    }

    pub fn state(&self) -> ViewState {
        read(&self.state).clone()
    }
}
