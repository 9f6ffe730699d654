//! Mapbook
//!
//! Headless city map capture and PDF booklet export. A [`MapView`] holds an
//! interactive map (camera, tile layer, labelled markers); a
//! [`DocumentExporter`] snapshots the mounted view and lays the snapshot out
//! with a list of city descriptions into a paginated A4 document.
//!
//! # Features
//!
//! - **http** (default): fetch tiles and pictures over HTTP(S) with `reqwest`
//! - Without `http` only `data:` and `file://` resources can be loaded
//!
//! # Example
//!
//! ```no_run
//! use mapbook::{BookletConfig, MapView};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BookletConfig::default();
//! let mut view = MapView::new(config.map.clone())?;
//! view.mount();
//!
//! let exporter = mapbook::new_exporter(&config)?;
//! let doc = exporter.export(view.root().as_ref())?;
//! let path = doc.save_to(".")?;
//! println!("{} pages written to {}", doc.page_count, path.display());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub mod error;
pub use error::{Error, Result};

pub mod async_api;
pub mod capture;
pub mod document;
pub mod export;
pub mod geo;
pub mod layout;
pub mod map_view;
pub mod records;

pub use async_api::AsyncExporter;
pub use capture::{CaptureOptions, RenderedSnapshot, ResourceFetcher, SnapshotCapture};
pub use export::{DocumentExporter, ExportConfig, ExportedDocument, ImagePolicy};
pub use geo::{GeoPoint, MarkerRecord};
pub use map_view::{MapView, MapViewConfig, ViewHandle};
pub use records::DescriptionRecord;

/// Top-level configuration
///
/// Defaults reproduce the three-city booklet: OpenStreetMap tiles centred on
/// Paris at zoom 2, the fixed descriptions, output `livret_villes.pdf`.
///
/// # Examples
///
/// ```
/// let cfg = mapbook::BookletConfig::default();
/// assert_eq!(cfg.map.zoom, 2);
/// assert_eq!(cfg.export.file_name, "livret_villes.pdf");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookletConfig {
    /// User agent sent with tile and picture requests
    pub user_agent: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Origin the map is considered to be served from (cross-origin checks)
    pub page_origin: String,
    /// Never touch the network; only `data:`/`file:` resources load
    pub offline: bool,
    pub map: MapViewConfig,
    pub export: ExportConfig,
}

impl Default for BookletConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("mapbook/{}", env!("CARGO_PKG_VERSION")),
            timeout_ms: 15000,
            page_origin: "http://localhost".to_string(),
            offline: false,
            map: MapViewConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl BookletConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError("timeout_ms must be positive".into()));
        }
        if self.export.file_name.trim().is_empty() {
            return Err(Error::ConfigError("file_name must not be empty".into()));
        }
        url::Url::parse(&self.page_origin)
            .map_err(|e| Error::ConfigError(format!("bad page_origin: {}", e)))?;
        self.map.validate()
    }
}

/// Viewport dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 960,
            height: 500,
        }
    }
}

/// Create the resource fetcher the configuration asks for.
///
/// Offline configurations, and builds without the `http` feature, get an
/// [`capture::OfflineFetcher`].
pub fn new_fetcher(config: &BookletConfig) -> Result<Arc<dyn ResourceFetcher>> {
    if !config.offline {
        if let Some(fetcher) = http_fetcher(config)? {
            return Ok(fetcher);
        }
    }
    log::debug!("using offline fetcher (offline = {})", config.offline);
    Ok(Arc::new(capture::OfflineFetcher))
}

#[cfg(feature = "http")]
fn http_fetcher(config: &BookletConfig) -> Result<Option<Arc<dyn ResourceFetcher>>> {
    let fetcher = capture::HttpFetcher::new(&config.user_agent, config.timeout_ms)?;
    Ok(Some(Arc::new(fetcher)))
}

#[cfg(not(feature = "http"))]
fn http_fetcher(_config: &BookletConfig) -> Result<Option<Arc<dyn ResourceFetcher>>> {
    Ok(None)
}

/// Create an exporter that captures with the tile rasterizer.
pub fn new_exporter(config: &BookletConfig) -> Result<DocumentExporter> {
    config.validate()?;
    let fetcher = new_fetcher(config)?;
    let capture = capture::TileRasterizer::new(Arc::clone(&fetcher), config.page_origin.clone());
    Ok(DocumentExporter::new(
        config.export.clone(),
        Box::new(capture),
        fetcher,
    ))
}
