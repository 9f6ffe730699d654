//! Raster capture of a mounted map view.
//!
//! Capture backends turn the current state behind a [`ViewHandle`] into a
//! PNG snapshot. Snapshots are owned by a single export and never cached.

pub mod fetch;
pub mod raster;

pub use fetch::{OfflineFetcher, ResourceFetcher};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use raster::TileRasterizer;

use crate::map_view::ViewHandle;
use crate::Result;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Options controlling how resources are drawn into the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Load third-party resources so they do not taint the snapshot.
    ///
    /// When false, drawing any resource from another origin than the page
    /// makes the capture fail.
    pub cross_origin_safe: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            cross_origin_safe: true,
        }
    }
}

/// A PNG-encoded raster of the map view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSnapshot {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

impl RenderedSnapshot {
    /// `data:image/png;base64,...` form of the snapshot.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png_data)
        )
    }
}

/// Something that can rasterize a mounted view.
pub trait SnapshotCapture: Send + Sync {
    fn capture(&self, view: &ViewHandle, options: &CaptureOptions) -> Result<RenderedSnapshot>;
}
