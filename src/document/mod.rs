//! Paginated document authoring.
//!
//! [`DocumentBackend`] is the imperative surface the booklet layout writes
//! through. Coordinates are in device units from the top-left corner of the
//! current page; text `y` is the baseline. [`PdfDocument`] is the PDF
//! implementation.

pub mod embed;
pub mod pdf;

pub use embed::EmbeddedImage;
pub use pdf::PdfDocument;

use crate::Result;
use serde::{Deserialize, Serialize};

/// Page dimensions in device units (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// A4 at 72 dpi, portrait.
    pub const A4: PageSize = PageSize {
        width: 595.0,
        height: 842.0,
    };

    pub fn oriented(self, orientation: Orientation) -> PageSize {
        let (short, long) = if self.width <= self.height {
            (self.width, self.height)
        } else {
            (self.height, self.width)
        };
        match orientation {
            Orientation::Portrait => PageSize {
                width: short,
                height: long,
            },
            Orientation::Landscape => PageSize {
                width: long,
                height: short,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Imperative document-authoring surface.
pub trait DocumentBackend {
    /// Font size used by subsequent `write_text` calls.
    fn set_font_size(&mut self, size: f32);

    /// Write a single line of text with its baseline at `y`.
    fn write_text(&mut self, text: &str, x: f32, y: f32);

    /// Draw `image` with its top-left corner at (`x`, `y`), scaled to the box.
    fn add_image(&mut self, image: &EmbeddedImage, x: f32, y: f32, width: f32, height: f32);

    /// Start a new page; further drawing goes there.
    fn add_page(&mut self);

    fn page_height(&self) -> f32;

    fn page_count(&self) -> usize;

    /// Serialize the finished document.
    fn save(self) -> Result<Vec<u8>>
    where
        Self: Sized;
}
