//! Raster images prepared for embedding as PDF image XObjects.

use image::{ColorType, ImageDecoder, ImageFormat, ImageReader, ImageResult};
use std::io::Cursor;

/// How the pixel payload is encoded inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelEncoding {
    /// JPEG bytes passed through untouched (DCT)
    Jpeg,
    /// zlib-compressed samples
    Flate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

/// A decoded picture ready to be written into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub encoding: PixelEncoding,
    pub color_space: ColorSpace,
    pub data: Vec<u8>,
    /// zlib-compressed 8-bit alpha channel, when any pixel is translucent
    pub alpha: Option<Vec<u8>>,
}

impl EmbeddedImage {
    /// Decode raw file bytes (format sniffed from content).
    pub fn decode(bytes: &[u8]) -> ImageResult<Self> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;

        if reader.format() == Some(ImageFormat::Jpeg) {
            let decoder = reader.into_decoder()?;
            let (width, height) = decoder.dimensions();
            let color_space = match decoder.color_type() {
                ColorType::L8 => Some(ColorSpace::Gray),
                ColorType::Rgb8 => Some(ColorSpace::Rgb),
                _ => None,
            };
            if let Some(color_space) = color_space {
                return Ok(Self {
                    width,
                    height,
                    encoding: PixelEncoding::Jpeg,
                    color_space,
                    data: bytes.to_vec(),
                    alpha: None,
                });
            }
        }

        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

        let rgb: Vec<u8> = rgba.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect();
        let alpha = has_alpha.then(|| {
            let a: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
            miniz_oxide::deflate::compress_to_vec_zlib(&a, 6)
        });

        Ok(Self {
            width,
            height,
            encoding: PixelEncoding::Flate,
            color_space: ColorSpace::Rgb,
            data: miniz_oxide::deflate::compress_to_vec_zlib(&rgb, 6),
            alpha,
        })
    }
}
