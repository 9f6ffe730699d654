//! PDF implementation of [`DocumentBackend`] on top of `pdf-writer`.

use super::embed::{ColorSpace, EmbeddedImage, PixelEncoding};
use super::{DocumentBackend, Orientation, PageSize};
use crate::{Error, Result};
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

const FONT_NAME: Name<'static> = Name(b"F1");
const COMPRESSION_LEVEL: u8 = 6;

/// In-memory PDF under construction.
///
/// Text uses the base-14 Helvetica font with WinAnsi encoding, so nothing is
/// embedded and characters outside that code page are printed as `?`.
/// Output contains no timestamps: equal input yields equal bytes.
pub struct PdfDocument {
    size: PageSize,
    font_size: f32,
    title: Option<String>,
    pages: Vec<Content>,
    images: Vec<EmbeddedImage>,
}

impl PdfDocument {
    /// Empty one-page document; `size` is turned to match `orientation`.
    pub fn new(size: PageSize, orientation: Orientation) -> Self {
        Self {
            size: size.oriented(orientation),
            font_size: 16.0,
            title: None,
            pages: vec![Content::new()],
            images: Vec::new(),
        }
    }

    /// Record a title in the document information dictionary.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn current(&mut self) -> &mut Content {
        if self.pages.is_empty() {
            self.pages.push(Content::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }
}

impl DocumentBackend for PdfDocument {
    fn set_font_size(&mut self, size: f32) {
        self.font_size = size;
    }

    fn write_text(&mut self, text: &str, x: f32, y: f32) {
        let (size, baseline) = (self.font_size, self.size.height - y);
        let encoded = to_winansi(text);
        self.current()
            .begin_text()
            .set_font(FONT_NAME, size)
            .next_line(x, baseline)
            .show(Str(&encoded))
            .end_text();
    }

    fn add_image(&mut self, image: &EmbeddedImage, x: f32, y: f32, width: f32, height: f32) {
        self.images.push(image.clone());
        let name = xobject_name(self.images.len() - 1);
        let bottom = self.size.height - y - height;
        self.current()
            .save_state()
            .transform([width, 0.0, 0.0, height, x, bottom])
            .x_object(Name(name.as_bytes()))
            .restore_state();
    }

    fn add_page(&mut self) {
        self.pages.push(Content::new());
    }

    fn page_height(&self) -> f32 {
        self.size.height
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn save(self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            return Err(Error::DocumentError("document has no pages".into()));
        }

        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();
        let font_id = alloc();

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.type1_font(font_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        if let Some(title) = &self.title {
            let info_id = alloc();
            pdf.document_info(info_id)
                .title(TextStr(title))
                .producer(TextStr("mapbook"));
        }

        let mut image_ids = Vec::with_capacity(self.images.len());
        for img in &self.images {
            let xobj_id = alloc();
            let mask_id = img.alpha.as_ref().map(|_| alloc());

            if let (Some(mask_id), Some(alpha)) = (mask_id, &img.alpha) {
                let mut mask = pdf.image_xobject(mask_id, alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(img.width as i32);
                mask.height(img.height as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
            }

            let mut xobj = pdf.image_xobject(xobj_id, &img.data);
            xobj.filter(match img.encoding {
                PixelEncoding::Jpeg => Filter::DctDecode,
                PixelEncoding::Flate => Filter::FlateDecode,
            });
            xobj.width(img.width as i32);
            xobj.height(img.height as i32);
            match img.color_space {
                ColorSpace::Gray => xobj.color_space().device_gray(),
                ColorSpace::Rgb => xobj.color_space().device_rgb(),
            }
            xobj.bits_per_component(8);
            if let Some(mask_id) = mask_id {
                xobj.s_mask(mask_id);
            }
            drop(xobj);
            image_ids.push(xobj_id);
        }

        let n = self.pages.len();
        let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        for (i, content) in self.pages.into_iter().enumerate() {
            let raw = content.finish();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&raw, COMPRESSION_LEVEL);
            pdf.stream(content_ids[i], &compressed)
                .filter(Filter::FlateDecode);

            let mut page = pdf.page(page_ids[i]);
            page.media_box(Rect::new(0.0, 0.0, self.size.width, self.size.height))
                .parent(pages_id)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            resources.fonts().pair(FONT_NAME, font_id);
            if !image_ids.is_empty() {
                let mut xobjects = resources.x_objects();
                for (idx, id) in image_ids.iter().enumerate() {
                    let name = xobject_name(idx);
                    xobjects.pair(Name(name.as_bytes()), *id);
                }
            }
        }

        Ok(pdf.finish())
    }
}

fn xobject_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

/// Encode text for a WinAnsi (CP-1252) simple font.
pub fn to_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8a,
            '‹' => 0x8b,
            'Œ' => 0x8c,
            'Ž' => 0x8e,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9a,
            '›' => 0x9b,
            'œ' => 0x9c,
            'ž' => 0x9e,
            'Ÿ' => 0x9f,
            _ => b'?',
        })
        .collect()
}
