//! Booklet layout: the document cursor and page-flow rules.
//!
//! Layout is planned up front as a list of placements, independent of any
//! backend, then replayed onto a [`DocumentBackend`]. The plan depends only
//! on the title, the snapshot dimensions, the records and the page height.

use crate::document::{DocumentBackend, EmbeddedImage};
use crate::records::DescriptionRecord;

pub const MARGIN_X: f32 = 20.0;
pub const TITLE_Y: f32 = 30.0;
pub const TITLE_FONT_SIZE: f32 = 22.0;
/// Top edge of the map picture on the first page.
pub const MAP_TOP: f32 = 40.0;
pub const MAP_SCALE: f32 = 0.6;
pub const SECTION_GAP: f32 = 20.0;
/// Space a description block needs before a page break is forced.
pub const BLOCK_MIN_HEIGHT: f32 = 60.0;
/// Cursor position after a page break.
pub const PAGE_TOP: f32 = 40.0;
pub const CITY_FONT_SIZE: f32 = 16.0;
pub const CITY_ADVANCE: f32 = 20.0;
pub const BODY_FONT_SIZE: f32 = 12.0;
pub const BODY_ADVANCE: f32 = 40.0;
pub const PICTURE_WIDTH: f32 = 180.0;
pub const PICTURE_HEIGHT: f32 = 100.0;
pub const PICTURE_ADVANCE: f32 = 120.0;

/// Write position during layout. One per export; never shared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentCursor {
    pub x: f32,
    pub y: f32,
    /// Zero-based page index
    pub page: usize,
}

impl Default for DocumentCursor {
    fn default() -> Self {
        Self {
            x: MARGIN_X,
            y: TITLE_Y,
            page: 0,
        }
    }
}

impl DocumentCursor {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn advance(&mut self, dy: f32) {
        self.y += dy;
    }

    /// Break to a new page if `needed` units would run past `page_height`.
    ///
    /// Returns true when a break was taken.
    pub fn ensure_room(&mut self, needed: f32, page_height: f32) -> bool {
        if self.y + needed > page_height {
            self.page += 1;
            self.x = MARGIN_X;
            self.y = PAGE_TOP;
            true
        } else {
            false
        }
    }
}

/// Which picture an image placement refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Snapshot,
    /// Picture of the record at this index
    Record(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Text {
        page: usize,
        x: f32,
        y: f32,
        size: f32,
        text: String,
    },
    Image {
        page: usize,
        slot: ImageSlot,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    NewPage,
}

/// Planned booklet: ordered placements plus the resulting page count.
#[derive(Debug, Clone, PartialEq)]
pub struct BookletLayout {
    pub placements: Vec<Placement>,
    pub page_count: usize,
    /// Cursor after the last block
    pub cursor: DocumentCursor,
}

/// Size of the map picture for a snapshot of the given pixel dimensions.
pub fn map_image_size(snapshot: (u32, u32)) -> (f32, f32) {
    (snapshot.0 as f32 * MAP_SCALE, snapshot.1 as f32 * MAP_SCALE)
}

impl BookletLayout {
    pub fn plan(
        title: &str,
        snapshot: (u32, u32),
        records: &[DescriptionRecord],
        page_height: f32,
    ) -> Self {
        let mut cursor = DocumentCursor::default();
        let mut placements = Vec::with_capacity(2 + records.len() * 4);

        placements.push(Placement::Text {
            page: 0,
            x: cursor.x,
            y: cursor.y,
            size: TITLE_FONT_SIZE,
            text: title.to_string(),
        });

        let (width, height) = map_image_size(snapshot);
        placements.push(Placement::Image {
            page: 0,
            slot: ImageSlot::Snapshot,
            x: MARGIN_X,
            y: MAP_TOP,
            width,
            height,
        });
        cursor.y = MAP_TOP;
        cursor.advance(height + SECTION_GAP);

        for (idx, record) in records.iter().enumerate() {
            if cursor.ensure_room(BLOCK_MIN_HEIGHT, page_height) {
                placements.push(Placement::NewPage);
            }

            placements.push(Placement::Text {
                page: cursor.page,
                x: cursor.x,
                y: cursor.y,
                size: CITY_FONT_SIZE,
                text: record.city.clone(),
            });
            cursor.advance(CITY_ADVANCE);

            // Not measured or wrapped: long descriptions run past the right edge.
            placements.push(Placement::Text {
                page: cursor.page,
                x: cursor.x,
                y: cursor.y,
                size: BODY_FONT_SIZE,
                text: record.description.clone(),
            });
            cursor.advance(BODY_ADVANCE);

            placements.push(Placement::Image {
                page: cursor.page,
                slot: ImageSlot::Record(idx),
                x: cursor.x,
                y: cursor.y,
                width: PICTURE_WIDTH,
                height: PICTURE_HEIGHT,
            });
            cursor.advance(PICTURE_ADVANCE);
        }

        Self {
            placements,
            page_count: cursor.page + 1,
            cursor,
        }
    }

    /// Replay the plan onto `backend`.
    ///
    /// `pictures[i]` is the picture for record `i`; a `None` leaves its slot
    /// empty.
    pub fn render<B: DocumentBackend>(
        &self,
        backend: &mut B,
        snapshot: &EmbeddedImage,
        pictures: &[Option<EmbeddedImage>],
    ) {
        for placement in &self.placements {
            match placement {
                Placement::Text {
                    x, y, size, text, ..
                } => {
                    backend.set_font_size(*size);
                    backend.write_text(text, *x, *y);
                }
                Placement::Image {
                    slot,
                    x,
                    y,
                    width,
                    height,
                    ..
                } => {
                    let image = match slot {
                        ImageSlot::Snapshot => Some(snapshot),
                        ImageSlot::Record(i) => pictures.get(*i).and_then(Option::as_ref),
                    };
                    if let Some(image) = image {
                        backend.add_image(image, *x, *y, *width, *height);
                    }
                }
                Placement::NewPage => backend.add_page(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PageSize;
    use crate::records::default_descriptions;

    const PAGE_H: f32 = 842.0;

    fn records(n: usize) -> Vec<DescriptionRecord> {
        default_descriptions().into_iter().cycle().take(n).collect()
    }

    fn breaks(layout: &BookletLayout) -> usize {
        layout
            .placements
            .iter()
            .filter(|p| matches!(p, Placement::NewPage))
            .count()
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<String>,
        pages: usize,
    }

    impl DocumentBackend for Recorder {
        fn set_font_size(&mut self, size: f32) {
            self.ops.push(format!("size {}", size));
        }
        fn write_text(&mut self, text: &str, x: f32, y: f32) {
            self.ops.push(format!("text {} {} {}", x, y, text));
        }
        fn add_image(&mut self, image: &EmbeddedImage, x: f32, y: f32, w: f32, h: f32) {
            self.ops
                .push(format!("image {}x{} at {} {} {} {}", image.width, image.height, x, y, w, h));
        }
        fn add_page(&mut self) {
            self.pages += 1;
            self.ops.push("page".into());
        }
        fn page_height(&self) -> f32 {
            PAGE_H
        }
        fn page_count(&self) -> usize {
            self.pages + 1
        }
        fn save(self) -> crate::Result<Vec<u8>> {
            Ok(self.ops.join("\n").into_bytes())
        }
    }

    #[test]
    fn cursor_breaks_and_resets_to_page_top() {
        let mut c = DocumentCursor::default();
        assert_eq!((c.x, c.y, c.page), (20.0, 30.0, 0));
        c.advance(800.0);
        assert!(c.ensure_room(BLOCK_MIN_HEIGHT, PAGE_H));
        assert_eq!((c.x, c.y, c.page), (20.0, 40.0, 1));
        assert!(!c.ensure_room(BLOCK_MIN_HEIGHT, PAGE_H));
        c.reset();
        assert_eq!(c, DocumentCursor::default());
    }

    #[test]
    fn break_threshold_is_strictly_greater() {
        let mut c = DocumentCursor {
            y: PAGE_H - BLOCK_MIN_HEIGHT,
            ..Default::default()
        };
        assert!(!c.ensure_room(BLOCK_MIN_HEIGHT, PAGE_H));
        c.advance(0.5);
        assert!(c.ensure_room(BLOCK_MIN_HEIGHT, PAGE_H));
        assert_eq!(c.y, PAGE_TOP);
    }

    #[test]
    fn map_image_is_scaled_by_six_tenths() {
        let layout = BookletLayout::plan("t", (960, 500), &[], PAGE_H);
        match &layout.placements[1] {
            Placement::Image {
                slot: ImageSlot::Snapshot,
                x,
                y,
                width,
                height,
                ..
            } => {
                assert_eq!((*x, *y), (MARGIN_X, MAP_TOP));
                assert_eq!(*width, 960.0 * MAP_SCALE);
                assert_eq!(*height, 500.0 * MAP_SCALE);
            }
            other => panic!("unexpected placement {:?}", other),
        }
    }

    #[test]
    fn three_default_records_fit_on_one_page() {
        // 40 + 300 + 20 = 360, then blocks start at 360, 540 and 720:
        // 720 + 60 = 780 <= 842, so no break is taken.
        let layout = BookletLayout::plan("t", (960, 500), &records(3), PAGE_H);
        assert_eq!(breaks(&layout), 0);
        assert_eq!(layout.page_count, 1);
        assert_eq!(layout.cursor.y, 900.0);
    }

    #[test]
    fn fourth_record_starts_page_two() {
        let layout = BookletLayout::plan("t", (960, 500), &records(4), PAGE_H);
        assert_eq!(layout.page_count, 2);
        let first_on_page_two = layout
            .placements
            .iter()
            .find_map(|p| match p {
                Placement::Text { page: 1, y, text, .. } => Some((*y, text.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(first_on_page_two, (PAGE_TOP, "Paris, France".to_string()));
    }

    #[test]
    fn tall_snapshot_pushes_second_record() {
        // 40 + 600 + 20 = 660; 660 + 60 fits, next block at 840 does not.
        let layout = BookletLayout::plan("t", (960, 1000), &records(3), PAGE_H);
        assert_eq!(layout.page_count, 2);
        let cities: Vec<usize> = layout
            .placements
            .iter()
            .filter_map(|p| match p {
                Placement::Text { page, size, .. } if *size == CITY_FONT_SIZE => Some(*page),
                _ => None,
            })
            .collect();
        assert_eq!(cities, vec![0, 1, 1]);
    }

    #[test]
    fn page_count_is_monotonic_in_record_count() {
        let mut last = 0;
        for n in 1..25 {
            let layout = BookletLayout::plan("t", (960, 500), &records(n), PAGE_H);
            assert!(layout.page_count >= last, "n={}", n);
            last = layout.page_count;
        }
        assert!(last > 1);
    }

    #[test]
    fn cursor_never_passes_page_before_block() {
        let layout = BookletLayout::plan("t", (960, 500), &records(12), PAGE_H);
        for p in &layout.placements {
            if let Placement::Text { y, size, .. } = p {
                if *size == CITY_FONT_SIZE {
                    assert!(*y + BLOCK_MIN_HEIGHT <= PAGE_H);
                }
            }
        }
    }

    #[test]
    fn render_replays_in_order_and_skips_missing_pictures() {
        let png = {
            let img = image::RgbaImage::from_pixel(10, 5, image::Rgba([0, 0, 0, 255]));
            let mut buf = std::io::Cursor::new(Vec::new());
            img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
            buf.into_inner()
        };
        let snap = EmbeddedImage::decode(&png).unwrap();
        let layout = BookletLayout::plan("Titre", (10, 5), &records(2), PageSize::A4.height);

        let mut rec = Recorder::default();
        layout.render(&mut rec, &snap, &[None, Some(snap.clone())]);
        assert_eq!(rec.ops[0], "size 22");
        assert_eq!(rec.ops[1], "text 20 30 Titre");
        assert_eq!(rec.ops[2], "image 10x5 at 20 40 6 3");
        let images = rec.ops.iter().filter(|o| o.starts_with("image")).count();
        assert_eq!(images, 2);
        assert_eq!(rec.page_count(), 1);
    }
}
