//! Booklet export: capture the map, lay out the records, produce the PDF.

use crate::capture::{CaptureOptions, ResourceFetcher, SnapshotCapture};
use crate::document::{DocumentBackend, EmbeddedImage, Orientation, PageSize, PdfDocument};
use crate::layout::BookletLayout;
use crate::map_view::ViewHandle;
use crate::records::{default_descriptions, DescriptionRecord};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What to do when a description picture cannot be loaded or decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePolicy {
    /// Log a warning and leave the picture's slot empty
    #[default]
    Omit,
    /// Abort the export with `Error::ImageEmbedError`
    Fail,
}

/// Booklet content and export behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub title: String,
    /// Name of the produced file
    pub file_name: String,
    pub descriptions: Vec<DescriptionRecord>,
    /// Page orientation of the A4 booklet
    pub orientation: Orientation,
    pub capture: CaptureOptions,
    pub image_policy: ImagePolicy,
    /// Reject an export while another one is running on the same exporter
    pub single_flight: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "Découverte des Grandes Villes du Monde".to_string(),
            file_name: "livret_villes.pdf".to_string(),
            descriptions: default_descriptions(),
            orientation: Orientation::Portrait,
            capture: CaptureOptions::default(),
            image_policy: ImagePolicy::Omit,
            single_flight: true,
        }
    }
}

/// A finished booklet, ready to be written out.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Picture URLs that were left out under `ImagePolicy::Omit`
    pub omitted_images: Vec<String>,
}

impl ExportedDocument {
    /// Hex SHA-256 of the document bytes.
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// Write the document into `dir` under its file name.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        log::info!("saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Clears the in-flight flag when an export finishes, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Produces booklets from a mounted map view.
pub struct DocumentExporter {
    config: ExportConfig,
    capture: Box<dyn SnapshotCapture>,
    fetcher: Arc<dyn ResourceFetcher>,
    in_flight: AtomicBool,
}

impl DocumentExporter {
    pub fn new(
        config: ExportConfig,
        capture: Box<dyn SnapshotCapture>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Self {
        Self {
            config,
            capture,
            fetcher,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<Option<InFlight<'_>>> {
        if !self.config.single_flight {
            return Ok(None);
        }
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ExportInProgress)?;
        Ok(Some(InFlight(&self.in_flight)))
    }

    /// Capture `root` and build the booklet.
    ///
    /// Fails with `ViewNotMounted` when there is no root handle, and with
    /// `CaptureError` when the snapshot cannot be taken. Each call takes its
    /// own snapshot and cursor.
    pub fn export(&self, root: Option<&ViewHandle>) -> Result<ExportedDocument> {
        let Some(root) = root else {
            log::warn!("export requested before the map view was mounted");
            return Err(Error::ViewNotMounted);
        };
        let _guard = self.begin()?;

        let snapshot = self.capture.capture(root, &self.config.capture)?;
        log::debug!("captured {}x{} snapshot", snapshot.width, snapshot.height);
        let map_image = EmbeddedImage::decode(&snapshot.png_data)
            .map_err(|e| Error::CaptureError(format!("unreadable snapshot: {}", e)))?;

        let (pictures, omitted_images) = self.load_pictures()?;

        let mut doc = PdfDocument::new(PageSize::A4, self.config.orientation)
            .with_title(self.config.title.clone());
        let layout = BookletLayout::plan(
            &self.config.title,
            (snapshot.width, snapshot.height),
            &self.config.descriptions,
            doc.page_height(),
        );
        layout.render(&mut doc, &map_image, &pictures);
        let page_count = doc.page_count();
        let bytes = doc.save()?;

        let exported = ExportedDocument {
            file_name: self.config.file_name.clone(),
            bytes,
            page_count,
            omitted_images,
        };
        log::info!(
            "exported {} ({} pages, sha256 {})",
            exported.file_name,
            exported.page_count,
            exported.sha256_hex()
        );
        Ok(exported)
    }

    fn load_pictures(&self) -> Result<(Vec<Option<EmbeddedImage>>, Vec<String>)> {
        let mut pictures = Vec::with_capacity(self.config.descriptions.len());
        let mut omitted = Vec::new();
        for record in &self.config.descriptions {
            match self.load_picture(&record.image) {
                Ok(img) => pictures.push(Some(img)),
                Err(e) if self.config.image_policy == ImagePolicy::Omit => {
                    log::warn!("omitting picture of {}: {}", record.monument, e);
                    omitted.push(record.image.clone());
                    pictures.push(None);
                }
                Err(e) => return Err(e),
            }
        }
        Ok((pictures, omitted))
    }

    fn load_picture(&self, url: &str) -> Result<EmbeddedImage> {
        let bytes = self.fetcher.fetch(url).map_err(|e| Error::image(url, e))?;
        EmbeddedImage::decode(&bytes).map_err(|e| Error::image(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{OfflineFetcher, RenderedSnapshot};
    use crate::map_view::{MapView, MapViewConfig};
    use std::sync::mpsc;
    use std::sync::Mutex;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([50, 60, 70, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    struct FixedCapture(RenderedSnapshot);

    impl SnapshotCapture for FixedCapture {
        fn capture(&self, _: &ViewHandle, _: &CaptureOptions) -> Result<RenderedSnapshot> {
            Ok(self.0.clone())
        }
    }

    struct FailingCapture;

    impl SnapshotCapture for FailingCapture {
        fn capture(&self, _: &ViewHandle, _: &CaptureOptions) -> Result<RenderedSnapshot> {
            Err(Error::CaptureError("graphics device refused pixel read".into()))
        }
    }

    /// Blocks inside `capture` until released, to hold an export open.
    struct GatedCapture {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
        snapshot: RenderedSnapshot,
    }

    impl SnapshotCapture for GatedCapture {
        fn capture(&self, _: &ViewHandle, _: &CaptureOptions) -> Result<RenderedSnapshot> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(self.snapshot.clone())
        }
    }

    fn snapshot() -> RenderedSnapshot {
        RenderedSnapshot {
            width: 960,
            height: 500,
            png_data: png(960, 500),
        }
    }

    fn local_records() -> Vec<DescriptionRecord> {
        use base64::Engine as _;
        let data = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png(18, 10))
        );
        default_descriptions()
            .into_iter()
            .map(|mut r| {
                r.image = data.clone();
                r
            })
            .collect()
    }

    fn mounted() -> (MapView, ViewHandle) {
        let mut view = MapView::new(MapViewConfig::default()).unwrap();
        let handle = view.mount();
        (view, handle)
    }

    #[test]
    fn unmounted_view_is_reported() {
        let exporter = DocumentExporter::new(
            ExportConfig::default(),
            Box::new(FixedCapture(snapshot())),
            Arc::new(OfflineFetcher),
        );
        let view = MapView::new(MapViewConfig::default()).unwrap();
        let err = exporter.export(view.root().as_ref()).unwrap_err();
        assert!(matches!(err, Error::ViewNotMounted));
        assert!(!exporter.is_exporting());
    }

    #[test]
    fn capture_errors_abort_export() {
        let exporter = DocumentExporter::new(
            ExportConfig::default(),
            Box::new(FailingCapture),
            Arc::new(OfflineFetcher),
        );
        let (_view, handle) = mounted();
        let err = exporter.export(Some(&handle)).unwrap_err();
        assert!(matches!(err, Error::CaptureError(_)));
        // the guard is released on failure
        assert!(!exporter.is_exporting());
    }

    #[test]
    fn offline_pictures_are_omitted_by_default() {
        let exporter = DocumentExporter::new(
            ExportConfig::default(),
            Box::new(FixedCapture(snapshot())),
            Arc::new(OfflineFetcher),
        );
        let (_view, handle) = mounted();
        let doc = exporter.export(Some(&handle)).unwrap();
        assert_eq!(doc.file_name, "livret_villes.pdf");
        assert_eq!(doc.page_count, 1);
        assert_eq!(doc.omitted_images.len(), 3);
        assert!(doc.bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn strict_policy_fails_on_missing_picture() {
        let config = ExportConfig {
            image_policy: ImagePolicy::Fail,
            ..Default::default()
        };
        let exporter = DocumentExporter::new(
            config,
            Box::new(FixedCapture(snapshot())),
            Arc::new(OfflineFetcher),
        );
        let (_view, handle) = mounted();
        match exporter.export(Some(&handle)).unwrap_err() {
            Error::ImageEmbedError { url, .. } => assert!(url.contains("Eiffel")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn local_pictures_are_embedded() {
        let config = ExportConfig {
            descriptions: local_records(),
            image_policy: ImagePolicy::Fail,
            ..Default::default()
        };
        let exporter = DocumentExporter::new(
            config,
            Box::new(FixedCapture(snapshot())),
            Arc::new(OfflineFetcher),
        );
        let (_view, handle) = mounted();
        let doc = exporter.export(Some(&handle)).unwrap();
        assert!(doc.omitted_images.is_empty());
        assert!(doc.bytes.windows(4).any(|w| w == b"/Im4"));
    }

    #[test]
    fn repeated_exports_are_identical() {
        let config = ExportConfig {
            descriptions: local_records(),
            ..Default::default()
        };
        let exporter = DocumentExporter::new(
            config,
            Box::new(FixedCapture(snapshot())),
            Arc::new(OfflineFetcher),
        );
        let (_view, handle) = mounted();
        let a = exporter.export(Some(&handle)).unwrap();
        let b = exporter.export(Some(&handle)).unwrap();
        assert_eq!(a.bytes, b.bytes);
        assert_eq!(a.sha256_hex(), b.sha256_hex());
        assert_eq!(a.sha256_hex().len(), 64);
    }

    #[test]
    fn landscape_booklet_paginates_on_the_shorter_page() {
        let config = ExportConfig {
            orientation: Orientation::Landscape,
            ..Default::default()
        };
        let exporter = DocumentExporter::new(
            config,
            Box::new(FixedCapture(snapshot())),
            Arc::new(OfflineFetcher),
        );
        let (_view, handle) = mounted();
        let doc = exporter.export(Some(&handle)).unwrap();
        // second block would start at 540 and overrun the 595-unit page
        assert_eq!(doc.page_count, 2);
        let media_box = b"/MediaBox [0 0 842 595]";
        assert!(doc.bytes.windows(media_box.len()).any(|w| w == media_box));
    }

    fn gated(single_flight: bool) -> (Arc<DocumentExporter>, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let capture = GatedCapture {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
            snapshot: snapshot(),
        };
        let config = ExportConfig {
            single_flight,
            ..Default::default()
        };
        let exporter = DocumentExporter::new(config, Box::new(capture), Arc::new(OfflineFetcher));
        (Arc::new(exporter), entered_rx, release_tx)
    }

    #[test]
    fn concurrent_export_is_rejected_while_one_runs() {
        let (exporter, entered, release) = gated(true);
        let (_view, handle) = mounted();

        let worker = {
            let exporter = Arc::clone(&exporter);
            let handle = handle.clone();
            std::thread::spawn(move || exporter.export(Some(&handle)))
        };
        entered.recv().unwrap();
        assert!(exporter.is_exporting());
        assert!(matches!(
            exporter.export(Some(&handle)),
            Err(Error::ExportInProgress)
        ));

        release.send(()).unwrap();
        assert!(worker.join().unwrap().is_ok());
        assert!(!exporter.is_exporting());
    }

    #[test]
    fn without_guard_overlapping_exports_both_finish() {
        let (exporter, entered, release) = gated(false);
        let (_view, handle) = mounted();

        let workers: Vec<_> = (0..2)
            .map(|_| {
                let exporter = Arc::clone(&exporter);
                let handle = handle.clone();
                std::thread::spawn(move || exporter.export(Some(&handle)))
            })
            .collect();
        entered.recv().unwrap();
        entered.recv().unwrap();
        release.send(()).unwrap();
        release.send(()).unwrap();
        for w in workers {
            assert!(w.join().unwrap().is_ok());
        }
    }

    #[test]
    fn save_writes_named_file() {
        let doc = ExportedDocument {
            file_name: "out.pdf".into(),
            bytes: b"%PDF-1.7".to_vec(),
            page_count: 1,
            omitted_images: vec![],
        };
        let dir = std::env::temp_dir().join(format!("mapbook-save-{}", std::process::id()));
        let path = doc.save_to(&dir).unwrap();
        assert_eq!(path.file_name().unwrap(), "out.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        let _ = std::fs::remove_dir_all(dir);
    }
}
