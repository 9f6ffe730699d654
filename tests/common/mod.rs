//! Shared fixtures: a local tile/picture server and small generated images.

#![allow(dead_code)]

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tiny_http::{Header, Response, Server};

pub const TILE_COLOR: [u8; 4] = [120, 180, 90, 255];

pub fn png(w: u32, h: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(w, h, Rgba(color));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn jpeg(w: u32, h: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(w, h, Rgb([200, 150, 100]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

/// Local server answering `/tiles/{z}/{x}/{y}.png`, `/icon.png` and
/// `/pics/<name>.jpg` (`/pics/broken.jpg` answers with a non-image body);
/// everything else is a 404.
pub struct TestServer {
    pub base: String,
    pub tile_hits: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn start() -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let base = format!("http://{}", server.server_addr());
        let tile_hits = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&tile_hits);

        let tile = png(256, 256, TILE_COLOR);
        let icon = png(25, 41, [200, 30, 30, 255]);
        let picture = jpeg(36, 20);

        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                let path = request.url().to_string();
                let (body, mime) = if path.starts_with("/tiles/") && path.ends_with(".png") {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (Some(tile.clone()), "image/png")
                } else if path == "/pics/broken.jpg" {
                    (Some(b"<html>not a picture</html>".to_vec()), "image/jpeg")
                } else if path == "/icon.png" {
                    (Some(icon.clone()), "image/png")
                } else if path.starts_with("/pics/") && path.ends_with(".jpg") {
                    (Some(picture.clone()), "image/jpeg")
                } else {
                    (None, "text/plain")
                };
                let response = match body {
                    Some(bytes) => Response::from_data(bytes).with_header(
                        format!("Content-Type: {}", mime)
                            .parse::<Header>()
                            .unwrap(),
                    ),
                    None => Response::from_data(b"Not Found".to_vec()).with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self { base, tile_hits }
    }

    pub fn tile_template(&self) -> String {
        format!("{}/tiles/{{z}}/{{x}}/{{y}}.png", self.base)
    }

    pub fn picture(&self, name: &str) -> String {
        format!("{}/pics/{}.jpg", self.base, name)
    }
}

/// Configuration pointing every resource at `server`.
pub fn local_config(server: &TestServer) -> mapbook::BookletConfig {
    let mut cfg = mapbook::BookletConfig::default();
    cfg.page_origin = server.base.clone();
    cfg.timeout_ms = 5000;
    cfg.map.tiles.url_template = server.tile_template();
    cfg.map.tiles.subdomains.clear();
    cfg.map.marker_icon_url = Some(format!("{}/icon.png", server.base));
    for (i, record) in cfg.export.descriptions.iter_mut().enumerate() {
        record.image = server.picture(&format!("city{}", i));
    }
    cfg
}
