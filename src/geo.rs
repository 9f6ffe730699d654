//! Geographic primitives: points, labelled markers and Web-Mercator projection

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Square tile edge in pixels, as served by slippy-map tile servers.
pub const TILE_SIZE: u32 = 256;

/// Latitude limit of the Web-Mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Reject coordinates outside the usual degree ranges.
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(Error::ConfigError(format!(
                "coordinates out of range: ({}, {})",
                self.lat, self.lon
            )));
        }
        Ok(())
    }
}

impl std::str::FromStr for GeoPoint {
    type Err = Error;

    /// Parses `"lat,lon"`.
    fn from_str(s: &str) -> Result<Self> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| Error::ConfigError(format!("expected LAT,LON, got {:?}", s)))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| Error::ConfigError(format!("bad coordinate {:?}: {}", v, e)))
        };
        let point = GeoPoint::new(parse(lat)?, parse(lon)?);
        point.validate()?;
        Ok(point)
    }
}

pub const PARIS: GeoPoint = GeoPoint::new(48.8566, 2.3522);
pub const LONDON: GeoPoint = GeoPoint::new(51.5074, -0.1278);
pub const BEIJING: GeoPoint = GeoPoint::new(39.9042, 116.4074);

/// A point on the map with the place name shown in its label overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub position: GeoPoint,
    pub label: String,
}

impl MarkerRecord {
    pub fn new(position: GeoPoint, label: impl Into<String>) -> Self {
        Self {
            position,
            label: label.into(),
        }
    }
}

/// The three city markers shown on the map, in display order.
pub fn default_markers() -> Vec<MarkerRecord> {
    vec![
        MarkerRecord::new(PARIS, "Paris, France"),
        MarkerRecord::new(LONDON, "London, United Kingdom"),
        MarkerRecord::new(BEIJING, "Beijing, China"),
    ]
}

/// Width (and height) of the whole world in pixels at `zoom`.
pub fn world_size(zoom: u8) -> f64 {
    f64::from(TILE_SIZE) * 2f64.powi(i32::from(zoom))
}

/// Project a point to absolute world pixel coordinates at `zoom`.
///
/// The origin is the top-left corner of tile (0, 0); x grows eastwards and
/// y southwards.
pub fn project(point: GeoPoint, zoom: u8) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = point.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (point.lon + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    (x, y)
}
