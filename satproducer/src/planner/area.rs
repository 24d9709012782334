//! Per-area scene with lazily computed geolocation and sun angles.

use crate::capability::{ProjectedScene, RegionGeometry, SolarGeometry};
use crate::product::{SunZenithLimits, SunZenithLocation};
use chrono::NaiveDateTime;
use std::cell::{OnceCell, RefCell};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A projected scene shared by the products of one area.
///
/// Longitudes/latitudes and solar zenith angles are computed on first use and
/// reused by every product of the area.
pub struct AreaScene<'a> {
    scene: &'a dyn ProjectedScene,
    geometry: Arc<dyn RegionGeometry>,
    time: Option<NaiveDateTime>,
    lonlats: OnceCell<Vec<Option<(f64, f64)>>>,
    sun_zenith: RefCell<BTreeMap<(usize, usize), Option<f64>>>,
}

impl<'a> AreaScene<'a> {
    pub fn new(scene: &'a dyn ProjectedScene, time: Option<NaiveDateTime>) -> Self {
        Self {
            geometry: scene.geometry(),
            scene,
            time,
            lonlats: OnceCell::new(),
            sun_zenith: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn scene(&self) -> &'a dyn ProjectedScene {
        self.scene
    }

    pub fn geometry(&self) -> &Arc<dyn RegionGeometry> {
        &self.geometry
    }

    /// Row-major longitude/latitude of every pixel.
    fn lonlats(&self) -> &[Option<(f64, f64)>] {
        self.lonlats.get_or_init(|| {
            let (rows, cols) = self.geometry.shape();
            debug!(area = self.scene.region_id(), rows, cols, "Computing pixel coordinates");
            (0..rows)
                .flat_map(|row| (0..cols).map(move |col| (row, col)))
                .map(|(row, col)| self.geometry.lonlat(row, col))
                .collect()
        })
    }

    fn lonlat(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        let (_, cols) = self.geometry.shape();
        match self.lonlats.get() {
            Some(grid) => grid.get(row * cols + col).copied().flatten(),
            None => self.geometry.lonlat(row, col),
        }
    }

    /// Pixel closest to a geographic location.
    pub fn nearest_pixel(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        let (_, cols) = self.geometry.shape();
        if cols == 0 {
            return None;
        }
        self.lonlats()
            .iter()
            .enumerate()
            .filter_map(|(i, ll)| ll.map(|(plon, plat)| (i, (plon - lon).powi(2) + (plat - lat).powi(2))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| (i / cols, i % cols))
    }

    /// Solar zenith angle at a pixel; `None` without time or geolocation.
    pub fn sun_zenith(&self, solar: &dyn SolarGeometry, row: usize, col: usize) -> Option<f64> {
        if let Some(cached) = self.sun_zenith.borrow().get(&(row, col)) {
            return *cached;
        }
        let angle = match (self.time, self.lonlat(row, col)) {
            (Some(time), Some((lon, lat))) => Some(solar.sun_zenith(time, lon, lat)),
            _ => None,
        };
        self.sun_zenith.borrow_mut().insert((row, col), angle);
        angle
    }

    /// Whether the sun angle at the configured location is within `limits`.
    ///
    /// An angle that cannot be computed does not exclude the product.
    pub fn sun_allows(&self, solar: &dyn SolarGeometry, limits: &SunZenithLimits) -> bool {
        let (rows, cols) = self.geometry.shape();
        let pixel = match limits.location {
            SunZenithLocation::Pixel { x, y } => Some((y, x)),
            SunZenithLocation::LonLat { lon, lat } => self.nearest_pixel(lon, lat),
            SunZenithLocation::Center => Some((rows / 2, cols / 2)),
        };
        let Some((row, col)) = pixel.filter(|&(r, c)| r < rows && c < cols) else {
            warn!(area = self.scene.region_id(), location = ?limits.location, "Sun zenith location outside the area");
            return false;
        };
        let Some(angle) = self.sun_zenith(solar, row, col) else {
            debug!(area = self.scene.region_id(), row, col, "No sun zenith angle available");
            return true;
        };
        debug!(row, col, angle, "Checking sun zenith angle limits");

        if limits.day_maximum.is_some_and(|max| angle > max) {
            info!(angle, "Sun too low for day-time product");
            return false;
        }
        if limits.night_minimum.is_some_and(|min| angle < min) {
            info!(angle, "Sun too high for night-time product");
            return false;
        }
        true
    }
}
