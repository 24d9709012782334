//! Region (area definition) geometry.

use super::scene::ProjectError;
use serde::Serialize;
use std::sync::Arc;

/// Descriptive fields of a region, as published in announcements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AreaInfo {
    pub name: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proj_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proj4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_extent: Option<[f64; 4]>,
    /// Width and height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<(usize, usize)>,
}

/// Pixel grid of a region with geolocation.
pub trait RegionGeometry: Send + Sync {
    /// Rows and columns.
    fn shape(&self) -> (usize, usize);

    /// Longitude and latitude of a pixel center, `None` off the earth.
    fn lonlat(&self, row: usize, col: usize) -> Option<(f64, f64)>;

    fn info(&self) -> AreaInfo;
}

/// Lookup of region definitions by id.
pub trait RegionCatalog: Send + Sync {
    fn region(&self, id: &str) -> Result<Arc<dyn RegionGeometry>, ProjectError>;
}
