//! Ground-track (overpass) models and solar geometry.

use crate::coverage::{CoverageError, Polygon};
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Parameters identifying a satellite pass.
#[derive(Debug, Clone, PartialEq)]
pub struct OverpassRequest {
    pub platform: String,
    pub instrument: String,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

/// Theoretical swath of a satellite pass.
pub trait Overpass: Send + Sync {
    /// Swath outline as a longitude/latitude polygon.
    fn boundary(&self) -> Result<Polygon, CoverageError>;
}

/// Creates overpass models for polar passes.
pub trait OverpassProvider: Send + Sync {
    /// `None` when no orbit model is available for the platform.
    fn overpass(&self, request: &OverpassRequest) -> Option<Arc<dyn Overpass>>;
}

/// Provider for deployments without orbit data.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverpass;

impl OverpassProvider for NoOverpass {
    fn overpass(&self, _request: &OverpassRequest) -> Option<Arc<dyn Overpass>> {
        None
    }
}

/// Solar zenith angle computation.
pub trait SolarGeometry: Send + Sync {
    /// Solar zenith angle in degrees at a UTC time and location.
    fn sun_zenith(&self, time: NaiveDateTime, lon: f64, lat: f64) -> f64;
}
