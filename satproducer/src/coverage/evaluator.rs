//! Coverage gating of target regions.

use super::geometry::Polygon;
use super::trace::{boundary_polygons, ValidityMask};
use super::CoverageError;
use crate::capability::{ChannelMask, Overpass, RegionGeometry};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Rows/columns between boundary samples.
pub const DEFAULT_FREQUENCY: usize = 100;

/// Outcome of a coverage check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverageDecision {
    /// Include the region; the ratio is known unless the check was skipped.
    Covered(Option<f64>),
    /// Exclude the region, with the ratio that fell short.
    NotCovered(f64),
    /// The estimate failed; defer to the generic check.
    Undetermined,
}

impl CoverageDecision {
    pub fn is_excluded(&self) -> bool {
        matches!(self, CoverageDecision::NotCovered(_))
    }
}

/// Estimates the fraction of a region observed by a pass.
///
/// Minimum coverages are percentages (0-100); ratios are fractions (0-1).
/// A ratio equal to the minimum counts as covered.
#[derive(Debug, Clone, Copy)]
pub struct CoverageEvaluator {
    frequency: usize,
}

impl Default for CoverageEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY)
    }
}

impl CoverageEvaluator {
    pub fn new(frequency: usize) -> Self {
        Self {
            frequency: frequency.max(1),
        }
    }

    /// Decide from the theoretical swath of a pass.
    ///
    /// Without an overpass model, or with a zero minimum, the region is
    /// covered.
    pub fn ground_track(
        &self,
        overpass: Option<&Arc<dyn Overpass>>,
        region: &dyn RegionGeometry,
        min_coverage: f64,
    ) -> CoverageDecision {
        let Some(overpass) = overpass else {
            return CoverageDecision::Covered(None);
        };
        if min_coverage <= 0.0 {
            return CoverageDecision::Covered(None);
        }
        let ratio = overpass
            .boundary()
            .and_then(|swath| self.overlap(&[swath], region));
        match ratio {
            Ok(ratio) => decide(ratio, min_coverage),
            Err(e) => {
                debug!(error = %e, "Ground-track coverage failed");
                CoverageDecision::Undetermined
            }
        }
    }

    /// Decide from the validity masks of a loaded scene.
    ///
    /// With no masks the region is covered.
    pub fn generic(
        &self,
        masks: &[ChannelMask],
        region: &dyn RegionGeometry,
        min_coverage: f64,
    ) -> CoverageDecision {
        if min_coverage <= 0.0 {
            return CoverageDecision::Covered(None);
        }
        match self.mask_coverage(masks, region) {
            Ok(Some(ratio)) => decide(ratio, min_coverage),
            Ok(None) => CoverageDecision::Covered(None),
            Err(e) => {
                debug!(error = %e, "Generic coverage failed");
                CoverageDecision::Undetermined
            }
        }
    }

    /// Smallest coverage ratio over the distinct channel shapes.
    ///
    /// Channels sharing a shape are combined: a pixel counts only when every
    /// such channel observed it.
    pub fn mask_coverage(
        &self,
        masks: &[ChannelMask],
        region: &dyn RegionGeometry,
    ) -> Result<Option<f64>, CoverageError> {
        let mut by_shape: BTreeMap<(usize, usize), (ValidityMask, Arc<dyn RegionGeometry>)> =
            BTreeMap::new();
        for channel in masks {
            let shape = channel.mask.shape();
            match by_shape.get_mut(&shape) {
                Some((combined, _)) => {
                    if let Some(both) = combined.intersect(&channel.mask) {
                        *combined = both;
                    }
                }
                None => {
                    by_shape.insert(shape, (channel.mask.clone(), Arc::clone(&channel.geometry)));
                }
            }
        }

        let mut lowest: Option<f64> = None;
        for (shape, (mask, geometry)) in &by_shape {
            let outlines = boundary_polygons(mask, geometry.as_ref(), self.frequency);
            let ratio = self.overlap(&outlines, region)?;
            debug!(rows = shape.0, cols = shape.1, ratio, "Mask coverage");
            lowest = Some(lowest.map_or(ratio, |low| low.min(ratio)));
        }
        Ok(lowest)
    }

    /// Outline of the whole region at the sampling frequency.
    pub fn region_boundary(&self, region: &dyn RegionGeometry) -> Polygon {
        let (rows, cols) = region.shape();
        let mask = ValidityMask::all_valid(rows, cols);
        boundary_polygons(&mask, region, self.frequency)
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    fn overlap(
        &self,
        polygons: &[Polygon],
        region: &dyn RegionGeometry,
    ) -> Result<f64, CoverageError> {
        let boundary = self.region_boundary(region);
        let area = boundary.area();
        if area <= 0.0 {
            return Err(CoverageError::EmptyRegion(region.info().id));
        }
        let covered: f64 = polygons
            .iter()
            .map(|polygon| polygon.intersection(&boundary).area())
            .sum();
        Ok((covered / area).min(1.0))
    }
}

fn decide(ratio: f64, min_coverage: f64) -> CoverageDecision {
    if ratio * 100.0 < min_coverage {
        CoverageDecision::NotCovered(ratio)
    } else {
        CoverageDecision::Covered(Some(ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::AreaInfo;
    use crate::coverage::Point;

    /// Regular lon/lat grid: one degree per pixel from (0, 0).
    struct Grid {
        rows: usize,
        cols: usize,
    }

    impl RegionGeometry for Grid {
        fn shape(&self) -> (usize, usize) {
            (self.rows, self.cols)
        }

        fn lonlat(&self, row: usize, col: usize) -> Option<(f64, f64)> {
            Some((col as f64, row as f64))
        }

        fn info(&self) -> AreaInfo {
            AreaInfo {
                id: "grid".into(),
                name: "grid".into(),
                ..Default::default()
            }
        }
    }

    /// Swath covering the left `fraction` of an 11x11 grid.
    struct Swath {
        fraction: f64,
    }

    impl Overpass for Swath {
        fn boundary(&self) -> Result<Polygon, CoverageError> {
            let right = 10.0 * self.fraction;
            Ok(Polygon::new(vec![
                Point::new(-5.0, -5.0),
                Point::new(right, -5.0),
                Point::new(right, 15.0),
                Point::new(-5.0, 15.0),
            ]))
        }
    }

    struct Broken;

    impl Overpass for Broken {
        fn boundary(&self) -> Result<Polygon, CoverageError> {
            Err(CoverageError::Boundary("no TLE".into()))
        }
    }

    fn swath(fraction: f64) -> Arc<dyn Overpass> {
        Arc::new(Swath { fraction })
    }

    const REGION: Grid = Grid { rows: 11, cols: 11 };

    #[test]
    fn test_ground_track_threshold() {
        let evaluator = CoverageEvaluator::new(1);
        let overpass = swath(0.8);

        match evaluator.ground_track(Some(&overpass), &REGION, 50.0) {
            CoverageDecision::Covered(Some(ratio)) => assert!((ratio - 0.8).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
        assert!(evaluator
            .ground_track(Some(&overpass), &REGION, 90.0)
            .is_excluded());
    }

    #[test]
    fn test_ground_track_tie_is_covered() {
        let evaluator = CoverageEvaluator::new(1);
        let overpass = swath(0.5);
        assert!(!evaluator
            .ground_track(Some(&overpass), &REGION, 50.0)
            .is_excluded());
    }

    #[test]
    fn test_ground_track_monotonic_in_minimum() {
        let evaluator = CoverageEvaluator::new(1);
        let overpass = swath(0.3);
        let mut excluded = false;
        for min in [0.0, 10.0, 29.0, 30.0, 31.0, 60.0, 100.0] {
            let now = evaluator
                .ground_track(Some(&overpass), &REGION, min)
                .is_excluded();
            assert!(!(excluded && !now), "minimum {} re-included the area", min);
            excluded = now;
        }
        assert!(excluded);
    }

    #[test]
    fn test_ground_track_without_model_or_minimum() {
        let evaluator = CoverageEvaluator::default();
        assert_eq!(
            evaluator.ground_track(None, &REGION, 90.0),
            CoverageDecision::Covered(None)
        );
        let overpass = swath(0.0);
        assert_eq!(
            evaluator.ground_track(Some(&overpass), &REGION, 0.0),
            CoverageDecision::Covered(None)
        );
    }

    #[test]
    fn test_ground_track_failure_is_undetermined() {
        let evaluator = CoverageEvaluator::new(1);
        let overpass: Arc<dyn Overpass> = Arc::new(Broken);
        assert_eq!(
            evaluator.ground_track(Some(&overpass), &REGION, 10.0),
            CoverageDecision::Undetermined
        );
    }

    fn mask(name: &str, mask: ValidityMask) -> ChannelMask {
        ChannelMask {
            name: name.into(),
            mask,
            geometry: Arc::new(REGION),
        }
    }

    #[test]
    fn test_generic_half_covered() {
        let evaluator = CoverageEvaluator::new(1);
        let masks = vec![mask("1", ValidityMask::from_fn(11, 11, |_, col| col <= 5))];

        let ratio = evaluator.mask_coverage(&masks, &REGION).unwrap().unwrap();
        assert!((ratio - 0.5).abs() < 1e-9);
        assert!(evaluator.generic(&masks, &REGION, 60.0).is_excluded());
        assert!(!evaluator.generic(&masks, &REGION, 40.0).is_excluded());
    }

    #[test]
    fn test_generic_combines_same_shape_channels() {
        let evaluator = CoverageEvaluator::new(1);
        let masks = vec![
            mask("1", ValidityMask::from_fn(11, 11, |_, col| col <= 5)),
            mask("2", ValidityMask::from_fn(11, 11, |row, _| row <= 5)),
        ];
        let ratio = evaluator.mask_coverage(&masks, &REGION).unwrap().unwrap();
        assert!((ratio - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_generic_without_masks_is_covered() {
        let evaluator = CoverageEvaluator::default();
        assert_eq!(
            evaluator.generic(&[], &REGION, 80.0),
            CoverageDecision::Covered(None)
        );
    }

    #[test]
    fn test_region_boundary_area() {
        let evaluator = CoverageEvaluator::new(3);
        assert!((evaluator.region_boundary(&REGION).area() - 100.0).abs() < 1e-9);
    }
}
