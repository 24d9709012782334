//! Product configuration: which groups, areas and products to generate.
//!
//! The configuration is a JSON document decoded into an immutable tree:
//!
//! ```text
//! ProductConfig ─┬─ common attributes (processing options, output_dir, ...)
//!                ├─ aliases
//!                ├─ dump (optional, outside any group)
//!                └─ groups ── areas ── products ── files (OutputSpec)
//! ```
//!
//! Numeric and boolean attributes the pipeline acts on are parsed once, at
//! load time, into typed fields. The raw [`Attributes`] stay available for
//! filename parameters.
//!
//! # Example
//!
//! ```
//! use satproducer::product::ProductConfig;
//!
//! let config = ProductConfig::from_json(r#"{
//!     "common": {"output_dir": "/data/out"},
//!     "groups": [{"id": "euro", "areas": [
//!         {"id": "euron1", "min_coverage": 20, "products": [
//!             {"id": "overview", "files": [{"filename": "{areaname}_{productname}.png"}]}
//!         ]}
//!     ]}]
//! }"#).unwrap();
//!
//! assert_eq!(config.area_ids(), vec!["euron1".to_string()]);
//! ```

mod attributes;
mod document;
mod loader;
mod tree;

pub use attributes::{parse_bool, Attributes};
pub use document::parse_thumbnail_size;
pub use loader::ProductConfigLoader;
pub use tree::{
    AreaNode, ConfigNode, DumpNode, Group, OutputSpec, ProcessingOptions, ProductConfig,
    ProductDef, ProductNode, SunZenithLimits, SunZenithLocation,
};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Product configuration errors.
#[derive(Debug, Error)]
pub enum ProductConfigError {
    #[error("Failed to read product configuration {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed product configuration: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("Missing attribute '{key}' on {node}")]
    MissingAttribute { node: String, key: String },

    #[error("Invalid attribute on {node}: {key} = '{value}' - {reason}")]
    InvalidAttribute {
        node: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ProductConfig {
    /// Decode a configuration document.
    pub fn from_json(text: &str) -> Result<Self, ProductConfigError> {
        let raw: document::RawConfig = serde_json::from_str(text)?;
        raw.into_config()
    }

    /// Read and decode a configuration file.
    pub fn load(path: &Path) -> Result<Self, ProductConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProductConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "common": {"output_dir": "/data/out", "nprocs": 4, "srch_radius": 5000,
                   "check_coverage": "no", "precompute": true},
        "aliases": {"platform_name": {"Metop-B": "metop01"}},
        "dump": {"unload_after_saving": "true", "files": [{"filename": "{start_time:%Y%m%d}.nc"}]},
        "groups": [
            {"id": "europe", "unload": "yes", "resolution": 1000, "areas": [
                {"id": "euron1", "name": "Northern Europe", "min_coverage": "25",
                 "srch_radius": 2000, "products": [
                    {"id": "overview", "valid_satellite": "Metop-B NOAA-19",
                     "sunzen_day_maximum": 90, "sunzen_lonlat": "25, 60",
                     "files": [{"filename": "a.png"}, {"filename": "b.png", "output_dir": "/mirror"}]},
                    {"dump": true, "files": [{"filename": "{areaname}.nc"}]}
                ]}
            ]},
            {"areas": [{"id": "scan2", "products": []}]}
        ]
    }"#;

    #[test]
    fn test_from_json_full_document() {
        let config = ProductConfig::from_json(DOCUMENT).unwrap();

        let options = config.options();
        assert_eq!(options.nprocs, 4);
        assert_eq!(options.search_radius, Some(5000));
        assert!(!options.check_coverage);
        assert!(options.precompute);
        assert_eq!(options.proj_method, "nearest");

        let dump = config.dump().unwrap();
        assert!(dump.unload_after_saving);
        assert_eq!(dump.outputs.len(), 1);

        let groups = config.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, "europe");
        assert!(groups[0].unload);
        assert_eq!(groups[0].resolution, Some(1000));
        assert_eq!(groups[1].id, "group1");

        let area = &groups[0].areas[0];
        assert_eq!(area.name, "Northern Europe");
        assert_eq!(area.min_coverage, 25.0);
        assert_eq!(area.search_radius, Some(2000));
        assert_eq!(area.products.len(), 2);

        match &area.products[0] {
            ProductNode::Composite(p) => {
                assert_eq!(p.id, "overview");
                assert_eq!(p.name, "overview");
                assert_eq!(p.valid_satellites, vec!["Metop-B", "NOAA-19"]);
                assert_eq!(p.outputs.len(), 2);
                let limits = p.sun_zenith.unwrap();
                assert_eq!(limits.day_maximum, Some(90.0));
                assert_eq!(
                    limits.location,
                    SunZenithLocation::LonLat {
                        lon: 25.0,
                        lat: 60.0
                    }
                );
            }
            other => panic!("expected composite, got {:?}", other),
        }
        assert!(matches!(area.products[1], ProductNode::Dump(_)));
        assert_eq!(config.area_ids(), vec!["euron1", "scan2"]);
        assert_eq!(
            config.aliases()["platform_name"]["Metop-B"],
            "metop01".to_string()
        );
    }

    #[test]
    fn test_missing_area_id() {
        let err = ProductConfig::from_json(r#"{"groups": [{"areas": [{"name": "x"}]}]}"#)
            .unwrap_err();
        assert!(matches!(err, ProductConfigError::MissingAttribute { .. }));
    }

    #[test]
    fn test_invalid_min_coverage() {
        let err = ProductConfig::from_json(
            r#"{"groups": [{"areas": [{"id": "a", "min_coverage": "lots"}]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_coverage"));

        let err = ProductConfig::from_json(
            r#"{"groups": [{"areas": [{"id": "a", "min_coverage": 120}]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("between 0 and 100"));
    }

    #[test]
    fn test_invalid_thumbnail_size() {
        let err = ProductConfig::from_json(
            r#"{"groups": [{"areas": [{"id": "a", "products": [
                {"id": "p", "files": [{"filename": "x.png", "thumbnail_size": "big"}]}
            ]}]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("thumbnail_size"));
    }

    #[test]
    fn test_pixel_location_overrides_lonlat() {
        let config = ProductConfig::from_json(
            r#"{"groups": [{"areas": [{"id": "a", "products": [
                {"id": "night", "sunzen_night_minimum": 95,
                 "sunzen_xy_loc": "10,20", "sunzen_lonlat": "25,60"}
            ]}]}]}"#,
        )
        .unwrap();
        let ProductNode::Composite(p) = &config.groups()[0].areas[0].products[0] else {
            panic!("expected composite");
        };
        let limits = p.sun_zenith.unwrap();
        assert_eq!(limits.location, SunZenithLocation::Pixel { x: 10, y: 20 });
        assert_eq!(limits.night_minimum, Some(95.0));
        assert_eq!(limits.day_maximum, None);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = ProductConfig::load(&temp.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ProductConfigError::Read { .. }));
    }
}
