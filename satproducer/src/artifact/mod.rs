//! Renderable products handed to the writer.
//!
//! An [`Artifact`] is whatever a composite or a dump produced: something with
//! metadata that can be saved to a path in a named format. The raster
//! implementation, [`ImageArtifact`], encodes through the `image` crate.

mod raster;
mod thumbnail;

pub use raster::{ImageArtifact, OverlayPainter};
pub use thumbnail::write_thumbnail;

use crate::capability::AreaInfo;
use crate::template::Params;
use chrono::NaiveDateTime;
use image::ImageError;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors raised while decorating or saving an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] ImageError),

    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),

    #[error("invalid overlay color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("{0} does not support overlays")]
    OverlayUnsupported(String),

    #[error("overlay failed: {0}")]
    Overlay(String),

    #[error("{0}")]
    Other(String),
}

/// Coastline/border overlay request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    /// Draw with a single color.
    Color([u8; 3]),
    /// Draw from a named overlay configuration.
    Config(String),
}

impl Overlay {
    /// Interpret an `overlay` attribute: `#RRGGBB` or a configuration name.
    pub fn parse(value: &str) -> Result<Self, ArtifactError> {
        let value = value.trim();
        match value.strip_prefix('#') {
            Some(hex) => hash_color(hex)
                .map(Overlay::Color)
                .ok_or_else(|| ArtifactError::InvalidColor(value.to_string())),
            None => Ok(Overlay::Config(value.to_string())),
        }
    }
}

fn hash_color(hex: &str) -> Option<[u8; 3]> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Format and compression for a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Format name such as `png` or `tif`.
    pub format: Option<String>,
    /// Compression level 0-9.
    pub compression: u8,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            format: None,
            compression: 6,
        }
    }
}

/// A product ready to be written.
pub trait Artifact: Send {
    /// Short label for log lines.
    fn describe(&self) -> String;

    fn metadata(&self) -> &Params;

    fn metadata_mut(&mut self) -> &mut Params;

    fn time_slot(&self) -> Option<NaiveDateTime> {
        let metadata = self.metadata();
        metadata
            .get_time("time_slot")
            .or_else(|| metadata.get_time("start_time"))
    }

    fn area(&self) -> Option<AreaInfo> {
        None
    }

    fn add_overlay(&mut self, overlay: &Overlay) -> Result<(), ArtifactError> {
        let _ = overlay;
        Err(ArtifactError::OverlayUnsupported(self.describe()))
    }

    fn save(&self, path: &Path, options: &SaveOptions) -> Result<(), ArtifactError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_parse_color() {
        assert_eq!(
            Overlay::parse("#ff8000").unwrap(),
            Overlay::Color([255, 128, 0])
        );
        assert_eq!(
            Overlay::parse(" #000000 ").unwrap(),
            Overlay::Color([0, 0, 0])
        );
    }

    #[test]
    fn test_overlay_parse_config_name() {
        assert_eq!(
            Overlay::parse("coasts_fine").unwrap(),
            Overlay::Config("coasts_fine".into())
        );
    }

    #[test]
    fn test_overlay_parse_bad_color() {
        assert!(matches!(
            Overlay::parse("#12345"),
            Err(ArtifactError::InvalidColor(_))
        ));
        assert!(matches!(
            Overlay::parse("#gg0000"),
            Err(ArtifactError::InvalidColor(_))
        ));
    }
}
