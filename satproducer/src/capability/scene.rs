//! Scene construction, loading and reprojection capabilities.

use super::region::RegionGeometry;
use crate::artifact::{Artifact, ArtifactError};
use crate::coverage::ValidityMask;
use chrono::NaiveDateTime;
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Failure to decode the raw input of a scene.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadError {
    /// Truncated, corrupt or missing input data.
    #[error("incomplete or corrupted input data: {0}")]
    IncompleteData(String),
}

/// Failure to reproject a scene onto a region.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectError {
    #[error("no data in area {0}")]
    NoDataInArea(String),

    #[error("area {0} is not defined")]
    RegionNotFound(String),
}

/// Failure to construct a scene handle.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("cannot create scene for {platform}/{instrument}: {reason}")]
pub struct SceneError {
    pub platform: String,
    pub instrument: String,
    pub reason: String,
}

/// Identity of the observation a scene is built for.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRequest {
    pub platform: String,
    pub instrument: String,
    pub time_slot: Option<NaiveDateTime>,
    /// `None` for geostationary platforms.
    pub orbit_number: Option<i64>,
    pub variant: String,
}

/// Channels requested from a load or reprojection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelection {
    All,
    Named(BTreeSet<String>),
}

impl ChannelSelection {
    pub fn is_empty(&self) -> bool {
        matches!(self, ChannelSelection::Named(set) if set.is_empty())
    }
}

impl fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSelection::All => write!(f, "all channels"),
            ChannelSelection::Named(set) => {
                let names: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{}", names.join(", "))
            }
        }
    }
}

/// Keyword overrides passed with a load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    pub filenames: Vec<PathBuf>,
    /// Area ids of the group being loaded, for readers that crop early.
    pub area_def_names: Vec<String>,
    pub use_extern_calib: bool,
    pub time_interval: Option<(NaiveDateTime, NaiveDateTime)>,
    pub resolution: Option<u32>,
}

/// Parameters of a reprojection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOptions {
    pub method: String,
    pub channels: ChannelSelection,
    pub nprocs: usize,
    pub precompute: bool,
    /// Search radius in metres, `None` for the resampler default.
    pub radius: Option<u32>,
}

/// Validity of one loaded channel, in the geometry it was observed in.
#[derive(Clone)]
pub struct ChannelMask {
    pub name: String,
    pub mask: ValidityMask,
    pub geometry: Arc<dyn RegionGeometry>,
}

impl fmt::Debug for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelMask")
            .field("name", &self.name)
            .field("shape", &self.mask.shape())
            .finish()
    }
}

/// Builds scene handles from an observation identity.
pub trait SceneFactory: Send + Sync {
    fn build(&self, request: &SceneRequest) -> Result<Box<dyn Scene>, SceneError>;
}

/// An observation in its native geometry.
pub trait Scene {
    fn load(&mut self, channels: &ChannelSelection, options: &LoadOptions)
        -> Result<(), LoadError>;

    fn loaded_channels(&self) -> Vec<String>;

    fn unload(&mut self, channels: &[String]);

    /// Validity masks of the loaded channels.
    fn channel_masks(&self) -> Vec<ChannelMask>;

    fn project(
        &self,
        region_id: &str,
        options: &ProjectOptions,
    ) -> Result<Box<dyn ProjectedScene>, ProjectError>;

    /// Pass-through dataset of everything loaded.
    fn dataset(&self) -> Result<Box<dyn Artifact>, ArtifactError>;
}

/// A scene resampled onto one region.
pub trait ProjectedScene {
    fn region_id(&self) -> &str;

    fn geometry(&self) -> Arc<dyn RegionGeometry>;

    fn dataset(&self) -> Result<Box<dyn Artifact>, ArtifactError>;

    /// Concrete access for composite implementations.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_selection_display() {
        assert_eq!(ChannelSelection::All.to_string(), "all channels");
        let named = ChannelSelection::Named(["1".to_string(), "2".to_string()].into());
        assert_eq!(named.to_string(), "1, 2");
        assert!(ChannelSelection::Named(BTreeSet::new()).is_empty());
        assert!(!ChannelSelection::All.is_empty());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ProjectError::RegionNotFound("euron1".into()).to_string(),
            "area euron1 is not defined"
        );
        assert!(LoadError::IncompleteData("short read".into())
            .to_string()
            .contains("short read"));
    }
}
