//! External capabilities the pipeline is built on.
//!
//! Decoding raw instrument data, resampling, orbit prediction and composite
//! rendering live outside this crate. The pipeline only talks to them through
//! the traits in this module, which keeps the orchestration testable with
//! in-memory implementations.

mod composite;
mod overpass;
mod region;
mod scene;

pub use composite::{Composite, CompositeError, CompositeRegistry, FnComposite};
pub use overpass::{NoOverpass, Overpass, OverpassProvider, OverpassRequest, SolarGeometry};
pub use region::{AreaInfo, RegionCatalog, RegionGeometry};
pub use scene::{
    ChannelMask, ChannelSelection, LoadError, LoadOptions, ProjectError, ProjectOptions,
    ProjectedScene, Scene, SceneError, SceneFactory, SceneRequest,
};

use std::fmt;
use std::sync::Arc;

/// Everything the production planner needs from the outside world.
#[derive(Clone)]
pub struct Capabilities {
    pub scenes: Arc<dyn SceneFactory>,
    pub regions: Arc<dyn RegionCatalog>,
    pub overpasses: Arc<dyn OverpassProvider>,
    pub solar: Arc<dyn SolarGeometry>,
    pub composites: Arc<CompositeRegistry>,
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("composites", &self.composites)
            .finish_non_exhaustive()
    }
}
