//! Turning one message into write jobs.
//!
//! The [`ProductionPlanner`] walks the product configuration for a message:
//! the top-level dump first, then every group in order. A group is loaded
//! only when at least one of its areas passes the coverage check and has
//! products. Each area that survives is projected and its products are
//! rendered and queued for writing.
//!
//! Before returning, the planner waits for the write queue to drain and only
//! then releases the scene, so nothing a queued write refers to is dropped
//! early.

mod area;
mod params;
mod preview;
mod source;

pub use area::AreaScene;
pub use params::{node_parameters, overlay_parameters};
pub use preview::{preview, PlannedProduct};
pub use source::{resolve_source, resolve_sources};

use crate::artifact::Artifact;
use crate::capability::{
    AreaInfo, Capabilities, ChannelSelection, CompositeError, LoadError, LoadOptions, Overpass,
    OverpassRequest, ProjectError, ProjectOptions, ProjectedScene, Scene, SceneError, SceneRequest,
};
use crate::coverage::{CoverageDecision, CoverageEvaluator};
use crate::message::Message;
use crate::product::{AreaNode, DumpNode, Group, OutputSpec, ProductConfig, ProductDef, ProductNode};
use crate::template::{ParamValue, Parameters, Params};
use crate::writer::WriteQueue;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why a message could not be processed.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Channel data failed to load; worth one retry.
    #[error("incomplete or corrupted input data: {0}")]
    IncompleteData(String),

    #[error("data file {0} is not accessible from this host")]
    UnreachableSource(String),

    #[error("message lacks '{0}'")]
    MissingMetadata(&'static str),

    #[error(transparent)]
    SceneCreation(#[from] SceneError),
}

impl ProcessError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProcessError::IncompleteData(_))
    }
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Artifacts handed to the writer.
    pub enqueued: usize,
    /// Groups whose channels were loaded.
    pub groups: usize,
    /// Areas successfully projected.
    pub areas: usize,
    /// Set when the whole message was passed over.
    pub ignored: Option<String>,
}

impl RunReport {
    fn ignored(reason: impl Into<String>) -> Self {
        Self {
            ignored: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Produces artifacts for messages and feeds them to the write queue.
pub struct ProductionPlanner {
    capabilities: Capabilities,
    queue: Arc<WriteQueue>,
    evaluator: CoverageEvaluator,
}

impl ProductionPlanner {
    pub fn new(capabilities: Capabilities, queue: Arc<WriteQueue>) -> Self {
        Self {
            capabilities,
            queue,
            evaluator: CoverageEvaluator::default(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: CoverageEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn queue(&self) -> &Arc<WriteQueue> {
        &self.queue
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Produce everything `config` asks for from the data in `msg`.
    ///
    /// Returns after all queued writes are done and the scene is released.
    /// A channel load failure anywhere yields
    /// [`ProcessError::IncompleteData`], reported after that cleanup.
    pub fn run(&self, config: &ProductConfig, msg: &Message) -> Result<RunReport, ProcessError> {
        if !msg.carries_data() {
            warn!(kind = msg.kind(), "Can't run on this message type");
            return Ok(RunReport::ignored(format!("{} message", msg.kind())));
        }
        if let Some(collection_area) = msg.collection_area_id() {
            if !config.area_ids().iter().any(|id| id == collection_area) {
                info!(area = collection_area, "Collection does not contain data for current areas, skipping");
                return Ok(RunReport::ignored(format!("collection for {}", collection_area)));
            }
        }

        let uris = msg.uris();
        info!(uris = ?uris, "New data available");
        let started = Instant::now();

        let filenames = resolve_sources(&uris).inspect_err(|e| {
            info!(error = %e, "Skipping");
        })?;

        let mut run = MessageRun::start(self, config, msg, filenames)?;
        let outcome = run.process();

        debug!("Waiting for the files to be saved");
        self.queue.join();
        let report = run.release();

        match outcome {
            Ok(()) => {
                info!(
                    uris = ?uris,
                    enqueued = report.enqueued,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Message processed"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(uris = ?uris, error = %e, "Message not processed due to incomplete, missing or corrupted data");
                Err(ProcessError::IncompleteData(e.to_string()))
            }
        }
    }

    fn create_scene(
        &self,
        config: &ProductConfig,
        msg: &Message,
    ) -> Result<(Box<dyn Scene>, Option<Arc<dyn Overpass>>, SceneRequest), ProcessError> {
        let platform = msg
            .platform_name()
            .ok_or(ProcessError::MissingMetadata("platform_name"))?
            .to_string();
        let instrument = msg
            .sensors()
            .into_iter()
            .next()
            .ok_or(ProcessError::MissingMetadata("sensor"))?;
        let request = SceneRequest {
            platform,
            instrument,
            time_slot: msg.time_slot(),
            orbit_number: msg.orbit_number(),
            variant: msg.variant().to_string(),
        };
        info!(platform = %request.platform, time_slot = ?request.time_slot, "Creating scene");
        let scene = self.capabilities.scenes.build(&request)?;

        let polar = request.orbit_number.is_some() || msg.orbit_type() == Some("polar");
        let overpass = if config.options().check_coverage && polar {
            self.capabilities.overpasses.overpass(&OverpassRequest {
                platform: request.platform.clone(),
                instrument: request.instrument.clone(),
                start_time: msg.start_time(),
                end_time: msg.end_time(),
            })
        } else {
            None
        };
        Ok((scene, overpass, request))
    }
}

/// State of one message being processed.
struct MessageRun<'a> {
    planner: &'a ProductionPlanner,
    config: &'a ProductConfig,
    msg: &'a Message,
    scene: Box<dyn Scene>,
    overpass: Option<Arc<dyn Overpass>>,
    platform: String,
    time_slot: Option<NaiveDateTime>,
    /// Message metadata plus `time`.
    info: Params,
    filenames: Vec<PathBuf>,
    report: RunReport,
}

impl<'a> MessageRun<'a> {
    fn start(
        planner: &'a ProductionPlanner,
        config: &'a ProductConfig,
        msg: &'a Message,
        filenames: Vec<PathBuf>,
    ) -> Result<Self, ProcessError> {
        let (scene, overpass, request) = planner.create_scene(config, msg)?;
        let mut info = msg.metadata.clone();
        if let Some(time) = request.time_slot {
            info.insert("time", time);
        }
        Ok(Self {
            planner,
            config,
            msg,
            scene,
            overpass,
            platform: request.platform,
            time_slot: request.time_slot,
            info,
            filenames,
            report: RunReport::default(),
        })
    }

    fn process(&mut self) -> Result<(), LoadError> {
        let options = self.config.options();
        info!(
            nprocs = options.nprocs,
            method = %options.proj_method,
            "Reprojection settings"
        );

        if let Some(dump) = self.config.dump() {
            self.process_dump(dump);
        }
        let config = self.config;
        for group in config.groups() {
            self.process_group(group)?;
        }
        Ok(())
    }

    /// Drop the scene and hand back the report.
    fn release(self) -> RunReport {
        let MessageRun { scene, report, .. } = self;
        drop(scene);
        debug!("Scene released");
        report
    }

    fn process_dump(&mut self, dump: &DumpNode) {
        let load = LoadOptions {
            filenames: self.filenames.clone(),
            use_extern_calib: self.config.options().use_extern_calib,
            ..Default::default()
        };
        if let Err(e) = self.scene.load(&ChannelSelection::All, &load) {
            error!(error = %e, "Incomplete or corrupted input data for dump");
            return;
        }
        let params = node_parameters(self.config, &self.info, dump);
        match self.scene.dataset() {
            Ok(dataset) => self.enqueue_dump(dataset, dump, params, None),
            Err(e) => error!(error = %e, "Saving unprojected data failed"),
        }
        if dump.unload_after_saving {
            info!("Unloading data after dump");
            self.unload_all();
        }
    }

    fn process_group(&mut self, group: &'a Group) -> Result<(), LoadError> {
        debug!(group = %group.id, "Processing group");
        let area_ids = group.area_ids();
        if let Some(collection_area) = self.msg.collection_area_id() {
            if !area_ids.iter().any(|id| id == collection_area) {
                info!(group = %group.id, "Collection data does not cover this group, skipping");
                return Ok(());
            }
        }

        let config = self.config;
        let options = config.options();
        let mut pending: Vec<(&'a AreaNode, bool)> = Vec::new();
        for area in &group.areas {
            let needs_generic = match self.ground_track(area) {
                CoverageDecision::NotCovered(ratio) => {
                    info!(
                        group = %group.id,
                        area = %area.id,
                        coverage = ratio * 100.0,
                        min_coverage = area.min_coverage,
                        "Area not covered by the pass, skipping"
                    );
                    continue;
                }
                CoverageDecision::Covered(_) => {
                    self.overpass.is_none() && options.check_coverage && area.min_coverage > 0.0
                }
                CoverageDecision::Undetermined => {
                    warn!(group = %group.id, area = %area.id, "Can't compute coverage from the pass, checking loaded data instead");
                    true
                }
            };
            if area.products.is_empty() {
                debug!(group = %group.id, area = %area.id, "Area has no products");
                continue;
            }
            pending.push((area, needs_generic));
        }
        if pending.is_empty() {
            info!(group = %group.id, "Nothing to produce for group, skipping");
            return Ok(());
        }
        self.report.groups += 1;

        if group.unload {
            debug!(group = %group.id, "Unloading all channels before group");
            self.unload_all();
        }

        let channels = self.required_channels(pending.iter().flat_map(|(area, _)| &area.products));
        debug!(group = %group.id, channels = %channels, "Loading channels");
        let load = LoadOptions {
            filenames: self.filenames.clone(),
            area_def_names: area_ids,
            use_extern_calib: options.use_extern_calib,
            time_interval: self.msg.start_time().zip(self.msg.end_time()),
            resolution: group.resolution,
        };
        if let Err(e) = self.scene.load(&channels, &load) {
            error!(group = %group.id, error = %e, "Incomplete or corrupted input data");
            return Err(e);
        }

        for (area, needs_generic) in pending {
            if needs_generic && !self.generic_covers(group, area) {
                continue;
            }
            self.process_area(group, area);
        }

        if group.unload {
            debug!(group = %group.id, "Unloading all channels after group");
            self.unload_all();
        }
        Ok(())
    }

    fn ground_track(&self, area: &AreaNode) -> CoverageDecision {
        if !self.config.options().check_coverage {
            return CoverageDecision::Covered(None);
        }
        let Some(overpass) = self.overpass.as_ref() else {
            return CoverageDecision::Covered(None);
        };
        match self.planner.capabilities.regions.region(&area.id) {
            Ok(region) => self
                .planner
                .evaluator
                .ground_track(Some(overpass), region.as_ref(), area.min_coverage),
            Err(e) => {
                debug!(area = %area.id, error = %e, "No region for coverage check");
                CoverageDecision::Undetermined
            }
        }
    }

    fn generic_covers(&self, group: &Group, area: &AreaNode) -> bool {
        let region = match self.planner.capabilities.regions.region(&area.id) {
            Ok(region) => region,
            // Projection reports the missing region
            Err(_) => return true,
        };
        let masks = self.scene.channel_masks();
        match self
            .planner
            .evaluator
            .generic(&masks, region.as_ref(), area.min_coverage)
        {
            CoverageDecision::NotCovered(ratio) => {
                info!(
                    group = %group.id,
                    area = %area.id,
                    coverage = ratio * 100.0,
                    min_coverage = area.min_coverage,
                    "Area not covered by loaded data, skipping"
                );
                false
            }
            CoverageDecision::Covered(_) => true,
            CoverageDecision::Undetermined => {
                warn!(group = %group.id, area = %area.id, "Can't compute coverage from loaded data, producing anyway");
                true
            }
        }
    }

    /// Union of the channels the products need; any dump needs everything.
    fn required_channels<'p>(&self, products: impl IntoIterator<Item = &'p ProductNode>) -> ChannelSelection {
        let composites = &self.planner.capabilities.composites;
        let mut channels = BTreeSet::new();
        for product in products {
            match product {
                ProductNode::Dump(_) => return ChannelSelection::All,
                ProductNode::Composite(def) => match composites.get(&def.id) {
                    Ok(composite) => channels.extend(composite.prerequisites()),
                    Err(_) => info!(product = %def.id, "Composite not available"),
                },
            }
        }
        ChannelSelection::Named(channels)
    }

    fn process_area(&mut self, group: &Group, area: &AreaNode) {
        let config = self.config;
        let options = config.options();
        let radius = area
            .search_radius
            .or(group.search_radius)
            .or(options.search_radius);
        let project = ProjectOptions {
            method: options.proj_method.clone(),
            channels: self.required_channels(&area.products),
            nprocs: options.nprocs,
            precompute: options.precompute,
            radius,
        };
        debug!(area = %area.name, radius = ?radius, "Projecting data");

        let local = match self.scene.project(&area.id, &project) {
            Ok(local) => local,
            Err(e @ ProjectError::NoDataInArea(_)) => {
                warn!(group = %group.id, area = %area.id, error = %e, "No data in this area");
                return;
            }
            Err(e @ ProjectError::RegionNotFound(_)) => {
                warn!(group = %group.id, area = %area.id, error = %e, "Area not defined, skipping");
                return;
            }
        };
        info!(area = %area.name, "Data reprojected");
        self.report.areas += 1;

        self.draw_area(area, local.as_ref());
    }

    fn draw_area(&mut self, area: &AreaNode, local: &dyn ProjectedScene) {
        let area_scene = AreaScene::new(local, self.time_slot);
        let base = node_parameters(self.config, &self.info, area);

        for product in &area.products {
            let params = overlay_parameters(&base, self.config, &self.info, product.node());
            match product {
                ProductNode::Dump(dump) => match local.dataset() {
                    Ok(dataset) => {
                        let info = area_scene.geometry().info();
                        self.enqueue_dump(dataset, dump, params, Some(info));
                    }
                    Err(e) => error!(area = %area.id, error = %e, "Saving projected data failed"),
                },
                ProductNode::Composite(def) => self.draw_composite(area, def, &area_scene, params),
            }
        }
        info!(area = %area.name, "Area completed");
    }

    fn draw_composite(&mut self, area: &AreaNode, def: &ProductDef, area_scene: &AreaScene<'_>, params: Parameters) {
        let planner = self.planner;
        let capabilities = &planner.capabilities;
        if !def.allows_platform(&self.platform) {
            info!(platform = %self.platform, product = %def.name, "Satellite not valid for product, skipping");
            return;
        }
        if let Some(limits) = &def.sun_zenith {
            if !area_scene.sun_allows(capabilities.solar.as_ref(), limits) {
                info!(area = %area.id, product = %def.name, "Sun zenith angle outside limits, skipping");
                return;
            }
        }

        let composite = match capabilities.composites.get(&def.id) {
            Ok(composite) => Arc::clone(composite),
            Err(e) => {
                error!(area = %area.name, product = %def.id, error = %e, "Incorrect product id");
                return;
            }
        };
        debug!(product = %def.id, "Generating composite");
        match composite.build(area_scene.scene()) {
            Ok(mut artifact) => {
                let metadata = artifact.metadata_mut();
                metadata.extend(&self.info);
                metadata.insert("product_name", def.name.clone());
                self.enqueue(artifact, &def.outputs, &params);
            }
            Err(e @ CompositeError::MissingChannel(_)) => {
                warn!(area = %area.name, product = %def.name, error = %e, "Missing channel on product");
            }
            Err(e @ CompositeError::NotAvailable(_)) => {
                error!(area = %area.name, product = %def.id, error = %e, "Incorrect product id");
            }
            Err(e) => {
                error!(area = %area.name, product = %def.name, error = %e, "Error on product");
            }
        }
    }

    fn enqueue_dump(
        &mut self,
        dataset: Box<dyn Artifact>,
        dump: &DumpNode,
        mut params: Parameters,
        area: Option<AreaInfo>,
    ) {
        if let Some(time) = dataset.time_slot().or(self.time_slot) {
            params.values.insert("time_slot", time);
        }
        if let Some(value) = area.and_then(|a| serde_json::to_value(a).ok()) {
            params.values.insert("area", ParamValue::from_json(&value));
        }
        self.enqueue(dataset, &dump.outputs, &params);
        info!("Sent dump to writer");
    }

    fn enqueue(&mut self, artifact: Box<dyn Artifact>, outputs: &[OutputSpec], params: &Parameters) {
        if outputs.is_empty() {
            debug!(artifact = %artifact.describe(), "No outputs configured, dropping");
            return;
        }
        self.planner.queue.write(artifact, outputs.to_vec(), params);
        self.report.enqueued += 1;
    }

    fn unload_all(&mut self) {
        let loaded = self.scene.loaded_channels();
        if !loaded.is_empty() {
            self.scene.unload(&loaded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        CompositeRegistry, NoOverpass, RegionCatalog, RegionGeometry, SceneFactory, SolarGeometry,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Untouched {
        scenes: AtomicUsize,
    }

    impl SceneFactory for Untouched {
        fn build(&self, request: &SceneRequest) -> Result<Box<dyn Scene>, SceneError> {
            self.scenes.fetch_add(1, Ordering::SeqCst);
            Err(SceneError {
                platform: request.platform.clone(),
                instrument: request.instrument.clone(),
                reason: "not in this test".into(),
            })
        }
    }

    impl RegionCatalog for Untouched {
        fn region(&self, id: &str) -> Result<Arc<dyn RegionGeometry>, ProjectError> {
            Err(ProjectError::RegionNotFound(id.to_string()))
        }
    }

    impl SolarGeometry for Untouched {
        fn sun_zenith(&self, _time: NaiveDateTime, _lon: f64, _lat: f64) -> f64 {
            0.0
        }
    }

    fn planner() -> (ProductionPlanner, Arc<Untouched>) {
        let untouched = Arc::new(Untouched::default());
        let capabilities = Capabilities {
            scenes: untouched.clone(),
            regions: untouched.clone(),
            overpasses: Arc::new(NoOverpass),
            solar: untouched.clone(),
            composites: Arc::new(CompositeRegistry::new()),
        };
        (ProductionPlanner::new(capabilities, Arc::new(WriteQueue::unbounded())), untouched)
    }

    fn config() -> ProductConfig {
        ProductConfig::from_json(
            r#"{"groups": [{"id": "g", "areas": [{"id": "euron1", "products": [
                {"id": "overview", "files": [{"filename": "a.png"}]}]}]}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_only_incomplete_data_is_retryable() {
        assert!(ProcessError::IncompleteData("x".into()).is_retryable());
        assert!(!ProcessError::UnreachableSource("x".into()).is_retryable());
        assert!(!ProcessError::MissingMetadata("sensor").is_retryable());
    }

    #[test]
    fn test_non_data_message_ignored() {
        let (planner, untouched) = planner();
        let msg = Message::new("/oper", "beat", &json!({})).unwrap();
        let report = planner.run(&config(), &msg).unwrap();
        assert!(report.ignored.is_some());
        assert_eq!(untouched.scenes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_collection_for_other_area_ignored() {
        let (planner, untouched) = planner();
        let msg = Message::new(
            "/oper",
            "collection",
            &json!({
                "collection_area_id": "germ",
                "collection": [{"uri": "/data/a"}],
                "platform_name": "NOAA-19",
                "sensor": "avhrr/3",
            }),
        )
        .unwrap();
        let report = planner.run(&config(), &msg).unwrap();
        assert_eq!(report.ignored.as_deref(), Some("collection for germ"));
        assert_eq!(untouched.scenes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unreachable_source_skipped() {
        let (planner, untouched) = planner();
        let msg = Message::new(
            "/oper",
            "file",
            &json!({"uri": "ssh://elsewhere.invalid/no/such/file", "platform_name": "NOAA-19", "sensor": "avhrr/3"}),
        )
        .unwrap();
        let err = planner.run(&config(), &msg).unwrap_err();
        assert!(matches!(err, ProcessError::UnreachableSource(_)));
        assert_eq!(untouched.scenes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_platform_is_reported() {
        let (planner, untouched) = planner();
        let msg = Message::new("/oper", "file", &json!({"uri": "/data/a", "sensor": "avhrr/3"})).unwrap();
        let err = planner.run(&config(), &msg).unwrap_err();
        assert!(matches!(err, ProcessError::MissingMetadata("platform_name")));
        assert_eq!(untouched.scenes.load(Ordering::SeqCst), 0);
    }
}
