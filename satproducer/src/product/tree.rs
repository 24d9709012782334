//! Immutable product configuration tree.

use super::attributes::Attributes;
use crate::capability::CompositeRegistry;
use crate::template::Aliases;
use std::path::Path;

/// Common view over configuration nodes used when building parameters.
pub trait ConfigNode {
    /// Prefix used for tag-qualified parameter names (`areaname`, `productid`).
    fn tag(&self) -> &'static str;
    fn attributes(&self) -> &Attributes;
}

/// Root processing options, parsed once at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    /// Whether ground-track or generic coverage checks are performed.
    pub check_coverage: bool,
    /// Parallelism passed through to the reprojection capability.
    pub nprocs: usize,
    /// Reprojection method (`nearest`, `bilinear`, ...).
    pub proj_method: String,
    /// Default search radius in metres.
    pub search_radius: Option<u32>,
    /// Keep reprojection mappings for reuse.
    pub precompute: bool,
    pub use_extern_calib: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            check_coverage: true,
            nprocs: 1,
            proj_method: "nearest".to_string(),
            search_radius: None,
            precompute: false,
            use_extern_calib: false,
        }
    }
}

/// One output destination of an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub attrs: Attributes,
    /// Filename template, relative to the output directory.
    pub filename: String,
}

impl OutputSpec {
    pub fn new(filename: impl Into<String>, attrs: Attributes) -> Self {
        Self {
            attrs,
            filename: filename.into(),
        }
    }

    /// Explicit `format` attribute, else the filename extension.
    pub fn format(&self) -> Option<String> {
        self.attrs
            .get("format")
            .map(str::to_string)
            .or_else(|| {
                Path::new(&self.filename)
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
            })
    }
}

/// Pass-through save of all loaded data.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpNode {
    pub attrs: Attributes,
    pub unload_after_saving: bool,
    pub outputs: Vec<OutputSpec>,
}

impl ConfigNode for DumpNode {
    fn tag(&self) -> &'static str {
        "dump"
    }

    fn attributes(&self) -> &Attributes {
        &self.attrs
    }
}

/// Where the solar zenith angle of a product is evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SunZenithLocation {
    /// Pixel column and row.
    Pixel { x: usize, y: usize },
    /// Nearest pixel to a geographic location.
    LonLat { lon: f64, lat: f64 },
    /// Image center.
    Center,
}

/// Day/night gating of a product by solar zenith angle (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunZenithLimits {
    /// Product is skipped when the angle exceeds this (day products).
    pub day_maximum: Option<f64>,
    /// Product is skipped when the angle is below this (night products).
    pub night_minimum: Option<f64>,
    pub location: SunZenithLocation,
}

/// A named composite product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDef {
    pub attrs: Attributes,
    pub id: String,
    pub name: String,
    pub valid_satellites: Vec<String>,
    pub invalid_satellites: Vec<String>,
    pub sun_zenith: Option<SunZenithLimits>,
    pub outputs: Vec<OutputSpec>,
}

impl ProductDef {
    /// Platform gate from the valid/invalid satellite lists.
    pub fn allows_platform(&self, platform: &str) -> bool {
        if !self.valid_satellites.is_empty() && !self.valid_satellites.iter().any(|s| s == platform)
        {
            return false;
        }
        !self.invalid_satellites.iter().any(|s| s == platform)
    }
}

impl ConfigNode for ProductDef {
    fn tag(&self) -> &'static str {
        "product"
    }

    fn attributes(&self) -> &Attributes {
        &self.attrs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProductNode {
    Composite(ProductDef),
    Dump(DumpNode),
}

impl ProductNode {
    pub fn outputs(&self) -> &[OutputSpec] {
        match self {
            ProductNode::Composite(p) => &p.outputs,
            ProductNode::Dump(d) => &d.outputs,
        }
    }

    /// Label used in log messages.
    pub fn label(&self) -> &str {
        match self {
            ProductNode::Composite(p) => &p.name,
            ProductNode::Dump(_) => "dump",
        }
    }

    pub fn node(&self) -> &dyn ConfigNode {
        match self {
            ProductNode::Composite(p) => p,
            ProductNode::Dump(d) => d,
        }
    }
}

/// A target region with its products.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaNode {
    pub attrs: Attributes,
    /// Region identifier understood by the region catalog.
    pub id: String,
    pub name: String,
    /// Minimum coverage in percent; 0 disables coverage checks.
    pub min_coverage: f64,
    pub search_radius: Option<u32>,
    pub products: Vec<ProductNode>,
}

impl ConfigNode for AreaNode {
    fn tag(&self) -> &'static str {
        "area"
    }

    fn attributes(&self) -> &Attributes {
        &self.attrs
    }
}

/// A group of areas loaded and processed together.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub attrs: Attributes,
    pub id: String,
    /// Unload all channels before and after the group.
    pub unload: bool,
    pub resolution: Option<u32>,
    pub search_radius: Option<u32>,
    pub areas: Vec<AreaNode>,
}

impl Group {
    pub fn area_ids(&self) -> Vec<String> {
        self.areas.iter().map(|a| a.id.clone()).collect()
    }
}

impl ConfigNode for Group {
    fn tag(&self) -> &'static str {
        "group"
    }

    fn attributes(&self) -> &Attributes {
        &self.attrs
    }
}

/// The whole product configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductConfig {
    pub(super) attrs: Attributes,
    pub(super) options: ProcessingOptions,
    pub(super) aliases: Aliases,
    pub(super) dump: Option<DumpNode>,
    pub(super) groups: Vec<Group>,
}

impl ProductConfig {
    pub fn new(
        attrs: Attributes,
        options: ProcessingOptions,
        aliases: Aliases,
        dump: Option<DumpNode>,
        groups: Vec<Group>,
    ) -> Self {
        Self {
            attrs,
            options,
            aliases,
            dump,
            groups,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn aliases(&self) -> &Aliases {
        &self.aliases
    }

    /// The top-level dump entry outside any group.
    pub fn dump(&self) -> Option<&DumpNode> {
        self.dump.as_ref()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Every area id declared in any group.
    pub fn area_ids(&self) -> Vec<String> {
        self.groups.iter().flat_map(Group::area_ids).collect()
    }

    /// Product ids with no registered composite, in configuration order.
    pub fn unknown_composites(&self, registry: &CompositeRegistry) -> Vec<String> {
        let mut unknown: Vec<String> = Vec::new();
        let composites = self
            .groups
            .iter()
            .flat_map(|g| &g.areas)
            .flat_map(|a| &a.products)
            .filter_map(|p| match p {
                ProductNode::Composite(def) => Some(&def.id),
                ProductNode::Dump(_) => None,
            });
        for id in composites {
            if !registry.contains(id) && !unknown.contains(id) {
                unknown.push(id.clone());
            }
        }
        unknown
    }
}
