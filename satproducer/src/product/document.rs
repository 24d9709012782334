//! JSON document layout of the product configuration and its conversion
//! into the typed tree.

use super::attributes::Attributes;
use super::tree::{
    AreaNode, DumpNode, Group, OutputSpec, ProcessingOptions, ProductConfig, ProductDef,
    ProductNode, SunZenithLimits, SunZenithLocation,
};
use super::ProductConfigError;
use crate::template::Aliases;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

type RawAttrs = BTreeMap<String, Value>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawConfig {
    #[serde(default)]
    common: RawAttrs,
    #[serde(default)]
    aliases: Aliases,
    #[serde(default)]
    dump: Option<RawDump>,
    #[serde(default)]
    groups: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    #[serde(default)]
    areas: Vec<RawArea>,
    #[serde(flatten)]
    attrs: RawAttrs,
}

#[derive(Debug, Deserialize)]
struct RawArea {
    #[serde(default)]
    products: Vec<RawProduct>,
    #[serde(flatten)]
    attrs: RawAttrs,
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    #[serde(default)]
    files: Vec<RawFile>,
    #[serde(flatten)]
    attrs: RawAttrs,
}

#[derive(Debug, Deserialize)]
struct RawDump {
    #[serde(default)]
    files: Vec<RawFile>,
    #[serde(flatten)]
    attrs: RawAttrs,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    filename: String,
    #[serde(flatten)]
    attrs: RawAttrs,
}

/// Normalize scalar JSON values to strings.
fn normalize(raw: RawAttrs, node: &str) -> Result<Attributes, ProductConfigError> {
    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(ProductConfigError::InvalidAttribute {
                        node: node.to_string(),
                        key,
                        value: other.to_string(),
                        reason: "attribute values must be strings, numbers or booleans"
                            .to_string(),
                    })
                }
            };
            Ok((key, text))
        })
        .collect()
}

fn parsed<T: FromStr>(
    attrs: &Attributes,
    node: &str,
    key: &str,
    reason: &str,
) -> Result<Option<T>, ProductConfigError> {
    attrs
        .get_parsed::<T>(key)
        .map_err(|value| ProductConfigError::InvalidAttribute {
            node: node.to_string(),
            key: key.to_string(),
            value,
            reason: reason.to_string(),
        })
}

fn pair<T: FromStr>(
    attrs: &Attributes,
    node: &str,
    key: &str,
) -> Result<Option<(T, T)>, ProductConfigError> {
    let Some(raw) = attrs.get(key) else {
        return Ok(None);
    };
    let invalid = || ProductConfigError::InvalidAttribute {
        node: node.to_string(),
        key: key.to_string(),
        value: raw.to_string(),
        reason: "expected two comma separated numbers".to_string(),
    };
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(invalid());
    }
    let a = parts[0].parse::<T>().map_err(|_| invalid())?;
    let b = parts[1].parse::<T>().map_err(|_| invalid())?;
    Ok(Some((a, b)))
}

fn convert_files(files: Vec<RawFile>, node: &str) -> Result<Vec<OutputSpec>, ProductConfigError> {
    files
        .into_iter()
        .map(|file| {
            let attrs = normalize(file.attrs, node)?;
            parsed::<u8>(&attrs, node, "compression", "must be an integer from 0 to 9")?;
            if let Some(size) = attrs.get("thumbnail_size") {
                if parse_thumbnail_size(size).is_none() {
                    return Err(ProductConfigError::InvalidAttribute {
                        node: node.to_string(),
                        key: "thumbnail_size".to_string(),
                        value: size.to_string(),
                        reason: "expected WIDTHxHEIGHT".to_string(),
                    });
                }
            }
            Ok(OutputSpec::new(file.filename, attrs))
        })
        .collect()
}

/// Parse `WIDTHxHEIGHT`.
pub fn parse_thumbnail_size(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

fn convert_dump(raw: RawDump, node: &str) -> Result<DumpNode, ProductConfigError> {
    let attrs = normalize(raw.attrs, node)?;
    Ok(DumpNode {
        unload_after_saving: attrs.get_bool("unload_after_saving", false),
        outputs: convert_files(raw.files, node)?,
        attrs,
    })
}

fn convert_product(raw: RawProduct, area: &str) -> Result<ProductNode, ProductConfigError> {
    let is_dump = matches!(raw.attrs.get("dump"), Some(Value::Bool(true)))
        || matches!(raw.attrs.get("dump"), Some(Value::String(s)) if super::attributes::parse_bool(s));
    if is_dump {
        let node = format!("{}/dump", area);
        return convert_dump(
            RawDump {
                files: raw.files,
                attrs: raw.attrs,
            },
            &node,
        )
        .map(ProductNode::Dump);
    }

    let attrs = normalize(raw.attrs, area)?;
    let id = attrs
        .get("id")
        .ok_or_else(|| ProductConfigError::MissingAttribute {
            node: format!("{}/product", area),
            key: "id".to_string(),
        })?
        .to_string();
    let node = format!("{}/{}", area, id);
    let name = attrs.get_or("name", &id).to_string();

    let day_maximum = parsed::<f64>(&attrs, &node, "sunzen_day_maximum", "must be a number")?;
    let night_minimum = parsed::<f64>(&attrs, &node, "sunzen_night_minimum", "must be a number")?;
    let sun_zenith = if day_maximum.is_some() || night_minimum.is_some() {
        let location = if let Some((x, y)) = pair::<usize>(&attrs, &node, "sunzen_xy_loc")? {
            SunZenithLocation::Pixel { x, y }
        } else if let Some((lon, lat)) = pair::<f64>(&attrs, &node, "sunzen_lonlat")? {
            SunZenithLocation::LonLat { lon, lat }
        } else {
            SunZenithLocation::Center
        };
        Some(SunZenithLimits {
            day_maximum,
            night_minimum,
            location,
        })
    } else {
        None
    };

    Ok(ProductNode::Composite(ProductDef {
        valid_satellites: attrs.get_list("valid_satellite"),
        invalid_satellites: attrs.get_list("invalid_satellite"),
        outputs: convert_files(raw.files, &node)?,
        sun_zenith,
        id,
        name,
        attrs,
    }))
}

fn convert_area(raw: RawArea, group: &str) -> Result<AreaNode, ProductConfigError> {
    let attrs = normalize(raw.attrs, group)?;
    let id = attrs
        .get("id")
        .ok_or_else(|| ProductConfigError::MissingAttribute {
            node: format!("{}/area", group),
            key: "id".to_string(),
        })?
        .to_string();
    let node = format!("{}/{}", group, id);
    let min_coverage =
        parsed::<f64>(&attrs, &node, "min_coverage", "must be a percentage")?.unwrap_or(0.0);
    if !(0.0..=100.0).contains(&min_coverage) {
        return Err(ProductConfigError::InvalidAttribute {
            node,
            key: "min_coverage".to_string(),
            value: min_coverage.to_string(),
            reason: "must be between 0 and 100".to_string(),
        });
    }
    let search_radius = parsed::<u32>(&attrs, &node, "srch_radius", "must be a positive integer")?;
    let products = raw
        .products
        .into_iter()
        .map(|p| convert_product(p, &node))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AreaNode {
        name: attrs.get_or("name", &id).to_string(),
        id,
        min_coverage,
        search_radius,
        products,
        attrs,
    })
}

fn convert_group(raw: RawGroup, index: usize) -> Result<Group, ProductConfigError> {
    let attrs = normalize(raw.attrs, "group")?;
    let id = attrs
        .get("id")
        .map(str::to_string)
        .unwrap_or_else(|| format!("group{}", index));
    let resolution = parsed::<u32>(&attrs, &id, "resolution", "must be a positive integer")?;
    let search_radius = parsed::<u32>(&attrs, &id, "srch_radius", "must be a positive integer")?;
    let areas = raw
        .areas
        .into_iter()
        .map(|a| convert_area(a, &id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Group {
        unload: attrs.get_bool("unload", false),
        resolution,
        search_radius,
        areas,
        id,
        attrs,
    })
}

impl RawConfig {
    pub(super) fn into_config(self) -> Result<ProductConfig, ProductConfigError> {
        let attrs = normalize(self.common, "common")?;
        let options = ProcessingOptions {
            check_coverage: attrs.get_bool("check_coverage", true),
            nprocs: parsed::<usize>(&attrs, "common", "nprocs", "must be a positive integer")?
                .unwrap_or(1)
                .max(1),
            proj_method: attrs.get_or("proj_method", "nearest").to_string(),
            search_radius: parsed::<u32>(
                &attrs,
                "common",
                "srch_radius",
                "must be a positive integer",
            )?,
            precompute: attrs.get_bool("precompute", false),
            use_extern_calib: attrs.get_bool("use_extern_calib", false),
        };
        let dump = self
            .dump
            .map(|d| convert_dump(d, "dump"))
            .transpose()?;
        let groups = self
            .groups
            .into_iter()
            .enumerate()
            .map(|(i, g)| convert_group(g, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProductConfig::new(attrs, options, self.aliases, dump, groups))
    }
}
