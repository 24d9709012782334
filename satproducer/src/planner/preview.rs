//! Dry-run listing of what a message would produce.

use super::params::{node_parameters, overlay_parameters};
use crate::message::Message;
use crate::product::{OutputSpec, ProductConfig, ProductNode};
use crate::template::{Parameters, Params};
use crate::writer::{output_path, WriteError};
use std::path::PathBuf;

/// A product the message is eligible for.
#[derive(Debug)]
pub struct PlannedProduct {
    /// `None` for the top-level dump.
    pub group: Option<String>,
    pub area: Option<String>,
    pub product: String,
    /// Composed destination of each output spec.
    pub outputs: Vec<Result<PathBuf, WriteError>>,
}

/// Walk `config` for `msg` without touching any scene.
///
/// Collection and platform filters apply. Coverage and sun angle need pixel
/// data and are not evaluated, so the listing is an upper bound.
pub fn preview(config: &ProductConfig, msg: &Message) -> Vec<PlannedProduct> {
    let mut planned = Vec::new();
    if !msg.carries_data() {
        return planned;
    }
    let collection_area = msg.collection_area_id();
    if collection_area.is_some_and(|id| !config.area_ids().iter().any(|a| a == id)) {
        return planned;
    }

    let mut info = msg.metadata.clone();
    if let Some(time) = msg.time_slot() {
        info.insert("time", time);
    }
    let platform = msg.platform_name().unwrap_or_default();

    if let Some(dump) = config.dump() {
        let mut params = node_parameters(config, &info, dump);
        if let Some(time) = msg.time_slot() {
            params.values.insert("time_slot", time);
        }
        planned.push(PlannedProduct {
            group: None,
            area: None,
            product: "dump".to_string(),
            outputs: paths(&dump.outputs, &params),
        });
    }

    for group in config.groups() {
        if collection_area.is_some_and(|id| !group.area_ids().iter().any(|a| a == id)) {
            continue;
        }
        for area in &group.areas {
            let base = node_parameters(config, &info, area);
            for product in &area.products {
                if let ProductNode::Composite(def) = product {
                    if !def.allows_platform(platform) {
                        continue;
                    }
                }
                let mut params = overlay_parameters(&base, config, &info, product.node());
                if let ProductNode::Dump(_) = product {
                    if let Some(time) = msg.time_slot() {
                        params.values.insert("time_slot", time);
                    }
                }
                planned.push(PlannedProduct {
                    group: Some(group.id.clone()),
                    area: Some(area.id.clone()),
                    product: product.label().to_string(),
                    outputs: paths(product.outputs(), &params),
                });
            }
        }
    }
    planned
}

fn paths(outputs: &[OutputSpec], params: &Parameters) -> Vec<Result<PathBuf, WriteError>> {
    let resolved: Params = params.resolve_aliases();
    outputs.iter().map(|spec| output_path(spec, &resolved)).collect()
}
