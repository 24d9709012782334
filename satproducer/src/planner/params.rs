//! Filename parameters of configuration nodes.

use crate::product::{ConfigNode, ProductConfig};
use crate::template::{Parameters, Params};

/// Substitution context for outputs under `node`.
///
/// Later sources win: common attributes, then scene metadata, then the
/// node's attributes both tag-prefixed (`areaname`) and as-is (`name`).
pub fn node_parameters(config: &ProductConfig, info: &Params, node: &dyn ConfigNode) -> Parameters {
    let mut values = config.attributes().to_params();
    values.extend(info);
    let tag = node.tag();
    for (key, value) in node.attributes().iter() {
        values.insert(format!("{tag}{key}"), value);
    }
    values.extend(&node.attributes().to_params());
    Parameters::new(values, config.aliases().clone())
}

/// `base` overlaid with the parameters of `node`, leaving `base` untouched.
pub fn overlay_parameters(
    base: &Parameters,
    config: &ProductConfig,
    info: &Params,
    node: &dyn ConfigNode,
) -> Parameters {
    let mut merged = base.clone();
    merged.values.extend(&node_parameters(config, info, node).values);
    merged
}
