//! `satproducer validate`: check a producer's settings and product tree.

use clap::Args;
use satproducer::config::{ProducerSettings, DEFAULT_SECTION};
use satproducer::product::{ProductConfig, ProductNode};
use std::path::PathBuf;
use tracing::debug;

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Producer settings file (INI)
    #[arg(long, short)]
    pub config: PathBuf,

    /// Section of the settings file to use
    #[arg(long, default_value = DEFAULT_SECTION)]
    pub section: String,
}

/// Counts of the product tree.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    groups: usize,
    areas: usize,
    products: usize,
    outputs: usize,
}

fn summarize(config: &ProductConfig) -> Summary {
    let mut summary = Summary {
        groups: config.groups().len(),
        outputs: config.dump().map_or(0, |d| d.outputs.len()),
        ..Default::default()
    };
    for area in config.groups().iter().flat_map(|g| &g.areas) {
        summary.areas += 1;
        summary.products += area.products.len();
        summary.outputs += area.products.iter().map(|p| p.outputs().len()).sum::<usize>();
    }
    summary
}

/// Things that would make a producer silently do nothing.
fn problems(config: &ProductConfig) -> Vec<String> {
    let mut found = Vec::new();
    let default_dir = config.attributes().contains("output_dir");

    if config.groups().is_empty() && config.dump().is_none() {
        found.push("no groups and no dump configured".to_string());
    }
    for group in config.groups() {
        if group.areas.is_empty() {
            found.push(format!("group '{}' has no areas", group.id));
        }
        for area in &group.areas {
            if area.products.is_empty() {
                found.push(format!("area '{}' in group '{}' has no products", area.id, group.id));
            }
            for product in &area.products {
                let label = match product {
                    ProductNode::Composite(def) => def.id.as_str(),
                    ProductNode::Dump(_) => "dump",
                };
                if product.outputs().is_empty() {
                    found.push(format!("product '{}' in area '{}' has no files", label, area.id));
                }
                if !default_dir && product.outputs().iter().any(|o| !o.attrs.contains("output_dir")) {
                    found.push(format!(
                        "product '{}' in area '{}' has files without output_dir and there is no common output_dir",
                        label, area.id
                    ));
                }
            }
        }
    }
    found
}

pub fn run(args: ValidateArgs) -> Result<(), CliError> {
    let settings = ProducerSettings::load_from(&args.config, &args.section)?;
    debug!(settings = ?settings, "Settings loaded");
    println!("Settings:        {} [{}]", args.config.display(), args.section);
    println!("  Instruments:   {}", settings.instruments.join(", "));
    println!("  Topics:        {}", settings.topics.join(", "));
    println!("  Only once:     {}", settings.process_only_once);
    if let Some(topic) = &settings.publish_topic {
        println!("  Publish topic: {}", topic);
    }

    let config = ProductConfig::load(&settings.product_config_file)?;
    let summary = summarize(&config);
    println!("Products:        {}", settings.product_config_file.display());
    println!("  Groups:        {}", summary.groups);
    println!("  Areas:         {}", summary.areas);
    println!("  Products:      {}", summary.products);
    println!("  Files:         {}", summary.outputs);
    println!("  Coverage:      {}", if config.options().check_coverage { "checked" } else { "not checked" });

    let found = problems(&config);
    if found.is_empty() {
        println!();
        println!("Configuration OK");
        return Ok(());
    }
    println!();
    for problem in &found {
        println!("  - {}", problem);
    }
    Err(CliError::Invalid(found.len()))
}
