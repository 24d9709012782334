//! satproducer - message-triggered production of satellite imagery products
//!
//! A producer listens for "new data available" messages, loads the matching
//! instrument scene, and for every configured region checks coverage,
//! reprojects, renders composites and hands the results to a background
//! writer that saves, links and announces the files.
//!
//! # Layout
//!
//! - [`orchestrator`]: the message loop, at-most-once tracking and retry
//! - [`planner`]: per-message walk of the product configuration
//! - [`coverage`]: ground-track and data-driven coverage checks
//! - [`writer`]: the write queue and the artifact writer thread
//! - [`capability`]: traits for scene decoding, regions, orbits and composites
//!
//! ```ignore
//! use satproducer::config::ProducerSettings;
//! use satproducer::orchestrator::Orchestrator;
//!
//! let settings = ProducerSettings::load_from(path, "default")?;
//! let mut producer = Orchestrator::new(settings, capabilities, announcer);
//! producer.run(&mut source);
//! ```

pub mod announce;
pub mod artifact;
pub mod capability;
pub mod config;
pub mod coverage;
pub mod logging;
pub mod message;
pub mod orchestrator;
pub mod planner;
pub mod product;
pub mod template;
pub mod writer;

/// Version of the library and CLI, shared across the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
