//! CLI command implementations.
//!
//! - [`validate`] - Check settings and the product configuration
//! - [`plan`] - List the files a message would produce

pub mod plan;
pub mod validate;
