//! Parameter sets and template composition.
//!
//! Every artifact handed to the writer travels with a [`Parameters`] context:
//! the merged global configuration, scene metadata and node attributes, plus
//! the alias table. Output filenames and announcement topics are composed
//! from it with [`compose`].

mod compose;
mod params;

pub use compose::{compose, fields, TemplateError};
pub use params::{parse_time, Aliases, ParamValue, Parameters, Params};
