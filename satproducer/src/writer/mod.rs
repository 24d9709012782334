//! Asynchronous persistence of produced artifacts.
//!
//! The production path hands finished artifacts to a [`WriteQueue`] and moves
//! on. A single [`ArtifactWriter`] thread drains the queue: outputs of one
//! artifact that would render identically are encoded once and hard-linked
//! (or copied) to their other destinations, every file is written through a
//! private temporary file and renamed into place, and each placed file is
//! announced.
//!
//! The queue's completion tracking is the barrier the planner waits on before
//! releasing a message's scene.

mod placement;
mod queue;
mod worker;

pub use placement::{default_mode, encode_into, link_or_copy, Placement};
pub use queue::{WorkItem, WriteQueue};
pub use worker::{output_path, ArtifactWriter, BatchReport, BatchWriter, WriterOptions};

use crate::artifact::ArtifactError;
use crate::template::TemplateError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Writer failures.
///
/// `Encode`, `Io` and `LinkOrCopy` abandon a single output; the others abort
/// the rest of the batch.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("no output directory configured for '{0}'")]
    NoOutputDir(String),

    #[error("cannot compose output path: {0}")]
    Template(#[from] TemplateError),

    #[error("failed to encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: ArtifactError,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot link or copy {} to {}: {source}", .src.display(), .dst.display())]
    LinkOrCopy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("overlay failed: {0}")]
    Overlay(#[source] ArtifactError),
}
