//! Hot-reloading access to the product configuration file.

use super::{ProductConfig, ProductConfigError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Re-reads the product configuration when the file changes.
///
/// The loader is asked for the configuration before every message. It reads
/// the file again only when its modification time moved, and a broken edit
/// never replaces a configuration that loaded successfully.
pub struct ProductConfigLoader {
    path: PathBuf,
    modified: Option<SystemTime>,
    current: Option<Arc<ProductConfig>>,
}

impl ProductConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            modified: None,
            current: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configuration, reloaded if the file changed since the last load.
    pub fn get(&mut self) -> Result<Arc<ProductConfig>, ProductConfigError> {
        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok();
        if let Some(current) = &self.current {
            if modified.is_some() && modified == self.modified {
                return Ok(Arc::clone(current));
            }
        }
        self.reload(modified)
    }

    /// Re-read the file unconditionally.
    pub fn force_reload(&mut self) -> Result<Arc<ProductConfig>, ProductConfigError> {
        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok();
        self.reload(modified)
    }

    fn reload(
        &mut self,
        modified: Option<SystemTime>,
    ) -> Result<Arc<ProductConfig>, ProductConfigError> {
        match ProductConfig::load(&self.path) {
            Ok(config) => {
                let config = Arc::new(config);
                if self.current.is_some() {
                    info!(path = %self.path.display(), "Product configuration reloaded");
                } else {
                    info!(path = %self.path.display(), "Product configuration read");
                }
                debug!(
                    groups = config.groups().len(),
                    areas = config.area_ids().len(),
                    "Product configuration summary"
                );
                self.current = Some(Arc::clone(&config));
                self.modified = modified;
                Ok(config)
            }
            Err(e) => match &self.current {
                Some(previous) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Keeping previous product configuration"
                    );
                    // Remember the broken revision so it is not re-parsed
                    // for every message.
                    self.modified = modified;
                    Ok(Arc::clone(previous))
                }
                None => Err(e),
            },
        }
    }
}
