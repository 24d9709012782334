//! Producer settings.

use std::path::PathBuf;
use std::time::Duration;

/// Settings of one producer instance, read from a section of the INI file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerSettings {
    /// Sensors this producer handles; other messages are ignored.
    pub instruments: Vec<String>,
    /// Product configuration (JSON) path.
    pub product_config_file: PathBuf,
    /// Skip messages for a pass that was already processed.
    pub process_only_once: bool,
    /// Subject template for announcements.
    pub publish_topic: Option<String>,
    /// Inbound subscription topics.
    pub topics: Vec<String>,
    pub retry_delay: Duration,
    pub receive_timeout: Duration,
    pub writer_poll_interval: Duration,
    /// Bound on queued write batches; `None` for unbounded.
    pub queue_capacity: Option<usize>,
    pub sender: String,
}

impl ProducerSettings {
    pub fn new(instruments: Vec<String>, product_config_file: impl Into<PathBuf>) -> Self {
        Self {
            instruments,
            product_config_file: product_config_file.into(),
            ..Self::default()
        }
    }

    /// Whether any of `sensors` is handled by this producer.
    pub fn handles_any(&self, sensors: &[String]) -> bool {
        sensors.iter().any(|s| self.instruments.contains(s))
    }
}
