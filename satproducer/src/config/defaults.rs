//! Default values for producer settings.

use std::path::PathBuf;
use std::time::Duration;

use super::settings::ProducerSettings;

/// Section read when none is named.
pub const DEFAULT_SECTION: &str = "default";

/// Pause before the single retry of a message whose data was incomplete.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// How long the message loop waits for a message before checking for stop.
pub const DEFAULT_RECEIVE_TIMEOUT_SECS: u64 = 5;

/// How long the writer waits on an empty queue before checking for stop.
pub const DEFAULT_WRITER_POLL_MS: u64 = 1000;

/// Sender name on published announcements.
pub const DEFAULT_SENDER: &str = "satproducer";

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            instruments: Vec::new(),
            product_config_file: PathBuf::new(),
            process_only_once: false,
            publish_topic: None,
            topics: Vec::new(),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            receive_timeout: Duration::from_secs(DEFAULT_RECEIVE_TIMEOUT_SECS),
            writer_poll_interval: Duration::from_millis(DEFAULT_WRITER_POLL_MS),
            queue_capacity: None,
            sender: DEFAULT_SENDER.to_string(),
        }
    }
}
