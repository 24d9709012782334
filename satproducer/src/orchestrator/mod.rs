//! The top-level message loop.
//!
//! The [`Orchestrator`] is the composition root of a running producer. It
//! owns the write queue, the background [`ArtifactWriter`] and the
//! [`ProductionPlanner`], and feeds messages to the planner one at a time:
//!
//! 1. messages that carry no data, or none of the configured sensors, are
//!    ignored;
//! 2. in at-most-once mode a repeat of the last pass is skipped, and the
//!    pass is recorded before processing starts;
//! 3. the product configuration is re-read if its file changed, and every
//!    newly read tree is checked against the registered composites;
//! 4. the planner runs, with one delayed retry if the input data was
//!    incomplete. When the retry fails too, the pass record is put back.
//!
//! No single message can end the loop. Only [`StopHandle::stop`] or a
//! disconnected source does.

mod dedup;

pub use dedup::{PassIdentity, PreviousPass};

use crate::announce::Announcer;
use crate::capability::Capabilities;
use crate::config::ProducerSettings;
use crate::message::{Message, MessageSource, SourceError};
use crate::planner::{ProcessError, ProductionPlanner, RunReport};
use crate::product::{ProductConfig, ProductConfigError, ProductConfigLoader};
use crate::writer::{ArtifactWriter, WriteQueue, WriterOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

/// Requests a cooperative stop of [`Orchestrator::run`].
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// What happened to one message.
#[derive(Debug)]
pub enum MessageOutcome {
    /// Not for this producer.
    Ignored(String),
    /// Same pass as the last one, in at-most-once mode.
    AlreadyProcessed,
    Processed(RunReport),
    /// No product configuration could be loaded.
    NoConfig(ProductConfigError),
    /// Input data still incomplete after the retry; the pass record was
    /// rolled back.
    Abandoned(ProcessError),
    /// Any other processing failure.
    Failed(ProcessError),
}

impl MessageOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, MessageOutcome::Processed(_))
    }
}

pub struct Orchestrator {
    settings: ProducerSettings,
    loader: ProductConfigLoader,
    planner: ProductionPlanner,
    writer: ArtifactWriter,
    previous: PreviousPass,
    stop: StopHandle,
    verified: Option<Arc<ProductConfig>>,
    unknown: Vec<String>,
}

impl Orchestrator {
    /// Build the pipeline and start the writer thread.
    pub fn new(settings: ProducerSettings, capabilities: Capabilities, announcer: Box<dyn Announcer>) -> Self {
        let queue = Arc::new(WriteQueue::new(settings.queue_capacity));
        let writer = ArtifactWriter::start(
            Arc::clone(&queue),
            announcer,
            WriterOptions {
                poll_interval: settings.writer_poll_interval,
                publish_topic: settings.publish_topic.clone(),
                ..Default::default()
            },
        );
        let planner = ProductionPlanner::new(capabilities, queue);
        let loader = ProductConfigLoader::new(&settings.product_config_file);
        info!(instruments = ?settings.instruments, "Producer configured");

        let mut orchestrator = Self {
            settings,
            loader,
            planner,
            writer,
            previous: PreviousPass::default(),
            stop: StopHandle::default(),
            verified: None,
            unknown: Vec::new(),
        };
        if let Err(e) = orchestrator.verify_config() {
            warn!(error = %e, "Product configuration not readable at startup");
        }
        orchestrator
    }

    /// Load the product configuration if it changed and check it against
    /// the composite registry.
    ///
    /// Returns the product ids that have no registered composite.
    pub fn verify_config(&mut self) -> Result<&[String], ProductConfigError> {
        let config = self.loader.get()?;
        self.verify(&config);
        Ok(&self.unknown)
    }

    /// Product ids of the current configuration without a composite.
    pub fn unknown_composites(&self) -> &[String] {
        &self.unknown
    }

    fn verify(&mut self, config: &Arc<ProductConfig>) {
        if self.verified.as_ref().is_some_and(|v| Arc::ptr_eq(v, config)) {
            return;
        }
        self.unknown = config.unknown_composites(&self.planner.capabilities().composites);
        for id in &self.unknown {
            warn!(product = %id, "No composite registered for product, it will not be produced");
        }
        self.verified = Some(Arc::clone(config));
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn settings(&self) -> &ProducerSettings {
        &self.settings
    }

    pub fn previous_pass(&self) -> &PreviousPass {
        &self.previous
    }

    pub fn planner(&self) -> &ProductionPlanner {
        &self.planner
    }

    /// Consume messages from `source` until stopped or the source closes.
    ///
    /// The writer is stopped and joined before this returns.
    pub fn run(&mut self, source: &mut dyn MessageSource) {
        info!("Waiting for messages");
        while !self.stop.is_stopped() {
            match source.recv_timeout(self.settings.receive_timeout) {
                Ok(Some(msg)) => {
                    let outcome = self.process_message(&msg);
                    debug!(outcome = ?outcome, "Message handled");
                }
                Ok(None) => continue,
                Err(SourceError::Disconnected) => {
                    info!("Message source closed");
                    break;
                }
            }
        }
        self.shutdown();
    }

    /// Handle one message synchronously.
    pub fn process_message(&mut self, msg: &Message) -> MessageOutcome {
        debug!(subject = %msg.subject, kind = msg.kind(), "Received message");
        if !msg.carries_data() {
            return MessageOutcome::Ignored(format!("{} message", msg.kind()));
        }
        let sensors = msg.sensors();
        if !self.settings.handles_any(&sensors) {
            debug!(sensors = ?sensors, "No handled instrument in message");
            return MessageOutcome::Ignored(format!("sensors {:?}", sensors));
        }

        let before = match PassIdentity::of(msg) {
            Some(pass) => {
                if self.settings.process_only_once && self.previous.matches(&pass) {
                    info!(platform = %pass.platform_name, start_time = %pass.start_time, "Pass was already processed, skipping");
                    return MessageOutcome::AlreadyProcessed;
                }
                self.previous.record(pass)
            }
            None => {
                info!("Can't check if pass was already processed, processing anyway");
                self.previous.clone()
            }
        };

        let config = match self.loader.get() {
            Ok(config) => {
                self.verify(&config);
                config
            }
            Err(e) => {
                error!(path = %self.loader.path().display(), error = %e, "No usable product configuration");
                self.previous.restore(before);
                return MessageOutcome::NoConfig(e);
            }
        };

        let mut retried = false;
        loop {
            match self.planner.run(&config, msg) {
                Ok(report) => return MessageOutcome::Processed(report),
                Err(e) if e.is_retryable() && !retried => {
                    retried = true;
                    info!(delay = ?self.settings.retry_delay, error = %e, "Retrying once");
                    thread::sleep(self.settings.retry_delay);
                }
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, "Pass record not updated due to missing, corrupted or incomplete data");
                    self.previous.restore(before);
                    return MessageOutcome::Abandoned(e);
                }
                Err(e) => {
                    error!(error = %e, "Message processing failed");
                    return MessageOutcome::Failed(e);
                }
            }
        }
    }

    /// Stop the writer and wait for it.
    pub fn shutdown(&mut self) {
        if self.writer.is_running() {
            self.writer.stop();
        }
        self.writer.join();
        debug!("Producer shut down");
    }
}
