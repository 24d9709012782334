//! Message sources for the orchestrator loop.

use super::Message;
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// No more messages will arrive.
    #[error("message source disconnected")]
    Disconnected,
}

/// A blocking inbound message stream.
pub trait MessageSource {
    /// Wait up to `timeout` for the next message; `Ok(None)` on timeout.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>, SourceError>;
}

impl MessageSource for Receiver<Message> {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>, SourceError> {
        match Receiver::recv_timeout(self, timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SourceError::Disconnected),
        }
    }
}

/// Messages decoded from lines of a reader, on a background thread.
///
/// Lines that do not decode are logged and dropped. The source disconnects
/// at end of input.
///
/// For embedding: a deployment feeds it the read end of its bus link and
/// hands it to [`Orchestrator::run`](crate::orchestrator::Orchestrator::run),
/// usually with a [`LineAnnouncer`](crate::announce::LineAnnouncer) on the
/// publishing side.
pub struct LineSource {
    receiver: Receiver<Message>,
    handle: Option<JoinHandle<()>>,
}

impl LineSource {
    pub fn spawn<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("message-reader".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!(error = %e, "Message input failed");
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match Message::decode(&line) {
                        Ok(msg) => {
                            if sender.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Dropping undecodable message"),
                    }
                }
                debug!("Message input closed");
            })
            .expect("Failed to spawn message reader thread");

        Self {
            receiver,
            handle: Some(handle),
        }
    }
}

impl MessageSource for LineSource {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>, SourceError> {
        let result = self.receiver.recv_timeout(timeout);
        if matches!(result, Err(RecvTimeoutError::Disconnected)) {
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
        match result {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SourceError::Disconnected),
        }
    }
}
