//! The queue between production and persistence.

use crate::artifact::Artifact;
use crate::product::OutputSpec;
use crate::template::Parameters;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::warn;

/// One artifact and every output that renders it.
pub struct WorkItem {
    pub artifact: Box<dyn Artifact>,
    pub outputs: Vec<OutputSpec>,
    pub parameters: Parameters,
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("artifact", &self.artifact.describe())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

struct QueueState {
    items: VecDeque<WorkItem>,
    /// Pushed items not yet marked done.
    unfinished: usize,
}

/// FIFO of pending writes with completion tracking.
///
/// Every pushed item must be followed by exactly one [`WriteQueue::task_done`]
/// once it is handled; [`WriteQueue::join`] blocks until that has happened
/// for everything pushed so far.
pub struct WriteQueue {
    state: Mutex<QueueState>,
    capacity: Option<usize>,
    not_empty: Condvar,
    not_full: Condvar,
    all_done: Condvar,
}

impl WriteQueue {
    /// `capacity` bounds the queued items; `None` never blocks producers.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                unfinished: 0,
            }),
            capacity: capacity.map(|c| c.max(1)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            all_done: Condvar::new(),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Enqueue an item, waiting for room if the queue is bounded and full.
    pub fn push(&self, item: WorkItem) {
        let mut state = self.state.lock();
        if let Some(capacity) = self.capacity {
            while state.items.len() >= capacity {
                self.not_full.wait(&mut state);
            }
        }
        state.items.push_back(item);
        state.unfinished += 1;
        self.not_empty.notify_one();
    }

    /// Enqueue `artifact` for `outputs` with a snapshot of `parameters`.
    pub fn write(&self, artifact: Box<dyn Artifact>, outputs: Vec<OutputSpec>, parameters: &Parameters) {
        self.push(WorkItem {
            artifact,
            outputs,
            parameters: parameters.clone(),
        });
    }

    /// Next item, or `None` after `timeout` without one.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<WorkItem> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if self.not_empty.wait_until(&mut state, deadline).timed_out() {
                let item = state.items.pop_front();
                if item.is_some() {
                    self.not_full.notify_one();
                }
                return item;
            }
        }
    }

    /// Mark one popped item as handled.
    pub fn task_done(&self) {
        let mut state = self.state.lock();
        if state.unfinished == 0 {
            warn!("task_done called more times than items were pushed");
            return;
        }
        state.unfinished -= 1;
        if state.unfinished == 0 {
            self.all_done.notify_all();
        }
    }

    /// Block until every pushed item has been marked done.
    pub fn join(&self) {
        let mut state = self.state.lock();
        while state.unfinished > 0 {
            self.all_done.wait(&mut state);
        }
    }

    /// Items waiting to be popped.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items pushed and not yet marked done.
    pub fn unfinished(&self) -> usize {
        self.state.lock().unfinished
    }
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Marks a popped item done when dropped, including on unwind.
pub(super) struct TaskDone<'a>(pub(super) &'a WriteQueue);

impl Drop for TaskDone<'_> {
    fn drop(&mut self) {
        self.0.task_done();
    }
}
