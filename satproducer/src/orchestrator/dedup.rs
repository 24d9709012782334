//! At-most-once tracking of processed passes.

use crate::message::Message;
use chrono::NaiveDateTime;

/// Platform and start time of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassIdentity {
    pub platform_name: String,
    pub start_time: NaiveDateTime,
}

impl PassIdentity {
    /// `None` when the message lacks either field.
    pub fn of(msg: &Message) -> Option<Self> {
        Some(Self {
            platform_name: msg.platform_name()?.to_string(),
            start_time: msg.start_time()?,
        })
    }
}

/// The last pass dispatched for processing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviousPass(Option<PassIdentity>);

impl PreviousPass {
    pub fn get(&self) -> Option<&PassIdentity> {
        self.0.as_ref()
    }

    pub fn matches(&self, pass: &PassIdentity) -> bool {
        self.0.as_ref() == Some(pass)
    }

    /// Record `pass`, returning the record it replaces.
    pub fn record(&mut self, pass: PassIdentity) -> PreviousPass {
        PreviousPass(self.0.replace(pass))
    }

    /// Put back a record returned by [`PreviousPass::record`].
    pub fn restore(&mut self, previous: PreviousPass) {
        *self = previous;
    }
}
