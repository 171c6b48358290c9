//! Notifications emitted by accepted operations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CandidateId, Identity, PollId};

/// An observer-facing notification. The field sets are part of the external
/// contract and must not change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    PollCreated {
        poll_id: PollId,
        title: String,
    },
    Voted {
        poll_id: PollId,
        voter: Identity,
        candidate_id: CandidateId,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::PollCreated { poll_id, title } => write!(f, "PollCreated({poll_id}, {title:?})"),
            Event::Voted {
                poll_id,
                voter,
                candidate_id,
            } => write!(f, "Voted({poll_id}, {voter}, {candidate_id})"),
        }
    }
}

/// The result of an accepted operation together with the events it emitted,
/// in emission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value: T,
    pub events: Vec<Event>,
}

impl<T> Outcome<T> {
    pub(crate) fn new(value: T, event: Event) -> Self {
        Self {
            value,
            events: vec![event],
        }
    }

    pub(crate) fn silent(value: T) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            events: self.events,
        }
    }
}
