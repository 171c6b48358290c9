//! The poll registry: owns every poll, candidate tally and ballot marker, and
//! applies operations one at a time.
//!
//! Each mutating operation validates all of its preconditions before touching
//! state, so a rejected operation leaves the registry exactly as it was.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::config::{Limits, MIN_CANDIDATES};
use crate::{
    Candidate, CandidateId, Error, Event, Hash, Identity, LedgerConfig, Outcome, Poll, PollId,
    Result,
};

/// A state-changing operation, as carried by transactions and scripts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreatePoll {
        title: String,
        candidates: Vec<String>,
    },
    Vote {
        poll_id: PollId,
        candidate_id: CandidateId,
    },
    ClosePoll {
        poll_id: PollId,
    },
}

/// What an accepted operation returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Output {
    PollCreated { poll_id: PollId },
    Ack,
}

/// Everything that is hashed into the state root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct RegistryState {
    /// Poll `n` lives at index `n - 1`.
    polls: Vec<Poll>,

    /// Identities with an accepted vote, per poll.
    ballots: BTreeMap<PollId, BTreeSet<Identity>>,
}

/// The poll registry and ballot engine.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    config: LedgerConfig,
    state: RegistryState,
}

impl Registry {
    /// An empty registry. Fails with [`Error::Config`] if the limits are unusable.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: RegistryState::default(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Apply one operation on behalf of `caller`.
    pub fn execute(&mut self, caller: &Identity, operation: &Operation) -> Result<Outcome<Output>> {
        match operation {
            Operation::CreatePoll { title, candidates } => self
                .create_poll(title, candidates, caller)
                .map(|o| o.map(|poll_id| Output::PollCreated { poll_id })),
            Operation::Vote {
                poll_id,
                candidate_id,
            } => self
                .vote(*poll_id, *candidate_id, caller)
                .map(|o| o.map(|()| Output::Ack)),
            Operation::ClosePoll { poll_id } => self
                .close_poll(*poll_id, caller)
                .map(|o| o.map(|()| Output::Ack)),
        }
    }

    /// Create a poll with candidates numbered 1..N in the given order.
    pub fn create_poll(
        &mut self,
        title: &str,
        candidates: &[String],
        creator: &Identity,
    ) -> Result<Outcome<PollId>> {
        validate_new_poll(&self.config.limits, title, candidates)
            .inspect_err(|e| debug!(%creator, category = e.category(), "create_poll rejected: {e}"))?;

        let poll_id = self.state.polls.len() as PollId + 1;
        let poll = Poll::new(poll_id, title.to_string(), creator.clone(), candidates.to_vec());

        self.state.ballots.insert(poll_id, BTreeSet::new());
        self.state.polls.push(poll);

        info!(poll_id, %creator, candidates = candidates.len(), "poll created");

        Ok(Outcome::new(
            poll_id,
            Event::PollCreated {
                poll_id,
                title: title.to_string(),
            },
        ))
    }

    /// Record one vote. The tally increment and the ballot marker land together.
    pub fn vote(
        &mut self,
        poll_id: PollId,
        candidate_id: CandidateId,
        voter: &Identity,
    ) -> Result<Outcome<()>> {
        self.check_vote(poll_id, candidate_id, voter)
            .inspect_err(|e| debug!(poll_id, candidate_id, %voter, category = e.category(), "vote rejected: {e}"))?;

        let index = poll_index(poll_id).ok_or(Error::PollNotFound(poll_id))?;
        let candidate = self.state.polls[index]
            .candidate_mut(candidate_id)
            .ok_or(Error::CandidateNotFound {
                poll_id,
                candidate_id,
            })?;
        let new_count = candidate
            .vote_count
            .checked_add(1)
            .ok_or_else(|| Error::invalid_argument("vote count overflow"))?;

        // Nothing below can fail.
        candidate.vote_count = new_count;
        self.state
            .ballots
            .entry(poll_id)
            .or_default()
            .insert(voter.clone());

        info!(poll_id, candidate_id, %voter, "vote recorded");

        Ok(Outcome::new(
            (),
            Event::Voted {
                poll_id,
                voter: voter.clone(),
                candidate_id,
            },
        ))
    }

    fn check_vote(&self, poll_id: PollId, candidate_id: CandidateId, voter: &Identity) -> Result<()> {
        let poll = self.poll(poll_id)?;

        if !poll.active {
            return Err(Error::PollClosed(poll_id));
        }

        if candidate_id == 0 || candidate_id > poll.candidate_count() {
            return Err(Error::invalid_argument(format!(
                "candidate {} out of range 1..={} for poll {}",
                candidate_id,
                poll.candidate_count(),
                poll_id
            )));
        }

        if self.voted(poll_id, voter) {
            return Err(Error::AlreadyVoted {
                poll_id,
                voter: voter.clone(),
            });
        }

        Ok(())
    }

    /// Close a poll. Allowed for its creator and for configured admins.
    pub fn close_poll(&mut self, poll_id: PollId, caller: &Identity) -> Result<Outcome<()>> {
        self.check_close(poll_id, caller)
            .inspect_err(|e| debug!(poll_id, %caller, category = e.category(), "close_poll rejected: {e}"))?;

        let index = poll_index(poll_id).ok_or(Error::PollNotFound(poll_id))?;
        self.state.polls[index].active = false;

        info!(poll_id, %caller, "poll closed");

        Ok(Outcome::silent(()))
    }

    fn check_close(&self, poll_id: PollId, caller: &Identity) -> Result<()> {
        let poll = self.poll(poll_id)?;

        if &poll.creator != caller && !self.config.is_admin(caller) {
            return Err(Error::Unauthorized {
                poll_id,
                caller: caller.clone(),
            });
        }

        if !poll.active {
            return Err(Error::AlreadyClosed(poll_id));
        }

        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn poll(&self, poll_id: PollId) -> Result<&Poll> {
        poll_index(poll_id)
            .and_then(|i| self.state.polls.get(i))
            .ok_or(Error::PollNotFound(poll_id))
    }

    pub fn candidate(&self, poll_id: PollId, candidate_id: CandidateId) -> Result<&Candidate> {
        self.poll(poll_id)?
            .candidate(candidate_id)
            .ok_or(Error::CandidateNotFound {
                poll_id,
                candidate_id,
            })
    }

    pub fn candidate_count(&self, poll_id: PollId) -> Result<u32> {
        Ok(self.poll(poll_id)?.candidate_count())
    }

    pub fn candidates(&self, poll_id: PollId) -> Result<&[Candidate]> {
        Ok(&self.poll(poll_id)?.candidates)
    }

    /// Every poll in id order.
    pub fn polls(&self) -> &[Poll] {
        &self.state.polls
    }

    /// An owned snapshot of every poll with its tallies. Later operations do
    /// not affect it.
    pub fn all_polls(&self) -> Vec<Poll> {
        self.state.polls.clone()
    }

    pub fn polls_count(&self) -> u64 {
        self.state.polls.len() as u64
    }

    pub fn has_voted(&self, poll_id: PollId, identity: &Identity) -> Result<bool> {
        self.poll(poll_id)?;
        Ok(self.voted(poll_id, identity))
    }

    /// Number of identities with an accepted vote in the poll.
    pub fn voter_count(&self, poll_id: PollId) -> Result<u64> {
        self.poll(poll_id)?;
        Ok(self
            .state
            .ballots
            .get(&poll_id)
            .map_or(0, |voters| voters.len() as u64))
    }

    fn voted(&self, poll_id: PollId, identity: &Identity) -> bool {
        self.state
            .ballots
            .get(&poll_id)
            .is_some_and(|voters| voters.contains(identity))
    }

    /// Content hash over the configuration and all polls, tallies and ballot
    /// markers. Two registries share a root only if they enforce the same rules.
    pub fn state_root(&self) -> Result<Hash> {
        Hash::of_value(&(&self.config, &self.state))
    }
}

fn poll_index(poll_id: PollId) -> Option<usize> {
    usize::try_from(poll_id).ok()?.checked_sub(1)
}

fn validate_new_poll(limits: &Limits, title: &str, candidates: &[String]) -> Result<()> {
    let title_len = title.trim().chars().count();
    if title_len == 0 {
        return Err(Error::invalid_argument("title is empty"));
    }
    if title_len < limits.min_title_len {
        return Err(Error::invalid_argument(format!(
            "title shorter than {} characters",
            limits.min_title_len
        )));
    }
    if title_len > limits.max_title_len {
        return Err(Error::invalid_argument(format!(
            "title longer than {} characters",
            limits.max_title_len
        )));
    }

    let min_candidates = limits.min_candidates.max(MIN_CANDIDATES);
    if candidates.len() < min_candidates {
        return Err(Error::invalid_argument(format!(
            "at least {} candidates required, got {}",
            min_candidates,
            candidates.len()
        )));
    }
    if candidates.len() > limits.max_candidates {
        return Err(Error::invalid_argument(format!(
            "at most {} candidates allowed, got {}",
            limits.max_candidates,
            candidates.len()
        )));
    }

    let mut seen = BTreeSet::new();
    for name in candidates {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_argument("candidate name is empty"));
        }
        if trimmed.chars().count() > limits.max_candidate_name_len {
            return Err(Error::invalid_argument(format!(
                "candidate name longer than {} characters",
                limits.max_candidate_name_len
            )));
        }
        if !seen.insert(trimmed.to_lowercase()) {
            return Err(Error::invalid_argument(format!(
                "duplicate candidate name: {trimmed}"
            )));
        }
    }

    Ok(())
}
