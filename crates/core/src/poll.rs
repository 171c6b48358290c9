//! Poll and candidate records.

use serde::{Deserialize, Serialize};

use crate::Identity;

/// Poll identifier. Assigned densely from 1; 0 never names a poll.
pub type PollId = u64;

/// Candidate identifier, 1-based within its poll; 0 never names a candidate.
pub type CandidateId = u32;

/// A poll and its candidates.
///
/// Only `active` and the candidates' `vote_count` change after creation, and
/// only through the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    pub creator: Identity,
    pub active: bool,
    pub candidates: Vec<Candidate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub vote_count: u64,
}

impl Poll {
    pub(crate) fn new(id: PollId, title: String, creator: Identity, names: Vec<String>) -> Self {
        let candidates = names
            .into_iter()
            .zip(1..)
            .map(|(name, id)| Candidate {
                id,
                name,
                vote_count: 0,
            })
            .collect();

        Self {
            id,
            title,
            creator,
            active: true,
            candidates,
        }
    }

    /// Saturates at `CandidateId::MAX`; validated limits keep real polls far below it.
    pub fn candidate_count(&self) -> u32 {
        CandidateId::try_from(self.candidates.len()).unwrap_or(CandidateId::MAX)
    }

    /// Look up a candidate by its 1-based id.
    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        let index = (id as usize).checked_sub(1)?;
        self.candidates.get(index)
    }

    pub(crate) fn candidate_mut(&mut self, id: CandidateId) -> Option<&mut Candidate> {
        let index = (id as usize).checked_sub(1)?;
        self.candidates.get_mut(index)
    }

    pub fn total_votes(&self) -> u64 {
        self.candidates.iter().map(|c| c.vote_count).sum()
    }
}
