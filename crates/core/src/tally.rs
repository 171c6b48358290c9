//! Derived tally views for display layers.
//!
//! Nothing here is stored; every view is recomputed from a [`Poll`] snapshot.

use serde::{Deserialize, Serialize};

use crate::{CandidateId, Poll, PollId};

/// Share of `count` in `total` as a whole percent, rounding halves up.
/// Zero when nothing has been cast.
pub fn percentage(count: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let (count, total) = (count as u128, total as u128);
    ((count * 200 + total) / (total * 2)) as u64
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTally {
    pub id: CandidateId,
    pub name: String,
    pub vote_count: u64,
    pub percentage: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollTally {
    pub poll_id: PollId,
    pub title: String,
    pub active: bool,
    pub total_votes: u64,
    /// Candidate with the strictly greatest count; the earliest wins a tie.
    pub leading: Option<CandidateId>,
    pub candidates: Vec<CandidateTally>,
}

impl PollTally {
    pub fn of(poll: &Poll) -> Self {
        let total_votes = poll.total_votes();

        let leading = poll
            .candidates
            .iter()
            .reduce(|best, c| if c.vote_count > best.vote_count { c } else { best })
            .map(|c| c.id);

        let candidates = poll
            .candidates
            .iter()
            .map(|c| CandidateTally {
                id: c.id,
                name: c.name.clone(),
                vote_count: c.vote_count,
                percentage: percentage(c.vote_count, total_votes),
            })
            .collect();

        Self {
            poll_id: poll.id,
            title: poll.title.clone(),
            active: poll.active,
            total_votes,
            leading,
            candidates,
        }
    }
}

/// Aggregate counters across every poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_polls: u64,
    pub active_polls: u64,
    pub closed_polls: u64,
    pub total_votes: u64,
}

impl DashboardStats {
    pub fn collect(polls: &[Poll]) -> Self {
        polls.iter().fold(Self::default(), |mut stats, poll| {
            stats.total_polls += 1;
            if poll.active {
                stats.active_polls += 1;
            } else {
                stats.closed_polls += 1;
            }
            stats.total_votes += poll.total_votes();
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Candidate, Identity};

    fn poll_with(counts: &[u64]) -> Poll {
        Poll {
            id: 1,
            title: "Poll".into(),
            creator: Identity::new("alice"),
            active: true,
            candidates: counts
                .iter()
                .zip(1..)
                .map(|(&vote_count, id)| Candidate {
                    id,
                    name: format!("C{id}"),
                    vote_count,
                })
                .collect(),
        }
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13); // 12.5
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn leading_prefers_first_on_tie() {
        assert_eq!(PollTally::of(&poll_with(&[3, 5, 5])).leading, Some(2));
        assert_eq!(PollTally::of(&poll_with(&[4, 1, 4])).leading, Some(1));
        assert_eq!(PollTally::of(&poll_with(&[0, 0])).leading, Some(1));
    }

    #[test]
    fn tally_totals() {
        let tally = PollTally::of(&poll_with(&[1, 3]));
        assert_eq!(tally.total_votes, 4);
        let shares: Vec<_> = tally.candidates.iter().map(|c| c.percentage).collect();
        assert_eq!(shares, vec![25, 75]);
    }

    #[test]
    fn stats_split_active_and_closed() {
        let open = poll_with(&[1, 2]);
        let mut closed = poll_with(&[4, 0]);
        closed.active = false;

        let stats = DashboardStats::collect(&[open, closed]);
        assert_eq!(
            stats,
            DashboardStats {
                total_polls: 2,
                active_polls: 1,
                closed_polls: 1,
                total_votes: 7,
            }
        );
    }
}
