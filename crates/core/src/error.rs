//! Error types for ezpoll-core.

use thiserror::Error;

use crate::{CandidateId, Hash, Identity, PollId};

/// Core errors.
///
/// Every rejected operation maps to exactly one variant, and no variant is
/// produced after state has been touched.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: bad title, bad candidate list, out-of-range candidate id.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown poll.
    #[error("poll {0} not found")]
    PollNotFound(PollId),

    /// Unknown candidate within a known poll.
    #[error("candidate {candidate_id} not found in poll {poll_id}")]
    CandidateNotFound {
        poll_id: PollId,
        candidate_id: CandidateId,
    },

    /// Vote attempted on a closed poll.
    #[error("poll {0} is closed")]
    PollClosed(PollId),

    /// The identity already has an accepted vote in this poll.
    #[error("{voter} already voted in poll {poll_id}")]
    AlreadyVoted { poll_id: PollId, voter: Identity },

    /// Close attempted on a poll that is already closed.
    #[error("poll {0} is already closed")]
    AlreadyClosed(PollId),

    /// Caller may not close this poll.
    #[error("{caller} is not allowed to close poll {poll_id}")]
    Unauthorized { poll_id: PollId, caller: Identity },

    /// Transaction signature does not verify against its sender key.
    #[error("invalid signature on transaction {0}")]
    InvalidSignature(Hash),

    /// Transaction nonce is not the sender's next nonce (replayed or out of order).
    #[error("nonce mismatch for {sender}: expected {expected}, got {got}")]
    NonceMismatch {
        sender: Identity,
        expected: u64,
        got: u64,
    },

    /// The journal hash chain or a recorded state root does not check out.
    #[error("journal corrupted at entry {sequence}: {reason}")]
    JournalCorrupted { sequence: u64, reason: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Copyable error discriminant for callers that branch on the failure kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    PollClosed,
    AlreadyVoted,
    AlreadyClosed,
    Unauthorized,
    InvalidSignature,
    NonceMismatch,
    JournalCorrupted,
    Serialization,
    Config,
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::PollNotFound(_) | Self::CandidateNotFound { .. } => ErrorKind::NotFound,
            Self::PollClosed(_) => ErrorKind::PollClosed,
            Self::AlreadyVoted { .. } => ErrorKind::AlreadyVoted,
            Self::AlreadyClosed(_) => ErrorKind::AlreadyClosed,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidSignature(_) => ErrorKind::InvalidSignature,
            Self::NonceMismatch { .. } => ErrorKind::NonceMismatch,
            Self::JournalCorrupted { .. } => ErrorKind::JournalCorrupted,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Get the error category for logging.
    pub fn category(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PollClosed => "poll_closed",
            ErrorKind::AlreadyVoted => "already_voted",
            ErrorKind::AlreadyClosed => "already_closed",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidSignature => "invalid_signature",
            ErrorKind::NonceMismatch => "nonce_mismatch",
            ErrorKind::JournalCorrupted => "journal_corrupted",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Config => "config",
        }
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(e: ciborium::ser::Error<std::io::Error>) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_kinds_collapse() {
        let poll = Error::PollNotFound(7);
        let candidate = Error::CandidateNotFound {
            poll_id: 1,
            candidate_id: 3,
        };
        assert_eq!(poll.kind(), ErrorKind::NotFound);
        assert_eq!(candidate.kind(), ErrorKind::NotFound);
        assert_eq!(candidate.category(), "not_found");
    }

    #[test]
    fn messages_name_the_subject() {
        let err = Error::AlreadyVoted {
            poll_id: 1,
            voter: Identity::new("alice"),
        };
        assert_eq!(err.to_string(), "alice already voted in poll 1");
    }
}
