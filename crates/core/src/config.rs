//! Ledger configuration.
//!
//! Loaded from TOML; every key is optional and falls back to the defaults
//! below.
//!
//! ```toml
//! admins = ["moderator"]
//!
//! [limits]
//! max_candidates = 10
//! max_title_len = 200
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{CandidateId, Error, Identity};

/// No poll ever has fewer candidates than this, whatever the configured limits.
pub const MIN_CANDIDATES: usize = 2;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Identities allowed to close any poll, in addition to its creator.
    pub admins: Vec<Identity>,

    /// Input limits enforced by CreatePoll.
    pub limits: Limits,
}

/// Input limits. Lengths count characters of the trimmed text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub min_title_len: usize,
    pub max_title_len: usize,
    pub min_candidates: usize,
    pub max_candidates: usize,
    pub max_candidate_name_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_title_len: 1,
            max_title_len: 200,
            min_candidates: 2,
            max_candidates: 10,
            max_candidate_name_len: 100,
        }
    }
}

impl LedgerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let config: LedgerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, Error> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject limits that would break the poll invariants.
    pub fn validate(&self) -> Result<(), Error> {
        let l = &self.limits;
        if l.min_candidates < MIN_CANDIDATES {
            return Err(Error::config(format!(
                "min_candidates must be at least {MIN_CANDIDATES}"
            )));
        }
        if l.max_candidates < l.min_candidates {
            return Err(Error::config("max_candidates is below min_candidates"));
        }
        if CandidateId::try_from(l.max_candidates).is_err() {
            return Err(Error::config("max_candidates exceeds the candidate id range"));
        }
        if l.min_title_len == 0 {
            return Err(Error::config("min_title_len must be at least 1"));
        }
        if l.max_title_len < l.min_title_len {
            return Err(Error::config("max_title_len is below min_title_len"));
        }
        if l.max_candidate_name_len == 0 {
            return Err(Error::config("max_candidate_name_len must be at least 1"));
        }
        Ok(())
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        self.admins.contains(identity)
    }
}
