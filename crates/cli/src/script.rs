//! Poll scripts: a JSON array of operations, each tagged with its caller.
//!
//! ```json
//! [
//!   {"caller": "alice", "op": "create_poll", "title": "Lunch", "candidates": ["Pizza", "Sushi"]},
//!   {"caller": "bob", "op": "vote", "poll_id": 1, "candidate_id": 2},
//!   {"caller": "alice", "op": "close_poll", "poll_id": 1}
//! ]
//! ```

use anyhow::{Context, Result};
use ezpoll_core::{DashboardStats, Event, Identity, Operation, PollTally, Registry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Clone, Debug, Deserialize)]
pub struct Step {
    pub caller: Identity,
    #[serde(flatten)]
    pub operation: Operation,
}

/// A step the registry refused.
#[derive(Clone, Debug, Serialize)]
pub struct Rejection {
    pub step: usize,
    pub kind: &'static str,
    pub message: String,
}

/// Final state after a run.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub state_root: String,
    pub stats: DashboardStats,
    pub polls: Vec<PollTally>,
    pub events: Vec<Event>,
    pub rejected: Vec<Rejection>,
}

pub fn load(path: &Path) -> Result<Vec<Step>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    parse(&content).with_context(|| format!("parsing script {}", path.display()))
}

pub fn parse(content: &str) -> Result<Vec<Step>> {
    Ok(serde_json::from_str(content)?)
}

/// Apply every step in order. Rejected steps are recorded and skipped.
pub fn run(registry: &mut Registry, steps: &[Step]) -> Result<Snapshot> {
    let mut events = Vec::new();
    let mut rejected = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        let number = index + 1;
        match registry.execute(&step.caller, &step.operation) {
            Ok(outcome) => {
                for event in &outcome.events {
                    info!(step = number, "{event}");
                }
                events.extend(outcome.events);
            }
            Err(e) => {
                warn!(step = number, caller = %step.caller, "step rejected: {e}");
                rejected.push(Rejection {
                    step: number,
                    kind: e.category(),
                    message: e.to_string(),
                });
            }
        }
    }

    let polls = registry.all_polls();
    Ok(Snapshot {
        state_root: registry.state_root()?.to_hex(),
        stats: DashboardStats::collect(&polls),
        polls: polls.iter().map(PollTally::of).collect(),
        events,
        rejected,
    })
}
