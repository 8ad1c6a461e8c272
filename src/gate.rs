//! Per-task request ceilings.
//!
//! Every task owns a [`RequestGate`] shared by all virtual users running it.
//! A transaction only sends its request after winning a slot from the gate,
//! which bounds how many times each endpoint is hit during a run no matter
//! how many users Goose spawns.

use std::sync::{Arc, Mutex};

use crate::catalog::Endpoint;
use crate::config::RunConfig;

/// Mutex-protected counter with an optional ceiling
#[derive(Debug, Default)]
pub struct RequestGate {
    count: Mutex<u64>,
    ceiling: Option<u64>,
}

impl RequestGate {
    /// Gate that never refuses, but still counts
    pub fn unlimited() -> Self {
        Self {
            count: Mutex::new(0),
            ceiling: None,
        }
    }

    /// Gate allowing at most `ceiling` acquisitions
    pub fn with_ceiling(ceiling: u64) -> Self {
        Self {
            count: Mutex::new(0),
            ceiling: Some(ceiling),
        }
    }

    /// Take one slot if any remain.
    ///
    /// The compare and the increment happen under the same lock, so
    /// concurrent callers can never push the count past the ceiling.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        match self.ceiling {
            Some(ceiling) if *count >= ceiling => false,
            _ => {
                *count += 1;
                true
            }
        }
    }

    /// Number of slots handed out so far
    pub fn fired(&self) -> u64 {
        *self.count.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn ceiling(&self) -> Option<u64> {
        self.ceiling
    }

    /// True once every slot has been taken
    pub fn is_exhausted(&self) -> bool {
        self.ceiling.is_some_and(|ceiling| self.fired() >= ceiling)
    }
}

/// A catalog endpoint bound to its host and gate for one run
#[derive(Debug, Clone)]
pub struct PlannedTask {
    pub endpoint: &'static Endpoint,
    /// Base URL, e.g. `http://localhost:12345`
    pub host: String,
    pub gate: Arc<RequestGate>,
}

/// All tasks of a run, one gate each
#[derive(Debug, Clone)]
pub struct LoadPlan {
    tasks: Vec<PlannedTask>,
}

impl LoadPlan {
    pub fn new(config: &RunConfig) -> Self {
        let gated = config.profile.is_gated();
        let tasks = config
            .profile
            .endpoints()
            .iter()
            .map(|endpoint| {
                let gate = if gated {
                    RequestGate::with_ceiling(endpoint.quota.ceiling(config.limit))
                } else {
                    RequestGate::unlimited()
                };
                PlannedTask {
                    endpoint,
                    host: config.host_for(endpoint.port),
                    gate: Arc::new(gate),
                }
            })
            .collect();
        Self { tasks }
    }

    pub fn tasks(&self) -> &[PlannedTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Requests let through by all gates
    pub fn total_fired(&self) -> u64 {
        self.tasks.iter().map(|t| t.gate.fired()).sum()
    }

    /// Upper bound on requests for the whole run, if every task is gated
    pub fn total_ceiling(&self) -> Option<u64> {
        self.tasks.iter().map(|t| t.gate.ceiling()).sum()
    }

    /// Distinct base URLs, in first-seen order
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = Vec::new();
        for task in &self.tasks {
            if !hosts.contains(&task.host.as_str()) {
                hosts.push(&task.host);
            }
        }
        hosts
    }
}
