//! Pending markers for in-flight generator work, one registry per session.
//!
//! A marker is created when a request is dispatched and removed when it
//! completes, on every exit path, by dropping its [`PendingGuard`]. Each marker
//! carries a ticket so that a guard only ever removes its own marker, never
//! one created after a logout cleared the registry.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::errors::ProfileError;
use crate::regeneration::target::RegenerationTarget;

/// What a marker protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    Regeneration { target: RegenerationTarget },
    Tailoring,
}

impl Activity {
    fn label(&self) -> String {
        match self {
            Activity::Regeneration { target } => target.to_string(),
            Activity::Tailoring => "The document".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingMarker {
    #[serde(flatten)]
    pub activity: Activity,
    pub ticket: u64,
    pub started_at: DateTime<Utc>,
}

/// Last known status of a regeneration target, for busy indicators.
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub target: RegenerationTarget,
    pub status: RequestStatus,
}

/// Finished requests remembered for the pending view, oldest evicted first.
const FINISHED_HISTORY: usize = 32;

#[derive(Default)]
struct RegistryState {
    markers: HashMap<Activity, PendingMarker>,
    finished: VecDeque<RequestRecord>,
    next_ticket: u64,
}

impl RegistryState {
    fn forget(&mut self, target: &RegenerationTarget) {
        self.finished.retain(|record| record.target != *target);
    }

    fn remember(&mut self, target: RegenerationTarget, status: RequestStatus) {
        self.forget(&target);
        if self.finished.len() == FINISHED_HISTORY {
            self.finished.pop_front();
        }
        self.finished.push_back(RequestRecord { target, status });
    }
}

#[derive(Default)]
pub struct PendingRegistry {
    state: Mutex<RegistryState>,
}

impl PendingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Atomically checks and sets the marker for `activity`.
    ///
    /// Regeneration of a target is refused while the same target or a
    /// tailoring run is pending; tailoring is refused while anything is pending.
    pub fn try_acquire(self: &Arc<Self>, activity: Activity) -> Result<PendingGuard, ProfileError> {
        let mut state = self.state.lock();

        let conflict = match activity {
            Activity::Regeneration { .. } => state
                .markers
                .keys()
                .find(|held| **held == activity || **held == Activity::Tailoring)
                .copied(),
            Activity::Tailoring => state.markers.keys().next().copied(),
        };
        if let Some(held) = conflict {
            return Err(ProfileError::AlreadyInProgress {
                target: held.label(),
            });
        }

        state.next_ticket += 1;
        let ticket = state.next_ticket;
        state.markers.insert(
            activity,
            PendingMarker {
                activity,
                ticket,
                started_at: Utc::now(),
            },
        );
        if let Activity::Regeneration { target } = activity {
            state.forget(&target);
        }
        debug!("Pending marker {ticket} set for {}", activity.label());

        Ok(PendingGuard {
            registry: Arc::clone(self),
            activity,
            ticket,
            succeeded: false,
        })
    }

    #[cfg(test)]
    pub fn is_pending(&self, activity: &Activity) -> bool {
        self.state.lock().markers.contains_key(activity)
    }

    #[cfg(test)]
    pub fn any_pending(&self) -> bool {
        !self.state.lock().markers.is_empty()
    }

    pub fn pending(&self) -> Vec<PendingMarker> {
        let mut markers: Vec<_> = self.state.lock().markers.values().cloned().collect();
        markers.sort_by_key(|m| m.ticket);
        markers
    }

    /// Pending targets plus the outcome of the most recent finished request per target.
    pub fn records(&self) -> Vec<RequestRecord> {
        let state = self.state.lock();
        let mut records: Vec<_> = state
            .markers
            .keys()
            .filter_map(|activity| match activity {
                Activity::Regeneration { target } => Some(RequestRecord {
                    target: *target,
                    status: RequestStatus::Pending,
                }),
                Activity::Tailoring => None,
            })
            .chain(state.finished.iter().cloned())
            .collect();
        records.sort_by_key(|r| r.target.to_string());
        records
    }

    /// Drops every marker. Outstanding guards become stale.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        state.finished.clear();
        let cleared = state.markers.len();
        state.markers.clear();
        cleared
    }

    fn holds(&self, activity: &Activity, ticket: u64) -> bool {
        self.state
            .lock()
            .markers
            .get(activity)
            .is_some_and(|m| m.ticket == ticket)
    }

    fn release(&self, activity: &Activity, ticket: u64, succeeded: bool) {
        let mut state = self.state.lock();
        if !state.markers.get(activity).is_some_and(|m| m.ticket == ticket) {
            return;
        }
        state.markers.remove(activity);
        if let Activity::Regeneration { target } = activity {
            let status = if succeeded {
                RequestStatus::Succeeded
            } else {
                RequestStatus::Failed
            };
            state.remember(*target, status);
        }
        debug!("Pending marker {ticket} released for {}", activity.label());
    }
}

/// Scoped ownership of a pending marker. Dropping it clears the marker.
pub struct PendingGuard {
    registry: Arc<PendingRegistry>,
    activity: Activity,
    ticket: u64,
    succeeded: bool,
}

impl PendingGuard {
    /// False once the registry was cleared under this guard.
    pub fn is_current(&self) -> bool {
        self.registry.holds(&self.activity, self.ticket)
    }

    pub fn succeed(mut self) {
        self.succeeded = true;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.registry
            .release(&self.activity, self.ticket, self.succeeded);
    }
}
