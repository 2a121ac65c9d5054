//! Time-driven event lifecycle.
//!
//! The status rule maps wall-clock time onto
//! `UPCOMING → REGISTRATION → ONGOING → CONCLUDED`; the status sweep applies it
//! forward-only, and the finalization sweep turns `CONCLUDED` events into
//! `FINALIZED` ones once their attendance has been computed. `CANCELLED` and
//! `FINALIZED` are never touched by the rule.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::models::event::{self, EventStatus};
use sea_orm::DbConn;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::finalizer::{self, FinalizeReport};
use crate::record_lock::KeyedLocks;

/// Status the rule assigns to `event` at `now`.
pub fn status_at(event: &event::Model, now: DateTime<Utc>) -> EventStatus {
    scheduled_status(event.registration_open_at, event.start_at, event.end_at, now)
}

/// Status for a schedule at `now`, before any event row exists.
pub fn scheduled_status(
    registration_open_at: DateTime<Utc>,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> EventStatus {
    if now < registration_open_at {
        EventStatus::Upcoming
    } else if now < start_at {
        EventStatus::Registration
    } else if now < end_at {
        EventStatus::Ongoing
    } else {
        EventStatus::Concluded
    }
}

/// The transition to apply, if any. Only forward moves are allowed, and
/// cancelled or finalized events never move.
pub fn next_status(current: EventStatus, target: EventStatus) -> Option<EventStatus> {
    if matches!(current, EventStatus::Cancelled | EventStatus::Finalized) {
        return None;
    }
    match (current.rank(), target.rank()) {
        (Some(from), Some(to)) if to > from => Some(target),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSweepReport {
    pub examined: usize,
    pub advanced: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalizeSweepReport {
    pub examined: usize,
    pub finalized: usize,
    /// Finalized with per-record failures; left concluded for the next tick.
    pub deferred: usize,
    /// Another run already holds the event.
    pub skipped: usize,
    pub failed: usize,
}

/// Drives both lifecycle sweeps. Cheap to clone.
#[derive(Clone)]
pub struct EventLifecycle {
    db: DbConn,
    finalizing: Arc<KeyedLocks<i64>>,
}

impl EventLifecycle {
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            finalizing: Arc::new(KeyedLocks::new()),
        }
    }

    /// Advances every open event to the status its schedule calls for.
    ///
    /// Fails only when the event list itself cannot be read; individual
    /// events that fail are logged and counted.
    pub async fn sweep_statuses(&self, now: DateTime<Utc>) -> Result<StatusSweepReport> {
        let events = event::Model::find_by_status(
            &self.db,
            &[
                EventStatus::Upcoming,
                EventStatus::Registration,
                EventStatus::Ongoing,
            ],
        )
        .await?;

        let mut report = StatusSweepReport {
            examined: events.len(),
            ..Default::default()
        };

        for ev in events {
            let Some(to) = next_status(ev.status, status_at(&ev, now)) else {
                continue;
            };

            match event::Model::compare_and_set_status(&self.db, ev.id, ev.status, to).await {
                Ok(true) => {
                    info!(event_id = ev.id, from = %ev.status, to = %to, "Event status advanced");
                    report.advanced += 1;
                }
                Ok(false) => {
                    debug!(event_id = ev.id, "Event status changed concurrently, leaving it");
                }
                Err(e) => {
                    error!(event_id = ev.id, error = %e, "Failed to advance event status");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Finalizes every concluded event and marks it finalized.
    pub async fn sweep_finalizations(&self, now: DateTime<Utc>) -> Result<FinalizeSweepReport> {
        let events = event::Model::find_by_status(&self.db, &[EventStatus::Concluded]).await?;

        let mut report = FinalizeSweepReport {
            examined: events.len(),
            ..Default::default()
        };

        for ev in events {
            let event_id = ev.id;
            let Some(_single_flight) = self.finalizing.try_lock(event_id) else {
                debug!(event_id, "Finalization already running, skipping");
                report.skipped += 1;
                continue;
            };

            match self.finalize_and_mark(&ev, now).await {
                Ok(Some(r)) if r.failed == 0 => {
                    info!(
                        event_id,
                        updated = r.updated,
                        absentees = r.absentees_created,
                        "Event finalized"
                    );
                    report.finalized += 1;
                }
                Ok(Some(r)) => {
                    warn!(
                        event_id,
                        failed = r.failed,
                        "Finalization incomplete, will retry on next sweep"
                    );
                    report.deferred += 1;
                }
                Ok(None) => {
                    debug!(event_id, "Event left concluded state concurrently");
                }
                Err(e) => {
                    error!(event_id, error = %e, "Finalization failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Runs the finalizer and flips the event to `FINALIZED` when every record
    /// was written. `None` when the event was no longer concluded at the end.
    async fn finalize_and_mark(
        &self,
        ev: &event::Model,
        now: DateTime<Utc>,
    ) -> Result<Option<FinalizeReport>> {
        let report = finalizer::finalize_event(&self.db, ev, now).await?;
        if report.failed > 0 {
            return Ok(Some(report));
        }

        let marked = event::Model::compare_and_set_status(
            &self.db,
            ev.id,
            EventStatus::Concluded,
            EventStatus::Finalized,
        )
        .await?;

        Ok(marked.then_some(report))
    }
}
