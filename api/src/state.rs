//! Application state shared across Axum route handlers and the lifecycle jobs.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use services::check_in::CheckInGate;
use services::face::FaceVerifier;
use services::lifecycle::EventLifecycle;
use services::presence::PresenceTracker;
use services::record_lock::RecordLocks;
use util::config;

/// Central application state. Cheap to clone; every clone shares the same
/// connection pool and per-record locks.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    records: Arc<RecordLocks>,
    verifier: Option<Arc<dyn FaceVerifier>>,
    face_match_threshold: f64,
    lifecycle: EventLifecycle,
}

impl AppState {
    /// Creates the state with the match threshold from configuration.
    pub fn new(db: DatabaseConnection, verifier: Option<Arc<dyn FaceVerifier>>) -> Self {
        Self::with_threshold(db, verifier, config::face_match_threshold())
    }

    pub fn with_threshold(
        db: DatabaseConnection,
        verifier: Option<Arc<dyn FaceVerifier>>,
        face_match_threshold: f64,
    ) -> Self {
        Self {
            lifecycle: EventLifecycle::new(db.clone()),
            db,
            records: Arc::new(RecordLocks::new()),
            verifier,
            face_match_threshold,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn lifecycle(&self) -> &EventLifecycle {
        &self.lifecycle
    }

    /// Ping ingestion bound to the shared record locks.
    pub fn presence(&self) -> PresenceTracker {
        PresenceTracker::new(self.db.clone(), Arc::clone(&self.records))
    }

    /// Check-in gate bound to the shared record locks and face verifier.
    pub fn check_in_gate(&self) -> CheckInGate {
        CheckInGate::new(
            self.db.clone(),
            Arc::clone(&self.records),
            self.verifier.clone(),
            self.face_match_threshold,
        )
    }
}
