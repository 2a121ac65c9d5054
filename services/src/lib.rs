//! Attendance lifecycle and geofence evaluation engine.
//!
//! Leaves first: [`geofence`] and [`eligibility`] are consumed by
//! [`presence`], [`check_in`] and [`finalizer`]; [`lifecycle`] drives events
//! through their phases and hands concluded events to the finalizer.

pub mod check_in;
pub mod eligibility;
pub mod error;
pub mod event;
pub mod face;
pub mod factories;
pub mod finalizer;
pub mod geofence;
pub mod lifecycle;
pub mod location;
pub mod presence;
pub mod record_lock;
pub mod scheduler;

pub use error::AttendanceError;
