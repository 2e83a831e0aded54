//! Attune Controller - The closed-loop tuner
//!
//! On each tick the [`AdaptiveController`] reads the current aggregate
//! statistics, the latest detected pattern, and the predictor's advisory
//! scores; computes a new bounded parameter value from deterministic
//! step tables; and, when the hysteresis gate opens, applies it to the
//! external store through the mutation ledger (backup first, then
//! write, then commit the in-memory state).
//!
//! Failure never leaks partial numeric state: a failed store write leaves
//! `current_parameter` untouched and already-captured backups in place,
//! and the next tick retries independently.

pub mod config;
pub mod controller;
pub mod error;

pub use config::{AdjustmentStep, ControllerConfig};
pub use controller::{AdaptiveController, TickOutcome};
pub use error::{ControllerError, Result};
