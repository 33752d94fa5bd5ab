//! Scheduler error types

use core_types::UnitId;
use thiserror::Error;

/// Errors returned by the scheduler core
///
/// Every rejected operation maps to exactly one of these kinds. None of them
/// is fatal: the scheduler state is left unchanged and the caller may retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// No free execution-context slot (or other bounded resource)
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Operation not valid for the unit's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Unknown id, or a terminated unit that has been reclaimed
    #[error("Unit not found: {0}")]
    NotFound(UnitId),
}

impl SchedError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidState(reason.into())
    }
}
