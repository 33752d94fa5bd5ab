//! Service-time and priority primitives
//!
//! ## Philosophy
//!
//! - **Time is counted, not measured**: service time is a tick count, with no
//!   assumption about the tick frequency.
//! - **Quantities are typed**: a budget cannot be confused with a timestamp or
//!   a priority.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduled CPU time, in clock ticks
///
/// Used both for the time a unit has accumulated and for the budget it must
/// reach before terminating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ServiceTicks(pub u64);

impl ServiceTicks {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for ServiceTicks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ticks", self.0)
    }
}

impl From<u64> for ServiceTicks {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Scheduling priority
///
/// Lower values are more urgent: `Priority(0)` preempts `Priority(1)`.
/// Units of equal priority share the processor in FIFO rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Priority(pub u8);

impl Priority {
    /// The most urgent priority level
    pub const HIGHEST: Priority = Priority(0);

    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    pub fn level(&self) -> usize {
        self.0 as usize
    }

    /// Returns true if `self` must run before `other`
    pub fn is_higher_than(&self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prio {}", self.0)
    }
}
