//! # Core Types
//!
//! This crate defines the fundamental types shared by the scheduler core and
//! the test harness.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: identities, slots and tick quantities are
//!   distinct types and cannot be confused.
//! - **Leaf crate**: no dependency on the scheduler itself.
//!
//! ## Key Types
//!
//! - [`UnitId`]: Unique identifier for a schedulable unit
//! - [`ContextSlot`]: Index into the fixed execution-context pool
//! - [`CoreId`]: Identifier for a CPU core
//! - [`ServiceTicks`]: Scheduled CPU time, in ticks
//! - [`Priority`]: Scheduling priority (lower is more urgent)

pub mod ids;
pub mod service;

pub use ids::{ContextSlot, CoreId, UnitId};
pub use service::{Priority, ServiceTicks};
