//! # Scheduler Core
//!
//! This crate provides a round-robin, quantum-preemptive scheduler that keeps
//! exact per-unit service-time accounts.
//!
//! ## Purpose
//!
//! Every schedulable unit carries a target service time. The scheduler
//! charges each unit only for the ticks it actually spent on a processor, and
//! terminates it at the first scheduling point where that account meets its
//! target:
//! - Deterministic under a simulated clock
//! - Fair within a priority level (FIFO round-robin)
//! - Strict across levels (a more urgent unit takes over within one tick)
//! - Inspectable (records, ready queue, audit log and counters are readable)
//!
//! ## Philosophy
//!
//! **Time is charged, never estimated.**
//!
//! A unit's accumulated service time is the sum of the intervals it held the
//! processor, measured on the clock of the core that ran it. Nothing else
//! writes to it.
//!
//! ## Layout
//!
//! - [`scheduler`]: single-core [`Scheduler`] and its `run_forever` loop
//! - [`smp`]: [`MultiCoreScheduler`] sharing one ready queue across cores
//! - [`shared`]: [`SharedScheduler`], a lock-protected handle for other threads
//! - [`registry`], [`ready_queue`], [`context`]: the bookkeeping structures
//! - [`timer`]: simulated and host clocks implementing the HAL timer traits

pub mod audit;
pub mod config;
pub mod context;
mod dispatch;
pub mod error;
pub mod ready_queue;
pub mod registry;
pub mod scheduler;
pub mod shared;
pub mod smp;
pub mod timer;
pub mod unit;

pub use audit::{Completion, PreemptionReason, ScheduleEvent, SchedulerStats};
pub use config::SchedulerConfig;
pub use dispatch::Dispatch;
pub use error::SchedError;
pub use ready_queue::ReadyQueue;
pub use registry::Registry;
pub use scheduler::{RunOutcome, RunReport, Scheduler};
pub use shared::SharedScheduler;
pub use smp::{MultiCoreScheduler, PerCoreClocks};
pub use timer::{HostTimer, SimTimerDevice};
pub use unit::{ExitReason, UnitRecord, UnitState};
