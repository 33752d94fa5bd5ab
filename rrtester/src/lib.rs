//! # Round-Robin Tester
//!
//! Drives the scheduler core through a fixed workload and reports, for every
//! unit, when it terminated and how much service time it received.
//!
//! ## Philosophy
//!
//! - **Host owns I/O**: the scheduler never prints; this crate renders its
//!   completion notices
//! - **Deterministic mode is first-class**: the simulated clock is the default
//! - **Configuration is data**: a JSON file describes the workload
//!
//! ## Default Workload
//!
//! Five equal-priority units with budgets of 3, 6, 4, 5 and 2 quanta
//! (`A` through `E`). Under fair rotation they finish in the order
//! `E, A, C, D, B`.

pub mod config;
pub mod runner;

pub use config::{ClockKind, TesterConfig, UnitSpec};
pub use runner::{format_completion, format_summary, run_scenario, TesterError};
