//! # Hardware Abstraction Layer (HAL)
//!
//! This crate defines the hardware abstraction traits the scheduler core
//! depends on.
//!
//! ## Philosophy
//!
//! **The clock must be fully abstracted and swappable.**
//!
//! The scheduler core never reads a platform clock directly. It is generic
//! over these traits so that the same accounting code runs against a
//! deterministic simulated timer in tests and a host clock in the harness.

pub mod timer;

pub use timer::{TickWait, TimerDevice};
