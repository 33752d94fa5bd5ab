//! # Clock Sources
//!
//! Two implementations of the HAL timer traits:
//!
//! - [`SimTimerDevice`]: deterministic, advances only when told to. Waiting
//!   for a deadline jumps straight to it, so a full scheduling run takes no
//!   real time.
//! - [`HostTimer`]: backed by the host's monotonic clock, one tick per
//!   microsecond. Waiting for a deadline sleeps the calling thread.

use hal::{TickWait, TimerDevice};
use std::time::{Duration, Instant};

/// Simulated timer device with controllable time progression
///
/// # Examples
///
/// ```
/// use sched_core::timer::SimTimerDevice;
/// use hal::{TickWait, TimerDevice};
///
/// let mut timer = SimTimerDevice::new();
/// assert_eq!(timer.poll_ticks(), 0);
///
/// timer.advance_ticks(100);
/// assert_eq!(timer.poll_ticks(), 100);
///
/// timer.wait_until(150);
/// assert_eq!(timer.poll_ticks(), 150);
/// ```
#[derive(Debug, Clone)]
pub struct SimTimerDevice {
    /// Current tick count
    ticks: u64,
}

impl SimTimerDevice {
    /// Creates a new simulated timer starting at tick 0
    pub fn new() -> Self {
        Self { ticks: 0 }
    }

    /// Creates a new simulated timer starting at a specific tick count
    pub fn with_initial_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Advances the timer by the specified number of ticks
    ///
    /// # Panics
    ///
    /// Panics if advancing would overflow u64.
    pub fn advance_ticks(&mut self, delta: u64) {
        self.ticks = self.ticks.checked_add(delta).expect("Timer tick overflow");
    }

    /// Sets the timer to a specific tick count
    ///
    /// # Panics
    ///
    /// Panics if `new_ticks < self.ticks` (would violate monotonicity).
    pub fn set_ticks(&mut self, new_ticks: u64) {
        assert!(
            new_ticks >= self.ticks,
            "Cannot set ticks backwards: {} < {}",
            new_ticks,
            self.ticks
        );
        self.ticks = new_ticks;
    }

    /// Returns the current tick count without requiring mutable access
    pub fn current_ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for SimTimerDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDevice for SimTimerDevice {
    fn poll_ticks(&mut self) -> u64 {
        self.ticks
    }
}

impl TickWait for SimTimerDevice {
    fn wait_until(&mut self, deadline: u64) {
        if deadline > self.ticks {
            self.ticks = deadline;
        }
    }
}

/// Host monotonic clock, one tick per microsecond since construction
#[derive(Debug, Clone)]
pub struct HostTimer {
    origin: Instant,
}

impl HostTimer {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    fn elapsed_micros(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

impl Default for HostTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDevice for HostTimer {
    fn poll_ticks(&mut self) -> u64 {
        self.elapsed_micros()
    }
}

impl TickWait for HostTimer {
    fn wait_until(&mut self, deadline: u64) {
        loop {
            let now = self.elapsed_micros();
            if now >= deadline {
                return;
            }
            std::thread::sleep(Duration::from_micros(deadline - now));
        }
    }
}
