//! # Timer Device
//!
//! Hardware abstraction for monotonic time measurement.
//!
//! ## Philosophy
//!
//! **Time is a service, not a global variable.**
//!
//! The scheduler reads the clock through these traits only. It never asks
//! for wall-clock time and never assumes a tick frequency.
//!
//! ## Design Principles
//!
//! 1. **Monotonic**: Ticks never go backwards
//! 2. **Cumulative**: Returns total ticks since the device started
//! 3. **Frequency-agnostic**: No assumptions about tick rate at this layer
//! 4. **Waiting is explicit**: Only [`TickWait`] may block, and only until a
//!    caller-chosen deadline
//!
//! ## Use Cases
//!
//! - Service-time accounting
//! - Quantum expiry
//! - Idle waits between scheduling points

/// Hardware timer device trait
///
/// Provides access to a monotonic tick counter. Ticks are cumulative
/// and never decrease.
///
/// # Implementation Notes
///
/// - Must be monotonic (never return a smaller value)
/// - Must not block
/// - Tick frequency is implementation-defined
///
/// # Examples
///
/// ```
/// use hal::TimerDevice;
///
/// fn elapsed<T: TimerDevice>(timer: &mut T, since: u64) -> u64 {
///     timer.poll_ticks().saturating_sub(since)
/// }
/// ```
pub trait TimerDevice {
    /// Returns the current tick count
    ///
    /// This value is monotonic, cumulative and returned without blocking.
    fn poll_ticks(&mut self) -> u64;
}

/// A timer that can park the caller until a tick deadline
///
/// This is the scheduler's "wait for the next timer interrupt" seam. A
/// simulated clock satisfies it by jumping forward; a host clock sleeps.
pub trait TickWait: TimerDevice {
    /// Returns once `poll_ticks() >= deadline`
    ///
    /// Returns immediately if the deadline has already passed.
    fn wait_until(&mut self, deadline: u64);
}
