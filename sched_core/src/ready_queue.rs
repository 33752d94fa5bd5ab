//! Ready queue
//!
//! One FIFO per priority level plus a bitmap of the non-empty levels. The
//! lowest set bit is the most urgent level with work, so picking the next
//! unit is O(1) regardless of how many levels are configured.
//!
//! Units are enqueued at the back and dequeued from the front of their
//! level: round-robin within a level, strict priority across levels.

use crate::error::SchedError;
use crate::unit::{UnitRecord, UnitState};
use core_types::{Priority, UnitId};
use std::collections::VecDeque;

/// Upper bound on configurable priority levels (width of the level bitmap)
pub const MAX_PRIORITY_LEVELS: usize = 32;

/// Priority-ordered run queue
#[derive(Debug)]
pub struct ReadyQueue {
    levels: Vec<VecDeque<UnitId>>,
    /// Bit `n` is set iff `levels[n]` is non-empty
    occupied: u32,
    len: usize,
}

impl ReadyQueue {
    /// Creates an empty queue with `priority_levels` levels
    ///
    /// `priority_levels` is clamped to `1..=MAX_PRIORITY_LEVELS`.
    pub fn new(priority_levels: usize) -> Self {
        let levels = priority_levels.clamp(1, MAX_PRIORITY_LEVELS);
        Self {
            levels: vec![VecDeque::new(); levels],
            occupied: 0,
            len: 0,
        }
    }

    /// Appends `unit` to the tail of its priority level
    pub fn enqueue(&mut self, unit: &UnitRecord) -> Result<(), SchedError> {
        if unit.state() != UnitState::Runnable {
            return Err(SchedError::invalid(format!(
                "cannot enqueue {} in state {:?}",
                unit.id(),
                unit.state()
            )));
        }
        let level = unit.priority().level();
        if level >= self.levels.len() {
            return Err(SchedError::invalid(format!(
                "{} of {} has no ready-queue level",
                unit.priority(),
                unit.id()
            )));
        }
        if self.contains(unit.id()) {
            return Err(SchedError::invalid(format!(
                "{} is already queued",
                unit.id()
            )));
        }

        self.levels[level].push_back(unit.id());
        self.occupied |= 1 << level;
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the head of the most urgent non-empty level
    ///
    /// Returns None if no units are runnable.
    pub fn dequeue_next(&mut self) -> Option<UnitId> {
        if self.occupied == 0 {
            return None;
        }
        let level = self.occupied.trailing_zeros() as usize;
        let unit = self.levels[level].pop_front()?;
        if self.levels[level].is_empty() {
            self.occupied &= !(1 << level);
        }
        self.len -= 1;
        Some(unit)
    }

    /// Removes `unit` wherever it is queued; returns true if it was present
    pub fn remove(&mut self, unit: UnitId) -> bool {
        for (level, queue) in self.levels.iter_mut().enumerate() {
            if let Some(index) = queue.iter().position(|&id| id == unit) {
                queue.remove(index);
                if queue.is_empty() {
                    self.occupied &= !(1 << level);
                }
                self.len -= 1;
                return true;
            }
        }
        false
    }

    /// The most urgent priority that currently has a queued unit
    pub fn highest_priority(&self) -> Option<Priority> {
        if self.occupied == 0 {
            None
        } else {
            Some(Priority::new(self.occupied.trailing_zeros() as u8))
        }
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.levels.iter().any(|queue| queue.contains(&unit))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn priority_levels(&self) -> usize {
        self.levels.len()
    }

    /// Iterates over queued units in the order they would be dispatched
    pub fn iter(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.levels.iter().flat_map(|queue| queue.iter().copied())
    }
}
