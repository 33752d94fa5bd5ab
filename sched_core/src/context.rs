//! Execution-context arena
//!
//! Each unit owns one fixed-size context slot for as long as it is alive.
//! Slots are addressed by [`ContextSlot`] index instead of by pointer, so a
//! context can never be reached through a stale alias: once released, the
//! index simply refers to an empty slot until the next allocation.

use crate::error::SchedError;
use core_types::{ContextSlot, UnitId};

/// Saved execution state for one unit (simulation)
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    owner: UnitId,
    stack: Vec<u8>,
    resume_count: u64,
    saved_at: Option<u64>,
}

impl ExecutionContext {
    fn new(owner: UnitId, stack_size: usize) -> Self {
        Self {
            owner,
            stack: vec![0; stack_size],
            resume_count: 0,
            saved_at: None,
        }
    }

    pub fn owner(&self) -> UnitId {
        self.owner
    }

    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    /// Number of times execution has been switched into this context
    pub fn resume_count(&self) -> u64 {
        self.resume_count
    }

    /// Tick at which the context was last switched out, if suspended
    pub fn saved_at(&self) -> Option<u64> {
        self.saved_at
    }
}

/// Fixed pool of execution contexts
#[derive(Debug)]
pub struct ContextArena {
    slots: Vec<Option<ExecutionContext>>,
    stack_size: usize,
}

impl ContextArena {
    pub fn new(capacity: usize, stack_size: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            stack_size,
        }
    }

    /// Claims the lowest free slot for `owner`
    pub fn allocate(&mut self, owner: UnitId) -> Result<ContextSlot, SchedError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| {
                SchedError::ResourceExhausted(format!(
                    "all {} execution-context slots are in use",
                    self.slots.len()
                ))
            })?;
        self.slots[index] = Some(ExecutionContext::new(owner, self.stack_size));
        Ok(ContextSlot(index))
    }

    /// Frees a slot, returning the context it held
    pub fn release(&mut self, slot: ContextSlot) -> Option<ExecutionContext> {
        self.slots.get_mut(slot.index()).and_then(Option::take)
    }

    pub fn get(&self, slot: ContextSlot) -> Option<&ExecutionContext> {
        self.slots.get(slot.index()).and_then(Option::as_ref)
    }

    /// Records that execution left `slot` at tick `now`
    pub(crate) fn save(&mut self, slot: ContextSlot, now: u64) -> Result<(), SchedError> {
        let context = self.slot_mut(slot)?;
        context.saved_at = Some(now);
        Ok(())
    }

    /// Switches execution into `slot`
    pub(crate) fn resume(&mut self, slot: ContextSlot) -> Result<(), SchedError> {
        let context = self.slot_mut(slot)?;
        context.saved_at = None;
        context.resume_count += 1;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn has_free_slot(&self) -> bool {
        self.in_use() < self.capacity()
    }

    fn slot_mut(&mut self, slot: ContextSlot) -> Result<&mut ExecutionContext, SchedError> {
        self.slots
            .get_mut(slot.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| SchedError::invalid(format!("{} holds no context", slot)))
    }
}
