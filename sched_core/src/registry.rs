//! Unit registry
//!
//! Maps [`UnitId`] to [`UnitRecord`] and owns the execution-context pool.
//! Terminated records stay visible to `lookup` (so a driver can read the
//! final service time) until they are explicitly reclaimed.

use crate::context::ContextArena;
use crate::error::SchedError;
use crate::unit::{UnitRecord, UnitState};
use core_types::{ContextSlot, Priority, ServiceTicks, UnitId};
use std::collections::BTreeMap;

/// Registry of schedulable units
#[derive(Debug)]
pub struct Registry {
    units: BTreeMap<UnitId, UnitRecord>,
    contexts: ContextArena,
    next_id: UnitId,
    priority_levels: usize,
}

impl Registry {
    pub fn new(max_units: usize, stack_size: usize, priority_levels: usize) -> Self {
        Self {
            units: BTreeMap::new(),
            contexts: ContextArena::new(max_units, stack_size),
            next_id: UnitId::from_raw(1),
            priority_levels,
        }
    }

    /// Allocates a `Runnable` record with a fresh id and context slot
    ///
    /// The caller is responsible for putting the unit on the ready queue.
    pub(crate) fn create(
        &mut self,
        name: &str,
        priority: Priority,
        now: u64,
    ) -> Result<UnitId, SchedError> {
        self.check_priority(priority)?;

        let id = self.next_id;
        let slot = self.contexts.allocate(id)?;
        self.next_id = id.next();

        let record = UnitRecord::new(id, name.to_string(), priority, slot, now);
        self.units.insert(id, record);
        Ok(id)
    }

    /// Sets the unit's budget; only valid before its first dispatch
    pub(crate) fn set_target_service_time(
        &mut self,
        id: UnitId,
        ticks: ServiceTicks,
    ) -> Result<(), SchedError> {
        self.lookup_mut(id)?.set_target(ticks)
    }

    /// Returns the record for `id`
    pub fn lookup(&self, id: UnitId) -> Result<&UnitRecord, SchedError> {
        self.units.get(&id).ok_or(SchedError::NotFound(id))
    }

    pub(crate) fn lookup_mut(&mut self, id: UnitId) -> Result<&mut UnitRecord, SchedError> {
        self.units.get_mut(&id).ok_or(SchedError::NotFound(id))
    }

    /// Removes a terminated record; its id resolves to `NotFound` afterwards
    pub(crate) fn reclaim(&mut self, id: UnitId) -> Result<UnitRecord, SchedError> {
        let record = self.lookup(id)?;
        if !record.is_terminated() {
            return Err(SchedError::invalid(format!(
                "{} is {:?}; only terminated units can be reclaimed",
                id,
                record.state()
            )));
        }
        self.units.remove(&id).ok_or(SchedError::NotFound(id))
    }

    /// Removes every terminated record, returning them
    pub(crate) fn reap_terminated(&mut self) -> Vec<UnitRecord> {
        let reaped: Vec<UnitId> = self
            .units
            .values()
            .filter(|record| record.is_terminated())
            .map(UnitRecord::id)
            .collect();
        reaped
            .into_iter()
            .filter_map(|id| self.units.remove(&id))
            .collect()
    }

    pub(crate) fn release_context(&mut self, slot: Option<ContextSlot>) {
        if let Some(slot) = slot {
            self.contexts.release(slot);
        }
    }

    pub(crate) fn check_priority(&self, priority: Priority) -> Result<(), SchedError> {
        if priority.level() >= self.priority_levels {
            return Err(SchedError::invalid(format!(
                "{} is outside the configured {} levels",
                priority, self.priority_levels
            )));
        }
        Ok(())
    }

    pub fn contexts(&self) -> &ContextArena {
        &self.contexts
    }

    pub(crate) fn contexts_mut(&mut self) -> &mut ContextArena {
        &mut self.contexts
    }

    /// Iterates over all records in id (creation) order
    pub fn iter(&self) -> impl Iterator<Item = &UnitRecord> {
        self.units.values()
    }

    /// Number of records, including terminated ones not yet reclaimed
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Number of units that have not terminated
    pub fn live_count(&self) -> usize {
        self.units
            .values()
            .filter(|record| !record.is_terminated())
            .count()
    }

    /// Number of units in the given state
    pub fn count_in_state(&self, state: UnitState) -> usize {
        self.units
            .values()
            .filter(|record| record.state() == state)
            .count()
    }

    /// Sum of accumulated service time over every record
    pub fn total_service_time(&self) -> ServiceTicks {
        self.units
            .values()
            .fold(ServiceTicks::zero(), |total, record| {
                total.saturating_add(record.accumulated_service_time())
            })
    }
}
