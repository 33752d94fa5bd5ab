//! Thread-safe scheduler handle
//!
//! Registration and configuration may come from a different thread than the
//! one driving ticks. [`SharedScheduler`] serializes all of them behind one
//! lock so a tick never observes a half-applied `create`.

use crate::dispatch::Dispatch;
use crate::error::SchedError;
use crate::scheduler::Scheduler;
use crate::unit::UnitRecord;
use core_types::{Priority, ServiceTicks, UnitId};
use hal::TimerDevice;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to a [`Scheduler`] shared between threads
pub struct SharedScheduler<C> {
    inner: Arc<Mutex<Scheduler<C>>>,
}

impl<C> Clone for SharedScheduler<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: TimerDevice> SharedScheduler<C> {
    pub fn new(scheduler: Scheduler<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(scheduler)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Scheduler<C>> {
        self.inner.lock().expect("lock scheduler")
    }

    /// Runs `f` with exclusive access to the scheduler
    pub fn with<R>(&self, f: impl FnOnce(&mut Scheduler<C>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn create(&self, name: &str, priority: Priority) -> Result<UnitId, SchedError> {
        self.lock().create(name, priority)
    }

    pub fn set_target_service_time(
        &self,
        unit: UnitId,
        ticks: ServiceTicks,
    ) -> Result<(), SchedError> {
        self.lock().set_target_service_time(unit, ticks)
    }

    pub fn tick(&self) -> Result<Dispatch, SchedError> {
        self.lock().tick()
    }

    /// Copy of the unit's record at this instant
    pub fn snapshot(&self, unit: UnitId) -> Result<UnitRecord, SchedError> {
        self.lock().lookup(unit).cloned()
    }

    /// Recovers the scheduler if this is the last handle
    pub fn into_inner(self) -> Result<Scheduler<C>, Self> {
        Arc::try_unwrap(self.inner)
            .map(|mutex| mutex.into_inner().expect("lock scheduler"))
            .map_err(|inner| Self { inner })
    }
}
