// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded admission guard.
//
// A counter of in-use units with a fixed capacity.  Acquiring past capacity
// fails immediately with a recoverable error; releasing the unit that brings
// the guard back under capacity fires a "try again" notification so that
// rejected callers know to retry.  The notification runs outside the lock and
// may call back into the guard.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fontlayer_core::error::FontLayerError;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from [`AdmissionGuard`].
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("all {capacity} slots are in use, try again later")]
    CapacityExceeded { capacity: usize },

    #[error(transparent)]
    Action(#[from] FontLayerError),
}

type TryAgain = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
struct Counter {
    count: usize,
    capacity: usize,
}

/// Explicit `{count, capacity}` state machine guarded by one mutex.
pub struct AdmissionGuard {
    counter: Mutex<Counter>,
    try_again: Mutex<Option<TryAgain>>,
}

impl std::fmt::Debug for AdmissionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counter = self.counter();
        f.debug_struct("AdmissionGuard")
            .field("count", &counter.count)
            .field("capacity", &counter.capacity)
            .finish()
    }
}

impl AdmissionGuard {
    pub fn new(capacity: usize) -> Self {
        Self {
            counter: Mutex::new(Counter { count: 0, capacity }),
            try_again: Mutex::new(None),
        }
    }

    /// Register the notification fired when capacity frees up.
    pub fn on_try_again(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.try_again.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn in_use(&self) -> usize {
        self.counter().count
    }

    pub fn capacity(&self) -> usize {
        self.counter().capacity
    }

    /// Take one unit.
    pub fn try_acquire(&self) -> Result<(), AdmissionError> {
        self.acquire_with(|| Ok(()))
    }

    /// Take one unit and run `action` while holding the lock.  The unit is
    /// only counted if `action` succeeds.
    #[instrument(skip_all)]
    pub fn acquire_with<T>(
        &self,
        action: impl FnOnce() -> Result<T, FontLayerError>,
    ) -> Result<T, AdmissionError> {
        let mut counter = self.counter();
        if counter.count >= counter.capacity {
            debug!(capacity = counter.capacity, "admission refused");
            return Err(AdmissionError::CapacityExceeded {
                capacity: counter.capacity,
            });
        }
        let value = action()?;
        counter.count += 1;
        debug!(in_use = counter.count, "admitted");
        Ok(value)
    }

    /// Give one unit back.
    pub fn release(&self) {
        if self.take_unit() == Some(true) {
            self.notify_try_again();
        }
    }

    /// Give one unit back, running `action` outside the lock.  If `action`
    /// fails the unit is restored and no notification fires.
    #[instrument(skip_all)]
    pub fn release_with<T>(
        &self,
        action: impl FnOnce() -> Result<T, FontLayerError>,
    ) -> Result<T, AdmissionError> {
        let taken = self.take_unit();

        match action() {
            Ok(value) => {
                if taken == Some(true) {
                    self.notify_try_again();
                }
                Ok(value)
            }
            Err(e) => {
                if taken.is_some() {
                    self.counter().count += 1;
                }
                Err(e.into())
            }
        }
    }

    /// Decrement under the lock.  `None` when no unit was held, otherwise
    /// whether the guard was full before the decrement.
    fn take_unit(&self) -> Option<bool> {
        let mut counter = self.counter();
        if counter.count == 0 {
            return None;
        }
        let was_at_capacity = counter.count >= counter.capacity;
        counter.count -= 1;
        debug!(in_use = counter.count, "released");
        Some(was_at_capacity)
    }

    fn notify_try_again(&self) {
        let callback = self
            .try_again
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            debug!("capacity freed, notifying");
            callback();
        }
    }

    fn counter(&self) -> MutexGuard<'_, Counter> {
        self.counter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
