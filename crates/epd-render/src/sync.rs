//! Counting semaphore
//!
//! The orchestrator and the feeder workers coordinate through counting
//! semaphores with unbounded waits — a stuck hardware pull is the external
//! watchdog's problem, and putting timeouts on the per-row path would itself
//! jeopardize timing. (The FreeRTOS original uses task notifications and
//! binary semaphores; on the host a mutex/condvar pair does the same job.)

use std::sync::{Condvar, Mutex};

/// Counting semaphore with blocking `acquire` and non-blocking `release`.
#[derive(Debug)]
pub struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Semaphore holding `permits` initial permits.
    pub fn new(permits: usize) -> Self {
        Semaphore {
            count: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Add one permit and wake one waiter.
    ///
    /// Safe to call from any context; never blocks beyond the internal
    /// lock.
    pub fn release(&self) {
        let mut count = self.count.lock().expect("semaphore poisoned");
        *count += 1;
        self.available.notify_one();
    }

    /// Take one permit, blocking until one is available.
    pub fn acquire(&self) {
        let mut count = self.count.lock().expect("semaphore poisoned");
        while *count == 0 {
            count = self.available.wait(count).expect("semaphore poisoned");
        }
        *count -= 1;
    }

    /// Take one permit if immediately available.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.count.lock().expect("semaphore poisoned");
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }
}
