//! Counting semaphore gating concurrent submissions.

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct Permits {
    available: usize,
    in_use: usize,
    peak: usize,
}

/// Counting permit gate built on a `parking_lot` mutex and condvar.
///
/// Tracks the high-water mark of simultaneously held permits so callers can verify the
/// bound was never exceeded.
#[derive(Debug)]
pub struct Semaphore {
    capacity: usize,
    permits: Mutex<Permits>,
    released: Condvar,
}

impl Semaphore {
    /// Semaphore with `capacity` permits.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            permits: Mutex::new(Permits {
                available: capacity,
                in_use: 0,
                peak: 0,
            }),
            released: Condvar::new(),
        }
    }

    /// Block until a permit is free, then take it.
    pub fn acquire(&self) -> SemaphorePermit<'_> {
        let mut permits = self.permits.lock();
        while permits.available == 0 {
            self.released.wait(&mut permits);
        }
        Self::take(&mut permits);
        SemaphorePermit { sem: self }
    }

    /// Take a permit if one is free.
    pub fn try_acquire(&self) -> Option<SemaphorePermit<'_>> {
        let mut permits = self.permits.lock();
        if permits.available == 0 {
            return None;
        }
        Self::take(&mut permits);
        Some(SemaphorePermit { sem: self })
    }

    /// Total permits.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits free right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.lock().available
    }

    /// Permits held right now.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.permits.lock().in_use
    }

    /// Most permits ever held at once.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.permits.lock().peak
    }

    fn take(permits: &mut Permits) {
        permits.available -= 1;
        permits.in_use += 1;
        permits.peak = permits.peak.max(permits.in_use);
    }

    fn release(&self) {
        let mut permits = self.permits.lock();
        permits.available += 1;
        permits.in_use -= 1;
        drop(permits);
        self.released.notify_one();
    }
}

/// RAII permit; released on drop.
#[derive(Debug)]
#[must_use = "the permit is released as soon as it is dropped"]
pub struct SemaphorePermit<'a> {
    sem: &'a Semaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}
