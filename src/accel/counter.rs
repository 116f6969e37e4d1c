//! Pool of device-side atomic counters.
//!
//! Kernels use counters for output sizing; acquiring one must not
//! allocate in the common case, so the pool pre-allocates a small batch
//! and recycles released counters after zeroing them.

use super::DeviceCounter;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const BATCH: usize = 8;

/// Free-list of counters for one device.
pub struct CounterPool {
    free: Mutex<Vec<DeviceCounter>>,
}

impl Default for CounterPool {
    fn default() -> Self {
        let free = (0..BATCH)
            .map(|_| DeviceCounter { cell: Arc::new(AtomicU32::new(0)) })
            .collect();
        CounterPool { free: Mutex::new(free) }
    }
}

impl CounterPool {
    /// Take a zeroed counter, allocating only when the batch ran dry.
    pub fn acquire(&self) -> DeviceCounter {
        self.free
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| DeviceCounter { cell: Arc::new(AtomicU32::new(0)) })
    }

    /// Return a counter to the pool.
    pub fn release(&self, counter: DeviceCounter) {
        counter.cell.store(0, Ordering::SeqCst);
        self.free.lock().unwrap().push(counter);
    }

    /// Counters currently available.
    pub fn available(&self) -> usize {
        self.free.lock().unwrap().len()
    }
}
