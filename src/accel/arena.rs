//! Per-device linear arena for subtask scratch memory.
//!
//! Allocation hands back sub-ranges of one growing byte block; a reset at
//! the start of every top-level schedule submission bumps the generation
//! (invalidating outstanding handles) and shrinks the block back to one
//! page.

use crate::status::Status;
use std::sync::Mutex;

const PAGE: usize = 4096;

struct ArenaState {
    buf: Vec<u8>,
    head: usize,
    generation: u64,
}

/// Doubling linear allocator over one host byte block.
pub struct LinearArena {
    state: Mutex<ArenaState>,
}

impl Default for LinearArena {
    fn default() -> Self {
        LinearArena {
            state: Mutex::new(ArenaState { buf: vec![0; PAGE], head: 0, generation: 0 }),
        }
    }
}

impl LinearArena {
    /// Reserve `len` bytes; returns the range offset and the generation
    /// it belongs to.
    pub fn alloc(&self, len: usize) -> (usize, u64) {
        let mut s = self.state.lock().unwrap();
        while s.head + len > s.buf.len() {
            let grown = (s.buf.len() * 2).max(PAGE);
            s.buf.resize(grown, 0);
        }
        let offset = s.head;
        s.head += len;
        (offset, s.generation)
    }

    /// Invalidate all outstanding ranges and shrink back to one page.
    pub fn reset(&self) {
        let mut s = self.state.lock().unwrap();
        s.generation += 1;
        s.head = 0;
        s.buf.truncate(PAGE);
        s.buf.shrink_to(PAGE);
    }

    /// Copy into a live range; `InvalidState` when the range is stale.
    pub fn write(&self, offset: usize, generation: u64, src: &[u8]) -> Result<(), Status> {
        let mut s = self.state.lock().unwrap();
        if generation != s.generation {
            return Err(Status::InvalidState);
        }
        s.buf[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Copy out of a live range; `InvalidState` when the range is stale.
    pub fn read(&self, offset: usize, generation: u64, dst: &mut [u8]) -> Result<(), Status> {
        let s = self.state.lock().unwrap();
        if generation != s.generation {
            return Err(Status::InvalidState);
        }
        dst.copy_from_slice(&s.buf[offset..offset + dst.len()]);
        Ok(())
    }
}
