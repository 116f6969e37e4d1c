//! Software reference backend.
//!
//! Implements the accelerator interface over host memory: persistent
//! buffers are plain byte vectors behind the opaque handle, scratch comes
//! from the per-device linear arena, and "compilation" records the
//! assembled source (rejecting incomplete programs). The backend cannot
//! launch kernels -- `enqueue` reports `NoAcceleration`, so device
//! algorithm versions that depend on kernel launch primitives are simply
//! never registered and dispatch falls back to the CPU.

use super::arena::LinearArena;
use super::counter::CounterPool;
use super::program::ProgramSource;
use super::{Accelerator, DeviceBuffer, DeviceCounter, Program};
use crate::status::Status;
use crate::types::Index;
use std::sync::{Arc, Mutex};

struct HostBuffer {
    data: Mutex<Vec<u8>>,
}

struct ScratchRange {
    arena: Arc<LinearArena>,
    offset: usize,
    generation: u64,
}

struct DeviceState {
    arena: Arc<LinearArena>,
    counters: CounterPool,
}

/// Host-memory accelerator with a configurable device count.
pub struct ReferenceAccelerator {
    devices: Vec<DeviceState>,
}

impl ReferenceAccelerator {
    /// Backend with `devices` virtual devices (at least one).
    pub fn new(devices: usize) -> Self {
        let devices = (0..devices.max(1))
            .map(|_| DeviceState {
                arena: Arc::new(LinearArena::default()),
                counters: CounterPool::default(),
            })
            .collect();
        ReferenceAccelerator { devices }
    }

    fn device(&self, index: usize) -> Result<&DeviceState, Status> {
        self.devices.get(index).ok_or(Status::DeviceNotFound)
    }

    /// Counters currently pooled on `device` (diagnostics).
    pub fn counters_available(&self, device: usize) -> Result<usize, Status> {
        Ok(self.device(device)?.counters.available())
    }
}

impl Accelerator for ReferenceAccelerator {
    fn name(&self) -> &str {
        "reference-cpu"
    }

    fn suffix(&self) -> &'static str {
        "__gpu_ref"
    }

    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn preferred_block_size(&self) -> Index {
        1 << 16
    }

    fn buffer_create(&self, device: usize, len: usize) -> Result<DeviceBuffer, Status> {
        self.device(device)?;
        Ok(DeviceBuffer {
            device,
            len,
            payload: Arc::new(HostBuffer { data: Mutex::new(vec![0; len]) }),
        })
    }

    fn buffer_write(&self, buf: &DeviceBuffer, offset: usize, src: &[u8]) -> Result<(), Status> {
        if let Some(host) = buf.payload.downcast_ref::<HostBuffer>() {
            let mut data = host.data.lock().unwrap();
            if offset + src.len() > data.len() {
                return Err(Status::InvalidArgument);
            }
            data[offset..offset + src.len()].copy_from_slice(src);
            return Ok(());
        }
        if let Some(scratch) = buf.payload.downcast_ref::<ScratchRange>() {
            if offset + src.len() > buf.len {
                return Err(Status::InvalidArgument);
            }
            return scratch.arena.write(scratch.offset + offset, scratch.generation, src);
        }
        Err(Status::InvalidArgument)
    }

    fn buffer_read(&self, buf: &DeviceBuffer, offset: usize, dst: &mut [u8]) -> Result<(), Status> {
        if let Some(host) = buf.payload.downcast_ref::<HostBuffer>() {
            let data = host.data.lock().unwrap();
            if offset + dst.len() > data.len() {
                return Err(Status::InvalidArgument);
            }
            dst.copy_from_slice(&data[offset..offset + dst.len()]);
            return Ok(());
        }
        if let Some(scratch) = buf.payload.downcast_ref::<ScratchRange>() {
            if offset + dst.len() > buf.len {
                return Err(Status::InvalidArgument);
            }
            return scratch.arena.read(scratch.offset + offset, scratch.generation, dst);
        }
        Err(Status::InvalidArgument)
    }

    fn buffer_copy(&self, src: &DeviceBuffer, dst: &DeviceBuffer) -> Result<(), Status> {
        if src.len != dst.len {
            return Err(Status::InvalidArgument);
        }
        let mut tmp = vec![0; src.len];
        self.buffer_read(src, 0, &mut tmp)?;
        self.buffer_write(dst, 0, &tmp)
    }

    fn scratch_alloc(&self, device: usize, len: usize) -> Result<DeviceBuffer, Status> {
        let state = self.device(device)?;
        let (offset, generation) = state.arena.alloc(len);
        Ok(DeviceBuffer {
            device,
            len,
            payload: Arc::new(ScratchRange { arena: Arc::clone(&state.arena), offset, generation }),
        })
    }

    fn scratch_reset(&self, device: usize) -> Result<(), Status> {
        self.device(device)?.arena.reset();
        Ok(())
    }

    fn counter_acquire(&self, device: usize) -> Result<DeviceCounter, Status> {
        Ok(self.device(device)?.counters.acquire())
    }

    fn counter_release(&self, device: usize, counter: DeviceCounter) {
        if let Ok(state) = self.device(device) {
            state.counters.release(counter);
        }
    }

    fn compile(&self, source: &ProgramSource) -> Result<Program, Status> {
        if source.incomplete || source.text.is_empty() {
            return Err(Status::CompilationError);
        }
        Ok(Program { key: source.key.clone(), payload: Arc::new(source.text.clone()) })
    }

    fn enqueue(
        &self,
        _program: &Program,
        _kernel: &str,
        _ndrange: [usize; 2],
        _args: &[&DeviceBuffer],
    ) -> Result<(), Status> {
        // Reference buffers are host memory; there is no launch path.
        Err(Status::NoAcceleration)
    }

    fn wait(&self, device: usize) -> Result<(), Status> {
        self.device(device).map(|_| ())
    }
}
