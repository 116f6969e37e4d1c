//! The accelerator-facing interface.
//!
//! The core consumes only this small surface: opaque byte buffers,
//! per-device scratch from a linear arena, a pool of device counters, and
//! program compilation from assembled textual sources. Nothing in the
//! engine assumes a concrete backend; the crate ships a software
//! [`reference::ReferenceAccelerator`] that implements the interface over
//! host memory so the device-facing code paths stay real and testable.

pub mod arena;
pub mod counter;
pub mod program;
pub mod reference;

use crate::status::Status;
use crate::types::Index;
use std::any::Any;
use std::sync::Arc;

/// Opaque handle to a device-owned byte buffer.
///
/// The payload is backend-defined; dropping the last handle releases the
/// memory. Handles are cheap clones sharing one allocation.
#[derive(Clone)]
pub struct DeviceBuffer {
    /// Owning device index.
    pub device: usize,
    /// Byte length.
    pub len: usize,
    pub(crate) payload: Arc<dyn Any + Send + Sync>,
}

impl std::fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("device", &self.device)
            .field("len", &self.len)
            .finish()
    }
}

/// A device-side atomic counter drawn from the per-device pool.
#[derive(Clone)]
pub struct DeviceCounter {
    pub(crate) cell: Arc<std::sync::atomic::AtomicU32>,
}

impl DeviceCounter {
    /// Current value.
    pub fn load(&self) -> u32 {
        self.cell.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Atomically add and return the previous value.
    pub fn fetch_add(&self, v: u32) -> u32 {
        self.cell.fetch_add(v, std::sync::atomic::Ordering::SeqCst)
    }
}

/// A compiled device program handle.
#[derive(Clone)]
pub struct Program {
    /// Cache key of the assembled source.
    pub key: String,
    #[allow(dead_code)]
    pub(crate) payload: Arc<dyn Any + Send + Sync>,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program").field("key", &self.key).finish()
    }
}

/// Backend contract consumed by the core.
pub trait Accelerator: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Dispatch-key suffix of this backend's algorithm registrations.
    fn suffix(&self) -> &'static str;

    /// Number of usable devices.
    fn device_count(&self) -> usize;

    /// Tile size the backend prefers to operate on.
    fn preferred_block_size(&self) -> Index;

    /// Allocate a persistent buffer of `len` bytes on `device`.
    fn buffer_create(&self, device: usize, len: usize) -> Result<DeviceBuffer, Status>;

    /// Copy host bytes into a buffer at `offset`.
    fn buffer_write(&self, buf: &DeviceBuffer, offset: usize, src: &[u8]) -> Result<(), Status>;

    /// Copy buffer bytes at `offset` back to the host.
    fn buffer_read(&self, buf: &DeviceBuffer, offset: usize, dst: &mut [u8]) -> Result<(), Status>;

    /// Device-to-device copy of `src` into `dst` (equal lengths).
    fn buffer_copy(&self, src: &DeviceBuffer, dst: &DeviceBuffer) -> Result<(), Status>;

    /// Allocate per-subtask scratch from the device's linear arena; the
    /// handle dies at the next [`Accelerator::scratch_reset`].
    fn scratch_alloc(&self, device: usize, len: usize) -> Result<DeviceBuffer, Status>;

    /// Reset the device arena (start of a top-level schedule submission).
    fn scratch_reset(&self, device: usize) -> Result<(), Status>;

    /// Acquire a counter from the device pool.
    fn counter_acquire(&self, device: usize) -> Result<DeviceCounter, Status>;

    /// Return a counter to the device pool.
    fn counter_release(&self, device: usize, counter: DeviceCounter);

    /// Compile an assembled program source.
    fn compile(&self, source: &program::ProgramSource) -> Result<Program, Status>;

    /// Launch `kernel` from a compiled program over a 2-D range.
    fn enqueue(
        &self,
        program: &Program,
        kernel: &str,
        ndrange: [usize; 2],
        args: &[&DeviceBuffer],
    ) -> Result<(), Status>;

    /// Block until all enqueued work on `device` completed.
    fn wait(&self, device: usize) -> Result<(), Status>;
}
