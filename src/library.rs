//! The library context: configuration, worker pool, registries and the
//! optional accelerator.
//!
//! Everything that the original kept in a global singleton lives here and
//! is passed explicitly: entity factories take a [`Library`], nodes reach
//! it through their entities, and algorithms through the dispatch
//! context. The handle is a cheap clone; all clones share one inner
//! state.

use crate::accel::program::ProgramCache;
use crate::accel::reference::ReferenceAccelerator;
use crate::accel::Accelerator;
use crate::dispatch::AlgoRegistry;
use crate::profiling::TimeProfiler;
use crate::status::Status;
use crate::storage::manager::StorageManager;
use crate::storage::matrix::build_matrix_manager;
use crate::storage::vector::build_vector_manager;
use crate::storage::{MatStorage, VecStorage};
use crate::types::{Element, Index};
use anyhow::{Context, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Default block size without an accelerator: one MiB of indices.
pub const DEFAULT_BLOCK_SIZE: Index = 1 << 18;

/// Execution backend selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Software accelerator over host memory (the default).
    ReferenceCpu,
    /// OpenCL devices; not compiled into this build.
    OpenCl,
    /// CUDA devices; not compiled into this build.
    Cuda,
    /// No accelerator at all; pure CPU dispatch.
    None,
}

/// Sink for library diagnostics: `(status, message, file, function, line)`.
pub type MessageCallback = Arc<dyn Fn(Status, &str, &str, &str, u32) + Send + Sync>;

/// Init-time settings; every field optional.
#[derive(Clone, Default)]
pub struct LibraryConfig {
    pub backend: Option<Backend>,
    pub workers: Option<usize>,
    pub block_factor: Option<usize>,
    pub block_size: Option<Index>,
    pub opencl_vendor: Option<String>,
    pub opencl_devices: Option<usize>,
    pub cuda_devices: Option<usize>,
    pub message_callback: Option<MessageCallback>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum EntityKind {
    Vector,
    Matrix,
}

#[derive(Default)]
struct ManagerCache {
    map: RwLock<HashMap<(TypeId, EntityKind), Arc<dyn Any + Send + Sync>>>,
}

pub(crate) struct LibraryInner {
    backend: Backend,
    workers: usize,
    block_size: Index,
    pool: rayon::ThreadPool,
    registry: AlgoRegistry,
    managers: ManagerCache,
    accelerator: Option<Arc<dyn Accelerator>>,
    programs: ProgramCache,
    profiler: TimeProfiler,
    callback: Option<MessageCallback>,
}

/// Shared library context handle.
#[derive(Clone)]
pub struct Library {
    pub(crate) inner: Arc<LibraryInner>,
}

impl Library {
    /// Initialise a library from `config`.
    ///
    /// Registration order matches the original: accelerator first (its
    /// preferred block size feeds the layout), then the CPU algorithm
    /// table, then the accelerator algorithm table.
    pub fn new(config: LibraryConfig) -> Result<Library> {
        let backend = config.backend.unwrap_or(Backend::ReferenceCpu);
        let accelerator: Option<Arc<dyn Accelerator>> = match backend {
            Backend::ReferenceCpu => {
                let devices = config
                    .opencl_devices
                    .or(config.cuda_devices)
                    .unwrap_or(1)
                    .max(1);
                Some(Arc::new(ReferenceAccelerator::new(devices)))
            }
            Backend::None => None,
            Backend::OpenCl | Backend::Cuda => {
                return Err(Status::NoAcceleration)
                    .context("backend not compiled into this build");
            }
        };

        let workers = config.workers.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("building worker pool")?;

        let factor = config.block_factor.unwrap_or(1).max(1) as Index;
        let base = accelerator
            .as_ref()
            .map(|a| a.preferred_block_size())
            .unwrap_or(DEFAULT_BLOCK_SIZE);
        let block_size = config.block_size.unwrap_or(base * factor).max(1);

        let registry = AlgoRegistry::default();
        let lib = Library {
            inner: Arc::new(LibraryInner {
                backend,
                workers,
                block_size,
                pool,
                registry,
                managers: ManagerCache::default(),
                accelerator,
                programs: ProgramCache::default(),
                profiler: TimeProfiler::default(),
                callback: config.message_callback,
            }),
        };

        crate::algos::register_cpu(&lib);
        if lib.inner.accelerator.is_some() {
            crate::algos::register_acc(&lib);
        }
        crate::lib_log!(
            lib,
            Status::Ok,
            "library initialised: backend {backend:?}, {workers} workers, block size {block_size}"
        );
        Ok(lib)
    }

    /// Library with all defaults.
    pub fn with_defaults() -> Result<Library> {
        Library::new(LibraryConfig::default())
    }

    /// Configured backend.
    pub fn backend(&self) -> Backend {
        self.inner.backend
    }

    /// Worker count of the pool.
    pub fn workers(&self) -> usize {
        self.inner.workers
    }

    /// Tile size of every entity created from this library.
    pub fn block_size(&self) -> Index {
        self.inner.block_size
    }

    /// The worker pool.
    pub fn pool(&self) -> &rayon::ThreadPool {
        &self.inner.pool
    }

    /// The algorithm registry.
    pub fn registry(&self) -> &AlgoRegistry {
        &self.inner.registry
    }

    /// The accelerator, when a backend is active.
    pub fn accelerator(&self) -> Option<&Arc<dyn Accelerator>> {
        self.inner.accelerator.as_ref()
    }

    /// The device program cache.
    pub fn programs(&self) -> &ProgramCache {
        &self.inner.programs
    }

    /// The time profiler.
    pub fn profiler(&self) -> &TimeProfiler {
        &self.inner.profiler
    }

    /// Storage manager for vectors of `T`, built once and cached.
    pub(crate) fn vector_manager<T: Element>(&self) -> Arc<StorageManager<VecStorage<T>>> {
        self.manager::<T, _>(EntityKind::Vector, || {
            build_vector_manager::<T>(self.inner.accelerator.clone())
        })
    }

    /// Storage manager for matrices of `T`, built once and cached.
    pub(crate) fn matrix_manager<T: Element>(&self) -> Arc<StorageManager<MatStorage<T>>> {
        self.manager::<T, _>(EntityKind::Matrix, || {
            build_matrix_manager::<T>(self.inner.accelerator.clone())
        })
    }

    fn manager<T: Element, S: Send + Sync + 'static>(
        &self,
        kind: EntityKind,
        build: impl FnOnce() -> StorageManager<S>,
    ) -> Arc<StorageManager<S>> {
        let key = (TypeId::of::<T>(), kind);
        if let Some(hit) = self.inner.managers.map.read().unwrap().get(&key) {
            if let Some(mgr) = hit.clone().downcast::<StorageManager<S>>().ok() {
                return mgr;
            }
        }
        let built = Arc::new(build());
        let mut map = self.inner.managers.map.write().unwrap();
        map.entry(key).or_insert_with(|| built.clone());
        built
    }

    /// Feed one diagnostic to the message callback and the log facade.
    pub fn log_message(&self, status: Status, msg: &str, file: &str, function: &str, line: u32) {
        if let Some(callback) = &self.inner.callback {
            callback(status, msg, file, function, line);
        }
        match status {
            Status::Ok => log::debug!("[{file}:{line}] {function}: {msg}"),
            _ => log::warn!("[{file}:{line}] {function}: {status}: {msg}"),
        }
    }
}

/// Log through a [`Library`] with source-location context.
#[macro_export]
macro_rules! lib_log {
    ($lib:expr, $status:expr, $($arg:tt)+) => {
        $lib.log_message($status, &format!($($arg)+), file!(), module_path!(), line!())
    };
}
