//! Vector handle.

use crate::formats::VecFormat;
use crate::library::Library;
use crate::status::Status;
use crate::storage::VecStorage;
use crate::types::{Element, Index, TypeInfo};
use anyhow::Result;
use std::any::Any;
use std::sync::{Arc, RwLock};

struct VectorInner {
    lib: Library,
    ty: TypeInfo,
    n_rows: Index,
    // RwLock<VecStorage<T>> behind the erasure; downcast by typed code.
    storage: Box<dyn Any + Send + Sync>,
}

/// An N-row sparse vector over one element type.
///
/// The handle is type-erased; algorithms recover the typed storage with
/// [`Vector::storage`]. Clones share the entity.
#[derive(Clone)]
pub struct Vector {
    inner: Arc<VectorInner>,
}

impl Vector {
    /// New vector of `n_rows` rows over element type `T`.
    pub fn new<T: Element>(lib: &Library, n_rows: Index) -> Result<Vector> {
        if n_rows == 0 {
            return Err(Status::InvalidArgument.into());
        }
        Ok(Vector {
            inner: Arc::new(VectorInner {
                lib: lib.clone(),
                ty: TypeInfo::of::<T>(),
                n_rows,
                storage: Box::new(RwLock::new(VecStorage::<T>::new(n_rows, lib.block_size()))),
            }),
        })
    }

    /// Row count.
    pub fn n_rows(&self) -> Index {
        self.inner.n_rows
    }

    /// Element type descriptor.
    pub fn type_info(&self) -> TypeInfo {
        self.inner.ty
    }

    /// Owning library.
    pub fn library(&self) -> &Library {
        &self.inner.lib
    }

    /// Typed storage; `InvalidArgument` when `T` does not match the
    /// handle's element type.
    pub(crate) fn storage<T: Element>(&self) -> Result<&RwLock<VecStorage<T>>, Status> {
        self.inner
            .storage
            .downcast_ref::<RwLock<VecStorage<T>>>()
            .ok_or(Status::InvalidArgument)
    }

    /// Run a storage-manager read transition under the write lock, then
    /// release it; subsequent readers see the validated format.
    pub(crate) fn validate_rw<T: Element>(&self, format: VecFormat) -> Result<(), Status> {
        let mgr = self.inner.lib.vector_manager::<T>();
        let mut st = self.storage::<T>()?.write().unwrap();
        mgr.validate_rw(format.code(), &mut st)
    }

    /// Read-write transition that leaves `format` the only valid one.
    pub(crate) fn validate_rwd<T: Element>(&self, format: VecFormat) -> Result<(), Status> {
        let mgr = self.inner.lib.vector_manager::<T>();
        let mut st = self.storage::<T>()?.write().unwrap();
        mgr.validate_rwd(format.code(), &mut st)
    }

    /// Prepare `format` for a from-scratch overwrite.
    pub(crate) fn validate_wd<T: Element>(&self, format: VecFormat) -> Result<(), Status> {
        let mgr = self.inner.lib.vector_manager::<T>();
        let mut st = self.storage::<T>()?.write().unwrap();
        mgr.validate_wd(format.code(), &mut st)
    }

    /// Ensure the `format` slot exists without touching validity.
    pub(crate) fn validate_ctor<T: Element>(&self, format: VecFormat) -> Result<(), Status> {
        let mgr = self.inner.lib.vector_manager::<T>();
        let mut st = self.storage::<T>()?.write().unwrap();
        mgr.validate_ctor(format.code(), &mut st)
    }

    /// True when both handles refer to the same entity.
    pub fn ptr_eq(&self, other: &Vector) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vector")
            .field("type", &self.inner.ty.name)
            .field("n_rows", &self.inner.n_rows)
            .finish()
    }
}
