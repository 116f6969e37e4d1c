//! Matrix handle.

use crate::formats::MatFormat;
use crate::library::Library;
use crate::status::Status;
use crate::storage::MatStorage;
use crate::types::{Element, Index, TypeInfo};
use anyhow::Result;
use std::any::Any;
use std::sync::{Arc, RwLock};

struct MatrixInner {
    lib: Library,
    ty: TypeInfo,
    n_rows: Index,
    n_cols: Index,
    // RwLock<MatStorage<T>> behind the erasure; downcast by typed code.
    storage: Box<dyn Any + Send + Sync>,
}

/// An M×N sparse matrix over one element type.
#[derive(Clone)]
pub struct Matrix {
    inner: Arc<MatrixInner>,
}

impl Matrix {
    /// New matrix of `n_rows × n_cols` over element type `T`.
    pub fn new<T: Element>(lib: &Library, n_rows: Index, n_cols: Index) -> Result<Matrix> {
        if n_rows == 0 || n_cols == 0 {
            return Err(Status::InvalidArgument.into());
        }
        Ok(Matrix {
            inner: Arc::new(MatrixInner {
                lib: lib.clone(),
                ty: TypeInfo::of::<T>(),
                n_rows,
                n_cols,
                storage: Box::new(RwLock::new(MatStorage::<T>::new(
                    n_rows,
                    n_cols,
                    lib.block_size(),
                ))),
            }),
        })
    }

    /// Row count.
    pub fn n_rows(&self) -> Index {
        self.inner.n_rows
    }

    /// Column count.
    pub fn n_cols(&self) -> Index {
        self.inner.n_cols
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
    pub(crate) fn storage<T: Element>(&self) -> Result<&RwLock<MatStorage<T>>, Status> {
        self.inner
            .storage
            .downcast_ref::<RwLock<MatStorage<T>>>()
            .ok_or(Status::InvalidArgument)
    }

    /// Run a storage-manager read transition under the write lock.
    pub(crate) fn validate_rw<T: Element>(&self, format: MatFormat) -> Result<(), Status> {
        let mgr = self.inner.lib.matrix_manager::<T>();
        let mut st = self.storage::<T>()?.write().unwrap();
        mgr.validate_rw(format.code(), &mut st)
    }

    /// Read-write transition that leaves `format` the only valid one.
    pub(crate) fn validate_rwd<T: Element>(&self, format: MatFormat) -> Result<(), Status> {
        let mgr = self.inner.lib.matrix_manager::<T>();
        let mut st = self.storage::<T>()?.write().unwrap();
        mgr.validate_rwd(format.code(), &mut st)
    }

    /// Prepare `format` for a from-scratch overwrite.
    pub(crate) fn validate_wd<T: Element>(&self, format: MatFormat) -> Result<(), Status> {
        let mgr = self.inner.lib.matrix_manager::<T>();
        let mut st = self.storage::<T>()?.write().unwrap();
        mgr.validate_wd(format.code(), &mut st)
    }

    /// Ensure the `format` slot exists without touching validity.
    pub(crate) fn validate_ctor<T: Element>(&self, format: MatFormat) -> Result<(), Status> {
        let mgr = self.inner.lib.matrix_manager::<T>();
        let mut st = self.storage::<T>()?.write().unwrap();
        mgr.validate_ctor(format.code(), &mut st)
    }

    /// True when both handles refer to the same entity.
    pub fn ptr_eq(&self, other: &Matrix) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matrix")
            .field("type", &self.inner.ty.name)
            .field("n_rows", &self.inner.n_rows)
            .field("n_cols", &self.inner.n_cols)
            .finish()
    }
}
