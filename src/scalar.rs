//! Scalar handle.

use crate::library::Library;
use crate::status::Status;
use crate::types::{Element, TypeInfo};
use anyhow::Result;
use std::any::Any;
use std::sync::{Arc, RwLock};

struct ScalarInner {
    lib: Library,
    ty: TypeInfo,
    value: RwLock<Option<Box<dyn Any + Send + Sync>>>,
}

/// A typed cell holding at most one value.
///
/// Created empty; filled by reduce nodes or [`Scalar::set`]; reading an
/// empty scalar yields [`Status::NoValue`]. Clones share the cell.
#[derive(Clone)]
pub struct Scalar {
    inner: Arc<ScalarInner>,
}

impl Scalar {
    /// Empty scalar of element type `T`.
    pub fn new<T: Element>(lib: &Library) -> Scalar {
        Scalar {
            inner: Arc::new(ScalarInner {
                lib: lib.clone(),
                ty: TypeInfo::of::<T>(),
                value: RwLock::new(None),
            }),
        }
    }

    /// Scalar holding `v`.
    pub fn from_value<T: Element>(lib: &Library, v: T) -> Scalar {
        let s = Scalar::new::<T>(lib);
        s.inner.value.write().unwrap().replace(Box::new(v));
        s
    }

    /// Element type descriptor.
    pub fn type_info(&self) -> TypeInfo {
        self.inner.ty
    }

    /// Owning library.
    pub fn library(&self) -> &Library {
        &self.inner.lib
    }

    /// True when a value is stored.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().unwrap().is_some()
    }

    /// Store `v`; fails with `InvalidArgument` on a type mismatch.
    pub fn set<T: Element>(&self, v: T) -> Result<()> {
        if !self.inner.ty.matches(&TypeInfo::of::<T>()) {
            return Err(Status::InvalidArgument.into());
        }
        self.inner.value.write().unwrap().replace(Box::new(v));
        Ok(())
    }

    /// Read the stored value; `NoValue` when empty, `InvalidArgument` on
    /// a type mismatch.
    pub fn get<T: Element>(&self) -> Result<T> {
        if !self.inner.ty.matches(&TypeInfo::of::<T>()) {
            return Err(Status::InvalidArgument.into());
        }
        let guard = self.inner.value.read().unwrap();
        let boxed = guard.as_ref().ok_or(Status::NoValue)?;
        let v = boxed.downcast_ref::<T>().ok_or(Status::InvalidArgument)?;
        Ok(*v)
    }

    /// Drop the stored value, leaving the scalar empty.
    pub fn clear(&self) {
        self.inner.value.write().unwrap().take();
    }

    /// True when both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Scalar) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scalar")
            .field("type", &self.inner.ty.name)
            .field("has_value", &self.has_value())
            .finish()
    }
}
