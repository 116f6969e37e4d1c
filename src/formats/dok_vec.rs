//! Dictionary-of-keys vector tile.

use crate::types::{Element, Index};
use std::collections::HashMap;

/// Unordered index→value map; the cheap append target.
#[derive(Clone, Debug, Default)]
pub struct DokVec<T> {
    pub map: HashMap<Index, T>,
}

impl<T: Element> DokVec<T> {
    /// Empty tile.
    pub fn new() -> Self {
        DokVec { map: HashMap::new() }
    }

    /// Stored entry count.
    pub fn values(&self) -> usize {
        self.map.len()
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Insert or overwrite one entry.
    pub fn set(&mut self, i: Index, v: T) {
        self.map.insert(i, v);
    }

    /// Reserve room for `values` entries.
    pub fn resize(&mut self, values: usize) {
        self.map.reserve(values.saturating_sub(self.map.len()));
    }

    /// Rebuild from a sorted coordinate tile.
    pub fn from_coo(coo: &super::CooVec<T>) -> Self {
        let mut dok = DokVec::new();
        dok.resize(coo.values());
        for (i, v) in coo.iter() {
            dok.map.insert(i, *v);
        }
        dok
    }

    /// Rebuild from a dense tile, skipping fill entries.
    pub fn from_dense(dense: &super::DenseVec<T>) -> Self {
        let mut dok = DokVec::new();
        for (i, v) in dense.iter_present() {
            dok.map.insert(i, *v);
        }
        dok
    }
}
