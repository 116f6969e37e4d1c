//! Dictionary-of-keys matrix tile.

use crate::types::{Element, Index};
use std::collections::HashMap;

/// Unordered (row, col)→value map.
#[derive(Clone, Debug, Default)]
pub struct Dok<T> {
    pub map: HashMap<(Index, Index), T>,
}

impl<T: Element> Dok<T> {
    /// Empty tile.
    pub fn new() -> Self {
        Dok { map: HashMap::new() }
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
    pub fn set(&mut self, i: Index, j: Index, v: T) {
        self.map.insert((i, j), v);
    }

    /// Reserve room for `values` entries.
    pub fn resize(&mut self, values: usize) {
        self.map.reserve(values.saturating_sub(self.map.len()));
    }

    /// Rebuild from a list-of-lists tile.
    pub fn from_lil(lil: &super::Lil<T>) -> Self {
        let mut dok = Dok::new();
        dok.resize(lil.values());
        for (i, j, v) in lil.iter() {
            dok.map.insert((i, j), *v);
        }
        dok
    }

    /// Rebuild from a sorted coordinate tile.
    pub fn from_coo(coo: &super::Coo<T>) -> Self {
        let mut dok = Dok::new();
        dok.resize(coo.values());
        for (i, j, v) in coo.iter() {
            dok.map.insert((i, j), *v);
        }
        dok
    }

    /// Rebuild from a compressed-rows tile.
    pub fn from_csr(csr: &super::Csr<T>) -> Self {
        let mut dok = Dok::new();
        dok.resize(csr.values());
        for (i, j, v) in csr.iter() {
            dok.map.insert((i, j), *v);
        }
        dok
    }
}
