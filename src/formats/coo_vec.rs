//! Sorted coordinate vector tile.

use crate::types::{Element, Index};

/// Parallel `(ai, ax)` arrays sorted by index, no duplicates. This is the
/// canonical interchange format the algebra kernels read and produce.
#[derive(Clone, Debug, Default)]
pub struct CooVec<T> {
    pub ai: Vec<Index>,
    pub ax: Vec<T>,
}

impl<T: Element> CooVec<T> {
    /// Empty tile.
    pub fn new() -> Self {
        CooVec { ai: Vec::new(), ax: Vec::new() }
    }

    /// Tile holding the given parallel arrays; callers promise canonical
    /// order.
    pub fn from_parts(ai: Vec<Index>, ax: Vec<T>) -> Self {
        debug_assert_eq!(ai.len(), ax.len());
        debug_assert!(ai.windows(2).all(|w| w[0] < w[1]));
        CooVec { ai, ax }
    }

    /// Stored entry count.
    pub fn values(&self) -> usize {
        self.ai.len()
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.ai.is_empty()
    }

    /// Drop all entries, keeping capacity.
    pub fn clear(&mut self) {
        self.ai.clear();
        self.ax.clear();
    }

    /// Reserve room for `values` entries.
    pub fn resize(&mut self, values: usize) {
        self.ai.reserve(values.saturating_sub(self.ai.len()));
        self.ax.reserve(values.saturating_sub(self.ax.len()));
    }

    /// Append one entry; callers keep the canonical order.
    pub fn push(&mut self, i: Index, v: T) {
        debug_assert!(self.ai.last().is_none_or(|last| *last < i));
        self.ai.push(i);
        self.ax.push(v);
    }

    /// Entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Index, &T)> {
        self.ai.iter().copied().zip(self.ax.iter())
    }

    /// Rebuild from an unordered map tile, restoring canonical order.
    pub fn from_dok(dok: &super::DokVec<T>) -> Self {
        let mut entries: Vec<(Index, T)> = dok.map.iter().map(|(i, v)| (*i, *v)).collect();
        entries.sort_unstable_by_key(|(i, _)| *i);
        let mut coo = CooVec::new();
        coo.resize(entries.len());
        for (i, v) in entries {
            coo.ai.push(i);
            coo.ax.push(v);
        }
        coo
    }

    /// Rebuild from a dense tile, skipping fill entries.
    pub fn from_dense(dense: &super::DenseVec<T>) -> Self {
        let mut coo = CooVec::new();
        for (i, v) in dense.iter_present() {
            coo.ai.push(i);
            coo.ax.push(*v);
        }
        coo
    }
}
