//! Sorted coordinate matrix tile.

use crate::types::{Element, Index};

/// Parallel `(ai, aj, ax)` arrays in lexicographic (row, col) order with
/// no duplicate coordinates.
#[derive(Clone, Debug, Default)]
pub struct Coo<T> {
    pub ai: Vec<Index>,
    pub aj: Vec<Index>,
    pub ax: Vec<T>,
}

impl<T: Element> Coo<T> {
    /// Empty tile.
    pub fn new() -> Self {
        Coo { ai: Vec::new(), aj: Vec::new(), ax: Vec::new() }
    }

    /// Tile holding the given parallel arrays; callers promise canonical
    /// order.
    pub fn from_parts(ai: Vec<Index>, aj: Vec<Index>, ax: Vec<T>) -> Self {
        debug_assert_eq!(ai.len(), aj.len());
        debug_assert_eq!(ai.len(), ax.len());
        Coo { ai, aj, ax }
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
        self.aj.clear();
        self.ax.clear();
    }

    /// Reserve room for `values` entries.
    pub fn resize(&mut self, values: usize) {
        self.ai.reserve(values.saturating_sub(self.ai.len()));
        self.aj.reserve(values.saturating_sub(self.aj.len()));
        self.ax.reserve(values.saturating_sub(self.ax.len()));
    }

    /// Append one entry; callers keep the canonical order.
    pub fn push(&mut self, i: Index, j: Index, v: T) {
        debug_assert!(
            self.ai.last().is_none_or(|li| (*li, *self.aj.last().unwrap()) < (i, j))
        );
        self.ai.push(i);
        self.aj.push(j);
        self.ax.push(v);
    }

    /// Entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Index, Index, &T)> {
        self.ai
            .iter()
            .copied()
            .zip(self.aj.iter().copied())
            .zip(self.ax.iter())
            .map(|((i, j), v)| (i, j, v))
    }

    /// Rebuild from an unordered map tile, restoring canonical order.
    pub fn from_dok(dok: &super::Dok<T>) -> Self {
        let mut entries: Vec<(Index, Index, T)> =
            dok.map.iter().map(|((i, j), v)| (*i, *j, *v)).collect();
        entries.sort_unstable_by_key(|(i, j, _)| (*i, *j));
        let mut coo = Coo::new();
        coo.resize(entries.len());
        for (i, j, v) in entries {
            coo.ai.push(i);
            coo.aj.push(j);
            coo.ax.push(v);
        }
        coo
    }

    /// Rebuild from a list-of-lists tile, preserving its ordering.
    pub fn from_lil(lil: &super::Lil<T>) -> Self {
        let mut coo = Coo::new();
        coo.resize(lil.values());
        for (i, j, v) in lil.iter() {
            coo.ai.push(i);
            coo.aj.push(j);
            coo.ax.push(*v);
        }
        coo
    }

    /// Rebuild from a compressed-rows tile, reconstructing row indices by
    /// `ap` expansion.
    pub fn from_csr(csr: &super::Csr<T>) -> Self {
        let mut coo = Coo::new();
        coo.resize(csr.values());
        for (i, j, v) in csr.iter() {
            coo.ai.push(i);
            coo.aj.push(j);
            coo.ax.push(*v);
        }
        coo
    }
}
