//! Dense vector tile with a fill-value convention.

use crate::types::{Element, Index};

/// Fixed-length value array; entries equal to the fill value (the element
/// type's default) are logically absent. The `values` count is maintained
/// by the mutators.
#[derive(Clone, Debug, Default)]
pub struct DenseVec<T> {
    pub ax: Vec<T>,
    values: usize,
}

impl<T: Element> DenseVec<T> {
    /// Empty tile; resize before use.
    pub fn new() -> Self {
        DenseVec { ax: Vec::new(), values: 0 }
    }

    /// Tile of `len` fill entries.
    pub fn with_len(len: Index) -> Self {
        DenseVec { ax: vec![T::default(); len as usize], values: 0 }
    }

    /// Logical length of the tile.
    pub fn len(&self) -> Index {
        self.ax.len() as Index
    }

    /// True when the tile has zero slots.
    pub fn is_empty(&self) -> bool {
        self.ax.is_empty()
    }

    /// Count of non-fill entries.
    pub fn values(&self) -> usize {
        self.values
    }

    /// Resize to `len` slots, resetting every slot to fill.
    pub fn resize(&mut self, len: Index) {
        self.ax.clear();
        self.ax.resize(len as usize, T::default());
        self.values = 0;
    }

    /// Reset every slot to fill without changing the length.
    pub fn clear(&mut self) {
        self.ax.fill(T::default());
        self.values = 0;
    }

    /// Read one slot; fill means absent.
    pub fn get(&self, i: Index) -> T {
        self.ax[i as usize]
    }

    /// True when slot `i` holds a present entry.
    pub fn is_present(&self, i: Index) -> bool {
        self.ax[i as usize] != T::default()
    }

    /// Write one slot, keeping the `values` count consistent.
    pub fn set(&mut self, i: Index, v: T) {
        let slot = &mut self.ax[i as usize];
        let was = *slot != T::default();
        let is = v != T::default();
        *slot = v;
        match (was, is) {
            (false, true) => self.values += 1,
            (true, false) => self.values -= 1,
            _ => {}
        }
    }

    /// Present entries in index order.
    pub fn iter_present(&self) -> impl Iterator<Item = (Index, &T)> {
        self.ax
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != T::default())
            .map(|(i, v)| (i as Index, v))
    }

    /// Rebuild from an unordered map tile over `len` slots.
    pub fn from_dok(len: Index, dok: &super::DokVec<T>) -> Self {
        let mut dense = DenseVec::with_len(len);
        for (i, v) in &dok.map {
            dense.set(*i, *v);
        }
        dense
    }

    /// Rebuild from a sorted coordinate tile over `len` slots.
    pub fn from_coo(len: Index, coo: &super::CooVec<T>) -> Self {
        let mut dense = DenseVec::with_len(len);
        for (i, v) in coo.iter() {
            dense.set(i, *v);
        }
        dense
    }
}
