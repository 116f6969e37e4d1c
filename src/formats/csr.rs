//! Compressed-sparse-rows matrix tile.

use crate::types::{Element, Index};

/// The classic three-array layout: `ap` of length `rows + 1` and
/// non-decreasing, `aj` strictly increasing inside each row, `ax`
/// parallel to `aj`.
#[derive(Clone, Debug, Default)]
pub struct Csr<T> {
    pub ap: Vec<Index>,
    pub aj: Vec<Index>,
    pub ax: Vec<T>,
}

impl<T: Element> Csr<T> {
    /// Empty tile; resize before use.
    pub fn new() -> Self {
        Csr { ap: vec![0], aj: Vec::new(), ax: Vec::new() }
    }

    /// Tile with `rows` empty rows.
    pub fn with_rows(rows: Index) -> Self {
        Csr { ap: vec![0; rows as usize + 1], aj: Vec::new(), ax: Vec::new() }
    }

    /// Number of rows.
    pub fn n_rows(&self) -> Index {
        (self.ap.len() - 1) as Index
    }

    /// Stored entry count.
    pub fn values(&self) -> usize {
        self.aj.len()
    }

    /// Resize to `rows` empty rows, dropping entries.
    pub fn resize(&mut self, rows: Index) {
        self.ap.clear();
        self.ap.resize(rows as usize + 1, 0);
        self.aj.clear();
        self.ax.clear();
    }

    /// Drop all entries, keeping the row count.
    pub fn clear(&mut self) {
        let rows = self.n_rows();
        self.resize(rows);
    }

    /// Column/value slices of one row.
    pub fn row(&self, i: Index) -> (&[Index], &[T]) {
        let lo = self.ap[i as usize] as usize;
        let hi = self.ap[i as usize + 1] as usize;
        (&self.aj[lo..hi], &self.ax[lo..hi])
    }

    /// Entries in canonical order, reconstructing row indices from `ap`.
    pub fn iter(&self) -> impl Iterator<Item = (Index, Index, &T)> {
        (0..self.n_rows()).flat_map(move |i| {
            let (aj, ax) = self.row(i);
            aj.iter().copied().zip(ax.iter()).map(move |(j, v)| (i, j, v))
        })
    }

    /// Build from entries already in canonical order over `rows` rows.
    fn from_sorted(rows: Index, entries: impl Iterator<Item = (Index, Index, T)>) -> Self {
        let mut csr = Csr::with_rows(rows);
        for (i, j, v) in entries {
            csr.ap[i as usize + 1] += 1;
            csr.aj.push(j);
            csr.ax.push(v);
        }
        for r in 0..rows as usize {
            csr.ap[r + 1] += csr.ap[r];
        }
        csr
    }

    /// Rebuild from an unordered map tile over `rows` rows.
    pub fn from_dok(rows: Index, dok: &super::Dok<T>) -> Self {
        let coo = super::Coo::from_dok(dok);
        Csr::from_sorted(rows, coo.iter().map(|(i, j, v)| (i, j, *v)))
    }

    /// Rebuild from a list-of-lists tile.
    pub fn from_lil(lil: &super::Lil<T>) -> Self {
        Csr::from_sorted(lil.n_rows(), lil.iter().map(|(i, j, v)| (i, j, *v)))
    }

    /// Rebuild from a sorted coordinate tile over `rows` rows.
    pub fn from_coo(rows: Index, coo: &super::Coo<T>) -> Self {
        Csr::from_sorted(rows, coo.iter().map(|(i, j, v)| (i, j, *v)))
    }
}
