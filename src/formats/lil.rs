//! List-of-lists matrix tile.

use crate::types::{Element, Index};

/// Per-row ordered `(col, value)` lists, strictly increasing in the
/// column index.
#[derive(Clone, Debug, Default)]
pub struct Lil<T> {
    pub rows: Vec<Vec<(Index, T)>>,
}

impl<T: Element> Lil<T> {
    /// Empty tile; resize before use.
    pub fn new() -> Self {
        Lil { rows: Vec::new() }
    }

    /// Tile with `rows` empty row lists.
    pub fn with_rows(rows: Index) -> Self {
        Lil { rows: vec![Vec::new(); rows as usize] }
    }

    /// Number of row lists.
    pub fn n_rows(&self) -> Index {
        self.rows.len() as Index
    }

    /// Stored entry count.
    pub fn values(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Resize to `rows` lists, dropping entries.
    pub fn resize(&mut self, rows: Index) {
        self.rows.clear();
        self.rows.resize(rows as usize, Vec::new());
    }

    /// Empty every row list, keeping the row count.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.clear();
        }
    }

    /// Entries in canonical (row, col) order.
    pub fn iter(&self) -> impl Iterator<Item = (Index, Index, &T)> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().map(move |(j, v)| (i as Index, *j, v)))
    }

    /// Rebuild from an unordered map tile over `rows` row lists.
    pub fn from_dok(rows: Index, dok: &super::Dok<T>) -> Self {
        let mut lil = Lil::with_rows(rows);
        for ((i, j), v) in &dok.map {
            lil.rows[*i as usize].push((*j, *v));
        }
        for row in &mut lil.rows {
            row.sort_unstable_by_key(|(j, _)| *j);
        }
        lil
    }

    /// Rebuild from a sorted coordinate tile over `rows` row lists.
    pub fn from_coo(rows: Index, coo: &super::Coo<T>) -> Self {
        let mut lil = Lil::with_rows(rows);
        for (i, j, v) in coo.iter() {
            lil.rows[i as usize].push((j, *v));
        }
        lil
    }

    /// Rebuild from a compressed-rows tile.
    pub fn from_csr(csr: &super::Csr<T>) -> Self {
        let mut lil = Lil::with_rows(csr.n_rows());
        for (i, j, v) in csr.iter() {
            lil.rows[i as usize].push((j, *v));
        }
        lil
    }
}
