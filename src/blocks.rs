//! Block decomposition of entity index spaces.
//!
//! A vector of N rows splits into `⌈N/B⌉` row blocks; a matrix splits
//! into a `⌈M/B⌉ × ⌈N/B⌉` tile grid. Only non-empty tiles are
//! materialised, tracked in sparse index→tile maps. Local indices inside
//! a tile are always in `[0, block_size)`.

use crate::types::Index;
use std::collections::HashMap;

/// Block arithmetic for one entity.
#[derive(Clone, Copy, Debug)]
pub struct BlockLayout {
    pub n_rows: Index,
    pub n_cols: Index,
    pub block_size: Index,
}

impl BlockLayout {
    /// Layout of a vector (one logical column).
    pub fn vector(n_rows: Index, block_size: Index) -> Self {
        BlockLayout { n_rows, n_cols: 1, block_size }
    }

    /// Layout of a matrix.
    pub fn matrix(n_rows: Index, n_cols: Index, block_size: Index) -> Self {
        BlockLayout { n_rows, n_cols, block_size }
    }

    /// Number of row blocks.
    pub fn n_row_blocks(&self) -> Index {
        self.n_rows.div_ceil(self.block_size)
    }

    /// Number of column blocks.
    pub fn n_col_blocks(&self) -> Index {
        self.n_cols.div_ceil(self.block_size)
    }

    /// Rows covered by row block `b` (the last block may be short).
    pub fn row_block_len(&self, b: Index) -> Index {
        (self.n_rows - b * self.block_size).min(self.block_size)
    }

    /// Columns covered by column block `b`.
    pub fn col_block_len(&self, b: Index) -> Index {
        (self.n_cols - b * self.block_size).min(self.block_size)
    }

    /// Block owning global index `i` and the index local to it.
    pub fn split(&self, i: Index) -> (Index, Index) {
        (i / self.block_size, i % self.block_size)
    }

    /// Global index of `(block, local)`.
    pub fn join(&self, block: Index, local: Index) -> Index {
        block * self.block_size + local
    }
}

/// Sparse block-index→tile map of a vector.
#[derive(Clone, Debug)]
pub struct BlockMap<F> {
    pub tiles: HashMap<Index, F>,
}

impl<F> Default for BlockMap<F> {
    fn default() -> Self {
        BlockMap { tiles: HashMap::new() }
    }
}

impl<F> BlockMap<F> {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all tiles.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Tile at `block`, if materialised.
    pub fn get(&self, block: Index) -> Option<&F> {
        self.tiles.get(&block)
    }

    /// Insert or replace the tile at `block`.
    pub fn insert(&mut self, block: Index, tile: F) {
        self.tiles.insert(block, tile);
    }

    /// Block indices in increasing order (deterministic walks).
    pub fn sorted_blocks(&self) -> Vec<Index> {
        let mut keys: Vec<Index> = self.tiles.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

/// Sparse (row-block, col-block)→tile map of a matrix.
#[derive(Clone, Debug)]
pub struct TileMap<F> {
    pub tiles: HashMap<(Index, Index), F>,
}

impl<F> Default for TileMap<F> {
    fn default() -> Self {
        TileMap { tiles: HashMap::new() }
    }
}

impl<F> TileMap<F> {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all tiles.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Tile at `(bi, bj)`, if materialised.
    pub fn get(&self, bi: Index, bj: Index) -> Option<&F> {
        self.tiles.get(&(bi, bj))
    }

    /// Insert or replace the tile at `(bi, bj)`.
    pub fn insert(&mut self, bi: Index, bj: Index, tile: F) {
        self.tiles.insert((bi, bj), tile);
    }

    /// Tile coordinates in lexicographic order (deterministic walks).
    pub fn sorted_tiles(&self) -> Vec<(Index, Index)> {
        let mut keys: Vec<(Index, Index)> = self.tiles.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}
