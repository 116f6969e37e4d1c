//! Vector×matrix multiplication over a `(mult, add)` semiring.

use super::{
    apply_vec_mask, commit_vec_coo, fan_out, fold_partials, mask_complement, mat_csr_tiles,
    mat_layout, vec_coo_tiles, vec_dense_tiles, vec_layout,
};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::{CooVec, DenseVec};
use crate::status::Status;
use crate::types::{Element, Index};
use std::collections::HashMap;
use std::marker::PhantomData;

/// `w[j] = Σᵢ v[i] · m[i,j]`: one subtask per inner product
/// `v[bk] × M[bk,bj]`, folded per output block in `bk` order.
///
/// The `DenseFactor` hint, when set, gates traversal of each vector
/// block: a populous block is densified and the matrix tile is walked
/// row by row; a sparse block drives the walk by its stored entries.
#[derive(Default)]
pub(crate) struct VxMAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for VxMAlgo<T> {
    fn name(&self) -> &'static str {
        "vxm_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VxM { w, mask, mult, add, v, m } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let mult_host = mult.host_same::<T>()?;
        let add_host = add.host_same::<T>()?;

        let m_tiles = mat_csr_tiles::<T>(m)?;
        let m_layout = mat_layout::<T>(m)?;
        let v_tiles = vec_coo_tiles::<T>(v)?;
        let v_layout = vec_layout::<T>(v)?;

        let mut dense_blocks: HashMap<Index, DenseVec<T>> = HashMap::new();
        if T::HAS_VALUES {
            let mut wanted = Vec::new();
            for (b, tile) in &v_tiles {
                if ctx.node.desc.prefers_dense(tile.values(), v_layout.row_block_len(*b))? {
                    wanted.push(*b);
                }
            }
            if !wanted.is_empty() {
                let all = vec_dense_tiles::<T>(v)?;
                for b in wanted {
                    if let Some(tile) = all.get(&b) {
                        dense_blocks.insert(b, tile.clone());
                    }
                }
            }
        }

        let mut items: Vec<(Index, Index)> = m_tiles
            .keys()
            .filter(|(bk, _)| v_tiles.contains_key(bk))
            .copied()
            .collect();
        items.sort_unstable();

        let partials = fan_out(ctx.lib, items, |(bk, bj)| {
            let tile = &m_tiles[&(bk, bj)];
            let cols = m_layout.col_block_len(bj);
            let mut acc: Vec<Option<T>> = vec![None; cols as usize];
            let mut touched: Vec<Index> = Vec::new();

            let mut scatter = |i: Index, vi: T| {
                let (aj, ax) = tile.row(i);
                for (j, mv) in aj.iter().zip(ax.iter()) {
                    let p = mult_host(vi, *mv);
                    let slot = &mut acc[*j as usize];
                    match slot.take() {
                        Some(cur) => *slot = Some(add_host(cur, p)),
                        None => {
                            *slot = Some(p);
                            touched.push(*j);
                        }
                    }
                }
            };

            match dense_blocks.get(&bk) {
                Some(dense) => {
                    for i in 0..tile.n_rows() {
                        if dense.is_present(i) {
                            scatter(i, dense.get(i));
                        }
                    }
                }
                None => {
                    for (i, vi) in v_tiles[&bk].iter() {
                        scatter(i, *vi);
                    }
                }
            }

            touched.sort_unstable();
            let mut keys = Vec::with_capacity(touched.len());
            let mut vals = Vec::with_capacity(touched.len());
            for j in touched {
                if let Some(x) = acc[j as usize].take() {
                    keys.push(j);
                    vals.push(x);
                }
            }
            Ok((bj, bk, keys, vals))
        })?;

        let mut grouped: HashMap<Index, Vec<(Index, Vec<Index>, Vec<T>)>> = HashMap::new();
        for (bj, bk, keys, vals) in partials {
            if !keys.is_empty() {
                grouped.entry(bj).or_default().push((bk, keys, vals));
            }
        }
        let groups: Vec<_> = grouped.into_iter().collect();
        let mut tiles = fan_out(ctx.lib, groups, |(bj, parts)| {
            let (keys, vals) = fold_partials(parts, &*add_host);
            Ok((bj, CooVec::from_parts(keys, vals)))
        })?;

        apply_vec_mask(mask.as_ref(), mask_complement(ctx), &mut tiles)?;
        commit_vec_coo(w, tiles)
    }
}
