//! Matrix×vector multiplication over a `(mult, add)` semiring.

use super::{
    apply_vec_mask, commit_vec_coo, fan_out, fold_partials, mask_complement, mat_csr_tiles,
    vec_coo_tiles, vec_dense_tiles, vec_layout,
};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::{CooVec, DenseVec};
use crate::status::Status;
use crate::types::{Element, Index};
use std::collections::HashMap;
use std::marker::PhantomData;

/// `w[i] = Σⱼ m[i,j] · v[j]`: one subtask per inner product
/// `M[bi,bj] × v[bj]`, folded per output block in `bj` order. The
/// `DenseFactor` hint picks between O(1) dense lookup of `v[j]` and a
/// binary search in the sparse block.
#[derive(Default)]
pub(crate) struct MxVAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MxVAlgo<T> {
    fn name(&self) -> &'static str {
        "mxv_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MxV { w, mask, mult, add, m, v } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let mult_host = mult.host_same::<T>()?;
        let add_host = add.host_same::<T>()?;

        let m_tiles = mat_csr_tiles::<T>(m)?;
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
            .filter(|(_, bj)| v_tiles.contains_key(bj))
            .copied()
            .collect();
        items.sort_unstable();

        let partials = fan_out(ctx.lib, items, |(bi, bj)| {
            let tile = &m_tiles[&(bi, bj)];
            let dense = dense_blocks.get(&bj);
            let sparse = &v_tiles[&bj];

            let lookup = |j: Index| -> Option<T> {
                match dense {
                    Some(dense) => dense.is_present(j).then(|| dense.get(j)),
                    None => sparse.ai.binary_search(&j).ok().map(|pos| sparse.ax[pos]),
                }
            };

            let mut keys = Vec::new();
            let mut vals = Vec::new();
            for r in 0..tile.n_rows() {
                let (aj, ax) = tile.row(r);
                let mut acc: Option<T> = None;
                for (j, mv) in aj.iter().zip(ax.iter()) {
                    if let Some(vj) = lookup(*j) {
                        let p = mult_host(*mv, vj);
                        acc = Some(match acc {
                            Some(cur) => add_host(cur, p),
                            None => p,
                        });
                    }
                }
                if let Some(x) = acc {
                    keys.push(r);
                    vals.push(x);
                }
            }
            Ok((bi, bj, keys, vals))
        })?;

        let mut grouped: HashMap<Index, Vec<(Index, Vec<Index>, Vec<T>)>> = HashMap::new();
        for (bi, bj, keys, vals) in partials {
            if !keys.is_empty() {
                grouped.entry(bi).or_default().push((bj, keys, vals));
            }
        }
        let groups: Vec<_> = grouped.into_iter().collect();
        let mut tiles = fan_out(ctx.lib, groups, |(bi, parts)| {
            let (keys, vals) = fold_partials(parts, &*add_host);
            Ok((bi, CooVec::from_parts(keys, vals)))
        })?;

        apply_vec_mask(mask.as_ref(), mask_complement(ctx), &mut tiles)?;
        commit_vec_coo(w, tiles)
    }
}
