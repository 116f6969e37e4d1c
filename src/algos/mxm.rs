//! Matrix×matrix multiplication over a `(mult, add)` semiring, in the
//! plain and transposed-B forms.
//!
//! Stage one produces one subtask per inner tile product
//! `A[bi,bk] × B[bk,bj]`; stage two folds the partial tiles of each
//! output position in `bk` order with the add op.

use super::{
    apply_mat_mask, commit_mat_coo, coo_from_pairs, coo_pairs, fan_out, fold_partials,
    mask_complement, mat_coo_tiles, mat_csr_tiles, mat_layout,
};
use crate::blocks::BlockLayout;
use crate::descriptor::Param;
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::{Coo, Csr};
use crate::matrix::Matrix;
use crate::status::Status;
use crate::types::{Element, Index};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Gustavson product of two csr tiles; `cols` bounds the dense
/// accumulator (the marker array keeps per-row resets cheap).
fn gustavson_partial<T: Element>(
    a: &Csr<T>,
    b: &Csr<T>,
    cols: Index,
    mult: &(dyn Fn(T, T) -> T + Send + Sync),
    add: &(dyn Fn(T, T) -> T + Send + Sync),
) -> Coo<T> {
    let mut out = Coo::new();
    let mut acc: Vec<Option<T>> = vec![None; cols as usize];
    let mut touched: Vec<Index> = Vec::new();
    for r in 0..a.n_rows() {
        let (ak, av) = a.row(r);
        for (k, x) in ak.iter().zip(av.iter()) {
            let (bj, bx) = b.row(*k);
            for (j, y) in bj.iter().zip(bx.iter()) {
                let p = mult(*x, *y);
                let slot = &mut acc[*j as usize];
                match slot.take() {
                    Some(cur) => *slot = Some(add(cur, p)),
                    None => {
                        *slot = Some(p);
                        touched.push(*j);
                    }
                }
            }
        }
        touched.sort_unstable();
        for j in touched.drain(..) {
            if let Some(x) = acc[j as usize].take() {
                out.push(r, j, x);
            }
        }
    }
    out
}

/// Dot product of two sorted sparse rows (shared inner dimension).
fn dot_rows<T: Element>(
    a_cols: &[Index],
    a_vals: &[T],
    b_cols: &[Index],
    b_vals: &[T],
    mult: &(dyn Fn(T, T) -> T + Send + Sync),
    add: &(dyn Fn(T, T) -> T + Send + Sync),
) -> Option<T> {
    let (mut i, mut j) = (0usize, 0usize);
    let mut acc: Option<T> = None;
    while i < a_cols.len() && j < b_cols.len() {
        match a_cols[i].cmp(&b_cols[j]) {
            std::cmp::Ordering::Equal => {
                let p = mult(a_vals[i], b_vals[j]);
                acc = Some(match acc {
                    Some(cur) => add(cur, p),
                    None => p,
                });
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    acc
}

/// Csr tiles of `m` logically transposed (tile `(bi,bj)` → `(bj,bi)`,
/// local coordinates swapped), plus the transposed layout.
fn transposed_csr_tiles<T: Element>(
    m: &Matrix,
) -> Result<(BlockLayout, HashMap<(Index, Index), Csr<T>>), Status> {
    let layout = mat_layout::<T>(m)?;
    let flipped = BlockLayout::matrix(layout.n_cols, layout.n_rows, layout.block_size);
    let tiles = mat_coo_tiles::<T>(m)?;
    let mut out = HashMap::new();
    for ((bi, bj), tile) in tiles {
        let t = super::m_transpose::transpose_tile(&tile);
        out.insert((bj, bi), Csr::from_coo(layout.col_block_len(bj), &t));
    }
    Ok((flipped, out))
}

type MatTiles<T> = HashMap<(Index, Index), Csr<T>>;

fn mxm_core<T: Element>(
    ctx: &DispatchContext,
    w: &Matrix,
    mask: Option<&Matrix>,
    a_tiles: MatTiles<T>,
    b_tiles: MatTiles<T>,
    b_layout: BlockLayout,
    mult: &(dyn Fn(T, T) -> T + Send + Sync),
    add: &(dyn Fn(T, T) -> T + Send + Sync),
) -> Result<(), Status> {
    let mut b_by_row: HashMap<Index, Vec<Index>> = HashMap::new();
    for (bk, bj) in b_tiles.keys() {
        b_by_row.entry(*bk).or_default().push(*bj);
    }

    // One subtask per inner tile product.
    let mut items: Vec<(Index, Index, Index)> = Vec::new();
    for (bi, bk) in a_tiles.keys() {
        if let Some(bjs) = b_by_row.get(bk) {
            for bj in bjs {
                items.push((*bi, *bk, *bj));
            }
        }
    }
    items.sort_unstable();

    let partials = fan_out(ctx.lib, items, |(bi, bk, bj)| {
        let a = &a_tiles[&(bi, bk)];
        let b = &b_tiles[&(bk, bj)];
        let cols = b_layout.col_block_len(bj);
        let partial = gustavson_partial(a, b, cols, mult, add);
        Ok(((bi, bj), bk, partial))
    })?;

    // Second stage: ewise-add the partial tiles of each output position.
    let mut grouped: HashMap<(Index, Index), Vec<(Index, Coo<T>)>> = HashMap::new();
    for (at, bk, partial) in partials {
        if partial.values() > 0 {
            grouped.entry(at).or_default().push((bk, partial));
        }
    }
    let groups: Vec<_> = grouped.into_iter().collect();
    let mut tiles = fan_out(ctx.lib, groups, |(at, parts)| {
        let parts = parts
            .into_iter()
            .map(|(bk, tile)| {
                let (keys, vals) = coo_pairs(&tile);
                (bk, keys, vals)
            })
            .collect();
        let (keys, vals) = fold_partials(parts, add);
        Ok((at, coo_from_pairs(keys, vals)))
    })?;

    apply_mat_mask(mask, mask_complement(ctx), &mut tiles)?;
    commit_mat_coo(w, tiles)
}

fn mxmt_core<T: Element>(
    ctx: &DispatchContext,
    w: &Matrix,
    mask: Option<&Matrix>,
    a_tiles: MatTiles<T>,
    b_tiles: MatTiles<T>,
    mult: &(dyn Fn(T, T) -> T + Send + Sync),
    add: &(dyn Fn(T, T) -> T + Send + Sync),
) -> Result<(), Status> {
    let mut b_by_inner: HashMap<Index, Vec<Index>> = HashMap::new();
    for (bj, bk) in b_tiles.keys() {
        b_by_inner.entry(*bk).or_default().push(*bj);
    }

    let mut items: Vec<(Index, Index, Index)> = Vec::new();
    for (bi, bk) in a_tiles.keys() {
        if let Some(bjs) = b_by_inner.get(bk) {
            for bj in bjs {
                items.push((*bi, *bk, *bj));
            }
        }
    }
    items.sort_unstable();

    let partials = fan_out(ctx.lib, items, |(bi, bk, bj)| {
        let a = &a_tiles[&(bi, bk)];
        let b = &b_tiles[&(bj, bk)];
        let mut out = Coo::new();
        for r in 0..a.n_rows() {
            let (ak, av) = a.row(r);
            if ak.is_empty() {
                continue;
            }
            for s in 0..b.n_rows() {
                let (bk_cols, bv) = b.row(s);
                if let Some(x) = dot_rows(ak, av, bk_cols, bv, mult, add) {
                    out.push(r, s, x);
                }
            }
        }
        Ok(((bi, bj), bk, out))
    })?;

    let mut grouped: HashMap<(Index, Index), Vec<(Index, Coo<T>)>> = HashMap::new();
    for (at, bk, partial) in partials {
        if partial.values() > 0 {
            grouped.entry(at).or_default().push((bk, partial));
        }
    }
    let groups: Vec<_> = grouped.into_iter().collect();
    let mut tiles = fan_out(ctx.lib, groups, |(at, parts)| {
        let parts = parts
            .into_iter()
            .map(|(bk, tile)| {
                let (keys, vals) = coo_pairs(&tile);
                (bk, keys, vals)
            })
            .collect();
        let (keys, vals) = fold_partials(parts, add);
        Ok((at, coo_from_pairs(keys, vals)))
    })?;

    apply_mat_mask(mask, mask_complement(ctx), &mut tiles)?;
    commit_mat_coo(w, tiles)
}

/// `w = a × b` (with `TransposeArg1`/`TransposeArg2` honoured).
#[derive(Default)]
pub(crate) struct MxMAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MxMAlgo<T> {
    fn name(&self) -> &'static str {
        "mxm_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MxM { w, mask, mult, add, a, b } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let mult_host = mult.host_same::<T>()?;
        let add_host = add.host_same::<T>()?;

        let a_tiles = if ctx.node.desc.is_set(Param::TransposeArg1) {
            transposed_csr_tiles::<T>(a)?.1
        } else {
            mat_csr_tiles::<T>(a)?
        };

        if ctx.node.desc.is_set(Param::TransposeArg2) {
            let b_tiles = mat_csr_tiles::<T>(b)?;
            return mxmt_core(ctx, w, mask.as_ref(), a_tiles, b_tiles, &*mult_host, &*add_host);
        }

        let b_tiles = mat_csr_tiles::<T>(b)?;
        let b_layout = mat_layout::<T>(b)?;
        mxm_core(ctx, w, mask.as_ref(), a_tiles, b_tiles, b_layout, &*mult_host, &*add_host)
    }
}

/// `w = a × bᵀ`, the masked tile-dot form.
#[derive(Default)]
pub(crate) struct MxMTAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MxMTAlgo<T> {
    fn name(&self) -> &'static str {
        "mxmt_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MxMT { w, mask, mult, add, a, b } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let mult_host = mult.host_same::<T>()?;
        let add_host = add.host_same::<T>()?;
        let a_tiles = mat_csr_tiles::<T>(a)?;
        let b_tiles = mat_csr_tiles::<T>(b)?;
        mxmt_core(ctx, w, mask.as_ref(), a_tiles, b_tiles, &*mult_host, &*add_host)
    }
}
