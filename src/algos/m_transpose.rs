//! Transpose and triangle extraction.

use super::{
    apply_mat_mask, commit_mat_coo, coo_from_pairs, coo_pairs, eadd_sorted, fan_out,
    mask_complement, mat_coo_tiles,
};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::Coo;
use crate::kernels;
use crate::status::Status;
use crate::types::{Element, Index};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Transpose one tile: swap the coordinates, restore canonical order.
pub(crate) fn transpose_tile<T: Element>(tile: &Coo<T>) -> Coo<T> {
    let mut keys: Vec<(Index, Index)> =
        tile.aj.iter().copied().zip(tile.ai.iter().copied()).collect();
    let mut vals = tile.ax.clone();
    kernels::sort_by_key(&mut keys, &mut vals);
    coo_from_pairs(keys, vals)
}

/// `w = aᵀ`: one subtask per tile; tile `(bi, bj)` lands at `(bj, bi)`.
/// With an accum op the fresh result merges into `w`'s prior content.
#[derive(Default)]
pub(crate) struct MTransposeAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MTransposeAlgo<T> {
    fn name(&self) -> &'static str {
        "m_transpose_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MTranspose { w, mask, accum, a } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let accum_host = match accum {
            Some(op) => Some(op.host_same::<T>()?),
            None => None,
        };
        let tiles = mat_coo_tiles::<T>(a)?;
        let at: Vec<_> = tiles.into_iter().collect();

        let mut fresh = fan_out(ctx.lib, at, |((bi, bj), tile)| {
            Ok(((bj, bi), transpose_tile(&tile)))
        })?;
        apply_mat_mask(mask.as_ref(), mask_complement(ctx), &mut fresh)?;

        if let Some(accum_host) = accum_host {
            // Combine with the prior output before it is overwritten.
            let prior = mat_coo_tiles::<T>(w)?;
            let mut merged: HashMap<(Index, Index), Coo<T>> = prior;
            for (key, tile) in fresh {
                let combined = match merged.remove(&key) {
                    Some(old) => {
                        let (ok, ov) = coo_pairs(&old);
                        let (fk, fv) = coo_pairs(&tile);
                        let (keys, vals) = eadd_sorted(&ok, &ov, &fk, &fv, &*accum_host);
                        coo_from_pairs(keys, vals)
                    }
                    None => tile,
                };
                merged.insert(key, combined);
            }
            fresh = merged.into_iter().collect();
        }

        commit_mat_coo(w, fresh)
    }
}

fn tria_filter<T: Element>(tile: &Coo<T>, keep: impl Fn(Index, Index) -> bool) -> Coo<T> {
    let mut out = Coo::new();
    for (i, j, v) in tile.iter() {
        if keep(i, j) {
            out.push(i, j, *v);
        }
    }
    out
}

/// `w = strict lower triangle of a`: tiles below the diagonal pass
/// through, diagonal tiles filter locally, the rest drop.
#[derive(Default)]
pub(crate) struct MTrilAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MTrilAlgo<T> {
    fn name(&self) -> &'static str {
        "m_tril_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MTril { w, a } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let tiles = mat_coo_tiles::<T>(a)?;
        let at: Vec<_> = tiles
            .into_iter()
            .filter(|((bi, bj), _)| bi >= bj)
            .collect();
        let out = fan_out(ctx.lib, at, |((bi, bj), tile)| {
            let kept = if bi > bj { tile } else { tria_filter(&tile, |i, j| i > j) };
            Ok(((bi, bj), kept))
        })?;
        commit_mat_coo(w, out)
    }
}

/// `w = strict upper triangle of a`.
#[derive(Default)]
pub(crate) struct MTriuAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MTriuAlgo<T> {
    fn name(&self) -> &'static str {
        "m_triu_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MTriu { w, a } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let tiles = mat_coo_tiles::<T>(a)?;
        let at: Vec<_> = tiles
            .into_iter()
            .filter(|((bi, bj), _)| bi <= bj)
            .collect();
        let out = fan_out(ctx.lib, at, |((bi, bj), tile)| {
            let kept = if bj > bi { tile } else { tria_filter(&tile, |i, j| j > i) };
            Ok(((bi, bj), kept))
        })?;
        commit_mat_coo(w, out)
    }
}
