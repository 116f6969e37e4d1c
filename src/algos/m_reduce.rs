//! Matrix reductions: full reduce to a scalar and per-row reduce to a
//! vector.

use super::{
    apply_mat_mask, commit_vec_coo, fan_out, mask_complement, mat_csr_tiles, mat_coo_tiles,
    status_of,
};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::CooVec;
use crate::status::Status;
use crate::types::{Element, Index};
use std::collections::HashMap;
use std::marker::PhantomData;

/// `s = Σ m`: per-tile partial folds in canonical entry order, combined
/// in tile order.
#[derive(Default)]
pub(crate) struct MReduceScalarAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MReduceScalarAlgo<T> {
    fn name(&self) -> &'static str {
        "m_reduce_scalar_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MReduceScalar { s, mask, accum, op, m } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let host = op.host_same::<T>()?;
        let accum_host = match accum {
            Some(op) => Some(op.host_same::<T>()?),
            None => None,
        };

        let tiles = mat_coo_tiles::<T>(m)?;
        let mut at: Vec<_> = tiles.into_iter().collect();
        at.sort_by_key(|(key, _)| *key);
        apply_mat_mask(mask.as_ref(), mask_complement(ctx), &mut at)?;

        let partials = fan_out(ctx.lib, at, |(key, tile)| {
            Ok((key, tile.ax.iter().copied().reduce(|a, b| host(a, b))))
        })?;

        let mut fresh: Option<T> = None;
        for (_, part) in partials {
            fresh = match (fresh, part) {
                (Some(a), Some(b)) => Some(host(a, b)),
                (acc, None) => acc,
                (None, b) => b,
            };
        }

        match fresh {
            Some(fresh) => {
                let result = match (&accum_host, s.get::<T>()) {
                    (Some(f), Ok(prior)) => f(prior, fresh),
                    _ => fresh,
                };
                s.set(result).map_err(status_of)
            }
            None => {
                if accum_host.is_none() {
                    s.clear();
                }
                Ok(())
            }
        }
    }
}

/// `v[i] = Σⱼ m[i,j]`: one subtask per row block, folding that block's
/// tiles left to right. Rows with no entries stay absent; an `init`
/// scalar seeds every non-empty row's fold.
#[derive(Default)]
pub(crate) struct MReduceByRowAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MReduceByRowAlgo<T> {
    fn name(&self) -> &'static str {
        "m_reduce_by_row_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MReduceByRow { v, m, op, init } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let host = op.host_same::<T>()?;
        let seed: Option<T> = match init {
            Some(init) => Some(init.get::<T>().map_err(status_of)?),
            None => None,
        };

        let tiles = mat_csr_tiles::<T>(m)?;
        let mut by_row_block: HashMap<Index, Vec<(Index, &crate::formats::Csr<T>)>> =
            HashMap::new();
        for ((bi, bj), tile) in &tiles {
            by_row_block.entry(*bi).or_default().push((*bj, tile));
        }
        let mut groups: Vec<_> = by_row_block.into_iter().collect();
        groups.sort_by_key(|(bi, _)| *bi);

        let out = fan_out(ctx.lib, groups, |(bi, mut row_tiles)| {
            row_tiles.sort_by_key(|(bj, _)| *bj);
            let rows = row_tiles
                .iter()
                .map(|(_, t)| t.n_rows())
                .max()
                .unwrap_or(0);
            let mut acc: Vec<Option<T>> = vec![None; rows as usize];
            for (_, tile) in row_tiles {
                for r in 0..tile.n_rows() {
                    let (_, ax) = tile.row(r);
                    for x in ax {
                        let slot = &mut acc[r as usize];
                        *slot = Some(match slot.take() {
                            Some(cur) => host(cur, *x),
                            None => match seed {
                                Some(seed) => host(seed, *x),
                                None => *x,
                            },
                        });
                    }
                }
            }
            let mut tile = CooVec::new();
            for (r, slot) in acc.into_iter().enumerate() {
                if let Some(x) = slot {
                    tile.push(r as Index, x);
                }
            }
            Ok((bi, tile))
        })?;

        commit_vec_coo(v, out)
    }
}
