//! Vector reduction to a scalar, and the stored-entry counter.

use super::{apply_vec_mask, fan_out, mask_complement, status_of, vec_coo_tiles};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::status::Status;
use crate::types::Element;
use std::marker::PhantomData;

/// `s = Σ v`: per-block partial folds, combined in block order. The
/// reduction op is assumed associative; blocks and entries are walked in
/// index order so a merely associative op still reduces deterministically.
#[derive(Default)]
pub(crate) struct VReduceAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for VReduceAlgo<T> {
    fn name(&self) -> &'static str {
        "v_reduce_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VReduce { s, mask, accum, op, v } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let host = op.host_same::<T>()?;
        let accum_host = match accum {
            Some(op) => Some(op.host_same::<T>()?),
            None => None,
        };

        let tiles = vec_coo_tiles::<T>(v)?;
        let mut blocks: Vec<_> = tiles.into_iter().collect();
        blocks.sort_by_key(|(b, _)| *b);
        apply_vec_mask(mask.as_ref(), mask_complement(ctx), &mut blocks)?;

        let partials = fan_out(ctx.lib, blocks, |(block, tile)| {
            Ok((block, tile.ax.iter().copied().reduce(|a, b| host(a, b))))
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
                // Nothing to reduce: without an accum the scalar becomes
                // empty; with one the prior value stands.
                if accum_host.is_none() {
                    s.clear();
                }
                Ok(())
            }
        }
    }
}

/// Stored-entry count of a vector, into a `u32` scalar.
#[derive(Default)]
pub(crate) struct VCountNzAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for VCountNzAlgo<T> {
    fn name(&self) -> &'static str {
        "v_count_nz_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VCountNz { s, v } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let tiles = vec_coo_tiles::<T>(v)?;
        let count: usize = tiles.values().map(|t| t.values()).sum();
        s.set(count as u32).map_err(status_of)
    }
}
