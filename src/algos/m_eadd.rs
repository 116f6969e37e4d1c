//! Element-wise matrix addition (structural union).

use super::{
    apply_mat_mask, commit_mat_coo, coo_from_pairs, coo_pairs, eadd_sorted, fan_out,
    mask_complement, mat_coo_tiles,
};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::status::Status;
use crate::types::{Element, Index};
use std::marker::PhantomData;

/// `w = a ⊕ b` over matrices: one subtask per output tile, merging the
/// (row, col)-keyed entry runs.
#[derive(Default)]
pub(crate) struct MEwiseAddAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MEwiseAddAlgo<T> {
    fn name(&self) -> &'static str {
        "m_eadd_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MEwiseAdd { w, mask, op, a, b } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let host = op.host_same::<T>()?;
        let a_tiles = mat_coo_tiles::<T>(a)?;
        let b_tiles = mat_coo_tiles::<T>(b)?;

        let mut at: Vec<(Index, Index)> =
            a_tiles.keys().chain(b_tiles.keys()).copied().collect();
        at.sort_unstable();
        at.dedup();

        let mut tiles = fan_out(ctx.lib, at, |key| {
            let tile = match (a_tiles.get(&key), b_tiles.get(&key)) {
                (Some(x), Some(y)) => {
                    let (xk, xv) = coo_pairs(x);
                    let (yk, yv) = coo_pairs(y);
                    let (keys, vals) = eadd_sorted(&xk, &xv, &yk, &yv, &*host);
                    coo_from_pairs(keys, vals)
                }
                (Some(x), None) => x.clone(),
                (None, Some(y)) => y.clone(),
                (None, None) => crate::formats::Coo::new(),
            };
            Ok((key, tile))
        })?;

        apply_mat_mask(mask.as_ref(), mask_complement(ctx), &mut tiles)?;
        commit_mat_coo(w, tiles)
    }
}
