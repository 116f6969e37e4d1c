//! Element-wise vector addition (structural union).

use super::{
    apply_vec_mask, commit_vec_coo, eadd_sorted, fan_out, mask_complement, vec_coo_tiles,
};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::CooVec;
use crate::status::Status;
use crate::types::{Element, Index};
use std::marker::PhantomData;

/// `w = a ⊕ b`: one subtask per output block, each merging the two
/// block tiles and collapsing shared indices through the op.
#[derive(Default)]
pub(crate) struct VEwiseAddAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for VEwiseAddAlgo<T> {
    fn name(&self) -> &'static str {
        "v_eadd_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VEwiseAdd { w, mask, op, a, b } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let host = op.host_same::<T>()?;
        let a_tiles = vec_coo_tiles::<T>(a)?;
        let b_tiles = vec_coo_tiles::<T>(b)?;

        let mut blocks: Vec<Index> =
            a_tiles.keys().chain(b_tiles.keys()).copied().collect();
        blocks.sort_unstable();
        blocks.dedup();

        let mut tiles = fan_out(ctx.lib, blocks, |block| {
            let tile = match (a_tiles.get(&block), b_tiles.get(&block)) {
                (Some(x), Some(y)) => {
                    let (keys, vals) = eadd_sorted(&x.ai, &x.ax, &y.ai, &y.ax, &*host);
                    CooVec::from_parts(keys, vals)
                }
                (Some(x), None) => x.clone(),
                (None, Some(y)) => y.clone(),
                (None, None) => CooVec::new(),
            };
            Ok((block, tile))
        })?;

        apply_vec_mask(mask.as_ref(), mask_complement(ctx), &mut tiles)?;
        commit_vec_coo(w, tiles)
    }
}
