//! Element-wise vector multiplication (structural intersection).

use super::{apply_vec_mask, commit_vec_coo, fan_out, mask_complement, vec_coo_tiles};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::CooVec;
use crate::kernels;
use crate::status::Status;
use crate::types::{Element, Index};
use std::marker::PhantomData;

/// `w = a ⊗ b`: subtask per block shared by both inputs; the two-pointer
/// walk gathers positions of common indices, `transform_values` combines
/// them.
#[derive(Default)]
pub(crate) struct VEwiseMultAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for VEwiseMultAlgo<T> {
    fn name(&self) -> &'static str {
        "v_emult_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VEwiseMult { w, mask, op, a, b } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let host = op.host_same::<T>()?;
        let a_tiles = vec_coo_tiles::<T>(a)?;
        let b_tiles = vec_coo_tiles::<T>(b)?;

        let mut blocks: Vec<Index> = a_tiles
            .keys()
            .filter(|block| b_tiles.contains_key(block))
            .copied()
            .collect();
        blocks.sort_unstable();

        let mut tiles = fan_out(ctx.lib, blocks, |block| {
            let x = &a_tiles[&block];
            let y = &b_tiles[&block];
            let mut keys = Vec::new();
            let mut a_map = Vec::new();
            let mut b_map = Vec::new();
            let (mut i, mut j) = (0usize, 0usize);
            while i < x.ai.len() && j < y.ai.len() {
                match x.ai[i].cmp(&y.ai[j]) {
                    std::cmp::Ordering::Equal => {
                        keys.push(x.ai[i]);
                        a_map.push(i);
                        b_map.push(j);
                        i += 1;
                        j += 1;
                    }
                    std::cmp::Ordering::Less => i += 1,
                    std::cmp::Ordering::Greater => j += 1,
                }
            }
            let mut vals = Vec::new();
            kernels::transform_values(&a_map, &b_map, &x.ax, &y.ax, &mut vals, &*host);
            Ok((block, CooVec::from_parts(keys, vals)))
        })?;

        apply_vec_mask(mask.as_ref(), mask_complement(ctx), &mut tiles)?;
        commit_vec_coo(w, tiles)
    }
}
