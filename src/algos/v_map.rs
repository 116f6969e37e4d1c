//! Element-wise unary map over a vector.

use super::{commit_vec_coo, fan_out, vec_coo_tiles};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::CooVec;
use crate::status::Status;
use crate::types::Element;
use std::marker::PhantomData;

/// `w = f(v)`: structure is preserved, one subtask per block maps the
/// value array.
#[derive(Default)]
pub(crate) struct VMapAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for VMapAlgo<T> {
    fn name(&self) -> &'static str {
        "v_map_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VMap { w, v, op } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let host = op.host::<T, T>()?;
        let tiles = vec_coo_tiles::<T>(v)?;
        let blocks: Vec<_> = tiles.keys().copied().collect();

        let out = fan_out(ctx.lib, blocks, |block| {
            let tile = &tiles[&block];
            let mapped: Vec<T> = tile.ax.iter().map(|x| host(*x)).collect();
            Ok((block, CooVec::from_parts(tile.ai.clone(), mapped)))
        })?;

        commit_vec_coo(w, out)
    }
}
