//! Row extraction from a matrix into a vector.

use super::{commit_vec_coo, fan_out, mat_csr_tiles, mat_layout};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::CooVec;
use crate::status::Status;
use crate::types::Element;
use std::marker::PhantomData;

/// `r = f(m[index, :])`: the row's block stripe fans out per column
/// block; each subtask maps one csr row slice through the unary op.
#[derive(Default)]
pub(crate) struct MExtractRowAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MExtractRowAlgo<T> {
    fn name(&self) -> &'static str {
        "m_extract_row_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MExtractRow { r, m, op, index } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let host = op.host::<T, T>()?;
        let layout = mat_layout::<T>(m)?;
        let (bi, local_row) = layout.split(*index);

        let tiles = mat_csr_tiles::<T>(m)?;
        let stripe: Vec<_> = tiles
            .into_iter()
            .filter(|((ti, _), _)| *ti == bi)
            .collect();

        let out = fan_out(ctx.lib, stripe, |((_, bj), tile)| {
            let (aj, ax) = tile.row(local_row);
            let mut block = CooVec::new();
            block.resize(aj.len());
            for (j, x) in aj.iter().zip(ax.iter()) {
                block.push(*j, host(*x));
            }
            Ok((bj, block))
        })?;

        commit_vec_coo(r, out)
    }
}
