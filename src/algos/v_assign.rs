//! Masked scalar assignment into a vector.

use super::{fan_out, mask_complement, status_of, vec_layout, vec_mask_keys};
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::VecFormat;
use crate::status::Status;
use crate::types::{Element, Index};
use std::marker::PhantomData;

/// `w[i] = value` (or `accum(w[i], value)`) where the mask selects `i`.
///
/// Selection is computed per block in parallel; the write happens in the
/// dok format under one lock, which works uniformly for value and
/// structure-only vectors. A complement mask selects the whole block
/// range minus the mask entries.
#[derive(Default)]
pub(crate) struct VAssignAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for VAssignAlgo<T> {
    fn name(&self) -> &'static str {
        "v_assign_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VAssign { w, mask, accum, value } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let value = value.get::<T>().map_err(status_of)?;
        let accum_host = match accum {
            Some(op) => Some(op.host_same::<T>()?),
            None => None,
        };
        let layout = vec_layout::<T>(w)?;
        let complement = mask_complement(ctx);

        // Per-block selected local indices.
        let selected: Vec<(Index, Vec<Index>)> = match mask {
            Some(mask) => {
                let keys = vec_mask_keys(mask)?;
                if complement {
                    let blocks: Vec<Index> = (0..layout.n_row_blocks()).collect();
                    fan_out(ctx.lib, blocks, |b| {
                        let len = layout.row_block_len(b);
                        let masked = keys.get(&b);
                        let locals: Vec<Index> = match masked {
                            Some(masked) => {
                                let mut m = 0usize;
                                let mut out = Vec::new();
                                for i in 0..len {
                                    while m < masked.len() && masked[m] < i {
                                        m += 1;
                                    }
                                    if m >= masked.len() || masked[m] != i {
                                        out.push(i);
                                    }
                                }
                                out
                            }
                            None => (0..len).collect(),
                        };
                        Ok((b, locals))
                    })?
                } else {
                    let mut out: Vec<(Index, Vec<Index>)> =
                        keys.into_iter().collect();
                    out.sort_by_key(|(b, _)| *b);
                    out
                }
            }
            None => (0..layout.n_row_blocks())
                .map(|b| (b, (0..layout.row_block_len(b)).collect()))
                .collect(),
        };

        let mgr = w.library().vector_manager::<T>();
        let lock = w.storage::<T>()?;
        let mut st = lock.write().unwrap();
        mgr.validate_rwd(VecFormat::Dok.code(), &mut st)?;
        for (b, locals) in selected {
            if locals.is_empty() {
                continue;
            }
            let tile = st.dok_mut().tiles.entry(b).or_default();
            for i in locals {
                let next = match (&accum_host, tile.map.get(&i)) {
                    (Some(f), Some(old)) => f(*old, value),
                    _ => value,
                };
                tile.map.insert(i, next);
            }
        }
        Ok(())
    }
}
