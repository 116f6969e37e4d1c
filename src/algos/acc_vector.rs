//! Reference-backend device versions of the performance-critical vector
//! kernels.
//!
//! The reference backend owns buffers but cannot launch kernels, so
//! these algorithms move data exclusively through the accelerator buffer
//! interface and run the combining loop on the host -- the device twins,
//! program cache and counter pool behave exactly as they would under a
//! real backend, which is what the dispatcher fallback tests rely on.

use super::{
    apply_vec_mask, commit_vec_coo, eadd_sorted, fan_out, mask_complement, status_of,
    vec_layout, vec_mask_keys,
};
use crate::accel::program::ProgramBuilder;
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::{AccDenseVec, CooVec, DenseVec, VecFormat};
use crate::status::Status;
use crate::types::{Element, Index};
use std::collections::HashMap;
use std::marker::PhantomData;

fn acc_coo_tiles<T: Element>(
    ctx: &DispatchContext,
    v: &crate::vector::Vector,
) -> Result<HashMap<Index, CooVec<T>>, Status> {
    let acc = ctx.lib.accelerator().ok_or(Status::NoAcceleration)?;
    v.validate_rw::<T>(VecFormat::AccCoo)?;
    let st = v.storage::<T>()?.read().unwrap();
    let mut out = HashMap::new();
    for (b, twin) in &st.acc_coo().tiles {
        out.insert(*b, twin.to_host::<T>(acc.as_ref())?);
    }
    Ok(out)
}

/// Device `w = a ⊕ b`.
#[derive(Default)]
pub(crate) struct AccVEwiseAddAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for AccVEwiseAddAlgo<T> {
    fn name(&self) -> &'static str {
        "v_eadd_acc"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VEwiseAdd { w, mask, op, a, b } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let acc = ctx.lib.accelerator().ok_or(Status::NoAcceleration)?;
        let source = ProgramBuilder::new("v_eadd")
            .define("TYPE", T::NAME)
            .op_source("OP_BINARY", op.device_source())
            .build();
        let _program = ctx.lib.programs().get_or_compile(acc.as_ref(), &source)?;
        let host = op.host_same::<T>()?;

        let a_tiles = acc_coo_tiles::<T>(ctx, a)?;
        let b_tiles = acc_coo_tiles::<T>(ctx, b)?;
        let mut blocks: Vec<Index> = a_tiles.keys().chain(b_tiles.keys()).copied().collect();
        blocks.sort_unstable();
        blocks.dedup();

        let counter = acc.counter_acquire(ctx.device_id)?;
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
            counter.fetch_add(tile.values() as u32);
            Ok((block, tile))
        })?;
        acc.counter_release(ctx.device_id, counter);

        apply_vec_mask(mask.as_ref(), mask_complement(ctx), &mut tiles)?;
        commit_vec_coo(w, tiles)
    }
}

/// Device `s = Σ v`.
#[derive(Default)]
pub(crate) struct AccVReduceAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for AccVReduceAlgo<T> {
    fn name(&self) -> &'static str {
        "v_reduce_acc"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VReduce { s, mask, accum, op, v } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let acc = ctx.lib.accelerator().ok_or(Status::NoAcceleration)?;
        let source = ProgramBuilder::new("v_reduce")
            .define("TYPE", T::NAME)
            .op_source("OP_REDUCE", op.device_source())
            .build();
        let _program = ctx.lib.programs().get_or_compile(acc.as_ref(), &source)?;
        let host = op.host_same::<T>()?;
        let accum_host = match accum {
            Some(op) => Some(op.host_same::<T>()?),
            None => None,
        };

        let tiles = acc_coo_tiles::<T>(ctx, v)?;
        let mut blocks: Vec<_> = tiles.into_iter().collect();
        blocks.sort_by_key(|(b, _)| *b);
        apply_vec_mask(mask.as_ref(), mask_complement(ctx), &mut blocks)?;

        let mut fresh: Option<T> = None;
        for (_, tile) in blocks {
            for x in tile.ax {
                fresh = Some(match fresh {
                    Some(cur) => host(cur, x),
                    None => x,
                });
            }
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

/// Device masked assign over the dense twin.
#[derive(Default)]
pub(crate) struct AccVAssignAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for AccVAssignAlgo<T> {
    fn name(&self) -> &'static str {
        "v_assign_acc"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VAssign { w, mask, accum, value } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let acc = ctx.lib.accelerator().ok_or(Status::NoAcceleration)?;
        let source = ProgramBuilder::new("v_assign")
            .define("TYPE", T::NAME)
            .body("w[i] = ASSIGN(w[i], value)")
            .build();
        let _program = ctx.lib.programs().get_or_compile(acc.as_ref(), &source)?;

        let value = value.get::<T>().map_err(status_of)?;
        let accum_host = match accum {
            Some(op) => Some(op.host_same::<T>()?),
            None => None,
        };
        let layout = vec_layout::<T>(w)?;
        let complement = mask_complement(ctx);
        let mask_keys = match mask {
            Some(mask) => Some(vec_mask_keys(mask)?),
            None => None,
        };

        let width = size_of::<T>();
        let mgr = w.library().vector_manager::<T>();
        let lock = w.storage::<T>()?;
        let mut st = lock.write().unwrap();
        mgr.validate_rwd(VecFormat::AccDense.code(), &mut st)?;

        for b in 0..layout.n_row_blocks() {
            let len = layout.row_block_len(b);
            if !st.acc_dense().tiles.contains_key(&b) {
                let twin = AccDenseVec::from_host(acc.as_ref(), ctx.device_id, &DenseVec::<T>::with_len(len))?;
                st.acc_dense.as_mut().expect("acc dense slot validated").insert(b, twin);
            }
            let twin = st.acc_dense().tiles.get(&b).expect("block just ensured").clone();

            let mut bytes = vec![0u8; twin.ax.len];
            acc.buffer_read(&twin.ax, 0, &mut bytes)?;

            let selected: Vec<Index> = match &mask_keys {
                None => (0..len).collect(),
                Some(keys) => {
                    let masked = keys.get(&b).cloned().unwrap_or_default();
                    if complement {
                        (0..len).filter(|i| masked.binary_search(i).is_err()).collect()
                    } else {
                        masked
                    }
                }
            };

            for i in selected {
                let at = i as usize * width;
                let old = T::read_le(&bytes[at..at + width]).ok_or(Status::Error)?;
                let next = match (&accum_host, old != T::default()) {
                    (Some(f), true) => f(old, value),
                    _ => value,
                };
                let mut enc = Vec::with_capacity(width);
                next.write_le(&mut enc);
                bytes[at..at + width].copy_from_slice(&enc);
            }

            acc.buffer_write(&twin.ax, 0, &bytes)?;
        }
        Ok(())
    }
}
