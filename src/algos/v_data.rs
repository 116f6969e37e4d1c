//! Host data transfer for vectors.

use super::{commit_vec_coo, fan_out, vec_coo_tiles, vec_layout};
use crate::descriptor::Param;
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::CooVec;
use crate::status::Status;
use crate::types::{Element, Index};
use std::marker::PhantomData;
use std::sync::Mutex;

/// Populate a vector from host `(index, value)` pairs: canonicalise
/// (sort, collapse duplicates keeping the last write), slice into row
/// blocks, one subtask per block builds the tile.
#[derive(Default)]
pub(crate) struct VDataWriteAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for VDataWriteAlgo<T> {
    fn name(&self) -> &'static str {
        "v_data_write_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VDataWrite { x, data } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let data = data
            .downcast_ref::<Vec<(Index, T)>>()
            .ok_or(Status::InvalidArgument)?;
        if data.iter().any(|(i, _)| *i >= x.n_rows()) {
            return Err(Status::InvalidArgument);
        }
        let layout = vec_layout::<T>(x)?;

        let mut entries = data.clone();
        if !ctx.node.desc.is_set(Param::ValuesSorted) {
            entries.sort_by_key(|(i, _)| *i);
        }
        if !ctx.node.desc.is_set(Param::NoDuplicates) {
            // Stable sort kept insertion order inside runs; the last
            // write wins.
            let mut deduped: Vec<(Index, T)> = Vec::with_capacity(entries.len());
            for e in entries {
                match deduped.last_mut() {
                    Some(last) if last.0 == e.0 => *last = e,
                    _ => deduped.push(e),
                }
            }
            entries = deduped;
        }

        // Slice the sorted run into per-block ranges.
        let mut slices: Vec<(Index, Vec<(Index, T)>)> = Vec::new();
        for (i, v) in entries {
            let (block, local) = layout.split(i);
            match slices.last_mut() {
                Some((b, run)) if *b == block => run.push((local, v)),
                _ => slices.push((block, vec![(local, v)])),
            }
        }

        let tiles = fan_out(ctx.lib, slices, |(block, run)| {
            let mut tile = CooVec::new();
            tile.resize(run.len());
            for (local, v) in run {
                tile.push(local, v);
            }
            Ok((block, tile))
        })?;

        commit_vec_coo(x, tiles)
    }
}

/// Read a vector back into a host buffer, global indices in canonical
/// order.
#[derive(Default)]
pub(crate) struct VDataReadAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for VDataReadAlgo<T> {
    fn name(&self) -> &'static str {
        "v_data_read_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::VDataRead { x, out } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let out = out
            .downcast_ref::<Mutex<Vec<(Index, T)>>>()
            .ok_or(Status::InvalidArgument)?;
        let layout = vec_layout::<T>(x)?;
        let tiles = vec_coo_tiles::<T>(x)?;

        let mut blocks: Vec<_> = tiles.into_iter().collect();
        blocks.sort_by_key(|(b, _)| *b);

        let chunks = fan_out(ctx.lib, blocks, |(block, tile)| {
            let chunk: Vec<(Index, T)> = tile
                .iter()
                .map(|(local, v)| (layout.join(block, local), *v))
                .collect();
            Ok(chunk)
        })?;

        let mut buf = out.lock().unwrap();
        buf.clear();
        for chunk in chunks {
            buf.extend(chunk);
        }
        Ok(())
    }
}
