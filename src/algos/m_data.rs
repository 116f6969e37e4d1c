//! Host data transfer for matrices.

use super::{commit_mat_coo, fan_out, mat_coo_tiles, mat_layout};
use crate::descriptor::Param;
use crate::dispatch::{Algo, DispatchContext};
use crate::expression::NodeOp;
use crate::formats::Coo;
use crate::status::Status;
use crate::types::{Element, Index};
use std::marker::PhantomData;
use std::sync::Mutex;

/// Populate a matrix from host `(row, col, value)` triples, one subtask
/// per touched tile.
#[derive(Default)]
pub(crate) struct MDataWriteAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MDataWriteAlgo<T> {
    fn name(&self) -> &'static str {
        "m_data_write_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MDataWrite { x, data } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let data = data
            .downcast_ref::<Vec<(Index, Index, T)>>()
            .ok_or(Status::InvalidArgument)?;
        if data.iter().any(|(i, j, _)| *i >= x.n_rows() || *j >= x.n_cols()) {
            return Err(Status::InvalidArgument);
        }
        let layout = mat_layout::<T>(x)?;

        let mut entries = data.clone();
        if !ctx.node.desc.is_set(Param::ValuesSorted) {
            entries.sort_by_key(|(i, j, _)| (*i, *j));
        }
        if !ctx.node.desc.is_set(Param::NoDuplicates) {
            let mut deduped: Vec<(Index, Index, T)> = Vec::with_capacity(entries.len());
            for e in entries {
                match deduped.last_mut() {
                    Some(last) if last.0 == e.0 && last.1 == e.1 => *last = e,
                    _ => deduped.push(e),
                }
            }
            entries = deduped;
        }

        // Bucket by tile; the per-tile runs are already row-major inside
        // a tile because the global order is.
        let mut buckets: std::collections::HashMap<(Index, Index), Vec<(Index, Index, T)>> =
            std::collections::HashMap::new();
        for (i, j, v) in entries {
            let (bi, li) = layout.split(i);
            let (bj, lj) = layout.split(j);
            buckets.entry((bi, bj)).or_default().push((li, lj, v));
        }
        let slices: Vec<_> = buckets.into_iter().collect();

        let tiles = fan_out(ctx.lib, slices, |(at, mut run)| {
            run.sort_by_key(|(i, j, _)| (*i, *j));
            let mut tile = Coo::new();
            tile.resize(run.len());
            for (i, j, v) in run {
                tile.push(i, j, v);
            }
            Ok((at, tile))
        })?;

        commit_mat_coo(x, tiles)
    }
}

/// Read a matrix back into a host buffer of triples in canonical global
/// order.
#[derive(Default)]
pub(crate) struct MDataReadAlgo<T>(PhantomData<T>);

impl<T: Element> Algo for MDataReadAlgo<T> {
    fn name(&self) -> &'static str {
        "m_data_read_cpu"
    }

    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status> {
        let NodeOp::MDataRead { x, out } = &ctx.node.op else {
            return Err(Status::InvalidState);
        };
        let out = out
            .downcast_ref::<Mutex<Vec<(Index, Index, T)>>>()
            .ok_or(Status::InvalidArgument)?;
        let layout = mat_layout::<T>(x)?;
        let tiles = mat_coo_tiles::<T>(x)?;
        let slices: Vec<_> = tiles.into_iter().collect();

        let chunks = fan_out(ctx.lib, slices, |((bi, bj), tile)| {
            let chunk: Vec<(Index, Index, T)> = tile
                .iter()
                .map(|(i, j, v)| (layout.join(bi, i), layout.join(bj, j), *v))
                .collect();
            Ok(chunk)
        })?;

        let mut buf = out.lock().unwrap();
        buf.clear();
        for chunk in chunks {
            buf.extend(chunk);
        }
        // Tile-major gathering; restore the global row-major order.
        buf.sort_by_key(|(i, j, _)| (*i, *j));
        Ok(())
    }
}
