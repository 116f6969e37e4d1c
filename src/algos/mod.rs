//! Per-operation algorithm implementations and their registration.
//!
//! Every algorithm is a zero-sized generic struct instantiated per
//! element type and registered under the dispatch keys of §`dispatch`.
//! Algorithms share one shape: clone the input tiles they need out of
//! the entity storages (validating formats through the storage manager
//! first), fan per-tile subtasks out on the library pool, merge partial
//! outputs deterministically, apply the structural mask, and commit the
//! result tiles under the output's write lock. Computing before taking
//! the output lock keeps output-aliases-input graphs safe.

mod m_data;
mod m_eadd;
mod m_extract;
mod m_reduce;
mod m_transpose;
mod mxm;
mod mxv;
mod v_assign;
mod v_data;
mod v_eadd;
mod v_emult;
mod v_map;
mod v_reduce;
mod vxm;

mod acc_vector;

use crate::blocks::BlockLayout;
use crate::formats::{Coo, CooVec, Csr, MatFormat, VecFormat};
use crate::kernels;
use crate::library::Library;
use crate::matrix::Matrix;
use crate::op::{builtin_binaries, builtin_unaries, OpBinary, OpUnary};
use crate::status::Status;
use crate::types::{Element, Index};
use crate::vector::Vector;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatch a runtime `TypeInfo` to a concrete element type parameter.
macro_rules! with_element {
    ($info:expr, $T:ident, $body:block) => {
        match $info.code {
            'c' => {
                type $T = i8;
                $body
            }
            's' => {
                type $T = i16;
                $body
            }
            'i' => {
                type $T = i32;
                $body
            }
            'l' => {
                type $T = i64;
                $body
            }
            'y' => {
                type $T = u8;
                $body
            }
            'w' => {
                type $T = u16;
                $body
            }
            'u' => {
                type $T = u32;
                $body
            }
            'q' => {
                type $T = u64;
                $body
            }
            'f' => {
                type $T = f32;
                $body
            }
            'd' => {
                type $T = f64;
                $body
            }
            'x' => {
                type $T = crate::types::Unit;
                $body
            }
            _ => Err(Status::InvalidArgument),
        }
    };
}
pub(crate) use with_element;

/// Mask-complement flag of the node being dispatched.
pub(crate) fn mask_complement(ctx: &crate::dispatch::DispatchContext<'_>) -> bool {
    ctx.node.desc.is_set(crate::descriptor::Param::MaskComplement)
}

/// Collapse an `anyhow` error from the handle layer to its status code.
pub(crate) fn status_of(e: anyhow::Error) -> Status {
    e.downcast_ref::<Status>().copied().unwrap_or(Status::Error)
}

// -- fan-out ---------------------------------------------------------------

/// Run one subtask per item on the library pool; the first failure wins.
pub(crate) fn fan_out<I, R, F>(lib: &Library, items: Vec<I>, f: F) -> Result<Vec<R>, Status>
where
    I: Send,
    R: Send,
    F: Fn(I) -> Result<R, Status> + Send + Sync,
{
    lib.pool()
        .install(|| items.into_par_iter().map(|item| f(item)).collect())
}

// -- tile reads ------------------------------------------------------------

/// Clone a vector's coo tiles after validating the format.
pub(crate) fn vec_coo_tiles<T: Element>(
    v: &Vector,
) -> Result<HashMap<Index, CooVec<T>>, Status> {
    v.validate_rw::<T>(VecFormat::Coo)?;
    let st = v.storage::<T>()?.read().unwrap();
    Ok(st.coo().tiles.clone())
}

/// Clone a vector's dense tiles after validating the format.
pub(crate) fn vec_dense_tiles<T: Element>(
    v: &Vector,
) -> Result<HashMap<Index, crate::formats::DenseVec<T>>, Status> {
    v.validate_rw::<T>(VecFormat::Dense)?;
    let st = v.storage::<T>()?.read().unwrap();
    Ok(st.dense().tiles.clone())
}

/// Clone a matrix's csr tiles after validating the format.
pub(crate) fn mat_csr_tiles<T: Element>(
    m: &Matrix,
) -> Result<HashMap<(Index, Index), Csr<T>>, Status> {
    m.validate_rw::<T>(MatFormat::Csr)?;
    let st = m.storage::<T>()?.read().unwrap();
    Ok(st.csr().tiles.clone())
}

/// Clone a matrix's coo tiles after validating the format.
pub(crate) fn mat_coo_tiles<T: Element>(
    m: &Matrix,
) -> Result<HashMap<(Index, Index), Coo<T>>, Status> {
    m.validate_rw::<T>(MatFormat::Coo)?;
    let st = m.storage::<T>()?.read().unwrap();
    Ok(st.coo().tiles.clone())
}

/// Block layout of a vector, through its typed storage.
pub(crate) fn vec_layout<T: Element>(v: &Vector) -> Result<BlockLayout, Status> {
    Ok(v.storage::<T>()?.read().unwrap().layout)
}

/// Block layout of a matrix, through its typed storage.
pub(crate) fn mat_layout<T: Element>(m: &Matrix) -> Result<BlockLayout, Status> {
    Ok(m.storage::<T>()?.read().unwrap().layout)
}

// -- structural masks ------------------------------------------------------

/// Per-block index sets of a structural vector mask, whatever its
/// element type.
pub(crate) fn vec_mask_keys(mask: &Vector) -> Result<HashMap<Index, Vec<Index>>, Status> {
    with_element!(mask.type_info(), M, {
        mask.validate_rw::<M>(VecFormat::Coo)?;
        let st = mask.storage::<M>()?.read().unwrap();
        Ok(st.coo().tiles.iter().map(|(b, t)| (*b, t.ai.clone())).collect())
    })
}

/// Per-tile coordinate sets of a structural matrix mask.
pub(crate) fn mat_mask_keys(
    mask: &Matrix,
) -> Result<HashMap<(Index, Index), Vec<(Index, Index)>>, Status> {
    with_element!(mask.type_info(), M, {
        mask.validate_rw::<M>(MatFormat::Coo)?;
        let st = mask.storage::<M>()?.read().unwrap();
        Ok(st
            .coo()
            .tiles
            .iter()
            .map(|(k, t)| {
                (*k, t.ai.iter().copied().zip(t.aj.iter().copied()).collect::<Vec<_>>())
            })
            .collect())
    })
}

/// Filter computed vector tiles by a structural mask.
pub(crate) fn apply_vec_mask<T: Element>(
    mask: Option<&Vector>,
    complement: bool,
    tiles: &mut Vec<(Index, CooVec<T>)>,
) -> Result<(), Status> {
    let Some(mask) = mask else {
        return Ok(());
    };
    let keys = vec_mask_keys(mask)?;
    let empty = Vec::new();
    for (b, tile) in tiles.iter_mut() {
        let mask_keys = keys.get(b).unwrap_or(&empty);
        let mut out_keys = Vec::new();
        let mut out_vals = Vec::new();
        kernels::mask_by_key(mask_keys, &tile.ai, &tile.ax, &mut out_keys, &mut out_vals, complement);
        *tile = CooVec { ai: out_keys, ax: out_vals };
    }
    tiles.retain(|(_, t)| !t.is_empty());
    Ok(())
}

/// Filter computed matrix tiles by a structural mask.
pub(crate) fn apply_mat_mask<T: Element>(
    mask: Option<&Matrix>,
    complement: bool,
    tiles: &mut Vec<((Index, Index), Coo<T>)>,
) -> Result<(), Status> {
    let Some(mask) = mask else {
        return Ok(());
    };
    let keys = mat_mask_keys(mask)?;
    let empty = Vec::new();
    for (at, tile) in tiles.iter_mut() {
        let mask_keys = keys.get(at).unwrap_or(&empty);
        let (pairs, vals) = coo_pairs(tile);
        let mut out_keys = Vec::new();
        let mut out_vals = Vec::new();
        kernels::mask_by_key(mask_keys, &pairs, &vals, &mut out_keys, &mut out_vals, complement);
        *tile = coo_from_pairs(out_keys, out_vals);
    }
    tiles.retain(|(_, t)| !t.is_empty());
    Ok(())
}

// -- pair-key plumbing -----------------------------------------------------

/// View a coo tile as parallel (row, col) keys and values.
pub(crate) fn coo_pairs<T: Element>(tile: &Coo<T>) -> (Vec<(Index, Index)>, Vec<T>) {
    (
        tile.ai.iter().copied().zip(tile.aj.iter().copied()).collect(),
        tile.ax.clone(),
    )
}

/// Rebuild a coo tile from sorted (row, col) keys and values.
pub(crate) fn coo_from_pairs<T: Element>(keys: Vec<(Index, Index)>, vals: Vec<T>) -> Coo<T> {
    let mut ai = Vec::with_capacity(keys.len());
    let mut aj = Vec::with_capacity(keys.len());
    for (i, j) in keys {
        ai.push(i);
        aj.push(j);
    }
    Coo::from_parts(ai, aj, vals)
}

// -- merges ----------------------------------------------------------------

/// Element-wise union of two sorted key/value sequences under `op`.
pub(crate) fn eadd_sorted<K, T>(
    a_keys: &[K],
    a_vals: &[T],
    b_keys: &[K],
    b_vals: &[T],
    op: &dyn Fn(T, T) -> T,
) -> (Vec<K>, Vec<T>)
where
    K: Copy + Ord,
    T: Element,
{
    let mut merged_keys = Vec::new();
    let mut merged_vals = Vec::new();
    kernels::merge_by_key(a_keys, a_vals, b_keys, b_vals, &mut merged_keys, &mut merged_vals);
    let mut out_keys = Vec::new();
    let mut out_vals = Vec::new();
    kernels::reduce_duplicates(&merged_keys, &merged_vals, &mut out_keys, &mut out_vals, op);
    (out_keys, out_vals)
}

/// Fold partial tiles in ascending order of their stage key. A fresh
/// index writes directly; a pre-existing one combines through `op` -- the
/// reduction is assumed associative, never commutative.
pub(crate) fn fold_partials<K, T>(
    mut parts: Vec<(Index, Vec<K>, Vec<T>)>,
    op: &dyn Fn(T, T) -> T,
) -> (Vec<K>, Vec<T>)
where
    K: Copy + Ord,
    T: Element,
{
    parts.sort_by_key(|(order, _, _)| *order);
    let mut acc_keys: Vec<K> = Vec::new();
    let mut acc_vals: Vec<T> = Vec::new();
    for (_, keys, vals) in parts {
        if acc_keys.is_empty() {
            acc_keys = keys;
            acc_vals = vals;
        } else {
            let (k, v) = eadd_sorted(&acc_keys, &acc_vals, &keys, &vals, op);
            acc_keys = k;
            acc_vals = v;
        }
    }
    (acc_keys, acc_vals)
}

// -- commits ---------------------------------------------------------------

/// Replace `w`'s content with the computed coo tiles.
pub(crate) fn commit_vec_coo<T: Element>(
    w: &Vector,
    tiles: Vec<(Index, CooVec<T>)>,
) -> Result<(), Status> {
    let mgr = w.library().vector_manager::<T>();
    let lock = w.storage::<T>()?;
    let mut st = lock.write().unwrap();
    mgr.validate_wd(VecFormat::Coo.code(), &mut st)?;
    for (b, tile) in tiles {
        if !tile.is_empty() {
            st.coo_mut().insert(b, tile);
        }
    }
    Ok(())
}

/// Replace `w`'s content with the computed coo tiles.
pub(crate) fn commit_mat_coo<T: Element>(
    w: &Matrix,
    tiles: Vec<((Index, Index), Coo<T>)>,
) -> Result<(), Status> {
    let mgr = w.library().matrix_manager::<T>();
    let lock = w.storage::<T>()?;
    let mut st = lock.write().unwrap();
    mgr.validate_wd(MatFormat::Coo.code(), &mut st)?;
    for ((bi, bj), tile) in tiles {
        if !tile.is_empty() {
            st.coo_mut().insert(bi, bj, tile);
        }
    }
    Ok(())
}

// -- registration ----------------------------------------------------------

const MASK_SUFFIXES: [&str; 2] = ["_md", "_mc"];

fn same_type_binaries(code: char) -> Vec<&'static OpBinary> {
    builtin_binaries()
        .iter()
        .filter(|op| op.result_type().code == code)
        .collect()
}

fn same_type_unaries(code: char) -> Vec<&'static OpUnary> {
    builtin_unaries()
        .iter()
        .filter(|op| op.arg_type().code == code && op.result_type().code == code)
        .collect()
}

fn register_cpu_type<T: Element>(lib: &Library) {
    let r = lib.registry();
    let c = T::CODE;

    // Per-type generic entries: the fallback layer that lets any
    // user-defined op dispatch.
    for m in MASK_SUFFIXES {
        r.add(&format!("v_eadd_t{c}{m}__cpu"), Arc::new(v_eadd::VEwiseAddAlgo::<T>::default()));
        r.add(&format!("v_emult_t{c}{m}__cpu"), Arc::new(v_emult::VEwiseMultAlgo::<T>::default()));
        r.add(&format!("m_eadd_t{c}{m}__cpu"), Arc::new(m_eadd::MEwiseAddAlgo::<T>::default()));
        r.add(
            &format!("v_assign_masked_t{c}{m}__cpu"),
            Arc::new(v_assign::VAssignAlgo::<T>::default()),
        );
        r.add(&format!("v_reduce_t{c}{m}__cpu"), Arc::new(v_reduce::VReduceAlgo::<T>::default()));
        r.add(
            &format!("m_reduce_scalar_t{c}{m}__cpu"),
            Arc::new(m_reduce::MReduceScalarAlgo::<T>::default()),
        );
        r.add(&format!("mxm_t{c}{m}__cpu"), Arc::new(mxm::MxMAlgo::<T>::default()));
        r.add(&format!("mxmt_t{c}{m}__cpu"), Arc::new(mxm::MxMTAlgo::<T>::default()));
        r.add(&format!("vxm_t{c}{m}__cpu"), Arc::new(vxm::VxMAlgo::<T>::default()));
        r.add(&format!("mxv_t{c}{m}__cpu"), Arc::new(mxv::MxVAlgo::<T>::default()));
        r.add(
            &format!("m_transpose_t{c}{m}__cpu"),
            Arc::new(m_transpose::MTransposeAlgo::<T>::default()),
        );
    }
    r.add(
        &format!("m_reduce_by_row_t{c}__cpu"),
        Arc::new(m_reduce::MReduceByRowAlgo::<T>::default()),
    );
    r.add(&format!("v_map_t{c}__cpu"), Arc::new(v_map::VMapAlgo::<T>::default()));
    r.add(
        &format!("m_extract_row_t{c}__cpu"),
        Arc::new(m_extract::MExtractRowAlgo::<T>::default()),
    );
    r.add(&format!("m_tril_t{c}__cpu"), Arc::new(m_transpose::MTrilAlgo::<T>::default()));
    r.add(&format!("m_triu_t{c}__cpu"), Arc::new(m_transpose::MTriuAlgo::<T>::default()));
    r.add(&format!("v_data_write_t{c}__cpu"), Arc::new(v_data::VDataWriteAlgo::<T>::default()));
    r.add(&format!("v_data_read_t{c}__cpu"), Arc::new(v_data::VDataReadAlgo::<T>::default()));
    r.add(&format!("m_data_write_t{c}__cpu"), Arc::new(m_data::MDataWriteAlgo::<T>::default()));
    r.add(&format!("m_data_read_t{c}__cpu"), Arc::new(m_data::MDataReadAlgo::<T>::default()));
    r.add(&format!("v_count_nz_t{c}__cpu"), Arc::new(v_reduce::VCountNzAlgo::<T>::default()));

    // Builtin-op enumerated entries, walking the op lists the way the
    // original registry does.
    let binaries = same_type_binaries(c);
    let unaries = same_type_unaries(c);
    for m in MASK_SUFFIXES {
        for op in &binaries {
            let k = op.key();
            r.add(&format!("v_eadd_{k}{m}__cpu"), Arc::new(v_eadd::VEwiseAddAlgo::<T>::default()));
            r.add(
                &format!("v_emult_{k}{m}__cpu"),
                Arc::new(v_emult::VEwiseMultAlgo::<T>::default()),
            );
            r.add(&format!("m_eadd_{k}{m}__cpu"), Arc::new(m_eadd::MEwiseAddAlgo::<T>::default()));
            r.add(&format!("v_reduce_{k}{m}__cpu"), Arc::new(v_reduce::VReduceAlgo::<T>::default()));
            r.add(
                &format!("m_reduce_scalar_{k}{m}__cpu"),
                Arc::new(m_reduce::MReduceScalarAlgo::<T>::default()),
            );
        }
        for mult in &binaries {
            for add in &binaries {
                let mk = mult.key();
                let ak = add.key();
                r.add(&format!("mxm_{mk}_{ak}{m}__cpu"), Arc::new(mxm::MxMAlgo::<T>::default()));
                r.add(&format!("mxmt_{mk}_{ak}{m}__cpu"), Arc::new(mxm::MxMTAlgo::<T>::default()));
                r.add(&format!("vxm_{mk}_{ak}{m}__cpu"), Arc::new(vxm::VxMAlgo::<T>::default()));
                r.add(&format!("mxv_{mk}_{ak}{m}__cpu"), Arc::new(mxv::MxVAlgo::<T>::default()));
            }
        }
    }
    for op in &binaries {
        r.add(
            &format!("m_reduce_by_row_{}__cpu", op.key()),
            Arc::new(m_reduce::MReduceByRowAlgo::<T>::default()),
        );
    }
    for op in &unaries {
        r.add(&format!("v_map_{}__cpu", op.key()), Arc::new(v_map::VMapAlgo::<T>::default()));
        r.add(
            &format!("m_extract_row_{}__cpu", op.key()),
            Arc::new(m_extract::MExtractRowAlgo::<T>::default()),
        );
    }
}

/// Register the CPU algorithm table for every element type.
pub(crate) fn register_cpu(lib: &Library) {
    register_cpu_type::<i8>(lib);
    register_cpu_type::<i16>(lib);
    register_cpu_type::<i32>(lib);
    register_cpu_type::<i64>(lib);
    register_cpu_type::<u8>(lib);
    register_cpu_type::<u16>(lib);
    register_cpu_type::<u32>(lib);
    register_cpu_type::<u64>(lib);
    register_cpu_type::<f32>(lib);
    register_cpu_type::<f64>(lib);
    register_cpu_type::<crate::types::Unit>(lib);
}

fn register_acc_type<T: Element>(lib: &Library, suffix: &str) {
    let r = lib.registry();
    let c = T::CODE;
    let binaries = same_type_binaries(c);
    for m in MASK_SUFFIXES {
        for op in &binaries {
            let k = op.key();
            r.add(
                &format!("v_eadd_{k}{m}{suffix}"),
                Arc::new(acc_vector::AccVEwiseAddAlgo::<T>::default()),
            );
            r.add(
                &format!("v_reduce_{k}{m}{suffix}"),
                Arc::new(acc_vector::AccVReduceAlgo::<T>::default()),
            );
        }
        r.add(
            &format!("v_assign_masked_t{c}{m}{suffix}"),
            Arc::new(acc_vector::AccVAssignAlgo::<T>::default()),
        );
    }
}

/// Register the accelerator algorithm table. Only the kernels the
/// backend can actually serve are registered; multiply kernels need an
/// atomic-add primitive the reference backend lacks, so they fall back
/// to the CPU table at resolve time.
pub(crate) fn register_acc(lib: &Library) {
    let Some(acc) = lib.accelerator() else {
        return;
    };
    let suffix = acc.suffix();
    register_acc_type::<i8>(lib, suffix);
    register_acc_type::<i16>(lib, suffix);
    register_acc_type::<i32>(lib, suffix);
    register_acc_type::<i64>(lib, suffix);
    register_acc_type::<u8>(lib, suffix);
    register_acc_type::<u16>(lib, suffix);
    register_acc_type::<u32>(lib, suffix);
    register_acc_type::<u64>(lib, suffix);
    register_acc_type::<f32>(lib, suffix);
    register_acc_type::<f64>(lib, suffix);
}
