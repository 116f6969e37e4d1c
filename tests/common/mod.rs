//! Shared helpers for the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tessella::*;

/// Library with a tiny block size so multi-tile paths are exercised on
/// small inputs.
pub fn lib_with_block(block_size: Index) -> Result<Library> {
    Library::new(LibraryConfig {
        block_size: Some(block_size),
        workers: Some(2),
        ..Default::default()
    })
}

/// CPU-only library (no accelerator registered at all).
pub fn cpu_only_lib(block_size: Index) -> Result<Library> {
    Library::new(LibraryConfig {
        backend: Some(Backend::None),
        block_size: Some(block_size),
        workers: Some(2),
        ..Default::default()
    })
}

/// Vector populated from entries.
pub fn vec_i32(lib: &Library, n: Index, entries: &[(Index, i32)]) -> Result<Vector> {
    let v = Vector::new::<i32>(lib, n)?;
    exec_v_data_write(lib, &v, entries.to_vec(), None)?;
    Ok(v)
}

/// Vector contents in canonical order.
pub fn read_vec_i32(lib: &Library, v: &Vector) -> Result<Vec<(Index, i32)>> {
    let out = Arc::new(Mutex::new(Vec::new()));
    exec_v_data_read(lib, v, out.clone(), None)?;
    let data = out.lock().unwrap().clone();
    Ok(data)
}

/// Matrix populated from triples.
pub fn mat_i32(
    lib: &Library,
    rows: Index,
    cols: Index,
    entries: &[(Index, Index, i32)],
) -> Result<Matrix> {
    let m = Matrix::new::<i32>(lib, rows, cols)?;
    exec_m_data_write(lib, &m, entries.to_vec(), None)?;
    Ok(m)
}

/// Matrix contents in canonical order.
pub fn read_mat_i32(lib: &Library, m: &Matrix) -> Result<Vec<(Index, Index, i32)>> {
    let out = Arc::new(Mutex::new(Vec::new()));
    exec_m_data_read(lib, m, out.clone(), None)?;
    let data = out.lock().unwrap().clone();
    Ok(data)
}

/// Descriptor with the mask-complement flag set.
pub fn complement_desc() -> Descriptor {
    Descriptor::new().with(Param::MaskComplement)
}
