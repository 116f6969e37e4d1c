mod common;

use common::*;
use tessella::*;

#[test]
fn vxm_masked_complement() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = vec_i32(&lib, 3, &[(0, 1), (2, 2)])?;
    let a = mat_i32(&lib, 3, 3, &[(0, 1, 3), (1, 1, 4), (2, 1, 5), (2, 2, 6)])?;
    let mask = vec_i32(&lib, 3, &[(1, 1)])?;
    let w = Vector::new::<i32>(&lib, 3)?;

    exec_vxm_masked(
        &lib,
        &w,
        Some(&mask),
        &MULT_I32,
        &PLUS_I32,
        &v,
        &a,
        Some(complement_desc()),
    )?;
    assert_eq!(read_vec_i32(&lib, &w)?, vec![(2, 12)]);
    Ok(())
}

#[test]
fn vxm_unmasked() -> anyhow::Result<()> {
    let lib = lib_with_block(2)?;
    let v = vec_i32(&lib, 3, &[(0, 1), (2, 2)])?;
    let a = mat_i32(&lib, 3, 3, &[(0, 1, 3), (1, 1, 4), (2, 1, 5), (2, 2, 6)])?;
    let w = Vector::new::<i32>(&lib, 3)?;

    exec_vxm_masked(&lib, &w, None, &MULT_I32, &PLUS_I32, &v, &a, None)?;
    assert_eq!(read_vec_i32(&lib, &w)?, vec![(1, 13), (2, 12)]);
    Ok(())
}

#[test]
fn mxv_multiplies_rows() -> anyhow::Result<()> {
    let lib = lib_with_block(2)?;
    let a = mat_i32(&lib, 3, 3, &[(0, 0, 1), (0, 1, 2), (1, 0, 3), (2, 2, 4)])?;
    let v = vec_i32(&lib, 3, &[(0, 10), (1, 20)])?;
    let w = Vector::new::<i32>(&lib, 3)?;

    exec_mxv_masked(&lib, &w, None, &MULT_I32, &PLUS_I32, &a, &v, None)?;
    assert_eq!(read_vec_i32(&lib, &w)?, vec![(0, 50), (1, 30)]);
    Ok(())
}

#[test]
fn mxv_with_dense_factor_hint_matches_sparse_path() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let a = mat_i32(&lib, 4, 4, &[(0, 0, 1), (1, 1, 2), (2, 0, 3), (3, 3, 4)])?;
    let v = vec_i32(&lib, 4, &[(0, 5), (1, 6), (3, 7)])?;

    let w_sparse = Vector::new::<i32>(&lib, 4)?;
    let mut sparse_desc = Descriptor::new();
    sparse_desc.set_value(Param::DenseFactor, "0.01");
    exec_mxv_masked(&lib, &w_sparse, None, &MULT_I32, &PLUS_I32, &a, &v, Some(sparse_desc))?;

    let w_dense = Vector::new::<i32>(&lib, 4)?;
    let mut dense_desc = Descriptor::new();
    dense_desc.set_value(Param::DenseFactor, "100.0");
    exec_mxv_masked(&lib, &w_dense, None, &MULT_I32, &PLUS_I32, &a, &v, Some(dense_desc))?;

    assert_eq!(read_vec_i32(&lib, &w_sparse)?, read_vec_i32(&lib, &w_dense)?);
    assert_eq!(read_vec_i32(&lib, &w_dense)?, vec![(0, 5), (1, 12), (2, 15), (3, 28)]);
    Ok(())
}

#[test]
fn mxm_small_product() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let a = mat_i32(&lib, 2, 2, &[(0, 0, 1), (0, 1, 2), (1, 0, 3), (1, 1, 4)])?;
    let b = mat_i32(&lib, 2, 2, &[(0, 0, 5), (1, 0, 6), (1, 1, 7)])?;
    let w = Matrix::new::<i32>(&lib, 2, 2)?;

    exec_mxm(&lib, &w, None, &MULT_I32, &PLUS_I32, &a, &b, None)?;
    assert_eq!(
        read_mat_i32(&lib, &w)?,
        vec![(0, 0, 17), (0, 1, 14), (1, 0, 39), (1, 1, 28)]
    );
    Ok(())
}

#[test]
fn mxm_spans_blocks() -> anyhow::Result<()> {
    // Identity × B == B with a 2-wide block grid.
    let lib = lib_with_block(2)?;
    let eye: Vec<(Index, Index, i32)> = (0..5).map(|i| (i, i, 1)).collect();
    let a = mat_i32(&lib, 5, 5, &eye)?;
    let b = mat_i32(
        &lib,
        5,
        5,
        &[(0, 4, 2), (1, 1, 3), (2, 0, 4), (3, 2, 5), (4, 4, 6)],
    )?;
    let w = Matrix::new::<i32>(&lib, 5, 5)?;

    exec_mxm(&lib, &w, None, &MULT_I32, &PLUS_I32, &a, &b, None)?;
    assert_eq!(read_mat_i32(&lib, &w)?, read_mat_i32(&lib, &b)?);
    Ok(())
}

#[test]
fn mxm_transpose_arg2_matches_mxmt() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let a = mat_i32(&lib, 2, 3, &[(0, 0, 1), (0, 2, 2), (1, 1, 3)])?;
    let b = mat_i32(&lib, 2, 3, &[(0, 0, 4), (0, 2, 5), (1, 1, 6)])?;

    let w1 = Matrix::new::<i32>(&lib, 2, 2)?;
    exec_mxmt_masked(&lib, &w1, None, &MULT_I32, &PLUS_I32, &a, &b, None)?;

    let w2 = Matrix::new::<i32>(&lib, 2, 2)?;
    let expr = Expression::new(&lib);
    let mut desc = Descriptor::new();
    desc.set(Param::TransposeArg2);
    expr.make_node(
        NodeOp::MxM {
            w: w2.clone(),
            mask: None,
            mult: MULT_I32.clone(),
            add: PLUS_I32.clone(),
            a: a.clone(),
            b: b.clone(),
        },
        desc,
    )?;
    expr.submit_wait()?;

    assert_eq!(read_mat_i32(&lib, &w1)?, read_mat_i32(&lib, &w2)?);
    assert_eq!(read_mat_i32(&lib, &w1)?, vec![(0, 0, 14), (1, 1, 18)]);
    Ok(())
}

#[test]
fn transpose_round_trip() -> anyhow::Result<()> {
    let lib = lib_with_block(2)?;
    let a = mat_i32(&lib, 3, 5, &[(0, 4, 1), (1, 0, 2), (2, 3, 3)])?;
    let t = Matrix::new::<i32>(&lib, 5, 3)?;
    let back = Matrix::new::<i32>(&lib, 3, 5)?;

    exec_m_transpose(&lib, &t, None, None, &a, None)?;
    assert_eq!(read_mat_i32(&lib, &t)?, vec![(0, 1, 2), (3, 2, 3), (4, 0, 1)]);

    exec_m_transpose(&lib, &back, None, None, &t, None)?;
    assert_eq!(read_mat_i32(&lib, &back)?, read_mat_i32(&lib, &a)?);
    Ok(())
}

#[test]
fn transpose_with_accum_merges_prior_output() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let a = mat_i32(&lib, 2, 2, &[(0, 1, 5)])?;
    let w = mat_i32(&lib, 2, 2, &[(1, 0, 2), (0, 0, 7)])?;

    exec_m_transpose(&lib, &w, None, Some(&PLUS_I32), &a, None)?;
    assert_eq!(read_mat_i32(&lib, &w)?, vec![(0, 0, 7), (1, 0, 7)]);
    Ok(())
}

#[test]
fn tril_triu_strict_triangles() -> anyhow::Result<()> {
    let lib = lib_with_block(2)?;
    let a = mat_i32(
        &lib,
        3,
        3,
        &[(0, 0, 1), (0, 2, 2), (1, 1, 3), (2, 0, 4), (2, 1, 5)],
    )?;
    let l = Matrix::new::<i32>(&lib, 3, 3)?;
    let u = Matrix::new::<i32>(&lib, 3, 3)?;

    exec_m_tril(&lib, &l, &a)?;
    exec_m_triu(&lib, &u, &a)?;
    assert_eq!(read_mat_i32(&lib, &l)?, vec![(2, 0, 4), (2, 1, 5)]);
    assert_eq!(read_mat_i32(&lib, &u)?, vec![(0, 2, 2)]);
    Ok(())
}

#[test]
fn triangle_count_on_three_cycle() -> anyhow::Result<()> {
    let lib = lib_with_block(2)?;
    let a = mat_i32(
        &lib,
        3,
        3,
        &[(0, 1, 1), (1, 0, 1), (0, 2, 1), (2, 0, 1), (1, 2, 1), (2, 1, 1)],
    )?;
    let l = Matrix::new::<i32>(&lib, 3, 3)?;
    exec_m_tril(&lib, &l, &a)?;

    // B<L> = L × Lᵀ, then the triangle count is Σ B.
    let b = Matrix::new::<i32>(&lib, 3, 3)?;
    exec_mxmt_masked(&lib, &b, Some(&l), &MULT_I32, &PLUS_I32, &l, &l, None)?;

    let n = Scalar::new::<i32>(&lib);
    exec_m_reduce_scalar(&lib, &n, None, None, &PLUS_I32, &b, None)?;
    assert_eq!(n.get::<i32>()?, 1);
    Ok(())
}
