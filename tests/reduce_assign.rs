mod common;

use common::*;
use tessella::*;

#[test]
fn reduce_vector_to_scalar() -> anyhow::Result<()> {
    let lib = lib_with_block(3)?;
    let v = vec_i32(&lib, 10, &[(0, 1), (4, 2), (9, 4)])?;
    let s = Scalar::new::<i32>(&lib);

    exec_v_reduce(&lib, &s, None, None, &PLUS_I32, &v, None)?;
    assert_eq!(s.get::<i32>()?, 7);
    Ok(())
}

#[test]
fn reduce_is_block_size_independent() -> anyhow::Result<()> {
    let entries: Vec<(Index, i32)> = (0..20).map(|i| (i, i as i32 + 1)).collect();
    let mut results = Vec::new();
    for block in [1, 2, 3, 7, 1000] {
        let lib = lib_with_block(block)?;
        let v = vec_i32(&lib, 20, &entries)?;
        let s = Scalar::new::<i32>(&lib);
        exec_v_reduce(&lib, &s, None, None, &PLUS_I32, &v, None)?;
        results.push(s.get::<i32>()?);
    }
    assert!(results.iter().all(|r| *r == 210));
    Ok(())
}

#[test]
fn reduce_empty_vector_leaves_no_value() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = Vector::new::<i32>(&lib, 5)?;
    let s = Scalar::new::<i32>(&lib);

    exec_v_reduce(&lib, &s, None, None, &PLUS_I32, &v, None)?;
    let err = s.get::<i32>().unwrap_err();
    assert_eq!(err.downcast_ref::<Status>(), Some(&Status::NoValue));
    Ok(())
}

#[test]
fn reduce_with_accum_folds_prior_value() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = vec_i32(&lib, 5, &[(1, 10), (3, 5)])?;
    let s = Scalar::from_value(&lib, 100i32);

    exec_v_reduce(&lib, &s, None, None, &PLUS_I32, &v, Some(Descriptor::new().with(Param::AccumResult)))
        .unwrap_err();
    // AccumResult without an accum op is rejected at node creation.

    exec_v_reduce(&lib, &s, None, Some(&PLUS_I32), &PLUS_I32, &v, None)?;
    assert_eq!(s.get::<i32>()?, 115);
    Ok(())
}

#[test]
fn reduce_with_min_op() -> anyhow::Result<()> {
    let lib = lib_with_block(2)?;
    let v = vec_i32(&lib, 8, &[(0, 9), (3, -2), (7, 5)])?;
    let s = Scalar::new::<i32>(&lib);

    exec_v_reduce(&lib, &s, None, None, &MIN_I32, &v, None)?;
    assert_eq!(s.get::<i32>()?, -2);
    Ok(())
}

#[test]
fn masked_reduce_filters_entries() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = vec_i32(&lib, 6, &[(0, 1), (2, 2), (5, 4)])?;
    let mask = vec_i32(&lib, 6, &[(2, 1), (5, 1)])?;
    let s = Scalar::new::<i32>(&lib);

    exec_v_reduce(&lib, &s, Some(&mask), None, &PLUS_I32, &v, None)?;
    assert_eq!(s.get::<i32>()?, 6);

    exec_v_reduce(&lib, &s, Some(&mask), None, &PLUS_I32, &v, Some(complement_desc()))?;
    assert_eq!(s.get::<i32>()?, 1);
    Ok(())
}

#[test]
fn matrix_reduce_scalar() -> anyhow::Result<()> {
    let lib = lib_with_block(2)?;
    let m = mat_i32(&lib, 4, 4, &[(0, 0, 1), (1, 3, 2), (3, 2, 4)])?;
    let s = Scalar::new::<i32>(&lib);

    exec_m_reduce_scalar(&lib, &s, None, None, &PLUS_I32, &m, None)?;
    assert_eq!(s.get::<i32>()?, 7);
    Ok(())
}

#[test]
fn matrix_reduce_by_row() -> anyhow::Result<()> {
    let lib = lib_with_block(2)?;
    let m = mat_i32(&lib, 5, 4, &[(0, 0, 1), (0, 3, 2), (2, 1, 4), (4, 2, 8)])?;
    let v = Vector::new::<i32>(&lib, 5)?;

    exec_m_reduce_by_row(&lib, &v, &m, &PLUS_I32, None, None)?;
    assert_eq!(read_vec_i32(&lib, &v)?, vec![(0, 3), (2, 4), (4, 8)]);
    Ok(())
}

#[test]
fn matrix_reduce_by_row_with_init_seed() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let m = mat_i32(&lib, 3, 3, &[(0, 0, 1), (2, 1, 2), (2, 2, 3)])?;
    let v = Vector::new::<i32>(&lib, 3)?;
    let init = Scalar::from_value(&lib, 100i32);

    exec_m_reduce_by_row(&lib, &v, &m, &PLUS_I32, Some(&init), None)?;
    assert_eq!(read_vec_i32(&lib, &v)?, vec![(0, 101), (2, 105)]);
    Ok(())
}

#[test]
fn assign_masked_writes_scalar() -> anyhow::Result<()> {
    let lib = lib_with_block(3)?;
    let w = vec_i32(&lib, 7, &[(0, 1), (5, 2)])?;
    let mask = vec_i32(&lib, 7, &[(0, 1), (3, 1)])?;
    let s = Scalar::from_value(&lib, 9i32);

    exec_v_assign_masked(&lib, &w, Some(&mask), None, &s, None)?;
    assert_eq!(read_vec_i32(&lib, &w)?, vec![(0, 9), (3, 9), (5, 2)]);
    Ok(())
}

#[test]
fn assign_with_accum_combines_prior_entries() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let w = vec_i32(&lib, 6, &[(1, 10), (4, 20)])?;
    let mask = vec_i32(&lib, 6, &[(1, 1), (2, 1)])?;
    let s = Scalar::from_value(&lib, 5i32);

    exec_v_assign_masked(&lib, &w, Some(&mask), Some(&PLUS_I32), &s, None)?;
    assert_eq!(read_vec_i32(&lib, &w)?, vec![(1, 15), (2, 5), (4, 20)]);
    Ok(())
}

#[test]
fn assign_complement_mask() -> anyhow::Result<()> {
    let lib = lib_with_block(3)?;
    let w = Vector::new::<i32>(&lib, 5)?;
    let mask = vec_i32(&lib, 5, &[(1, 1), (3, 1)])?;
    let s = Scalar::from_value(&lib, 7i32);

    exec_v_assign_masked(&lib, &w, Some(&mask), None, &s, Some(complement_desc()))?;
    assert_eq!(read_vec_i32(&lib, &w)?, vec![(0, 7), (2, 7), (4, 7)]);
    Ok(())
}

#[test]
fn extract_row_maps_into_vector() -> anyhow::Result<()> {
    let lib = lib_with_block(2)?;
    let m = mat_i32(&lib, 3, 5, &[(1, 0, 2), (1, 3, 4), (1, 4, 6), (2, 2, 9)])?;
    let r = Vector::new::<i32>(&lib, 5)?;

    exec_m_extract_row(&lib, &r, &m, &IDENTITY_I32, 1)?;
    assert_eq!(read_vec_i32(&lib, &r)?, vec![(0, 2), (3, 4), (4, 6)]);

    exec_m_extract_row(&lib, &r, &m, &AINV_I32, 2)?;
    assert_eq!(read_vec_i32(&lib, &r)?, vec![(2, -9)]);
    Ok(())
}

#[test]
fn count_nz_counts_entries() -> anyhow::Result<()> {
    let lib = lib_with_block(2)?;
    let v = vec_i32(&lib, 9, &[(0, 1), (4, 2), (8, 3)])?;
    let s = Scalar::new::<u32>(&lib);

    exec_v_count_nz(&lib, &s, &v)?;
    assert_eq!(s.get::<u32>()?, 3);
    Ok(())
}

#[test]
fn data_write_collapses_duplicates_last_wins() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = Vector::new::<i32>(&lib, 5)?;
    exec_v_data_write(&lib, &v, vec![(1, 1), (3, 3), (1, 7)], None)?;
    assert_eq!(read_vec_i32(&lib, &v)?, vec![(1, 7), (3, 3)]);
    Ok(())
}

#[test]
fn data_write_rejects_out_of_range_indices() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = Vector::new::<i32>(&lib, 5)?;
    let err = exec_v_data_write(&lib, &v, vec![(5, 1)], None).unwrap_err();
    assert_eq!(err.downcast_ref::<Status>(), Some(&Status::InvalidArgument));
    Ok(())
}
