mod common;

use common::*;
use tessella::dispatch::{generic_key, node_key};
use tessella::*;

fn eadd_node(lib: &Library, masked: bool, complement: bool) -> anyhow::Result<ExprNode> {
    let a = Vector::new::<i32>(lib, 4)?;
    let b = Vector::new::<i32>(lib, 4)?;
    let w = Vector::new::<i32>(lib, 4)?;
    let mask = masked.then(|| Vector::new::<i32>(lib, 4).unwrap());
    let mut desc = Descriptor::new();
    if complement {
        desc.set(Param::MaskComplement);
    }
    Ok(ExprNode {
        index: 0,
        op: NodeOp::VEwiseAdd { w, mask, op: PLUS_I32.clone(), a, b },
        desc,
        preds: vec![],
        succs: vec![],
    })
}

#[test]
fn keys_concatenate_name_ops_and_mask() -> anyhow::Result<()> {
    let lib = cpu_only_lib(4)?;
    assert_eq!(node_key(&eadd_node(&lib, false, false)?), "v_eadd_plus_iii_md");
    assert_eq!(node_key(&eadd_node(&lib, true, true)?), "v_eadd_plus_iii_mc");
    assert_eq!(generic_key(&eadd_node(&lib, false, false)?), "v_eadd_ti_md");
    Ok(())
}

#[test]
fn op_less_nodes_key_on_the_type_tag() -> anyhow::Result<()> {
    let lib = cpu_only_lib(4)?;
    let x = Vector::new::<f64>(&lib, 4)?;
    let node = ExprNode {
        index: 0,
        op: NodeOp::VDataWrite { x, data: std::sync::Arc::new(Vec::<(Index, f64)>::new()) },
        desc: Descriptor::new(),
        preds: vec![],
        succs: vec![],
    };
    assert_eq!(node_key(&node), "v_data_write_td");
    Ok(())
}

#[test]
fn builtin_table_registers_cpu_keys() -> anyhow::Result<()> {
    let lib = cpu_only_lib(4)?;
    let registry = lib.registry();
    assert!(registry.has("v_eadd_plus_iii_md__cpu"));
    assert!(registry.has("v_eadd_plus_iii_mc__cpu"));
    assert!(registry.has("mxm_mult_ddd_plus_ddd_md__cpu"));
    assert!(registry.has("v_map_identity_uu__cpu"));
    assert!(registry.has("v_assign_masked_ti_md__cpu"));
    assert!(registry.has("m_reduce_by_row_min_lll__cpu"));
    // Bitwise ops only exist for the integer family.
    assert!(registry.has("v_reduce_bor_uuu_md__cpu"));
    assert!(!registry.has("v_reduce_bor_fff_md__cpu"));
    Ok(())
}

#[test]
fn accelerated_library_also_registers_device_keys() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let registry = lib.registry();
    assert!(registry.has("v_eadd_plus_iii_md__gpu_ref"));
    assert!(registry.has("v_reduce_plus_iii_md__gpu_ref"));
    assert!(registry.has("v_assign_masked_ti_md__gpu_ref"));
    // No device multiply kernels: the backend lacks atomic-add, so
    // these must resolve to the CPU entries.
    assert!(!registry.has("vxm_mult_iii_plus_iii_md__gpu_ref"));
    assert!(registry.has("vxm_mult_iii_plus_iii_md__cpu"));
    Ok(())
}

#[test]
fn user_defined_op_dispatches_through_generic_key() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let sat = OpBinary::make::<i32, i32, i32>("satadd", |a, b| a.saturating_add(b), None);
    assert_eq!(sat.key(), "satadd_iii");
    assert!(!lib.registry().has("v_eadd_satadd_iii_md__cpu"));

    let a = vec_i32(&lib, 4, &[(0, i32::MAX), (1, 1)])?;
    let b = vec_i32(&lib, 4, &[(0, 5), (1, 2)])?;
    let w = Vector::new::<i32>(&lib, 4)?;
    exec_v_eadd(&lib, &w, None, &sat, &a, &b, None)?;
    assert_eq!(read_vec_i32(&lib, &w)?, vec![(0, i32::MAX), (1, 3)]);
    Ok(())
}

#[test]
fn user_defined_semiring_multiplication() -> anyhow::Result<()> {
    // (min, +) tropical semiring over a small path matrix.
    let lib = lib_with_block(4)?;
    let tropical_mult = OpBinary::make::<i32, i32, i32>("tplus", |a, b| a + b, None);
    let tropical_add = OpBinary::make::<i32, i32, i32>("tmin", |a, b| a.min(b), None);

    let d = vec_i32(&lib, 3, &[(0, 0), (1, 10)])?;
    let adj = mat_i32(&lib, 3, 3, &[(0, 1, 7), (0, 2, 2), (1, 2, 1)])?;
    let w = Vector::new::<i32>(&lib, 3)?;

    exec_vxm_masked(&lib, &w, None, &tropical_mult, &tropical_add, &d, &adj, None)?;
    // w[1] = d[0] + 7 = 7; w[2] = min(d[0] + 2, d[1] + 1) = 2.
    assert_eq!(read_vec_i32(&lib, &w)?, vec![(1, 7), (2, 2)]);
    Ok(())
}

#[test]
fn cpu_and_accelerated_paths_agree() -> anyhow::Result<()> {
    let entries_a: Vec<(Index, i32)> = (0..12).step_by(2).map(|i| (i, i as i32)).collect();
    let entries_b: Vec<(Index, i32)> = (0..12).step_by(3).map(|i| (i, 100 - i as i32)).collect();

    let run = |lib: &Library| -> anyhow::Result<(Vec<(Index, i32)>, i32)> {
        let a = vec_i32(lib, 12, &entries_a)?;
        let b = vec_i32(lib, 12, &entries_b)?;
        let w = Vector::new::<i32>(lib, 12)?;
        exec_v_eadd(lib, &w, None, &PLUS_I32, &a, &b, None)?;
        let s = Scalar::new::<i32>(lib);
        exec_v_reduce(lib, &s, None, None, &PLUS_I32, &w, None)?;
        Ok((read_vec_i32(lib, &w)?, s.get::<i32>()?))
    };

    let accelerated = run(&lib_with_block(4)?)?;
    let cpu_only = run(&cpu_only_lib(4)?)?;
    assert_eq!(accelerated, cpu_only);
    Ok(())
}

#[test]
fn registry_add_and_find() -> anyhow::Result<()> {
    let lib = cpu_only_lib(4)?;
    let before = lib.registry().len();
    assert!(before > 0);
    assert!(lib.registry().find("no_such_key__cpu").is_none());
    Ok(())
}
