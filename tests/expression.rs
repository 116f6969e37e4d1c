mod common;

use common::*;
use tessella::*;

#[test]
fn states_move_through_lifecycle() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = Vector::new::<i32>(&lib, 4)?;
    let expr = Expression::new(&lib);
    assert_eq!(expr.state(), ExprState::Default);

    expr.data_write(&v, vec![(0, 1)], None)?;
    expr.submit_wait()?;
    assert_eq!(expr.state(), ExprState::Evaluated);

    // Resubmission of an evaluated expression is an error.
    let err = expr.submit_wait().unwrap_err();
    assert_eq!(err.downcast_ref::<Status>(), Some(&Status::InvalidState));
    Ok(())
}

#[test]
fn invalid_node_leaves_expression_untouched() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let a = Vector::new::<i32>(&lib, 4)?;
    let b = Vector::new::<i32>(&lib, 6)?; // dimension mismatch
    let w = Vector::new::<i32>(&lib, 4)?;
    let expr = Expression::new(&lib);

    let err = expr.ewise_add(&w, None, &PLUS_I32, &a, &b, None).unwrap_err();
    assert_eq!(err.downcast_ref::<Status>(), Some(&Status::InvalidArgument));
    assert!(expr.is_empty());
    Ok(())
}

#[test]
fn type_mismatch_is_rejected() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let a = Vector::new::<i32>(&lib, 4)?;
    let b = Vector::new::<f32>(&lib, 4)?;
    let w = Vector::new::<i32>(&lib, 4)?;
    let expr = Expression::new(&lib);

    let err = expr.ewise_add(&w, None, &PLUS_I32, &a, &b, None).unwrap_err();
    assert_eq!(err.downcast_ref::<Status>(), Some(&Status::InvalidArgument));

    // Op over the wrong element type is just as invalid.
    let err = expr.ewise_add(&w, None, &PLUS_F32, &a, &a, None).unwrap_err();
    assert_eq!(err.downcast_ref::<Status>(), Some(&Status::InvalidArgument));
    Ok(())
}

#[test]
fn dependency_orders_nodes() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = Vector::new::<i32>(&lib, 4)?;
    let w = Vector::new::<i32>(&lib, 4)?;
    let s = Scalar::new::<i32>(&lib);
    let expr = Expression::new(&lib);

    let write = expr.data_write(&v, vec![(0, 2), (3, 5)], None)?;
    let double = expr.map(&w, &v, &OpUnary::make::<i32, i32>("dbl", |a| a * 2, None), None)?;
    let sum = expr.reduce(&s, None, None, &PLUS_I32, &w, None)?;
    expr.dependency(write, double)?;
    expr.dependency(double, sum)?;
    expr.submit_wait()?;

    assert_eq!(s.get::<i32>()?, 14);
    Ok(())
}

#[test]
fn dependency_cycle_aborts_submission() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = Vector::new::<i32>(&lib, 4)?;
    let w = Vector::new::<i32>(&lib, 4)?;
    let expr = Expression::new(&lib);

    let n0 = expr.ewise_add(&w, None, &PLUS_I32, &v, &v, None)?;
    let n1 = expr.ewise_add(&v, None, &PLUS_I32, &w, &w, None)?;
    expr.dependency(n0, n1)?;
    expr.dependency(n1, n0)?;

    let err = expr.submit_wait().unwrap_err();
    assert_eq!(err.downcast_ref::<Status>(), Some(&Status::InvalidState));
    assert_eq!(expr.state(), ExprState::Aborted);
    assert_eq!(expr.failure(), Some(Status::InvalidState));
    Ok(())
}

#[test]
fn dependency_rejects_bad_indices() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = Vector::new::<i32>(&lib, 4)?;
    let expr = Expression::new(&lib);
    let n0 = expr.data_write(&v, vec![(0, 1)], None)?;

    assert!(expr.dependency(n0, n0).is_err());
    assert!(expr.dependency(n0, 7).is_err());
    Ok(())
}

#[test]
fn accum_result_without_accum_op_is_invalid() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let w = Vector::new::<i32>(&lib, 4)?;
    let s = Scalar::from_value(&lib, 1i32);
    let expr = Expression::new(&lib);

    let err = expr
        .assign(&w, None, None, &s, Some(Descriptor::new().with(Param::AccumResult)))
        .unwrap_err();
    assert_eq!(err.downcast_ref::<Status>(), Some(&Status::InvalidArgument));
    Ok(())
}

#[test]
fn device_pin_out_of_range_aborts() -> anyhow::Result<()> {
    let lib = cpu_only_lib(4)?;
    let v = vec_i32(&lib, 4, &[(0, 1)])?;
    let s = Scalar::new::<i32>(&lib);
    let expr = Expression::new(&lib);

    expr.reduce(&s, None, None, &PLUS_I32, &v, Some(Descriptor::new().with(Param::DeviceId0)))?;
    let err = expr.submit_wait().unwrap_err();
    assert_eq!(err.downcast_ref::<Status>(), Some(&Status::DeviceNotFound));
    assert_eq!(expr.state(), ExprState::Aborted);
    Ok(())
}

#[test]
fn failing_node_aborts_whole_expression() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = vec_i32(&lib, 4, &[(1, 3)])?;
    let w = Vector::new::<i64>(&lib, 4)?;
    let expr = Expression::new(&lib);

    // Cross-type map validates (the op signature fits the handles) but
    // no cross-type algorithm exists, so evaluation aborts.
    let widen = OpUnary::make::<i32, i64>("widen", |a| a as i64, None);
    expr.map(&w, &v, &widen, None)?;
    let err = expr.submit_wait().unwrap_err();
    assert!(err.downcast_ref::<Status>().is_some());
    assert_eq!(expr.state(), ExprState::Aborted);
    assert!(expr.failure().is_some());
    Ok(())
}

#[test]
fn independent_nodes_share_one_submission() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let a = Vector::new::<i32>(&lib, 4)?;
    let b = Vector::new::<i32>(&lib, 4)?;
    let expr = Expression::new(&lib);

    expr.data_write(&a, vec![(0, 1), (2, 2)], None)?;
    expr.data_write(&b, vec![(1, 5)], None)?;
    expr.submit_wait()?;

    assert_eq!(read_vec_i32(&lib, &a)?, vec![(0, 1), (2, 2)]);
    assert_eq!(read_vec_i32(&lib, &b)?, vec![(1, 5)]);
    Ok(())
}

#[test]
fn profiled_node_records_timing() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let v = Vector::new::<i32>(&lib, 4)?;
    let expr = Expression::new(&lib);

    expr.data_write(&v, vec![(0, 1)], Some(Descriptor::new().with(Param::ProfileTime)))?;
    expr.submit_wait()?;

    let report = lib.profiler().report();
    assert!(report.iter().any(|e| e.label.starts_with("v_data_write") && e.count == 1));
    Ok(())
}

#[test]
fn message_callback_receives_diagnostics() -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let hits = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&hits);
    let lib = Library::new(LibraryConfig {
        block_size: Some(4),
        workers: Some(1),
        message_callback: Some(Arc::new(move |_status, _msg, file, _function, _line| {
            assert!(!file.is_empty());
            sink.fetch_add(1, Ordering::SeqCst);
        })),
        ..Default::default()
    })?;

    // Initialisation already logs; a failed dispatch logs again.
    let baseline = hits.load(Ordering::SeqCst);
    assert!(baseline > 0);

    let v = vec_i32(&lib, 4, &[(0, 1)])?;
    let w = Vector::new::<i64>(&lib, 4)?;
    let widen = OpUnary::make::<i32, i64>("widen", |a| a as i64, None);
    let expr = Expression::new(&lib);
    expr.map(&w, &v, &widen, None)?;
    let _ = expr.submit_wait();
    assert!(hits.load(Ordering::SeqCst) > baseline);
    Ok(())
}

#[test]
fn scalar_accessors_round_trip() -> anyhow::Result<()> {
    let lib = lib_with_block(4)?;
    let s = Scalar::new::<i32>(&lib);
    assert!(!s.has_value());
    let err = s.get::<i32>().unwrap_err();
    assert_eq!(err.downcast_ref::<Status>(), Some(&Status::NoValue));

    s.set(42i32)?;
    assert_eq!(s.get::<i32>()?, 42);
    assert!(s.set(1.0f32).is_err());

    s.clear();
    assert!(!s.has_value());
    Ok(())
}
