use tessella::accel::program::{ProgramBuilder, ProgramCache};
use tessella::accel::reference::ReferenceAccelerator;
use tessella::accel::Accelerator;
use tessella::formats::{AccCooVec, AccCsr, CooVec, Csr};
use tessella::Status;

#[test]
fn persistent_buffers_round_trip() {
    let acc = ReferenceAccelerator::new(2);
    let buf = acc.buffer_create(1, 8).unwrap();
    acc.buffer_write(&buf, 0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

    let mut out = [0u8; 4];
    acc.buffer_read(&buf, 2, &mut out).unwrap();
    assert_eq!(out, [3, 4, 5, 6]);

    let copy = acc.buffer_create(1, 8).unwrap();
    acc.buffer_copy(&buf, &copy).unwrap();
    let mut all = [0u8; 8];
    acc.buffer_read(&copy, 0, &mut all).unwrap();
    assert_eq!(all, [1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn unknown_device_is_reported() {
    let acc = ReferenceAccelerator::new(1);
    assert_eq!(acc.buffer_create(3, 8).unwrap_err(), Status::DeviceNotFound);
    assert_eq!(acc.scratch_reset(3).unwrap_err(), Status::DeviceNotFound);
}

#[test]
fn arena_reset_invalidates_scratch() {
    let acc = ReferenceAccelerator::new(1);
    let scratch = acc.scratch_alloc(0, 16).unwrap();
    acc.buffer_write(&scratch, 0, &[9; 16]).unwrap();

    let mut out = [0u8; 16];
    acc.buffer_read(&scratch, 0, &mut out).unwrap();
    assert_eq!(out, [9; 16]);

    acc.scratch_reset(0).unwrap();
    assert_eq!(
        acc.buffer_read(&scratch, 0, &mut out).unwrap_err(),
        Status::InvalidState
    );
}

#[test]
fn arena_grows_past_one_page() {
    let acc = ReferenceAccelerator::new(1);
    // Two big allocations force doubling growth within one generation.
    let a = acc.scratch_alloc(0, 5000).unwrap();
    let b = acc.scratch_alloc(0, 9000).unwrap();
    acc.buffer_write(&a, 0, &vec![1; 5000]).unwrap();
    acc.buffer_write(&b, 0, &vec![2; 9000]).unwrap();

    let mut out = vec![0u8; 5000];
    acc.buffer_read(&a, 0, &mut out).unwrap();
    assert!(out.iter().all(|x| *x == 1));
}

#[test]
fn counter_pool_recycles_zeroed_counters() {
    let acc = ReferenceAccelerator::new(1);
    let before = acc.counters_available(0).unwrap();
    let counter = acc.counter_acquire(0).unwrap();
    assert_eq!(acc.counters_available(0).unwrap(), before - 1);

    counter.fetch_add(5);
    assert_eq!(counter.load(), 5);
    acc.counter_release(0, counter);
    assert_eq!(acc.counters_available(0).unwrap(), before);

    let again = acc.counter_acquire(0).unwrap();
    assert_eq!(again.load(), 0);
    acc.counter_release(0, again);
}

#[test]
fn program_cache_caches_failures_negatively() {
    let acc = ReferenceAccelerator::new(1);
    let cache = ProgramCache::default();

    let broken = ProgramBuilder::new("v_eadd")
        .define("TYPE", "i32")
        .op_source("OP_BINARY", None)
        .build();
    assert!(broken.incomplete);

    let err = cache.get_or_compile(&acc, &broken).unwrap_err();
    assert_eq!(err, Status::CompilationError);
    assert_eq!(cache.len(), 1);

    // Second lookup hits the negative entry without recompiling.
    let err = cache.get_or_compile(&acc, &broken).unwrap_err();
    assert_eq!(err, Status::CompilationError);
    assert_eq!(cache.len(), 1);

    let good = ProgramBuilder::new("v_eadd")
        .define("TYPE", "i32")
        .op_source("OP_BINARY", Some("(a + b)"))
        .build();
    let program = cache.get_or_compile(&acc, &good).unwrap();
    assert_eq!(program.key, good.key);
    assert_eq!(cache.len(), 2);
}

#[test]
fn program_keys_separate_defines_and_fragments() {
    let a = ProgramBuilder::new("k").define("TYPE", "i32").build();
    let b = ProgramBuilder::new("k").define("TYPE", "f64").build();
    assert_ne!(a.key, b.key);
}

#[test]
fn coo_vec_twin_round_trips() {
    let acc = ReferenceAccelerator::new(1);
    let tile = CooVec::<i64> { ai: vec![1, 4, 9], ax: vec![-5, 0, 17] };
    let twin = AccCooVec::from_host(&acc, 0, &tile).unwrap();
    assert_eq!(twin.values(), 3);

    let back: CooVec<i64> = twin.to_host(&acc).unwrap();
    assert_eq!(back.ai, tile.ai);
    assert_eq!(back.ax, tile.ax);
}

#[test]
fn csr_twin_round_trips() {
    let acc = ReferenceAccelerator::new(1);
    let csr = Csr::<f32> { ap: vec![0, 1, 1, 3], aj: vec![2, 0, 1], ax: vec![0.5, 1.5, -2.0] };
    let twin = AccCsr::from_host(&acc, 0, &csr).unwrap();
    assert_eq!(twin.n_rows(), 3);

    let back: Csr<f32> = twin.to_host(&acc).unwrap();
    assert_eq!(back.ap, csr.ap);
    assert_eq!(back.aj, csr.aj);
    assert_eq!(back.ax, csr.ax);
}

#[test]
fn structure_only_twin_omits_value_buffer() {
    use tessella::Unit;
    let acc = ReferenceAccelerator::new(1);
    let tile = CooVec::<Unit> { ai: vec![0, 3], ax: vec![Unit, Unit] };
    let twin = AccCooVec::from_host(&acc, 0, &tile).unwrap();
    assert!(twin.ax.is_none());

    let back: CooVec<Unit> = twin.to_host(&acc).unwrap();
    assert_eq!(back.ai, vec![0, 3]);
}

#[test]
fn enqueue_is_unsupported_on_the_reference_backend() {
    let acc = ReferenceAccelerator::new(1);
    let source = ProgramBuilder::new("k").body("noop").build();
    let program = acc.compile(&source).unwrap();
    assert_eq!(
        acc.enqueue(&program, "noop", [1, 1], &[]).unwrap_err(),
        Status::NoAcceleration
    );
    acc.wait(0).unwrap();
}
