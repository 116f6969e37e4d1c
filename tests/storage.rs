use std::sync::Arc;
use tessella::formats::{CooVec, DokVec, VecFormat};
use tessella::status::Status;
use tessella::storage::manager::{StorageControl, StorageManager};
use tessella::storage::vector::{build_vector_manager, VecStorage};
use tessella::blocks::BlockMap;
use tessella::types::Unit;

fn seeded_storage() -> VecStorage<i32> {
    // Entries 1→10, 3→30, 6→60 over two blocks of size 4.
    let mut st = VecStorage::<i32>::new(8, 4);
    let mut b0 = DokVec::new();
    b0.set(1, 10);
    b0.set(3, 30);
    let mut b1 = DokVec::new();
    b1.set(2, 60);
    let mut map = BlockMap::new();
    map.insert(0, b0);
    map.insert(1, b1);
    st.dok = Some(map);
    st.set_validity(1 << VecFormat::Dok.code());
    st
}

fn logical_entries(st: &VecStorage<i32>) -> Vec<(u32, u32, i32)> {
    let mut out: Vec<(u32, u32, i32)> = st
        .coo()
        .tiles
        .iter()
        .flat_map(|(b, t)| t.iter().map(|(i, v)| (*b, i, *v)).collect::<Vec<_>>())
        .collect();
    out.sort_unstable();
    out
}

#[test]
fn validate_rw_converts_and_keeps_source_valid() {
    let mgr = build_vector_manager::<i32>(None);
    let mut st = seeded_storage();

    mgr.validate_rw(VecFormat::Coo.code(), &mut st).unwrap();
    assert!(st.is_valid(VecFormat::Coo.code()));
    assert!(st.is_valid(VecFormat::Dok.code()));
    assert_eq!(logical_entries(&st), vec![(0, 1, 10), (0, 3, 30), (1, 2, 60)]);
}

#[test]
fn validate_rw_is_idempotent() {
    let mgr = build_vector_manager::<i32>(None);
    let mut st = seeded_storage();

    mgr.validate_rw(VecFormat::Coo.code(), &mut st).unwrap();
    let mask = st.validity();
    // The second call must be a no-op: same mask, same content.
    mgr.validate_rw(VecFormat::Coo.code(), &mut st).unwrap();
    assert_eq!(st.validity(), mask);
    assert_eq!(logical_entries(&st), vec![(0, 1, 10), (0, 3, 30), (1, 2, 60)]);
}

#[test]
fn conversion_chain_preserves_logical_content() {
    let mgr = build_vector_manager::<i32>(None);
    let mut st = seeded_storage();

    mgr.validate_rw(VecFormat::Dense.code(), &mut st).unwrap();
    mgr.validate_rw(VecFormat::Coo.code(), &mut st).unwrap();
    assert_eq!(logical_entries(&st), vec![(0, 1, 10), (0, 3, 30), (1, 2, 60)]);
}

#[test]
fn validate_rwd_invalidates_other_formats() {
    let mgr = build_vector_manager::<i32>(None);
    let mut st = seeded_storage();

    mgr.validate_rwd(VecFormat::Coo.code(), &mut st).unwrap();
    assert_eq!(st.validity(), 1 << VecFormat::Coo.code());
}

#[test]
fn validate_wd_discards_content() {
    let mgr = build_vector_manager::<i32>(None);
    let mut st = seeded_storage();
    mgr.validate_rw(VecFormat::Coo.code(), &mut st).unwrap();

    mgr.validate_wd(VecFormat::Coo.code(), &mut st).unwrap();
    assert_eq!(st.validity(), 1 << VecFormat::Coo.code());
    assert!(st.coo().tiles.is_empty());
}

#[test]
fn validate_ctor_leaves_validity_untouched() {
    let mgr = build_vector_manager::<i32>(None);
    let mut st = seeded_storage();
    let mask = st.validity();

    mgr.validate_ctor(VecFormat::Coo.code(), &mut st).unwrap();
    assert_eq!(st.validity(), mask);
    assert!(st.coo().tiles.is_empty());
}

#[test]
fn fresh_storage_validates_to_empty_format() {
    let mgr = build_vector_manager::<i32>(None);
    let mut st = VecStorage::<i32>::new(8, 4);
    mgr.validate_rw(VecFormat::Coo.code(), &mut st).unwrap();
    assert!(st.coo().tiles.is_empty());
    assert_eq!(st.validity(), 1 << VecFormat::Coo.code());
}

#[test]
fn structure_only_vectors_have_no_dense_path() {
    let mgr = build_vector_manager::<Unit>(None);
    let mut st = VecStorage::<Unit>::new(8, 4);
    let mut tile = CooVec::new();
    tile.push(1, Unit);
    let mut map = BlockMap::new();
    map.insert(0, tile);
    st.coo = Some(map);
    st.set_validity(1 << VecFormat::Coo.code());

    let err = mgr.validate_rw(VecFormat::Dense.code(), &mut st).unwrap_err();
    assert_eq!(err, Status::NotImplemented);
}

// A toy storage making the BFS path observable: formats 0..4 with
// converters 0→1 (first registered), 0→2, 1→3, 2→3.
#[derive(Default)]
struct ToyStorage {
    validity: u32,
    constructed: [bool; 4],
    log: Vec<(usize, usize)>,
}

impl StorageControl for ToyStorage {
    fn is_constructed(&self, format: usize) -> bool {
        self.constructed[format]
    }
    fn validity(&self) -> u32 {
        self.validity
    }
    fn set_validity(&mut self, mask: u32) {
        self.validity = mask;
    }
}

fn toy_manager() -> StorageManager<ToyStorage> {
    let mut m = StorageManager::new(4);
    for f in 0..4 {
        m.register_constructor(
            f,
            Arc::new(move |s: &mut ToyStorage| {
                s.constructed[f] = true;
                Ok(())
            }),
        );
    }
    for (from, to) in [(0usize, 1usize), (0, 2), (1, 3), (2, 3)] {
        m.register_converter(
            from,
            to,
            Arc::new(move |s: &mut ToyStorage| {
                s.log.push((from, to));
                Ok(())
            }),
        );
    }
    m
}

#[test]
fn bfs_takes_shortest_path_with_registration_order_ties() {
    let m = toy_manager();
    let mut s = ToyStorage::default();
    s.constructed[0] = true;
    s.set_validity(1);

    m.validate_rw(3, &mut s).unwrap();
    // Two equal-length paths exist; the first registered edge wins.
    assert_eq!(s.log, vec![(0, 1), (1, 3)]);
    assert!(s.is_valid(3));
    assert!(s.is_valid(1));
    assert!(s.is_valid(0));
}

#[test]
fn unreachable_format_is_not_implemented() {
    let mut m = StorageManager::<ToyStorage>::new(4);
    m.register_constructor(
        0,
        Arc::new(|s: &mut ToyStorage| {
            s.constructed[0] = true;
            Ok(())
        }),
    );
    let mut s = ToyStorage::default();
    s.constructed[0] = true;
    s.set_validity(1);
    assert_eq!(m.validate_rw(3, &mut s).unwrap_err(), Status::NotImplemented);
}
