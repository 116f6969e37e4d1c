use tessella::formats::*;
use tessella::Index;

fn sample_dok() -> Dok<i32> {
    let mut dok = Dok::new();
    dok.set(2, 1, 21);
    dok.set(0, 3, 3);
    dok.set(0, 1, 1);
    dok.set(3, 0, 30);
    dok.set(2, 2, 22);
    dok
}

fn entries<T: Copy>(it: impl Iterator<Item = (Index, Index, T)>) -> Vec<(Index, Index, T)> {
    it.collect()
}

#[test]
fn dok_to_csr_restores_invariants() {
    let csr = Csr::from_dok(4, &sample_dok());
    assert_eq!(csr.n_rows(), 4);
    assert_eq!(csr.values(), 5);
    // ap monotone
    assert!(csr.ap.windows(2).all(|w| w[0] <= w[1]));
    // aj strictly increasing per row
    for r in 0..csr.n_rows() {
        let (aj, _) = csr.row(r);
        assert!(aj.windows(2).all(|w| w[0] < w[1]));
    }
    assert_eq!(
        entries(csr.iter().map(|(i, j, v)| (i, j, *v))),
        vec![(0, 1, 1), (0, 3, 3), (2, 1, 21), (2, 2, 22), (3, 0, 30)]
    );
}

#[test]
fn csr_to_coo_expands_row_pointers() {
    let csr = Csr::from_dok(4, &sample_dok());
    let coo = Coo::from_csr(&csr);
    assert_eq!(
        entries(coo.iter().map(|(i, j, v)| (i, j, *v))),
        entries(csr.iter().map(|(i, j, v)| (i, j, *v)))
    );
}

#[test]
fn coo_to_lil_preserves_order() {
    let coo = Coo::from_dok(&sample_dok());
    let lil = Lil::from_coo(4, &coo);
    for row in &lil.rows {
        assert!(row.windows(2).all(|w| w[0].0 < w[1].0));
    }
    assert_eq!(
        entries(lil.iter().map(|(i, j, v)| (i, j, *v))),
        entries(coo.iter().map(|(i, j, v)| (i, j, *v)))
    );
}

#[test]
fn every_matrix_conversion_is_lossless() {
    let dok = sample_dok();
    let coo = Coo::from_dok(&dok);
    let reference = entries(coo.iter().map(|(i, j, v)| (i, j, *v)));

    let lil = Lil::from_dok(4, &dok);
    let csr = Csr::from_lil(&lil);
    assert_eq!(entries(csr.iter().map(|(i, j, v)| (i, j, *v))), reference);

    let back = Coo::from_lil(&Lil::from_csr(&Csr::from_coo(4, &coo)));
    assert_eq!(entries(back.iter().map(|(i, j, v)| (i, j, *v))), reference);

    let dok2 = Dok::from_csr(&Csr::from_coo(4, &coo));
    let coo2 = Coo::from_dok(&dok2);
    assert_eq!(entries(coo2.iter().map(|(i, j, v)| (i, j, *v))), reference);
}

#[test]
fn vector_conversions_are_lossless() {
    let mut dok = DokVec::new();
    dok.set(5, 50);
    dok.set(1, 10);
    dok.set(3, 30);

    let coo = CooVec::from_dok(&dok);
    assert_eq!(coo.ai, vec![1, 3, 5]);
    assert_eq!(coo.ax, vec![10, 30, 50]);

    let dense = DenseVec::from_coo(8, &coo);
    assert_eq!(dense.values(), 3);
    assert_eq!(dense.get(3), 30);
    assert!(!dense.is_present(0));

    let coo2 = CooVec::from_dense(&dense);
    assert_eq!(coo2.ai, coo.ai);
    assert_eq!(coo2.ax, coo.ax);

    let dok2 = DokVec::from_dense(&dense);
    assert_eq!(dok2.values(), 3);
    assert_eq!(dok2.map.get(&5), Some(&50));
}

#[test]
fn dense_fill_convention_drops_default_values() {
    let mut dense = DenseVec::<i32>::with_len(4);
    dense.set(1, 7);
    dense.set(2, 0); // fill value, logically absent
    assert_eq!(dense.values(), 1);
    let coo = CooVec::from_dense(&dense);
    assert_eq!(coo.ai, vec![1]);
}

#[test]
fn structure_only_tiles_have_no_value_storage() {
    use tessella::Unit;
    let mut dok = DokVec::<Unit>::new();
    dok.set(0, Unit);
    dok.set(7, Unit);
    let coo = CooVec::from_dok(&dok);
    assert_eq!(coo.ai, vec![0, 7]);
    assert_eq!(size_of::<Unit>(), 0);
}
