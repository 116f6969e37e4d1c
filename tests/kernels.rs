use tessella::kernels::*;
use tessella::Index;

#[test]
fn reduce_by_key_collapses_runs() {
    let keys: Vec<Index> = vec![0, 0, 0, 2, 5, 5];
    let vals = vec![1, 2, 3, 4, 5, 6];
    let mut out_keys = Vec::new();
    let mut out_vals = Vec::new();
    reduce_by_key(&keys, &vals, &mut out_keys, &mut out_vals, &|a, b| a + b);
    assert_eq!(out_keys, vec![0, 2, 5]);
    assert_eq!(out_vals, vec![6, 4, 11]);
}

#[test]
fn reduce_duplicates_matches_contract() {
    // At most two occurrences per key, the shape a two-way merge makes.
    let keys: Vec<Index> = vec![0, 0, 1, 2, 3, 3, 4, 5, 5];
    let vals = vec![-1, 2, 4, 9, 0, -1, 4, 10, 20];
    let mut out_keys = Vec::new();
    let mut out_vals = Vec::new();
    reduce_duplicates(&keys, &vals, &mut out_keys, &mut out_vals, &|a, b| a + b);
    assert_eq!(out_keys, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(out_vals, vec![1, 4, 9, -1, 4, 30]);
}

#[test]
fn merge_by_key_is_stable() {
    let a_keys: Vec<Index> = vec![0, 2, 4];
    let a_vals = vec!["a0", "a2", "a4"];
    let b_keys: Vec<Index> = vec![1, 2, 5];
    let b_vals = vec!["b1", "b2", "b5"];
    let mut keys = Vec::new();
    let mut vals = Vec::new();
    merge_by_key(&a_keys, &a_vals, &b_keys, &b_vals, &mut keys, &mut vals);
    assert_eq!(keys, vec![0, 1, 2, 2, 4, 5]);
    // On a tie the left sequence comes first.
    assert_eq!(vals, vec!["a0", "b1", "a2", "b2", "a4", "b5"]);
}

#[test]
fn mask_by_key_direct_and_complement() {
    let mask: Vec<Index> = vec![1, 3];
    let keys: Vec<Index> = vec![0, 1, 2, 3];
    let vals = vec![10, 11, 12, 13];
    let mut ok = Vec::new();
    let mut ov = Vec::new();
    mask_by_key(&mask, &keys, &vals, &mut ok, &mut ov, false);
    assert_eq!(ok, vec![1, 3]);
    assert_eq!(ov, vec![11, 13]);
    mask_by_key(&mask, &keys, &vals, &mut ok, &mut ov, true);
    assert_eq!(ok, vec![0, 2]);
    assert_eq!(ov, vec![10, 12]);
}

#[test]
fn mask_by_key_pair_keys() {
    let mask = vec![(0u32, 1u32), (1, 0)];
    let keys = vec![(0u32, 0u32), (0, 1), (1, 0), (1, 1)];
    let vals = vec![1, 2, 3, 4];
    let mut ok = Vec::new();
    let mut ov = Vec::new();
    mask_by_key(&mask, &keys, &vals, &mut ok, &mut ov, false);
    assert_eq!(ok, vec![(0, 1), (1, 0)]);
    assert_eq!(ov, vec![2, 3]);
}

#[test]
fn sort_by_key_applies_permutation_to_values() {
    let mut keys: Vec<Index> = vec![3, 0, 2, 1];
    let mut vals = vec!["d", "a", "c", "b"];
    sort_by_key(&mut keys, &mut vals);
    assert_eq!(keys, vec![0, 1, 2, 3]);
    assert_eq!(vals, vec!["a", "b", "c", "d"]);
}

#[test]
fn gather_permutes() {
    let perm = vec![2usize, 0, 1];
    let src = vec![10, 20, 30];
    let mut dst = Vec::new();
    gather(&perm, &src, &mut dst);
    assert_eq!(dst, vec![30, 10, 20]);
}

#[test]
fn prefix_sum_is_exclusive() {
    let mut v = vec![1u32, 2, 3, 4];
    let total = prefix_sum(&mut v);
    assert_eq!(v, vec![0, 1, 3, 6]);
    assert_eq!(total, 10);
}

#[test]
fn transform_values_maps_pairs() {
    let a_map = vec![0usize, 2];
    let b_map = vec![1usize, 0];
    let a_vals = vec![1, 2, 3];
    let b_vals = vec![10, 20];
    let mut out: Vec<i32> = Vec::new();
    transform_values(&a_map, &b_map, &a_vals, &b_vals, &mut out, &|a, b| a * b);
    assert_eq!(out, vec![20, 30]);
}
