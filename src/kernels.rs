//! Shared low-level primitives for the per-operation algorithms and the
//! format converters.
//!
//! All primitives are total and deterministic, generic over an ordered
//! key type (vector kernels use `Index`, matrix kernels `(Index, Index)`
//! pairs), and allocate nothing beyond the caller-provided outputs:
//! every output vector is cleared and refilled.

use itertools::Itertools;

/// Collapse runs of equal keys by folding their values with `op`.
/// `keys` must be sorted.
pub fn reduce_by_key<K, T>(
    keys: &[K],
    values: &[T],
    out_keys: &mut Vec<K>,
    out_values: &mut Vec<T>,
    op: &dyn Fn(T, T) -> T,
) where
    K: Copy + Ord,
    T: Copy,
{
    debug_assert_eq!(keys.len(), values.len());
    debug_assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    out_keys.clear();
    out_values.clear();
    for (k, v) in keys.iter().zip(values.iter()) {
        match out_keys.last() {
            Some(last) if *last == *k => {
                let slot = out_values.last_mut().unwrap();
                *slot = op(*slot, *v);
            }
            _ => {
                out_keys.push(*k);
                out_values.push(*v);
            }
        }
    }
}

/// [`reduce_by_key`] specialised to the output of a two-way merge: the
/// contract guarantees at most two occurrences of any key.
pub fn reduce_duplicates<K, T>(
    keys: &[K],
    values: &[T],
    out_keys: &mut Vec<K>,
    out_values: &mut Vec<T>,
    op: &dyn Fn(T, T) -> T,
) where
    K: Copy + Ord,
    T: Copy,
{
    debug_assert!(
        keys.iter().dedup().count() * 2 >= keys.len(),
        "more than two duplicates per key"
    );
    reduce_by_key(keys, values, out_keys, out_values, op);
}

/// Stable merge of two sorted key/value sequences.
pub fn merge_by_key<K, T>(
    a_keys: &[K],
    a_vals: &[T],
    b_keys: &[K],
    b_vals: &[T],
    out_keys: &mut Vec<K>,
    out_vals: &mut Vec<T>,
) where
    K: Copy + Ord,
    T: Copy,
{
    out_keys.clear();
    out_vals.clear();
    out_keys.reserve(a_keys.len() + b_keys.len());
    out_vals.reserve(a_vals.len() + b_vals.len());
    let a = a_keys.iter().copied().zip(a_vals.iter().copied());
    let b = b_keys.iter().copied().zip(b_vals.iter().copied());
    for (k, v) in a.merge_by(b, |x, y| x.0 <= y.0) {
        out_keys.push(k);
        out_vals.push(v);
    }
}

/// Filter `(a_keys, a_vals)` by key presence in `mask_keys` (absence when
/// `complement` is set). Both key sequences must be sorted.
pub fn mask_by_key<K, T>(
    mask_keys: &[K],
    a_keys: &[K],
    a_vals: &[T],
    out_keys: &mut Vec<K>,
    out_vals: &mut Vec<T>,
    complement: bool,
) where
    K: Copy + Ord,
    T: Copy,
{
    out_keys.clear();
    out_vals.clear();
    let mut m = 0usize;
    for (k, v) in a_keys.iter().zip(a_vals.iter()) {
        while m < mask_keys.len() && mask_keys[m] < *k {
            m += 1;
        }
        let present = m < mask_keys.len() && mask_keys[m] == *k;
        if present != complement {
            out_keys.push(*k);
            out_vals.push(*v);
        }
    }
}

/// Sort keys by computing a permutation, then apply the permutation to
/// the parallel value array. Stable, so equal keys keep their order.
pub fn sort_by_key<K, T>(keys: &mut Vec<K>, values: &mut Vec<T>)
where
    K: Copy + Ord,
    T: Copy,
{
    debug_assert_eq!(keys.len(), values.len());
    let mut perm: Vec<usize> = (0..keys.len()).collect();
    perm.sort_by_key(|&i| keys[i]);
    let src_keys = keys.clone();
    let src_vals = values.clone();
    gather(&perm, &src_keys, keys);
    gather(&perm, &src_vals, values);
}

/// `dst[i] = src[perm[i]]`.
pub fn gather<T: Copy>(perm: &[usize], src: &[T], dst: &mut Vec<T>) {
    dst.clear();
    dst.reserve(perm.len());
    for &p in perm {
        dst.push(src[p]);
    }
}

/// Exclusive prefix sum in place; returns the total.
pub fn prefix_sum(values: &mut [u32]) -> u32 {
    let mut acc = 0u32;
    for v in values.iter_mut() {
        let next = acc + *v;
        *v = acc;
        acc = next;
    }
    acc
}

/// `out[i] = op(a_vals[a_map[i]], b_vals[b_map[i]])`.
pub fn transform_values<A, B, R>(
    a_map: &[usize],
    b_map: &[usize],
    a_vals: &[A],
    b_vals: &[B],
    out: &mut Vec<R>,
    op: &dyn Fn(A, B) -> R,
) where
    A: Copy,
    B: Copy,
{
    debug_assert_eq!(a_map.len(), b_map.len());
    out.clear();
    out.reserve(a_map.len());
    for (pa, pb) in a_map.iter().zip(b_map.iter()) {
        out.push(op(a_vals[*pa], b_vals[*pb]));
    }
}
