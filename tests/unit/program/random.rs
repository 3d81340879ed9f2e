use super::*;

#[test]
fn mt19937_matches_reference_vector() {
    // Reference output of init_genrand(5489).
    let mut mt = Mt19937::new(5489);
    assert_eq!(mt.next_u32(), 3_499_211_612);
    assert_eq!(mt.next_u32(), 581_869_302);
    assert_eq!(mt.next_u32(), 3_890_346_734);
}

#[test]
fn same_seed_same_stream() {
    let mut a = DeterministicRandom::new(42);
    let mut b = DeterministicRandom::new(42);
    for _ in 0..1000 {
        assert_eq!(a.uniform01().to_bits(), b.uniform01().to_bits());
        assert_eq!(a.uniform_int(-5, 17).unwrap(), b.uniform_int(-5, 17).unwrap());
    }
    let mut xs = (0..50).collect::<Vec<_>>();
    let mut ys = xs.clone();
    a.shuffle(&mut xs);
    b.shuffle(&mut ys);
    assert_eq!(xs, ys);
    assert_eq!(a.uuid(), b.uuid());
}

#[test]
fn different_seeds_diverge() {
    let mut a = DeterministicRandom::new(1);
    let mut b = DeterministicRandom::new(2);
    let xs = (0..8).map(|_| a.next_u32()).collect::<Vec<_>>();
    let ys = (0..8).map(|_| b.next_u32()).collect::<Vec<_>>();
    assert_ne!(xs, ys);
}

#[test]
fn uniform01_is_half_open() {
    let mut r = DeterministicRandom::new(7);
    for _ in 0..10_000 {
        let v = r.uniform01();
        assert!((0.0..1.0).contains(&v));
    }
}

#[test]
fn uniform_int_stays_in_bounds() {
    let mut r = DeterministicRandom::new(99);
    for (lo, hi) in [(0, 1), (0, 2), (-3, 3), (30, 45), (0, 1_000_003)] {
        for _ in 0..2000 {
            let x = r.uniform_int(lo, hi).unwrap();
            assert!(lo <= x && x < hi, "{x} outside [{lo}, {hi})");
        }
    }
}

#[test]
fn uniform_int_rejects_empty_range() {
    let mut r = DeterministicRandom::new(0);
    let err = r.uniform_int(5, 5).unwrap_err();
    assert_eq!(err.name, "RangeError");
    assert!(r.uniform_int(6, 5).is_err());
}

#[test]
fn uniform_int_chi_square_is_consistent_with_uniform() {
    let mut r = DeterministicRandom::new(2024);
    let k = 10usize;
    let n = 100_000usize;
    let mut counts = vec![0usize; k];
    for _ in 0..n {
        counts[r.uniform_int(0, k as i64).unwrap() as usize] += 1;
    }
    let expected = n as f64 / k as f64;
    let chi2 = counts
        .iter()
        .map(|&c| {
            let d = c as f64 - expected;
            d * d / expected
        })
        .sum::<f64>();
    // 9 degrees of freedom, p = 0.001 critical value.
    assert!(chi2 < 27.88, "chi2 = {chi2}");
}

#[test]
fn shuffle_is_a_permutation() {
    let mut r = DeterministicRandom::new(3);
    for len in [0usize, 1, 2, 5, 64] {
        let mut xs = (0..len).collect::<Vec<_>>();
        r.shuffle(&mut xs);
        let mut sorted = xs.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..len).collect::<Vec<_>>());
    }
}

#[test]
fn shuffle_distribution_approaches_uniform() {
    use std::collections::HashMap;

    let mut counts = HashMap::<Vec<u8>, usize>::new();
    let trials = 60_000usize;
    for seed in 0..trials as u32 {
        let mut r = DeterministicRandom::new(seed);
        let mut xs = vec![0u8, 1, 2];
        r.shuffle(&mut xs);
        *counts.entry(xs).or_default() += 1;
    }
    assert_eq!(counts.len(), 6);
    let expected = trials as f64 / 6.0;
    for (perm, c) in counts {
        let rel = (c as f64 - expected).abs() / expected;
        assert!(rel < 0.05, "permutation {perm:?} seen {c} times");
    }
}

#[test]
fn uuid_has_v4_layout() {
    let mut r = DeterministicRandom::new(11);
    for _ in 0..100 {
        let u = r.uuid();
        assert_eq!(u.len(), 36);
        let bytes = u.as_bytes();
        for pos in [8, 13, 18, 23] {
            assert_eq!(bytes[pos], b'-');
        }
        assert_eq!(bytes[14], b'4');
        assert!(matches!(bytes[19], b'8' | b'9' | b'a' | b'b'));
        assert!(u.chars().all(|c| c == '-' || c.is_ascii_hexdigit()));
    }
}
