//! Blocked GEMM versus the naive triple loop.
//!
//! Every variant accumulates each output element in ascending `p` order, so
//! equality with the reference is exact, not approximate.

use marigold_kernels::cpu::gemm::{
    matmul_accumulate, matmul_accumulate_transpose_a, matmul_accumulate_transpose_b,
    matmul_accumulate_transpose_b_cached, transpose,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── helpers ────────────────────────────────────────────────────────

fn random_vec(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// `C += A·B`, one product at a time, `i-p-j` order.
fn naive(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    for i in 0..m {
        for p in 0..k {
            for j in 0..n {
                c[i * n + j] += a[i * k + p] * b[p * n + j];
            }
        }
    }
}

fn bits(v: &[f32]) -> Vec<u32> {
    v.iter().map(|x| x.to_bits()).collect()
}

// ---------------------------------------------------------------------------
// Properties: multiples of four
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_blocked_gemm_is_bit_exact(
        m4 in 1usize..6,
        k4 in 1usize..6,
        n4 in 1usize..6,
        seed in any::<u64>(),
    ) {
        let (m, k, n) = (m4 * 4, k4 * 4, n4 * 4);
        let mut rng = StdRng::seed_from_u64(seed);
        let a = random_vec(&mut rng, m * k);
        let b = random_vec(&mut rng, k * n);
        let c0 = random_vec(&mut rng, m * n);

        let mut expected = c0.clone();
        naive(&a, &b, &mut expected, m, k, n);
        let mut actual = c0;
        matmul_accumulate(&a, &b, &mut actual, m, k, n);

        prop_assert_eq!(bits(&actual), bits(&expected));
    }

    #[test]
    fn prop_transposed_variants_match_reference(
        m4 in 1usize..5,
        k4 in 1usize..5,
        n4 in 1usize..5,
        seed in any::<u64>(),
    ) {
        let (m, k, n) = (m4 * 4, k4 * 4, n4 * 4);
        let mut rng = StdRng::seed_from_u64(seed);
        let a = random_vec(&mut rng, m * k);
        let b = random_vec(&mut rng, k * n);

        let mut a_t = vec![0.0; m * k];
        transpose(&a, &mut a_t, m, k);
        let mut b_t = vec![0.0; k * n];
        transpose(&b, &mut b_t, k, n);

        let mut expected = vec![0.0; m * n];
        naive(&a, &b, &mut expected, m, k, n);

        let mut via_a = vec![0.0; m * n];
        matmul_accumulate_transpose_a(&a_t, &b, &mut via_a, m, k, n);
        prop_assert_eq!(bits(&via_a), bits(&expected));

        let mut via_b = vec![0.0; m * n];
        matmul_accumulate_transpose_b(&a, &b_t, &mut via_b, m, k, n);
        prop_assert_eq!(bits(&via_b), bits(&expected));

        let mut via_cached = vec![0.0; m * n];
        let mut scratch = vec![0.0; k * n];
        matmul_accumulate_transpose_b_cached(&a, &b_t, &mut via_cached, &mut scratch, m, k, n);
        prop_assert_eq!(bits(&via_cached), bits(&expected));
    }
}

// ---------------------------------------------------------------------------
// Properties: arbitrary extents exercise the row and depth tails
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_tails_are_bit_exact(
        m in 1usize..11,
        k in 1usize..11,
        n in 1usize..11,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let a = random_vec(&mut rng, m * k);
        let b = random_vec(&mut rng, k * n);

        let mut expected = vec![0.5; m * n];
        naive(&a, &b, &mut expected, m, k, n);
        let mut actual = vec![0.5; m * n];
        matmul_accumulate(&a, &b, &mut actual, m, k, n);

        prop_assert_eq!(bits(&actual), bits(&expected));
    }
}

// ── fixed cases ────────────────────────────────────────────────────

#[test]
fn identity_leaves_operand_unchanged() {
    let n = 8;
    let mut eye = vec![0.0f32; n * n];
    for i in 0..n {
        eye[i * n + i] = 1.0;
    }
    let a: Vec<f32> = (0..n * n).map(|i| i as f32 * 0.25).collect();
    let mut c = vec![0.0; n * n];
    matmul_accumulate(&a, &eye, &mut c, n, n, n);
    assert_eq!(c, a);
}

#[test]
fn never_zeroes_output() {
    let a = vec![0.0f32; 16];
    let b = vec![0.0f32; 16];
    let mut c = vec![3.0f32; 16];
    matmul_accumulate(&a, &b, &mut c, 4, 4, 4);
    assert!(c.iter().all(|&v| v == 3.0));
}

#[test]
fn large_square_matches_reference() {
    let mut rng = StdRng::seed_from_u64(2024);
    let (m, k, n) = (64, 192, 48);
    let a = random_vec(&mut rng, m * k);
    let b = random_vec(&mut rng, k * n);
    let mut expected = vec![0.0; m * n];
    naive(&a, &b, &mut expected, m, k, n);
    let mut actual = vec![0.0; m * n];
    matmul_accumulate(&a, &b, &mut actual, m, k, n);
    assert_eq!(bits(&actual), bits(&expected));
}
