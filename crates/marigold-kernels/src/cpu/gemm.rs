//! Accumulating matrix multiply, `C += A·B`, over row-major `f32` slices.
//!
//! All variants share one accumulation order: every output element
//! `c[i][j]` receives its products one at a time with `p` ascending,
//! `c = c + a[i][p] * b[p][j]`, no fused multiply-add. The blocked kernels are
//! therefore bit-identical to the naive `i-p-j` triple loop, and the
//! transposed variants are bit-identical to the plain one on the same
//! logical operands.
//!
//! Blocking: four rows of `C` and four steps of `p` are processed together,
//! holding a 4×4 tile of `A` in registers while streaming one row of `C`
//! per output row across `n`. Row and depth tails fall back to single rows
//! and single steps. The kernel never zeroes `C`.

/// `C[m×n] += A[m×k] · B[k×n]`.
pub fn matmul_accumulate(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    debug_assert!(a.len() >= m * k, "A has {} elements, need {}", a.len(), m * k);
    debug_assert!(b.len() >= k * n, "B has {} elements, need {}", b.len(), k * n);
    debug_assert!(c.len() >= m * n, "C has {} elements, need {}", c.len(), m * n);
    gemm_core(|i, p| a[i * k + p], b, c, m, k, n);
}

/// `C[m×n] += Aᵗ · B[k×n]` with `A` stored as `k×m`.
pub fn matmul_accumulate_transpose_a(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    k: usize,
    n: usize,
) {
    debug_assert!(a.len() >= k * m, "A has {} elements, need {}", a.len(), k * m);
    debug_assert!(b.len() >= k * n, "B has {} elements, need {}", b.len(), k * n);
    debug_assert!(c.len() >= m * n, "C has {} elements, need {}", c.len(), m * n);
    gemm_core(|i, p| a[p * m + i], b, c, m, k, n);
}

/// `C[m×n] += A[m×k] · Bᵗ` with `B` stored as `n×k`, reading `B` in place.
///
/// Walks `B` with stride `k`; prefer
/// [`matmul_accumulate_transpose_b_cached`] when a scratch buffer is at hand
/// and `m` is large.
pub fn matmul_accumulate_transpose_b(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    k: usize,
    n: usize,
) {
    debug_assert!(a.len() >= m * k, "A has {} elements, need {}", a.len(), m * k);
    debug_assert!(b.len() >= n * k, "B has {} elements, need {}", b.len(), n * k);
    debug_assert!(c.len() >= m * n, "C has {} elements, need {}", c.len(), m * n);

    let k_main = k - k % 4;
    for (a_row, c_row) in a.chunks_exact(k.max(1)).zip(c.chunks_exact_mut(n.max(1))).take(m) {
        for (j, out) in c_row.iter_mut().enumerate() {
            let b_row = &b[j * k..(j + 1) * k];
            let mut acc = *out;
            let mut p = 0;
            while p < k_main {
                acc = acc
                    + a_row[p] * b_row[p]
                    + a_row[p + 1] * b_row[p + 1]
                    + a_row[p + 2] * b_row[p + 2]
                    + a_row[p + 3] * b_row[p + 3];
                p += 4;
            }
            for p in k_main..k {
                acc += a_row[p] * b_row[p];
            }
            *out = acc;
        }
    }
}

/// Same contract as [`matmul_accumulate_transpose_b`], but first transposes
/// `B` into `scratch` (`k×n`) and runs the contiguous kernel.
pub fn matmul_accumulate_transpose_b_cached(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    scratch: &mut [f32],
    m: usize,
    k: usize,
    n: usize,
) {
    debug_assert!(scratch.len() >= k * n, "scratch has {} elements, need {}", scratch.len(), k * n);
    transpose(b, scratch, n, k);
    matmul_accumulate(a, scratch, c, m, k, n);
}

/// Write the `cols×rows` transpose of `src` (`rows×cols`) into `dst`.
pub fn transpose(src: &[f32], dst: &mut [f32], rows: usize, cols: usize) {
    debug_assert!(src.len() >= rows * cols);
    debug_assert!(dst.len() >= rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            dst[c * rows + r] = src[r * cols + c];
        }
    }
}

// ── Blocked core ───────────────────────────────────────────────────

#[inline(always)]
fn gemm_core<A>(a_at: A, b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize)
where
    A: Fn(usize, usize) -> f32,
{
    if n == 0 {
        return;
    }
    let m_main = m - m % 4;
    let (c_main, c_tail) = c[..m * n].split_at_mut(m_main * n);

    for (block, c_block) in c_main.chunks_exact_mut(4 * n).enumerate() {
        let i = block * 4;
        let (c0, rest) = c_block.split_at_mut(n);
        let (c1, rest) = rest.split_at_mut(n);
        let (c2, c3) = rest.split_at_mut(n);
        row_block_4(&a_at, b, [c0, c1, c2, c3], i, k, n);
    }

    for (r, c_row) in c_tail.chunks_exact_mut(n).enumerate() {
        row_single(&a_at, b, c_row, m_main + r, k, n);
    }
}

#[inline(always)]
fn row_block_4<A>(a_at: &A, b: &[f32], rows: [&mut [f32]; 4], i: usize, k: usize, n: usize)
where
    A: Fn(usize, usize) -> f32,
{
    let [c0, c1, c2, c3] = rows;
    let k_main = k - k % 4;

    let mut p = 0;
    while p < k_main {
        let tile = |r: usize| [a_at(i + r, p), a_at(i + r, p + 1), a_at(i + r, p + 2), a_at(i + r, p + 3)];
        let (t0, t1, t2, t3) = (tile(0), tile(1), tile(2), tile(3));
        let b0 = &b[p * n..(p + 1) * n];
        let b1 = &b[(p + 1) * n..(p + 2) * n];
        let b2 = &b[(p + 2) * n..(p + 3) * n];
        let b3 = &b[(p + 3) * n..(p + 4) * n];
        for j in 0..n {
            let (x0, x1, x2, x3) = (b0[j], b1[j], b2[j], b3[j]);
            c0[j] = c0[j] + t0[0] * x0 + t0[1] * x1 + t0[2] * x2 + t0[3] * x3;
            c1[j] = c1[j] + t1[0] * x0 + t1[1] * x1 + t1[2] * x2 + t1[3] * x3;
            c2[j] = c2[j] + t2[0] * x0 + t2[1] * x1 + t2[2] * x2 + t2[3] * x3;
            c3[j] = c3[j] + t3[0] * x0 + t3[1] * x1 + t3[2] * x2 + t3[3] * x3;
        }
        p += 4;
    }

    for p in k_main..k {
        let t = [a_at(i, p), a_at(i + 1, p), a_at(i + 2, p), a_at(i + 3, p)];
        let b_row = &b[p * n..(p + 1) * n];
        for j in 0..n {
            let x = b_row[j];
            c0[j] += t[0] * x;
            c1[j] += t[1] * x;
            c2[j] += t[2] * x;
            c3[j] += t[3] * x;
        }
    }
}

#[inline(always)]
fn row_single<A>(a_at: &A, b: &[f32], c_row: &mut [f32], i: usize, k: usize, n: usize)
where
    A: Fn(usize, usize) -> f32,
{
    let k_main = k - k % 4;

    let mut p = 0;
    while p < k_main {
        let t = [a_at(i, p), a_at(i, p + 1), a_at(i, p + 2), a_at(i, p + 3)];
        let b0 = &b[p * n..(p + 1) * n];
        let b1 = &b[(p + 1) * n..(p + 2) * n];
        let b2 = &b[(p + 2) * n..(p + 3) * n];
        let b3 = &b[(p + 3) * n..(p + 4) * n];
        for j in 0..n {
            c_row[j] = c_row[j] + t[0] * b0[j] + t[1] * b1[j] + t[2] * b2[j] + t[3] * b3[j];
        }
        p += 4;
    }

    for p in k_main..k {
        let t = a_at(i, p);
        for (out, &x) in c_row.iter_mut().zip(&b[p * n..(p + 1) * n]) {
            *out += t * x;
        }
    }
}
