//! Strided GEMM used by the forward and backward passes.
//!
//! Every product in the network is some combination of `W`, `Wᵀ`, activations and
//! deltas. Transposes are expressed through strides, so no operand is copied:
//! - default: a simple, safe triple-loop implementation
//! - optional: a faster backend via the `matrixmultiply` feature

use crate::Matrix;

/// Borrowed row-major view over (a contiguous block of rows of) a matrix.
#[derive(Debug, Clone, Copy)]
pub(crate) struct View<'a> {
    pub rows: usize,
    pub cols: usize,
    pub data: &'a [f64],
}

impl<'a> View<'a> {
    /// Effective `(rows, cols, row_stride, col_stride)` after an optional transpose.
    #[inline]
    fn op(self, transpose: bool) -> (usize, usize, usize, usize) {
        if transpose {
            (self.cols, self.rows, 1, self.cols)
        } else {
            (self.rows, self.cols, self.cols, 1)
        }
    }
}

/// `out = alpha * op(a) * op(b)`, overwriting `out`.
///
/// Callers guarantee the inner dimensions agree and that `out` has the result shape.
pub(crate) fn mul_into(
    a: View<'_>,
    transpose_a: bool,
    b: View<'_>,
    transpose_b: bool,
    alpha: f64,
    out: &mut Matrix,
) {
    let (m, k, rsa, csa) = a.op(transpose_a);
    let (kb, n, rsb, csb) = b.op(transpose_b);
    debug_assert_eq!(k, kb, "inner dimensions {k} and {kb} differ");
    debug_assert_eq!((out.rows(), out.cols()), (m, n));

    let rsc = out.cols();
    let c = out.as_mut_slice();
    c.fill(0.0);
    gemm_f64(
        m, n, k, alpha, a.data, rsa, csa, b.data, rsb, csb, 0.0, c, rsc, 1,
    );
}

/// Allocating wrapper around [`mul_into`].
pub(crate) fn mul(a: View<'_>, transpose_a: bool, b: View<'_>, transpose_b: bool) -> Matrix {
    let m = if transpose_a { a.cols } else { a.rows };
    let n = if transpose_b { b.rows } else { b.cols };
    let mut out = Matrix::zeros(m, n);
    mul_into(a, transpose_a, b, transpose_b, 1.0, &mut out);
    out
}

#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn gemm_f64(
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    rsa: usize,
    csa: usize,
    b: &[f64],
    rsb: usize,
    csb: usize,
    beta: f64,
    c: &mut [f64],
    rsc: usize,
    csc: usize,
) {
    debug_assert!(m > 0 && n > 0 && k > 0);
    debug_assert!(rsa > 0 || m <= 1);
    debug_assert!(csa > 0 || k <= 1);
    debug_assert!(rsb > 0 || k <= 1);
    debug_assert!(csb > 0 || n <= 1);
    debug_assert!(rsc > 0 || m <= 1);
    debug_assert!(csc > 0 || n <= 1);

    #[cfg(feature = "matrixmultiply")]
    {
        // matrixmultiply supports arbitrary strides and ignores `c` when beta == 0.
        unsafe {
            matrixmultiply::dgemm(
                m,
                k,
                n,
                alpha,
                a.as_ptr(),
                rsa as isize,
                csa as isize,
                b.as_ptr(),
                rsb as isize,
                csb as isize,
                beta,
                c.as_mut_ptr(),
                rsc as isize,
                csc as isize,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0_f64;
            let a0 = i * rsa;
            let b0 = j * csb;

            for p in 0..k {
                let av = a[a0 + p * csa];
                let bv = b[p * rsb + b0];
                acc = av.mul_add(bv, acc);
            }

            let idx = i * rsc + j * csc;
            c[idx] = alpha * acc + beta * c[idx];
        }
    }
}
