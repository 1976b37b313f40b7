#![forbid(unsafe_code)]

use crate::{
    CheckedArgs, EigenForm, GvjOutcome, GvjRequest, GvjScalar, SolverError, SolverHandle,
    check_arguments,
};
use core::cmp::Ordering;
use num_traits::{Float, One, Zero};

/// Contiguous column-major square matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T> {
    n: usize,
    data: Vec<T>,
}

impl<T: GvjScalar> DenseMatrix<T> {
    #[must_use]
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![T::zero(); n * n],
        }
    }

    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut out = Self::zeros(n);
        for i in 0..n {
            out.set(i, i, T::one());
        }
        out
    }

    #[must_use]
    pub fn from_strided(n: usize, buffer: &[T], ld: usize) -> Self {
        let mut out = Self::zeros(n);
        for j in 0..n {
            for i in 0..n {
                out.set(i, j, buffer[i + j * ld]);
            }
        }
        out
    }

    /// Expands the referenced triangle into a full Hermitian matrix.
    #[must_use]
    pub fn hermitian_from_triangle(n: usize, buffer: &[T], ld: usize, upper: bool) -> Self {
        let mut out = Self::zeros(n);
        for j in 0..n {
            for i in 0..n {
                let in_triangle = if upper { i <= j } else { i >= j };
                if !in_triangle {
                    continue;
                }
                let value = buffer[i + j * ld];
                if i == j {
                    out.set(i, i, T::from_real(value.re()));
                } else {
                    out.set(i, j, value);
                    out.set(j, i, value.conj());
                }
            }
        }
        out
    }

    #[must_use]
    pub fn order(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[i + j * self.n]
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.data[i + j * self.n] = value;
    }

    #[must_use]
    pub fn conj_transpose(&self) -> Self {
        let mut out = Self::zeros(self.n);
        for j in 0..self.n {
            for i in 0..self.n {
                out.set(j, i, self.get(i, j).conj());
            }
        }
        out
    }

    #[must_use]
    pub fn matmul(&self, rhs: &Self) -> Self {
        let n = self.n;
        let mut out = Self::zeros(n);
        for j in 0..n {
            for k in 0..n {
                let r = rhs.get(k, j);
                if r == T::zero() {
                    continue;
                }
                for i in 0..n {
                    let idx = i + j * n;
                    out.data[idx] = out.data[idx] + self.get(i, k) * r;
                }
            }
        }
        out
    }

    #[must_use]
    pub fn frobenius_norm(&self) -> T::Real {
        self.data
            .iter()
            .fold(T::Real::zero(), |acc, v| acc + v.modulus_sqr())
            .sqrt()
    }

    #[must_use]
    pub fn off_diagonal_norm(&self) -> T::Real {
        let mut acc = T::Real::zero();
        for j in 0..self.n {
            for i in 0..self.n {
                if i != j {
                    acc = acc + self.get(i, j).modulus_sqr();
                }
            }
        }
        acc.sqrt()
    }

    /// Averages with the conjugate transpose and forces a real diagonal.
    pub fn symmetrize(&mut self) {
        let half = T::real_from_f64(0.5);
        for j in 0..self.n {
            let d = self.get(j, j).re();
            self.set(j, j, T::from_real(d));
            for i in (j + 1)..self.n {
                let avg = (self.get(i, j) + self.get(j, i).conj()).scale(half);
                self.set(i, j, avg);
                self.set(j, i, avg.conj());
            }
        }
    }

    #[must_use]
    pub fn column(&self, j: usize) -> &[T] {
        &self.data[j * self.n..(j + 1) * self.n]
    }
}

/// Lower Cholesky factor `L` with `B = L·Lᴴ`.
///
/// On failure returns the 1-based order of the first leading minor that is
/// not positive definite.
pub(crate) fn cholesky_lower<T: GvjScalar>(b: &DenseMatrix<T>) -> Result<DenseMatrix<T>, usize> {
    let n = b.order();
    let mut l: DenseMatrix<T> = DenseMatrix::zeros(n);
    for j in 0..n {
        let mut diag = b.get(j, j).re();
        for k in 0..j {
            diag = diag - l.get(j, k).modulus_sqr();
        }
        if diag <= T::Real::zero() || !diag.is_finite() {
            return Err(j + 1);
        }
        let ljj = diag.sqrt();
        l.set(j, j, T::from_real(ljj));
        let inv = ljj.recip();
        for i in (j + 1)..n {
            let mut acc = b.get(i, j);
            for k in 0..j {
                acc = acc - l.get(i, k) * l.get(j, k).conj();
            }
            l.set(i, j, acc.scale(inv));
        }
    }
    Ok(l)
}

pub(crate) fn solve_lower<T: GvjScalar>(l: &DenseMatrix<T>, x: &mut DenseMatrix<T>) {
    let n = l.order();
    for col in 0..n {
        for i in 0..n {
            let mut acc = x.get(i, col);
            for k in 0..i {
                acc = acc - l.get(i, k) * x.get(k, col);
            }
            x.set(i, col, acc / l.get(i, i));
        }
    }
}

/// `X ← L⁻ᴴ·X` by back substitution against the upper factor `Lᴴ`.
pub(crate) fn solve_lower_conj_transpose<T: GvjScalar>(
    l: &DenseMatrix<T>,
    x: &mut DenseMatrix<T>,
) {
    let n = l.order();
    for col in 0..n {
        for i in (0..n).rev() {
            let mut acc = x.get(i, col);
            for k in (i + 1)..n {
                acc = acc - l.get(k, i).conj() * x.get(k, col);
            }
            x.set(i, col, acc / l.get(i, i).conj());
        }
    }
}

/// Reduces the generalized problem to a standard Hermitian one.
pub(crate) fn reduce_to_standard<T: GvjScalar>(
    form: EigenForm,
    a: &DenseMatrix<T>,
    l: &DenseMatrix<T>,
) -> DenseMatrix<T> {
    let mut c = match form {
        EigenForm::Ax => {
            let mut m = a.clone();
            solve_lower(l, &mut m);
            let mut mh = m.conj_transpose();
            solve_lower(l, &mut mh);
            mh.conj_transpose()
        }
        EigenForm::Abx | EigenForm::Bax => l.conj_transpose().matmul(&a.matmul(l)),
    };
    c.symmetrize();
    c
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct JacobiStats<R> {
    pub residual: R,
    pub sweeps: i32,
    pub converged: bool,
}

/// Cyclic Jacobi on a Hermitian matrix. On return the diagonal of `c` holds
/// the eigenvalues and `v` (when present) the accumulated rotations.
pub(crate) fn cyclic_jacobi<T: GvjScalar>(
    c: &mut DenseMatrix<T>,
    mut v: Option<&mut DenseMatrix<T>>,
    abstol: T::Real,
    max_sweeps: i32,
) -> JacobiStats<T::Real> {
    let n = c.order();
    let threshold = if abstol > T::Real::zero() {
        abstol * c.frobenius_norm()
    } else {
        T::Real::epsilon() * c.frobenius_norm()
    };
    let one = T::Real::one();
    let two = one + one;

    let mut sweeps = 0;
    let mut off = c.off_diagonal_norm();
    while off > threshold && sweeps < max_sweeps {
        sweeps += 1;
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = c.get(p, q);
                let mag = apq.modulus();
                if mag == T::Real::zero() {
                    continue;
                }
                let app = c.get(p, p).re();
                let aqq = c.get(q, q).re();
                let tau = (aqq - app) / (two * mag);
                let t = tau.signum() / (tau.abs() + tau.hypot(one));
                let cs = t.hypot(one).recip();
                let sn = t * cs;
                let phase = apq.scale(mag.recip());

                // J = [[c, s·u], [-s·ū, c]] applied as C ← Jᴴ·C·J.
                let jpp = T::from_real(cs);
                let jpq = phase.scale(sn);
                let jqp = -phase.conj().scale(sn);
                let jqq = T::from_real(cs);

                for k in 0..n {
                    let ckp = c.get(k, p);
                    let ckq = c.get(k, q);
                    c.set(k, p, ckp * jpp + ckq * jqp);
                    c.set(k, q, ckp * jpq + ckq * jqq);
                }
                for k in 0..n {
                    let cpk = c.get(p, k);
                    let cqk = c.get(q, k);
                    c.set(p, k, jpp.conj() * cpk + jqp.conj() * cqk);
                    c.set(q, k, jpq.conj() * cpk + jqq.conj() * cqk);
                }
                c.set(p, q, T::zero());
                c.set(q, p, T::zero());
                c.set(p, p, T::from_real(c.get(p, p).re()));
                c.set(q, q, T::from_real(c.get(q, q).re()));

                if let Some(v) = v.as_deref_mut() {
                    for k in 0..n {
                        let vkp = v.get(k, p);
                        let vkq = v.get(k, q);
                        v.set(k, p, vkp * jpp + vkq * jqp);
                        v.set(k, q, vkp * jpq + vkq * jqq);
                    }
                }
            }
        }
        off = c.off_diagonal_norm();
    }

    JacobiStats {
        residual: off,
        sweeps,
        converged: off <= threshold,
    }
}

/// Solves the generalized symmetric/Hermitian-definite eigenproblem with
/// the cyclic Jacobi method.
///
/// Eigenvalues land in `W`. With `jobz = 'V'` the eigenvectors overwrite
/// the leading block of `A`; the referenced triangle of `B` receives its
/// Cholesky factor. Rows past `n` in either buffer are never touched.
pub fn gvj<T: GvjScalar>(
    handle: Option<&SolverHandle>,
    request: GvjRequest<'_, T>,
) -> Result<GvjOutcome<T::Real>, SolverError> {
    let checked = check_arguments(handle, &request)?;
    if checked.n == 0 {
        return Ok(GvjOutcome::quick_return());
    }

    let GvjRequest {
        a,
        b,
        w,
        abstol,
        max_sweeps,
        sort_eig,
        ..
    } = request;
    let (Some(a), Some(b), Some(w)) = (a, b, w) else {
        return Err(SolverError::InvalidPointer("A, B and W must not be null"));
    };

    Ok(solve_checked(checked, a, b, w, abstol, max_sweeps, sort_eig))
}

fn solve_checked<T: GvjScalar>(
    args: CheckedArgs,
    a: &mut [T],
    b: &mut [T],
    w: &mut [T::Real],
    abstol: T::Real,
    max_sweeps: i32,
    sort_eig: bool,
) -> GvjOutcome<T::Real> {
    let CheckedArgs {
        form,
        vectors,
        upper,
        n,
        lda,
        ldb,
    } = args;

    let full_b = DenseMatrix::hermitian_from_triangle(n, b, ldb, upper);
    let l = match cholesky_lower(&full_b) {
        Ok(l) => l,
        Err(minor) => {
            return GvjOutcome {
                residual: T::Real::zero(),
                sweeps: 0,
                info: i32::try_from(n + minor).unwrap_or(i32::MAX),
            };
        }
    };
    write_factor(&l, b, ldb, upper);

    let full_a = DenseMatrix::hermitian_from_triangle(n, a, lda, upper);
    let mut c = reduce_to_standard(form, &full_a, &l);
    let mut v = vectors.then(|| DenseMatrix::identity(n));
    let stats = cyclic_jacobi(&mut c, v.as_mut(), abstol, max_sweeps);

    let mut order: Vec<usize> = (0..n).collect();
    if sort_eig {
        order.sort_by(|&x, &y| {
            c.get(x, x)
                .re()
                .partial_cmp(&c.get(y, y).re())
                .unwrap_or(Ordering::Equal)
        });
    }
    for (slot, &src) in order.iter().enumerate() {
        w[slot] = c.get(src, src).re();
    }

    if let Some(v) = v {
        let mut x = permute_columns(&v, &order);
        match form {
            EigenForm::Ax | EigenForm::Abx => solve_lower_conj_transpose(&l, &mut x),
            EigenForm::Bax => x = l.matmul(&x),
        }
        for j in 0..n {
            a[j * lda..j * lda + n].copy_from_slice(x.column(j));
        }
    } else {
        for j in 0..n {
            for i in 0..n {
                let in_triangle = if upper { i <= j } else { i >= j };
                if in_triangle {
                    a[i + j * lda] = c.get(i, j);
                }
            }
        }
    }

    GvjOutcome {
        residual: stats.residual,
        sweeps: stats.sweeps,
        info: i32::from(!stats.converged),
    }
}

fn write_factor<T: GvjScalar>(l: &DenseMatrix<T>, b: &mut [T], ldb: usize, upper: bool) {
    let n = l.order();
    for j in 0..n {
        for i in j..n {
            if upper {
                b[j + i * ldb] = l.get(i, j).conj();
            } else {
                b[i + j * ldb] = l.get(i, j);
            }
        }
    }
}

fn permute_columns<T: GvjScalar>(m: &DenseMatrix<T>, order: &[usize]) -> DenseMatrix<T> {
    let n = m.order();
    let mut out = DenseMatrix::zeros(n);
    for (dst, &src) in order.iter().enumerate() {
        for i in 0..n {
            out.set(i, dst, m.get(i, src));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{DenseMatrix, cholesky_lower, cyclic_jacobi, gvj, reduce_to_standard};
    use crate::{EigenForm, GvjRequest, GvjScalar, SolverError, SolverHandle};
    use num_complex::Complex64;

    fn approx_equal(lhs: f64, rhs: f64, tol: f64) -> bool {
        (lhs - rhs).abs() <= tol
    }

    fn column_major(rows: &[&[f64]]) -> Vec<f64> {
        let n = rows.len();
        let mut out = vec![0.0; n * n];
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                out[i + j * n] = *value;
            }
        }
        out
    }

    fn request<'a, T: GvjScalar>(
        itype: char,
        jobz: char,
        n: i32,
        a: &'a mut [T],
        b: &'a mut [T],
        w: &'a mut [T::Real],
    ) -> GvjRequest<'a, T> {
        GvjRequest {
            itype,
            jobz,
            uplo: 'L',
            n,
            a: Some(a),
            lda: n,
            b: Some(b),
            ldb: n,
            abstol: T::real_from_f64(2.0 * T::epsilon()),
            max_sweeps: 100,
            w: Some(w),
            sort_eig: true,
        }
    }

    #[test]
    fn cholesky_reports_first_bad_minor() {
        let b = DenseMatrix::<f64>::from_strided(2, &column_major(&[&[1.0, 2.0], &[2.0, 1.0]]), 2);
        assert_eq!(cholesky_lower(&b), Err(2));
        let spd = DenseMatrix::<f64>::from_strided(2, &column_major(&[&[4.0, 2.0], &[2.0, 3.0]]), 2);
        let l = cholesky_lower(&spd).expect("spd");
        assert!(approx_equal(l.get(0, 0), 2.0, 1e-15));
        assert!(approx_equal(l.get(1, 0), 1.0, 1e-15));
        assert!(approx_equal(l.get(1, 1), 2.0_f64.sqrt(), 1e-15));
    }

    #[test]
    fn jacobi_diagonalizes_symmetric_matrix() {
        let mut c = DenseMatrix::<f64>::from_strided(
            3,
            &column_major(&[&[2.0, -1.0, 0.0], &[-1.0, 2.0, -1.0], &[0.0, -1.0, 2.0]]),
            3,
        );
        let mut v = DenseMatrix::identity(3);
        let stats = cyclic_jacobi(&mut c, Some(&mut v), 2.0 * f64::EPSILON, 100);
        assert!(stats.converged);
        let mut eig: Vec<f64> = (0..3).map(|i| c.get(i, i)).collect();
        eig.sort_by(f64::total_cmp);
        let s = 2.0_f64.sqrt();
        for (got, want) in eig.iter().zip([2.0 - s, 2.0, 2.0 + s]) {
            assert!(approx_equal(*got, want, 1e-12), "got={got} want={want}");
        }
    }

    #[test]
    fn identity_b_reduces_to_standard_problem() {
        let a = DenseMatrix::<f64>::from_strided(2, &column_major(&[&[2.0, 1.0], &[1.0, 2.0]]), 2);
        let l = DenseMatrix::identity(2);
        for form in [EigenForm::Ax, EigenForm::Abx, EigenForm::Bax] {
            assert_eq!(reduce_to_standard(form, &a, &l), a);
        }
    }

    #[test]
    fn generalized_real_eigenvalues_match_closed_form() {
        // A = diag(2, 6), B = diag(1, 2): λ = {2, 3} for itype 1, {2, 12} for itype 2/3.
        let cases = [('1', [2.0, 3.0]), ('2', [2.0, 12.0]), ('3', [2.0, 12.0])];
        let handle = SolverHandle::new();
        for (itype, want) in cases {
            let mut a = column_major(&[&[2.0, 0.0], &[0.0, 6.0]]);
            let mut b = column_major(&[&[1.0, 0.0], &[0.0, 2.0]]);
            let mut w = vec![0.0; 2];
            let outcome = gvj(
                Some(&handle),
                request::<f64>(itype, 'V', 2, &mut a, &mut b, &mut w),
            )
            .expect("valid call");
            assert_eq!(outcome.info, 0);
            assert!(approx_equal(w[0], want[0], 1e-12), "itype={itype} w={w:?}");
            assert!(approx_equal(w[1], want[1], 1e-12), "itype={itype} w={w:?}");
        }
    }

    #[test]
    fn eigenvectors_are_b_orthonormal_for_itype_one() {
        let handle = SolverHandle::new();
        let a0 = column_major(&[&[4.0, 1.0, 0.5], &[1.0, 3.0, 0.2], &[0.5, 0.2, 5.0]]);
        let b0 = column_major(&[&[2.0, 0.3, 0.0], &[0.3, 1.5, 0.1], &[0.0, 0.1, 1.0]]);
        let mut a = a0.clone();
        let mut b = b0.clone();
        let mut w = vec![0.0; 3];
        let outcome = gvj(
            Some(&handle),
            request::<f64>('1', 'V', 3, &mut a, &mut b, &mut w),
        )
        .expect("valid call");
        assert_eq!(outcome.info, 0);
        assert!(w.windows(2).all(|pair| pair[0] <= pair[1]));

        let am = DenseMatrix::<f64>::from_strided(3, &a0, 3);
        let bm = DenseMatrix::<f64>::from_strided(3, &b0, 3);
        let x = DenseMatrix::<f64>::from_strided(3, &a, 3);
        let gram = x.conj_transpose().matmul(&bm.matmul(&x));
        let ax = am.matmul(&x);
        let bx = bm.matmul(&x);
        for j in 0..3 {
            for i in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(approx_equal(gram.get(i, j), expected, 1e-12));
                assert!(approx_equal(ax.get(i, j), w[j] * bx.get(i, j), 1e-11));
            }
        }
    }

    #[test]
    fn hermitian_problem_has_real_spectrum() {
        let handle = SolverHandle::new();
        let i = Complex64::new(0.0, 1.0);
        let one = Complex64::new(1.0, 0.0);
        // A = [[2, i], [-i, 2]] has eigenvalues {1, 3}; B = I.
        let mut a = vec![one * 2.0, -i, i, one * 2.0];
        let mut b = vec![one, Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0), one];
        let mut w = vec![0.0; 2];
        let outcome = gvj(
            Some(&handle),
            request::<Complex64>('1', 'N', 2, &mut a, &mut b, &mut w),
        )
        .expect("valid call");
        assert_eq!(outcome.info, 0);
        assert!(approx_equal(w[0], 1.0, 1e-12));
        assert!(approx_equal(w[1], 3.0, 1e-12));
    }

    #[test]
    fn indefinite_b_reports_info_past_n() {
        let handle = SolverHandle::new();
        let mut a = column_major(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let mut b = column_major(&[&[1.0, 0.0], &[0.0, -1.0]]);
        let mut w = vec![0.0; 2];
        let outcome = gvj(
            Some(&handle),
            request::<f64>('1', 'N', 2, &mut a, &mut b, &mut w),
        )
        .expect("arguments are valid");
        assert_eq!(outcome.info, 4);
    }

    #[test]
    fn padding_rows_are_never_written() {
        let handle = SolverHandle::new();
        let poison = -777.0;
        // n = 2 stored with lda = ldb = 3.
        let mut a = vec![3.0, 1.0, poison, 1.0, 3.0, poison];
        let mut b = vec![2.0, 0.0, poison, 0.0, 2.0, poison];
        let mut w = vec![0.0; 2];
        let mut req = request::<f64>('2', 'V', 2, &mut a, &mut b, &mut w);
        req.lda = 3;
        req.ldb = 3;
        gvj(Some(&handle), req).expect("valid call");
        assert_eq!(a[2], poison);
        assert_eq!(a[5], poison);
        assert_eq!(b[2], poison);
        assert_eq!(b[5], poison);
    }

    #[test]
    fn null_handle_fails_before_numerics() {
        let mut a = vec![1.0];
        let mut b = vec![1.0];
        let mut w = vec![0.0];
        assert_eq!(
            gvj(None, request::<f64>('1', 'N', 1, &mut a, &mut b, &mut w)),
            Err(SolverError::InvalidHandle)
        );
        assert_eq!(a, vec![1.0]);
    }
}
