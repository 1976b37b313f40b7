#![forbid(unsafe_code)]

use crate::backend::{GvjBackend, LegacyOutput};
use crate::configuration::Configuration;
use crate::oracle::{
    ApiVariant, CorrectnessOracle, OracleFailure, REASON_DEFENSIVE_CHECK_MISSED,
    REASON_NUMERICAL_MISMATCH, REASON_PADDING_CLOBBERED, REASON_REFERENCE_FAILED,
    REASON_SOLVER_INFO_NONZERO, REASON_UNEXPECTED_STATUS,
};
use gvj_linalg::{EigenForm, GvjOutcome, GvjRequest, GvjScalar, SolverError, SolverHandle};
use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Written into rows past `n` so writes outside the leading block show up.
const PADDING_POISON: f64 = -9999.0;

/// Checks a [`GvjBackend`] against a dense complex-double reduction:
/// Cholesky of B, the `itype` transform of A, then a Hermitian eigensolve.
///
/// Inputs are seeded from the harness seed and the configuration, so a
/// failing instance replays identically.
#[derive(Debug, Clone)]
pub struct ReferenceOracle<B> {
    backend: B,
    seed: u64,
}

impl<B: GvjBackend> ReferenceOracle<B> {
    #[must_use]
    pub fn new(backend: B, seed: u64) -> Self {
        Self { backend, seed }
    }

    fn expect_rejection<T: GvjScalar>(
        &self,
        api: ApiVariant,
        label: &str,
        handle: Option<&SolverHandle>,
        request: GvjRequest<'_, T>,
        expected: SolverError,
    ) -> Result<(), OracleFailure> {
        check_rejection(label, self.backend.solve(api, handle, request), expected)
    }
}

impl<B: GvjBackend> CorrectnessOracle for ReferenceOracle<B> {
    fn run_bad_argument_case<T: GvjScalar>(&self, api: ApiVariant) -> Result<(), OracleFailure> {
        let handle = SolverHandle::new();
        let mut a = vec![T::one()];
        let mut b = vec![T::one()];
        let mut w = vec![T::real_from_f64(0.0)];
        macro_rules! base {
            () => {
                minimal_request::<T>(
                    Some(a.as_mut_slice()),
                    Some(b.as_mut_slice()),
                    Some(w.as_mut_slice()),
                )
            };
        }

        self.expect_rejection(api, "null handle", None, base!(), SolverError::InvalidHandle)?;

        let invalid_values: [(&str, fn(&mut GvjRequest<'_, T>)); 3] = [
            ("invalid itype", |r| r.itype = '0'),
            ("invalid jobz", |r| r.jobz = 'X'),
            ("invalid uplo", |r| r.uplo = 'X'),
        ];
        for (label, mutate) in invalid_values {
            let mut request = base!();
            mutate(&mut request);
            self.expect_rejection(
                api,
                label,
                Some(&handle),
                request,
                SolverError::InvalidValue(""),
            )?;
        }

        let invalid_sizes: [(&str, fn(&mut GvjRequest<'_, T>)); 4] = [
            ("negative n", |r| r.n = -1),
            ("lda < n", |r| r.lda = 0),
            ("ldb < n", |r| r.ldb = 0),
            ("max_sweeps <= 0", |r| r.max_sweeps = 0),
        ];
        for (label, mutate) in invalid_sizes {
            let mut request = base!();
            mutate(&mut request);
            self.expect_rejection(
                api,
                label,
                Some(&handle),
                request,
                SolverError::InvalidSize(""),
            )?;
        }

        self.expect_rejection(
            api,
            "null A",
            Some(&handle),
            minimal_request::<T>(None, Some(b.as_mut_slice()), Some(w.as_mut_slice())),
            SolverError::InvalidPointer(""),
        )?;
        self.expect_rejection(
            api,
            "null B",
            Some(&handle),
            minimal_request::<T>(Some(a.as_mut_slice()), None, Some(w.as_mut_slice())),
            SolverError::InvalidPointer(""),
        )?;
        self.expect_rejection(
            api,
            "null W",
            Some(&handle),
            minimal_request::<T>(Some(a.as_mut_slice()), Some(b.as_mut_slice()), None),
            SolverError::InvalidPointer(""),
        )?;

        if api == ApiVariant::Fortran {
            for missing in LegacyOutput::ALL {
                check_rejection(
                    &format!("null {}", missing.as_str()),
                    self.backend
                        .solve_legacy_without(Some(&handle), base!(), missing),
                    SolverError::InvalidPointer(""),
                )?;
            }
        }

        let mut quick = minimal_request::<T>(None, None, None);
        quick.n = 0;
        match self.backend.solve(api, Some(&handle), quick) {
            Ok(outcome) if outcome.info == 0 => Ok(()),
            Ok(outcome) => Err(OracleFailure::new(
                REASON_SOLVER_INFO_NONZERO,
                format!("quick return: info={}", outcome.info),
            )),
            Err(err) => Err(OracleFailure::new(
                REASON_UNEXPECTED_STATUS,
                format!(
                    "quick return with null pointers: expected success, got {}",
                    err.reason_code()
                ),
            )),
        }
    }

    fn run_correctness_case<T: GvjScalar>(
        &self,
        api: ApiVariant,
        config: &Configuration,
    ) -> Result<(), OracleFailure> {
        let handle = SolverHandle::new();

        if !config.sizes().is_valid() {
            let mut a = vec![T::zero(); 1];
            let mut b = vec![T::zero(); 1];
            let mut w = vec![T::real_from_f64(0.0); 1];
            let request = request_from_config::<T>(config, &mut a, &mut b, &mut w);
            return check_rejection(
                "size-invalid configuration",
                self.backend.solve(api, Some(&handle), request),
                SolverError::InvalidSize(""),
            );
        }

        let n = usize::try_from(config.n).unwrap_or(0);
        let lda = usize::try_from(config.lda).unwrap_or(0);
        let ldb = usize::try_from(config.ldb).unwrap_or(0);
        if n == 0 {
            let mut request = minimal_request::<T>(None, None, None);
            request.n = 0;
            return match self.backend.solve(api, Some(&handle), request) {
                Ok(_) => Ok(()),
                Err(err) => Err(OracleFailure::new(
                    REASON_UNEXPECTED_STATUS,
                    format!("n=0 quick return rejected: {}", err.reason_code()),
                )),
            };
        }

        let form = EigenForm::from_selector(config.itype)
            .map_err(|err| OracleFailure::new(REASON_UNEXPECTED_STATUS, format!("itype: {err}")))?;

        let mut rng = StdRng::seed_from_u64(case_seed::<T>(self.seed, config));
        let a_full = random_hermitian(&mut rng, n, n as f64);
        let b_full = random_hermitian(&mut rng, n, 2.0 * n as f64);
        let a_host: Vec<T> = layout_with_padding(&a_full, lda);
        let b_host: Vec<T> = layout_with_padding(&b_full, ldb);

        let mut a_dev = a_host.clone();
        let mut b_dev = b_host.clone();
        let mut w_dev = vec![T::real_from_f64(0.0); n];
        let outcome = self
            .backend
            .solve(
                api,
                Some(&handle),
                request_from_config::<T>(config, &mut a_dev, &mut b_dev, &mut w_dev),
            )
            .map_err(|err| {
                OracleFailure::new(
                    REASON_UNEXPECTED_STATUS,
                    format!("solver rejected valid arguments: {err} ({})", err.reason_code()),
                )
            })?;
        check_info::<T, _>(self.backend.name(), &outcome)?;
        check_padding(&a_dev, n, lda, "A")?;
        check_padding(&b_dev, n, ldb, "B")?;

        // Reference inputs are the narrowed host buffers, not the f64 draws.
        let a = to_dmatrix(&a_host, n, lda);
        let b = to_dmatrix(&b_host, n, ldb);
        let mut w_want = reference_eigenvalues(form, &a, &b)?;
        let mut w_got: Vec<f64> = w_dev.iter().map(|v| T::real_to_f64(*v)).collect();
        if !config.sort_eig {
            w_got.sort_by(f64::total_cmp);
        }
        w_want.sort_by(f64::total_cmp);

        let threshold = n as f64 * config.tolerance;
        let eigen_error = relative_error(&w_got, &w_want);
        if eigen_error.is_nan() || eigen_error > threshold {
            return Err(OracleFailure::new(
                REASON_NUMERICAL_MISMATCH,
                format!("eigenvalue error {eigen_error:e} exceeds {threshold:e}"),
            ));
        }

        if config.jobz == 'V' {
            let x = to_dmatrix(&a_dev, n, lda);
            let residual = eigenvector_residual(form, &a, &b, &x, &w_got);
            if residual.is_nan() || residual > threshold {
                return Err(OracleFailure::new(
                    REASON_NUMERICAL_MISMATCH,
                    format!("eigenvector residual {residual:e} exceeds {threshold:e}"),
                ));
            }
        }

        Ok(())
    }
}

fn minimal_request<'a, T: GvjScalar>(
    a: Option<&'a mut [T]>,
    b: Option<&'a mut [T]>,
    w: Option<&'a mut [T::Real]>,
) -> GvjRequest<'a, T> {
    GvjRequest {
        itype: '1',
        jobz: 'N',
        uplo: 'U',
        n: 1,
        a,
        lda: 1,
        b,
        ldb: 1,
        abstol: T::real_from_f64(2.0 * T::epsilon()),
        max_sweeps: 100,
        w,
        sort_eig: true,
    }
}

fn request_from_config<'a, T: GvjScalar>(
    config: &Configuration,
    a: &'a mut [T],
    b: &'a mut [T],
    w: &'a mut [T::Real],
) -> GvjRequest<'a, T> {
    GvjRequest {
        itype: config.itype,
        jobz: config.jobz,
        uplo: config.uplo,
        n: config.n,
        a: Some(a),
        lda: config.lda,
        b: Some(b),
        ldb: config.ldb,
        abstol: T::real_from_f64(config.tolerance),
        max_sweeps: config.max_sweeps,
        w: Some(w),
        sort_eig: config.sort_eig,
    }
}

fn check_rejection<R>(
    label: &str,
    result: Result<GvjOutcome<R>, SolverError>,
    expected: SolverError,
) -> Result<(), OracleFailure> {
    match result {
        Err(err) if err.same_class(&expected) => Ok(()),
        Err(err) => Err(OracleFailure::new(
            REASON_UNEXPECTED_STATUS,
            format!(
                "{label}: expected {}, got {} ({err})",
                expected.reason_code(),
                err.reason_code()
            ),
        )),
        Ok(_) => Err(OracleFailure::new(
            REASON_DEFENSIVE_CHECK_MISSED,
            format!("{label}: expected {} but the call succeeded", expected.reason_code()),
        )),
    }
}

fn check_info<T: GvjScalar, R>(backend: &str, outcome: &GvjOutcome<R>) -> Result<(), OracleFailure> {
    if outcome.info == 0 {
        return Ok(());
    }
    Err(OracleFailure::new(
        REASON_SOLVER_INFO_NONZERO,
        format!(
            "{backend} {}<{}> returned info={} after {} sweeps",
            T::SOLVER.name(),
            T::KIND.name(),
            outcome.info,
            outcome.sweeps
        ),
    ))
}

fn check_padding<T: GvjScalar>(
    buffer: &[T],
    n: usize,
    ld: usize,
    name: &str,
) -> Result<(), OracleFailure> {
    let poison = T::from_c64(Complex64::new(PADDING_POISON, PADDING_POISON));
    for j in 0..n {
        for i in n..ld {
            if buffer[i + j * ld] != poison {
                return Err(OracleFailure::new(
                    REASON_PADDING_CLOBBERED,
                    format!("{name}[{i},{j}] outside the leading {n}x{n} block was written"),
                ));
            }
        }
    }
    Ok(())
}

fn case_seed<T: GvjScalar>(seed: u64, config: &Configuration) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(T::KIND.name().as_bytes());
    hasher.update(
        format!(
            "{}:{}:{}:{}{}{}",
            config.n, config.lda, config.ldb, config.itype, config.jobz, config.uplo
        )
        .as_bytes(),
    );
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Hermitian matrix with entries in the unit box and `diag_shift` added to
/// the diagonal. A shift of `2n` makes it diagonally dominant, hence
/// positive definite.
fn random_hermitian(rng: &mut StdRng, n: usize, diag_shift: f64) -> DMatrix<Complex64> {
    let mut m = DMatrix::zeros(n, n);
    for j in 0..n {
        m[(j, j)] = Complex64::new(rng.gen_range(0.0..1.0) + diag_shift, 0.0);
        for i in (j + 1)..n {
            let value = Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            m[(i, j)] = value;
            m[(j, i)] = value.conj();
        }
    }
    m
}

fn layout_with_padding<T: GvjScalar>(m: &DMatrix<Complex64>, ld: usize) -> Vec<T> {
    let n = m.nrows();
    let poison = T::from_c64(Complex64::new(PADDING_POISON, PADDING_POISON));
    let mut out = vec![poison; ld * n];
    for j in 0..n {
        for i in 0..n {
            out[i + j * ld] = T::from_c64(m[(i, j)]);
        }
    }
    out
}

fn to_dmatrix<T: GvjScalar>(buffer: &[T], n: usize, ld: usize) -> DMatrix<Complex64> {
    DMatrix::from_fn(n, n, |i, j| buffer[i + j * ld].to_c64())
}

/// Ascending eigenvalues of the pencil: with `B = L·Lᴴ`, form 1 reduces to
/// `L⁻¹·A·L⁻ᴴ` and forms 2 and 3 to `Lᴴ·A·L`.
fn reference_eigenvalues(
    form: EigenForm,
    a: &DMatrix<Complex64>,
    b: &DMatrix<Complex64>,
) -> Result<Vec<f64>, OracleFailure> {
    let l = Cholesky::new(b.clone())
        .ok_or_else(|| {
            OracleFailure::new(REASON_REFERENCE_FAILED, "reference Cholesky: B is not positive definite")
        })?
        .l();
    let c = match form {
        EigenForm::Ax => {
            let half = l.solve_lower_triangular(a).ok_or_else(|| {
                OracleFailure::new(REASON_REFERENCE_FAILED, "reference reduction: singular L")
            })?;
            l.solve_lower_triangular(&half.adjoint()).ok_or_else(|| {
                OracleFailure::new(REASON_REFERENCE_FAILED, "reference reduction: singular L")
            })?
        }
        EigenForm::Abx | EigenForm::Bax => l.adjoint() * a * &l,
    };
    let c = (&c + c.adjoint()) * Complex64::new(0.5, 0.0);
    let mut eigenvalues: Vec<f64> = SymmetricEigen::new(c).eigenvalues.iter().copied().collect();
    eigenvalues.sort_by(f64::total_cmp);
    Ok(eigenvalues)
}

/// `‖got − want‖₂ / ‖want‖₂`, falling back to the absolute error when
/// the reference is zero.
fn relative_error(got: &[f64], want: &[f64]) -> f64 {
    let got = DVector::from_column_slice(got);
    let want = DVector::from_column_slice(want);
    let diff = (&got - &want).norm();
    let scale = want.norm();
    if scale == 0.0 { diff } else { diff / scale }
}

/// Normwise residual of the generalized eigen-equation for `form`:
/// `‖AX − BXΛ‖ / (‖A‖‖X‖)` for A·x=λ·B·x, and `‖MX − XΛ‖ / (‖A‖‖B‖‖X‖)`
/// with `M = AB` or `BA` for the other two forms.
fn eigenvector_residual(
    form: EigenForm,
    a: &DMatrix<Complex64>,
    b: &DMatrix<Complex64>,
    x: &DMatrix<Complex64>,
    w: &[f64],
) -> f64 {
    let lambda = DMatrix::from_diagonal(&DVector::from_iterator(
        w.len(),
        w.iter().map(|value| Complex64::new(*value, 0.0)),
    ));
    let x_lambda = x * lambda;
    let (lhs, rhs, scale) = match form {
        EigenForm::Ax => (a * x, b * &x_lambda, a.norm() * x.norm()),
        EigenForm::Abx => (a * (b * x), x_lambda, a.norm() * b.norm() * x.norm()),
        EigenForm::Bax => (b * (a * x), x_lambda, a.norm() * b.norm() * x.norm()),
    };
    let diff = (lhs - rhs).norm();
    if scale == 0.0 { diff } else { diff / scale }
}
