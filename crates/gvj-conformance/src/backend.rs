#![forbid(unsafe_code)]

use crate::oracle::ApiVariant;
use gvj_linalg::fortran::gvj_legacy;
use gvj_linalg::{
    GvjOutcome, GvjRequest, GvjScalar, STATUS_SUCCESS, SolverError, SolverHandle, gvj,
};

/// Out-parameter of the legacy front-end that has no counterpart in the
/// normal API's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyOutput {
    Residual,
    Sweeps,
    Info,
}

impl LegacyOutput {
    pub const ALL: [Self; 3] = [Self::Residual, Self::Sweeps, Self::Info];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Residual => "residual",
            Self::Sweeps => "n_sweeps",
            Self::Info => "info",
        }
    }
}

/// The solver under test, reachable through either API front-end.
pub trait GvjBackend {
    fn name(&self) -> &'static str;

    fn solve<T: GvjScalar>(
        &self,
        api: ApiVariant,
        handle: Option<&SolverHandle>,
        request: GvjRequest<'_, T>,
    ) -> Result<GvjOutcome<T::Real>, SolverError>;

    /// Legacy front-end call with `missing` passed as a null out-parameter.
    fn solve_legacy_without<T: GvjScalar>(
        &self,
        handle: Option<&SolverHandle>,
        request: GvjRequest<'_, T>,
        missing: LegacyOutput,
    ) -> Result<GvjOutcome<T::Real>, SolverError>;
}

/// Routes both front-ends to the host Jacobi implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostBackend;

impl GvjBackend for HostBackend {
    fn name(&self) -> &'static str {
        "host"
    }

    fn solve<T: GvjScalar>(
        &self,
        api: ApiVariant,
        handle: Option<&SolverHandle>,
        request: GvjRequest<'_, T>,
    ) -> Result<GvjOutcome<T::Real>, SolverError> {
        match api {
            ApiVariant::Normal => gvj(handle, request),
            ApiVariant::Fortran => solve_legacy(handle, request, None),
        }
    }

    fn solve_legacy_without<T: GvjScalar>(
        &self,
        handle: Option<&SolverHandle>,
        request: GvjRequest<'_, T>,
        missing: LegacyOutput,
    ) -> Result<GvjOutcome<T::Real>, SolverError> {
        solve_legacy(handle, request, Some(missing))
    }
}

fn solve_legacy<T: GvjScalar>(
    handle: Option<&SolverHandle>,
    request: GvjRequest<'_, T>,
    missing: Option<LegacyOutput>,
) -> Result<GvjOutcome<T::Real>, SolverError> {
    let mut residual = T::real_from_f64(0.0);
    let mut sweeps = 0;
    let mut info = 0;
    let itype = request
        .itype
        .to_digit(10)
        .and_then(|digit| i32::try_from(digit).ok())
        .unwrap_or(0);
    let jobz = u8::try_from(request.jobz).unwrap_or(b'?');
    let uplo = u8::try_from(request.uplo).unwrap_or(b'?');

    let status = gvj_legacy::<T>(
        handle,
        itype,
        jobz,
        uplo,
        request.n,
        request.a,
        request.lda,
        request.b,
        request.ldb,
        request.abstol,
        (missing != Some(LegacyOutput::Residual)).then_some(&mut residual),
        request.max_sweeps,
        (missing != Some(LegacyOutput::Sweeps)).then_some(&mut sweeps),
        request.w,
        i32::from(request.sort_eig),
        (missing != Some(LegacyOutput::Info)).then_some(&mut info),
    );
    if status == STATUS_SUCCESS {
        return Ok(GvjOutcome {
            residual,
            sweeps,
            info,
        });
    }
    Err(SolverError::from_status_code(status)
        .unwrap_or(SolverError::InvalidValue("legacy front-end returned an unknown status")))
}
