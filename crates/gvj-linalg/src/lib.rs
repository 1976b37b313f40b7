#![forbid(unsafe_code)]

use core::fmt;

pub mod fortran;
pub mod scalar;
mod solver;

pub use scalar::{GvjScalar, ScalarKind, SolverVariant};
pub use solver::{DenseMatrix, gvj};

pub const GVJ_REASON_CODES: [&str; 4] = [
    "gvj_invalid_handle",
    "gvj_invalid_pointer",
    "gvj_invalid_size",
    "gvj_invalid_value",
];

/// Status codes of the legacy calling convention.
pub const STATUS_SUCCESS: i32 = 0;
pub const STATUS_INVALID_HANDLE: i32 = 1;
pub const STATUS_INVALID_POINTER: i32 = 3;
pub const STATUS_INVALID_SIZE: i32 = 4;
pub const STATUS_INVALID_VALUE: i32 = 11;

/// Errors raised by the defensive argument checks, before any numerical work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverError {
    InvalidHandle,
    InvalidPointer(&'static str),
    InvalidSize(&'static str),
    InvalidValue(&'static str),
}

impl SolverError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidHandle => "gvj_invalid_handle",
            Self::InvalidPointer(_) => "gvj_invalid_pointer",
            Self::InvalidSize(_) => "gvj_invalid_size",
            Self::InvalidValue(_) => "gvj_invalid_value",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> i32 {
        match self {
            Self::InvalidHandle => STATUS_INVALID_HANDLE,
            Self::InvalidPointer(_) => STATUS_INVALID_POINTER,
            Self::InvalidSize(_) => STATUS_INVALID_SIZE,
            Self::InvalidValue(_) => STATUS_INVALID_VALUE,
        }
    }

    /// Maps a legacy status code back to an error; `None` for success or
    /// codes the family never returns.
    #[must_use]
    pub fn from_status_code(code: i32) -> Option<Self> {
        match code {
            STATUS_INVALID_HANDLE => Some(Self::InvalidHandle),
            STATUS_INVALID_POINTER => Some(Self::InvalidPointer("legacy status 3")),
            STATUS_INVALID_SIZE => Some(Self::InvalidSize("legacy status 4")),
            STATUS_INVALID_VALUE => Some(Self::InvalidValue("legacy status 11")),
            _ => None,
        }
    }

    #[must_use]
    pub fn same_class(&self, other: &Self) -> bool {
        self.status_code() == other.status_code()
    }
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => write!(f, "solver handle is null"),
            Self::InvalidPointer(msg) | Self::InvalidSize(msg) | Self::InvalidValue(msg) => {
                write!(f, "{msg}")
            }
        }
    }
}

impl std::error::Error for SolverError {}

#[derive(Debug, PartialEq, Eq)]
pub struct SolverHandle {
    _private: (),
}

impl SolverHandle {
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for SolverHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Generalized eigenproblem form selected by `itype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenForm {
    /// A·x = λ·B·x
    Ax,
    /// A·B·x = λ·x
    Abx,
    /// B·A·x = λ·x
    Bax,
}

impl EigenForm {
    pub fn from_selector(itype: char) -> Result<Self, SolverError> {
        match itype {
            '1' => Ok(Self::Ax),
            '2' => Ok(Self::Abx),
            '3' => Ok(Self::Bax),
            _ => Err(SolverError::InvalidValue("itype must be one of 1|2|3")),
        }
    }
}

/// Selectors stay raw characters so invalid values reach the defensive checks.
#[derive(Debug)]
pub struct GvjRequest<'a, T: GvjScalar> {
    pub itype: char,
    pub jobz: char,
    pub uplo: char,
    pub n: i32,
    pub a: Option<&'a mut [T]>,
    pub lda: i32,
    pub b: Option<&'a mut [T]>,
    pub ldb: i32,
    pub abstol: T::Real,
    pub max_sweeps: i32,
    pub w: Option<&'a mut [T::Real]>,
    pub sort_eig: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GvjOutcome<R> {
    /// Frobenius norm of the off-diagonal part at exit.
    pub residual: R,
    pub sweeps: i32,
    /// 0 on success, 1 when Jacobi did not converge within `max_sweeps`,
    /// `n + i` when the i-th leading minor of B is not positive definite.
    pub info: i32,
}

impl<R: num_traits::Zero> GvjOutcome<R> {
    #[must_use]
    pub fn quick_return() -> Self {
        Self {
            residual: R::zero(),
            sweeps: 0,
            info: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckedArgs {
    pub form: EigenForm,
    pub vectors: bool,
    pub upper: bool,
    pub n: usize,
    pub lda: usize,
    pub ldb: usize,
}

/// Runs the defensive checks in the order the family guarantees:
/// handle, selector values, sizes, then pointers (skipped when `n == 0`).
pub fn check_arguments<T: GvjScalar>(
    handle: Option<&SolverHandle>,
    request: &GvjRequest<'_, T>,
) -> Result<CheckedArgs, SolverError> {
    if handle.is_none() {
        return Err(SolverError::InvalidHandle);
    }

    let form = EigenForm::from_selector(request.itype)?;
    let vectors = match request.jobz {
        'N' => false,
        'V' => true,
        _ => return Err(SolverError::InvalidValue("jobz must be one of N|V")),
    };
    let upper = match request.uplo {
        'U' => true,
        'L' => false,
        _ => return Err(SolverError::InvalidValue("uplo must be one of U|L")),
    };

    if request.n < 0 {
        return Err(SolverError::InvalidSize("n must be non-negative"));
    }
    if request.lda < request.n {
        return Err(SolverError::InvalidSize("lda must be at least n"));
    }
    if request.ldb < request.n {
        return Err(SolverError::InvalidSize("ldb must be at least n"));
    }
    if request.max_sweeps <= 0 {
        return Err(SolverError::InvalidSize("max_sweeps must be positive"));
    }

    let n = usize::try_from(request.n).map_err(|_| SolverError::InvalidSize("n overflow"))?;
    let lda = usize::try_from(request.lda).map_err(|_| SolverError::InvalidSize("lda overflow"))?;
    let ldb = usize::try_from(request.ldb).map_err(|_| SolverError::InvalidSize("ldb overflow"))?;
    let checked = CheckedArgs {
        form,
        vectors,
        upper,
        n,
        lda,
        ldb,
    };
    if n == 0 {
        return Ok(checked);
    }

    let min_len = |ld: usize| ld * (n - 1) + n;
    if request.a.as_deref().is_some_and(|a| a.len() < min_len(lda)) {
        return Err(SolverError::InvalidSize("A buffer shorter than lda*n"));
    }
    if request.b.as_deref().is_some_and(|b| b.len() < min_len(ldb)) {
        return Err(SolverError::InvalidSize("B buffer shorter than ldb*n"));
    }
    if request.w.as_deref().is_some_and(|w| w.len() < n) {
        return Err(SolverError::InvalidSize("W buffer shorter than n"));
    }

    if request.a.is_none() {
        return Err(SolverError::InvalidPointer("A must not be null"));
    }
    if request.b.is_none() {
        return Err(SolverError::InvalidPointer("B must not be null"));
    }
    if request.w.is_none() {
        return Err(SolverError::InvalidPointer("W must not be null"));
    }

    Ok(checked)
}
