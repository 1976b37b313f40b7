#![forbid(unsafe_code)]

use crate::configuration::Configuration;
use gvj_linalg::GvjScalar;
use serde::Serialize;

pub const BATCHED: bool = false;
pub const STRIDED: bool = false;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ApiVariant {
    Normal,
    Fortran,
}

impl ApiVariant {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Fortran => "fortran",
        }
    }
}

pub const REASON_NUMERICAL_MISMATCH: &str = "gvj_numerical_mismatch";
pub const REASON_UNEXPECTED_STATUS: &str = "gvj_unexpected_status";
pub const REASON_DEFENSIVE_CHECK_MISSED: &str = "gvj_defensive_check_missed";
pub const REASON_SOLVER_INFO_NONZERO: &str = "gvj_solver_info_nonzero";
pub const REASON_PADDING_CLOBBERED: &str = "gvj_padding_clobbered";
pub const REASON_RESIDUAL_DEVICE_ERROR: &str = "gvj_residual_device_error";
pub const REASON_REFERENCE_FAILED: &str = "gvj_reference_failed";
pub const REASON_ORACLE_PANICKED: &str = "gvj_oracle_panicked";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleFailure {
    pub reason_code: String,
    pub message: String,
}

impl OracleFailure {
    pub fn new(reason_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason_code: reason_code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for OracleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} reason_code={}", self.message, self.reason_code)
    }
}

impl std::error::Error for OracleFailure {}

/// External judge of solver behaviour. The solver variant follows from
/// `T::KIND`; both entry points must leave the device error state clean.
pub trait CorrectnessOracle {
    fn run_bad_argument_case<T: GvjScalar>(&self, api: ApiVariant) -> Result<(), OracleFailure>;

    fn run_correctness_case<T: GvjScalar>(
        &self,
        api: ApiVariant,
        config: &Configuration,
    ) -> Result<(), OracleFailure>;
}
