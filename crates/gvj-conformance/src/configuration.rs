#![forbid(unsafe_code)]

use crate::params::{SizeTriple, VariantTriple};
use gvj_linalg::GvjScalar;
use serde::Serialize;

pub const DEFAULT_MAX_SWEEPS: i32 = 100;
pub const DEFAULT_BATCH_COUNT: i32 = 1;
/// Multiplier on machine epsilon for the solver tolerance.
pub const TOLERANCE_EPSILON_FACTOR: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    pub n: i32,
    pub lda: i32,
    pub ldb: i32,
    pub itype: char,
    pub jobz: char,
    pub uplo: char,
    pub tolerance: f64,
    pub max_sweeps: i32,
    pub sort_eig: bool,
    pub batch_count: i32,
    pub timing: bool,
}

impl Configuration {
    #[must_use]
    pub fn sizes(&self) -> SizeTriple {
        SizeTriple::new(self.n, self.lda, self.ldb)
    }

    #[must_use]
    pub fn variant(&self) -> VariantTriple {
        VariantTriple::new(self.itype, self.jobz, self.uplo)
    }
}

/// Total: invalid sizes are copied through untouched.
#[must_use]
pub fn build_configuration<T: GvjScalar>(size: SizeTriple, variant: VariantTriple) -> Configuration {
    Configuration {
        n: size.n,
        lda: size.lda,
        ldb: size.ldb,
        itype: variant.itype,
        jobz: variant.jobz,
        uplo: variant.uplo,
        tolerance: TOLERANCE_EPSILON_FACTOR * T::epsilon(),
        max_sweeps: DEFAULT_MAX_SWEEPS,
        sort_eig: true,
        batch_count: DEFAULT_BATCH_COUNT,
        timing: false,
    }
}

/// Edits to either table must keep exactly one match in the cross product.
#[must_use]
pub fn needs_bad_arg_check(config: &Configuration) -> bool {
    config.itype == '1' && config.jobz == 'N' && config.uplo == 'U' && config.n == -1
}
