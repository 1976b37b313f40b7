#![forbid(unsafe_code)]

use crate::configuration::{Configuration, build_configuration};
use crate::dispatch::{CaseOutcome, run_test_case};
use crate::oracle::{ApiVariant, CorrectnessOracle};
use crate::params::{SizeTier, SizeTriple, VariantTriple, cross_product};
use gvj_linalg::{ScalarKind, SolverVariant};
use gvj_runtime::DeviceRuntime;
use num_complex::{Complex32, Complex64};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Sygvj,
    Hegvj,
    SygvjFortran,
    HegvjFortran,
}

impl Family {
    pub const ALL: [Self; 4] = [
        Self::Sygvj,
        Self::Hegvj,
        Self::SygvjFortran,
        Self::HegvjFortran,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sygvj => "SYGVJ",
            Self::Hegvj => "HEGVJ",
            Self::SygvjFortran => "SYGVJ_FORTRAN",
            Self::HegvjFortran => "HEGVJ_FORTRAN",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|family| family.name() == wanted)
    }

    #[must_use]
    pub const fn solver(self) -> SolverVariant {
        match self {
            Self::Sygvj | Self::SygvjFortran => SolverVariant::Sygvj,
            Self::Hegvj | Self::HegvjFortran => SolverVariant::Hegvj,
        }
    }

    #[must_use]
    pub const fn api(self) -> ApiVariant {
        match self {
            Self::Sygvj | Self::Hegvj => ApiVariant::Normal,
            Self::SygvjFortran | Self::HegvjFortran => ApiVariant::Fortran,
        }
    }

    #[must_use]
    pub const fn scalar_kinds(self) -> [ScalarKind; 2] {
        match self.solver() {
            SolverVariant::Sygvj => [ScalarKind::Float, ScalarKind::Double],
            SolverVariant::Hegvj => [ScalarKind::FloatComplex, ScalarKind::DoubleComplex],
        }
    }
}

/// One independently runnable (family, scalar type, parameter pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestInstance {
    pub tier: SizeTier,
    pub family: Family,
    pub scalar: ScalarKind,
    pub index: usize,
    pub size: SizeTriple,
    pub variant: VariantTriple,
}

impl TestInstance {
    /// `checkin_lapack/SYGVJ.__float/7`
    #[must_use]
    pub fn name(&self) -> String {
        format!(
            "{}/{}.__{}/{}",
            self.tier.as_str(),
            self.family.name(),
            self.scalar.name(),
            self.index
        )
    }

    /// Configuration the instance's correctness case is pinned to.
    #[must_use]
    pub fn configuration(&self) -> Configuration {
        let mut configuration = match self.scalar {
            ScalarKind::Float => build_configuration::<f32>(self.size, self.variant),
            ScalarKind::Double => build_configuration::<f64>(self.size, self.variant),
            ScalarKind::FloatComplex => build_configuration::<Complex32>(self.size, self.variant),
            ScalarKind::DoubleComplex => {
                build_configuration::<Complex64>(self.size, self.variant)
            }
        };
        configuration.batch_count = 1;
        configuration
    }

    pub fn run<O, D>(&self, oracle: &O, device: &D) -> CaseOutcome
    where
        O: CorrectnessOracle,
        D: DeviceRuntime + ?Sized,
    {
        let api = self.family.api();
        match self.scalar {
            ScalarKind::Float => {
                run_test_case::<f32, O, D>(oracle, device, api, self.size, self.variant)
            }
            ScalarKind::Double => {
                run_test_case::<f64, O, D>(oracle, device, api, self.size, self.variant)
            }
            ScalarKind::FloatComplex => {
                run_test_case::<Complex32, O, D>(oracle, device, api, self.size, self.variant)
            }
            ScalarKind::DoubleComplex => {
                run_test_case::<Complex64, O, D>(oracle, device, api, self.size, self.variant)
            }
        }
    }
}

/// Instances of one family for `tier`, type-major then in cross-product order.
#[must_use]
pub fn instantiate_family(tier: SizeTier, family: Family) -> Vec<TestInstance> {
    let pairs = cross_product(tier);
    family
        .scalar_kinds()
        .into_iter()
        .flat_map(|kind| {
            pairs
                .iter()
                .enumerate()
                .map(move |(index, (size, variant))| TestInstance {
                    tier,
                    family,
                    scalar: kind,
                    index,
                    size: *size,
                    variant: *variant,
                })
        })
        .collect()
}

/// Every instance of every family for `tier`.
#[must_use]
pub fn instantiate(tier: SizeTier) -> Vec<TestInstance> {
    Family::ALL
        .into_iter()
        .flat_map(|family| instantiate_family(tier, family))
        .collect()
}

/// SHA-256 over the instance names and their parameters, one per line.
/// Changes whenever either table or the family layout is edited.
#[must_use]
pub fn suite_manifest_digest(tier: SizeTier) -> String {
    let mut hasher = Sha256::new();
    for instance in instantiate(tier) {
        let SizeTriple { n, lda, ldb } = instance.size;
        let VariantTriple { itype, jobz, uplo } = instance.variant;
        hasher.update(
            format!(
                "{} n={n} lda={lda} ldb={ldb} itype={itype} jobz={jobz} uplo={uplo}\n",
                instance.name()
            )
            .as_bytes(),
        );
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Family, instantiate, instantiate_family, suite_manifest_digest};
    use crate::oracle::ApiVariant;
    use crate::params::SizeTier;
    use gvj_linalg::{ScalarKind, SolverVariant};
    use std::collections::BTreeSet;

    #[test]
    fn families_pair_solver_and_api() {
        assert_eq!(Family::Sygvj.solver(), SolverVariant::Sygvj);
        assert_eq!(Family::HegvjFortran.solver(), SolverVariant::Hegvj);
        assert_eq!(Family::SygvjFortran.api(), ApiVariant::Fortran);
        assert_eq!(Family::Hegvj.api(), ApiVariant::Normal);
        for family in Family::ALL {
            for kind in family.scalar_kinds() {
                assert_eq!(kind.solver(), family.solver(), "{}", family.name());
            }
        }
        assert_eq!(Family::parse("hegvj_fortran"), Some(Family::HegvjFortran));
        assert_eq!(Family::parse("GESVDJ"), None);
    }

    #[test]
    fn checkin_tier_has_240_uniquely_named_instances() {
        let instances = instantiate(SizeTier::Checkin);
        assert_eq!(instances.len(), 4 * 2 * 30);
        let names: BTreeSet<String> = instances.iter().map(|i| i.name()).collect();
        assert_eq!(names.len(), instances.len());
        assert!(names.contains("checkin_lapack/SYGVJ.__float/0"));
        assert!(names.contains("checkin_lapack/HEGVJ_FORTRAN.__double_complex/29"));
        assert!(!names.contains("checkin_lapack/SYGVJ.__float_complex/0"));
    }

    #[test]
    fn daily_tier_uses_the_same_layout() {
        let instances = instantiate_family(SizeTier::Daily, Family::Hegvj);
        assert_eq!(instances.len(), 2 * 18);
        assert_eq!(instances[0].scalar, ScalarKind::FloatComplex);
        assert_eq!(instances[0].size.n, 192);
        assert_eq!(instances[35].name(), "daily_lapack/HEGVJ.__double_complex/17");
    }

    #[test]
    fn sentinel_pair_appears_once_per_family_and_type() {
        let sentinels = instantiate(SizeTier::Checkin)
            .into_iter()
            .filter(|i| {
                i.size.n == -1
                    && i.variant.itype == '1'
                    && i.variant.jobz == 'N'
                    && i.variant.uplo == 'U'
            })
            .count();
        assert_eq!(sentinels, 8);
    }

    #[test]
    fn instance_configuration_matches_dispatched_one() {
        let instances = instantiate(SizeTier::Checkin);
        let float = &instances[0];
        let config = float.configuration();
        assert_eq!(config.tolerance, 2.0 * f64::from(f32::EPSILON));
        assert_eq!(config.batch_count, 1);
        assert_eq!((config.n, config.lda, config.ldb), (float.size.n, float.size.lda, float.size.ldb));
        let double = instances
            .iter()
            .find(|i| i.scalar == ScalarKind::DoubleComplex)
            .expect("hegvj instances");
        assert_eq!(double.configuration().tolerance, 2.0 * f64::EPSILON);
    }

    #[test]
    fn manifest_digest_is_stable_and_tier_specific() {
        let checkin = suite_manifest_digest(SizeTier::Checkin);
        assert_eq!(checkin.len(), 64);
        assert_eq!(checkin, suite_manifest_digest(SizeTier::Checkin));
        assert_ne!(checkin, suite_manifest_digest(SizeTier::Daily));
    }
}
