#![forbid(unsafe_code)]

use crate::configuration::{Configuration, build_configuration, needs_bad_arg_check};
use crate::oracle::{ApiVariant, CorrectnessOracle, OracleFailure, REASON_RESIDUAL_DEVICE_ERROR};
use crate::params::{SizeTriple, VariantTriple};
use gvj_linalg::GvjScalar;
use gvj_runtime::{DeviceRuntime, DeviceStatus};

/// Result of one dispatched test instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub configuration: Configuration,
    /// `None` when the sentinel did not select this combination.
    pub bad_argument: Option<Result<(), OracleFailure>>,
    pub correctness: Result<(), OracleFailure>,
    /// Last-error state observed after the oracle returned. Not cleared.
    pub device_status: DeviceStatus,
}

impl CaseOutcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures().is_empty()
    }

    #[must_use]
    pub fn failures(&self) -> Vec<OracleFailure> {
        let mut failures = Vec::new();
        if let Some(Err(failure)) = &self.bad_argument {
            failures.push(failure.clone());
        }
        if let Err(failure) = &self.correctness {
            failures.push(failure.clone());
        }
        if !self.device_status.is_clear() {
            failures.push(OracleFailure::new(
                REASON_RESIDUAL_DEVICE_ERROR,
                format!(
                    "device error state not clear after invocation: {} (code {})",
                    self.device_status.name(),
                    self.device_status.code()
                ),
            ));
        }
        failures
    }
}

/// Bad-argument case first when the sentinel selects the pair, then the
/// correctness case pinned to a single problem. Neither short-circuits the
/// other; the device error state is read afterwards regardless.
pub fn run_test_case<T, O, D>(
    oracle: &O,
    device: &D,
    api: ApiVariant,
    size: SizeTriple,
    variant: VariantTriple,
) -> CaseOutcome
where
    T: GvjScalar,
    O: CorrectnessOracle,
    D: DeviceRuntime + ?Sized,
{
    let mut configuration = build_configuration::<T>(size, variant);

    let bad_argument = needs_bad_arg_check(&configuration)
        .then(|| oracle.run_bad_argument_case::<T>(api));

    configuration.batch_count = 1;
    let correctness = oracle.run_correctness_case::<T>(api, &configuration);

    CaseOutcome {
        configuration,
        bad_argument,
        correctness,
        device_status: device.peek_last_error(),
    }
}

#[cfg(test)]
mod tests {
    use super::run_test_case;
    use crate::configuration::Configuration;
    use crate::oracle::{
        ApiVariant, CorrectnessOracle, OracleFailure, REASON_DEFENSIVE_CHECK_MISSED,
        REASON_RESIDUAL_DEVICE_ERROR,
    };
    use crate::params::{SizeTriple, VariantTriple};
    use gvj_linalg::{GvjScalar, ScalarKind};
    use gvj_runtime::{DeviceRuntime, DeviceStatus, HostDevice};
    use num_complex::Complex32;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        BadArgument(ApiVariant, ScalarKind),
        Correctness(ApiVariant, ScalarKind, Configuration),
    }

    #[derive(Default)]
    struct RecordingOracle {
        calls: RefCell<Vec<Call>>,
        fail_bad_argument: bool,
    }

    impl CorrectnessOracle for RecordingOracle {
        fn run_bad_argument_case<T: GvjScalar>(
            &self,
            api: ApiVariant,
        ) -> Result<(), OracleFailure> {
            self.calls
                .borrow_mut()
                .push(Call::BadArgument(api, T::KIND));
            if self.fail_bad_argument {
                return Err(OracleFailure::new(
                    REASON_DEFENSIVE_CHECK_MISSED,
                    "null handle accepted",
                ));
            }
            Ok(())
        }

        fn run_correctness_case<T: GvjScalar>(
            &self,
            api: ApiVariant,
            config: &Configuration,
        ) -> Result<(), OracleFailure> {
            self.calls
                .borrow_mut()
                .push(Call::Correctness(api, T::KIND, config.clone()));
            Ok(())
        }
    }

    /// Passes every check but leaves an asynchronous error behind.
    struct LeakyOracle<'a> {
        device: &'a HostDevice,
    }

    impl CorrectnessOracle for LeakyOracle<'_> {
        fn run_bad_argument_case<T: GvjScalar>(
            &self,
            _api: ApiVariant,
        ) -> Result<(), OracleFailure> {
            Ok(())
        }

        fn run_correctness_case<T: GvjScalar>(
            &self,
            _api: ApiVariant,
            _config: &Configuration,
        ) -> Result<(), OracleFailure> {
            self.device
                .raise(DeviceStatus::LaunchFailure, "kernel fault after return");
            Ok(())
        }
    }

    #[test]
    fn scenario_a_runs_only_correctness() {
        let oracle = RecordingOracle::default();
        let device = HostDevice::new();
        let outcome = run_test_case::<f64, _, _>(
            &oracle,
            &device,
            ApiVariant::Normal,
            SizeTriple::new(20, 30, 20),
            VariantTriple::new('1', 'N', 'U'),
        );
        assert!(outcome.passed());
        assert!(outcome.bad_argument.is_none());
        let calls = oracle.calls.borrow();
        assert_eq!(calls.len(), 1);
        let Call::Correctness(api, kind, config) = &calls[0] else {
            panic!("expected correctness call, got {:?}", calls[0]);
        };
        assert_eq!(*api, ApiVariant::Normal);
        assert_eq!(*kind, ScalarKind::Double);
        assert_eq!(config.tolerance, 2.0 * f64::EPSILON);
        assert_eq!(config.max_sweeps, 100);
        assert!(config.sort_eig);
        assert_eq!(config.batch_count, 1);
        assert_eq!(outcome.device_status, DeviceStatus::Success);
    }

    #[test]
    fn scenario_b_runs_bad_argument_then_correctness() {
        let oracle = RecordingOracle::default();
        let device = HostDevice::new();
        let outcome = run_test_case::<f32, _, _>(
            &oracle,
            &device,
            ApiVariant::Fortran,
            SizeTriple::new(-1, 1, 1),
            VariantTriple::new('1', 'N', 'U'),
        );
        assert_eq!(outcome.bad_argument, Some(Ok(())));
        let calls = oracle.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            Call::BadArgument(ApiVariant::Fortran, ScalarKind::Float)
        );
        let Call::Correctness(_, ScalarKind::Float, config) = &calls[1] else {
            panic!("expected float correctness call, got {:?}", calls[1]);
        };
        assert_eq!(config.n, -1);
        assert_eq!(config.tolerance, 2.0 * f64::from(f32::EPSILON));
    }

    #[test]
    fn scenario_c_leaves_size_errors_to_oracle() {
        let oracle = RecordingOracle::default();
        let device = HostDevice::new();
        for variant in crate::params::VARIANT_TABLE {
            let outcome = run_test_case::<f32, _, _>(
                &oracle,
                &device,
                ApiVariant::Normal,
                SizeTriple::new(20, 5, 5),
                variant,
            );
            assert!(outcome.bad_argument.is_none());
            assert_eq!(outcome.device_status, DeviceStatus::Success);
        }
        assert!(
            oracle
                .calls
                .borrow()
                .iter()
                .all(|call| matches!(call, Call::Correctness(..)))
        );
    }

    #[test]
    fn bad_argument_failure_does_not_skip_correctness() {
        let oracle = RecordingOracle {
            fail_bad_argument: true,
            ..RecordingOracle::default()
        };
        let device = HostDevice::new();
        let outcome = run_test_case::<Complex32, _, _>(
            &oracle,
            &device,
            ApiVariant::Normal,
            SizeTriple::new(-1, 1, 1),
            VariantTriple::new('1', 'N', 'U'),
        );
        assert!(!outcome.passed());
        assert!(outcome.correctness.is_ok());
        assert_eq!(oracle.calls.borrow().len(), 2);
        let reasons: Vec<String> = outcome
            .failures()
            .into_iter()
            .map(|failure| failure.reason_code)
            .collect();
        assert_eq!(reasons, vec![REASON_DEFENSIVE_CHECK_MISSED.to_string()]);
    }

    #[test]
    fn residual_device_error_fails_a_passing_case() {
        let device = HostDevice::new();
        let oracle = LeakyOracle { device: &device };
        let outcome = run_test_case::<f64, _, _>(
            &oracle,
            &device,
            ApiVariant::Normal,
            SizeTriple::new(35, 35, 35),
            VariantTriple::new('2', 'V', 'U'),
        );
        assert!(outcome.correctness.is_ok());
        assert!(!outcome.passed());
        assert_eq!(outcome.failures()[0].reason_code, REASON_RESIDUAL_DEVICE_ERROR);
        // observed, not cleared
        assert_eq!(device.peek_last_error(), DeviceStatus::LaunchFailure);
    }

    #[test]
    fn checkin_tier_dispatches_pinned_configurations() {
        let oracle = RecordingOracle::default();
        let device = HostDevice::new();
        for instance in crate::suite::instantiate(crate::params::SizeTier::Checkin) {
            assert!(instance.run(&oracle, &device).passed(), "{}", instance.name());
        }

        let calls = oracle.calls.borrow();
        let mut correctness = 0;
        let mut bad_argument = Vec::new();
        for call in calls.iter() {
            match call {
                Call::BadArgument(api, kind) => bad_argument.push((*api, *kind)),
                Call::Correctness(_, kind, config) => {
                    correctness += 1;
                    let eps = match kind {
                        ScalarKind::Float | ScalarKind::FloatComplex => f64::from(f32::EPSILON),
                        ScalarKind::Double | ScalarKind::DoubleComplex => f64::EPSILON,
                    };
                    assert_eq!(config.tolerance, 2.0 * eps, "{kind:?}");
                    assert_eq!(config.max_sweeps, 100, "{kind:?}");
                    assert!(config.sort_eig, "{kind:?}");
                    assert_eq!(config.batch_count, 1, "{kind:?}");
                }
            }
        }
        assert_eq!(correctness, 240);
        assert_eq!(bad_argument.len(), 8);
        for api in [ApiVariant::Normal, ApiVariant::Fortran] {
            for kind in ScalarKind::ALL {
                assert!(bad_argument.contains(&(api, kind)), "{api:?} {kind:?}");
            }
        }
    }
}
