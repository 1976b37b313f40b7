#![forbid(unsafe_code)]

pub mod backend;
pub mod configuration;
pub mod dispatch;
pub mod oracle;
pub mod params;
pub mod reference;
pub mod suite;

use crate::backend::HostBackend;
use crate::dispatch::CaseOutcome;
use crate::oracle::{
    BATCHED, CorrectnessOracle, OracleFailure, REASON_ORACLE_PANICKED, STRIDED,
};
use crate::params::SizeTier;
use crate::reference::ReferenceOracle;
use crate::suite::{Family, TestInstance, instantiate, instantiate_family, suite_manifest_digest};
use gvj_runtime::{DeviceRuntime, HostDevice};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

pub const DEFAULT_SEED: u64 = 0x5947_564a;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub tier: SizeTier,
    pub seed: u64,
    pub artifact_root: PathBuf,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
        Self {
            tier: SizeTier::Checkin,
            seed: DEFAULT_SEED,
            artifact_root: repo_root.join("artifacts/gvj"),
        }
    }

    /// JSONL log written under `artifact_root` when no path is configured.
    #[must_use]
    pub fn default_log_path(&self) -> PathBuf {
        self.artifact_root
            .join(format!("{}_conformance.jsonl", self.tier.as_str()))
    }

    pub fn with_env_overrides(mut self) -> Result<Self, String> {
        if let Ok(raw) = std::env::var("GVJ_TIER") {
            self.tier = SizeTier::parse(&raw)
                .ok_or_else(|| format!("invalid GVJ_TIER value '{raw}'"))?;
        }
        if let Ok(raw) = std::env::var("GVJ_SEED") {
            self.seed = raw
                .trim()
                .parse::<u64>()
                .map_err(|err| format!("invalid GVJ_SEED value '{raw}': {err}"))?;
        }
        Ok(self)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessReport {
    pub suite: &'static str,
    pub tier: &'static str,
    pub instance_count: usize,
    pub manifest_digest: String,
    pub artifact_root_present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    pub suite: &'static str,
    pub case_count: usize,
    pub pass_count: usize,
    pub failures: Vec<String>,
}

impl SuiteReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.case_count == self.pass_count && self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
struct ConformanceLogEntry {
    suite: &'static str,
    instance: String,
    tier: &'static str,
    family: &'static str,
    api: &'static str,
    scalar: &'static str,
    seed: u64,
    n: i32,
    lda: i32,
    ldb: i32,
    itype: char,
    jobz: char,
    uplo: char,
    tolerance: f64,
    batched: bool,
    strided: bool,
    bad_argument_checked: bool,
    device_status: &'static str,
    reason_codes: Vec<String>,
    passed: bool,
}

static CONFORMANCE_LOG_PATH: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

pub fn set_conformance_log_path(path: Option<PathBuf>) {
    let cell = CONFORMANCE_LOG_PATH.get_or_init(|| Mutex::new(None));
    if let Ok(mut slot) = cell.lock() {
        *slot = path;
    }
}

#[must_use]
pub fn run_smoke(config: &HarnessConfig) -> HarnessReport {
    HarnessReport {
        suite: "smoke",
        tier: config.tier.as_str(),
        instance_count: instantiate(config.tier).len(),
        manifest_digest: suite_manifest_digest(config.tier),
        artifact_root_present: config.artifact_root.exists(),
    }
}

/// A failing or panicking instance is recorded and the rest still run.
pub fn run_family_suite<O, D>(
    config: &HarnessConfig,
    family: Family,
    oracle: &O,
    device: &D,
) -> Result<SuiteReport, String>
where
    O: CorrectnessOracle,
    D: DeviceRuntime + ?Sized,
{
    let instances = instantiate_family(config.tier, family);
    let mut report = SuiteReport {
        suite: family.name(),
        case_count: instances.len(),
        pass_count: 0,
        failures: Vec::new(),
    };

    for instance in instances {
        let outcome = run_isolated(&instance, oracle, device);
        let passed = outcome.passed();
        let failure = outcome
            .failures()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        record_check(
            &mut report,
            passed,
            format!("{}: {failure}", instance.name()),
        );
        maybe_append_conformance_log(&log_entry(config, &instance, &outcome))?;
    }

    Ok(report)
}

pub fn run_all_family_suites<O, D>(
    config: &HarnessConfig,
    oracle: &O,
    device: &D,
) -> Result<Vec<SuiteReport>, String>
where
    O: CorrectnessOracle,
    D: DeviceRuntime + ?Sized,
{
    Family::ALL
        .into_iter()
        .map(|family| run_family_suite(config, family, oracle, device))
        .collect()
}

pub fn run_host_suites(
    config: &HarnessConfig,
    families: &[Family],
) -> Result<Vec<SuiteReport>, String> {
    let oracle = ReferenceOracle::new(HostBackend, config.seed);
    let device = HostDevice::new();
    families
        .iter()
        .map(|family| run_family_suite(config, *family, &oracle, &device))
        .collect()
}

fn run_isolated<O, D>(instance: &TestInstance, oracle: &O, device: &D) -> CaseOutcome
where
    O: CorrectnessOracle,
    D: DeviceRuntime + ?Sized,
{
    catch_unwind(AssertUnwindSafe(|| instance.run(oracle, device))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        CaseOutcome {
            configuration: instance.configuration(),
            bad_argument: None,
            correctness: Err(OracleFailure::new(
                REASON_ORACLE_PANICKED,
                format!("oracle panicked: {message}"),
            )),
            device_status: device.peek_last_error(),
        }
    })
}

fn record_check(report: &mut SuiteReport, passed: bool, failure: String) {
    if passed {
        report.pass_count += 1;
    } else {
        report.failures.push(failure);
    }
}

fn log_entry(
    config: &HarnessConfig,
    instance: &TestInstance,
    outcome: &CaseOutcome,
) -> ConformanceLogEntry {
    let c = &outcome.configuration;
    ConformanceLogEntry {
        suite: instance.family.name(),
        instance: instance.name(),
        tier: instance.tier.as_str(),
        family: instance.family.name(),
        api: instance.family.api().as_str(),
        scalar: instance.scalar.name(),
        seed: config.seed,
        n: c.n,
        lda: c.lda,
        ldb: c.ldb,
        itype: c.itype,
        jobz: c.jobz,
        uplo: c.uplo,
        tolerance: c.tolerance,
        batched: BATCHED,
        strided: STRIDED,
        bad_argument_checked: outcome.bad_argument.is_some(),
        device_status: outcome.device_status.name(),
        reason_codes: outcome
            .failures()
            .into_iter()
            .map(|failure| failure.reason_code)
            .collect(),
        passed: outcome.passed(),
    }
}

fn maybe_append_conformance_log(entry: &ConformanceLogEntry) -> Result<(), String> {
    let configured = CONFORMANCE_LOG_PATH
        .get()
        .and_then(|cell| cell.lock().ok())
        .and_then(|slot| slot.clone());
    let from_env = std::env::var_os("GVJ_CONFORMANCE_LOG_PATH").map(PathBuf::from);
    let Some(path) = configured.or(from_env) else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| format!("failed opening {}: {err}", path.display()))?;
    let line = serde_json::to_string(entry)
        .map_err(|err| format!("failed serializing conformance log entry: {err}"))?;
    let mut payload = line.into_bytes();
    payload.push(b'\n');
    file.write_all(&payload).map_err(|err| {
        format!(
            "failed appending conformance log {}: {err}",
            path.display()
        )
    })
}
