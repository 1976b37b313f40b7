#![forbid(unsafe_code)]

use gvj_conformance::params::SizeTier;
use gvj_conformance::suite::{Family, suite_manifest_digest};
use gvj_conformance::{HarnessConfig, SuiteReport, run_host_suites, set_conformance_log_path};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
struct SuiteSummary {
    suite: String,
    case_count: usize,
    pass_count: usize,
    failures: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GateSummary {
    status: &'static str,
    tier: &'static str,
    seed: u64,
    manifest_digest: String,
    log_path: String,
    suites: Vec<SuiteSummary>,
}

#[derive(Debug)]
struct GateOptions {
    tier: Option<SizeTier>,
    families: Vec<Family>,
    seed: Option<u64>,
    log_path: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("run_gvj_conformance_gate failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args()?;
    let mut cfg = HarnessConfig::default_paths().with_env_overrides()?;
    if let Some(tier) = options.tier {
        cfg.tier = tier;
    }
    if let Some(seed) = options.seed {
        cfg.seed = seed;
    }
    let log_path = options
        .log_path
        .or_else(|| std::env::var_os("GVJ_CONFORMANCE_LOG_PATH").map(PathBuf::from))
        .unwrap_or_else(|| cfg.default_log_path());
    set_conformance_log_path(Some(log_path.clone()));

    let families = if options.families.is_empty() {
        Family::ALL.to_vec()
    } else {
        options.families
    };
    let suites = run_host_suites(&cfg, &families)?
        .into_iter()
        .map(summarize_suite)
        .collect::<Vec<_>>();
    let passed = suites
        .iter()
        .all(|suite| suite.case_count == suite.pass_count && suite.failures.is_empty());
    let status = if passed { "pass" } else { "fail" };

    let summary = GateSummary {
        status,
        tier: cfg.tier.as_str(),
        seed: cfg.seed,
        manifest_digest: suite_manifest_digest(cfg.tier),
        log_path: log_path.display().to_string(),
        suites,
    };
    let summary_json = serde_json::to_string_pretty(&summary)
        .map_err(|err| format!("failed serializing summary: {err}"))?;
    println!("{summary_json}");

    if status == "fail" {
        std::process::exit(2);
    }
    Ok(())
}

fn summarize_suite(report: SuiteReport) -> SuiteSummary {
    SuiteSummary {
        suite: report.suite.to_string(),
        case_count: report.case_count,
        pass_count: report.pass_count,
        failures: report.failures,
    }
}

fn parse_args() -> Result<GateOptions, String> {
    let mut options = GateOptions {
        tier: None,
        families: Vec::new(),
        seed: None,
        log_path: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--tier" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--tier requires a value".to_string())?;
                options.tier = Some(
                    SizeTier::parse(&value)
                        .ok_or_else(|| format!("invalid --tier value '{value}'"))?,
                );
            }
            "--family" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--family requires a value".to_string())?;
                let family = Family::parse(&value)
                    .ok_or_else(|| format!("invalid --family value '{value}'"))?;
                if !options.families.contains(&family) {
                    options.families.push(family);
                }
            }
            "--seed" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|err| format!("invalid --seed value '{value}': {err}"))?,
                );
            }
            "--log-path" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--log-path requires a value".to_string())?;
                options.log_path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                println!(
                    "Usage: cargo run -p gvj-conformance --bin run_gvj_conformance_gate -- [--tier <checkin|daily>] [--family <SYGVJ|HEGVJ|SYGVJ_FORTRAN|HEGVJ_FORTRAN>]... [--seed <u64>] [--log-path <path>]"
                );
                std::process::exit(0);
            }
            unknown => return Err(format!("unknown argument: {unknown}")),
        }
    }
    Ok(options)
}
