//! Habitat Layout Headless Harness
//!
//! Runs the layout core entirely in-process: no server, no collaborator.
//!
//! Usage:
//!   cargo run -p habitat-simtest                         # scenario sweep
//!   cargo run -p habitat-simtest -- --verbose sweep
//!   cargo run -p habitat-simtest -- optimize design.json [--params params.json]
//!   cargo run -p habitat-simtest -- validate design.json

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use habitat_logic::catalog::{ModuleType, NoiseLevel, Zone, MANDATORY_TYPES};
use habitat_logic::compliance::{score, ComplianceBand};
use habitat_logic::error::HabitatResult;
use habitat_logic::layout::{optimize_with_trace, within_envelope, LayoutParams};
use habitat_logic::module::{DesignData, HabitatConfig, Module, Vec3};
use habitat_logic::orchestrator::{optimize_design_with, parse_design, validate_design};
use habitat_logic::report::{ErrorResponse, OptimizationReport};
use log::{Level, Log, Metadata, Record};
use serde_json::Map;

// ── CLI ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[clap(
    name = "habitat-simtest",
    version,
    about = "Headless harness for the habitat layout core"
)]
struct Cli {
    /// Log debug output to stderr and list every sweep result.
    #[clap(long, global = true)]
    verbose: bool,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Run the built-in scenario sweep (the default).
    Sweep,
    /// Complete, place and score a design file.
    Optimize {
        /// Design JSON (`{"modules": [...], "habitatConfig": {...}}`).
        design: PathBuf,
        /// Layout parameters JSON; defaults apply when omitted.
        #[clap(long)]
        params: Option<PathBuf>,
    },
    /// Score a design file as supplied, without moving anything.
    Validate {
        /// Design JSON.
        design: PathBuf,
    },
}

// ── Logging ─────────────────────────────────────────────────────────────

struct StderrLogger {
    level: Level,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::Debug } else { Level::Warn };
    let logger = Box::new(StderrLogger { level });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level.to_level_filter());
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command.unwrap_or(Command::Sweep) {
        Command::Sweep => run_sweep(cli.verbose),
        Command::Optimize { design, params } => {
            print_report(optimize_file(&design, params.as_deref()))
        }
        Command::Validate { design } => print_report(validate_file(&design)),
    };
    std::process::exit(code);
}

// ── Design files ────────────────────────────────────────────────────────

fn optimize_file(design: &Path, params: Option<&Path>) -> HabitatResult<OptimizationReport> {
    let design = load_design(design)?;
    let params = match params {
        Some(path) => load_params(path)?,
        None => LayoutParams::default(),
    };
    Ok(optimize_design_with(&design, &params))
}

fn validate_file(design: &Path) -> HabitatResult<OptimizationReport> {
    Ok(validate_design(&load_design(design)?))
}

fn print_report(result: HabitatResult<OptimizationReport>) -> i32 {
    match result.and_then(|report| Ok(serde_json::to_string_pretty(&report)?)) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(err) => {
            log::error!("{}", err);
            let body = serde_json::to_string(&ErrorResponse::from(&err))
                .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err));
            println!("{}", body);
            1
        }
    }
}

fn load_design(path: &Path) -> HabitatResult<DesignData> {
    let body = std::fs::read_to_string(path)?;
    parse_design(&body)
}

fn load_params(path: &Path) -> HabitatResult<LayoutParams> {
    let params: LayoutParams = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    params.validate()?;
    Ok(params)
}

// ── Scenario sweep ──────────────────────────────────────────────────────

fn run_sweep(verbose: bool) -> i32 {
    println!("=== Habitat Layout Harness ===\n");

    let mut results = Vec::new();
    results.extend(validate_reference_scenario(verbose));
    results.extend(validate_containment_sweep(verbose));
    results.extend(validate_scoring_rules(verbose));

    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );
    i32::from(failed > 0)
}

fn config(radius: f64, height: f64, volume: f64, crew: i64) -> HabitatConfig {
    let mut cfg = HabitatConfig::default();
    cfg.radius = radius;
    cfg.height = height;
    cfg.volume = volume;
    cfg.mission.crew_size = crew;
    cfg
}

// ── 1. Reference scenario ───────────────────────────────────────────────

fn validate_reference_scenario(verbose: bool) -> Vec<TestResult> {
    println!("--- Reference Scenario ---");
    let mut results = Vec::new();

    let cfg = config(5.0, 10.0, 100.0, 4);
    let design = DesignData {
        modules: vec![],
        habitat_config: cfg,
    };
    let report = optimize_design_with(&design, &LayoutParams::default());
    let modules = report
        .optimized_layout
        .as_ref()
        .map(|l| l.modules.clone())
        .unwrap_or_default();

    results.push(TestResult {
        name: "reference_module_count".into(),
        passed: modules.len() == 7,
        detail: format!("{} modules after completion", modules.len()),
    });

    let mandatory_ok = MANDATORY_TYPES
        .iter()
        .all(|t| modules.iter().any(|m| m.module_type == *t));
    results.push(TestResult {
        name: "reference_mandatory_present".into(),
        passed: mandatory_ok,
        detail: "sleep, food, hygiene, life-support".into(),
    });

    let base_issues = report
        .validation
        .issues
        .iter()
        .filter(|i| !i.contains("too close"))
        .count();
    results.push(TestResult {
        name: "reference_no_base_penalties".into(),
        passed: base_issues == 0,
        detail: format!(
            "score {} ({:?})",
            report.validation.overall_score, report.validation.compliance
        ),
    });

    if verbose {
        for m in &modules {
            println!(
                "    {:14} {:13} ({:6.2}, {:6.2}, {:6.2})",
                m.id,
                m.module_type.as_str(),
                m.position.x,
                m.position.y,
                m.position.z
            );
        }
    }

    results
}

// ── 2. Containment & collision sweep ────────────────────────────────────

fn validate_containment_sweep(_verbose: bool) -> Vec<TestResult> {
    println!("--- Containment Sweep ---");
    let mut results = Vec::new();
    let params = LayoutParams::default();

    let mut layouts = 0;
    let mut outside = 0;
    let mut skipped_retries = 0;
    for radius in [3.0, 5.0, 8.0, 15.0] {
        for height in [4.0, 10.0, 25.0] {
            for crew in [1, 4, 10] {
                let extras: Vec<Module> = ModuleType::all()
                    .iter()
                    .filter(|t| !t.is_mandatory())
                    .map(|t| extra_module(*t))
                    .collect();
                let cfg = config(radius, height, 30.0 * crew as f64, crew);
                let outcome = optimize_with_trace(&extras, &cfg, &params);
                layouts += 1;

                for (i, m) in outcome.modules.iter().enumerate() {
                    if !within_envelope(&m.position, &cfg, &params, 0.01) {
                        outside += 1;
                    }
                    let crowded = outcome.modules[..i]
                        .iter()
                        .any(|e| e.position.distance(&m.position) < params.min_separation);
                    if crowded && outcome.placements[i].attempts != params.max_attempts {
                        skipped_retries += 1;
                    }
                }
            }
        }
    }

    results.push(TestResult {
        name: "containment".into(),
        passed: outside == 0,
        detail: format!("{} layouts, {} modules outside envelope", layouts, outside),
    });
    results.push(TestResult {
        name: "collision_best_effort".into(),
        passed: skipped_retries == 0,
        detail: format!("{} collisions accepted before exhausting retries", skipped_retries),
    });

    results
}

/// Plain module of any type for sweeps; not tied to a synthesis template.
fn extra_module(module_type: ModuleType) -> Module {
    Module {
        id: format!("{}-x", module_type),
        module_type,
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        size: Vec3::new(2.0, 2.0, 2.0),
        volume: 8.0,
        zone: Zone::Active,
        color: "#6b7280".to_string(),
        noise_level: NoiseLevel::Moderate,
        extra: Map::new(),
    }
}

// ── 3. Scoring rules ────────────────────────────────────────────────────

fn validate_scoring_rules(_verbose: bool) -> Vec<TestResult> {
    println!("--- Scoring Rules ---");
    let mut results = Vec::new();

    let spread = |types: &[ModuleType]| -> Vec<Module> {
        types
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut m = extra_module(*t);
                m.position = Vec3::new(20.0 * i as f64, 0.0, 0.0);
                m
            })
            .collect()
    };

    let cramped = score(&spread(&MANDATORY_TYPES), &config(5.0, 10.0, 40.0, 4));
    let volume_hits = cramped
        .issues
        .iter()
        .filter(|i| i.starts_with("Insufficient volume"))
        .count();
    results.push(TestResult {
        name: "volume_penalty_once".into(),
        passed: volume_hits == 1,
        detail: format!("score {} with {} volume issue(s)", cramped.score, volume_hits),
    });

    let mut pair = spread(&MANDATORY_TYPES);
    let mut gym = extra_module(ModuleType::Exercise);
    gym.position = Vec3::new(2.0, 0.0, 0.0);
    pair.push(gym);
    let adjacent = score(&pair, &config(5.0, 10.0, 100.0, 1));
    results.push(TestResult {
        name: "directional_adjacency".into(),
        passed: adjacent.score == 90 && adjacent.issues.len() == 2,
        detail: format!("{:?}", adjacent.issues),
    });

    let mut monotone = true;
    let mut last = 0;
    for volume in [0.0, 50.0, 99.0, 100.0, 400.0] {
        let s = score(&spread(&MANDATORY_TYPES), &config(5.0, 10.0, volume, 4)).score;
        monotone &= s >= last;
        last = s;
    }
    results.push(TestResult {
        name: "volume_monotone".into(),
        passed: monotone,
        detail: format!("final score {}", last),
    });

    let empty = score(&[], &config(5.0, 10.0, 0.0, 0));
    results.push(TestResult {
        name: "score_floor".into(),
        passed: ComplianceBand::from_score(empty.score) == ComplianceBand::Critical,
        detail: format!("empty design scores {}", empty.score),
    });

    results
}
