//! Integration tests for the full optimization pipeline.
//!
//! Exercises: DesignData → complete → optimize → score → OptimizationReport,
//! plus the collaborator path through the orchestrator with scripted
//! collaborators and a hand-driven clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use habitat_logic::catalog::{ModuleType, MANDATORY_TYPES};
use habitat_logic::collaborator::{CollaboratorError, CollaboratorSession, LayoutCollaborator};
use habitat_logic::completion::complete;
use habitat_logic::compliance::{score, ComplianceBand};
use habitat_logic::error::HabitatError;
use habitat_logic::governor::{Clock, GovernorConfig, RateGovernor};
use habitat_logic::layout::{optimize, optimize_with_trace, within_envelope, LayoutParams};
use habitat_logic::module::{DesignData, HabitatConfig, Module, Vec3};
use habitat_logic::orchestrator::{optimize_design, parse_design, Orchestrator};
use habitat_logic::report::LayoutSource;
use serde_json::{json, Value};

// ── Helpers ────────────────────────────────────────────────────────────

fn config(radius: f64, height: f64, volume: f64, crew: i64) -> HabitatConfig {
    let mut cfg = HabitatConfig::default();
    cfg.radius = radius;
    cfg.height = height;
    cfg.volume = volume;
    cfg.mission.crew_size = crew;
    cfg
}

fn reference_design() -> DesignData {
    DesignData {
        modules: vec![],
        habitat_config: config(5.0, 10.0, 100.0, 4),
    }
}

fn module(id: &str, module_type: ModuleType, position: Vec3) -> Module {
    let mut m = Module::from_template(id, ModuleType::Sleep).unwrap();
    m.module_type = module_type;
    m.position = position;
    m
}

#[derive(Clone, Default)]
struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_secs(self.0.load(Ordering::SeqCst))
    }
}

/// Collaborator that answers from a shared queue and counts calls.
struct Scripted {
    answers: Arc<Mutex<Vec<Result<String, CollaboratorError>>>>,
    calls: Arc<AtomicU64>,
}

impl LayoutCollaborator for Scripted {
    fn propose(&mut self, _prompt: &str) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            Err(CollaboratorError::Unavailable)
        } else {
            answers.remove(0)
        }
    }
}

fn scripted_orchestrator(
    answers: Vec<Result<String, CollaboratorError>>,
) -> (Orchestrator<ManualClock>, ManualClock, Arc<AtomicU64>) {
    let answers = Arc::new(Mutex::new(answers));
    let calls = Arc::new(AtomicU64::new(0));
    let (a, c) = (Arc::clone(&answers), Arc::clone(&calls));
    let session = CollaboratorSession::connect(move || {
        Some(Box::new(Scripted {
            answers: Arc::clone(&a),
            calls: Arc::clone(&c),
        }) as Box<dyn LayoutCollaborator>)
    });
    let clock = ManualClock::default();
    let governor = RateGovernor::with_clock(GovernorConfig::default(), clock.clone());
    (
        Orchestrator::new(LayoutParams::default(), governor, Some(session)),
        clock,
        calls,
    )
}

/// A well-formed proposal for the completed reference design, with every
/// module spread on a wide ring and a bogus self-reported score.
fn proposal_text(design: &DesignData) -> String {
    let completed = complete(&design.modules, &design.habitat_config);
    let n = completed.len() as f64;
    let modules: Vec<Value> = completed
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let angle = i as f64 * std::f64::consts::TAU / n;
            json!({
                "id": m.id,
                "type": m.module_type,
                "position": [3.4 * angle.cos(), 0.0, 3.4 * angle.sin()],
                "zone": null,
            })
        })
        .collect();
    json!({
        "validation": {"overallScore": 99, "compliance": "compliant", "issues": [], "recommendations": ["trust me"]},
        "optimizedLayout": {"modules": modules, "changes": ["spread on a ring"], "reasoning": "ring"},
    })
    .to_string()
}

// ── Reference scenarios ────────────────────────────────────────────────

#[test]
fn empty_design_in_small_cylinder() {
    let design = reference_design();
    let cfg = &design.habitat_config;
    let params = LayoutParams::default();
    let outcome = optimize_with_trace(&design.modules, cfg, &params);

    let count = |t: ModuleType| outcome.modules.iter().filter(|m| m.module_type == t).count();
    assert_eq!(outcome.modules.len(), 7);
    assert_eq!(count(ModuleType::Sleep), 4);
    assert_eq!(count(ModuleType::Food), 1);
    assert_eq!(count(ModuleType::Hygiene), 1);
    assert_eq!(count(ModuleType::LifeSupport), 1);

    for m in &outcome.modules {
        assert!(m.position.radial_distance() <= 3.5 + 0.01, "{} {:?}", m.id, m.position);
        assert!(m.position.y.abs() <= 3.5 + 0.01, "{} {:?}", m.id, m.position);
    }

    let report = score(&outcome.modules, cfg);
    assert!(!report.issues.iter().any(|i| i.starts_with("Insufficient")));
    assert!(!report.issues.iter().any(|i| i.starts_with("Missing")));
    // Only adjacency penalties can apply on top of a perfect base.
    let adjacency = report.issues.len() as u8;
    assert_eq!(report.score, 100u8.saturating_sub(5 * adjacency));
}

#[test]
fn low_volume_penalized_exactly_once() {
    let cfg = config(5.0, 10.0, 40.0, 4);
    let layout = optimize(&[], &cfg);
    let report = score(&layout, &cfg);
    let volume_issues: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.starts_with("Insufficient volume per crew"))
        .collect();
    assert_eq!(volume_issues, ["Insufficient volume per crew: 10.0m³ < 25m³"]);
}

#[test]
fn sleep_and_exercise_two_units_apart() {
    let cfg = config(50.0, 50.0, 1000.0, 1);
    let mut modules = vec![
        module("s", ModuleType::Sleep, Vec3::new(0.0, 0.0, 0.0)),
        module("e", ModuleType::Exercise, Vec3::new(2.0, 0.0, 0.0)),
        module("f", ModuleType::Food, Vec3::new(20.0, 0.0, 0.0)),
        module("h", ModuleType::Hygiene, Vec3::new(-20.0, 0.0, 0.0)),
        module("l", ModuleType::LifeSupport, Vec3::new(0.0, 0.0, 20.0)),
    ];
    let report = score(&modules, &cfg);
    assert_eq!(report.score, 90);
    assert_eq!(report.issues.len(), 2);

    modules[1].position = Vec3::new(0.0, 0.0, -20.0);
    assert_eq!(score(&modules, &cfg).score, 100);
}

// ── Properties over a sweep of inputs ──────────────────────────────────

fn sweep_inputs() -> Vec<(Vec<Module>, HabitatConfig)> {
    let mut inputs = Vec::new();
    for &(radius, height) in &[(5.0, 10.0), (3.0, 4.0), (8.0, 6.0), (12.0, 20.0)] {
        for crew in [0, 1, 4, 7] {
            for extra in 0..4usize {
                let modules: Vec<Module> = ModuleType::all()
                    .iter()
                    .cycle()
                    .skip(extra * 3)
                    .take(extra * 4)
                    .enumerate()
                    .map(|(i, t)| module(&format!("{t}-{i}"), *t, Vec3::ZERO))
                    .collect();
                inputs.push((modules, config(radius, height, 30.0 * crew as f64, crew)));
            }
        }
    }
    inputs
}

#[test]
fn completion_is_monotone_and_sufficient() {
    for (modules, cfg) in sweep_inputs() {
        let completed = complete(&modules, &cfg);
        assert!(completed.len() >= modules.len());
        assert_eq!(&completed[..modules.len()], &modules[..]);
        for t in MANDATORY_TYPES {
            assert!(completed.iter().any(|m| m.module_type == t));
        }
        let sleep = completed
            .iter()
            .filter(|m| m.module_type == ModuleType::Sleep)
            .count() as i64;
        assert!(sleep >= cfg.crew_size());
        // Completing again adds nothing.
        assert_eq!(complete(&completed, &cfg), completed);
    }
}

#[test]
fn placement_contained_and_best_effort() {
    let params = LayoutParams::default();
    for (modules, cfg) in sweep_inputs() {
        let outcome = optimize_with_trace(&modules, &cfg, &params);
        assert_eq!(outcome.modules.len(), complete(&modules, &cfg).len());
        for (i, m) in outcome.modules.iter().enumerate() {
            assert!(within_envelope(&m.position, &cfg, &params, 0.01));
            let crowded = outcome.modules[..i]
                .iter()
                .any(|e| e.position.distance(&m.position) < params.min_separation);
            if crowded {
                assert_eq!(outcome.placements[i].attempts, params.max_attempts);
            }
        }
        let report = score(&outcome.modules, &cfg);
        assert!(report.score <= 100);
    }
}

#[test]
fn optimized_ids_match_completed_ids() {
    for (modules, cfg) in sweep_inputs() {
        let mut completed: Vec<String> = complete(&modules, &cfg).into_iter().map(|m| m.id).collect();
        let mut placed: Vec<String> = optimize(&modules, &cfg).into_iter().map(|m| m.id).collect();
        completed.sort();
        placed.sort();
        assert_eq!(completed, placed);
    }
}

// ── Orchestrator ───────────────────────────────────────────────────────

#[test]
fn design_json_round_trip_through_orchestrator() {
    let body = json!({
        "modules": [
            {"id": "gym", "type": "exercise", "position": [0, 0, 0], "size": [3, 3, 3],
             "volume": 27, "zone": "active", "color": "#f59e0b", "noiseLevel": "loud"},
            {"id": "bay", "type": "docking-port"}
        ],
        "habitatConfig": {"shape": "cylinder", "radius": 6, "height": 12, "volume": 200,
                          "mission": {"crewSize": 2, "destination": "mars"}}
    })
    .to_string();
    let design = parse_design(&body).unwrap();
    let report = Orchestrator::algorithmic(LayoutParams::default())
        .optimize(&design)
        .unwrap();
    let out = serde_json::to_value(&report).unwrap();

    assert_eq!(out["source"], json!("algorithmic"));
    assert_eq!(out["optimizedLayout"]["habitatConfig"]["shape"], json!("cylinder"));
    let modules = out["optimizedLayout"]["modules"].as_array().unwrap();
    // gym + unknown + sleep, food, hygiene, life-support + one more sleep
    assert_eq!(modules.len(), 7);
    assert_eq!(modules[0]["type"], json!("life-support"));
    assert_eq!(modules.last().unwrap()["type"], json!("unknown"));
    let score = out["validation"]["overallScore"].as_u64().unwrap();
    assert!(score <= 100);
}

#[test]
fn collaborator_layout_is_rescored() {
    let design = reference_design();
    let (orch, _, calls) = scripted_orchestrator(vec![Ok(proposal_text(&design))]);
    let report = orch.optimize(&design).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.source, LayoutSource::Collaborator);
    let layout = report.optimized_layout.as_ref().unwrap();
    assert_eq!(layout.modules.len(), 7);
    assert_eq!(layout.changes[0], "spread on a ring");
    assert_eq!(report.validation.recommendations, ["trust me"]);

    let local = score(&layout.modules, &design.habitat_config);
    assert_eq!(report.validation.overall_score, local.score);
    assert_eq!(report.validation.issues, local.issues);
    assert_eq!(
        report.validation.compliance,
        ComplianceBand::from_score(local.score)
    );
    // null zone backfilled from the completed module
    let food = layout.modules.iter().find(|m| m.module_type == ModuleType::Food).unwrap();
    assert_eq!(food.zone, habitat_logic::catalog::Zone::Clean);
}

#[test]
fn collaborator_failures_fall_back() {
    let design = reference_design();
    let algorithmic = optimize_design(&design);
    for answer in [
        Err(CollaboratorError::QuotaExceeded),
        Err(CollaboratorError::Timeout),
        Ok("I'd put the gym upstairs.".to_string()),
        Ok("{\"optimizedLayout\": {}}".to_string()),
        Ok(json!({"optimizedLayout": {"modules": [1, 2, 3, 4, 5, 6, 7]}}).to_string()),
        Ok(json!({"optimizedLayout": {"modules": vec![json!({"id": "sleep-1", "position": [0, 0, 0]}); 7]}}).to_string()),
    ] {
        let (orch, _, _) = scripted_orchestrator(vec![answer]);
        let report = orch.optimize(&design).unwrap();
        assert_eq!(report, algorithmic);
    }
}

#[test]
fn collaborator_count_mismatch_is_surfaced() {
    let design = reference_design();
    let answer = json!({"optimizedLayout": {"modules": [{"id": "sleep-1"}]}}).to_string();
    let (orch, _, _) = scripted_orchestrator(vec![Ok(answer)]);
    match orch.optimize(&design) {
        Err(HabitatError::ModuleCountMismatch { returned, expected }) => {
            assert_eq!((returned, expected), (1, 7));
        }
        other => panic!("expected count mismatch, got {other:?}"),
    }
}

#[test]
fn governor_gates_collaborator_calls() {
    let design = reference_design();
    let text = proposal_text(&design);
    let (orch, clock, calls) =
        scripted_orchestrator(vec![Ok(text.clone()), Ok(text.clone()), Ok(text)]);

    assert_eq!(orch.optimize(&design).unwrap().source, LayoutSource::Collaborator);
    // Second request inside the minimum interval never reaches the collaborator.
    assert_eq!(orch.optimize(&design).unwrap().source, LayoutSource::Algorithmic);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.advance(10);
    assert_eq!(orch.optimize(&design).unwrap().source, LayoutSource::Collaborator);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn validation_keeps_local_score() {
    let design = DesignData {
        modules: vec![module("s", ModuleType::Sleep, Vec3::ZERO)],
        habitat_config: config(5.0, 10.0, 100.0, 1),
    };
    let review = json!({
        "validation": {"overallScore": 100, "compliance": "compliant", "recommendations": ["add a galley"]},
        "analysis": {"volumeAnalysis": "roomy"}
    })
    .to_string();
    let (orch, _, _) = scripted_orchestrator(vec![Ok(review)]);
    let report = orch.validate(&design);
    assert_eq!(report.validation.overall_score, 40);
    assert_eq!(report.validation.compliance, ComplianceBand::Critical);
    assert_eq!(report.validation.recommendations, ["add a galley"]);
    assert_eq!(report.analysis.volume_analysis, "roomy");
    assert!(report.optimized_layout.is_none());
}

#[test]
fn orchestrator_is_shareable_across_threads() {
    let orch = Arc::new(Orchestrator::algorithmic(LayoutParams::default()));
    let design = reference_design();
    let expected = optimize_design(&design);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let orch = Arc::clone(&orch);
            let design = design.clone();
            std::thread::spawn(move || orch.optimize(&design).unwrap())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}
