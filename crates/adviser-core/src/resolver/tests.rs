//! Resolution scenarios over small in-memory knowledge bases.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::config::{DecisionType, PredictorConfig, RecommendationType};
use crate::environment::RuntimeEnvironment;
use crate::justification::JustificationType;
use crate::knowledge::{CveRecord, InMemoryKnowledgeBase};
use crate::package::PackageVersion;
use crate::pipeline::{PipelineUnit, Step, UnitConfiguration, UnitInstance, UnitKind};
use crate::predictor::HillClimbing;
use crate::state::StateId;

const INDEX: &str = "https://pypi.org/simple";

fn tuple(name: &str, version: &str) -> PackageTuple {
    PackageTuple::new(name, version, INDEX)
}

/// flask 2.0 needs click >= 8, flask 1.0 takes any click from 7 on
fn flask_knowledge_base() -> InMemoryKnowledgeBase {
    let mut kb = InMemoryKnowledgeBase::new();
    kb.add_package("flask", "1.0", INDEX, &[("click", ">=7")])
        .add_package("flask", "2.0", INDEX, &[("click", ">=8")])
        .add_package("click", "7.0", INDEX, &[])
        .add_package("click", "8.0", INDEX, &[])
        .add_package("click", "8.1", INDEX, &[]);
    kb
}

fn latest_version_pipeline() -> Pipeline {
    Pipeline::new().with_unit(
        UnitKind::LatestVersionStep
            .instantiate(UnitConfiguration::new())
            .unwrap(),
    )
}

fn context(kb: InMemoryKnowledgeBase, project: Project, count: usize) -> Context {
    let params = ContextParams {
        project,
        runtime_environment: RuntimeEnvironment::new("fedora", "38", "3.11"),
        recommendation_type: Some(RecommendationType::Latest),
        decision_type: None,
        beam_width: 100,
        limit: 1000,
        count,
        seed: 42,
    };
    Context::new(params, Arc::new(kb)).unwrap()
}

fn resolve(
    kb: InMemoryKnowledgeBase,
    project: Project,
    predictor: PredictorConfig,
    pipeline: Pipeline,
    count: usize,
) -> (Report, Context) {
    let mut context = context(kb, project, count);
    let mut resolver = Resolver::new(pipeline, predictor.build().unwrap());
    let report = resolver.resolve(&mut context).unwrap();
    (report, context)
}

fn pins(product: &Product) -> Vec<(&str, &str)> {
    product
        .packages
        .iter()
        .map(|p| (p.name.as_str(), p.version.as_str()))
        .collect()
}

fn cve(id: &str) -> CveRecord {
    CveRecord {
        id: id.to_string(),
        details: String::new(),
        link: None,
    }
}

#[test]
fn test_hill_climbing_explores_every_stack() {
    let project = Project::new().require("flask", ">=1.0").unwrap();
    let (report, _) = resolve(
        flask_knowledge_base(),
        project,
        PredictorConfig::HillClimbing,
        latest_version_pipeline(),
        1,
    );

    assert_eq!(report.products.len(), 1);
    assert_eq!(pins(&report.products[0]), vec![("flask", "2.0"), ("click", "8.1")]);
    assert_eq!(report.products[0].score, 2.0);
    // flask 2.0 with two clicks, flask 1.0 with three
    assert_eq!(report.accepted_final_states_count, 5);
    assert_eq!(report.discarded_final_states_count, 0);
    assert_eq!(report.iterations, 7);
    assert_eq!(report.seed, 42);
}

#[test]
fn test_every_predictor_finds_the_best_stack() {
    let predictors = vec![
        PredictorConfig::default(),
        PredictorConfig::HillClimbing,
        PredictorConfig::ApproximatingLatest,
        PredictorConfig::from_name("temporal-difference").unwrap(),
        PredictorConfig::from_name("mcts").unwrap(),
        PredictorConfig::RandomWalk,
        PredictorConfig::PackageCombinations {
            package_combinations: vec!["click".to_string()],
        },
    ];

    for predictor in predictors {
        let name = predictor.name();
        let project = Project::new().require("flask", "").unwrap();
        let (report, _) = resolve(flask_knowledge_base(), project, predictor, latest_version_pipeline(), 10);

        assert_eq!(report.accepted_final_states_count, 5, "predictor {}", name);
        assert_eq!(report.products.len(), 5, "predictor {}", name);
        assert_eq!(
            pins(&report.products[0]),
            vec![("flask", "2.0"), ("click", "8.1")],
            "predictor {}",
            name
        );
        let scores: Vec<f64> = report.products.iter().map(|p| p.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]), "predictor {}", name);
    }
}

#[test]
fn test_same_seed_same_products() {
    let mut kb = InMemoryKnowledgeBase::new();
    for version in ["1.0", "1.1", "1.2", "2.0"] {
        kb.add_package("requests", version, INDEX, &[("urllib3", ">=1.0"), ("idna", "")]);
    }
    for version in ["1.0", "1.5", "2.0"] {
        kb.add_package("urllib3", version, INDEX, &[]);
    }
    for version in ["2.0", "3.0", "3.4"] {
        kb.add_package("idna", version, INDEX, &[]);
    }

    let project = Project::new().require("requests", ">=1.1").unwrap();
    let mut config = AdviserConfig::default()
        .with_recommendation_type(RecommendationType::Latest)
        .with_predictor(PredictorConfig::from_name("mcts").unwrap())
        .with_seed(1234);
    config.limit = 25;
    config.count = 4;
    config.beam_width = 8;

    let kb = Arc::new(kb);
    let first = advise(&config, project.clone(), kb.clone()).unwrap();
    let second = advise(&config, project, kb).unwrap();

    assert_eq!(first.seed, 1234);
    assert_eq!(first.iterations, second.iterations);
    assert_eq!(first.products, second.products);
    assert_eq!(first.stack_info, second.stack_info);
}

#[test]
fn test_unresolvable_direct_requirement() {
    let project = Project::new().require("flask", ">=3.0").unwrap();
    let config = AdviserConfig::default().with_seed(1);

    match advise(&config, project, Arc::new(flask_knowledge_base())) {
        Err(AdviserError::UnresolvableRequirement { name, specifier, .. }) => {
            assert_eq!(name, "flask");
            assert_eq!(specifier, ">=3.0");
        }
        other => panic!("unexpected result {:?}", other),
    }

    let project = Project::new().require("django", "").unwrap();
    assert!(matches!(
        advise(&config, project, Arc::new(flask_knowledge_base())),
        Err(AdviserError::UnresolvableRequirement { .. })
    ));
}

#[test]
fn test_conflicting_dependencies_yield_no_stack() {
    let mut kb = InMemoryKnowledgeBase::new();
    kb.add_package("a", "1.0", INDEX, &[("c", "<2")])
        .add_package("b", "1.0", INDEX, &[("c", ">=2")])
        .add_package("c", "1.0", INDEX, &[])
        .add_package("c", "2.0", INDEX, &[]);
    let project = Project::new()
        .require("a", "")
        .unwrap()
        .require("b", "")
        .unwrap();

    let (report, _) = resolve(kb, project, PredictorConfig::HillClimbing, Pipeline::new(), 3);

    assert!(report.is_empty());
    assert_eq!(report.accepted_final_states_count, 0);
    assert_eq!(report.iterations, 3);
    assert!(report
        .stack_info
        .iter()
        .any(|j| j.kind == crate::justification::JustificationType::Error));
}

#[test]
fn test_transitive_requirement_narrows_direct_candidates() {
    let mut kb = InMemoryKnowledgeBase::new();
    kb.add_package("c", "1.0", INDEX, &[])
        .add_package("c", "2.0", INDEX, &[])
        .add_package("a", "1.0", INDEX, &[("c", "<2")]);
    let project = Project::new()
        .require("c", "")
        .unwrap()
        .require("a", "")
        .unwrap();

    let (report, context) = resolve(kb, project, PredictorConfig::HillClimbing, Pipeline::new(), 3);

    assert_eq!(report.products.len(), 1);
    assert_eq!(pins(&report.products[0]), vec![("a", "1.0"), ("c", "1.0")]);
    assert_eq!(report.iterations, 2);

    assert!(context.is_direct_dependency(&tuple("c", "2.0")));
    assert!(context.is_direct_dependency(&tuple("a", "1.0")));
    let dependents = context.dependents_of(&tuple("c", "1.0")).unwrap();
    assert!(dependents.iter().any(|(dependent, _)| *dependent == tuple("a", "1.0")));
    assert!(context.dependents_of(&tuple("c", "2.0")).is_none());
}

#[test]
fn test_missing_dependency_information_rejects_branch() {
    let mut kb = InMemoryKnowledgeBase::new();
    kb.add_package("numpy", "1.26", INDEX, &[]);
    kb.insert(crate::knowledge::PackageRecord {
        name: "numpy".to_string(),
        version: "2.0".to_string(),
        index_url: INDEX.to_string(),
        requires: None,
        cves: None,
        solver_status: None,
    });
    let project = Project::new().require("numpy", "").unwrap();

    let (report, _) = resolve(kb, project, PredictorConfig::HillClimbing, Pipeline::new(), 3);

    assert_eq!(report.products.len(), 1);
    assert_eq!(pins(&report.products[0]), vec![("numpy", "1.26")]);
    let warnings: Vec<_> = report
        .stack_info
        .iter()
        .filter(|j| j.message.contains("No dependency information"))
        .collect();
    assert_eq!(warnings.len(), 1);
}

#[test]
fn test_dependency_monkey_stops_at_count() {
    let mut kb = InMemoryKnowledgeBase::new();
    for version in ["1.0", "2.0", "3.0", "4.0", "5.0"] {
        kb.add_package("a", version, INDEX, &[]);
        kb.add_package("b", version, INDEX, &[]);
    }
    let project = Project::new()
        .require("a", "")
        .unwrap()
        .require("b", "")
        .unwrap();
    let mut config = AdviserConfig::default()
        .with_decision_type(DecisionType::Random)
        .with_seed(3);
    config.count = 2;

    let report = advise(&config, project, Arc::new(kb)).unwrap();

    assert_eq!(report.accepted_final_states_count, 2);
    assert_eq!(report.products.len(), 2);
    assert_ne!(report.products[0].packages, report.products[1].packages);
    assert!(report.iterations < config.limit);
}

#[test]
fn test_security_recommendation_drops_vulnerable_releases() {
    let mut kb = InMemoryKnowledgeBase::new();
    kb.add_package("django", "2.0", INDEX, &[])
        .add_package("django", "3.0", INDEX, &[])
        .add_cve("django", "3.0", cve("CVE-2020-9402"));
    let project = Project::new().require("django", "").unwrap();
    let config = AdviserConfig::default()
        .with_recommendation_type(RecommendationType::Security)
        .with_seed(5);

    let report = advise(&config, project, Arc::new(kb)).unwrap();

    assert_eq!(report.products.len(), 1);
    assert_eq!(pins(&report.products[0]), vec![("django", "2.0")]);
    let removals = report
        .stack_info
        .iter()
        .filter(|j| j.message.contains("CVE-2020-9402"))
        .count();
    assert_eq!(removals, 1);
}

#[test]
fn test_unresolvable_requirement_keeps_sieve_justification() {
    let mut kb = InMemoryKnowledgeBase::new();
    kb.add_package("flask", "0.12", INDEX, &[])
        .add_cve("flask", "0.12", cve("CVE-2018-1000656"));
    let project = Project::new().require("flask", "").unwrap();
    let config = AdviserConfig::default()
        .with_recommendation_type(RecommendationType::Security)
        .with_seed(5);

    let err = advise(&config, project, Arc::new(kb)).unwrap_err();

    assert!(matches!(err, AdviserError::UnresolvableRequirement { ref name, .. } if name == "flask"));
    let removals: Vec<_> = err
        .stack_info()
        .iter()
        .filter(|j| j.message.contains("CVE-2018-1000656"))
        .collect();
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].kind, JustificationType::Warning);
}

#[test]
fn test_stable_recommendation_penalizes_vulnerable_releases() {
    let mut kb = InMemoryKnowledgeBase::new();
    kb.add_package("django", "2.0", INDEX, &[])
        .add_package("django", "3.0", INDEX, &[])
        .add_cve("django", "3.0", cve("CVE-2020-9402"));
    let project = Project::new().require("django", "").unwrap();
    let config = AdviserConfig::default()
        .with_recommendation_type(RecommendationType::Stable)
        .with_seed(5);

    let report = advise(&config, project, Arc::new(kb)).unwrap();

    assert_eq!(report.products.len(), 2);
    let best = &report.products[0];
    assert_eq!(pins(best), vec![("django", "3.0")]);
    assert!((best.score - 0.8).abs() < 1e-9);
    assert!(best
        .justification
        .iter()
        .any(|j| j.message.contains("CVE-2020-9402")));
    assert!((report.products[1].score - 0.5).abs() < 1e-9);
    assert!(report.products[1].justification.is_empty());
}

/// Leaves one package out of every stack
struct SkipPackageStep {
    configuration: UnitConfiguration,
    package_name: &'static str,
}

impl PipelineUnit for SkipPackageStep {
    fn name(&self) -> &'static str {
        "SkipPackageStep"
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }
}

impl Step for SkipPackageStep {
    fn run(&mut self, _context: &mut Context, _state: &State, package_version: &PackageVersion) -> Result<StepOutcome> {
        if package_version.name() == self.package_name {
            Ok(StepOutcome::Skipped)
        } else {
            Ok(StepOutcome::neutral())
        }
    }
}

/// Hill climbing that records every reward it is given
struct RewardRecorder {
    inner: HillClimbing,
    rewards: Rc<RefCell<Vec<(String, f64)>>>,
}

impl Predictor for RewardRecorder {
    fn name(&self) -> &'static str {
        "reward-recorder"
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        self.inner.run(context)
    }

    fn set_reward_signal(&mut self, _context: &Context, _state: &State, package_tuple: &PackageTuple, reward: f64) {
        self.rewards.borrow_mut().push((package_tuple.name.clone(), reward));
    }
}

#[test]
fn test_skipped_package_is_left_out_of_stacks() {
    let mut kb = flask_knowledge_base();
    kb.add_package("markupsafe", "2.0", INDEX, &[]);
    let project = Project::new()
        .require("markupsafe", "")
        .unwrap()
        .require("flask", "")
        .unwrap();
    let pipeline = latest_version_pipeline().with_unit(UnitInstance::Step(Box::new(SkipPackageStep {
        configuration: UnitConfiguration::new(),
        package_name: "click",
    })));
    let rewards = Rc::new(RefCell::new(Vec::new()));
    let predictor = RewardRecorder {
        inner: HillClimbing::new(),
        rewards: Rc::clone(&rewards),
    };

    let mut context = context(kb, project, 10);
    let mut resolver = Resolver::new(pipeline, Box::new(predictor));
    let report = resolver.resolve(&mut context).unwrap();

    // Each click alternative left in a parent yields the same stack again;
    // only UniqueStackStride would fold them.
    assert_eq!(report.accepted_final_states_count, 5);
    assert_eq!(report.discarded_final_states_count, 0);
    assert_eq!(report.iterations, 12);
    assert_eq!(report.products.len(), 5);
    for product in &report.products[..2] {
        assert_eq!(pins(product), vec![("flask", "2.0"), ("markupsafe", "2.0")]);
    }
    for product in &report.products[2..] {
        assert_eq!(pins(product), vec![("flask", "1.0"), ("markupsafe", "2.0")]);
    }

    let rewards = rewards.borrow();
    assert!(rewards.iter().all(|(_, reward)| !reward.is_nan()));
    let click: Vec<f64> = rewards
        .iter()
        .filter(|(name, _)| name == "click")
        .map(|(_, reward)| *reward)
        .collect();
    assert_eq!(click, vec![0.0; 5]);
    let finals = rewards
        .iter()
        .filter(|(name, reward)| name == "markupsafe" && *reward == f64::INFINITY)
        .count();
    assert_eq!(finals, 5);
}

#[test]
fn test_time_limit_stops_before_first_iteration() {
    let project = Project::new().require("flask", "").unwrap();
    let mut context = context(flask_knowledge_base(), project, 3);
    let mut resolver = Resolver::new(latest_version_pipeline(), PredictorConfig::HillClimbing.build().unwrap())
        .with_time_limit(Some(Duration::ZERO));

    let report = resolver.resolve(&mut context).unwrap();

    assert_eq!(report.iterations, 0);
    assert!(report.is_empty());
}

#[test]
fn test_resolver_reports_pipeline_and_predictor() {
    let resolver = Resolver::new(latest_version_pipeline(), PredictorConfig::RandomWalk.build().unwrap());
    assert_eq!(resolver.predictor_name(), "random-walk");
    assert_eq!(resolver.pipeline().len(), 1);
}
