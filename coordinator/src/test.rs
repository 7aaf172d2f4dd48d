#![cfg(test)]

use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use async_trait::async_trait;
use ndarray::{Array1, Array2};
use parking_lot::Mutex;
use protocol::{
    ComputationParameters, DependentFit, Executor, FitSummary, GlobalModel, RegressionReply,
    SiteId, TaskErr, TaskPayload, TaskReply, TaskRequest, ValidationOutcome, WeightUpdate,
};

use crate::{
    broadcast::BroadcastOptions,
    controller::{Controller, RunOutcome},
    error::CoordinatorErr,
    workflow::{RidgeWorkflow, WorkflowOutcome},
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Shared per-test record of which tasks reached which site, in order.
type TaskLog = Arc<Mutex<Vec<(String, &'static str)>>>;

enum Behavior {
    /// Answer every task normally, fitting with this canned summary.
    Regression(FitSummary),
    /// Report invalid local data during the validation phase.
    InvalidData(&'static str),
    /// Submit this weight vector for every training round.
    Weights(Vec<f64>),
    /// Fail every task.
    Broken,
}

struct ScriptedSite {
    id: SiteId,
    behavior: Behavior,
    delay: Duration,
    log: TaskLog,
    applied: Mutex<Vec<GlobalModel>>,
}

impl ScriptedSite {
    fn new(id: &str, behavior: Behavior, log: TaskLog) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            behavior,
            delay: Duration::ZERO,
            log,
            applied: Mutex::new(Vec::new()),
        })
    }

    fn slow(id: &str, behavior: Behavior, delay: Duration, log: TaskLog) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            behavior,
            delay,
            log,
            applied: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Executor for ScriptedSite {
    fn site(&self) -> &SiteId {
        &self.id
    }

    async fn execute(&self, request: TaskRequest) -> Result<TaskReply, TaskErr> {
        self.log
            .lock()
            .push((self.id.as_str().to_owned(), request.payload.name()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Behavior::Broken = self.behavior {
            return Err(TaskErr::Computation {
                detail: "scripted failure".to_owned(),
            });
        }

        match request.payload {
            TaskPayload::PerformRunInputValidation => {
                let outcome = match &self.behavior {
                    Behavior::InvalidData(message) => ValidationOutcome::invalid(*message),
                    _ => ValidationOutcome::valid(),
                };
                Ok(TaskReply::Validation(outcome))
            }
            TaskPayload::PerformRegression => match &self.behavior {
                Behavior::Regression(summary) => Ok(TaskReply::Regression(RegressionReply {
                    fits: vec![DependentFit {
                        dependent: "bmi".to_owned(),
                        summary: summary.clone(),
                    }],
                })),
                _ => Err(TaskErr::Computation {
                    detail: "no regression scripted".to_owned(),
                }),
            },
            TaskPayload::TrainLocalModel => match &self.behavior {
                Behavior::Weights(weights) => Ok(TaskReply::Weights(WeightUpdate {
                    weights: weights.clone(),
                })),
                _ => Err(TaskErr::Computation {
                    detail: "no training scripted".to_owned(),
                }),
            },
            TaskPayload::SetGlobalModel(model) => {
                self.applied.lock().push(model);
                Ok(TaskReply::ack())
            }
            TaskPayload::SaveGlobalValidationReport(_)
            | TaskPayload::SaveGlobalRegressionResults(_) => Ok(TaskReply::ack()),
        }
    }
}

fn summary(coefficients: Vec<f64>, dof: u64, sse: f64, r_squared: f64) -> FitSummary {
    let width = coefficients.len();
    FitSummary {
        coefficients,
        t_statistics: vec![0.5; width],
        p_values: vec![0.05; width],
        r_squared,
        degrees_of_freedom: dof,
        sum_squared_errors: sse,
    }
}

fn parameters() -> ComputationParameters {
    ComputationParameters {
        dependents: vec!["bmi".to_owned()],
        covariates: vec!["age".to_owned()],
        merge_key: Some("subject_id".to_owned()),
        lambda: Some(0.5),
    }
}

fn options(min: usize) -> BroadcastOptions {
    BroadcastOptions {
        min_responses: min,
        grace_after_min: Duration::from_secs(1),
        timeout: Duration::ZERO,
    }
}

fn tasks_seen(log: &TaskLog, site: &str) -> Vec<&'static str> {
    log.lock()
        .iter()
        .filter(|(s, _)| s == site)
        .map(|(_, task)| *task)
        .collect()
}

#[tokio::test]
async fn one_shot_run_pools_weighted_by_subject_count() {
    init_logging();
    let log = TaskLog::default();
    let sites: Vec<Arc<dyn Executor>> = vec![
        ScriptedSite::new(
            "site-a",
            Behavior::Regression(summary(vec![1.0, 2.0], 8, 4.0, 0.8)),
            log.clone(),
        ),
        ScriptedSite::new(
            "site-b",
            Behavior::Regression(summary(vec![3.0, 4.0], 18, 6.0, 0.6)),
            log.clone(),
        ),
    ];

    let controller = Controller::new(sites, options(2));
    let outcome = controller.run(parameters()).await.unwrap();

    let RunOutcome::Completed(report) = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    let pooled = report.get("bmi").unwrap();
    // Subject counts 9 and 19 reconstructed from the residual DOF.
    assert!((pooled.coefficients[0] - 66.0 / 28.0).abs() < 1e-9);
    assert!((pooled.coefficients[1] - 94.0 / 28.0).abs() < 1e-9);
    assert_eq!(pooled.degrees_of_freedom, 26);
    assert!((pooled.sum_squared_errors - 10.0).abs() < 1e-12);

    // Both sites were asked to persist the pooled result.
    for site in ["site-a", "site-b"] {
        assert!(tasks_seen(&log, site).contains(&"save_global_regression_results"));
    }
}

#[tokio::test]
async fn validation_failure_rejects_without_computing() {
    init_logging();
    let log = TaskLog::default();
    let sites: Vec<Arc<dyn Executor>> = vec![
        ScriptedSite::new(
            "site-a",
            Behavior::Regression(summary(vec![1.0, 2.0], 8, 4.0, 0.8)),
            log.clone(),
        ),
        ScriptedSite::new(
            "site-b",
            Behavior::InvalidData("merge key subject_id not found in both local tables"),
            log.clone(),
        ),
    ];

    let controller = Controller::new(sites, options(2));
    let outcome = controller.run(parameters()).await.unwrap();

    let RunOutcome::Rejected(report) = outcome else {
        panic!("expected a rejected run, got {outcome:?}");
    };
    assert!(!report.is_valid);
    assert_eq!(report.sites.len(), 2);
    assert!(report.sites[&SiteId::from("site-a")].is_valid);
    assert!(!report.sites[&SiteId::from("site-b")].is_valid);

    // The verdict was persisted everywhere, and computation never started.
    for site in ["site-a", "site-b"] {
        let seen = tasks_seen(&log, site);
        assert!(seen.contains(&"save_global_validation_report"));
        assert!(!seen.contains(&"perform_regression"));
        assert!(!seen.contains(&"save_global_regression_results"));
    }
}

#[tokio::test]
async fn quorum_failure_is_fatal_and_nothing_is_pooled() {
    init_logging();
    let log = TaskLog::default();
    let sites: Vec<Arc<dyn Executor>> = vec![
        ScriptedSite::new(
            "site-a",
            Behavior::Regression(summary(vec![1.0, 2.0], 8, 4.0, 0.8)),
            log.clone(),
        ),
        ScriptedSite::new("site-b", Behavior::Broken, log.clone()),
    ];

    let controller = Controller::new(sites, options(2)).without_validation();
    let err = controller.run(parameters()).await.unwrap_err();

    assert!(matches!(
        err,
        CoordinatorErr::QuorumNotReached {
            task: "perform_regression",
            accepted: 1,
            required: 2,
        }
    ));
    assert!(!tasks_seen(&log, "site-a").contains(&"save_global_regression_results"));
}

#[tokio::test]
async fn task_timeout_bounds_the_wait() {
    init_logging();
    let log = TaskLog::default();
    let sites: Vec<Arc<dyn Executor>> = vec![
        ScriptedSite::new(
            "site-a",
            Behavior::Regression(summary(vec![1.0, 2.0], 8, 4.0, 0.8)),
            log.clone(),
        ),
        ScriptedSite::slow(
            "site-b",
            Behavior::Regression(summary(vec![3.0, 4.0], 18, 6.0, 0.6)),
            Duration::from_secs(30),
            log.clone(),
        ),
    ];

    let timeouts = BroadcastOptions {
        min_responses: 2,
        grace_after_min: Duration::from_secs(1),
        timeout: Duration::from_millis(50),
    };
    let controller = Controller::new(sites, timeouts).without_validation();
    let err = controller.run(parameters()).await.unwrap_err();

    assert!(matches!(
        err,
        CoordinatorErr::QuorumNotReached {
            accepted: 1,
            required: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn straggler_within_grace_is_counted() {
    init_logging();
    let log = TaskLog::default();
    let sites: Vec<Arc<dyn Executor>> = vec![
        ScriptedSite::new(
            "site-a",
            Behavior::Regression(summary(vec![1.0, 2.0], 8, 4.0, 0.8)),
            log.clone(),
        ),
        ScriptedSite::new(
            "site-b",
            Behavior::Regression(summary(vec![3.0, 4.0], 18, 6.0, 0.6)),
            log.clone(),
        ),
        ScriptedSite::slow(
            "site-c",
            Behavior::Regression(summary(vec![5.0, 6.0], 3, 1.0, 0.9)),
            Duration::from_millis(20),
            log.clone(),
        ),
    ];

    let controller = Controller::new(sites, options(2)).without_validation();
    let outcome = controller.run(parameters()).await.unwrap();

    let RunOutcome::Completed(report) = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    // DOF only sums to 29 if the late third site made it into the pool.
    assert_eq!(report.get("bmi").unwrap().degrees_of_freedom, 29);
}

#[tokio::test]
async fn ridge_rounds_average_and_redistribute() {
    init_logging();
    let log = TaskLog::default();
    let a = ScriptedSite::new("site-a", Behavior::Weights(vec![1.0, 1.0]), log.clone());
    let b = ScriptedSite::new("site-b", Behavior::Weights(vec![2.0, 2.0]), log.clone());
    let c = ScriptedSite::new("site-c", Behavior::Weights(vec![3.0, 3.0]), log.clone());
    let sites: Vec<Arc<dyn Executor>> = vec![a.clone(), b.clone(), c.clone()];

    let rounds = NonZeroUsize::new(2).unwrap();
    let workflow = RidgeWorkflow::new(sites, options(2), rounds);
    let outcome = workflow.run(parameters()).await.unwrap();

    let WorkflowOutcome::Completed { model, diagnostics } = outcome else {
        panic!("expected a completed workflow, got {outcome:?}");
    };
    assert_eq!(model.round, 1);
    assert!(model.final_round);
    assert_eq!(model.weights, vec![2.0, 2.0]);
    assert!(diagnostics.is_empty());

    for site in [&a, &b, &c] {
        // Each round's averaged model reached the site before the next
        // round trained, and only the last one was flagged final.
        let applied = site.applied.lock();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].round, 0);
        assert!(!applied[0].final_round);
        assert_eq!(applied[1].round, 1);
        assert!(applied[1].final_round);

        let seen = tasks_seen(&log, site.id.as_str());
        assert_eq!(
            seen,
            vec![
                "train_local_model",
                "set_global_model",
                "train_local_model",
                "set_global_model",
            ]
        );
    }
}

#[tokio::test]
async fn ridge_requires_a_usable_lambda() {
    init_logging();
    let log = TaskLog::default();
    let sites: Vec<Arc<dyn Executor>> = vec![
        ScriptedSite::new("site-a", Behavior::Weights(vec![1.0]), log.clone()),
        ScriptedSite::new("site-b", Behavior::Weights(vec![2.0]), log.clone()),
    ];

    let mut bad = parameters();
    bad.lambda = None;
    let workflow = RidgeWorkflow::new(sites, options(2), NonZeroUsize::new(3).unwrap());
    let err = workflow.run(bad).await.unwrap_err();

    assert!(matches!(err, CoordinatorErr::Configuration(_)));
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn abort_signal_stops_the_run_before_any_task() {
    init_logging();
    let log = TaskLog::default();
    let sites: Vec<Arc<dyn Executor>> = vec![
        ScriptedSite::new(
            "site-a",
            Behavior::Regression(summary(vec![1.0, 2.0], 8, 4.0, 0.8)),
            log.clone(),
        ),
        ScriptedSite::new(
            "site-b",
            Behavior::Regression(summary(vec![3.0, 4.0], 18, 6.0, 0.6)),
            log.clone(),
        ),
    ];

    let controller = Controller::new(sites, options(2));
    controller.abort_signal().trigger();

    assert!(matches!(
        controller.run(parameters()).await.unwrap(),
        RunOutcome::Aborted
    ));
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn abort_signal_stops_the_workflow_between_rounds() {
    init_logging();
    let log = TaskLog::default();
    let sites: Vec<Arc<dyn Executor>> = vec![
        ScriptedSite::new("site-a", Behavior::Weights(vec![1.0]), log.clone()),
        ScriptedSite::new("site-b", Behavior::Weights(vec![3.0]), log.clone()),
    ];

    let workflow = RidgeWorkflow::new(sites, options(2), NonZeroUsize::new(5).unwrap());
    workflow.abort_signal().trigger();

    assert!(matches!(
        workflow.run(parameters()).await.unwrap(),
        WorkflowOutcome::Aborted
    ));
    assert!(log.lock().is_empty());
}

/// End-to-end paths through real participants, with only the numeric solver
/// stubbed out.
mod full_stack {
    use participant::{Cell, Frame, InMemoryData, ModelSolver, NullSink, Participant, SolverErr};

    use super::*;

    struct FixedSolver(FitSummary);

    impl ModelSolver for FixedSolver {
        fn fit_ols(
            &self,
            _design: &Array2<f64>,
            _target: &Array1<f64>,
        ) -> Result<FitSummary, SolverErr> {
            Ok(self.0.clone())
        }

        fn fit_ridge(
            &self,
            _design: &Array2<f64>,
            _target: &Array1<f64>,
            _lambda: f64,
        ) -> Result<Vec<f64>, SolverErr> {
            Ok(self.0.coefficients.clone())
        }

        fn refit(
            &self,
            _design: &Array2<f64>,
            _target: &Array1<f64>,
            _weights: &[f64],
        ) -> Result<FitSummary, SolverErr> {
            Ok(self.0.clone())
        }
    }

    fn site(id: &str, fit: FitSummary) -> Arc<dyn Executor> {
        let covariates = Frame::new()
            .with_column(
                "subject_id",
                vec!["s1".into(), "s2".into(), "s3".into()],
            )
            .with_column("age", vec![30.0.into(), 40.0.into(), 50.0.into()]);
        let dependents = Frame::new()
            .with_column(
                "subject_id",
                vec!["s1".into(), "s2".into(), "s3".into()],
            )
            .with_column(
                "bmi",
                vec![Cell::from(21.0), Cell::from(24.0), Cell::from(27.0)],
            );

        Arc::new(Participant::new(
            id.into(),
            Arc::new(InMemoryData::new(covariates, dependents)),
            Arc::new(FixedSolver(fit)),
            Arc::new(NullSink),
        ))
    }

    #[tokio::test]
    async fn one_shot_run_through_real_participants() {
        init_logging();
        let sites = vec![
            site("site-a", summary(vec![1.0, 2.0], 8, 4.0, 0.8)),
            site("site-b", summary(vec![3.0, 4.0], 18, 6.0, 0.6)),
        ];

        let controller = Controller::new(sites, options(2));
        let outcome = controller.run(parameters()).await.unwrap();

        let RunOutcome::Completed(report) = outcome else {
            panic!("expected a completed run, got {outcome:?}");
        };
        let pooled = report.get("bmi").unwrap();
        assert!((pooled.coefficients[0] - 66.0 / 28.0).abs() < 1e-9);
        assert!((pooled.coefficients[1] - 94.0 / 28.0).abs() < 1e-9);
        assert_eq!(pooled.variables, vec!["Intercept", "age"]);
    }

    #[tokio::test]
    async fn ridge_run_collects_final_round_diagnostics() {
        init_logging();
        let sites = vec![
            site("site-a", summary(vec![1.0, 2.0], 8, 4.0, 0.8)),
            site("site-b", summary(vec![3.0, 4.0], 18, 6.0, 0.6)),
        ];

        let workflow = RidgeWorkflow::new(sites, options(2), NonZeroUsize::new(2).unwrap());
        let outcome = workflow.run(parameters()).await.unwrap();

        let WorkflowOutcome::Completed { model, diagnostics } = outcome else {
            panic!("expected a completed workflow, got {outcome:?}");
        };
        assert_eq!(model.weights, vec![2.0, 3.0]);
        assert!(model.final_round);
        // Diagnostics only appear after the final round, one per site.
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics[&SiteId::from("site-a")].coefficients,
            vec![1.0, 2.0]
        );
    }
}
