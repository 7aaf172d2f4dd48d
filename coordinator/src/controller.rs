use std::{path::Path, sync::Arc};

use aggregation::{Aggregator, RegressionAggregator, ValidationAggregator};
use log::{info, warn};
use protocol::{
    ComputationParameters, Executor, RegressionReport, TaskPayload, TaskReply, TaskRequest,
    ValidationReport,
};

use crate::{
    broadcast::{broadcast_and_wait, BroadcastOptions},
    error::Result,
    signal::AbortSignal,
};

/// How a one-shot regression run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The pooled result, already broadcast to every site for persistence.
    Completed(RegressionReport),
    /// Input validation failed at one or more sites. The validation report
    /// was persisted everywhere and the run shut down without computing.
    Rejected(ValidationReport),
    /// The abort signal stopped the run between phases.
    Aborted,
}

/// Drives the one-shot pooled regression across all registered sites.
///
/// The run is a fixed sequence of broadcast steps: validate inputs, compute
/// local fits, pool them, persist the pooled result everywhere. Each step
/// must reach quorum before the next starts.
pub struct Controller {
    sites: Vec<Arc<dyn Executor>>,
    options: BroadcastOptions,
    validate_inputs: bool,
    abort: AbortSignal,
}

impl Controller {
    pub fn new(sites: Vec<Arc<dyn Executor>>, options: BroadcastOptions) -> Self {
        Self {
            sites,
            options,
            validate_inputs: true,
            abort: AbortSignal::default(),
        }
    }

    /// Skips the input validation phase.
    pub fn without_validation(mut self) -> Self {
        self.validate_inputs = false;
        self
    }

    /// A handle external code can use to stop the run between phases.
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Loads computation parameters from a JSON file and runs.
    ///
    /// # Errors
    /// `CoordinatorErr::Configuration` when the file is unreadable or the
    /// parameters are invalid, plus everything [`Controller::run`] returns.
    pub async fn run_from_path(&self, path: impl AsRef<Path>) -> Result<RunOutcome> {
        let parameters = ComputationParameters::from_path(path)?;
        self.run(parameters).await
    }

    /// Runs the full one-shot workflow.
    ///
    /// # Errors
    /// `CoordinatorErr::QuorumNotReached` when any phase ends with fewer
    /// accepted results than the configured minimum. Partial results are
    /// never pooled.
    pub async fn run(&self, parameters: ComputationParameters) -> Result<RunOutcome> {
        parameters.validate()?;

        if self.abort.is_triggered() {
            return Ok(RunOutcome::Aborted);
        }

        if self.validate_inputs {
            let report = self.validation_phase(&parameters).await?;
            if !report.is_valid {
                info!("input validation failed, shutting down without computing");
                return Ok(RunOutcome::Rejected(report));
            }
        }

        if self.abort.is_triggered() {
            return Ok(RunOutcome::Aborted);
        }

        let report = self.regression_phase(&parameters).await?;

        if self.abort.is_triggered() {
            return Ok(RunOutcome::Aborted);
        }

        let save = TaskRequest::one_shot(
            parameters,
            TaskPayload::SaveGlobalRegressionResults(report.clone()),
        );
        broadcast_and_wait(&self.sites, save, &self.options, |_, _| true).await?;

        info!("regression run complete");
        Ok(RunOutcome::Completed(report))
    }

    /// Collects per-site validation verdicts and persists the pooled report.
    ///
    /// The report is persisted whether the verdict is positive or not, so
    /// operators at every site can see why a run was rejected.
    async fn validation_phase(&self, parameters: &ComputationParameters) -> Result<ValidationReport> {
        let mut aggregator = ValidationAggregator::new();
        let request =
            TaskRequest::one_shot(parameters.clone(), TaskPayload::PerformRunInputValidation);
        broadcast_and_wait(&self.sites, request, &self.options, |site, reply| {
            match reply {
                TaskReply::Validation(outcome) => aggregator.accept(site.clone(), None, outcome),
                other => {
                    warn!(site = site.as_str(); "unexpected reply to validation task: {other:?}");
                    false
                }
            }
        })
        .await?;
        let report = aggregator.aggregate()?;

        let save = TaskRequest::one_shot(
            parameters.clone(),
            TaskPayload::SaveGlobalValidationReport(report.clone()),
        );
        broadcast_and_wait(&self.sites, save, &self.options, |_, _| true).await?;
        Ok(report)
    }

    async fn regression_phase(&self, parameters: &ComputationParameters) -> Result<RegressionReport> {
        let mut aggregator = RegressionAggregator::new(parameters.covariates.clone());
        let request = TaskRequest::one_shot(parameters.clone(), TaskPayload::PerformRegression);
        broadcast_and_wait(&self.sites, request, &self.options, |site, reply| {
            match reply {
                TaskReply::Regression(results) => aggregator.accept(site.clone(), None, results),
                other => {
                    warn!(site = site.as_str(); "unexpected reply to regression task: {other:?}");
                    false
                }
            }
        })
        .await?;
        Ok(aggregator.aggregate()?)
    }
}
