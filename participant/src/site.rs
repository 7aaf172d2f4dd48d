use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use ndarray::{Array1, Array2};
use parking_lot::Mutex;
use protocol::{
    ComputationParameters, DependentFit, Executor, GlobalModel, RegressionReply, SiteId, TaskErr,
    TaskPayload, TaskReply, TaskRequest, ValidationOutcome, WeightUpdate,
};
use serde_json::json;

use crate::{
    data::LocalData,
    design::design_matrix,
    frame::Frame,
    report::{self, ReportSink},
    solver::ModelSolver,
};

/// Cached training inputs, kept so the final round can refit diagnostics
/// against the same local data the model was trained on.
struct TrainingCache {
    design: Array2<f64>,
    target: Array1<f64>,
}

/// Participant-local model state for the iterative variant. Survives between
/// the `train_local_model` and `set_global_model` tasks of one round.
struct RidgeSession {
    weights: Vec<f64>,
    cache: Option<TrainingCache>,
}

/// One participant site.
///
/// Executes exactly one task per invocation against its private local data
/// and returns a structured result or fails explicitly. The only cross-task
/// state is the ridge session above; everything else is per-invocation.
pub struct Participant {
    id: SiteId,
    data: Arc<dyn LocalData>,
    solver: Arc<dyn ModelSolver>,
    sink: Arc<dyn ReportSink>,
    session: Mutex<Option<RidgeSession>>,
}

impl Participant {
    /// Creates a participant around its three local collaborators.
    ///
    /// # Arguments
    /// * `id` - The site's identity; aggregation is keyed by it.
    /// * `data` - Provider of the local covariate/dependent tables.
    /// * `solver` - The numeric model-fitting primitive.
    /// * `sink` - Destination for local and global report records.
    pub fn new(
        id: SiteId,
        data: Arc<dyn LocalData>,
        solver: Arc<dyn ModelSolver>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            id,
            data,
            solver,
            sink,
            session: Mutex::new(None),
        }
    }

    fn joined_frame(&self, parameters: &ComputationParameters) -> Result<Frame, TaskErr> {
        let covariates = self.data.covariates()?;
        let dependents = self.data.dependents()?;
        match &parameters.merge_key {
            Some(key) => Ok(covariates.outer_join(&dependents, key)?),
            None => Ok(covariates.zip(&dependents)?),
        }
    }

    /// Checks the declared schema against local data. Never fails: every
    /// problem, I/O included, becomes a structured invalid outcome.
    fn run_input_validation(&self, parameters: &ComputationParameters) -> ValidationOutcome {
        let covariates = match self.data.covariates() {
            Ok(frame) => frame,
            Err(e) => return ValidationOutcome::invalid(e.to_string()),
        };
        let dependents = match self.data.dependents() {
            Ok(frame) => frame,
            Err(e) => return ValidationOutcome::invalid(e.to_string()),
        };

        if let Some(key) = &parameters.merge_key {
            if !covariates.has_column(key) || !dependents.has_column(key) {
                return ValidationOutcome::invalid(format!(
                    "merge key {key} not found in both local tables"
                ));
            }
        } else if covariates.rows() != dependents.rows() {
            return ValidationOutcome::invalid(format!(
                "no merge key configured and row counts differ: {} vs {}",
                covariates.rows(),
                dependents.rows()
            ));
        }

        let mut missing: Vec<String> = parameters
            .covariates
            .iter()
            .filter(|name| !covariates.has_column(name))
            .cloned()
            .collect();
        missing.extend(
            parameters
                .dependents
                .iter()
                .filter(|name| !dependents.has_column(name))
                .cloned(),
        );

        if missing.is_empty() {
            ValidationOutcome::valid()
        } else {
            ValidationOutcome::missing(missing)
        }
    }

    fn perform_regression(
        &self,
        parameters: &ComputationParameters,
    ) -> Result<RegressionReply, TaskErr> {
        let joined = self.joined_frame(parameters)?;

        let mut fits = Vec::with_capacity(parameters.dependents.len());
        for dependent in &parameters.dependents {
            let (design, target) = design_matrix(&joined, &parameters.covariates, dependent, true)?;
            let summary = self.solver.fit_ols(&design, &target)?;
            fits.push(DependentFit {
                dependent: dependent.clone(),
                summary,
            });
        }
        let reply = RegressionReply { fits };

        self.persist_local(
            report::LOCAL_REGRESSION_OUTPUT,
            json!({
                "site_id": self.id.as_str(),
                "regression_model": {
                    "dependent_variables": parameters.dependents,
                    "independent_variables": parameters.covariates,
                },
                "fits": reply.fits,
            }),
        );

        Ok(reply)
    }

    fn train_local_model(&self, request: &TaskRequest) -> Result<WeightUpdate, TaskErr> {
        let parameters = &request.parameters;
        let lambda = parameters
            .ridge_lambda()
            .map_err(|e| TaskErr::Computation {
                detail: e.to_string(),
            })?;
        // The averaging contract is one raw weight vector per site; the
        // first declared dependent is the training target.
        let dependent = parameters
            .dependents
            .first()
            .ok_or_else(|| TaskErr::Computation {
                detail: "no dependent variables declared".to_owned(),
            })?;

        let joined = self.joined_frame(parameters)?;
        let (design, target) = design_matrix(&joined, &parameters.covariates, dependent, false)?;
        let weights = self.solver.fit_ridge(&design, &target, lambda)?;

        info!(site = self.id.as_str(), round = request.round.unwrap_or(0); "trained local ridge model");
        *self.session.lock() = Some(RidgeSession {
            weights: weights.clone(),
            cache: Some(TrainingCache { design, target }),
        });

        Ok(WeightUpdate { weights })
    }

    fn set_global_model(&self, model: GlobalModel) -> Result<TaskReply, TaskErr> {
        let mut session = self.session.lock();
        let diagnostics = match session.as_mut() {
            Some(state) => {
                state.weights = model.weights.clone();
                match (&state.cache, model.final_round) {
                    (Some(cache), true) => self.refit_diagnostics(cache, &state.weights),
                    _ => None,
                }
            }
            None => {
                warn!(site = self.id.as_str(); "global model received without a trained local model");
                *session = Some(RidgeSession {
                    weights: model.weights.clone(),
                    cache: None,
                });
                None
            }
        };
        drop(session);

        self.persist_local(
            report::GLOBAL_MODEL,
            json!({ "round": model.round, "weights": model.weights }),
        );

        Ok(TaskReply::Ack { diagnostics })
    }

    /// Diagnostic refit with the averaged weights. Strictly best-effort: a
    /// failure here must not invalidate the already-applied global model.
    fn refit_diagnostics(
        &self,
        cache: &TrainingCache,
        weights: &[f64],
    ) -> Option<protocol::FitSummary> {
        match self.solver.refit(&cache.design, &cache.target, weights) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(site = self.id.as_str(); "diagnostic refit failed: {e}");
                None
            }
        }
    }

    /// Persists the broadcast global record; failure fails the save task.
    fn persist_global<T: serde::Serialize>(&self, name: &str, record: &T) -> Result<(), TaskErr> {
        let value = serde_json::to_value(record).map_err(|e| TaskErr::Report(e.into()))?;
        self.sink.persist(name, &value).map_err(TaskErr::Report)
    }

    /// Persists a site-local record. Best-effort: a sink failure is logged,
    /// not propagated, so local bookkeeping never fails a task.
    fn persist_local(&self, name: &str, record: serde_json::Value) {
        if let Err(e) = self.sink.persist(name, &record) {
            warn!(site = self.id.as_str(), report = name; "failed to persist local report: {e}");
        }
    }
}

#[async_trait]
impl Executor for Participant {
    fn site(&self) -> &SiteId {
        &self.id
    }

    async fn execute(&self, request: TaskRequest) -> Result<TaskReply, TaskErr> {
        match request.payload {
            TaskPayload::PerformRunInputValidation => {
                let outcome = self.run_input_validation(&request.parameters);
                self.persist_local(
                    report::LOCAL_VALIDATION_REPORT,
                    serde_json::to_value(&outcome).unwrap_or(serde_json::Value::Null),
                );
                Ok(TaskReply::Validation(outcome))
            }
            TaskPayload::PerformRegression => self
                .perform_regression(&request.parameters)
                .map(TaskReply::Regression),
            TaskPayload::SaveGlobalValidationReport(report) => {
                self.persist_global(report::GLOBAL_VALIDATION_REPORT, &report)?;
                Ok(TaskReply::ack())
            }
            TaskPayload::SaveGlobalRegressionResults(report) => {
                self.persist_global(report::GLOBAL_REGRESSION_RESULTS, &report)?;
                Ok(TaskReply::ack())
            }
            TaskPayload::TrainLocalModel => {
                self.train_local_model(&request).map(TaskReply::Weights)
            }
            TaskPayload::SetGlobalModel(model) => self.set_global_model(model),
        }
    }
}
