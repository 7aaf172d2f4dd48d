use std::{collections::BTreeMap, num::NonZeroUsize, path::Path, sync::Arc};

use aggregation::{Aggregator, WeightAggregator};
use log::{info, warn};
use protocol::{
    ComputationParameters, Executor, FitSummary, GlobalModel, SiteId, TaskPayload, TaskReply,
    TaskRequest,
};

use crate::{
    broadcast::{broadcast_and_wait, BroadcastOptions},
    error::Result,
    signal::AbortSignal,
};

/// How an iterative ridge run ended.
#[derive(Debug)]
pub enum WorkflowOutcome {
    Completed {
        /// The averaged model from the last round.
        model: GlobalModel,
        /// Per-site diagnostic refits reported after the final round.
        diagnostics: BTreeMap<SiteId, FitSummary>,
    },
    /// The abort signal stopped the run between rounds.
    Aborted,
}

/// Drives the iterative ridge regression workflow.
///
/// Each round broadcasts `train_local_model`, averages the returned weight
/// vectors, and broadcasts the averaged model back via `set_global_model`.
/// The round counter only advances once the averaged model has been
/// redistributed, so every site trains round `r + 1` from the same weights.
pub struct RidgeWorkflow {
    sites: Vec<Arc<dyn Executor>>,
    options: BroadcastOptions,
    num_rounds: NonZeroUsize,
    abort: AbortSignal,
}

impl RidgeWorkflow {
    pub fn new(
        sites: Vec<Arc<dyn Executor>>,
        options: BroadcastOptions,
        num_rounds: NonZeroUsize,
    ) -> Self {
        Self {
            sites,
            options,
            num_rounds,
            abort: AbortSignal::default(),
        }
    }

    /// A handle external code can use to stop the run between rounds.
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Loads computation parameters from a JSON file and runs.
    pub async fn run_from_path(&self, path: impl AsRef<Path>) -> Result<WorkflowOutcome> {
        let parameters = ComputationParameters::from_path(path)?;
        self.run(parameters).await
    }

    /// Runs all training rounds.
    ///
    /// # Errors
    /// `CoordinatorErr::Configuration` when the parameters are invalid or
    /// carry no usable lambda, `CoordinatorErr::QuorumNotReached` when a
    /// round ends below the configured minimum. A failed round fails the
    /// whole run; no later round trains from partial averages.
    pub async fn run(&self, parameters: ComputationParameters) -> Result<WorkflowOutcome> {
        parameters.validate()?;
        parameters.ridge_lambda()?;

        let rounds = self.num_rounds.get();
        let mut aggregator = WeightAggregator::new();
        let mut diagnostics = BTreeMap::new();
        let mut latest: Option<GlobalModel> = None;

        for round in 0..rounds {
            if self.abort.is_triggered() {
                info!(round = round; "abort requested, stopping before round");
                return Ok(WorkflowOutcome::Aborted);
            }

            info!(round = round, total = rounds; "starting training round");
            aggregator.begin_round(round);

            let train =
                TaskRequest::for_round(round, parameters.clone(), TaskPayload::TrainLocalModel);
            broadcast_and_wait(&self.sites, train, &self.options, |site, reply| {
                match reply {
                    TaskReply::Weights(update) => aggregator.accept(site.clone(), Some(round), update),
                    other => {
                        warn!(site = site.as_str(), round = round; "unexpected reply to training task: {other:?}");
                        false
                    }
                }
            })
            .await?;

            let mut model = aggregator.aggregate()?;
            model.final_round = round + 1 == rounds;
            info!(round = round, final_round = model.final_round; "broadcasting averaged model");

            let apply = TaskRequest::for_round(
                round,
                parameters.clone(),
                TaskPayload::SetGlobalModel(model.clone()),
            );
            broadcast_and_wait(&self.sites, apply, &self.options, |site, reply| {
                if let TaskReply::Ack {
                    diagnostics: Some(summary),
                } = reply
                {
                    diagnostics.insert(site.clone(), summary);
                }
                true
            })
            .await?;

            latest = Some(model);
        }

        match latest {
            Some(model) => {
                info!(rounds = rounds, diagnostics = diagnostics.len(); "ridge workflow complete");
                Ok(WorkflowOutcome::Completed { model, diagnostics })
            }
            None => Ok(WorkflowOutcome::Aborted),
        }
    }
}
