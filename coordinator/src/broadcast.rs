use std::{sync::Arc, time::Duration};

use log::{error, info, warn};
use protocol::{Executor, SiteId, TaskReply, TaskRequest};
use tokio::{
    task::JoinSet,
    time::{timeout_at, Instant},
};

use crate::error::{CoordinatorErr, Result};

/// Timing knobs for one broadcast step.
#[derive(Debug, Clone)]
pub struct BroadcastOptions {
    /// Minimum accepted results before the step can complete.
    pub min_responses: usize,
    /// Bounded wait for stragglers once the minimum is reached.
    pub grace_after_min: Duration,
    /// Overall bound on the whole step. Zero means no timeout: wait
    /// indefinitely for the minimum.
    pub timeout: Duration,
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self {
            min_responses: 2,
            grace_after_min: Duration::from_secs(10),
            timeout: Duration::ZERO,
        }
    }
}

/// Dispatches one task to every site concurrently and waits for quorum.
///
/// Each arriving reply is handed to `on_result`, which forwards it to the
/// appropriate aggregator and reports whether it was counted. Participant
/// failures and uncounted replies are logged and excluded; they only matter
/// if they leave the final count below `min_responses`.
///
/// Result arrival order is non-deterministic; callers rely on the
/// aggregation being commutative. `on_result` is only invoked from this
/// single control task, so accepts are naturally serialized.
///
/// # Errors
/// `CoordinatorErr::QuorumNotReached` when the timeout elapses, or every
/// site has answered, with fewer than `min_responses` accepted results. The
/// caller must treat the round as failed and never aggregate partial data.
pub(crate) async fn broadcast_and_wait<F>(
    sites: &[Arc<dyn Executor>],
    request: TaskRequest,
    options: &BroadcastOptions,
    mut on_result: F,
) -> Result<usize>
where
    F: FnMut(&SiteId, TaskReply) -> bool,
{
    let task = request.payload.name();
    info!(task = task, sites = sites.len(); "broadcasting task");

    let mut inflight = JoinSet::new();
    for site in sites {
        let site = Arc::clone(site);
        let request = request.clone();
        inflight.spawn(async move {
            let id = site.site().clone();
            let outcome = site.execute(request).await;
            (id, outcome)
        });
    }

    let hard_deadline = (!options.timeout.is_zero()).then(|| Instant::now() + options.timeout);
    let mut grace_deadline: Option<Instant> = None;
    let mut accepted = 0;

    loop {
        let deadline = match (grace_deadline, hard_deadline) {
            (Some(grace), Some(hard)) => Some(grace.min(hard)),
            (Some(grace), None) => Some(grace),
            (None, hard) => hard,
        };

        let joined = match deadline {
            Some(at) => match timeout_at(at, inflight.join_next()).await {
                Ok(joined) => joined,
                // Deadline elapsed: grace window over, or the task timed out.
                Err(_) => break,
            },
            None => inflight.join_next().await,
        };

        let Some(joined) = joined else {
            // Every site has answered.
            break;
        };

        match joined {
            Ok((site, Ok(reply))) => {
                if on_result(&site, reply) {
                    accepted += 1;
                    if accepted >= options.min_responses && grace_deadline.is_none() {
                        if inflight.is_empty() {
                            break;
                        }
                        grace_deadline = Some(Instant::now() + options.grace_after_min);
                    }
                } else {
                    warn!(task = task, site = site.as_str(); "result not counted, excluded from this round");
                }
            }
            Ok((site, Err(e))) => {
                warn!(task = task, site = site.as_str(); "participant task failed: {e}");
            }
            Err(e) => {
                warn!(task = task; "participant task join failed: {e}");
            }
        }
    }

    if accepted >= options.min_responses {
        info!(task = task, accepted = accepted; "broadcast complete");
        Ok(accepted)
    } else {
        error!(task = task, accepted = accepted, required = options.min_responses; "quorum not reached, failing the round");
        Err(CoordinatorErr::QuorumNotReached {
            task,
            accepted,
            required: options.min_responses,
        })
    }
}
