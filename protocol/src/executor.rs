use async_trait::async_trait;

use crate::{error::TaskErr, result::TaskReply, site::SiteId, task::TaskRequest};

/// The request/response seam between the coordinator and one participant.
///
/// Delivery is assumed reliable — transport design is outside this system,
/// so an implementation may be an in-process participant, a test double, or
/// a proxy speaking to a remote site. Whatever it is, the coordinator only
/// sees "one task in, one reply (or local failure) out".
#[async_trait]
pub trait Executor: Send + Sync {
    /// The identity of the site behind this endpoint.
    fn site(&self) -> &SiteId;

    /// Executes exactly one task and returns its result.
    ///
    /// # Errors
    /// A `TaskErr` means the task failed at this participant only; the
    /// coordinator excludes the site from the current round's aggregation
    /// and moves on.
    async fn execute(&self, request: TaskRequest) -> Result<TaskReply, TaskErr>;
}
