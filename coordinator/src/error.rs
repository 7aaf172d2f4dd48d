use std::{error::Error, fmt};

use aggregation::AggregationErr;
use protocol::ParametersErr;

/// The coordinator's result type.
pub type Result<T> = std::result::Result<T, CoordinatorErr>;

/// Run-terminating coordinator failures. Unlike participant-local failures
/// (which quietly become non-contribution), these must reach the operator.
#[derive(Debug)]
pub enum CoordinatorErr {
    /// The computation parameters could not be loaded or are invalid.
    /// Fatal at `Init`: the run never starts.
    Configuration(ParametersErr),
    /// A broadcast finished below the minimum participant count. The
    /// round is failed; its aggregate is never computed.
    QuorumNotReached {
        task: &'static str,
        accepted: usize,
        required: usize,
    },
    /// Combining the accepted results failed.
    Aggregation(AggregationErr),
}

impl fmt::Display for CoordinatorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorErr::Configuration(e) => write!(f, "configuration error: {e}"),
            CoordinatorErr::QuorumNotReached {
                task,
                accepted,
                required,
            } => write!(
                f,
                "quorum not reached for {task}: {accepted} of {required} required results"
            ),
            CoordinatorErr::Aggregation(e) => write!(f, "aggregation error: {e}"),
        }
    }
}

impl Error for CoordinatorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CoordinatorErr::Configuration(e) => Some(e),
            CoordinatorErr::Aggregation(e) => Some(e),
            CoordinatorErr::QuorumNotReached { .. } => None,
        }
    }
}

impl From<ParametersErr> for CoordinatorErr {
    fn from(e: ParametersErr) -> Self {
        CoordinatorErr::Configuration(e)
    }
}

impl From<AggregationErr> for CoordinatorErr {
    fn from(e: AggregationErr) -> Self {
        CoordinatorErr::Aggregation(e)
    }
}
