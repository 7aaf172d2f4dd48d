pub mod error;
pub mod executor;
pub mod parameters;
pub mod report;
pub mod result;
pub mod site;
pub mod task;

pub use error::{ParametersErr, TaskErr};
pub use executor::Executor;
pub use parameters::ComputationParameters;
pub use report::{GlobalModel, PooledFit, RegressionReport, ValidationReport};
pub use result::{DependentFit, FitSummary, RegressionReply, TaskReply, ValidationOutcome, WeightUpdate};
pub use site::SiteId;
pub use task::{TaskPayload, TaskRequest};
