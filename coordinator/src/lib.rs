pub mod broadcast;
pub mod controller;
pub mod error;
pub mod signal;
mod test;
pub mod workflow;

pub use broadcast::BroadcastOptions;
pub use controller::{Controller, RunOutcome};
pub use error::{CoordinatorErr, Result};
pub use signal::AbortSignal;
pub use workflow::{RidgeWorkflow, WorkflowOutcome};
