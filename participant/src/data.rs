use crate::{error::DataErr, frame::Frame};

/// Provider of a site's private local tables.
///
/// Loading and parsing are outside this system; whatever the backing store
/// is, the core only needs the two frames. Implementations are consulted per
/// task, so they may reload or cache as they see fit.
pub trait LocalData: Send + Sync {
    /// The covariates table.
    fn covariates(&self) -> Result<Frame, DataErr>;

    /// The dependents table.
    fn dependents(&self) -> Result<Frame, DataErr>;
}

/// Frames held in memory, handed over by an external loader.
#[derive(Debug, Clone)]
pub struct InMemoryData {
    covariates: Frame,
    dependents: Frame,
}

impl InMemoryData {
    pub fn new(covariates: Frame, dependents: Frame) -> Self {
        Self {
            covariates,
            dependents,
        }
    }
}

impl LocalData for InMemoryData {
    fn covariates(&self) -> Result<Frame, DataErr> {
        Ok(self.covariates.clone())
    }

    fn dependents(&self) -> Result<Frame, DataErr> {
        Ok(self.dependents.clone())
    }
}
