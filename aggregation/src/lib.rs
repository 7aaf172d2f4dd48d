pub mod aggregator;
pub mod averaging;
pub mod error;
pub mod regression;
pub mod validation;

pub use aggregator::Aggregator;
pub use averaging::WeightAggregator;
pub use error::{AggregationErr, Result};
pub use regression::RegressionAggregator;
pub use validation::ValidationAggregator;
