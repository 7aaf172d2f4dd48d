use std::{error::Error, fmt};

use protocol::SiteId;

/// The aggregation module's result type.
pub type Result<T> = std::result::Result<T, AggregationErr>;

/// Failures combining per-site results into a global result.
#[derive(Debug)]
pub enum AggregationErr {
    /// `aggregate` was called with zero accepted results. Always fatal to
    /// the current phase.
    EmptyAggregation,
    /// A site's result lacks a dependent variable present in the canonical
    /// list. A configuration error, never silently skipped.
    MissingDependent { site: SiteId, dependent: String },
    /// Two sites disagree on a vector length.
    LengthMismatch {
        what: &'static str,
        site: SiteId,
        got: usize,
        expected: usize,
    },
}

impl fmt::Display for AggregationErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationErr::EmptyAggregation => {
                write!(f, "no accepted results to aggregate")
            }
            AggregationErr::MissingDependent { site, dependent } => {
                write!(f, "site {site} has no result for dependent variable {dependent}")
            }
            AggregationErr::LengthMismatch {
                what,
                site,
                got,
                expected,
            } => write!(
                f,
                "{what} length mismatch at site {site}: got {got}, expected {expected}"
            ),
        }
    }
}

impl Error for AggregationErr {}
