use std::collections::BTreeMap;

use log::debug;
use protocol::{SiteId, ValidationOutcome, ValidationReport};

use crate::{
    aggregator::Aggregator,
    error::{AggregationErr, Result},
};

/// Pools per-site validation outcomes into a single go/no-go report.
///
/// The combined `is_valid` is true iff every site's individual outcome is
/// valid; each site's message is retained either way so a failed run leaves
/// an explanation behind.
#[derive(Debug, Default)]
pub struct ValidationAggregator {
    sites: BTreeMap<SiteId, ValidationOutcome>,
}

impl ValidationAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for ValidationAggregator {
    type Contribution = ValidationOutcome;
    type Combined = ValidationReport;

    fn accept(&mut self, site: SiteId, _round: Option<usize>, outcome: ValidationOutcome) -> bool {
        debug!(site = site.as_str(), is_valid = outcome.is_valid; "accepted validation outcome");
        self.sites.insert(site, outcome);
        true
    }

    fn aggregate(&self) -> Result<ValidationReport> {
        if self.sites.is_empty() {
            return Err(AggregationErr::EmptyAggregation);
        }

        Ok(ValidationReport {
            is_valid: self.sites.values().all(|outcome| outcome.is_valid),
            sites: self.sites.clone(),
        })
    }

    fn reset(&mut self) {
        self.sites.clear();
    }
}
