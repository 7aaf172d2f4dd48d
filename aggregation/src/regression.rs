use std::collections::HashMap;

use log::debug;
use protocol::{FitSummary, PooledFit, RegressionReply, RegressionReport, SiteId};

use crate::{
    aggregator::Aggregator,
    error::{AggregationErr, Result},
};

/// One-shot weighted statistical pooling (Strategy A).
///
/// Coefficients, t-statistics, p-values and R² are means over subjects, so
/// each site contributes weighted by its reconstructed subject count
/// `n_i = DOF_i + 1`. Degrees of freedom and SSE are extensive quantities
/// and accumulate as plain sums. That distinction is load-bearing: weighting
/// the extensive quantities (or failing to weight the intensive ones)
/// produces an incorrect pooled estimate.
#[derive(Debug, Default)]
pub struct RegressionAggregator {
    covariates: Vec<String>,
    /// Sites in first-acceptance order. The first entry defines the
    /// canonical dependent-variable list.
    order: Vec<SiteId>,
    results: HashMap<SiteId, RegressionReply>,
}

impl RegressionAggregator {
    /// Creates an aggregator for one run.
    ///
    /// # Arguments
    /// * `covariates` - The declared covariate names, used to label the
    ///   pooled coefficient positions (after the intercept).
    pub fn new(covariates: Vec<String>) -> Self {
        Self {
            covariates,
            order: Vec::new(),
            results: HashMap::new(),
        }
    }

    /// Number of distinct sites currently accepted.
    pub fn accepted(&self) -> usize {
        self.order.len()
    }

    fn pool_dependent(&self, dependent: &str, first: &FitSummary) -> Result<PooledFit> {
        let width = first.coefficients.len();

        let mut coefficients = vec![0.0; width];
        let mut t_statistics = vec![0.0; width];
        let mut p_values = vec![0.0; width];
        let mut r_squared = 0.0;
        let mut degrees_of_freedom: u64 = 0;
        let mut sum_squared_errors = 0.0;
        let mut total_subjects: u64 = 0;

        for site in &self.order {
            let reply = &self.results[site];
            let stats = reply
                .get(dependent)
                .ok_or_else(|| AggregationErr::MissingDependent {
                    site: site.clone(),
                    dependent: dependent.to_owned(),
                })?;

            check_width("coefficients", site, stats.coefficients.len(), width)?;
            check_width("t-statistics", site, stats.t_statistics.len(), width)?;
            check_width("p-values", site, stats.p_values.len(), width)?;

            // Residual DOF + 1 reconstructs the site's subject count.
            let subjects = stats.degrees_of_freedom + 1;
            let weight = subjects as f64;
            total_subjects += subjects;

            for (acc, v) in coefficients.iter_mut().zip(&stats.coefficients) {
                *acc += weight * v;
            }
            for (acc, v) in t_statistics.iter_mut().zip(&stats.t_statistics) {
                *acc += weight * v;
            }
            for (acc, v) in p_values.iter_mut().zip(&stats.p_values) {
                *acc += weight * v;
            }
            r_squared += weight * stats.r_squared;

            // Extensive quantities: plain sums, never weighted.
            degrees_of_freedom += stats.degrees_of_freedom;
            sum_squared_errors += stats.sum_squared_errors;
        }

        let total = total_subjects as f64;
        for v in coefficients
            .iter_mut()
            .chain(&mut t_statistics)
            .chain(&mut p_values)
        {
            *v /= total;
        }

        let mut variables = Vec::with_capacity(1 + self.covariates.len());
        variables.push("Intercept".to_owned());
        variables.extend(self.covariates.iter().cloned());

        Ok(PooledFit {
            dependent: dependent.to_owned(),
            variables,
            coefficients,
            t_statistics,
            p_values,
            r_squared: r_squared / total,
            degrees_of_freedom,
            sum_squared_errors,
        })
    }
}

fn check_width(what: &'static str, site: &SiteId, got: usize, expected: usize) -> Result<()> {
    if got == expected {
        Ok(())
    } else {
        Err(AggregationErr::LengthMismatch {
            what,
            site: site.clone(),
            got,
            expected,
        })
    }
}

impl Aggregator for RegressionAggregator {
    type Contribution = RegressionReply;
    type Combined = RegressionReport;

    fn accept(&mut self, site: SiteId, _round: Option<usize>, reply: RegressionReply) -> bool {
        debug!(site = site.as_str(); "accepted regression result");
        if !self.results.contains_key(&site) {
            self.order.push(site.clone());
        }
        self.results.insert(site, reply);
        true
    }

    fn aggregate(&self) -> Result<RegressionReport> {
        let first_site = self.order.first().ok_or(AggregationErr::EmptyAggregation)?;
        // The first accepted site's key set is the canonical dependent list.
        let canonical = &self.results[first_site];

        let fits = canonical
            .fits
            .iter()
            .map(|fit| self.pool_dependent(&fit.dependent, &fit.summary))
            .collect::<Result<Vec<_>>>()?;

        Ok(RegressionReport { fits })
    }

    fn reset(&mut self) {
        self.order.clear();
        self.results.clear();
    }
}
