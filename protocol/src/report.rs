use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{result::ValidationOutcome, site::SiteId};

/// Pooled statistics for one dependent variable across all contributing
/// sites. `variables` names the coefficient positions: the intercept first,
/// then the covariates in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledFit {
    pub dependent: String,
    pub variables: Vec<String>,
    pub coefficients: Vec<f64>,
    pub t_statistics: Vec<f64>,
    pub p_values: Vec<f64>,
    pub r_squared: f64,
    pub degrees_of_freedom: u64,
    pub sum_squared_errors: f64,
}

/// The combined one-shot regression result, broadcast back to every site for
/// persistence. Never mutated after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub fits: Vec<PooledFit>,
}

impl RegressionReport {
    pub fn get(&self, dependent: &str) -> Option<&PooledFit> {
        self.fits.iter().find(|fit| fit.dependent == dependent)
    }
}

/// The combined validation report: overall validity plus every site's
/// individual outcome, so operators can see which site failed and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub sites: BTreeMap<SiteId, ValidationOutcome>,
}

/// The averaged global model for one round of the iterative variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalModel {
    pub round: usize,
    pub weights: Vec<f64>,
    /// Marks the last round: sites may attach a diagnostic refit to their
    /// acknowledgement when this is set.
    pub final_round: bool,
}
