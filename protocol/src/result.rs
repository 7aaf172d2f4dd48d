use serde::{Deserialize, Serialize};

/// Statistics from one fitted linear model.
///
/// The coefficient, t-statistic and p-value vectors all have length
/// `1 + number_of_covariates`, with the intercept term first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub coefficients: Vec<f64>,
    pub t_statistics: Vec<f64>,
    pub p_values: Vec<f64>,
    pub r_squared: f64,
    pub degrees_of_freedom: u64,
    pub sum_squared_errors: f64,
}

/// One dependent variable's fit from a single site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentFit {
    pub dependent: String,
    #[serde(flatten)]
    pub summary: FitSummary,
}

/// A site's regression result: one `FitSummary` per declared dependent
/// variable, in the order the site fitted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReply {
    pub fits: Vec<DependentFit>,
}

impl RegressionReply {
    /// Looks up the fit for one dependent variable.
    pub fn get(&self, dependent: &str) -> Option<&FitSummary> {
        self.fits
            .iter()
            .find(|fit| fit.dependent == dependent)
            .map(|fit| &fit.summary)
    }
}

/// Structured outcome of a site's input validation.
///
/// Validation never raises: I/O failures and schema mismatches are both
/// reported through `is_valid = false` with a descriptive message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error_message: None,
            missing_columns: Vec::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.into()),
            missing_columns: Vec::new(),
        }
    }

    pub fn missing(columns: Vec<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(format!("missing columns: {}", columns.join(", "))),
            missing_columns: columns,
        }
    }
}

/// A raw weight vector submitted by one site for the current round of the
/// iterative variant. Carries no statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightUpdate {
    pub weights: Vec<f64>,
}

/// A participant's reply to one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskReply {
    Validation(ValidationOutcome),
    Regression(RegressionReply),
    Weights(WeightUpdate),
    /// Acknowledgement for persistence and apply-model tasks. After the
    /// final ridge round it may carry the diagnostic refit statistics.
    Ack {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostics: Option<FitSummary>,
    },
}

impl TaskReply {
    pub fn ack() -> Self {
        TaskReply::Ack { diagnostics: None }
    }
}
