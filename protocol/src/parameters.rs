use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ParametersErr;

/// Shared computation parameters, read once at `LoadParameters` and held
/// immutable for the lifetime of a run.
///
/// The JSON keys match the parameter file contract: `Dependents`,
/// `Covariates`, an optional `Merge_Key` and, for the ridge variant, a
/// positive `Lambda`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationParameters {
    #[serde(rename = "Dependents")]
    pub dependents: Vec<String>,
    #[serde(rename = "Covariates")]
    pub covariates: Vec<String>,
    #[serde(rename = "Merge_Key", default, skip_serializing_if = "Option::is_none")]
    pub merge_key: Option<String>,
    #[serde(rename = "Lambda", default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
}

impl ComputationParameters {
    /// Loads and validates parameters from a JSON file.
    ///
    /// # Errors
    /// Returns a `ParametersErr` if the file cannot be read, a required key
    /// is missing or malformed, or a declared name set is empty. All of
    /// these are fatal: the run must not start.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ParametersErr> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parses and validates parameters from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, ParametersErr> {
        let parameters: Self = serde_json::from_str(raw)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Checks the structural invariants that hold for every variant:
    /// non-empty dependent and covariate name sets.
    pub fn validate(&self) -> Result<(), ParametersErr> {
        if self.dependents.is_empty() {
            return Err(ParametersErr::EmptyDependents);
        }
        if self.covariates.is_empty() {
            return Err(ParametersErr::EmptyCovariates);
        }
        Ok(())
    }

    /// The regularization strength for the ridge variant.
    ///
    /// # Errors
    /// Returns an error if `Lambda` is absent or not positive.
    pub fn ridge_lambda(&self) -> Result<f64, ParametersErr> {
        match self.lambda {
            None => Err(ParametersErr::MissingLambda),
            Some(l) if l <= 0.0 => Err(ParametersErr::NonPositiveLambda(l)),
            Some(l) => Ok(l),
        }
    }
}
