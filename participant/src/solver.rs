use ndarray::{Array1, Array2};
use protocol::FitSummary;

use crate::error::SolverErr;

/// The black-box numeric primitive behind every local fit.
///
/// Given a design matrix and a target vector it must produce the usual OLS
/// summary, a ridge coefficient vector, or diagnostic statistics for a fixed
/// coefficient vector. How it solves is its own business; this system only
/// relies on the input/output contract.
pub trait ModelSolver: Send + Sync {
    /// Ordinary least squares fit.
    ///
    /// `design` includes the intercept column; the returned vectors are
    /// intercept-first and match its width.
    ///
    /// # Errors
    /// `SolverErr::Singular` when the design matrix cannot be solved.
    fn fit_ols(&self, design: &Array2<f64>, target: &Array1<f64>) -> Result<FitSummary, SolverErr>;

    /// Ridge fit with regularization strength `lambda`, returning the raw
    /// coefficient vector only (one entry per design column).
    fn fit_ridge(
        &self,
        design: &Array2<f64>,
        target: &Array1<f64>,
        lambda: f64,
    ) -> Result<Vec<f64>, SolverErr>;

    /// Closed-form diagnostic statistics for an externally fixed coefficient
    /// vector (the averaged global weights after the last round).
    fn refit(
        &self,
        design: &Array2<f64>,
        target: &Array1<f64>,
        weights: &[f64],
    ) -> Result<FitSummary, SolverErr>;
}
