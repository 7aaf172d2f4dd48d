use std::collections::HashMap;

use log::{debug, warn};
use protocol::{GlobalModel, SiteId, WeightUpdate};

use crate::{
    aggregator::Aggregator,
    error::{AggregationErr, Result},
};

/// Iterative parameter averaging (Strategy B).
///
/// Stores submitted weight vectors keyed by (round, site) and combines the
/// current round's submissions as a simple unweighted elementwise mean.
/// Significance statistics are not part of this contract; a diagnostic refit
/// after the last round happens elsewhere and cannot invalidate the
/// averaged weights.
#[derive(Debug, Default)]
pub struct WeightAggregator {
    current_round: usize,
    rounds: HashMap<usize, HashMap<SiteId, Vec<f64>>>,
}

impl WeightAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points `aggregate` at a new round. Earlier rounds' submissions are
    /// retained but no longer combined.
    pub fn begin_round(&mut self, round: usize) {
        self.current_round = round;
    }

    /// Number of sites counted for the current round.
    pub fn accepted(&self) -> usize {
        self.rounds
            .get(&self.current_round)
            .map_or(0, HashMap::len)
    }
}

impl Aggregator for WeightAggregator {
    type Contribution = WeightUpdate;
    type Combined = GlobalModel;

    fn accept(&mut self, site: SiteId, round: Option<usize>, update: WeightUpdate) -> bool {
        let Some(round) = round else {
            warn!(site = site.as_str(); "weight update without round metadata, not counted");
            return false;
        };
        if update.weights.is_empty() {
            warn!(site = site.as_str(), round = round; "empty weight vector, not counted");
            return false;
        }

        debug!(site = site.as_str(), round = round; "accepted weight update");
        self.rounds.entry(round).or_default().insert(site, update.weights);
        true
    }

    fn aggregate(&self) -> Result<GlobalModel> {
        let submissions = self
            .rounds
            .get(&self.current_round)
            .filter(|seen| !seen.is_empty())
            .ok_or(AggregationErr::EmptyAggregation)?;

        let mut entries = submissions.iter();
        let (_, first) = entries.next().ok_or(AggregationErr::EmptyAggregation)?;
        let width = first.len();

        let mut mean = first.clone();
        let mut count = 1.0;
        for (site, weights) in entries {
            if weights.len() != width {
                return Err(AggregationErr::LengthMismatch {
                    what: "weights",
                    site: site.clone(),
                    got: weights.len(),
                    expected: width,
                });
            }
            for (acc, w) in mean.iter_mut().zip(weights) {
                *acc += w;
            }
            count += 1.0;
        }
        for w in &mut mean {
            *w /= count;
        }

        Ok(GlobalModel {
            round: self.current_round,
            weights: mean,
            final_round: false,
        })
    }

    fn reset(&mut self) {
        self.current_round = 0;
        self.rounds.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(weights: &[f64]) -> WeightUpdate {
        WeightUpdate {
            weights: weights.to_vec(),
        }
    }

    #[test]
    fn averages_three_sites_unweighted() {
        let mut aggregator = WeightAggregator::new();
        aggregator.begin_round(0);
        assert!(aggregator.accept("site-a".into(), Some(0), update(&[1.0, 1.0])));
        assert!(aggregator.accept("site-b".into(), Some(0), update(&[2.0, 2.0])));
        assert!(aggregator.accept("site-c".into(), Some(0), update(&[3.0, 3.0])));

        let model = aggregator.aggregate().unwrap();
        assert_eq!(model.round, 0);
        assert_eq!(model.weights, vec![2.0, 2.0]);
    }

    #[test]
    fn missing_round_metadata_is_not_counted() {
        let mut aggregator = WeightAggregator::new();
        assert!(!aggregator.accept("site-a".into(), None, update(&[1.0])));
        assert!(matches!(
            aggregator.aggregate(),
            Err(AggregationErr::EmptyAggregation)
        ));
    }

    #[test]
    fn rounds_are_isolated() {
        let mut aggregator = WeightAggregator::new();
        aggregator.accept("site-a".into(), Some(0), update(&[1.0]));
        aggregator.accept("site-a".into(), Some(1), update(&[9.0]));

        aggregator.begin_round(0);
        assert_eq!(aggregator.aggregate().unwrap().weights, vec![1.0]);

        aggregator.begin_round(1);
        assert_eq!(aggregator.aggregate().unwrap().weights, vec![9.0]);
    }

    #[test]
    fn resubmission_overwrites_within_a_round() {
        let mut aggregator = WeightAggregator::new();
        aggregator.accept("site-a".into(), Some(0), update(&[1.0]));
        aggregator.accept("site-a".into(), Some(0), update(&[5.0]));
        aggregator.accept("site-b".into(), Some(0), update(&[3.0]));

        assert_eq!(aggregator.accepted(), 2);
        assert_eq!(aggregator.aggregate().unwrap().weights, vec![4.0]);
    }

    #[test]
    fn mismatched_vector_lengths_are_fatal() {
        let mut aggregator = WeightAggregator::new();
        aggregator.accept("site-a".into(), Some(0), update(&[1.0, 2.0]));
        aggregator.accept("site-b".into(), Some(0), update(&[1.0]));

        assert!(matches!(
            aggregator.aggregate(),
            Err(AggregationErr::LengthMismatch { what: "weights", .. })
        ));
    }
}
