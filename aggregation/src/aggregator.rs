use protocol::SiteId;

use crate::error::Result;

/// A stateful accumulator of per-site contributions.
///
/// An aggregator is an owned structure scoped to one coordinator run (or one
/// round of one): it is created fresh, fed through `accept`, read through
/// `aggregate` and discarded or `reset` — never shared between runs.
///
/// `accept` and `aggregate` are fast, non-blocking memory operations. The
/// caller is responsible for serializing concurrent `accept` calls; the
/// coordinator does so by consuming arriving results on a single control
/// task.
pub trait Aggregator {
    /// One site's contribution for a round.
    type Contribution;
    /// The combined global result.
    type Combined;

    /// Stores one contribution under its (site, round) key.
    ///
    /// At most one result is kept per key: a second `accept` for the same
    /// key overwrites the first. Returns `false` — without failing — when
    /// required metadata is missing, signalling "not counted" to the caller.
    fn accept(&mut self, site: SiteId, round: Option<usize>, contribution: Self::Contribution)
        -> bool;

    /// Combines all accepted contributions into one global result.
    ///
    /// # Errors
    /// `AggregationErr::EmptyAggregation` if nothing has been accepted since
    /// the aggregator (or its current round) was last reset.
    fn aggregate(&self) -> Result<Self::Combined>;

    /// Drops all accepted state, making the aggregator reusable.
    fn reset(&mut self);
}
