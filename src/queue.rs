//! Max-priority queue over scored word pairs with invalidating pop.

use std::cmp::Ordering;

use crate::pairs::WordPair;

/// A word pair with its derived clustering scores, computed once per cloud
/// run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPair {
    /// The adjacent word pair.
    pub pair: WordPair,
    /// Co-occurrence probability over the selected population.
    pub probability: f64,
    /// Weighted enrichment ratio of the pair, used to break probability
    /// ties.
    pub ratio: f64,
}

impl ScoredPair {
    /// Best-first ordering: probability descending, then ratio descending,
    /// then `first`/`second` lexicographically ascending.
    #[must_use]
    pub fn priority_cmp(&self, other: &Self) -> Ordering {
        other
            .probability
            .total_cmp(&self.probability)
            .then_with(|| other.ratio.total_cmp(&self.ratio))
            .then_with(|| self.pair.first.cmp(&other.pair.first))
            .then_with(|| self.pair.second.cmp(&other.pair.second))
    }
}

/// Priority collection over all selected word pairs.
///
/// Backed by a best-first sorted `Vec`: pop must scan the remainder for
/// invalidation anyway, so a heap buys nothing at feasible input sizes.
#[derive(Debug, Clone, Default)]
pub struct ClusterQueue {
    pairs: Vec<ScoredPair>,
}

impl ClusterQueue {
    /// Builds the queue, sorting the pairs best-first.
    #[must_use]
    pub fn new(mut pairs: Vec<ScoredPair>) -> Self {
        pairs.sort_by(ScoredPair::priority_cmp);
        Self { pairs }
    }

    /// Highest-priority pair, or `None` when empty.
    #[must_use]
    pub fn peek(&self) -> Option<&ScoredPair> {
        self.pairs.first()
    }

    /// Removes and returns the highest-priority pair, also discarding every
    /// remaining pair that mentions either of its words in either position:
    /// once two words have been matched in a round, neither may be matched
    /// again via a different partner.
    pub fn pop(&mut self) -> Option<ScoredPair> {
        if self.pairs.is_empty() {
            return None;
        }
        let best = self.pairs.remove(0);
        self.pairs.retain(|candidate| {
            !candidate.pair.mentions(&best.pair.first) && !candidate.pair.mentions(&best.pair.second)
        });
        Some(best)
    }

    /// Number of pairs still eligible.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when no pairs remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
