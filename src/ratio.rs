//! Enrichment ratios and their running statistics.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::counts::PopulationCounts;
use crate::error::{CloudError, Result};
use crate::pairs::WordPair;

/// Minimum, mean, and maximum of one ratio distribution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatioStats {
    /// Smallest ratio observed.
    pub min: f64,
    /// Arithmetic mean of all observed ratios.
    pub mean: f64,
    /// Largest ratio observed.
    pub max: f64,
}

/// Single-pass min/mean/max accumulator.
#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl StatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one observation in.
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    /// Finishes the pass. Returns `None` when nothing was observed.
    #[must_use]
    pub fn finish(&self) -> Option<RatioStats> {
        (self.count > 0).then(|| RatioStats {
            min: self.min,
            mean: self.sum / self.count as f64,
            max: self.max,
        })
    }
}

/// Enrichment of one word (or pair) in the selected subset relative to the
/// background population.
///
/// Computed as `(sel_count * net_total^w) / (sel_total * net_count^w)`,
/// which is algebraically `(sel_count/sel_total) / (net_count/net_total)^w`
/// without the tiny intermediate probabilities that could underflow. With
/// `w = 0` this reduces to the plain selected frequency.
#[must_use]
pub fn enrichment_ratio(
    sel_count: usize,
    sel_total: usize,
    net_count: usize,
    net_total: usize,
    weight_exponent: f64,
) -> f64 {
    (sel_count as f64 * (net_total as f64).powf(weight_exponent))
        / (sel_total as f64 * (net_count as f64).powf(weight_exponent))
}

/// Per-word and per-pair ratios with the statistics of both distributions.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentTable {
    /// Word to weighted enrichment ratio.
    pub word_ratios: FxHashMap<String, f64>,
    /// Pair to weighted enrichment ratio (queue tie-breaking).
    pub pair_ratios: FxHashMap<WordPair, f64>,
    /// Statistics of the weighted per-word ratio distribution.
    pub ratio_stats: RatioStats,
    /// Statistics of the reference (exponent 0) per-word distribution. This
    /// fixed scale is what font sizes are expressed against, so changing the
    /// weight exponent re-ranks words without destabilizing absolute sizes.
    pub weight_stats: RatioStats,
}

/// Computes all ratios for the words present in the selected counts.
///
/// One traversal accumulates the weighted distribution and the exponent-0
/// reference distribution together. Fails fast with
/// [`CloudError::EmptyPopulation`] before computing anything when either
/// population is empty.
pub fn compute_enrichment(
    selected: &PopulationCounts,
    background: &PopulationCounts,
    weight_exponent: f64,
) -> Result<EnrichmentTable> {
    let sel_total = selected.entity_total;
    let net_total = background.entity_total;
    if sel_total == 0 || net_total == 0 {
        return Err(CloudError::EmptyPopulation);
    }

    let mut table = EnrichmentTable::default();
    let mut weighted = StatsAccumulator::new();
    let mut reference = StatsAccumulator::new();

    // Word order is fixed before accumulating so the floating-point sums
    // (and therefore the published statistics) are identical across runs.
    let mut words: Vec<(&String, &usize)> = selected.words.iter().collect();
    words.sort_unstable_by_key(|(word, _)| *word);

    for (word, &sel_count) in words {
        let net_count = background.words.get(word).copied().ok_or_else(|| {
            CloudError::Internal(format!(
                "word {word:?} counted in the selection but absent from the background"
            ))
        })?;
        let ratio = enrichment_ratio(sel_count, sel_total, net_count, net_total, weight_exponent);
        weighted.push(ratio);
        reference.push(enrichment_ratio(sel_count, sel_total, net_count, net_total, 0.0));
        table.word_ratios.insert(word.clone(), ratio);
    }

    for (pair, &sel_count) in &selected.pairs {
        let net_count = background.pairs.get(pair).copied().ok_or_else(|| {
            CloudError::Internal(format!(
                "pair ({:?}, {:?}) counted in the selection but absent from the background",
                pair.first, pair.second
            ))
        })?;
        let ratio = enrichment_ratio(sel_count, sel_total, net_count, net_total, weight_exponent);
        table.pair_ratios.insert(pair.clone(), ratio);
    }

    table.ratio_stats = weighted.finish().unwrap_or_default();
    table.weight_stats = reference.finish().unwrap_or_default();
    Ok(table)
}
