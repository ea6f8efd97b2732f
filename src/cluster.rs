//! Greedy cluster construction from the pair queue.

use std::cmp::Ordering;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::queue::ClusterQueue;

/// Display color assigned to a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Creates a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Fixed palette cycled through by cluster index.
pub const CLUSTER_PALETTE: [Rgb; 7] = [
    Rgb::new(0x17, 0x36, 0x5d),
    Rgb::new(0x36, 0x63, 0x36),
    Rgb::new(0x62, 0x1b, 0x62),
    Rgb::new(0x98, 0x4e, 0x10),
    Rgb::new(0x84, 0x0e, 0x0e),
    Rgb::new(0x0d, 0x69, 0x7a),
    Rgb::new(0x4d, 0x4d, 0x4d),
];

/// Color of the cluster at `index`, cycling through the palette.
#[must_use]
pub fn cluster_color(index: usize) -> Rgb {
    CLUSTER_PALETTE[index % CLUSTER_PALETTE.len()]
}

/// A group of words merged by the clustering passes.
///
/// Members are list-stored in merge order; aggregate statistics are
/// maintained incrementally as members arrive.
#[derive(Debug, Clone, Default)]
pub struct WordCluster {
    words: Vec<String>,
    total_sum: f64,
    sum_squares: f64,
}

impl WordCluster {
    fn singleton(word: String, font_size: i32) -> Self {
        let mut cluster = Self::default();
        cluster.push(word, font_size);
        cluster
    }

    fn push(&mut self, word: String, font_size: i32) {
        let size = f64::from(font_size);
        self.total_sum += size;
        self.sum_squares += size * size;
        self.words.push(word);
    }

    fn absorb(&mut self, other: WordCluster) {
        self.total_sum += other.total_sum;
        self.sum_squares += other.sum_squares;
        self.words.extend(other.words);
    }

    /// Member words in merge order.
    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Sum of member font sizes.
    #[must_use]
    pub fn total_sum(&self) -> f64 {
        self.total_sum
    }

    /// Number of member words.
    #[must_use]
    pub fn num_items(&self) -> usize {
        self.words.len()
    }

    /// Quadratic-mean sort key `sqrt(sum of font_size^2)`: one very large
    /// word is not outranked by a big cluster of small words.
    #[must_use]
    pub fn weighted_sum(&self) -> f64 {
        self.sum_squares.sqrt()
    }

    /// Ascending order by weighted sum; ties compare this cluster's first
    /// word against the other cluster's first word.
    #[must_use]
    pub fn order_cmp(&self, other: &Self) -> Ordering {
        self.weighted_sum()
            .total_cmp(&other.weighted_sum())
            .then_with(|| self.words.first().cmp(&other.words.first()))
    }
}

/// Greedy queue-driven cluster construction.
///
/// The builder starts in its building state: [`ClusterBuilder::run_pass`]
/// may be called repeatedly against the progressively reduced queue, and
/// [`ClusterBuilder::finish`] consumes the builder (the done state), after
/// which no further pass can run.
#[derive(Debug)]
pub struct ClusterBuilder<'a> {
    queue: ClusterQueue,
    font_sizes: &'a FxHashMap<String, i32>,
    slots: Vec<Option<WordCluster>>,
    slot_of: FxHashMap<String, usize>,
}

impl<'a> ClusterBuilder<'a> {
    /// Creates a builder over the scored pair queue.
    #[must_use]
    pub fn new(queue: ClusterQueue, font_sizes: &'a FxHashMap<String, i32>) -> Self {
        Self {
            queue,
            font_sizes,
            slots: Vec::new(),
            slot_of: FxHashMap::default(),
        }
    }

    /// Consumes the best remaining pairs while their probability stays at or
    /// above `cutoff`, merging the clusters containing the paired words.
    pub fn run_pass(&mut self, cutoff: f64) {
        while let Some(top) = self.queue.peek() {
            if top.probability < cutoff {
                break;
            }
            if let Some(best) = self.queue.pop() {
                self.merge(&best.pair.first, &best.pair.second);
            }
        }
    }

    fn font_of(&self, word: &str) -> i32 {
        self.font_sizes.get(word).copied().unwrap_or_default()
    }

    fn slot_for(&mut self, word: &str) -> usize {
        if let Some(&slot) = self.slot_of.get(word) {
            return slot;
        }
        let slot = self.slots.len();
        let font_size = self.font_of(word);
        self.slots
            .push(Some(WordCluster::singleton(word.to_string(), font_size)));
        self.slot_of.insert(word.to_string(), slot);
        slot
    }

    fn merge(&mut self, first: &str, second: &str) {
        let target = self.slot_for(first);
        let source = self.slot_for(second);
        if target == source {
            return;
        }
        if let Some(absorbed) = self.slots[source].take() {
            for word in absorbed.words() {
                self.slot_of.insert(word.clone(), target);
            }
            if let Some(cluster) = self.slots[target].as_mut() {
                cluster.absorb(absorbed);
            }
        }
    }

    /// Finishes clustering: every word never touched by a surviving pair
    /// gets its own singleton cluster, then clusters are ordered most
    /// prominent first (descending weighted sum).
    #[must_use]
    pub fn finish(mut self) -> Vec<WordCluster> {
        let mut leftover: Vec<&String> = self
            .font_sizes
            .keys()
            .filter(|word| !self.slot_of.contains_key(*word))
            .collect();
        leftover.sort_unstable();
        for word in leftover {
            let slot = self.slot_for(word);
            debug_assert!(self.slots[slot].is_some());
        }

        let mut clusters: Vec<WordCluster> = self.slots.into_iter().flatten().collect();
        clusters.sort_by(WordCluster::order_cmp);
        clusters.reverse();
        clusters
    }
}
