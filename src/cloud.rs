//! The cloud engine: staged computation, assembly, and result caching.
//!
//! A computation advances through immutable snapshots
//! ([`CountsSnapshot`] -> [`RatioSnapshot`] -> [`ClusterSnapshot`]) rather
//! than mutating shared state, so a previously published result stays
//! readable while a replacement computes. [`CloudEngine::compute`] runs the
//! whole pipeline; [`CloudCache`] memoizes finished results per
//! configuration identity.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::cluster::{cluster_color, ClusterBuilder, Rgb};
use crate::config::{CloudConfig, DisplayStyle};
use crate::corpus::{AttributeSource, EntityId};
use crate::counts::{count_population, PopulationCounts};
use crate::error::{CloudError, Result};
use crate::filter::WordFilter;
use crate::fontsize::FontMapper;
use crate::pairs::pair_probability;
use crate::queue::{ClusterQueue, ScoredPair};
use crate::ratio::{compute_enrichment, EnrichmentTable, RatioStats};
use crate::serialization::{to_record, NamedCloud};
use crate::tokenize::Tokenizer;

/// One word of the finished cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudWordInfo {
    /// The normalized word.
    pub word: String,
    /// Bounded integer font size.
    pub font_size: i32,
    /// Cluster index; 0 is the most prominent cluster, and the only index
    /// used when clustering is suppressed.
    pub cluster: usize,
    /// Stable word number across all clusters, used for tie-breaking and
    /// rendering order.
    pub ordinal: usize,
    /// Cluster color; absent when clustering is suppressed.
    pub color: Option<Rgb>,
}

/// Word and pair counts of both populations.
#[derive(Debug, Clone)]
pub struct CountsSnapshot {
    /// Counts over the background population, including the word->entity
    /// index.
    pub background: PopulationCounts,
    /// Counts over the selected subset.
    pub selected: PopulationCounts,
    /// Configured attributes with no matching column on the store.
    pub missing_attributes: Vec<String>,
}

/// Enrichment ratios, their statistics, and the derived font sizes.
#[derive(Debug, Clone)]
pub struct RatioSnapshot {
    /// Ratios and distribution statistics.
    pub enrichment: EnrichmentTable,
    /// Word to mapped font size.
    pub font_sizes: FxHashMap<String, i32>,
}

/// Cluster-ordered word list before assembly limits are applied.
#[derive(Debug, Clone)]
pub struct ClusterSnapshot {
    /// Every selected word with its cluster index, ordinal, and color.
    pub words: Vec<CloudWordInfo>,
    /// Number of clusters formed.
    pub cluster_count: usize,
}

/// Finished, published cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudResult {
    /// Ranked and grouped words after assembly limits.
    pub words: Vec<CloudWordInfo>,
    /// Statistics of the weighted ratio distribution.
    pub ratio_stats: RatioStats,
    /// Statistics of the reference (exponent 0) distribution.
    pub weight_stats: RatioStats,
    /// Word to sorted containing background entities, for
    /// click-to-select highlighting.
    pub entity_index: FxHashMap<String, Vec<EntityId>>,
    /// Configured attributes with no matching column on the store.
    pub missing_attributes: Vec<String>,
    /// Selected population size.
    pub selected_total: usize,
    /// Background population size.
    pub background_total: usize,
}

/// Drives one cloud computation over an immutable view of its inputs.
///
/// The engine holds references to the configuration, filter, and source; it
/// stores no back-pointers in produced results, so results outlive the
/// engine freely.
#[derive(Debug)]
pub struct CloudEngine<'a, S> {
    source: &'a S,
    selected: Vec<EntityId>,
    config: &'a CloudConfig,
    filter: &'a WordFilter,
    tokenizer: Tokenizer,
}

impl<'a, S: AttributeSource + Sync> CloudEngine<'a, S> {
    /// Creates an engine after validating the configuration and compiling
    /// the delimiter pattern. The selected set is sorted and deduplicated.
    pub fn new(
        source: &'a S,
        selected: &[EntityId],
        config: &'a CloudConfig,
        filter: &'a WordFilter,
    ) -> Result<Self> {
        config.validate()?;
        let tokenizer = Tokenizer::new(&config.delimiters, config.stemming)?;
        let mut selected = selected.to_vec();
        selected.sort_unstable();
        selected.dedup();
        Ok(Self {
            source,
            selected,
            config,
            filter,
            tokenizer,
        })
    }

    /// Identity of this computation: the configuration record plus the
    /// selected entity set.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let mut key = to_record(&NamedCloud {
            name: String::new(),
            config: self.config.clone(),
        });
        key.push_str("selection\t");
        for (position, id) in self.selected.iter().enumerate() {
            if position > 0 {
                key.push(',');
            }
            key.push_str(&id.to_string());
        }
        key.push('\n');
        key
    }

    /// Counts both populations with two independent passes.
    pub fn count(&self) -> Result<CountsSnapshot> {
        let background_entities = self.source.entities();
        let known: FxHashSet<EntityId> = background_entities.iter().copied().collect();
        if let Some(stray) = self.selected.iter().find(|id| !known.contains(id)) {
            return Err(CloudError::InvalidConfig(format!(
                "selected entity {stray} is not part of the background population"
            )));
        }

        let available: FxHashSet<String> = self.source.attribute_names().into_iter().collect();
        let mut attributes = Vec::new();
        let mut missing_attributes = Vec::new();
        for name in &self.config.attribute_names {
            if available.contains(name) {
                attributes.push(name.clone());
            } else {
                warn!(
                    "{}",
                    CloudError::MissingAttribute {
                        attribute: name.clone()
                    }
                );
                missing_attributes.push(name.clone());
            }
        }

        let background = count_population(
            self.source,
            &background_entities,
            &attributes,
            &self.tokenizer,
            self.filter,
            true,
        );
        let selected = count_population(
            self.source,
            &self.selected,
            &attributes,
            &self.tokenizer,
            self.filter,
            false,
        );
        debug!(
            "counted {} background and {} selected entities: {} distinct selected words",
            background.entity_total,
            selected.entity_total,
            selected.words.len()
        );
        Ok(CountsSnapshot {
            background,
            selected,
            missing_attributes,
        })
    }

    /// Computes enrichment ratios, their statistics, and font sizes.
    pub fn ratios(&self, counts: &CountsSnapshot) -> Result<RatioSnapshot> {
        let enrichment = compute_enrichment(
            &counts.selected,
            &counts.background,
            self.config.weight_exponent,
        )?;
        let mapper = FontMapper::new(&enrichment.ratio_stats, &enrichment.weight_stats);
        if mapper.degenerate() && !enrichment.word_ratios.is_empty() {
            debug!("ratio distribution is degenerate; flattening font sizes");
        }
        let font_sizes = enrichment
            .word_ratios
            .iter()
            .map(|(word, &ratio)| (word.clone(), mapper.font_size(ratio)))
            .collect();
        Ok(RatioSnapshot {
            enrichment,
            font_sizes,
        })
    }

    fn score_pairs(
        &self,
        counts: &CountsSnapshot,
        ratios: &RatioSnapshot,
    ) -> Result<Vec<ScoredPair>> {
        let total = counts.selected.total_word_occurrences();
        let mut scored = Vec::with_capacity(counts.selected.pairs.len());
        for (pair, &pair_count) in &counts.selected.pairs {
            let first = counts
                .selected
                .words
                .get(&pair.first)
                .copied()
                .ok_or_else(|| CloudError::UnresolvedPair(pair.clone()))?;
            let second = counts
                .selected
                .words
                .get(&pair.second)
                .copied()
                .ok_or_else(|| CloudError::UnresolvedPair(pair.clone()))?;
            let ratio = ratios
                .enrichment
                .pair_ratios
                .get(pair)
                .copied()
                .ok_or_else(|| CloudError::UnresolvedPair(pair.clone()))?;
            scored.push(ScoredPair {
                pair: pair.clone(),
                probability: pair_probability(pair_count, total, first, second),
                ratio,
            });
        }
        Ok(scored)
    }

    /// Runs the clustering passes and emits the cluster-ordered word list.
    pub fn cluster(
        &self,
        counts: &CountsSnapshot,
        ratios: &RatioSnapshot,
    ) -> Result<ClusterSnapshot> {
        let queue = ClusterQueue::new(self.score_pairs(counts, ratios)?);
        let mut builder = ClusterBuilder::new(queue, &ratios.font_sizes);
        builder.run_pass(self.config.cluster_cutoff);
        if self.config.second_pass {
            builder.run_pass(0.0);
        }
        let clusters = builder.finish();

        let mut words = Vec::with_capacity(ratios.font_sizes.len());
        let mut ordinal = 0usize;
        for (index, cluster) in clusters.iter().enumerate() {
            let color = cluster_color(index);
            for word in cluster.words() {
                words.push(CloudWordInfo {
                    word: word.clone(),
                    font_size: ratios.font_sizes.get(word).copied().unwrap_or_default(),
                    cluster: index,
                    ordinal,
                    color: Some(color),
                });
                ordinal += 1;
            }
        }
        Ok(ClusterSnapshot {
            words,
            cluster_count: clusters.len(),
        })
    }

    /// Applies the assembly limits and produces the published result.
    #[must_use]
    pub fn assemble(
        &self,
        counts: &CountsSnapshot,
        ratios: &RatioSnapshot,
        clusters: &ClusterSnapshot,
    ) -> CloudResult {
        let words = assemble_cloud(&clusters.words, &counts.selected.words, self.config);
        let mut entity_index: FxHashMap<String, Vec<EntityId>> = FxHashMap::default();
        for (word, entities) in &counts.background.entity_index {
            let mut ids: Vec<EntityId> = entities.iter().copied().collect();
            ids.sort_unstable();
            entity_index.insert(word.clone(), ids);
        }
        CloudResult {
            words,
            ratio_stats: ratios.enrichment.ratio_stats,
            weight_stats: ratios.enrichment.weight_stats,
            entity_index,
            missing_attributes: counts.missing_attributes.clone(),
            selected_total: counts.selected.entity_total,
            background_total: counts.background.entity_total,
        }
    }

    /// Runs the whole pipeline: counting, ratios, clustering, assembly.
    pub fn compute(&self) -> Result<CloudResult> {
        let counts = self.count()?;
        let ratios = self.ratios(&counts)?;
        let clusters = self.cluster(&counts, &ratios)?;
        let result = self.assemble(&counts, &ratios, &clusters);
        info!(
            "assembled cloud: {} words in {} clusters from {} selected entities",
            result.words.len(),
            clusters.cluster_count,
            result.selected_total
        );
        Ok(result)
    }
}

/// Deterministic ranking chain: font size descending, cluster ascending,
/// ordinal ascending, word ascending.
fn rank_cmp(a: &CloudWordInfo, b: &CloudWordInfo) -> Ordering {
    b.font_size
        .cmp(&a.font_size)
        .then_with(|| a.cluster.cmp(&b.cluster))
        .then_with(|| a.ordinal.cmp(&b.ordinal))
        .then_with(|| a.word.cmp(&b.word))
}

/// Applies the max-word and min-occurrence limits.
///
/// Survivors of the ranked truncation keep their original cluster grouping
/// and relative order for rendering; the no-clustering style instead emits
/// one flat group in rank order with colors suppressed.
#[must_use]
pub fn assemble_cloud(
    words: &[CloudWordInfo],
    selected_counts: &FxHashMap<String, usize>,
    config: &CloudConfig,
) -> Vec<CloudWordInfo> {
    let eligible: Vec<&CloudWordInfo> = words
        .iter()
        .filter(|info| {
            selected_counts.get(&info.word).copied().unwrap_or(0) >= config.min_word_occurrence
        })
        .collect();

    let mut ranked = eligible.clone();
    ranked.sort_by(|a, b| rank_cmp(a, b));
    ranked.truncate(config.max_words);

    if config.display_style == DisplayStyle::NoClustering {
        return ranked
            .into_iter()
            .map(|info| CloudWordInfo {
                cluster: 0,
                color: None,
                ..info.clone()
            })
            .collect();
    }

    let keep: FxHashSet<&str> = ranked.into_iter().map(|info| info.word.as_str()).collect();
    eligible
        .into_iter()
        .filter(|info| keep.contains(info.word.as_str()))
        .cloned()
        .collect()
}

type CacheSlot = Arc<Mutex<Option<Arc<CloudResult>>>>;

/// Per-configuration memoization of finished clouds.
///
/// At most one computation per configuration identity runs at a time; a
/// failed computation publishes nothing, so any previously cached result
/// for other configurations stays intact and later callers retry.
#[derive(Debug, Default)]
pub struct CloudCache {
    entries: Mutex<FxHashMap<String, CacheSlot>>,
}

impl CloudCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized result for the engine's configuration, computing
    /// it first if absent. Concurrent callers with the same configuration
    /// block on one computation; different configurations run independently.
    pub fn get_or_compute<S: AttributeSource + Sync>(
        &self,
        engine: &CloudEngine<'_, S>,
    ) -> Result<Arc<CloudResult>> {
        let slot = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            Arc::clone(entries.entry(engine.cache_key()).or_default())
        };
        let mut published = slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(result) = published.as_ref() {
            return Ok(Arc::clone(result));
        }
        let result = Arc::new(engine.compute()?);
        *published = Some(Arc::clone(&result));
        Ok(result)
    }

    /// Drops every memoized result, forcing recomputation.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{AttributeValue, EntityRecord, InMemoryTable};
    use crate::fontsize::{MAX_FONT, MIN_FONT};

    fn table(rows: &[(EntityId, &str)]) -> InMemoryTable {
        InMemoryTable::from_records(
            rows.iter()
                .map(|(id, text)| EntityRecord {
                    id: *id,
                    attributes: [(
                        "text".to_string(),
                        AttributeValue::Text((*text).to_string()),
                    )]
                    .into_iter()
                    .collect(),
                })
                .collect(),
        )
    }

    fn config() -> CloudConfig {
        CloudConfig::builder()
            .attribute_names(["text"])
            .weight_exponent(0.5)
            .cluster_cutoff(1.0)
            .build()
            .expect("valid config")
    }

    fn info(word: &str, font_size: i32, cluster: usize, ordinal: usize) -> CloudWordInfo {
        CloudWordInfo {
            word: word.into(),
            font_size,
            cluster,
            ordinal,
            color: Some(cluster_color(cluster)),
        }
    }

    #[test]
    fn max_words_keeps_the_largest_fonts() {
        let words = vec![
            info("small", 30, 0, 0),
            info("large", 50, 1, 1),
            info("medium", 40, 2, 2),
        ];
        let counts: FxHashMap<String, usize> =
            words.iter().map(|w| (w.word.clone(), 1)).collect();
        let cfg = CloudConfig {
            max_words: 2,
            ..config()
        };

        let assembled = assemble_cloud(&words, &counts, &cfg);
        let kept: Vec<&str> = assembled.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(kept, vec!["large", "medium"]);
    }

    #[test]
    fn survivors_keep_original_grouping_order() {
        // "small" ranks below "medium" but sits earlier in cluster order;
        // after truncation to 2 the survivors keep cluster order.
        let words = vec![
            info("small", 30, 0, 0),
            info("large", 50, 1, 1),
            info("tiny", 12, 2, 2),
        ];
        let counts: FxHashMap<String, usize> =
            words.iter().map(|w| (w.word.clone(), 1)).collect();
        let cfg = CloudConfig {
            max_words: 2,
            ..config()
        };
        let assembled = assemble_cloud(&words, &counts, &cfg);
        let kept: Vec<&str> = assembled.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(kept, vec!["small", "large"]);
    }

    #[test]
    fn min_occurrence_drops_rare_words() {
        let words = vec![info("common", 40, 0, 0), info("rare", 64, 1, 1)];
        let counts: FxHashMap<String, usize> =
            [("common".to_string(), 3), ("rare".to_string(), 1)]
                .into_iter()
                .collect();
        let cfg = CloudConfig {
            min_word_occurrence: 2,
            ..config()
        };
        let assembled = assemble_cloud(&words, &counts, &cfg);
        assert_eq!(assembled.len(), 1);
        assert_eq!(assembled[0].word, "common");
    }

    #[test]
    fn no_clustering_style_flattens_and_uncolors() {
        let words = vec![info("b", 40, 1, 1), info("a", 40, 0, 0)];
        let counts: FxHashMap<String, usize> =
            words.iter().map(|w| (w.word.clone(), 1)).collect();
        let cfg = CloudConfig {
            display_style: DisplayStyle::NoClustering,
            ..config()
        };
        let assembled = assemble_cloud(&words, &counts, &cfg);
        assert_eq!(assembled[0].word, "a");
        assert!(assembled.iter().all(|w| w.cluster == 0 && w.color.is_none()));
    }

    #[test]
    fn pipeline_produces_bounded_fonts() {
        let table = table(&[
            (1, "kinase pathway signal"),
            (2, "kinase pathway response"),
            (3, "membrane transport channel"),
            (4, "membrane receptor channel"),
            (5, "nucleus chromatin histone"),
        ]);
        let cfg = config();
        let filter = WordFilter::default();
        let engine = CloudEngine::new(&table, &[1, 2], &cfg, &filter).expect("engine builds");
        let result = engine.compute().expect("cloud computes");

        assert!(!result.words.is_empty());
        for word in &result.words {
            assert!((MIN_FONT..=MAX_FONT).contains(&word.font_size), "{word:?}");
        }
        assert_eq!(result.selected_total, 2);
        assert_eq!(result.background_total, 5);
    }

    #[test]
    fn uniform_selection_flattens_to_the_midpoint() {
        // Every selected word appears in both selected entities and nowhere
        // else: all ratios coincide, so all fonts flatten to 38.
        let table = table(&[
            (1, "alpha beta gamma"),
            (2, "alpha beta gamma"),
            (3, "delta epsilon zeta"),
        ]);
        let cfg = config();
        let filter = WordFilter::default();
        let engine = CloudEngine::new(&table, &[1, 2], &cfg, &filter).expect("engine builds");
        let result = engine.compute().expect("cloud computes");

        assert_eq!(result.words.len(), 3);
        assert!(result.words.iter().all(|w| w.font_size == 38));
    }

    #[test]
    fn empty_selection_fails_fast() {
        let table = table(&[(1, "alpha")]);
        let cfg = config();
        let filter = WordFilter::default();
        let engine = CloudEngine::new(&table, &[], &cfg, &filter).expect("engine builds");
        assert!(matches!(engine.compute(), Err(CloudError::EmptyPopulation)));
    }

    #[test]
    fn stray_selection_is_rejected() {
        let table = table(&[(1, "alpha")]);
        let cfg = config();
        let filter = WordFilter::default();
        let engine = CloudEngine::new(&table, &[99], &cfg, &filter).expect("engine builds");
        assert!(matches!(engine.compute(), Err(CloudError::InvalidConfig(_))));
    }

    #[test]
    fn missing_attributes_warn_but_do_not_abort() {
        let table = table(&[(1, "alpha beta"), (2, "alpha gamma")]);
        let cfg = CloudConfig {
            attribute_names: vec!["text".into(), "absent".into()],
            ..config()
        };
        let filter = WordFilter::default();
        let engine = CloudEngine::new(&table, &[1], &cfg, &filter).expect("engine builds");
        let result = engine.compute().expect("cloud computes");
        assert_eq!(result.missing_attributes, vec!["absent".to_string()]);
        assert!(!result.words.is_empty());
    }

    #[test]
    fn identical_inputs_reproduce_identical_clouds() {
        let table = table(&[
            (1, "alpha beta gamma delta"),
            (2, "alpha beta epsilon"),
            (3, "zeta eta theta"),
        ]);
        let cfg = config();
        let filter = WordFilter::default();
        let engine = CloudEngine::new(&table, &[1, 2], &cfg, &filter).expect("engine builds");
        let first = engine.compute().expect("first run");
        let second = engine.compute().expect("second run");
        assert_eq!(first, second);
    }

    #[test]
    fn entity_index_covers_background_words() {
        let table = table(&[(1, "shared alpha"), (2, "shared beta")]);
        let cfg = config();
        let filter = WordFilter::default();
        let engine = CloudEngine::new(&table, &[1], &cfg, &filter).expect("engine builds");
        let result = engine.compute().expect("cloud computes");
        assert_eq!(result.entity_index["shared"], vec![1, 2]);
        assert_eq!(result.entity_index["beta"], vec![2]);
    }

    #[test]
    fn cache_publishes_once_per_configuration() {
        let table = table(&[(1, "alpha beta"), (2, "alpha gamma")]);
        let cfg = config();
        let filter = WordFilter::default();
        let engine = CloudEngine::new(&table, &[1], &cfg, &filter).expect("engine builds");

        let cache = CloudCache::new();
        let first = cache.get_or_compute(&engine).expect("first compute");
        let second = cache.get_or_compute(&engine).expect("cached result");
        assert!(Arc::ptr_eq(&first, &second));

        cache.clear();
        let third = cache.get_or_compute(&engine).expect("recompute");
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }

    #[test]
    fn failed_computations_publish_nothing() {
        let table = table(&[(1, "alpha")]);
        let cfg = config();
        let filter = WordFilter::default();
        let engine = CloudEngine::new(&table, &[], &cfg, &filter).expect("engine builds");
        let cache = CloudCache::new();
        assert!(cache.get_or_compute(&engine).is_err());
        // The failure left no result behind; a retry recomputes.
        assert!(cache.get_or_compute(&engine).is_err());
    }
}
