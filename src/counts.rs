//! Frequency counting over one population of entities.
//!
//! Counts are "entities containing word", not token occurrences: each word
//! contributes at most once per entity, and pairs are counted over adjacent
//! entries of the deduplicated per-entity word sequence. The background and
//! selected populations are counted with two fully independent passes.

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::corpus::{AttributeSource, EntityId};
use crate::filter::WordFilter;
use crate::pairs::WordPair;
use crate::tokenize::Tokenizer;

/// Per-population word and pair counts.
#[derive(Debug, Clone, Default)]
pub struct PopulationCounts {
    /// Number of entities in the population.
    pub entity_total: usize,
    /// Word to number of entities whose text contained it.
    pub words: FxHashMap<String, usize>,
    /// Adjacent pair to number of entities whose deduplicated word sequence
    /// contained it.
    pub pairs: FxHashMap<WordPair, usize>,
    /// Word to entities containing it. Populated for the background pass
    /// only; drives selection highlighting downstream.
    pub entity_index: FxHashMap<String, FxHashSet<EntityId>>,
}

impl PopulationCounts {
    /// Sum of all per-word counts, the occurrence total used by the pair
    /// probability model.
    #[must_use]
    pub fn total_word_occurrences(&self) -> usize {
        self.words.values().sum()
    }
}

/// Accepted words of one entity, in deduplicated first-occurrence order,
/// with the adjacent pairs formed along the way.
#[derive(Debug, Default)]
struct EntityWords {
    entity: EntityId,
    words: Vec<String>,
    pairs: Vec<WordPair>,
}

/// Walks one entity's configured attributes through the tokenizer and
/// filter.
///
/// A single seen-set spans all attributes, so a word appearing in two
/// attributes still counts once. The previous-accepted-word pointer resets
/// at the start of the entity (not per attribute) and advances only past
/// words that pass the filter.
fn collect_entity_words<S: AttributeSource>(
    source: &S,
    entity: EntityId,
    attributes: &[String],
    tokenizer: &Tokenizer,
    filter: &WordFilter,
) -> EntityWords {
    let mut out = EntityWords {
        entity,
        ..EntityWords::default()
    };
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut previous: Option<String> = None;

    for attribute in attributes {
        let Some(value) = source.attribute_text(entity, attribute) else {
            continue;
        };
        for word in tokenizer.tokenize(&value.joined()) {
            if filter.contains(&word) {
                continue;
            }
            if !seen.insert(word.clone()) {
                continue;
            }
            if let Some(prev) = previous.replace(word.clone()) {
                out.pairs.push(WordPair::new(prev, word.clone()));
            }
            out.words.push(word);
        }
    }
    out
}

/// Counts one population.
///
/// The per-entity walks are independent, so they run as a rayon fork-join
/// map/reduce in the manner of a pair-count pass over token sequences; the
/// merge is additive and therefore order-independent.
pub fn count_population<S: AttributeSource + Sync>(
    source: &S,
    entities: &[EntityId],
    attributes: &[String],
    tokenizer: &Tokenizer,
    filter: &WordFilter,
    build_index: bool,
) -> PopulationCounts {
    let merged = entities
        .par_iter()
        .map(|&entity| collect_entity_words(source, entity, attributes, tokenizer, filter))
        .fold(PopulationCounts::default, |mut acc, entity_words| {
            accumulate(&mut acc, entity_words, build_index);
            acc
        })
        .reduce(PopulationCounts::default, merge_counts);

    PopulationCounts {
        entity_total: entities.len(),
        ..merged
    }
}

fn accumulate(acc: &mut PopulationCounts, entity_words: EntityWords, build_index: bool) {
    for word in entity_words.words {
        *acc.words.entry(word.clone()).or_insert(0) += 1;
        if build_index {
            acc.entity_index
                .entry(word)
                .or_default()
                .insert(entity_words.entity);
        }
    }
    for pair in entity_words.pairs {
        *acc.pairs.entry(pair).or_insert(0) += 1;
    }
}

fn merge_counts(mut acc: PopulationCounts, other: PopulationCounts) -> PopulationCounts {
    for (word, count) in other.words {
        *acc.words.entry(word).or_insert(0) += count;
    }
    for (pair, count) in other.pairs {
        *acc.pairs.entry(pair).or_insert(0) += count;
    }
    for (word, entities) in other.entity_index {
        acc.entity_index.entry(word).or_default().extend(entities);
    }
    acc
}
