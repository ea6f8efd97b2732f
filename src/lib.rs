//! Selection-enrichment word cloud engine.
//!
//! The crate computes a ranked, clustered word summary of the free text
//! attached to a selected subset of entities within a larger background
//! population. Per-word enrichment ratios are mapped onto bounded font
//! sizes, and co-occurring words are grouped by a greedy, queue-driven
//! matching pass. Typical usage builds a [`CloudConfig`], wraps an entity
//! store in an [`AttributeSource`], and runs a [`CloudEngine`]:
//!
//! ```no_run
//! use semcloud::{CloudConfig, CloudEngine, InMemoryTable, WordFilter};
//!
//! # fn main() -> semcloud::Result<()> {
//! let table = InMemoryTable::load("corpus.json")?;
//! let config = CloudConfig::builder()
//!     .attribute_names(["description"])
//!     .weight_exponent(0.5)
//!     .build()?;
//! let filter = WordFilter::new(true);
//! let engine = CloudEngine::new(&table, &[3, 7, 11], &config, &filter)?;
//! let cloud = engine.compute()?;
//! for word in &cloud.words {
//!     println!("{} {}", word.word, word.font_size);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature. Users targeting
//! the library portion only can disable default features:
//! `semcloud = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod cloud;
pub mod cluster;
pub mod config;
pub mod corpus;
pub mod counts;
pub mod error;
pub mod filter;
pub mod fontsize;
pub mod pairs;
pub mod queue;
pub mod ratio;
pub mod serialization;
pub mod tokenize;

pub use cloud::{CloudCache, CloudEngine, CloudResult, CloudWordInfo};
pub use cluster::{cluster_color, Rgb, WordCluster};
pub use config::{CloudBuilder, CloudConfig, DisplayStyle};
pub use corpus::{AttributeSource, AttributeValue, EntityId, InMemoryTable};
pub use error::{CloudError, Result};
pub use filter::WordFilter;
pub use pairs::WordPair;
pub use ratio::RatioStats;
pub use serialization::NamedCloud;
pub use tokenize::Tokenizer;
