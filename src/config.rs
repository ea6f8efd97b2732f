//! Configuration types controlling a cloud computation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CloudError, Result};

/// How the assembled cloud is grouped for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayStyle {
    /// One flat group in rank order; cluster boxes and coloring suppressed.
    NoClustering,
    /// Clustered layout with per-cluster colors.
    ClusteredStandard,
    /// Clustered layout drawn with explicit cluster boxes.
    ClusteredBoxes,
}

impl DisplayStyle {
    /// Returns true for the styles that keep cluster grouping and colors.
    #[must_use]
    pub fn clustered(self) -> bool {
        !matches!(self, Self::NoClustering)
    }
}

impl fmt::Display for DisplayStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoClustering => "no-clustering",
            Self::ClusteredStandard => "clustered-standard",
            Self::ClusteredBoxes => "clustered-boxes",
        };
        f.write_str(name)
    }
}

impl FromStr for DisplayStyle {
    type Err = CloudError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "no-clustering" => Ok(Self::NoClustering),
            "clustered-standard" => Ok(Self::ClusteredStandard),
            "clustered-boxes" => Ok(Self::ClusteredBoxes),
            other => Err(CloudError::InvalidConfig(format!(
                "unknown display style {other:?}"
            ))),
        }
    }
}

/// Configuration for one cloud computation.
///
/// A config together with the selected entity set fully determines the
/// derived cloud; any change to a field invalidates previously computed
/// results rather than patching them in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Background-weight exponent applied to the enrichment ratio, in [0, 1].
    /// 0 ignores the background distribution entirely; 1 normalizes fully.
    pub weight_exponent: f64,
    /// Minimum pair probability required to merge two words' clusters.
    pub cluster_cutoff: f64,
    /// Maximum number of words kept in the assembled cloud.
    pub max_words: usize,
    /// Minimum selected-population occurrence count required to keep a word.
    pub min_word_occurrence: usize,
    /// Grouping style for the assembled cloud.
    pub display_style: DisplayStyle,
    /// Attribute columns whose text feeds the cloud.
    pub attribute_names: Vec<String>,
    /// Enables suffix stemming before per-text deduplication.
    pub stemming: bool,
    /// User-added delimiter strings appended to the base delimiter set.
    pub delimiters: Vec<String>,
    /// Treats decimal integers 0-999 as excluded words.
    pub exclude_numbers: bool,
    /// Runs the legacy second clustering pass with a zero cutoff against the
    /// reduced queue after the cutoff pass completes.
    pub second_pass: bool,
}

impl CloudConfig {
    /// Returns a builder initialised with [`CloudConfig::default`].
    #[must_use]
    pub fn builder() -> CloudBuilder {
        CloudBuilder::default()
    }

    /// Validates the invariants required for a computation.
    pub fn validate(&self) -> Result<()> {
        if !self.weight_exponent.is_finite() || !(0.0..=1.0).contains(&self.weight_exponent) {
            return Err(CloudError::InvalidConfig(format!(
                "weight_exponent ({}) must lie in [0, 1]",
                self.weight_exponent
            )));
        }
        if !self.cluster_cutoff.is_finite() || self.cluster_cutoff < 0.0 {
            return Err(CloudError::InvalidConfig(format!(
                "cluster_cutoff ({}) must be finite and non-negative",
                self.cluster_cutoff
            )));
        }
        if self.min_word_occurrence == 0 {
            return Err(CloudError::InvalidConfig(
                "min_word_occurrence must be at least 1".into(),
            ));
        }
        if self.attribute_names.is_empty() {
            return Err(CloudError::InvalidConfig(
                "attribute_names must not be empty".into(),
            ));
        }
        if self.delimiters.iter().any(String::is_empty) {
            return Err(CloudError::InvalidConfig(
                "custom delimiters must not be empty strings".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            weight_exponent: 0.5,
            cluster_cutoff: 1.0,
            max_words: 250,
            min_word_occurrence: 1,
            display_style: DisplayStyle::ClusteredStandard,
            attribute_names: vec!["name".into()],
            stemming: false,
            delimiters: Vec::new(),
            exclude_numbers: false,
            second_pass: true,
        }
    }
}

/// Builder for [`CloudConfig`].
#[derive(Debug, Default, Clone)]
pub struct CloudBuilder {
    cfg: CloudConfig,
}

impl CloudBuilder {
    /// Creates a builder with [`CloudConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the background-weight exponent.
    #[must_use]
    pub fn weight_exponent(mut self, value: f64) -> Self {
        self.cfg.weight_exponent = value;
        self
    }

    /// Sets the minimum pair probability for cluster merges.
    #[must_use]
    pub fn cluster_cutoff(mut self, value: f64) -> Self {
        self.cfg.cluster_cutoff = value;
        self
    }

    /// Sets the maximum number of words in the assembled cloud.
    #[must_use]
    pub fn max_words(mut self, value: usize) -> Self {
        self.cfg.max_words = value;
        self
    }

    /// Sets the minimum selected occurrence count per word.
    #[must_use]
    pub fn min_word_occurrence(mut self, value: usize) -> Self {
        self.cfg.min_word_occurrence = value;
        self
    }

    /// Sets the display style.
    #[must_use]
    pub fn display_style(mut self, value: DisplayStyle) -> Self {
        self.cfg.display_style = value;
        self
    }

    /// Overrides the attribute columns feeding the cloud.
    #[must_use]
    pub fn attribute_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.attribute_names = names.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Enables or disables suffix stemming.
    #[must_use]
    pub fn stemming(mut self, enabled: bool) -> Self {
        self.cfg.stemming = enabled;
        self
    }

    /// Overrides the user-added delimiter strings.
    #[must_use]
    pub fn delimiters<I, S>(mut self, delimiters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.delimiters = delimiters.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Enables or disables exclusion of decimal integers 0-999.
    #[must_use]
    pub fn exclude_numbers(mut self, enabled: bool) -> Self {
        self.cfg.exclude_numbers = enabled;
        self
    }

    /// Enables or disables the legacy zero-cutoff second clustering pass.
    #[must_use]
    pub fn second_pass(mut self, enabled: bool) -> Self {
        self.cfg.second_pass = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`CloudConfig`].
    pub fn build(mut self) -> Result<CloudConfig> {
        self.cfg.attribute_names.dedup();
        self.cfg.delimiters.sort_unstable();
        self.cfg.delimiters.dedup();
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_deduplicates_delimiters() {
        let cfg = CloudConfig::builder()
            .delimiters(["--", "::", "--"])
            .build()
            .expect("config should be valid");
        assert_eq!(&cfg.delimiters, &["--", "::"]);
    }

    #[test]
    fn validate_rejects_out_of_range_exponent() {
        let cfg = CloudConfig {
            weight_exponent: 1.5,
            ..CloudConfig::default()
        };
        let err = cfg.validate().expect_err("validation should fail");
        assert!(matches!(
            err,
            CloudError::InvalidConfig(message) if message.contains("weight_exponent")
        ));
    }

    #[test]
    fn validate_rejects_zero_min_occurrence() {
        let cfg = CloudConfig {
            min_word_occurrence: 0,
            ..CloudConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_attributes() {
        let cfg = CloudConfig {
            attribute_names: Vec::new(),
            ..CloudConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn display_style_round_trips_through_strings() {
        for style in [
            DisplayStyle::NoClustering,
            DisplayStyle::ClusteredStandard,
            DisplayStyle::ClusteredBoxes,
        ] {
            let text = style.to_string();
            assert_eq!(text.parse::<DisplayStyle>().unwrap(), style);
        }
        assert!("cloudy".parse::<DisplayStyle>().is_err());
    }

    #[test]
    fn only_the_flat_style_suppresses_clustering() {
        assert!(!DisplayStyle::NoClustering.clustered());
        assert!(DisplayStyle::ClusteredStandard.clustered());
        assert!(DisplayStyle::ClusteredBoxes.clustered());
    }
}
