//! Flat key-tab-value record round trip for cloud configurations.
//!
//! The persistence layer that owns the session file format stores one cloud
//! per record: `key<TAB>value` lines covering the cloud's name and every
//! configuration field. Reconstructing a configuration from its record and
//! recomputing reproduces byte-identical ratios and font sizes, because f64
//! fields are written in shortest round-trip form.
//!
//! Values must not contain tab characters; attribute and delimiter lists
//! are comma-joined.

use log::warn;

use crate::config::{CloudConfig, DisplayStyle};
use crate::error::{CloudError, Result};

const KEY_NAME: &str = "name";
const KEY_STYLE: &str = "display_style";
const KEY_WEIGHT: &str = "weight_exponent";
const KEY_CUTOFF: &str = "cluster_cutoff";
const KEY_MAX_WORDS: &str = "max_words";
const KEY_MIN_OCCURRENCE: &str = "min_word_occurrence";
const KEY_ATTRIBUTES: &str = "attribute_names";
const KEY_STEMMING: &str = "stemming";
const KEY_DELIMITERS: &str = "delimiters";
const KEY_EXCLUDE_NUMBERS: &str = "exclude_numbers";
const KEY_SECOND_PASS: &str = "second_pass";

/// A cloud configuration together with its user-visible name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCloud {
    /// User-visible cloud name.
    pub name: String,
    /// The configuration that produced (or will produce) the cloud.
    pub config: CloudConfig,
}

/// Serializes a named configuration to its flat record.
#[must_use]
pub fn to_record(cloud: &NamedCloud) -> String {
    let cfg = &cloud.config;
    let mut out = String::new();
    let mut push = |key: &str, value: String| {
        out.push_str(key);
        out.push('\t');
        out.push_str(&value);
        out.push('\n');
    };
    push(KEY_NAME, cloud.name.clone());
    push(KEY_STYLE, cfg.display_style.to_string());
    push(KEY_WEIGHT, cfg.weight_exponent.to_string());
    push(KEY_CUTOFF, cfg.cluster_cutoff.to_string());
    push(KEY_MAX_WORDS, cfg.max_words.to_string());
    push(KEY_MIN_OCCURRENCE, cfg.min_word_occurrence.to_string());
    push(KEY_ATTRIBUTES, cfg.attribute_names.join(","));
    push(KEY_STEMMING, cfg.stemming.to_string());
    push(KEY_DELIMITERS, cfg.delimiters.join(","));
    push(KEY_EXCLUDE_NUMBERS, cfg.exclude_numbers.to_string());
    push(KEY_SECOND_PASS, cfg.second_pass.to_string());
    out
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CloudError::Serialization(format!("record field {key} has invalid value {value:?}"))
    })
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reconstructs a named configuration from its flat record.
///
/// Missing keys fall back to [`CloudConfig::default`]; unknown keys are
/// skipped with a warning so records written by newer versions still load.
pub fn from_record(text: &str) -> Result<NamedCloud> {
    let mut name = String::new();
    let mut cfg = CloudConfig::default();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('\t') else {
            return Err(CloudError::Serialization(format!(
                "record line {line:?} is not key<TAB>value"
            )));
        };
        match key {
            KEY_NAME => name = value.to_string(),
            KEY_STYLE => cfg.display_style = value.parse::<DisplayStyle>()?,
            KEY_WEIGHT => cfg.weight_exponent = parse(key, value)?,
            KEY_CUTOFF => cfg.cluster_cutoff = parse(key, value)?,
            KEY_MAX_WORDS => cfg.max_words = parse(key, value)?,
            KEY_MIN_OCCURRENCE => cfg.min_word_occurrence = parse(key, value)?,
            KEY_ATTRIBUTES => cfg.attribute_names = parse_list(value),
            KEY_STEMMING => cfg.stemming = parse(key, value)?,
            KEY_DELIMITERS => cfg.delimiters = parse_list(value),
            KEY_EXCLUDE_NUMBERS => cfg.exclude_numbers = parse(key, value)?,
            KEY_SECOND_PASS => cfg.second_pass = parse(key, value)?,
            other => warn!("skipping unknown cloud record key {other:?}"),
        }
    }

    cfg.validate()?;
    Ok(NamedCloud { name, config: cfg })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named() -> NamedCloud {
        NamedCloud {
            name: "my cloud".into(),
            config: CloudConfig::builder()
                .weight_exponent(0.25)
                .cluster_cutoff(1.5)
                .max_words(40)
                .min_word_occurrence(2)
                .display_style(DisplayStyle::ClusteredBoxes)
                .attribute_names(["name", "description"])
                .stemming(true)
                .delimiters(["::"])
                .exclude_numbers(true)
                .second_pass(false)
                .build()
                .expect("valid config"),
        }
    }

    #[test]
    fn record_round_trips_every_field() {
        let cloud = named();
        let record = to_record(&cloud);
        let restored = from_record(&record).expect("record parses");
        assert_eq!(restored, cloud);
    }

    #[test]
    fn shortest_form_floats_round_trip_exactly() {
        let mut cloud = named();
        cloud.config.weight_exponent = 0.1 + 0.2;
        let restored = from_record(&to_record(&cloud)).expect("record parses");
        assert_eq!(
            restored.config.weight_exponent.to_bits(),
            cloud.config.weight_exponent.to_bits()
        );
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let restored = from_record("name\tminimal\n").expect("record parses");
        assert_eq!(restored.name, "minimal");
        assert_eq!(restored.config, CloudConfig::default());
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(matches!(
            from_record("no tab here"),
            Err(CloudError::Serialization(_))
        ));
        assert!(matches!(
            from_record("max_words\tlots\n"),
            Err(CloudError::Serialization(_))
        ));
    }

    #[test]
    fn invalid_restored_configs_fail_validation() {
        let err = from_record("weight_exponent\t7\n").expect_err("out of range");
        assert!(matches!(err, CloudError::InvalidConfig(_)));
    }
}
