//! Mapping enrichment ratios onto bounded integer font sizes.

use crate::ratio::RatioStats;

/// Smallest font size emitted.
pub const MIN_FONT: i32 = 12;
/// Largest font size emitted.
pub const MAX_FONT: i32 = 64;

const RELATIVE_EPSILON: f64 = 1e-5;

/// Relative epsilon comparison: `|a - b| <= eps * max(|a|, |b|)`.
#[must_use]
pub fn close_enough(a: f64, b: f64) -> bool {
    (a - b).abs() <= RELATIVE_EPSILON * a.abs().max(b.abs())
}

/// Projects a ratio distribution onto the reference (exponent 0)
/// distribution's scale and maps it linearly onto `[MIN_FONT, MAX_FONT]`.
#[derive(Debug, Clone, Copy)]
pub struct FontMapper {
    min_ratio: f64,
    scale: f64,
    slope: f64,
    degenerate: bool,
}

impl FontMapper {
    /// Builds a mapper from the weighted ratio statistics and the reference
    /// (exponent 0) statistics of the same word set.
    #[must_use]
    pub fn new(ratio_stats: &RatioStats, weight_stats: &RatioStats) -> Self {
        // Either distribution collapsing to a point makes the projection
        // meaningless and would otherwise divide by zero.
        let degenerate = close_enough(ratio_stats.min, ratio_stats.max)
            || close_enough(weight_stats.min, weight_stats.max);
        if degenerate {
            return Self {
                min_ratio: ratio_stats.min,
                scale: 0.0,
                slope: 0.0,
                degenerate: true,
            };
        }

        let zeroed_mean_ratio = ratio_stats.mean - ratio_stats.min;
        let zeroed_mean_weight = weight_stats.mean - weight_stats.min;
        let zeroed_max_weight = weight_stats.max - weight_stats.min;
        Self {
            min_ratio: ratio_stats.min,
            scale: zeroed_mean_weight / zeroed_mean_ratio,
            slope: f64::from(MAX_FONT - MIN_FONT) / zeroed_max_weight,
            degenerate: false,
        }
    }

    /// True when every word receives the midpoint size.
    #[must_use]
    pub fn degenerate(&self) -> bool {
        self.degenerate
    }

    /// Maps one word's ratio to its integer font size.
    pub fn font_size(&self, ratio: f64) -> i32 {
        if self.degenerate {
            return MIN_FONT + (MAX_FONT - MIN_FONT) / 2;
        }
        let normalized = (ratio - self.min_ratio) * self.scale;
        let size = f64::from(MIN_FONT) + self.slope * normalized;
        (size.round() as i32).clamp(MIN_FONT, MAX_FONT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(min: f64, mean: f64, max: f64) -> RatioStats {
        RatioStats { min, mean, max }
    }

    #[test]
    fn identical_distributions_span_the_full_range() {
        // Exponent 0: ratio and reference distributions coincide.
        let s = stats(0.2, 0.5, 0.8);
        let mapper = FontMapper::new(&s, &s);
        assert!(!mapper.degenerate());
        assert_eq!(mapper.font_size(0.2), MIN_FONT);
        assert_eq!(mapper.font_size(0.8), MAX_FONT);
        assert_eq!(mapper.font_size(0.5), MIN_FONT + (MAX_FONT - MIN_FONT) / 2);
    }

    #[test]
    fn degenerate_ratios_flatten_to_the_midpoint() {
        let flat = stats(0.4, 0.4, 0.4);
        let reference = stats(0.1, 0.3, 0.9);
        let mapper = FontMapper::new(&flat, &reference);
        assert!(mapper.degenerate());
        assert_eq!(mapper.font_size(0.4), 38);
    }

    #[test]
    fn near_equal_ratios_flatten_within_relative_epsilon() {
        let nearly_flat = stats(1.0, 1.0, 1.0 + 1e-7);
        let reference = stats(0.1, 0.3, 0.9);
        assert!(FontMapper::new(&nearly_flat, &reference).degenerate());
    }

    #[test]
    fn degenerate_reference_also_flattens() {
        let ratios = stats(0.1, 0.3, 0.9);
        let flat_reference = stats(0.5, 0.5, 0.5);
        let mapper = FontMapper::new(&ratios, &flat_reference);
        assert_eq!(mapper.font_size(0.9), 38);
    }

    #[test]
    fn sizes_stay_within_bounds_under_exponent_skew() {
        // A weighted distribution spread wider (relative to its mean) than
        // the reference would overshoot the line without the clamp.
        let ratios = stats(1.0, 1.5, 16.0);
        let reference = stats(0.2, 0.5, 0.8);
        let mapper = FontMapper::new(&ratios, &reference);
        for ratio in [1.0, 1.2, 1.5, 4.0, 8.0, 16.0] {
            let size = mapper.font_size(ratio);
            assert!((MIN_FONT..=MAX_FONT).contains(&size), "ratio {ratio}");
        }
    }

    #[test]
    fn close_enough_is_relative_not_absolute() {
        assert!(close_enough(1_000_000.0, 1_000_000.0 + 1.0));
        assert!(!close_enough(1e-9, 2e-9));
        assert!(close_enough(0.0, 0.0));
    }
}
