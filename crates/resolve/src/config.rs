use serde::{Deserialize, Serialize};

const DEFAULT_MIN_ACCEPT_SCORE: u8 = 55;
const DEFAULT_WEIGHT_TAG: f64 = 15.0;
const DEFAULT_WEIGHT_CLASSES: f64 = 25.0;
const DEFAULT_WEIGHT_ATTRIBUTE: f64 = 25.0;
const DEFAULT_PARTIAL_ATTRIBUTE_FACTOR: f64 = 0.6;
const DEFAULT_WEIGHT_ID: f64 = 20.0;
const DEFAULT_WEIGHT_TEXT: f64 = 30.0;
const DEFAULT_TEXT_COMPARE_LEN: usize = 120;
const DEFAULT_PARSE_CACHE_SIZE: usize = 64;

/// Configuration for fuzzy resolution behavior.
///
/// The weights are tuning constants, not contracts: tests pin their
/// relative ordering effects (an exact attribute match outranks a partial
/// one, remembered text can rescue a renamed element), never exact values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Scores below this never produce a match; the caller orphans instead
    pub min_accept_score: u8,

    /// Contribution of an exact tag match
    pub weight_tag: f64,

    /// Contribution of full class overlap (scaled by the matched fraction)
    pub weight_classes: f64,

    /// Contribution per attribute expectation
    pub weight_attribute: f64,

    /// Fraction of the attribute weight reachable via value similarity
    pub partial_attribute_factor: f64,

    /// Contribution of id similarity (rotated ids score partially)
    pub weight_id: f64,

    /// Contribution of remembered-text similarity
    pub weight_text: f64,

    /// Candidate text is truncated to this many characters before comparison
    pub text_compare_len: usize,

    /// Entries kept in the parsed-selector cache
    pub parse_cache_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_accept_score: DEFAULT_MIN_ACCEPT_SCORE,
            weight_tag: DEFAULT_WEIGHT_TAG,
            weight_classes: DEFAULT_WEIGHT_CLASSES,
            weight_attribute: DEFAULT_WEIGHT_ATTRIBUTE,
            partial_attribute_factor: DEFAULT_PARTIAL_ATTRIBUTE_FACTOR,
            weight_id: DEFAULT_WEIGHT_ID,
            weight_text: DEFAULT_WEIGHT_TEXT,
            text_compare_len: DEFAULT_TEXT_COMPARE_LEN,
            parse_cache_size: DEFAULT_PARSE_CACHE_SIZE,
        }
    }
}

impl ResolverConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_accept_score > 100 {
            return Err(format!(
                "min_accept_score ({}) must be within 0-100",
                self.min_accept_score
            ));
        }
        for (name, weight) in [
            ("weight_tag", self.weight_tag),
            ("weight_classes", self.weight_classes),
            ("weight_attribute", self.weight_attribute),
            ("weight_id", self.weight_id),
            ("weight_text", self.weight_text),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("{name} ({weight}) must be a non-negative number"));
            }
        }
        if !(0.0..=1.0).contains(&self.partial_attribute_factor) {
            return Err(format!(
                "partial_attribute_factor ({}) must be within 0.0-1.0",
                self.partial_attribute_factor
            ));
        }
        if self.text_compare_len == 0 {
            return Err("text_compare_len must be > 0".to_string());
        }
        if self.parse_cache_size == 0 {
            return Err("parse_cache_size must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(ResolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ResolverConfig::default();
        config.min_accept_score = 101;
        assert!(config.validate().is_err());

        config = ResolverConfig::default();
        config.weight_text = -1.0;
        assert!(config.validate().is_err());

        config = ResolverConfig::default();
        config.partial_attribute_factor = 1.5;
        assert!(config.validate().is_err());

        config = ResolverConfig::default();
        config.parse_cache_size = 0;
        assert!(config.validate().is_err());
    }
}
