//! Optional tuning file for resolver, generator and engine knobs.
//!
//! The file is TOML with three optional tables; every key is optional and
//! anything absent keeps its built-in default:
//!
//! ```toml
//! [resolver]
//! min_accept_score = 70
//! weight_text = 40.0
//!
//! [generator]
//! preferred_attributes = ["data-testid", "name"]
//!
//! [engine]
//! creation_grace_ms = 0
//! ```
//!
//! Unknown keys are rejected so a typo fails loudly instead of silently
//! running with defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use pagemark_anchor::EngineConfig;
use pagemark_resolve::ResolverConfig;
use pagemark_selector::GeneratorConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTuning {
    #[serde(default)]
    resolver: RawResolver,
    #[serde(default)]
    generator: RawGenerator,
    #[serde(default)]
    engine: RawEngine,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResolver {
    min_accept_score: Option<u8>,
    weight_tag: Option<f64>,
    weight_classes: Option<f64>,
    weight_attribute: Option<f64>,
    partial_attribute_factor: Option<f64>,
    weight_id: Option<f64>,
    weight_text: Option<f64>,
    text_compare_len: Option<usize>,
    parse_cache_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGenerator {
    preferred_attributes: Option<Vec<String>>,
    max_path_depth: Option<usize>,
    min_class_token_len: Option<usize>,
    max_class_tokens: Option<usize>,
    max_attr_value_len: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEngine {
    creation_grace_ms: Option<u64>,
    anchor_text_len: Option<usize>,
}

/// Build the engine configuration, applying overrides from `path` when given.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tuning file {}", path.display()))?;
    let raw: RawTuning = toml::from_str(&text)
        .with_context(|| format!("Tuning file {} is not valid TOML", path.display()))?;

    let config = EngineConfig {
        resolver: merge_resolver(raw.resolver),
        generator: merge_generator(raw.generator),
        creation_grace: raw
            .engine
            .creation_grace_ms
            .map_or(EngineConfig::default().creation_grace, Duration::from_millis),
        anchor_text_len: raw
            .engine
            .anchor_text_len
            .unwrap_or(EngineConfig::default().anchor_text_len),
    };
    config
        .validate()
        .map_err(|reason| anyhow!("Tuning file {}: {reason}", path.display()))?;
    Ok(config)
}

fn merge_resolver(raw: RawResolver) -> ResolverConfig {
    let defaults = ResolverConfig::default();
    ResolverConfig {
        min_accept_score: raw.min_accept_score.unwrap_or(defaults.min_accept_score),
        weight_tag: raw.weight_tag.unwrap_or(defaults.weight_tag),
        weight_classes: raw.weight_classes.unwrap_or(defaults.weight_classes),
        weight_attribute: raw.weight_attribute.unwrap_or(defaults.weight_attribute),
        partial_attribute_factor: raw
            .partial_attribute_factor
            .unwrap_or(defaults.partial_attribute_factor),
        weight_id: raw.weight_id.unwrap_or(defaults.weight_id),
        weight_text: raw.weight_text.unwrap_or(defaults.weight_text),
        text_compare_len: raw.text_compare_len.unwrap_or(defaults.text_compare_len),
        parse_cache_size: raw.parse_cache_size.unwrap_or(defaults.parse_cache_size),
    }
}

fn merge_generator(raw: RawGenerator) -> GeneratorConfig {
    let defaults = GeneratorConfig::default();
    GeneratorConfig {
        preferred_attributes: raw
            .preferred_attributes
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.preferred_attributes),
        max_path_depth: raw.max_path_depth.unwrap_or(defaults.max_path_depth),
        min_class_token_len: raw
            .min_class_token_len
            .unwrap_or(defaults.min_class_token_len),
        max_class_tokens: raw.max_class_tokens.unwrap_or(defaults.max_class_tokens),
        max_attr_value_len: raw.max_attr_value_len.unwrap_or(defaults.max_attr_value_len),
    }
}
