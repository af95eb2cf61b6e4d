//! Selector synthesis for a clicked element.
//!
//! Strategy chain, first success wins: stable id, then a preferred
//! attribute, then filtered class combinations, then a structural path.
//! Every accepted selector must pass validation and, except for the final
//! degraded fallback, must resolve back to exactly the target element in
//! the current document.

use crate::dynamic::is_dynamic_token;
use crate::validate::sanitize;
use pagemark_dom::{DocumentQuery, NodeId};
use serde::{Deserialize, Serialize};

/// Attributes consulted by the attribute strategy, most stable first.
const DEFAULT_PREFERRED_ATTRIBUTES: &[&str] = &[
    "data-testid",
    "data-test",
    "data-cy",
    "data-qa",
    "data-test-id",
    "name",
    "aria-label",
];

const DEFAULT_MAX_PATH_DEPTH: usize = 10;
const DEFAULT_MIN_CLASS_TOKEN_LEN: usize = 3;
const DEFAULT_MAX_CLASS_TOKENS: usize = 5;
const DEFAULT_MAX_ATTR_VALUE_LEN: usize = 64;

/// Configuration for selector generation behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Attributes tried by the attribute strategy, in priority order
    pub preferred_attributes: Vec<String>,

    /// Ancestor levels the structural fallback may climb (hard latency bound)
    pub max_path_depth: usize,

    /// Class tokens shorter than this carry too little signal to use
    pub min_class_token_len: usize,

    /// Cap on class tokens considered for combinations
    pub max_class_tokens: usize,

    /// Attribute values longer than this are skipped
    pub max_attr_value_len: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            preferred_attributes: DEFAULT_PREFERRED_ATTRIBUTES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_path_depth: DEFAULT_MAX_PATH_DEPTH,
            min_class_token_len: DEFAULT_MIN_CLASS_TOKEN_LEN,
            max_class_tokens: DEFAULT_MAX_CLASS_TOKENS,
            max_attr_value_len: DEFAULT_MAX_ATTR_VALUE_LEN,
        }
    }
}

impl GeneratorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_path_depth == 0 {
            return Err("max_path_depth must be > 0".to_string());
        }
        if self.max_path_depth > 32 {
            return Err(format!(
                "max_path_depth ({}) is past any useful page depth",
                self.max_path_depth
            ));
        }
        if self.min_class_token_len == 0 {
            return Err("min_class_token_len must be > 0".to_string());
        }
        if self.max_class_tokens == 0 {
            return Err("max_class_tokens must be > 0".to_string());
        }
        Ok(())
    }
}

/// Builds durable selectors for elements of a live document.
#[derive(Debug, Clone, Default)]
pub struct SelectorGenerator {
    config: GeneratorConfig,
}

impl SelectorGenerator {
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a selector for `target`, or `None` for non-element or
    /// detached input.
    ///
    /// For attached elements this always produces a selector: if no unique
    /// one can be proven, the capped structural path is returned anyway,
    /// because remembered text can still disambiguate it at resolution time.
    pub fn generate<D: DocumentQuery>(&self, doc: &D, target: NodeId) -> Option<String> {
        doc.tag_name(target)?;
        if !doc.is_attached(target) {
            return None;
        }
        if let Some(selector) = self.id_selector(doc, target) {
            return Some(selector);
        }
        if let Some(selector) = self.attribute_selector(doc, target) {
            return Some(selector);
        }
        if let Some(selector) = self.class_selector(doc, target) {
            return Some(selector);
        }
        log::debug!("falling back to structural path for node {target:?}");
        self.structural_selector(doc, target)
    }

    fn id_selector<D: DocumentQuery>(&self, doc: &D, target: NodeId) -> Option<String> {
        let id = doc.element_id(target)?;
        if id.is_empty() || is_dynamic_token(id) || !is_css_identifier(id) {
            return None;
        }
        accept(doc, target, &format!("#{id}"))
    }

    fn attribute_selector<D: DocumentQuery>(&self, doc: &D, target: NodeId) -> Option<String> {
        let tag = doc.tag_name(target)?;
        for attr in &self.config.preferred_attributes {
            let Some(value) = doc.attribute(target, attr) else {
                continue;
            };
            if !self.usable_attr_value(value) {
                continue;
            }
            let bare = format!("[{attr}=\"{value}\"]");
            if let Some(selector) = accept(doc, target, &bare) {
                return Some(selector);
            }
            if let Some(selector) = accept(doc, target, &format!("{tag}{bare}")) {
                return Some(selector);
            }
        }
        None
    }

    fn class_selector<D: DocumentQuery>(&self, doc: &D, target: NodeId) -> Option<String> {
        let tag = doc.tag_name(target)?;
        let tokens: Vec<&str> = doc
            .classes(target)
            .into_iter()
            .filter(|c| self.usable_class_token(c))
            .take(self.config.max_class_tokens)
            .collect();
        if tokens.is_empty() {
            return None;
        }
        for token in &tokens {
            if let Some(selector) = accept(doc, target, &format!(".{token}")) {
                return Some(selector);
            }
            if let Some(selector) = accept(doc, target, &format!("{tag}.{token}")) {
                return Some(selector);
            }
        }
        for size in 2..=tokens.len() {
            if let Some(selector) = class_combination(doc, target, tag, &tokens, size) {
                return Some(selector);
            }
        }
        None
    }

    fn structural_selector<D: DocumentQuery>(&self, doc: &D, target: NodeId) -> Option<String> {
        let mut nodes = vec![target];
        let mut segments = vec![self.path_segment(doc, target)?];
        let mut current = target;
        loop {
            let path = join_path(&segments);
            if let Some(selector) = accept(doc, target, &path) {
                return Some(selector);
            }
            if segments.len() >= self.config.max_path_depth {
                break;
            }
            let Some(parent) = doc.parent(current) else {
                break;
            };
            let Some(segment) = self.path_segment(doc, parent) else {
                break;
            };
            let anchored = segment.starts_with('#');
            nodes.push(parent);
            segments.push(segment);
            current = parent;
            if anchored {
                // An id segment pins the path; climbing higher adds nothing.
                let path = join_path(&segments);
                if let Some(selector) = accept(doc, target, &path) {
                    return Some(selector);
                }
                break;
            }
        }
        // Degraded fallback: an unproven path still beats refusing to
        // anchor, since resolution can disambiguate with remembered text.
        sanitize(&join_path(&segments)).or_else(|| {
            // Attribute segments can push the joined path past the length
            // cap; a tag/nth-only rendering of the same levels always fits.
            let bare: Option<Vec<String>> =
                nodes.iter().map(|&node| bare_segment(doc, node)).collect();
            sanitize(&join_path(&bare?))
        })
    }

    /// Short selector for one path level: id, else tag plus the strongest
    /// attribute or class available, with an `:nth-of-type` discriminator
    /// when same-tag siblings make the level ambiguous. Non-recursive.
    fn path_segment<D: DocumentQuery>(&self, doc: &D, node: NodeId) -> Option<String> {
        let tag = doc.tag_name(node)?.to_string();
        if let Some(id) = doc.element_id(node) {
            if !id.is_empty() && !is_dynamic_token(id) && is_css_identifier(id) {
                return Some(format!("#{id}"));
            }
        }
        let mut segment = self
            .config
            .preferred_attributes
            .iter()
            .find_map(|attr| {
                let value = doc.attribute(node, attr)?;
                if !self.usable_attr_value(value) {
                    return None;
                }
                // Attribute values are free text; one that trips the
                // validator would poison every path built through this level.
                sanitize(&format!("{tag}[{attr}=\"{value}\"]"))
            })
            .or_else(|| {
                doc.classes(node)
                    .into_iter()
                    .find(|c| self.usable_class_token(c))
                    .map(|class| format!("{tag}.{class}"))
            })
            .unwrap_or_else(|| tag.clone());
        if let Some(position) = ambiguous_position(doc, node) {
            segment.push_str(&format!(":nth-of-type({position})"));
        }
        Some(segment)
    }

    fn usable_attr_value(&self, value: &str) -> bool {
        !value.is_empty()
            && value.chars().count() <= self.config.max_attr_value_len
            && !value.chars().any(|c| c == '"' || c.is_control())
            && !is_dynamic_token(value)
    }

    fn usable_class_token(&self, token: &str) -> bool {
        token.chars().count() >= self.config.min_class_token_len
            && is_css_identifier(token)
            && !is_dynamic_token(token)
    }
}

/// Try every `size`-token class combination, in token order, accepting the
/// first that is unique. Token count is capped upstream, so the enumeration
/// stays small.
fn class_combination<D: DocumentQuery>(
    doc: &D,
    target: NodeId,
    tag: &str,
    tokens: &[&str],
    size: usize,
) -> Option<String> {
    let mut indices: Vec<usize> = (0..size).collect();
    loop {
        let combo: Vec<&str> = indices.iter().map(|&i| tokens[i]).collect();
        if let Some(selector) = accept(doc, target, &format!("{tag}.{}", combo.join("."))) {
            return Some(selector);
        }
        // Advance to the next index combination, rightmost digit first.
        let mut i = size;
        loop {
            if i == 0 {
                return None;
            }
            i -= 1;
            if indices[i] != i + tokens.len() - size {
                break;
            }
        }
        indices[i] += 1;
        for j in i + 1..size {
            indices[j] = indices[j - 1] + 1;
        }
    }
}

/// Tag plus `:nth-of-type` only: the shortest rendering of a path level,
/// guaranteed validator-clean.
fn bare_segment<D: DocumentQuery>(doc: &D, node: NodeId) -> Option<String> {
    let mut segment = doc.tag_name(node)?.to_string();
    if let Some(position) = ambiguous_position(doc, node) {
        segment.push_str(&format!(":nth-of-type({position})"));
    }
    Some(segment)
}

/// Validate, then require the selector to hit exactly the target.
fn accept<D: DocumentQuery>(doc: &D, target: NodeId, candidate: &str) -> Option<String> {
    let clean = sanitize(candidate)?;
    match doc.query_selector_all(&clean) {
        Ok(matches) if matches.len() == 1 && matches[0] == target => Some(clean),
        _ => None,
    }
}

/// 1-based `:nth-of-type` position, only when the element actually has
/// same-tag siblings; unambiguous levels get no discriminator.
fn ambiguous_position<D: DocumentQuery>(doc: &D, node: NodeId) -> Option<u32> {
    let tag = doc.tag_name(node)?;
    let parent = doc.parent(node)?;
    let mut position = 0u32;
    let mut same_tag = 0u32;
    for child in doc.element_children(parent) {
        if doc.tag_name(child) == Some(tag) {
            same_tag += 1;
            if child == node {
                position = same_tag;
            }
        }
    }
    (same_tag > 1 && position > 0).then_some(position)
}

/// Segments are collected leaf-first; the selector reads ancestor-first.
fn join_path(segments: &[String]) -> String {
    let ordered: Vec<&str> = segments.iter().rev().map(String::as_str).collect();
    ordered.join(" > ")
}

fn is_css_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}
