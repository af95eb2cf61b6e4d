use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Flat structural decomposition of a selector string.
///
/// This is the fuzzy-matching view, not a query AST: combinators and
/// grouping are deliberately ignored, only the leading tag and every id,
/// class, attribute and first positional index are pulled out. Derived on
/// demand, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectorParts {
    pub tag_name: Option<String>,
    pub id: Option<String>,
    pub classes: BTreeSet<String>,
    pub attributes: BTreeMap<String, AttrExpectation>,
    pub nth_child: Option<u32>,
}

/// What an attribute selector asks of a candidate: mere presence
/// (`[disabled]`) or an exact value (`[data-role="pin"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrExpectation {
    Present,
    Value(String),
}

impl SelectorParts {
    /// True when nothing usable was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tag_name.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.nth_child.is_none()
    }
}

/// Decompose `selector` into [`SelectorParts`].
///
/// Never fails: malformed input yields whatever parts could be extracted,
/// absent pieces stay `None`/empty. Extraction rules:
///
/// - a bare identifier at the very start becomes `tag_name`
/// - the first `#token` becomes `id`
/// - every `.token` joins `classes`
/// - every `[name]` / `[name="value"]` joins `attributes`
/// - the first `:nth-child(n)` or `:nth-of-type(n)` becomes `nth_child`
#[must_use]
pub fn parse(selector: &str) -> SelectorParts {
    let mut parts = SelectorParts::default();
    let chars: Vec<char> = selector.trim().chars().collect();
    let mut pos = 0;

    if chars.first().copied().is_some_and(is_ident_char) {
        let tag = read_ident(&chars, &mut pos);
        parts.tag_name = Some(tag.to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                let id = read_ident(&chars, &mut pos);
                if !id.is_empty() && parts.id.is_none() {
                    parts.id = Some(id);
                }
            }
            '.' => {
                pos += 1;
                let class = read_ident(&chars, &mut pos);
                if !class.is_empty() {
                    parts.classes.insert(class);
                }
            }
            '[' => {
                pos += 1;
                read_attribute(&chars, &mut pos, &mut parts.attributes);
            }
            ':' => {
                pos += 1;
                read_pseudo(&chars, &mut pos, &mut parts.nth_child);
            }
            _ => pos += 1,
        }
    }
    parts
}

fn read_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while chars.get(*pos).copied().is_some_and(is_ident_char) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn read_attribute(
    chars: &[char],
    pos: &mut usize,
    attributes: &mut BTreeMap<String, AttrExpectation>,
) {
    skip_whitespace(chars, pos);
    let name = read_ident(chars, pos).to_ascii_lowercase();
    skip_whitespace(chars, pos);
    if name.is_empty() {
        skip_past(chars, pos, ']');
        return;
    }
    match chars.get(*pos) {
        Some(']') => {
            *pos += 1;
            attributes.insert(name, AttrExpectation::Present);
        }
        Some('=') => {
            *pos += 1;
            skip_whitespace(chars, pos);
            let value = read_attr_value(chars, pos);
            attributes.insert(name, AttrExpectation::Value(value));
            skip_past(chars, pos, ']');
        }
        _ => {
            // Unterminated or unsupported operator; keep what we learned.
            attributes.insert(name, AttrExpectation::Present);
            skip_past(chars, pos, ']');
        }
    }
}

fn read_attr_value(chars: &[char], pos: &mut usize) -> String {
    match chars.get(*pos) {
        Some(&quote @ ('"' | '\'')) => {
            *pos += 1;
            let start = *pos;
            while chars.get(*pos).is_some_and(|c| *c != quote) {
                *pos += 1;
            }
            let value: String = chars[start..*pos].iter().collect();
            if *pos < chars.len() {
                *pos += 1;
            }
            value
        }
        _ => {
            let start = *pos;
            while chars.get(*pos).is_some_and(|c| *c != ']' && !c.is_whitespace()) {
                *pos += 1;
            }
            chars[start..*pos].iter().collect()
        }
    }
}

fn read_pseudo(chars: &[char], pos: &mut usize, nth_child: &mut Option<u32>) {
    let name = read_ident(chars, pos);
    // Arguments of other pseudo-classes stay visible to the main scan, so
    // `:not(.aside)` still contributes the class token.
    if !matches!(name.as_str(), "nth-child" | "nth-of-type") {
        return;
    }
    if chars.get(*pos) != Some(&'(') {
        return;
    }
    *pos += 1;
    let digits_start = *pos;
    while chars.get(*pos).is_some_and(char::is_ascii_digit) {
        *pos += 1;
    }
    let digits: String = chars[digits_start..*pos].iter().collect();
    skip_past(chars, pos, ')');
    if nth_child.is_none() {
        if let Ok(n) = digits.parse() {
            *nth_child = Some(n);
        }
    }
}

fn skip_whitespace(chars: &[char], pos: &mut usize) {
    while chars.get(*pos).is_some_and(|c| c.is_whitespace()) {
        *pos += 1;
    }
}

fn skip_past(chars: &[char], pos: &mut usize, end: char) {
    while let Some(c) = chars.get(*pos) {
        *pos += 1;
        if *c == end {
            return;
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
