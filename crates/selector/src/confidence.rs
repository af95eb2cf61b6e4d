//! Durability estimate for a selector string, with no document access.
//!
//! Advisory only: resolution never consults this number. It exists so the
//! surrounding product can rank or warn about brittle selectors. Weights are
//! tuning constants; tests pin the relative ordering of selector shapes, not
//! the exact values.

use crate::dynamic::is_dynamic_token;
use crate::parts::{self, SelectorParts};

/// Attribute selectors survive re-renders best.
const BASE_ATTRIBUTE: i32 = 70;
const BASE_ID: i32 = 60;
const BASE_CLASS: i32 = 45;
const BASE_TAG: i32 = 30;
/// `data-*` / `aria-*` attributes signal deliberate, stable markup.
const BONUS_STABLE_ATTRIBUTE: i32 = 10;
/// Each combinator couples the selector to more of the page structure.
const PENALTY_PER_COMBINATOR: i32 = 5;
/// Positional pseudo-selectors break on any reordering.
const PENALTY_POSITIONAL: i32 = 15;
/// A machine-generated id/class token is already on borrowed time.
const PENALTY_DYNAMIC_TOKEN: i32 = 25;

/// Score a selector string's expected durability on a 0-100 scale.
///
/// ```
/// use pagemark_selector::confidence;
///
/// assert!(confidence("[data-testid=\"save\"]") > confidence("#save"));
/// assert!(confidence("#save") > confidence("div.save"));
/// assert!(confidence("div.save") > confidence("div>div>div>div>span"));
/// ```
#[must_use]
pub fn confidence(selector: &str) -> u8 {
    let parts = parts::parse(selector);
    let mut score = base_score(&parts);
    if score == 0 {
        return 0;
    }
    if parts
        .attributes
        .keys()
        .any(|name| name.starts_with("data-") || name.starts_with("aria-"))
    {
        score += BONUS_STABLE_ATTRIBUTE;
    }
    score -= PENALTY_PER_COMBINATOR * combinator_count(selector) as i32;
    if parts.nth_child.is_some() {
        score -= PENALTY_POSITIONAL;
    }
    if has_dynamic_token(&parts) {
        score -= PENALTY_DYNAMIC_TOKEN;
    }
    score.clamp(0, 100) as u8
}

fn base_score(parts: &SelectorParts) -> i32 {
    if !parts.attributes.is_empty() {
        BASE_ATTRIBUTE
    } else if parts.id.is_some() {
        BASE_ID
    } else if !parts.classes.is_empty() {
        BASE_CLASS
    } else if parts.tag_name.is_some() {
        BASE_TAG
    } else {
        0
    }
}

fn has_dynamic_token(parts: &SelectorParts) -> bool {
    parts
        .id
        .as_deref()
        .is_some_and(is_dynamic_token)
        || parts.classes.iter().any(|c| is_dynamic_token(c))
}

/// Count combinators from the raw string: explicit `>` plus whitespace gaps
/// between compound selectors. Bracketed and quoted regions are opaque, and
/// whitespace around an explicit combinator is not counted twice.
fn combinator_count(selector: &str) -> usize {
    let mut count = 0;
    let mut pending_gap = false;
    let mut suppress_gap = true;
    let mut depth_bracket = 0u32;
    let mut quote: Option<char> = None;
    for c in selector.trim().chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '[' => {
                if pending_gap {
                    count += 1;
                }
                pending_gap = false;
                suppress_gap = false;
                depth_bracket += 1;
            }
            ']' => depth_bracket = depth_bracket.saturating_sub(1),
            '"' | '\'' if depth_bracket > 0 => quote = Some(c),
            _ if depth_bracket > 0 => {}
            '>' => {
                count += 1;
                pending_gap = false;
                suppress_gap = true;
            }
            ',' => {
                pending_gap = false;
                suppress_gap = true;
            }
            c if c.is_whitespace() => {
                if !suppress_gap {
                    pending_gap = true;
                }
            }
            _ => {
                if pending_gap {
                    count += 1;
                }
                pending_gap = false;
                suppress_gap = false;
            }
        }
    }
    count
}
