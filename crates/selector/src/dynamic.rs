//! Classification of id/class tokens as machine-generated.
//!
//! A selector built on a framework-churned token works today and breaks on
//! the next render, so the generator refuses such tokens and the confidence
//! estimator discounts them. Classification is a pure function of the token
//! string; it never looks at the live document.

use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum length before a bare alphanumeric token is considered as a
/// possible hash blob.
const HASH_MIN_LEN: usize = 8;
/// A hash blob needs at least this many digits...
const HASH_MIN_DIGITS: usize = 3;
/// ...interleaved with letters at least this many times. A plain trailing
/// counter ("section123") stays classified as human-written.
const HASH_MIN_TRANSITIONS: usize = 3;
/// Styled-runtime suffixes shorter than this are treated as words.
const STYLED_MIN_TAIL: usize = 5;

/// Framework counter ids: `ember123`, `ng-45`, `radix-7`.
static FRAMEWORK_COUNTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:ember|ng|vue|svelte|radix|headlessui)-?\d+$").expect("static pattern")
});

/// React `useId` output: `:r0:`, `:r1b:`.
static REACT_USEID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^:r[0-9a-z]+:$").expect("static pattern"));

/// Hyphen-separated hex groups, UUID-like. A digit requirement is applied
/// separately so hex-spellable words ("cafe-face") are not flagged.
static HEX_GROUPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[0-9a-f]{4,}(?:-[0-9a-f]{2,})+$").expect("static pattern"));

/// Styled-runtime class prefixes: `css-1q2w3e`, `sc-bdfBwQ`, `jss42`.
static STYLED_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:css|sc|jss|emotion)-?([A-Za-z0-9]+)$").expect("static pattern")
});

/// Decide whether an id or class token looks autogenerated and therefore
/// unstable across renders. Used identically for id values and class tokens.
#[must_use]
pub fn is_dynamic_token(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if FRAMEWORK_COUNTER.is_match(token) || REACT_USEID.is_match(token) {
        return true;
    }
    if HEX_GROUPS.is_match(token) && token.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    if let Some(caps) = STYLED_PREFIX.captures(token) {
        if let Some(tail) = caps.get(1) {
            if looks_hashed(tail.as_str()) {
                return true;
            }
        }
    }
    looks_like_hash_blob(token)
}

/// Short styled-runtime suffix check: any digit, or enough mixed-case noise.
fn looks_hashed(tail: &str) -> bool {
    if tail.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    tail.len() >= STYLED_MIN_TAIL
        && tail.chars().any(|c| c.is_ascii_uppercase())
        && tail.chars().any(|c| c.is_ascii_lowercase())
}

fn looks_like_hash_blob(token: &str) -> bool {
    if token.len() < HASH_MIN_LEN || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < HASH_MIN_DIGITS {
        return false;
    }
    let transitions = token
        .chars()
        .zip(token.chars().skip(1))
        .filter(|(a, b)| a.is_ascii_digit() != b.is_ascii_digit())
        .count();
    transitions >= HASH_MIN_TRANSITIONS
}
