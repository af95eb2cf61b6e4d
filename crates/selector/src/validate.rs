//! Selector validation and sanitization.
//!
//! Selector strings are persisted and later fed straight back into query
//! machinery, so anything that could act as an injection vector or crash the
//! resolution path is rejected before it is stored or evaluated.

use once_cell::sync::Lazy;
use pagemark_dom::check_selector_syntax;
use regex::Regex;
use serde::Serialize;

/// Hard cap on persisted selector length.
pub const MAX_SELECTOR_LEN: usize = 1000;

/// Literal fragments that have no business inside a CSS selector.
const BLOCKED_FRAGMENTS: &[&str] = &[
    "<script",
    "javascript:",
    "vbscript:",
    "expression(",
    "behavior:",
    "@import",
];

/// `onclick=`-style inline handler assignments.
static INLINE_HANDLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bon[a-z]+\s*=").expect("static pattern"));

/// `url(javascript:...)` and friends.
static URL_SCRIPT_SCHEME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\s*\(\s*['"]?\s*(?:javascript|data|vbscript):"#).expect("static pattern")
});

/// Outcome of [`validate`]. `reason` is set iff the selector was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Validation {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Check a raw selector string. Never panics, never propagates: malformed
/// syntax and security-pattern hits both come back as a rejection with a
/// reason.
#[must_use]
pub fn validate(raw: &str) -> Validation {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Validation::rejected("empty selector");
    }
    if trimmed.chars().count() > MAX_SELECTOR_LEN {
        return Validation::rejected(format!("selector exceeds {MAX_SELECTOR_LEN} characters"));
    }
    let lowered = trimmed.to_lowercase();
    for fragment in BLOCKED_FRAGMENTS {
        if lowered.contains(fragment) {
            return Validation::rejected(format!("contains blocked pattern {fragment:?}"));
        }
    }
    if INLINE_HANDLER.is_match(trimmed) {
        return Validation::rejected("contains inline event handler pattern");
    }
    if URL_SCRIPT_SCHEME.is_match(trimmed) {
        return Validation::rejected("contains script-scheme url()");
    }
    if let Err(err) = check_selector_syntax(trimmed) {
        return Validation::rejected(err.to_string());
    }
    Validation::ok()
}

/// Trimmed selector iff it validates, else `None`. This is the only form in
/// which raw external selector strings may reach persistence or queries.
#[must_use]
pub fn sanitize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    validate(trimmed).valid.then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_script_injection_shapes() {
        for bad in [
            "<script>alert(1)</script>",
            "javascript:alert(1)",
            "onclick=alert(1)",
            "div[style] expression(alert(1))",
            "behavior: url(evil.htc)",
            "@import url(evil.css)",
            "url( 'javascript:alert(1)' )",
            "url(\"data:text/html,x\")",
        ] {
            let v = validate(bad);
            assert!(!v.valid, "{bad:?} must be rejected");
            assert!(v.reason.is_some());
        }
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(!validate("").valid);
        assert!(!validate("   \t\n").valid);
        let long = "a".repeat(MAX_SELECTOR_LEN + 1);
        assert!(!validate(&long).valid);
        let exactly = "a".repeat(MAX_SELECTOR_LEN);
        assert!(validate(&exactly).valid);
    }

    #[test]
    fn rejects_syntax_errors_with_reason() {
        let v = validate("div[[broken");
        assert!(!v.valid);
        assert!(v.reason.unwrap().contains("syntax"));
    }

    #[test]
    fn accepts_ordinary_selectors() {
        for good in [
            "#valid-id",
            "ul > li.item:nth-of-type(2)",
            "[data-testid=\"save-button\"]",
            "nav a",
            "main .note-target",
        ] {
            assert_eq!(validate(good), Validation::ok(), "{good:?}");
        }
    }

    #[test]
    fn handler_pattern_does_not_catch_hyphenated_attrs() {
        // "on-click" is not an inline handler assignment.
        assert!(validate("[data-on-click=\"go\"]").valid);
        assert!(validate("[action=\"save\"]").valid);
    }

    #[test]
    fn sanitize_trims_valid_and_drops_invalid() {
        assert_eq!(sanitize("  #valid-id  "), Some("#valid-id".to_string()));
        assert_eq!(sanitize("javascript:alert(1)"), None);
        assert_eq!(sanitize("   "), None);
    }
}
