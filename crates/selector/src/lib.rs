//! Selector-string toolbox: lossy structural parsing, dynamic-token
//! classification, validation/sanitization, durability scoring, and
//! generation of new selectors for page elements.

mod confidence;
mod dynamic;
mod generate;
mod parts;
mod validate;

pub use confidence::confidence;
pub use dynamic::is_dynamic_token;
pub use generate::{GeneratorConfig, SelectorGenerator};
pub use parts::{parse, AttrExpectation, SelectorParts};
pub use validate::{sanitize, validate, Validation, MAX_SELECTOR_LEN};
