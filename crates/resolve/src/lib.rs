//! Fuzzy re-resolution for selectors that stopped matching exactly.
//!
//! Candidate discovery is recall-oriented and capped; scoring is
//! precision-oriented and normalized to 0-100 against the evidence the
//! remembered selector actually carries.

mod config;
mod finder;
mod fuzzy;
mod resolver;
mod scorer;

pub use config::ResolverConfig;
pub use finder::{find_candidates, MAX_CANDIDATES};
pub use fuzzy::{similarity, MIN_SIMILARITY_LEN};
pub use resolver::Resolver;
pub use scorer::score;
