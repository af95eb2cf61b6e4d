use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors raised by the selector query engine.
///
/// Malformed page markup is never an error (the HTML loader recovers), but a
/// malformed selector is: callers that persist selectors rely on `Syntax`
/// to reject garbage before it reaches a live document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("selector syntax error: {0}")]
    Syntax(String),
}
