use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnchorError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    #[error("unknown note: {0}")]
    UnknownNote(String),

    #[error("note already registered: {0}")]
    DuplicateNote(String),

    #[error("no selector could be generated for the element")]
    NotAnchorable,
}
