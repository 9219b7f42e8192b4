use thiserror::Error;

/// Errors produced while reading chatplan DSL text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text is not well-formed; carries the grammar's position report.
    #[error("parse error: {0}")]
    Syntax(String),

    #[error("parse error: unknown attribute '{attribute}' on {element}")]
    UnknownAttribute {
        element: &'static str,
        attribute: String,
    },

    #[error("parse error: {element} is not allowed in {place}")]
    Misplaced {
        element: &'static str,
        place: &'static str,
    },

    #[error("parse error: {element} takes at most {max} unnamed value(s), got {found}")]
    TooManyValues {
        element: &'static str,
        max: usize,
        found: usize,
    },

    #[error("parse error: attribute '{attribute}' on {element} needs a value")]
    MissingValue {
        element: &'static str,
        attribute: String,
    },

    #[error("parse error: context without a name")]
    UnnamedContext,

    #[error("parse error: {0} takes no block")]
    UnexpectedBlock(&'static str),

    #[error("parse error: loop must be a non-negative integer, got '{0}'")]
    InvalidLoop(String),
}
