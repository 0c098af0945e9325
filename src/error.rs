use thiserror::Error;

/// Every failure the lexer, parser, evaluator, matrix engine or
/// differentiator can report. All of them abort the operation that raised
/// them; nothing is partially recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unrecognized input '{found}' at position {position}")]
    Lex { found: String, position: usize },

    #[error("parse error at position {position}: {message}")]
    Parse { message: String, position: usize },

    #[error("unable to locate function '{0}' in context")]
    UnresolvedFunction(String),

    #[error("function '{0}' already exists in context")]
    DuplicateFunction(String),

    #[error("function '{name}' expects {expected} argument(s) but got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid matrix shape: {0}")]
    MatrixShape(String),

    #[error("matrix is singular and has no inverse")]
    SingularMatrix,

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("expression nesting exceeds the limit of {limit}")]
    DepthExceeded { limit: usize },

    #[error("{0} cannot be evaluated to a value")]
    NotScalar(&'static str),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>, position: usize) -> Self {
        Error::Parse {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn arithmetic(message: impl Into<String>) -> Self {
        Error::Arithmetic(message.into())
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Error::MatrixShape(message.into())
    }

    /// True for the name-resolution family: unknown or duplicate functions.
    pub fn is_name_error(&self) -> bool {
        matches!(
            self,
            Error::UnresolvedFunction(_) | Error::DuplicateFunction(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
