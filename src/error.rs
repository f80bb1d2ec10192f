use thiserror::Error;

use crate::types::Lit;

#[derive(Debug, Error)]
pub enum Error {
    /// A literal equal to zero, or one without a negation, inside a clause body.
    #[error("invalid literal {lit} in clause {clause}")]
    InvalidLiteral { clause: usize, lit: Lit },

    #[error("missing `p cnf` header")]
    MissingHeader,

    #[error("malformed header: {0:?}")]
    MalformedHeader(String),

    #[error("line {line}: invalid token {token:?}")]
    InvalidToken { line: usize, token: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
