//! The unified error hierarchy spanning every pipeline stage, hand-rolled in the style
//! of [`ReplError`] in the teacher workspace: one variant per stage, manual `Display`,
//! manual `std::error::Error`, and a `From` impl per variant so `?` composes without
//! pulling in a derive-macro error crate.

use std::fmt;

/// A lexical failure: an unrecognised character or an unterminated literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub row: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.message, self.row)
    }
}

/// A parse failure: an unexpected token or an incomplete production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub row: Option<u32>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "{} (line {row})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A semantic-analysis failure. This is the single taxonomy kind named by the data
/// model: every rejection in `analyzer::check` — unknown type, undeclared identifier,
/// duplicate declaration, arity mismatch, non-convertible type, inapplicable operator,
/// return outside function, nested function declaration, unknown literal kind, array
/// syntax used — surfaces as one of these, distinguished only by `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    pub message: String,
    pub row: Option<u32>,
}

impl SemanticError {
    #[must_use]
    pub fn new(message: impl Into<String>, row: Option<u32>) -> Self {
        Self { message: message.into(), row }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "{} (line: {row})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for SemanticError {}

/// Top-level error type for the whole pipeline, separating failures by stage so callers
/// can handle exit codes and diagnostics without string matching.
#[derive(Debug, Clone)]
pub enum MsilcError {
    Lex(LexError),
    Parse(ParseError),
    Semantic(SemanticError),
}

impl fmt::Display for MsilcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(error) => write!(f, "lex error: {error}"),
            Self::Parse(error) => write!(f, "parse error: {error}"),
            Self::Semantic(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for MsilcError {}

impl From<LexError> for MsilcError {
    fn from(error: LexError) -> Self {
        Self::Lex(error)
    }
}

impl From<ParseError> for MsilcError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<SemanticError> for MsilcError {
    fn from(error: SemanticError) -> Self {
        Self::Semantic(error)
    }
}
