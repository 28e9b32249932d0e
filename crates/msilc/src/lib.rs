//! A compiler front-end for a small, statically-typed C-like language: lexer and
//! recursive-descent parser, semantic analyzer, and a textual CIL/MSIL-style code
//! emitter.
//!
//! Pipeline: `source text → lexer → parser → AST → analyzer (in-place annotation) →
//! emitter → listing`. [`compile`] drives the whole thing.

mod analyzer;
mod ast;
mod emitter;
mod error;
mod lexer;
mod parser;
mod prelude;
mod scope;
mod token;
mod types;

pub use crate::{
    analyzer::check,
    ast::{AstKind, AstNode, LiteralValue},
    emitter::emit_program,
    error::{LexError, MsilcError, ParseError, SemanticError},
    lexer::Lexer,
    parser::Parser,
    prelude::bootstrap,
    scope::{IdentDesc, IdentHandle, IdentScope, ScopeHandle, ScopeKind},
    token::{Token, TokenKind},
    types::{BaseType, BinOp, TypeDesc, can_convert, convertible_targets},
};

/// Runs the whole pipeline on `source`, returning the emitted listing.
///
/// # Errors
/// Returns the first lex, parse, or semantic failure encountered, in that order.
pub fn compile(source: &str) -> Result<String, MsilcError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut ast = Parser::new(tokens).parse_program()?;
    let root = prelude::bootstrap();
    check(&mut ast, &root)?;
    Ok(emit_program(&ast))
}

/// Runs lexing, parsing, and semantic checking only, returning the annotated AST without
/// emitting a listing. Used by the CLI's pre-/post-check AST dumps.
///
/// # Errors
/// Returns the first lex, parse, or semantic failure encountered, in that order.
pub fn check_source(source: &str) -> Result<AstNode, MsilcError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut ast = Parser::new(tokens).parse_program()?;
    let root = prelude::bootstrap();
    check(&mut ast, &root)?;
    Ok(ast)
}

/// Parses `source` without running semantic checks, for the CLI's pre-check AST dump.
///
/// # Errors
/// Returns the first lex or parse failure encountered.
pub fn parse_source(source: &str) -> Result<AstNode, MsilcError> {
    let tokens = Lexer::new(source).tokenize()?;
    Ok(Parser::new(tokens).parse_program()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_simple_global_decl() {
        let listing = compile("int a = 5;").unwrap();
        assert!(listing.contains(".assembly program"));
        assert!(listing.contains("stsfld int32 Program::_gv0"));
    }

    #[test]
    fn reports_semantic_error_for_unknown_function() {
        let err = compile("foo(1);").unwrap_err();
        assert!(matches!(err, MsilcError::Semantic(_)));
        assert!(err.to_string().contains("foo"));
    }

    #[test]
    fn reports_parse_error_for_malformed_source() {
        let err = compile("int a = ;").unwrap_err();
        assert!(matches!(err, MsilcError::Parse(_)));
    }
}
