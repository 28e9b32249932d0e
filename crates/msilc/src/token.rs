//! Token kinds produced by the lexer and consumed by the parser.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    IntLiteral(i32),
    FloatLiteral(f64),
    StrLiteral(String),
    CharLiteral(u16),
    Ident(String),

    // Type keywords
    KwInt,
    KwFloat,
    KwChar,
    KwString,
    KwVoid,

    // Statement keywords
    KwIf,
    KwElse,
    KwWhile,
    KwFor,
    KwReturn,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Gt,
    Lt,
    Ge,
    Le,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    Assign,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntLiteral(v) => write!(f, "int literal {v}"),
            Self::FloatLiteral(v) => write!(f, "float literal {v}"),
            Self::StrLiteral(v) => write!(f, "string literal {v:?}"),
            Self::CharLiteral(v) => write!(f, "char literal {v:?}"),
            Self::Ident(name) => write!(f, "identifier `{name}`"),
            Self::Eof => write!(f, "end of input"),
            other => write!(f, "`{}`", other.spelling()),
        }
    }
}

impl TokenKind {
    fn spelling(&self) -> &'static str {
        match self {
            Self::KwInt => "int",
            Self::KwFloat => "float",
            Self::KwChar => "char",
            Self::KwString => "string",
            Self::KwVoid => "void",
            Self::KwIf => "if",
            Self::KwElse => "else",
            Self::KwWhile => "while",
            Self::KwFor => "for",
            Self::KwReturn => "return",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::EqEq => "==",
            Self::Ne => "!=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Assign => "=",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            _ => "",
        }
    }

    /// The declared type name this keyword spells, if it is one of the five primitive
    /// type keywords.
    #[must_use]
    pub fn as_type_name(&self) -> Option<&'static str> {
        match self {
            Self::KwInt => Some("int"),
            Self::KwFloat => Some("float"),
            Self::KwChar => Some("char"),
            Self::KwString => Some("string"),
            Self::KwVoid => Some("void"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub row: u32,
}
