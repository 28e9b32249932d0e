//! Hand-written lexer. Grounded in `original_source/mel_parser.py`'s token set; no
//! lexer-generator or combinator library is used, matching the rest of this workspace's
//! preference for direct, un-clever implementations over macro-driven ones.

use crate::{
    error::LexError,
    token::{Token, TokenKind},
};

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    row: u32,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self { source: source.as_bytes(), pos: 0, row: 1 }
    }

    /// Tokenises the entire input, returning every token including a trailing `Eof`.
    /// Comments (`/* ... */` and `// ...`) are discarded here, never handed to the
    /// parser as tokens.
    ///
    /// # Errors
    /// Returns the first unrecognised character or unterminated literal encountered.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let row = self.row;
            let Some(c) = self.peek() else {
                tokens.push(Token { kind: TokenKind::Eof, row });
                return Ok(tokens);
            };

            let kind = if c.is_ascii_digit() {
                self.lex_number()?
            } else if c == b'\'' {
                self.lex_char_literal()?
            } else if c == b'"' {
                self.lex_str_literal()?
            } else if c.is_ascii_alphabetic() || c == b'_' {
                self.lex_ident_or_keyword()
            } else {
                self.lex_operator_or_punct()?
            };
            tokens.push(Token { kind, row });
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.row += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.advance();
                    self.advance();
                    while !(self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/')) {
                        if self.advance().is_none() {
                            break;
                        }
                    }
                    self.advance();
                    self.advance();
                }
                _ => return,
            }
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let row = self.row;

        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.advance();
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.advance();
            }
            let text = std::str::from_utf8(&self.source[start + 2..self.pos]).unwrap();
            let value = i32::from_str_radix(text, 16)
                .map_err(|_| LexError { message: format!("invalid hex literal `{text}`"), row })?;
            return Ok(TokenKind::IntLiteral(value));
        }

        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'0'..=b'7')) {
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'7')) {
                self.advance();
            }
            let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
            let value = i32::from_str_radix(text, 8)
                .map_err(|_| LexError { message: format!("invalid octal literal `{text}`"), row })?;
            return Ok(TokenKind::IntLiteral(value));
        }

        let mut is_float = false;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.advance();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        if is_float {
            let value = text.parse::<f64>().map_err(|_| LexError { message: format!("invalid float literal `{text}`"), row })?;
            Ok(TokenKind::FloatLiteral(value))
        } else {
            let value = text.parse::<i32>().map_err(|_| LexError { message: format!("invalid int literal `{text}`"), row })?;
            Ok(TokenKind::IntLiteral(value))
        }
    }

    fn lex_escape(&mut self, row: u32) -> Result<char, LexError> {
        self.advance();
        let c = self.advance().ok_or(LexError { message: "unterminated escape sequence".to_owned(), row })?;
        Ok(match c {
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'0' => '\0',
            b'\\' => '\\',
            b'\'' => '\'',
            b'"' => '"',
            other => other as char,
        })
    }

    fn lex_char_literal(&mut self) -> Result<TokenKind, LexError> {
        let row = self.row;
        self.advance();
        let ch = if self.peek() == Some(b'\\') {
            self.lex_escape(row)?
        } else {
            let c = self.advance().ok_or(LexError { message: "unterminated char literal".to_owned(), row })?;
            c as char
        };
        if self.peek() != Some(b'\'') {
            return Err(LexError { message: "unterminated char literal".to_owned(), row });
        }
        self.advance();
        Ok(TokenKind::CharLiteral(ch as u16))
    }

    fn lex_str_literal(&mut self) -> Result<TokenKind, LexError> {
        let row = self.row;
        self.advance();
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError { message: "unterminated string literal".to_owned(), row }),
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => value.push(self.lex_escape(row)?),
                Some(_) => value.push(self.advance().unwrap() as char),
            }
        }
        Ok(TokenKind::StrLiteral(value))
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        match text {
            "int" => TokenKind::KwInt,
            "float" => TokenKind::KwFloat,
            "char" => TokenKind::KwChar,
            "string" => TokenKind::KwString,
            "void" => TokenKind::KwVoid,
            "if" => TokenKind::KwIf,
            "else" => TokenKind::KwElse,
            "while" => TokenKind::KwWhile,
            "for" => TokenKind::KwFor,
            "return" => TokenKind::KwReturn,
            _ => TokenKind::Ident(text.to_owned()),
        }
    }

    fn lex_operator_or_punct(&mut self) -> Result<TokenKind, LexError> {
        let row = self.row;
        let c = self.advance().expect("checked non-empty by caller");
        let two_char = |this: &mut Self, second: u8, one: TokenKind, two: TokenKind| {
            if this.peek() == Some(second) {
                this.advance();
                two
            } else {
                one
            }
        };
        Ok(match c {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'>' => two_char(self, b'=', TokenKind::Gt, TokenKind::Ge),
            b'<' => two_char(self, b'=', TokenKind::Lt, TokenKind::Le),
            b'=' => two_char(self, b'=', TokenKind::Assign, TokenKind::EqEq),
            b'!' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::Ne
            }
            b'&' if self.peek() == Some(b'&') => {
                self.advance();
                TokenKind::AndAnd
            }
            b'|' if self.peek() == Some(b'|') => {
                self.advance();
                TokenKind::OrOr
            }
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            other => {
                return Err(LexError { message: format!("unexpected character `{}`", other as char), row });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_decl_with_init() {
        let k = kinds("int a = 5;");
        assert_eq!(
            k,
            vec![
                TokenKind::KwInt,
                TokenKind::Ident("a".to_owned()),
                TokenKind::Assign,
                TokenKind::IntLiteral(5),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_hex_and_octal() {
        assert_eq!(kinds("0x1F"), vec![TokenKind::IntLiteral(31), TokenKind::Eof]);
        assert_eq!(kinds("017"), vec![TokenKind::IntLiteral(15), TokenKind::Eof]);
    }

    #[test]
    fn lexes_float_with_exponent() {
        assert_eq!(kinds("1e3"), vec![TokenKind::FloatLiteral(1000.0), TokenKind::Eof]);
    }

    #[test]
    fn lexes_char_and_string_literals() {
        assert_eq!(kinds("'b'"), vec![TokenKind::CharLiteral(b'b' as u16), TokenKind::Eof]);
        assert_eq!(
            kinds("\"ab\""),
            vec![TokenKind::StrLiteral("ab".to_owned()), TokenKind::Eof]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(kinds("1 /* two */ + // trailing\n 2"), vec![
            TokenKind::IntLiteral(1),
            TokenKind::Plus,
            TokenKind::IntLiteral(2),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(Lexer::new("\"abc").tokenize().is_err());
    }
}
