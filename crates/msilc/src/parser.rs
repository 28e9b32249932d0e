//! Hand-written recursive-descent parser. Grounded in `original_source/mel_parser.py`'s
//! grammar, adapted to the production list in `SPEC_FULL.md` §4.6. One method per
//! grammar production, each returning a boxed [`AstNode`]; no parser-generator or
//! combinator library is used.

use crate::{
    ast::{AstKind, AstNode, LiteralValue},
    error::ParseError,
    token::{Token, TokenKind},
    types::BinOp,
};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses the whole token stream as a program: `prog -> state*`.
    ///
    /// # Errors
    /// Returns the first unexpected token encountered.
    pub fn parse_program(mut self) -> Result<AstNode, ParseError> {
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        Ok(AstNode::new(AstKind::StatementList { stmts, program: true }))
    }

    fn current(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn current_row(&self) -> u32 {
        self.tokens[self.pos].row
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.current() == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError {
                message: format!("expected {kind}, found {}", self.current()),
                row: Some(self.current_row()),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<(String, u32), ParseError> {
        let row = self.current_row();
        match self.current().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, row))
            }
            other => Err(ParseError { message: format!("expected identifier, found {other}"), row: Some(row) }),
        }
    }

    fn type_name_keyword(&self) -> Option<&'static str> {
        self.current().as_type_name()
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> Result<AstNode, ParseError> {
        if self.type_name_keyword().is_some() {
            return self.parse_decl_or_func_decl();
        }
        match self.current() {
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwWhile => self.parse_while(),
            TokenKind::KwFor => self.parse_for(),
            TokenKind::KwReturn => {
                let row = self.current_row();
                self.advance();
                let value = self.parse_expr()?;
                self.expect(&TokenKind::Semicolon)?;
                Ok(AstNode::new(AstKind::Return { value: Box::new(value) }).at_row(row))
            }
            TokenKind::LBracket => {
                let placeholder = self.parse_array_placeholder()?;
                self.expect(&TokenKind::Semicolon)?;
                Ok(placeholder)
            }
            _ => {
                let (name, row) = self.expect_ident()?;
                let ident = AstNode::new(AstKind::Ident { name }).at_row(row);
                let stmt = if self.at(&TokenKind::LParen) {
                    self.parse_func_call(ident, row)?
                } else {
                    self.expect(&TokenKind::Assign)?;
                    let val = self.parse_expr()?;
                    AstNode::new(AstKind::Assign { var: Box::new(ident), val: Box::new(val) }).at_row(row)
                };
                self.expect(&TokenKind::Semicolon)?;
                Ok(stmt)
            }
        }
    }

    fn parse_block(&mut self) -> Result<AstNode, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            stmts.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(AstNode::new(AstKind::StatementList { stmts, program: false }))
    }

    fn parse_decl_type(&mut self) -> Result<AstNode, ParseError> {
        let row = self.current_row();
        let name = self.type_name_keyword().ok_or_else(|| ParseError {
            message: format!("expected a type name, found {}", self.current()),
            row: Some(row),
        })?;
        self.advance();
        Ok(AstNode::new(AstKind::DeclType { name: name.to_owned() }).at_row(row))
    }

    /// Parses a `decl_type ident` pair without deciding yet whether this is a variable
    /// declaration or a function declaration — the two share this prefix and only
    /// diverge at the token following the identifier (`(` starts a function).
    fn parse_decl_head(&mut self) -> Result<(AstNode, AstNode), ParseError> {
        let row = self.current_row();
        let decl_type = self.parse_decl_type()?;
        let (name, _) = self.expect_ident()?;
        let ident = AstNode::new(AstKind::Ident { name }).at_row(row);
        Ok((decl_type, ident))
    }

    fn parse_decl(&mut self) -> Result<AstNode, ParseError> {
        let row = self.current_row();
        let (decl_type, ident) = self.parse_decl_head()?;
        let init = if self.at(&TokenKind::Assign) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(AstNode::new(AstKind::Decl { decl_type: Box::new(decl_type), ident: Box::new(ident), init }).at_row(row))
    }

    /// Dispatches on the token after `decl_type ident`: `(` means this is a top-level
    /// function declaration (`<type> name(params) { body }`, matching the surface
    /// syntax in the worked examples), anything else is an ordinary variable
    /// declaration statement terminated by `;`.
    fn parse_decl_or_func_decl(&mut self) -> Result<AstNode, ParseError> {
        let row = self.current_row();
        let (func_type, name_node) = self.parse_decl_head()?;
        if self.at(&TokenKind::LParen) {
            self.advance();
            let params = self.parse_params()?;
            self.expect(&TokenKind::RParen)?;
            let body = self.parse_block()?;
            return Ok(AstNode::new(AstKind::FuncDecl {
                func_type: Box::new(func_type),
                name: Box::new(name_node),
                params: Box::new(params),
                body: Box::new(body),
            })
            .at_row(row));
        }
        let init = if self.at(&TokenKind::Assign) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let decl = AstNode::new(AstKind::Decl { decl_type: Box::new(func_type), ident: Box::new(name_node), init }).at_row(row);
        self.expect(&TokenKind::Semicolon)?;
        Ok(decl)
    }

    fn parse_params(&mut self) -> Result<AstNode, ParseError> {
        let row = self.current_row();
        let mut params = Vec::new();
        if self.type_name_keyword().is_some() {
            params.push(self.parse_decl()?);
            while self.at(&TokenKind::Comma) {
                self.advance();
                params.push(self.parse_decl()?);
            }
        }
        Ok(AstNode::new(AstKind::DeclList { params }).at_row(row))
    }

    fn parse_func_call(&mut self, name: AstNode, row: u32) -> Result<AstNode, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.at(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.at(&TokenKind::Comma) {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.expect(&TokenKind::RParen)?;
        let args = AstNode::new(AstKind::ValueList { args }).at_row(row);
        Ok(AstNode::new(AstKind::FuncCall { name: Box::new(name), args: Box::new(args) }).at_row(row))
    }

    fn parse_if(&mut self) -> Result<AstNode, ParseError> {
        let row = self.current_row();
        self.expect(&TokenKind::KwIf)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.at(&TokenKind::KwElse) {
            self.advance();
            Some(Box::new(self.parse_block()?))
        } else {
            None
        };
        Ok(AstNode::new(AstKind::If { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch }).at_row(row))
    }

    fn parse_while(&mut self) -> Result<AstNode, ParseError> {
        let row = self.current_row();
        self.expect(&TokenKind::KwWhile)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(AstNode::new(AstKind::While { cond: Box::new(cond), body: Box::new(body) }).at_row(row))
    }

    fn parse_for(&mut self) -> Result<AstNode, ParseError> {
        let row = self.current_row();
        self.expect(&TokenKind::KwFor)?;
        self.expect(&TokenKind::LParen)?;
        let decl = if self.type_name_keyword().is_some() {
            self.parse_decl()?
        } else {
            let (name, ident_row) = self.expect_ident()?;
            let ident = AstNode::new(AstKind::Ident { name }).at_row(ident_row);
            self.expect(&TokenKind::Assign)?;
            let val = self.parse_expr()?;
            AstNode::new(AstKind::Assign { var: Box::new(ident), val: Box::new(val) }).at_row(ident_row)
        };
        self.expect(&TokenKind::Semicolon)?;
        let cond = if self.at(&TokenKind::Semicolon) { None } else { Some(Box::new(self.parse_expr()?)) };
        self.expect(&TokenKind::Semicolon)?;
        let step = if self.at(&TokenKind::RParen) { None } else { Some(Box::new(self.parse_for_step()?)) };
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(AstNode::new(AstKind::For { decl: Box::new(decl), cond, step, body: Box::new(body) }).at_row(row))
    }

    fn parse_for_step(&mut self) -> Result<AstNode, ParseError> {
        if let TokenKind::Ident(name) = self.current().clone() {
            let row = self.current_row();
            // Disambiguate `i = i + 1` (assignment) from a bare expression starting with
            // an identifier by looking one token ahead.
            if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::Assign) {
                self.advance();
                self.advance();
                let val = self.parse_expr()?;
                let ident = AstNode::new(AstKind::Ident { name }).at_row(row);
                return Ok(AstNode::new(AstKind::Assign { var: Box::new(ident), val: Box::new(val) }).at_row(row));
            }
        }
        self.parse_expr()
    }

    fn parse_array_placeholder(&mut self) -> Result<AstNode, ParseError> {
        let row = self.current_row();
        self.expect(&TokenKind::LBracket)?;
        if !self.at(&TokenKind::RBracket) {
            self.parse_expr()?;
            while self.at(&TokenKind::Comma) {
                self.advance();
                self.parse_expr()?;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(AstNode::new(AstKind::ArrPlaceholder).at_row(row))
    }

    // ---- expressions, precedence low to high: comp -> bool -> add -> mult -> group ----

    fn parse_expr(&mut self) -> Result<AstNode, ParseError> {
        self.parse_comp()
    }

    fn parse_comp(&mut self) -> Result<AstNode, ParseError> {
        let mut lhs = self.parse_bool()?;
        loop {
            let op = match self.current() {
                TokenKind::AndAnd => BinOp::And,
                TokenKind::OrOr => BinOp::Or,
                _ => break,
            };
            let row = self.current_row();
            self.advance();
            let rhs = self.parse_bool()?;
            lhs = AstNode::new(AstKind::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }).at_row(row);
        }
        Ok(lhs)
    }

    fn parse_bool(&mut self) -> Result<AstNode, ParseError> {
        let mut lhs = self.parse_add()?;
        loop {
            let op = match self.current() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                TokenKind::Ge => BinOp::Ge,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Lt => BinOp::Lt,
                _ => break,
            };
            let row = self.current_row();
            self.advance();
            let rhs = self.parse_add()?;
            lhs = AstNode::new(AstKind::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }).at_row(row);
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<AstNode, ParseError> {
        let mut lhs = self.parse_mult()?;
        loop {
            let op = match self.current() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let row = self.current_row();
            self.advance();
            let rhs = self.parse_mult()?;
            lhs = AstNode::new(AstKind::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }).at_row(row);
        }
        Ok(lhs)
    }

    fn parse_mult(&mut self) -> Result<AstNode, ParseError> {
        let mut lhs = self.parse_group()?;
        loop {
            let op = match self.current() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let row = self.current_row();
            self.advance();
            let rhs = self.parse_group()?;
            lhs = AstNode::new(AstKind::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }).at_row(row);
        }
        Ok(lhs)
    }

    fn parse_group(&mut self) -> Result<AstNode, ParseError> {
        let row = self.current_row();
        match self.current().clone() {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::IntLiteral(v) => {
                self.advance();
                Ok(AstNode::new(AstKind::Literal { literal: v.to_string(), value: LiteralValue::Int(v) }).at_row(row))
            }
            TokenKind::FloatLiteral(v) => {
                self.advance();
                Ok(AstNode::new(AstKind::Literal { literal: v.to_string(), value: LiteralValue::Float(v) }).at_row(row))
            }
            TokenKind::StrLiteral(s) => {
                self.advance();
                Ok(AstNode::new(AstKind::Literal { literal: s.clone(), value: LiteralValue::Str(s) }).at_row(row))
            }
            TokenKind::CharLiteral(c) => {
                self.advance();
                let literal = char::from_u32(u32::from(c)).map_or_else(String::new, |ch| ch.to_string());
                Ok(AstNode::new(AstKind::Literal { literal, value: LiteralValue::Char(c) }).at_row(row))
            }
            TokenKind::LBracket => self.parse_array_placeholder(),
            TokenKind::Ident(name) => {
                self.advance();
                let ident = AstNode::new(AstKind::Ident { name }).at_row(row);
                if self.at(&TokenKind::LParen) { self.parse_func_call(ident, row) } else { Ok(ident) }
            }
            other => Err(ParseError { message: format!("unexpected token {other}"), row: Some(row) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> AstNode {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(tokens).parse_program().unwrap()
    }

    #[test]
    fn parses_simple_decl() {
        let prog = parse("int a = 5;");
        let AstKind::StatementList { stmts, program } = prog.kind else { panic!() };
        assert!(program);
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0].kind, AstKind::Decl { .. }));
    }

    #[test]
    fn parses_function_with_return() {
        let prog = parse("int foo(int a) { return a + 1; } foo(3);");
        let AstKind::StatementList { stmts, .. } = prog.kind else { panic!() };
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[0].kind, AstKind::FuncDecl { .. }));
        assert!(matches!(stmts[1].kind, AstKind::FuncCall { .. }));
    }

    #[test]
    fn parses_for_loop() {
        let prog = parse("for (int i = 0; i < 3; i = i + 1) { }");
        let AstKind::StatementList { stmts, .. } = prog.kind else { panic!() };
        assert!(matches!(stmts[0].kind, AstKind::For { .. }));
    }

    #[test]
    fn rejects_unknown_function_call_missing_paren() {
        let tokens = Lexer::new("foo(;").tokenize().unwrap();
        assert!(Parser::new(tokens).parse_program().is_err());
    }
}
