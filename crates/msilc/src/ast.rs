//! The AST: a tagged tree carrying source-level syntax plus post-check annotations.

use serde::Serialize;

use crate::{
    scope::IdentHandle,
    types::{BinOp, TypeDesc},
};

/// The decoded runtime datum behind a `Literal` node. The lexical form is always kept
/// alongside this in [`AstKind::Literal`] so the emitter can still print `"v"` verbatim
/// for a string literal without re-escaping it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    Int(i32),
    Float(f64),
    Str(String),
    /// A single UTF-16 code unit, matching the 16-bit `CHAR` base type.
    Char(u16),
}

/// One AST node. Every node carries the three annotation fields the semantic analyzer
/// populates in place (`node_type`, `node_ident`) alongside the source `row` used for
/// diagnostics; statement nodes end the walk with `node_type = Some(Void)`.
#[derive(Debug, Clone, Serialize)]
pub struct AstNode {
    pub kind: AstKind,
    pub row: Option<u32>,
    pub node_type: Option<TypeDesc>,
    #[serde(skip)]
    pub node_ident: Option<IdentHandle>,
}

impl AstNode {
    #[must_use]
    pub fn new(kind: AstKind) -> Self {
        Self { kind, row: None, node_type: None, node_ident: None }
    }

    #[must_use]
    pub fn at_row(mut self, row: u32) -> Self {
        self.row = Some(row);
        self
    }

    /// The type assigned during semantic check.
    ///
    /// # Panics
    /// Panics if called before the semantic analyzer has visited this node — a missing
    /// annotation past that point is a compiler bug, not a user-facing error, matching
    /// the teacher's `Identifier::namespace_id()` "not prepared" panic idiom.
    #[must_use]
    pub fn node_type(&self) -> &TypeDesc {
        self.node_type.as_ref().expect("node_type read before semantic check annotated this node")
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum AstKind {
    Literal {
        literal: String,
        value: LiteralValue,
    },
    Ident {
        name: String,
    },
    DeclType {
        name: String,
    },
    BinOp {
        op: BinOp,
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
    },
    /// Synthetic: only ever constructed by the analyzer, never by the parser.
    TypeConvert {
        expr: Box<AstNode>,
        target: TypeDesc,
    },
    Assign {
        var: Box<AstNode>,
        val: Box<AstNode>,
    },
    /// `program` marks the root list: it does not open a new scope, unlike every other
    /// `StatementList` produced for a block body.
    StatementList {
        stmts: Vec<AstNode>,
        program: bool,
    },
    If {
        cond: Box<AstNode>,
        then_branch: Box<AstNode>,
        else_branch: Option<Box<AstNode>>,
    },
    While {
        cond: Box<AstNode>,
        body: Box<AstNode>,
    },
    /// A missing `cond` is represented as `None` until the analyzer materialises the
    /// empty-statement sentinel (`Literal("1")`) in place, per the design notes.
    For {
        decl: Box<AstNode>,
        cond: Option<Box<AstNode>>,
        step: Option<Box<AstNode>>,
        body: Box<AstNode>,
    },
    Decl {
        decl_type: Box<AstNode>,
        ident: Box<AstNode>,
        init: Option<Box<AstNode>>,
    },
    /// A function's formal parameter list.
    DeclList {
        params: Vec<AstNode>,
    },
    FuncDecl {
        func_type: Box<AstNode>,
        name: Box<AstNode>,
        params: Box<AstNode>,
        body: Box<AstNode>,
    },
    /// An actual-argument list.
    ValueList {
        args: Vec<AstNode>,
    },
    FuncCall {
        name: Box<AstNode>,
        args: Box<AstNode>,
    },
    Return {
        value: Box<AstNode>,
    },
    /// Parsed-only placeholder for array syntax (Non-goal). Reaching this node during
    /// semantic check is always an error; see `analyzer::check`.
    ArrPlaceholder,
}
