//! Type descriptors and the conversion/compatibility tables that drive typing decisions.

use std::fmt;

use serde::Serialize;

/// The binary operators recognised by the language. Order matches surface syntax, not
/// precedence: precedence lives entirely in the parser's grammar productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The base scalar types of the language. `Void` is valid only as a function return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BaseType {
    Void,
    Int,
    Float,
    Str,
    Char,
}

impl BaseType {
    /// The source-language spelling of this type, as it appears in a `decl` production.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "string",
            Self::Char => "char",
        }
    }

    /// Inverse of [`BaseType::name`]. Used by `DeclType` resolution.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "void" => Some(Self::Void),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "string" => Some(Self::Str),
            "char" => Some(Self::Char),
            _ => None,
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type descriptor: either a simple scalar type or a functional (return + params) type.
///
/// Simple types are cheap to construct and compare; [`TypeDesc::simple`] is the only
/// constructor callers outside this module should need for scalars. Equality is
/// structural, matching `TypeDesc.__eq__` in the reference semantic model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeDesc {
    Simple(BaseType),
    Func { ret: Box<TypeDesc>, params: Vec<TypeDesc> },
}

impl TypeDesc {
    #[must_use]
    pub fn simple(base: BaseType) -> Self {
        Self::Simple(base)
    }

    #[must_use]
    pub fn func(ret: TypeDesc, params: Vec<TypeDesc>) -> Self {
        Self::Func { ret: Box::new(ret), params }
    }

    /// Parses a type name as it would appear in source (`"int"`, `"string"`, …).
    ///
    /// # Errors
    /// Returns the unknown type name verbatim so the caller can format a diagnostic.
    pub fn from_str_name(name: &str) -> Result<Self, String> {
        BaseType::from_name(name).map(Self::Simple).ok_or_else(|| name.to_owned())
    }

    #[must_use]
    pub fn is_simple(&self) -> bool {
        matches!(self, Self::Simple(_))
    }

    #[must_use]
    pub fn is_func(&self) -> bool {
        matches!(self, Self::Func { .. })
    }

    /// The underlying [`BaseType`], if this is a simple type.
    #[must_use]
    pub fn base(&self) -> Option<BaseType> {
        match self {
            Self::Simple(b) => Some(*b),
            Self::Func { .. } => None,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(base) => write!(f, "{base}"),
            Self::Func { ret, params } => {
                write!(f, "{ret} (")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Returns the base types `from` may be implicitly converted to, per the authoritative
/// union table (INT → FLOAT, STR, CHAR; FLOAT → STR; STR → CHAR; CHAR → STR). No
/// transitive closure is taken: only these direct edges are considered.
#[must_use]
pub fn convertible_targets(from: BaseType) -> &'static [BaseType] {
    use BaseType::{Char, Float, Int, Str, Void};
    match from {
        Int => &[Float, Str, Char],
        Float => &[Str],
        Str => &[Char],
        Char => &[Str],
        Void => &[],
    }
}

/// Whether `from` can be implicitly converted to `to`. Both sides must be simple types.
#[must_use]
pub fn can_convert(from: &TypeDesc, to: &TypeDesc) -> bool {
    match (from.base(), to.base()) {
        (Some(from_base), Some(to_base)) => convertible_targets(from_base).contains(&to_base),
        _ => false,
    }
}

/// Looks up the result type of `op` applied to operands of types `(lhs, rhs)`, with no
/// coercion attempted. Returns `None` if the exact pair is not directly compatible; the
/// analyzer is responsible for trying coercions and re-querying this table.
#[must_use]
pub fn binop_result_type(op: BinOp, lhs: BaseType, rhs: BaseType) -> Option<BaseType> {
    use BaseType::{Char, Float, Int, Str};
    use BinOp::{Add, And, Div, Eq, Ge, Gt, Le, Lt, Mod, Mul, Ne, Or, Sub};

    let comparison_pairs = [(Int, Int), (Float, Float), (Str, Str), (Char, Char)];
    let is_comparison = matches!(op, Gt | Lt | Ge | Le | Eq | Ne);
    if is_comparison {
        return comparison_pairs.contains(&(lhs, rhs)).then_some(Int);
    }

    match op {
        Add => match (lhs, rhs) {
            (Int, Int) => Some(Int),
            (Float, Float) => Some(Float),
            (Str, Str) => Some(Str),
            (Char, Char) => Some(Str),
            _ => None,
        },
        Sub | Mul | Div | Mod => match (lhs, rhs) {
            (Int, Int) => Some(Int),
            (Float, Float) => Some(Float),
            _ => None,
        },
        And | Or => (lhs == Int && rhs == Int).then_some(Int),
        Gt | Lt | Ge | Le | Eq | Ne => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_type_display() {
        assert_eq!(TypeDesc::simple(BaseType::Int).to_string(), "int");
    }

    #[test]
    fn func_type_display() {
        let t = TypeDesc::func(TypeDesc::simple(BaseType::Int), vec![TypeDesc::simple(BaseType::Str)]);
        assert_eq!(t.to_string(), "int (string)");
    }

    #[test]
    fn convertibility_union_table() {
        assert!(can_convert(&TypeDesc::simple(BaseType::Int), &TypeDesc::simple(BaseType::Char)));
        assert!(can_convert(&TypeDesc::simple(BaseType::Str), &TypeDesc::simple(BaseType::Char)));
        assert!(can_convert(&TypeDesc::simple(BaseType::Char), &TypeDesc::simple(BaseType::Str)));
        assert!(!can_convert(&TypeDesc::simple(BaseType::Str), &TypeDesc::simple(BaseType::Int)));
    }

    #[test]
    fn no_transitive_closure() {
        // FLOAT -> STR -> CHAR is two hops; FLOAT -> CHAR must not be derived.
        assert!(!can_convert(&TypeDesc::simple(BaseType::Float), &TypeDesc::simple(BaseType::Char)));
    }

    #[test]
    fn binop_table_matches_spec() {
        assert_eq!(binop_result_type(BinOp::Add, BaseType::Char, BaseType::Char), Some(BaseType::Str));
        assert_eq!(binop_result_type(BinOp::Sub, BaseType::Str, BaseType::Str), None);
        assert_eq!(binop_result_type(BinOp::Lt, BaseType::Str, BaseType::Str), Some(BaseType::Int));
        assert_eq!(binop_result_type(BinOp::And, BaseType::Int, BaseType::Int), Some(BaseType::Int));
        assert_eq!(binop_result_type(BinOp::And, BaseType::Float, BaseType::Float), None);
    }

    #[test]
    fn from_str_name_rejects_unknown() {
        assert!(TypeDesc::from_str_name("widget").is_err());
    }
}
