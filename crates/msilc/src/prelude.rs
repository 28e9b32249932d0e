//! The built-in prelude: parses a fixed prototype-only source snippet directly against a
//! shared root scope, then marks every resulting identifier as runtime-provided. Grounded
//! in `original_source/my_checker.py`'s `BUILT_IN_OBJECTS` and the "built-in prelude
//! bootstrap" design note in `SPEC_FULL.md` §4.5/§9.

use crate::{
    analyzer,
    lexer::Lexer,
    parser::Parser,
    scope::{IdentScope, ScopeHandle},
};

/// The five built-in callables the runtime class exposes, each declared body-less so the
/// parser accepts it as an ordinary (empty) function declaration.
const PRELUDE_SOURCE: &str = "\
string input() { }
void write(string s0) { }
void writeline(string s0) { }
int to_int(string s0) { }
float to_float(string s0) { }
";

/// Builds the global scope with every built-in registered and `built_in = true`, ready to
/// serve as the root scope for a user program's semantic check.
///
/// # Panics
/// Panics if the prelude source itself fails to lex, parse, or check — a malformed
/// prelude is a programmer error, never a user-facing one.
#[must_use]
pub fn bootstrap() -> ScopeHandle {
    let root = IdentScope::new_root();
    let tokens = Lexer::new(PRELUDE_SOURCE).tokenize().expect("prelude source must lex cleanly");
    let mut ast = Parser::new(tokens).parse_program().expect("prelude source must parse cleanly");
    analyzer::check(&mut ast, &root).expect("prelude source must check cleanly");

    for ident in IdentScope::own_idents(&root) {
        ident.borrow_mut().built_in = true;
    }
    IdentScope::reset_global_var_index(&root);
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{scope::IdentDesc, types::{BaseType, TypeDesc}};

    #[test]
    fn builtins_are_registered_and_marked() {
        let root = bootstrap();
        for name in ["input", "write", "writeline", "to_int", "to_float"] {
            let handle = IdentScope::lookup(&root, name).unwrap_or_else(|| panic!("{name} is a builtin"));
            assert!(handle.borrow().built_in);
        }
    }

    #[test]
    fn global_var_index_resets_after_prelude() {
        let root = bootstrap();
        let a = IdentScope::add(&root, IdentDesc::new("a", TypeDesc::simple(BaseType::Int))).unwrap();
        assert_eq!(a.borrow().index, 0);
        assert!(!a.borrow().built_in);
    }
}
