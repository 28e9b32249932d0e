//! The scope registry: hierarchical identifier tables with slot-index allocation.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::types::TypeDesc;

/// The storage class of a declared identifier, determining which load/store opcode
/// family the emitter selects for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Param,
    Local,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Global => "global",
            Self::Param => "param",
            Self::Local => "local",
        };
        f.write_str(s)
    }
}

/// A declared identifier's descriptor: name, type, storage class, and slot index.
///
/// Created once per declaration and never mutated afterwards except by
/// [`IdentScope::add`] reclassifying `scope` before the final insertion — the reference
/// model does the same reparenting inside `add_ident` before the slot index is handed
/// out, so the two always change together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentDesc {
    pub name: String,
    pub ty: TypeDesc,
    pub scope: ScopeKind,
    pub index: u32,
    pub built_in: bool,
}

impl IdentDesc {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self { name: name.into(), ty, scope: ScopeKind::Global, index: 0, built_in: false }
    }
}

/// A shared handle to an [`IdentDesc`]. Both the owning [`IdentScope`] and every AST node
/// that binds to this identifier hold a clone of the same handle, so later mutation
/// (the one `scope`/`index` reclassification `add` performs) is visible everywhere.
pub type IdentHandle = Rc<RefCell<IdentDesc>>;

/// A lexical scope frame: one block/function/for-header's identifier table, linked to
/// its enclosing frame. Frames are cheap and short-lived — one is created and dropped
/// per subtree visited during the semantic walk.
pub struct IdentScope {
    idents: IndexMap<String, IdentHandle>,
    parent: Option<Rc<RefCell<IdentScope>>>,
    /// Set once this frame is a function body, marking the nearest enclosing function
    /// for `curr_func` lookups and giving `add` a place to allocate PARAM slots.
    func: Option<IdentHandle>,
    var_index: u32,
    param_index: u32,
}

pub type ScopeHandle = Rc<RefCell<IdentScope>>;

impl IdentScope {
    #[must_use]
    pub fn new_root() -> ScopeHandle {
        Rc::new(RefCell::new(Self { idents: IndexMap::new(), parent: None, func: None, var_index: 0, param_index: 0 }))
    }

    #[must_use]
    pub fn new_child(parent: &ScopeHandle) -> ScopeHandle {
        Rc::new(RefCell::new(Self {
            idents: IndexMap::new(),
            parent: Some(Rc::clone(parent)),
            func: None,
            var_index: 0,
            param_index: 0,
        }))
    }

    pub fn set_func(&mut self, func: IdentHandle) {
        self.func = Some(func);
    }

    /// The identifier marking this frame as a function body, if it is one.
    #[must_use]
    pub fn func_ident(&self) -> Option<IdentHandle> {
        self.func.clone()
    }

    #[must_use]
    pub fn is_global(scope: &ScopeHandle) -> bool {
        scope.borrow().parent.is_none()
    }

    /// Walks the parent chain to the outermost (global) frame.
    #[must_use]
    pub fn curr_global(scope: &ScopeHandle) -> ScopeHandle {
        let mut curr = Rc::clone(scope);
        loop {
            let parent = curr.borrow().parent.clone();
            match parent {
                Some(p) => curr = p,
                None => return curr,
            }
        }
    }

    /// Walks the parent chain to the nearest frame marked as a function body, if any.
    #[must_use]
    pub fn curr_func(scope: &ScopeHandle) -> Option<ScopeHandle> {
        let mut curr = Rc::clone(scope);
        loop {
            if curr.borrow().func.is_some() {
                return Some(curr);
            }
            let parent = curr.borrow().parent.clone();
            match parent {
                Some(p) => curr = p,
                None => return None,
            }
        }
    }

    /// Walks `self` then `parent` chain, returning the first identifier named `name`.
    #[must_use]
    pub fn lookup(scope: &ScopeHandle, name: &str) -> Option<IdentHandle> {
        let mut curr = Some(Rc::clone(scope));
        while let Some(frame) = curr {
            if let Some(found) = frame.borrow().idents.get(name) {
                return Some(Rc::clone(found));
            }
            curr = frame.borrow().parent.clone();
        }
        None
    }

    /// Admits a new identifier into `scope`, per the four-step algorithm in the data
    /// model: reclassify non-PARAM scopes, reject illegal shadowing, allocate a slot
    /// index for non-function types, then insert.
    ///
    /// # Errors
    /// Returns `Err("identifier {name} already declared")` on an illegal collision.
    pub fn add(scope: &ScopeHandle, mut ident: IdentDesc) -> Result<IdentHandle, String> {
        let func_scope = Self::curr_func(scope);
        let global_scope = Self::curr_global(scope);

        if ident.scope != ScopeKind::Param {
            ident.scope = if func_scope.is_some() { ScopeKind::Local } else { ScopeKind::Global };
        }

        if let Some(existing) = Self::lookup(scope, &ident.name) {
            let existing_scope = existing.borrow().scope;
            let error = match ident.scope {
                ScopeKind::Param => existing_scope == ScopeKind::Param,
                ScopeKind::Local => existing_scope != ScopeKind::Global,
                ScopeKind::Global => true,
            };
            if error {
                return Err(format!("identifier {} already declared", ident.name));
            }
        }

        if !ident.ty.is_func() {
            if ident.scope == ScopeKind::Param {
                let func_scope = func_scope.as_ref().expect("PARAM ident without an enclosing function scope");
                let mut func_scope = func_scope.borrow_mut();
                ident.index = func_scope.param_index;
                func_scope.param_index += 1;
            } else {
                let slot_scope = func_scope.as_ref().unwrap_or(&global_scope);
                let mut slot_scope = slot_scope.borrow_mut();
                ident.index = slot_scope.var_index;
                slot_scope.var_index += 1;
            }
        }

        let handle = Rc::new(RefCell::new(ident));
        let name = handle.borrow().name.clone();
        scope.borrow_mut().idents.insert(name, Rc::clone(&handle));
        Ok(handle)
    }

    /// Resets the global variable-slot allocator to zero, so user-declared globals
    /// number from zero after the built-in prelude has registered its own identifiers.
    pub fn reset_global_var_index(scope: &ScopeHandle) {
        scope.borrow_mut().var_index = 0;
    }

    /// All identifiers registered directly in `scope` (not following `parent`), in
    /// insertion order. Used by the prelude bootstrap to mark every resulting ident
    /// `built_in = true`.
    #[must_use]
    pub fn own_idents(scope: &ScopeHandle) -> Vec<IdentHandle> {
        scope.borrow().idents.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BaseType;

    fn int_ident(name: &str) -> IdentDesc {
        IdentDesc::new(name, TypeDesc::simple(BaseType::Int))
    }

    #[test]
    fn globals_number_from_zero() {
        let root = IdentScope::new_root();
        let a = IdentScope::add(&root, int_ident("a")).unwrap();
        let b = IdentScope::add(&root, int_ident("b")).unwrap();
        assert_eq!(a.borrow().index, 0);
        assert_eq!(b.borrow().index, 1);
        assert_eq!(a.borrow().scope, ScopeKind::Global);
    }

    #[test]
    fn duplicate_global_rejected() {
        let root = IdentScope::new_root();
        IdentScope::add(&root, int_ident("a")).unwrap();
        assert!(IdentScope::add(&root, int_ident("a")).is_err());
    }

    #[test]
    fn local_may_shadow_global() {
        let root = IdentScope::new_root();
        IdentScope::add(&root, int_ident("a")).unwrap();
        let func_frame = IdentScope::new_child(&root);
        let marker = IdentScope::add(&func_frame, int_ident("__fn")).unwrap();
        func_frame.borrow_mut().set_func(marker);
        let body = IdentScope::new_child(&func_frame);
        let shadow = IdentScope::add(&body, int_ident("a")).unwrap();
        assert_eq!(shadow.borrow().scope, ScopeKind::Local);
        assert_eq!(shadow.borrow().index, 0);
    }

    #[test]
    fn param_index_independent_of_locals() {
        let root = IdentScope::new_root();
        let func_frame = IdentScope::new_child(&root);
        let marker = IdentScope::add(&func_frame, int_ident("__fn")).unwrap();
        func_frame.borrow_mut().set_func(marker);
        let mut p0 = int_ident("x");
        p0.scope = ScopeKind::Param;
        let p0 = IdentScope::add(&func_frame, p0).unwrap();
        assert_eq!(p0.borrow().index, 0);
        let local = IdentScope::add(&func_frame, int_ident("y")).unwrap();
        assert_eq!(local.borrow().index, 0);
        assert_eq!(local.borrow().scope, ScopeKind::Local);
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let root = IdentScope::new_root();
        IdentScope::add(&root, int_ident("g")).unwrap();
        let child = IdentScope::new_child(&root);
        assert!(IdentScope::lookup(&child, "g").is_some());
        assert!(IdentScope::lookup(&child, "missing").is_none());
    }
}
