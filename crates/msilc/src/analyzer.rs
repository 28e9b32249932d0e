//! The semantic analyzer: a recursive tree walk establishing nested lexical scopes,
//! resolving identifiers, inserting synthetic `TypeConvert` nodes, and assigning a
//! storage class plus slot index to every declared identifier. The analyzer owns
//! `&mut AstNode` throughout and mutates it in place; the emitter only ever borrows it
//! read-only afterwards (see the design notes on in-place mutation in `SPEC_FULL.md`).

use crate::{
    ast::{AstKind, AstNode, LiteralValue},
    error::SemanticError,
    scope::{IdentDesc, IdentScope, ScopeHandle, ScopeKind},
    types::{BaseType, TypeDesc, binop_result_type, can_convert},
};

fn err(message: impl Into<String>, row: Option<u32>) -> SemanticError {
    SemanticError::new(message, row)
}

fn ident_name(node: &AstNode) -> &str {
    match &node.kind {
        AstKind::Ident { name } => name,
        _ => unreachable!("expected an Ident node"),
    }
}

/// Takes ownership of a boxed child, leaving a cheap placeholder behind. Used whenever
/// a child needs to move out of its parent's box to possibly be re-wrapped in a
/// `TypeConvert` — the placeholder is always overwritten before anything else reads it.
fn take_box(slot: &mut Box<AstNode>) -> Box<AstNode> {
    std::mem::replace(slot, Box::new(AstNode::new(AstKind::ArrPlaceholder)))
}

/// Wraps `node` in a synthetic `TypeConvert` if needed to reach `target`, or returns it
/// unchanged if it is already that type.
///
/// # Errors
/// Returns a "not convertible" error if `node`'s type cannot reach `target` via
/// [`can_convert`].
fn coerce(node: Box<AstNode>, target: &TypeDesc) -> Result<Box<AstNode>, SemanticError> {
    if node.node_type() == target {
        return Ok(node);
    }
    if can_convert(node.node_type(), target) {
        let row = node.row;
        return Ok(Box::new(AstNode {
            kind: AstKind::TypeConvert { expr: node, target: target.clone() },
            row,
            node_type: Some(target.clone()),
            node_ident: None,
        }));
    }
    Err(err(format!("cannot convert {} to {target}", node.node_type()), node.row))
}

fn coerce_in_place(slot: &mut Box<AstNode>, target: &TypeDesc) -> Result<(), SemanticError> {
    let taken = take_box(slot);
    *slot = coerce(taken, target)?;
    Ok(())
}

/// The entry point: walks `node` under `scope`, annotating it in place.
///
/// # Errors
/// Returns the first semantic failure encountered; the analyzer does not attempt
/// recovery (the first error aborts the pipeline).
pub fn check(node: &mut AstNode, scope: &ScopeHandle) -> Result<(), SemanticError> {
    let row = node.row;
    match &mut node.kind {
        AstKind::Literal { value, .. } => {
            let base = match value {
                LiteralValue::Int(_) => BaseType::Int,
                LiteralValue::Float(_) => BaseType::Float,
                LiteralValue::Str(_) => BaseType::Str,
                LiteralValue::Char(_) => BaseType::Char,
            };
            node.node_type = Some(TypeDesc::simple(base));
        }

        AstKind::Ident { name } => {
            let handle = IdentScope::lookup(scope, name)
                .ok_or_else(|| err(format!("identifier {name} not found"), row))?;
            node.node_type = Some(handle.borrow().ty.clone());
            node.node_ident = Some(handle);
        }

        AstKind::DeclType { name } => {
            let ty = TypeDesc::from_str_name(name).map_err(|bad| err(format!("unknown type {bad}"), row))?;
            node.node_type = Some(ty);
        }

        AstKind::BinOp { op, lhs, rhs } => {
            check(lhs, scope)?;
            check(rhs, scope)?;
            let op = *op;
            let (lhs_base, rhs_base) = match (lhs.node_type().base(), rhs.node_type().base()) {
                (Some(l), Some(r)) => (l, r),
                _ => {
                    return Err(err(
                        format!("operator {op} not applicable to types ({}, {})", lhs.node_type(), rhs.node_type()),
                        row,
                    ));
                }
            };

            if let Some(result) = binop_result_type(op, lhs_base, rhs_base) {
                node.node_type = Some(TypeDesc::simple(result));
                return Ok(());
            }

            for candidate in crate::types::convertible_targets(rhs_base) {
                if let Some(result) = binop_result_type(op, lhs_base, *candidate) {
                    coerce_in_place(rhs, &TypeDesc::simple(*candidate))?;
                    node.node_type = Some(TypeDesc::simple(result));
                    return Ok(());
                }
            }
            for candidate in crate::types::convertible_targets(lhs_base) {
                if let Some(result) = binop_result_type(op, *candidate, rhs_base) {
                    coerce_in_place(lhs, &TypeDesc::simple(*candidate))?;
                    node.node_type = Some(TypeDesc::simple(result));
                    return Ok(());
                }
            }

            Err(err(format!("operator {op} not applicable to types ({lhs_base}, {rhs_base})"), row))
        }

        AstKind::TypeConvert { .. } => {
            debug_assert!(node.node_type.is_some(), "TypeConvert must carry its type at construction");
        }

        AstKind::Assign { var, val } => {
            check(var, scope)?;
            check(val, scope)?;
            let target = var.node_type().clone();
            coerce_in_place(val, &target)?;
            node.node_type = Some(target);
        }

        AstKind::StatementList { stmts, program } => {
            let block_scope = if *program { scope.clone() } else { IdentScope::new_child(scope) };
            for stmt in stmts.iter_mut() {
                check(stmt, &block_scope)?;
            }
            node.node_type = Some(TypeDesc::simple(BaseType::Void));
        }

        AstKind::If { cond, then_branch, else_branch } => {
            check(cond, scope)?;
            coerce_in_place(cond, &TypeDesc::simple(BaseType::Int)).map_err(|e| err(format!("condition: {e}"), row))?;
            check(then_branch, scope)?;
            if let Some(else_branch) = else_branch {
                check(else_branch, scope)?;
            }
            node.node_type = Some(TypeDesc::simple(BaseType::Void));
        }

        AstKind::While { cond, body } => {
            check(cond, scope)?;
            coerce_in_place(cond, &TypeDesc::simple(BaseType::Int)).map_err(|e| err(format!("condition: {e}"), row))?;
            check(body, scope)?;
            node.node_type = Some(TypeDesc::simple(BaseType::Void));
        }

        AstKind::For { decl, cond, step, body } => {
            let for_scope = IdentScope::new_child(scope);
            check(decl, &for_scope)?;
            if cond.is_none() {
                *cond = Some(Box::new(AstNode::new(AstKind::Literal {
                    literal: "1".to_owned(),
                    value: LiteralValue::Int(1),
                })));
            }
            let cond_slot = cond.as_mut().expect("materialised above if absent");
            check(cond_slot, &for_scope)?;
            coerce_in_place(cond_slot, &TypeDesc::simple(BaseType::Int))
                .map_err(|e| err(format!("condition: {e}"), row))?;
            if let Some(step) = step {
                check(step, &for_scope)?;
            }
            check(body, &for_scope)?;
            node.node_type = Some(TypeDesc::simple(BaseType::Void));
        }

        AstKind::Decl { .. } => check_decl(node, scope, false)?,

        AstKind::DeclList { params } => {
            for param in params.iter_mut() {
                check_decl(param, scope, true)?;
            }
            node.node_type = Some(TypeDesc::simple(BaseType::Void));
        }

        AstKind::FuncDecl { .. } => check_func_decl(node, scope)?,

        AstKind::ValueList { args } => {
            for arg in args.iter_mut() {
                check(arg, scope)?;
            }
            node.node_type = Some(TypeDesc::simple(BaseType::Void));
        }

        AstKind::FuncCall { .. } => check_func_call(node, scope)?,

        AstKind::Return { value } => {
            let return_scope = IdentScope::new_child(scope);
            check(value, &return_scope)?;
            let func_frame = IdentScope::curr_func(scope).ok_or_else(|| err("return outside function", row))?;
            let ret_type = {
                let func_ident = func_frame
                    .borrow()
                    .func_ident()
                    .expect("curr_func only returns frames with a func marker set");
                match &func_ident.borrow().ty {
                    TypeDesc::Func { ret, .. } => (**ret).clone(),
                    TypeDesc::Simple(_) => unreachable!("function identifiers always carry a functional type"),
                }
            };
            coerce_in_place(value, &ret_type)?;
            node.node_type = Some(TypeDesc::simple(BaseType::Void));
        }

        AstKind::ArrPlaceholder => {
            return Err(err("arrays are not supported", row));
        }
    }
    Ok(())
}

fn check_decl(node: &mut AstNode, scope: &ScopeHandle, force_param: bool) -> Result<(), SemanticError> {
    let row = node.row;
    let AstKind::Decl { decl_type, ident, init } = &mut node.kind else {
        unreachable!("check_decl called on a non-Decl node");
    };
    check(decl_type, scope)?;
    let ty = decl_type.node_type().clone();
    let name = ident_name(ident).to_owned();

    let mut desc = IdentDesc::new(name, ty.clone());
    if force_param {
        desc.scope = ScopeKind::Param;
    }
    let handle = IdentScope::add(scope, desc).map_err(|message| err(message, row))?;
    ident.node_type = Some(ty.clone());
    ident.node_ident = Some(handle);

    if let Some(init) = init {
        check(init, scope)?;
        coerce_in_place(init, &ty)?;
    }
    node.node_type = Some(TypeDesc::simple(BaseType::Void));
    Ok(())
}

fn check_func_decl(node: &mut AstNode, scope: &ScopeHandle) -> Result<(), SemanticError> {
    let row = node.row;
    if IdentScope::curr_func(scope).is_some() {
        return Err(err("nested function declaration", row));
    }
    let AstKind::FuncDecl { func_type, name, params, body } = &mut node.kind else {
        unreachable!("check_func_decl called on a non-FuncDecl node");
    };

    check(func_type, scope)?;
    let return_type = func_type.node_type().clone();

    let func_frame = IdentScope::new_child(scope);
    let placeholder = IdentDesc::new("<pending-func>", TypeDesc::simple(BaseType::Void));
    let placeholder_handle = std::rc::Rc::new(std::cell::RefCell::new(placeholder));
    func_frame.borrow_mut().set_func(std::rc::Rc::clone(&placeholder_handle));

    check(params, &func_frame)?;
    let AstKind::DeclList { params: param_nodes } = &params.kind else {
        unreachable!("params is always a DeclList");
    };
    let param_types: Vec<TypeDesc> = param_nodes
        .iter()
        .map(|p| match &p.kind {
            AstKind::Decl { ident, .. } => ident.node_type().clone(),
            _ => unreachable!("DeclList only ever contains Decl children"),
        })
        .collect();

    let func_type_desc = TypeDesc::func(return_type, param_types);
    let fn_name = ident_name(name).to_owned();
    let global_scope = IdentScope::curr_global(scope);
    let func_ident = IdentDesc::new(fn_name.clone(), func_type_desc.clone());
    let func_handle = IdentScope::add(&global_scope, func_ident)
        .map_err(|_| err(format!("duplicate function {fn_name}"), row))?;

    name.node_type = Some(func_type_desc);
    name.node_ident = Some(std::rc::Rc::clone(&func_handle));
    func_frame.borrow_mut().set_func(func_handle);

    check(body, &func_frame)?;
    node.node_type = Some(TypeDesc::simple(BaseType::Void));
    Ok(())
}

fn check_func_call(node: &mut AstNode, scope: &ScopeHandle) -> Result<(), SemanticError> {
    let row = node.row;
    let AstKind::FuncCall { name, args } = &mut node.kind else {
        unreachable!("check_func_call called on a non-FuncCall node");
    };
    let fn_name = ident_name(name).to_owned();
    let handle =
        IdentScope::lookup(scope, &fn_name).ok_or_else(|| err(format!("function {fn_name} not found"), row))?;

    let (ret_type, param_types) = {
        let desc = handle.borrow();
        match &desc.ty {
            TypeDesc::Func { ret, params } => ((**ret).clone(), params.clone()),
            TypeDesc::Simple(_) => return Err(err(format!("{fn_name} is not a function"), row)),
        }
    };
    name.node_type = Some(handle.borrow().ty.clone());
    name.node_ident = Some(handle);

    let AstKind::ValueList { args: arg_nodes } = &mut args.kind else {
        unreachable!("args is always a ValueList");
    };
    if arg_nodes.len() != param_types.len() {
        return Err(err(
            format!("function {fn_name} expects {} argument(s), got {}", param_types.len(), arg_nodes.len()),
            row,
        ));
    }

    let mut fact_parts = Vec::with_capacity(arg_nodes.len());
    let mut decl_parts = Vec::with_capacity(arg_nodes.len());
    let mut any_error = false;
    let mut coerced = Vec::with_capacity(arg_nodes.len());

    for (arg, param_type) in arg_nodes.iter_mut().zip(&param_types) {
        check(arg, scope)?;
        fact_parts.push(arg.node_type().to_string());
        decl_parts.push(param_type.to_string());

        if arg.node_type() == param_type {
            coerced.push(Box::new(std::mem::replace(arg, AstNode::new(AstKind::ArrPlaceholder))));
        } else if can_convert(arg.node_type(), param_type) {
            let taken = std::mem::replace(arg, AstNode::new(AstKind::ArrPlaceholder));
            let arg_row = taken.row;
            coerced.push(Box::new(AstNode {
                kind: AstKind::TypeConvert { expr: Box::new(taken), target: param_type.clone() },
                row: arg_row,
                node_type: Some(param_type.clone()),
                node_ident: None,
            }));
        } else {
            any_error = true;
            coerced.push(Box::new(std::mem::replace(arg, AstNode::new(AstKind::ArrPlaceholder))));
        }
    }

    if any_error {
        return Err(err(
            format!(
                "function {fn_name}({}) not applicable for arguments ({})",
                decl_parts.join(", "),
                fact_parts.join(", ")
            ),
            row,
        ));
    }

    *arg_nodes = coerced.into_iter().map(|b| *b).collect();
    node.node_type = Some(ret_type);
    Ok(())
}
