//! Pass 2 of name binding: bind names inside bodies to candidate lists.

use std::collections::HashMap;

use crate::core::decls::{DeclId, DeclKind, DeclTable, VarDecl};
use crate::core::tree::{
    Block, Expr, ExprKind, Fixity, Module, NodeId, Pattern, PatternKind, Stmt, StmtKind,
};
use crate::core::types::Type;

use super::collect::{Collected, TypeScope, resolve_type};
use super::errors::{ResolveError, ResolveErrorKind};
use super::{BodyToCheck, DeclRef};

struct Binder<'a> {
    decls: &'a mut DeclTable,
    collected: &'a Collected,
    refs: HashMap<NodeId, DeclRef>,
    annotations: HashMap<NodeId, Type>,
    scopes: Vec<HashMap<String, DeclId>>,
    current_self: Option<DeclId>,
    /// Nominal owner of the body being bound; member names resolve through
    /// it without an explicit `self.`.
    current_owner: Option<DeclId>,
    current_type_scope: TypeScope,
    errors: &'a mut Vec<ResolveError>,
}

pub(super) fn bind_bodies(
    module: &Module,
    decls: &mut DeclTable,
    collected: &Collected,
    errors: &mut Vec<ResolveError>,
) -> (
    HashMap<NodeId, DeclRef>,
    HashMap<NodeId, Type>,
    Vec<BodyToCheck>,
    HashMap<DeclId, DeclId>,
) {
    let mut binder = Binder {
        decls,
        collected,
        refs: HashMap::new(),
        annotations: HashMap::new(),
        scopes: Vec::new(),
        current_self: None,
        current_owner: None,
        current_type_scope: TypeScope::default(),
        errors,
    };

    let mut self_decls = HashMap::new();
    let mut bodies = Vec::new();

    // Top-level var initializers are bound in module scope.
    for item in &module.items {
        if let crate::core::tree::ItemKind::Var(var) = &item.kind
            && let Some(init) = &var.init
        {
            binder.bind_expr(init);
        }
    }

    for (owner, block) in &collected.bodies {
        let owner = *owner;
        binder.scopes.clear();
        binder.current_self = None;
        binder.current_owner = owner_nominal(owner, binder.decls);
        binder.current_type_scope = collected.scopes.get(&owner).cloned().unwrap_or_default();

        // Methods and constructors get a synthesized `self`.
        if let Some(owner_ty_decl) = owner_nominal(owner, binder.decls) {
            let self_ty = binder.decls.declared_type(owner_ty_decl);
            let is_static = match &binder.decls.decl(owner).kind {
                DeclKind::Func(func) => func.is_static,
                _ => false,
            };
            if !is_static {
                let self_id = binder.decls.add_decl(
                    "self",
                    DeclKind::Var(VarDecl {
                        owner: None,
                        ty: self_ty,
                        settable: false,
                        is_static: false,
                        is_requirement: false,
                    }),
                    binder.decls.decl(owner).span,
                );
                self_decls.insert(owner, self_id);
                binder.current_self = Some(self_id);
            }
        }

        let mut scope = HashMap::new();
        if let Some(params) = binder.collected.param_decls.get(&owner) {
            for (name, decl) in params {
                scope.insert(name.clone(), *decl);
            }
        }
        binder.scopes.push(scope);
        binder.bind_block(block);
        binder.scopes.pop();

        bodies.push(BodyToCheck {
            owner,
            block: block.clone(),
        });
    }

    (binder.refs, binder.annotations, bodies, self_decls)
}

fn owner_nominal(callable: DeclId, decls: &DeclTable) -> Option<DeclId> {
    match &decls.decl(callable).kind {
        DeclKind::Func(func) => func.owner,
        DeclKind::Constructor(ctor) => Some(ctor.owner),
        _ => None,
    }
}

impl<'a> Binder<'a> {
    fn bind_block(&mut self, block: &Block) {
        self.scopes.push(HashMap::new());
        for stmt in &block.stmts {
            self.bind_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn bind_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.bind_expr(expr),
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.bind_expr(value);
                }
            }
            StmtKind::Var(var) => {
                if let Some(ty_expr) = &var.ty {
                    let ty = resolve_type(
                        ty_expr,
                        &self.current_type_scope,
                        self.decls,
                        self.collected,
                        self.errors,
                    );
                    self.annotations.insert(ty_expr.id, ty);
                }
                // Initializer first: `let x = x` refers to the outer `x`.
                if let Some(init) = &var.init {
                    self.bind_expr(init);
                }
                self.bind_pattern(&var.pattern, !var.is_let);
            }
        }
    }

    fn bind_pattern(&mut self, pattern: &Pattern, settable: bool) {
        match &pattern.kind {
            PatternKind::Name(name) => {
                let id = self.decls.add_decl(
                    name.clone(),
                    DeclKind::Var(VarDecl {
                        owner: None,
                        // Placeholder until the checker solves the initializer.
                        ty: Type::Error,
                        settable,
                        is_static: false,
                        is_requirement: false,
                    }),
                    pattern.span,
                );
                self.refs.insert(pattern.id, DeclRef::Resolved(id));
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone(), id);
                }
            }
            PatternKind::Wildcard => {}
            PatternKind::Tuple(patterns) => {
                for sub in patterns {
                    self.bind_pattern(sub, settable);
                }
            }
        }
    }

    fn bind_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::StringLit(_) => {}
            ExprKind::Name { name } => {
                let decl_ref = self.lookup_name(name);
                if decl_ref == DeclRef::Poisoned {
                    self.errors
                        .push(ResolveErrorKind::UnresolvedName(name.clone()).at(expr.span));
                }
                self.refs.insert(expr.id, decl_ref);
            }
            ExprKind::OperatorRef { name, fixity } => {
                let decl_ref = self.lookup_operator(name, *fixity);
                if decl_ref == DeclRef::Poisoned {
                    self.errors
                        .push(ResolveErrorKind::UnresolvedName(name.clone()).at(expr.span));
                }
                self.refs.insert(expr.id, decl_ref);
            }
            ExprKind::SelfValue => match self.current_self {
                Some(self_id) => {
                    self.refs.insert(expr.id, DeclRef::Resolved(self_id));
                }
                None => {
                    self.errors
                        .push(ResolveErrorKind::SelfOutsideType.at(expr.span));
                    self.refs.insert(expr.id, DeclRef::Poisoned);
                }
            },
            ExprKind::Member { base, .. } => self.bind_expr(base),
            ExprKind::Tuple { elements } => {
                for elem in elements {
                    self.bind_expr(&elem.expr);
                }
            }
            ExprKind::ArrayLit { elements } => {
                for elem in elements {
                    self.bind_expr(elem);
                }
            }
            ExprKind::DictLit { entries } => {
                for entry in entries {
                    self.bind_expr(&entry.key);
                    self.bind_expr(&entry.value);
                }
            }
            ExprKind::Call { callee, arg } => {
                self.bind_expr(callee);
                self.bind_expr(arg);
            }
            ExprKind::Closure { params, body } => {
                let mut scope = HashMap::new();
                for param in params {
                    if let Some(ty_expr) = &param.ty {
                        let ty = resolve_type(
                            ty_expr,
                            &self.current_type_scope,
                            self.decls,
                            self.collected,
                            self.errors,
                        );
                        self.annotations.insert(ty_expr.id, ty);
                    }
                    let id = self.decls.add_decl(
                        param.name.clone(),
                        DeclKind::Var(VarDecl {
                            owner: None,
                            // The generator overrides closure param types with
                            // fresh variables (or the annotation).
                            ty: Type::Error,
                            settable: false,
                            is_static: false,
                            is_requirement: false,
                        }),
                        param.span,
                    );
                    self.refs.insert(param.id, DeclRef::Resolved(id));
                    scope.insert(param.name.clone(), id);
                }
                self.scopes.push(scope);
                self.bind_expr(body);
                self.scopes.pop();
            }
            ExprKind::If {
                cond,
                then_expr,
                else_expr,
            } => {
                self.bind_expr(cond);
                self.bind_expr(then_expr);
                self.bind_expr(else_expr);
            }
            ExprKind::AddressOf { expr: inner } | ExprKind::Paren(inner) => self.bind_expr(inner),
        }
    }

    fn lookup_name(&self, name: &str) -> DeclRef {
        for scope in self.scopes.iter().rev() {
            if let Some(&decl) = scope.get(name) {
                return DeclRef::Resolved(decl);
            }
        }
        // Members of the enclosing type resolve without an explicit `self.`.
        if let Some(owner) = self.current_owner {
            let base_ty = self.decls.declared_type(owner);
            let members = self.decls.lookup_member(&base_ty, name);
            match members.len() {
                0 => {}
                1 => return DeclRef::Resolved(members[0]),
                _ => return DeclRef::Overloaded(members),
            }
        }
        if let Some(&decl) = self.collected.vars_by_name.get(name) {
            return DeclRef::Resolved(decl);
        }
        if let Some(funcs) = self.collected.funcs_by_name.get(name) {
            let candidates: Vec<DeclId> = funcs
                .iter()
                .copied()
                .filter(|id| {
                    matches!(&self.decls.decl(*id).kind, DeclKind::Func(func) if func.fixity == Fixity::None)
                })
                .collect();
            if candidates.len() == 1 {
                return DeclRef::Resolved(candidates[0]);
            }
            if !candidates.is_empty() {
                return DeclRef::Overloaded(candidates);
            }
        }
        if let Some(&decl) = self.collected.types_by_name.get(name) {
            return DeclRef::Resolved(decl);
        }
        DeclRef::Poisoned
    }

    fn lookup_operator(&self, name: &str, fixity: Fixity) -> DeclRef {
        let Some(funcs) = self.collected.funcs_by_name.get(name) else {
            return DeclRef::Poisoned;
        };
        let candidates: Vec<DeclId> = funcs
            .iter()
            .copied()
            .filter(|id| {
                matches!(&self.decls.decl(*id).kind, DeclKind::Func(func) if func.fixity == fixity)
            })
            .collect();
        match candidates.len() {
            0 => DeclRef::Poisoned,
            1 => DeclRef::Resolved(candidates[0]),
            _ => DeclRef::Overloaded(candidates),
        }
    }
}
