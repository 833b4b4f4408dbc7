//! Constraint generation: a post-order, type-directed walk of one
//! expression tree.
//!
//! Every node gets a type (possibly containing fresh variables) recorded in
//! a side table, and the system accumulates the constraints relating those
//! types. Each expression kind has exactly one synthesis rule, a pure
//! function of the node and its children's types. Closure bodies fold into
//! the same system so their result types participate in outer inference. A
//! poisoned subtree aborts generation of its enclosing node.

use std::collections::HashMap;

use crate::core::resolve::DeclRef;
use crate::core::tree::{Expr, ExprKind, NodeId};
use crate::core::types::{LValueQualifiers, Type, TupleElement};

use super::constraints::{
    Constraint, Locator, OverloadChoice, OverloadSet, PathStep, TypeMatchKind,
};
use super::system::ConstraintSystem;

const INOUT_CONVERSION_MEMBER: &str = "__inout_conversion";
const WRITEBACK_GET_MEMBER: &str = "__writeback_get";
const WRITEBACK_SET_MEMBER: &str = "__writeback_set";

pub struct ConstraintGenerator<'s, 'c, 'd> {
    system: &'s mut ConstraintSystem<'c, 'd>,
    /// Resolved local type annotations, keyed by type-expression node.
    annotations: &'s HashMap<NodeId, Type>,
}

impl<'s, 'c, 'd> ConstraintGenerator<'s, 'c, 'd> {
    pub fn new(
        system: &'s mut ConstraintSystem<'c, 'd>,
        annotations: &'s HashMap<NodeId, Type>,
    ) -> Self {
        ConstraintGenerator {
            system,
            annotations,
        }
    }

    /// Assigns a type to every subexpression, accumulating constraints.
    /// Returns `None` when the subtree contains an unresolvable reference;
    /// the enclosing node then aborts as well.
    pub fn generate(&mut self, expr: &Expr) -> Option<Type> {
        let ty = self.generate_kind(expr)?;
        self.system.node_types.insert(expr.id, ty.clone());
        self.system.node_spans.insert(expr.id, expr.span);
        Some(ty)
    }

    fn generate_kind(&mut self, expr: &Expr) -> Option<Type> {
        match &expr.kind {
            ExprKind::IntLit(_) => {
                Some(self.literal(expr, self.system.ctx.prelude.integer_literal))
            }
            ExprKind::FloatLit(_) => {
                Some(self.literal(expr, self.system.ctx.prelude.float_literal))
            }
            ExprKind::StringLit(_) => {
                Some(self.literal(expr, self.system.ctx.prelude.string_literal))
            }
            ExprKind::BoolLit(_) => Some(self.system.ctx.prelude.bool_type()),
            ExprKind::Name { .. } | ExprKind::OperatorRef { .. } | ExprKind::SelfValue => {
                self.reference(expr)
            }
            ExprKind::Member { base, name } => {
                let base_ty = self.generate(base)?;
                let locator = self
                    .system
                    .intern(Locator::with_step(expr.id, PathStep::Member(name.clone())));
                let member_var = self.system.fresh_var(true);
                self.system.add_constraint(Constraint::Member {
                    base: base_ty,
                    name: name.clone(),
                    member: Type::var(member_var),
                    is_type_member: false,
                    locator,
                });
                Some(Type::var(member_var))
            }
            ExprKind::Paren(inner) => self.generate(inner),
            ExprKind::Tuple { elements } => {
                // The one trivial rule: the tuple of the children's types
                // verbatim, no fresh variable.
                let mut tuple_elements = Vec::with_capacity(elements.len());
                for element in elements {
                    let ty = self.generate(&element.expr)?;
                    tuple_elements.push(TupleElement {
                        name: element.name.clone(),
                        ty,
                        variadic: false,
                        has_default: false,
                    });
                }
                Some(Type::tuple(tuple_elements))
            }
            ExprKind::ArrayLit { elements } => {
                let locator = self.system.intern(Locator::new(expr.id));
                let array_var = self.system.fresh_var(false);
                let element_var = self.system.fresh_var(false);
                self.system.add_constraint(Constraint::ConformsTo {
                    ty: Type::var(array_var),
                    protocol: self.system.ctx.prelude.array_literal,
                    locator,
                });
                self.system.add_constraint(Constraint::Member {
                    base: Type::var(array_var),
                    name: "Element".to_string(),
                    member: Type::var(element_var),
                    is_type_member: true,
                    locator,
                });
                for (index, element) in elements.iter().enumerate() {
                    let element_ty = self.generate(element)?;
                    let element_locator = self
                        .system
                        .intern(Locator::with_step(expr.id, PathStep::LiteralElement(index)));
                    self.system.relate(
                        TypeMatchKind::Conversion,
                        element_ty,
                        Type::var(element_var),
                        element_locator,
                    );
                }
                Some(Type::var(array_var))
            }
            ExprKind::DictLit { entries } => {
                let locator = self.system.intern(Locator::new(expr.id));
                let dict_var = self.system.fresh_var(false);
                let key_var = self.system.fresh_var(false);
                let value_var = self.system.fresh_var(false);
                self.system.add_constraint(Constraint::ConformsTo {
                    ty: Type::var(dict_var),
                    protocol: self.system.ctx.prelude.dictionary_literal,
                    locator,
                });
                self.system.add_constraint(Constraint::Member {
                    base: Type::var(dict_var),
                    name: "Key".to_string(),
                    member: Type::var(key_var),
                    is_type_member: true,
                    locator,
                });
                self.system.add_constraint(Constraint::Member {
                    base: Type::var(dict_var),
                    name: "Value".to_string(),
                    member: Type::var(value_var),
                    is_type_member: true,
                    locator,
                });
                for (index, entry) in entries.iter().enumerate() {
                    let key_ty = self.generate(&entry.key)?;
                    let value_ty = self.generate(&entry.value)?;
                    let entry_locator = self
                        .system
                        .intern(Locator::with_step(expr.id, PathStep::LiteralElement(index)));
                    self.system.relate(
                        TypeMatchKind::Conversion,
                        key_ty,
                        Type::var(key_var),
                        entry_locator,
                    );
                    self.system.relate(
                        TypeMatchKind::Conversion,
                        value_ty,
                        Type::var(value_var),
                        entry_locator,
                    );
                }
                Some(Type::var(dict_var))
            }
            ExprKind::Call { callee, arg } => {
                let callee_ty = self.generate(callee)?;
                let arg_ty = self.generate(arg)?;
                let locator = self.system.intern(Locator::new(expr.id));
                let result_var = self.system.fresh_var(false);
                // Not a plain equality: the callee may still be an
                // unresolved overload set; this shape becomes solvable once
                // it desugars to a concrete function type.
                self.system.add_constraint(Constraint::Applicable {
                    fn_shape: Type::func(arg_ty, Type::var(result_var)),
                    callee: callee_ty,
                    locator,
                });
                Some(Type::var(result_var))
            }
            ExprKind::Closure { params, body } => {
                let mut param_elements = Vec::with_capacity(params.len());
                for param in params {
                    let param_ty = param
                        .ty
                        .as_ref()
                        .and_then(|annotation| self.annotations.get(&annotation.id).cloned())
                        .unwrap_or_else(|| Type::var(self.system.fresh_var(false)));
                    if let Some(DeclRef::Resolved(decl)) = self.system.ctx.refs.get(&param.id) {
                        self.system.local_overrides.insert(*decl, param_ty.clone());
                    }
                    self.system.node_types.insert(param.id, param_ty.clone());
                    self.system.node_spans.insert(param.id, param.span);
                    param_elements.push(TupleElement::unnamed(param_ty));
                }
                // The body folds into this same system: its result type
                // participates directly in outer inference.
                let body_ty = self.generate(body)?;
                Some(Type::func(Type::tuple(param_elements), body_ty))
            }
            ExprKind::If {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond_ty = self.generate(cond)?;
                let cond_locator = self.system.intern(Locator::new(cond.id));
                let bool_ty = self.system.ctx.prelude.bool_type();
                self.system
                    .relate(TypeMatchKind::Conversion, cond_ty, bool_ty, cond_locator);

                // Both branches join at a shared fresh result variable.
                let result_var = self.system.fresh_var(false);
                let then_ty = self.generate(then_expr)?;
                let else_ty = self.generate(else_expr)?;
                let then_locator = self
                    .system
                    .intern(Locator::with_step(expr.id, PathStep::IfBranch(0)));
                let else_locator = self
                    .system
                    .intern(Locator::with_step(expr.id, PathStep::IfBranch(1)));
                self.system.relate(
                    TypeMatchKind::Conversion,
                    then_ty,
                    Type::var(result_var),
                    then_locator,
                );
                self.system.relate(
                    TypeMatchKind::Conversion,
                    else_ty,
                    Type::var(result_var),
                    else_locator,
                );
                Some(Type::var(result_var))
            }
            ExprKind::AddressOf { expr: inner } => {
                let operand_ty = self.generate(inner)?;
                self.address_of(expr.id, operand_ty)
            }
        }
    }

    fn literal(&mut self, expr: &Expr, protocol: crate::core::decls::DeclId) -> Type {
        let locator = self.system.intern(Locator::new(expr.id));
        let var = self.system.fresh_var(false);
        self.system.add_constraint(Constraint::ConformsTo {
            ty: Type::var(var),
            protocol,
            locator,
        });
        Type::var(var)
    }

    fn reference(&mut self, expr: &Expr) -> Option<Type> {
        let locator = self.system.intern(Locator::new(expr.id));
        match self.system.ctx.refs.get(&expr.id) {
            Some(DeclRef::Resolved(decl)) => {
                let decl = *decl;
                let mut side = Vec::new();
                let ty = self.system.type_of_reference(decl, locator, &mut side);
                for constraint in side {
                    self.system.add_constraint(constraint);
                }
                Some(ty)
            }
            Some(DeclRef::Overloaded(candidates)) => {
                let choices: Vec<OverloadChoice> = candidates
                    .iter()
                    .map(|decl| OverloadChoice::Decl {
                        decl: *decl,
                        base: None,
                    })
                    .collect();
                let bound_var = self.system.fresh_var(true);
                self.system.add_overload_set(OverloadSet {
                    bound_var,
                    choices,
                    locator,
                });
                Some(Type::var(bound_var))
            }
            Some(DeclRef::Poisoned) | None => None,
        }
    }

    /// Address-of admits three structurally different lowerings, modeled as
    /// a disjunction: a plain settable-lvalue reference, a conversion
    /// through an `__inout_conversion` witness, or a writeback through
    /// getter/setter witnesses.
    fn address_of(&mut self, anchor: NodeId, operand_ty: Type) -> Option<Type> {
        let locator = self
            .system
            .intern(Locator::with_step(anchor, PathStep::AddressOf));
        let result_var = self.system.fresh_var(true);

        let object_var = self.system.fresh_var(false);
        let direct = vec![
            Constraint::Relate {
                kind: TypeMatchKind::SameType,
                first: operand_ty.clone(),
                second: Type::lvalue(
                    Type::var(object_var),
                    LValueQualifiers::implicit_settable(),
                ),
                locator,
            },
            Constraint::Relate {
                kind: TypeMatchKind::Bind,
                first: Type::var(result_var),
                second: Type::lvalue(
                    Type::var(object_var),
                    LValueQualifiers::explicit_settable(),
                ),
                locator,
            },
        ];

        let conv_member = self.system.fresh_var(true);
        let conv_out = self.system.fresh_var(false);
        let via_conversion = vec![
            Constraint::Member {
                base: operand_ty.clone(),
                name: INOUT_CONVERSION_MEMBER.to_string(),
                member: Type::var(conv_member),
                is_type_member: false,
                locator,
            },
            Constraint::Applicable {
                fn_shape: Type::func(Type::unit(), Type::var(conv_out)),
                callee: Type::var(conv_member),
                locator,
            },
            Constraint::Relate {
                kind: TypeMatchKind::Subtype,
                first: Type::var(conv_out),
                second: Type::var(result_var),
                locator,
            },
        ];

        let getter = self.system.fresh_var(true);
        let setter = self.system.fresh_var(true);
        let value_var = self.system.fresh_var(false);
        let via_writeback = vec![
            Constraint::Member {
                base: operand_ty.clone(),
                name: WRITEBACK_GET_MEMBER.to_string(),
                member: Type::var(getter),
                is_type_member: false,
                locator,
            },
            Constraint::Member {
                base: operand_ty,
                name: WRITEBACK_SET_MEMBER.to_string(),
                member: Type::var(setter),
                is_type_member: false,
                locator,
            },
            Constraint::Applicable {
                fn_shape: Type::func(Type::unit(), Type::var(value_var)),
                callee: Type::var(getter),
                locator,
            },
            Constraint::Applicable {
                fn_shape: Type::func(
                    Type::tuple(vec![TupleElement::unnamed(Type::var(value_var))]),
                    Type::unit(),
                ),
                callee: Type::var(setter),
                locator,
            },
            Constraint::Relate {
                kind: TypeMatchKind::Bind,
                first: Type::var(result_var),
                second: Type::lvalue(
                    Type::var(value_var),
                    LValueQualifiers::explicit_settable(),
                ),
                locator,
            },
        ];

        self.system.add_constraint(Constraint::Disjunction {
            branches: vec![direct, via_conversion, via_writeback],
            locator,
        });
        Some(Type::var(result_var))
    }
}
