//! Type-variable storage: a union-find over solver-introduced placeholders.
//!
//! Each variable is either a root that owns its binding state or points at
//! the variable it was merged into. Binding is monotonic within one solver
//! attempt: a fixed type assigned to a root is never retracted; backtracking
//! restores an earlier clone of the whole store instead.

use crate::core::types::{Type, TypeVarId};

#[derive(Debug, Clone)]
struct TypeVarInfo {
    /// Union-find parent; self-parented variables are roots.
    parent: TypeVarId,
    rank: u32,
    can_bind_lvalue: bool,
    fixed: Option<Type>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeVarStore {
    vars: Vec<TypeVarInfo>,
}

/// Failure modes surfaced to the enclosing constraint instead of panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    /// Merging variables with mismatched lvalue capability.
    LValueCapability,
    /// Binding a variable to a type that contains it.
    OccursCheck,
}

impl TypeVarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, can_bind_lvalue: bool) -> TypeVarId {
        let id = TypeVarId(self.vars.len() as u32);
        self.vars.push(TypeVarInfo {
            parent: id,
            rank: 0,
            can_bind_lvalue,
            fixed: None,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn can_bind_lvalue(&mut self, var: TypeVarId) -> bool {
        let root = self.representative(var);
        self.vars[root.0 as usize].can_bind_lvalue
    }

    /// Canonical root of the equivalence class, with path compression.
    pub fn representative(&mut self, var: TypeVarId) -> TypeVarId {
        let mut root = var;
        while self.vars[root.0 as usize].parent != root {
            root = self.vars[root.0 as usize].parent;
        }
        let mut cursor = var;
        while self.vars[cursor.0 as usize].parent != root {
            let next = self.vars[cursor.0 as usize].parent;
            self.vars[cursor.0 as usize].parent = root;
            cursor = next;
        }
        root
    }

    /// Unions two equivalence classes. Both classes must agree on lvalue
    /// capability; a mismatch fails the enclosing constraint.
    pub fn merge_equivalence_classes(
        &mut self,
        a: TypeVarId,
        b: TypeVarId,
    ) -> Result<(), BindError> {
        let root_a = self.representative(a);
        let root_b = self.representative(b);
        if root_a == root_b {
            return Ok(());
        }
        if self.vars[root_a.0 as usize].can_bind_lvalue
            != self.vars[root_b.0 as usize].can_bind_lvalue
        {
            return Err(BindError::LValueCapability);
        }

        let (parent, child) =
            if self.vars[root_a.0 as usize].rank >= self.vars[root_b.0 as usize].rank {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
        // Keep an existing binding visible from the surviving root.
        if self.vars[parent.0 as usize].fixed.is_none() {
            self.vars[parent.0 as usize].fixed = self.vars[child.0 as usize].fixed.take();
        }
        self.vars[child.0 as usize].parent = parent;
        if self.vars[parent.0 as usize].rank == self.vars[child.0 as usize].rank {
            self.vars[parent.0 as usize].rank += 1;
        }
        Ok(())
    }

    /// Assigns a fixed type to the variable's root, guarding against
    /// self-referential bindings.
    pub fn assign_fixed_type(&mut self, var: TypeVarId, ty: Type) -> Result<(), BindError> {
        let resolved = self.resolve_shallow_vars(&ty);
        let root = self.representative(var);
        if self.occurs(root, &resolved) {
            return Err(BindError::OccursCheck);
        }
        self.vars[root.0 as usize].fixed = Some(resolved);
        Ok(())
    }

    /// The root's direct binding, if any.
    pub fn fixed_type(&mut self, var: TypeVarId) -> Option<Type> {
        let root = self.representative(var);
        self.vars[root.0 as usize].fixed.clone()
    }

    /// Dereferences through chains of variable-valued bindings to the first
    /// non-variable type, or the final unbound variable.
    pub fn fixed_type_recursive(&mut self, ty: &Type) -> Type {
        let mut current = ty.clone();
        loop {
            let Type::Var(var) = current else {
                return current;
            };
            let root = self.representative(var);
            match self.vars[root.0 as usize].fixed.clone() {
                Some(bound) => current = bound,
                None => return Type::Var(root),
            }
        }
    }

    /// Fully substitutes every bound variable inside `ty`.
    pub fn apply(&mut self, ty: &Type) -> Type {
        let resolved = self.fixed_type_recursive(ty);
        match resolved {
            Type::BoundGeneric { decl, name, args } => Type::BoundGeneric {
                decl,
                name,
                args: args.iter().map(|arg| self.apply(arg)).collect(),
            },
            Type::Tuple { elements } => Type::Tuple {
                elements: elements
                    .iter()
                    .map(|elem| crate::core::types::TupleElement {
                        name: elem.name.clone(),
                        ty: self.apply(&elem.ty),
                        variadic: elem.variadic,
                        has_default: elem.has_default,
                    })
                    .collect(),
            },
            Type::Fn {
                input,
                output,
                flags,
            } => Type::Fn {
                input: Box::new(self.apply(&input)),
                output: Box::new(self.apply(&output)),
                flags,
            },
            Type::Metatype { instance } => Type::Metatype {
                instance: Box::new(self.apply(&instance)),
            },
            Type::LValue { object, qualifiers } => Type::LValue {
                object: Box::new(self.apply(&object)),
                qualifiers,
            },
            other => other,
        }
    }

    fn occurs(&mut self, root: TypeVarId, ty: &Type) -> bool {
        let mut found = false;
        collect_vars(ty, &mut |var| {
            if self.representative(var) == root {
                found = true;
            }
        });
        found
    }

    /// Replaces variables appearing at the top of `ty` by their current
    /// bindings (one level), so occurs checks see through merges.
    fn resolve_shallow_vars(&mut self, ty: &Type) -> Type {
        match ty {
            Type::Var(var) => self.fixed_type_recursive(&Type::Var(*var)),
            other => other.clone(),
        }
    }
}

fn collect_vars(ty: &Type, visit: &mut dyn FnMut(TypeVarId)) {
    match ty {
        Type::Var(var) => visit(*var),
        Type::BoundGeneric { args, .. } => {
            for arg in args {
                collect_vars(arg, visit);
            }
        }
        Type::Tuple { elements } => {
            for elem in elements {
                collect_vars(&elem.ty, visit);
            }
        }
        Type::Fn { input, output, .. } => {
            collect_vars(input, visit);
            collect_vars(output, visit);
        }
        Type::Metatype { instance } => collect_vars(instance, visit),
        Type::LValue { object, .. } => collect_vars(object, visit),
        _ => {}
    }
}
