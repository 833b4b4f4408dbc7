//! Display rendering for types as they appear in diagnostics.

use std::fmt::{Display, Formatter, Result as FmtResult};

use super::{TupleElement, Type};

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Type::Error => write!(f, "<error>"),
            Type::Nominal { name, .. } => write!(f, "{name}"),
            Type::BoundGeneric { name, args, .. } => {
                write!(f, "{name}<")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            Type::Tuple { elements } => {
                write!(f, "(")?;
                for (index, elem) in elements.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Type::Fn {
                input,
                output,
                flags,
            } => {
                if flags.autoclosure {
                    write!(f, "@autoclosure ")?;
                }
                if flags.noreturn {
                    write!(f, "@noreturn ")?;
                }
                write!(f, "{input} -> {output}")
            }
            Type::Metatype { instance } => write!(f, "{instance}.Type"),
            Type::Archetype { name, .. } => write!(f, "{name}"),
            Type::Existential { protocols } => {
                if protocols.is_empty() {
                    return write!(f, "Any");
                }
                for (index, proto) in protocols.iter().enumerate() {
                    if index > 0 {
                        write!(f, " & ")?;
                    }
                    write!(f, "{}", proto.name)?;
                }
                Ok(())
            }
            Type::LValue { object, .. } => write!(f, "@lvalue {object}"),
            Type::Var(var) => write!(f, "{var}"),
        }
    }
}

impl Display for TupleElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(name) = &self.name {
            write!(f, "{name}: ")?;
        }
        write!(f, "{}", self.ty)?;
        if self.variadic {
            write!(f, "...")?;
        }
        Ok(())
    }
}
