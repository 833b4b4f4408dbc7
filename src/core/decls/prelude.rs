//! Builtin declarations every module is checked against.

use crate::core::diag::Span;
use crate::core::tree::Fixity;
use crate::core::types::{TupleElement, Type};

use super::{
    AliasDecl, AssocTypeDecl, CtorDecl, DeclId, DeclKind, DeclTable, FuncDecl, GenericParam,
    GenericSig, NominalDecl, ProtocolDecl,
};

/// Well-known declarations installed by [`install_prelude`].
#[derive(Debug, Clone)]
pub struct Prelude {
    pub int: DeclId,
    pub double: DeclId,
    pub bool_: DeclId,
    pub string: DeclId,
    pub char_: DeclId,
    pub array: DeclId,
    pub dictionary: DeclId,
    pub integer_literal: DeclId,
    pub float_literal: DeclId,
    pub string_literal: DeclId,
    pub array_literal: DeclId,
    pub dictionary_literal: DeclId,
}

impl Prelude {
    pub fn int_type(&self) -> Type {
        Type::nominal(self.int, "Int")
    }

    pub fn double_type(&self) -> Type {
        Type::nominal(self.double, "Double")
    }

    pub fn bool_type(&self) -> Type {
        Type::nominal(self.bool_, "Bool")
    }

    pub fn string_type(&self) -> Type {
        Type::nominal(self.string, "String")
    }

    pub fn array_of(&self, element: Type) -> Type {
        Type::bound_generic(self.array, "Array", vec![element])
    }

    pub fn dictionary_of(&self, key: Type, value: Type) -> Type {
        Type::bound_generic(self.dictionary, "Dictionary", vec![key, value])
    }
}

fn add_struct(table: &mut DeclTable, name: &str) -> DeclId {
    table.add_decl(
        name,
        DeclKind::Struct(NominalDecl::default()),
        Span::default(),
    )
}

fn add_literal_protocol(table: &mut DeclTable, name: &str, assoc_names: &[&str]) -> DeclId {
    let self_archetype = table.fresh_archetype("Self", Vec::new(), None);
    let proto = table.add_decl(
        name,
        DeclKind::Protocol(ProtocolDecl {
            inherited: Vec::new(),
            self_archetype,
            requirements: Vec::new(),
            assoc_types: Vec::new(),
            literal_default: None,
        }),
        Span::default(),
    );
    table.archetype_mut(self_archetype).bounds.push(proto);

    let mut assoc_ids = Vec::new();
    for assoc_name in assoc_names {
        let archetype = table.fresh_archetype(*assoc_name, Vec::new(), None);
        let assoc = table.add_decl(
            *assoc_name,
            DeclKind::AssocType(AssocTypeDecl {
                protocol: proto,
                archetype,
            }),
            Span::default(),
        );
        table.add_member(proto, assoc);
        assoc_ids.push(assoc);
    }
    if let DeclKind::Protocol(decl) = &mut table.decl_mut(proto).kind {
        decl.assoc_types = assoc_ids;
    }
    proto
}

fn set_literal_default(table: &mut DeclTable, proto: DeclId, default: Type) {
    if let DeclKind::Protocol(decl) = &mut table.decl_mut(proto).kind {
        decl.literal_default = Some(default);
    }
}

fn add_conformance(table: &mut DeclTable, nominal: DeclId, proto: DeclId) {
    match &mut table.decl_mut(nominal).kind {
        DeclKind::Struct(decl) | DeclKind::Enum(decl) => decl.conformances.push(proto),
        DeclKind::Class(decl) => decl.conformances.push(proto),
        _ => {}
    }
}

fn add_binary_operator(table: &mut DeclTable, name: &str, lhs: Type, rhs: Type, ret: Type) {
    let func = FuncDecl {
        owner: None,
        is_static: false,
        fixity: Fixity::None,
        generics: GenericSig::default(),
        params: vec![TupleElement::unnamed(lhs), TupleElement::unnamed(rhs)],
        ret,
        is_requirement: false,
        has_default_impl: false,
    };
    table.add_decl(name, DeclKind::Func(func), Span::default());
}

fn add_prefix_operator(table: &mut DeclTable, name: &str, operand: Type, ret: Type) {
    let func = FuncDecl {
        owner: None,
        is_static: false,
        fixity: Fixity::Prefix,
        generics: GenericSig::default(),
        params: vec![TupleElement::unnamed(operand)],
        ret,
        is_requirement: false,
        has_default_impl: false,
    };
    table.add_decl(name, DeclKind::Func(func), Span::default());
}

fn add_default_constructor(table: &mut DeclTable, owner: DeclId, params: Vec<TupleElement>) {
    let ctor = table.add_decl(
        "init",
        DeclKind::Constructor(CtorDecl {
            owner,
            generics: GenericSig::default(),
            params,
        }),
        Span::default(),
    );
    table.add_member(owner, ctor);
}

/// Installs the builtin nominal types, literal protocols, and operator
/// overloads into a fresh table.
pub fn install_prelude(table: &mut DeclTable) -> Prelude {
    let int = add_struct(table, "Int");
    let double = add_struct(table, "Double");
    let bool_ = add_struct(table, "Bool");
    let string = add_struct(table, "String");
    let char_ = add_struct(table, "Char");

    let int_ty = Type::nominal(int, "Int");
    let double_ty = Type::nominal(double, "Double");
    let bool_ty = Type::nominal(bool_, "Bool");
    let string_ty = Type::nominal(string, "String");

    add_default_constructor(table, int, vec![TupleElement::unnamed(int_ty.clone())]);
    add_default_constructor(table, double, vec![TupleElement::unnamed(double_ty.clone())]);
    add_default_constructor(table, string, vec![TupleElement::unnamed(string_ty.clone())]);

    // Array<Element> and Dictionary<Key, Value>.
    let array_elem = table.fresh_archetype("Element", Vec::new(), None);
    let array = table.add_decl(
        "Array",
        DeclKind::Struct(NominalDecl {
            generics: GenericSig {
                params: vec![GenericParam {
                    name: "Element".into(),
                    archetype: array_elem,
                }],
            },
            conformances: Vec::new(),
        }),
        Span::default(),
    );

    let dict_key = table.fresh_archetype("Key", Vec::new(), None);
    let dict_value = table.fresh_archetype("Value", Vec::new(), None);
    let dictionary = table.add_decl(
        "Dictionary",
        DeclKind::Struct(NominalDecl {
            generics: GenericSig {
                params: vec![
                    GenericParam {
                        name: "Key".into(),
                        archetype: dict_key,
                    },
                    GenericParam {
                        name: "Value".into(),
                        archetype: dict_value,
                    },
                ],
            },
            conformances: Vec::new(),
        }),
        Span::default(),
    );

    // Literal-convertible protocols and their default types.
    let integer_literal = add_literal_protocol(table, "IntegerLiteral", &[]);
    let float_literal = add_literal_protocol(table, "FloatLiteral", &[]);
    let string_literal = add_literal_protocol(table, "StringLiteral", &[]);
    let array_literal = add_literal_protocol(table, "ArrayLiteral", &["Element"]);
    let dictionary_literal = add_literal_protocol(table, "DictionaryLiteral", &["Key", "Value"]);

    set_literal_default(table, integer_literal, int_ty.clone());
    set_literal_default(table, float_literal, double_ty.clone());
    set_literal_default(table, string_literal, string_ty.clone());
    // Collection literal defaults keep their element archetypes; the solver
    // opens them to fresh variables when defaulting.
    let array_default = table.declared_type(array);
    set_literal_default(table, array_literal, array_default);
    let dictionary_default = table.declared_type(dictionary);
    set_literal_default(table, dictionary_literal, dictionary_default);

    add_conformance(table, int, integer_literal);
    add_conformance(table, double, integer_literal);
    add_conformance(table, double, float_literal);
    add_conformance(table, string, string_literal);
    add_conformance(table, array, array_literal);
    add_conformance(table, dictionary, dictionary_literal);

    // `Any` is alias sugar for the empty protocol composition.
    table.add_decl(
        "Any",
        DeclKind::TypeAlias(AliasDecl {
            underlying: Type::any(),
        }),
        Span::default(),
    );

    // Builtin arithmetic and comparison operators.
    for op in ["+", "-", "*", "/"] {
        add_binary_operator(table, op, int_ty.clone(), int_ty.clone(), int_ty.clone());
        add_binary_operator(
            table,
            op,
            double_ty.clone(),
            double_ty.clone(),
            double_ty.clone(),
        );
    }
    for op in ["==", "!=", "<", "<=", ">", ">="] {
        add_binary_operator(table, op, int_ty.clone(), int_ty.clone(), bool_ty.clone());
        add_binary_operator(
            table,
            op,
            double_ty.clone(),
            double_ty.clone(),
            bool_ty.clone(),
        );
    }
    add_binary_operator(
        table,
        "+",
        string_ty.clone(),
        string_ty.clone(),
        string_ty.clone(),
    );
    add_binary_operator(table, "==", string_ty.clone(), string_ty, bool_ty.clone());
    add_prefix_operator(table, "-", int_ty.clone(), int_ty);
    add_prefix_operator(table, "-", double_ty.clone(), double_ty);
    add_prefix_operator(table, "!", bool_ty.clone(), bool_ty);

    Prelude {
        int,
        double,
        bool_,
        string,
        char_,
        array,
        dictionary,
        integer_literal,
        float_literal,
        string_literal,
        array_literal,
        dictionary_literal,
    }
}
