//! Parsed syntax tree for Lyra modules.
//!
//! Every node carries a `NodeId` and a source span. Declaration references
//! stay as plain names here; the resolver publishes candidate lists in a side
//! table keyed by `NodeId`, and the type checker keys its own inference
//! results the same way.

use crate::core::diag::Span;
use crate::core::tree::NodeId;

#[derive(Debug, Clone)]
pub struct Module {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub id: NodeId,
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    Func(FuncItem),
    Struct(TypeItem),
    Class(TypeItem),
    Enum(EnumItem),
    Protocol(ProtocolItem),
    Var(VarItem),
    Init(InitItem),
    AssocType(AssocTypeItem),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixity {
    None,
    Prefix,
    Postfix,
}

#[derive(Debug, Clone)]
pub struct GenericParamSyntax {
    pub name: String,
    pub bounds: Vec<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ParamSyntax {
    pub id: NodeId,
    pub name: Option<String>,
    pub ty: TypeExpr,
    pub variadic: bool,
    pub has_default: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FuncItem {
    pub name: String,
    pub fixity: Fixity,
    pub is_static: bool,
    pub generics: Vec<GenericParamSyntax>,
    pub params: Vec<ParamSyntax>,
    pub ret: Option<TypeExpr>,
    pub body: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct TypeItem {
    pub name: String,
    pub generics: Vec<GenericParamSyntax>,
    pub inherits: Vec<TypeExpr>,
    pub members: Vec<Item>,
}

#[derive(Debug, Clone)]
pub struct EnumCaseSyntax {
    pub id: NodeId,
    pub name: String,
    pub payload: Vec<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumItem {
    pub name: String,
    pub generics: Vec<GenericParamSyntax>,
    pub inherits: Vec<TypeExpr>,
    pub cases: Vec<EnumCaseSyntax>,
    pub members: Vec<Item>,
}

#[derive(Debug, Clone)]
pub struct ProtocolItem {
    pub name: String,
    pub inherits: Vec<TypeExpr>,
    pub members: Vec<Item>,
}

#[derive(Debug, Clone)]
pub struct AssocTypeItem {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct VarItem {
    pub is_let: bool,
    pub is_static: bool,
    pub pattern: Pattern,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct InitItem {
    pub params: Vec<ParamSyntax>,
    pub body: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(Expr),
    Var(VarItem),
    Return(Option<Expr>),
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: NodeId,
    pub kind: PatternKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    Name(String),
    Wildcard,
    Tuple(Vec<Pattern>),
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub id: NodeId,
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Named {
        name: String,
        args: Vec<TypeExpr>,
    },
    Tuple {
        elements: Vec<TupleTypeExprElem>,
    },
    Fn {
        input: Box<TypeExpr>,
        output: Box<TypeExpr>,
    },
    SelfType,
}

#[derive(Debug, Clone)]
pub struct TupleTypeExprElem {
    pub name: Option<String>,
    pub ty: TypeExpr,
    pub variadic: bool,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    StringLit(String),
    Name {
        name: String,
    },
    /// Reference to an operator function in applied position; fixity narrows
    /// resolution to matching candidates.
    OperatorRef {
        name: String,
        fixity: Fixity,
    },
    SelfValue,
    Member {
        base: Box<Expr>,
        name: String,
    },
    Tuple {
        elements: Vec<TupleExprElem>,
    },
    ArrayLit {
        elements: Vec<Expr>,
    },
    DictLit {
        entries: Vec<DictEntry>,
    },
    Call {
        callee: Box<Expr>,
        arg: Box<Expr>,
    },
    Closure {
        params: Vec<ClosureParamSyntax>,
        body: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    AddressOf {
        expr: Box<Expr>,
    },
    Paren(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct TupleExprElem {
    pub name: Option<String>,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct DictEntry {
    pub key: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct ClosureParamSyntax {
    pub id: NodeId,
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

impl Expr {
    /// True when the subtree is a single-expression closure body candidate;
    /// used by the constraint generator to fold closure bodies into the
    /// enclosing system.
    pub fn is_closure(&self) -> bool {
        matches!(self.kind, ExprKind::Closure { .. })
    }
}
