//! Abstract Syntax Tree (AST) definitions
//!
//! A tagged-variant tree for the traced script language. Every node carries a
//! [`Span`] so the instrumenter can stamp probes with the line of the construct
//! they describe. The tree is plain data: instrumentation bookkeeping lives outside
//! of it.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Top-level program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// Identifier with its location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Braced statement list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// Declaration keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclKind {
    Let,
    Const,
    Var,
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Let => "let",
            DeclKind::Const => "const",
            DeclKind::Var => "var",
        }
    }
}

/// `let a = 1, b;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub kind: DeclKind,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

/// One binding inside a variable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declarator {
    pub name: Identifier,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Function declaration, function expression, arrow function or method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: Option<Identifier>,
    pub params: Vec<Identifier>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub span: Span,
}

/// Arrow functions may have a bare expression body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    Block(Block),
    Expr(Box<Expr>),
}

/// `class Name { constructor() {} method() {} }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Identifier,
    pub methods: Vec<Method>,
    pub span: Span,
}

/// Class method (the constructor is a method named `constructor`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: Identifier,
    pub function: Function,
    pub span: Span,
}

/// Left-hand side of an assignment or update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    Identifier(Identifier),
    Member(MemberExpr),
    Index(IndexExpr),
}

impl AssignTarget {
    pub fn span(&self) -> Span {
        match self {
            AssignTarget::Identifier(id) => id.span,
            AssignTarget::Member(m) => m.span,
            AssignTarget::Index(i) => i.span,
        }
    }

    /// Convert an expression into an assignment target, if it is one
    pub fn from_expr(expr: Expr) -> Option<AssignTarget> {
        match expr {
            Expr::Identifier(id) => Some(AssignTarget::Identifier(id)),
            Expr::Member(m) => Some(AssignTarget::Member(m)),
            Expr::Index(i) => Some(AssignTarget::Index(i)),
            Expr::Group(g) => AssignTarget::from_expr(*g.expr),
            _ => None,
        }
    }

    /// The target read back as an expression
    pub fn to_expr(&self) -> Expr {
        match self {
            AssignTarget::Identifier(id) => Expr::Identifier(id.clone()),
            AssignTarget::Member(m) => Expr::Member(m.clone()),
            AssignTarget::Index(i) => Expr::Index(i.clone()),
        }
    }
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
        }
    }

    /// Binary operator applied by a compound assignment
    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
        }
    }
}

/// `target op= value;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub target: AssignTarget,
    pub op: AssignOp,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

/// `x++;` / `--x;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStmt {
    pub target: AssignTarget,
    pub op: UpdateOp,
    pub prefix: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

/// Classic `for (init; cond; update) body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub update: Option<Box<Stmt>>,
    pub body: Box<Stmt>,
    pub span: Span,
}

/// `for (const x of xs) body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForOfStmt {
    pub kind: DeclKind,
    pub binding: Identifier,
    pub iterable: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

/// `break` / `continue` with an optional label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpStmt {
    pub label: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowStmt {
    pub value: Expr,
    pub span: Span,
}

/// `label: body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledStmt {
    pub label: Identifier,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    VarDecl(VarDecl),
    FunctionDecl(Function),
    ClassDecl(ClassDecl),
    Assign(AssignStmt),
    Update(UpdateStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    ForOf(ForOfStmt),
    Return(ReturnStmt),
    Break(JumpStmt),
    Continue(JumpStmt),
    Throw(ThrowStmt),
    Block(Block),
    Labeled(LabeledStmt),
    Expr(ExprStmt),
    Empty(Span),
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayLiteral {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectLiteral {
    pub properties: Vec<Property>,
    pub span: Span,
}

/// `key: value` inside an object literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
    Typeof,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::Typeof => "typeof ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

/// `cond ? a : b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalExpr {
    pub cond: Box<Expr>,
    pub then_expr: Box<Expr>,
    pub else_expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// `object.property`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpr {
    pub object: Box<Expr>,
    pub property: Identifier,
    pub span: Span,
}

/// `object[index]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexExpr {
    pub object: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupExpr {
    pub expr: Box<Expr>,
    pub span: Span,
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal, Span),
    Identifier(Identifier),
    This(Span),
    Array(ArrayLiteral),
    Object(ObjectLiteral),
    Function(Box<Function>),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Conditional(ConditionalExpr),
    Call(CallExpr),
    New(NewExpr),
    Member(MemberExpr),
    Index(IndexExpr),
    Group(GroupExpr),
}

impl Expr {
    /// Get the span of this expression
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, span) => *span,
            Expr::Identifier(id) => id.span,
            Expr::This(span) => *span,
            Expr::Array(a) => a.span,
            Expr::Object(o) => o.span,
            Expr::Function(f) => f.span,
            Expr::Unary(u) => u.span,
            Expr::Binary(b) => b.span,
            Expr::Conditional(c) => c.span,
            Expr::Call(c) => c.span,
            Expr::New(n) => n.span,
            Expr::Member(m) => m.span,
            Expr::Index(i) => i.span,
            Expr::Group(g) => g.span,
        }
    }

    pub fn ident(name: impl Into<String>, span: Span) -> Expr {
        Expr::Identifier(Identifier::new(name, span))
    }

    pub fn string(value: impl Into<String>, span: Span) -> Expr {
        Expr::Literal(Literal::String(value.into()), span)
    }

    pub fn number(value: f64, span: Span) -> Expr {
        Expr::Literal(Literal::Number(value), span)
    }

    pub fn call(callee: Expr, args: Vec<Expr>, span: Span) -> Expr {
        Expr::Call(CallExpr {
            callee: Box::new(callee),
            args,
            span,
        })
    }

    /// Name of the function being called when the callee is a plain identifier
    pub fn callee_name(&self) -> Option<&str> {
        match self {
            Expr::Call(call) => match call.callee.as_ref() {
                Expr::Identifier(id) => Some(id.name.as_str()),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Stmt {
    /// Get the span of this statement
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl(v) => v.span,
            Stmt::FunctionDecl(f) => f.span,
            Stmt::ClassDecl(c) => c.span,
            Stmt::Assign(a) => a.span,
            Stmt::Update(u) => u.span,
            Stmt::If(i) => i.span,
            Stmt::While(w) => w.span,
            Stmt::For(f) => f.span,
            Stmt::ForOf(f) => f.span,
            Stmt::Return(r) => r.span,
            Stmt::Break(j) | Stmt::Continue(j) => j.span,
            Stmt::Throw(t) => t.span,
            Stmt::Block(b) => b.span,
            Stmt::Labeled(l) => l.span,
            Stmt::Expr(e) => e.span,
            Stmt::Empty(span) => *span,
        }
    }

    pub fn expr(expr: Expr) -> Stmt {
        let span = expr.span();
        Stmt::Expr(ExprStmt { expr, span })
    }

    /// Wrap a statement in a block unless it already is one
    pub fn into_block(self) -> Block {
        match self {
            Stmt::Block(block) => block,
            other => {
                let span = other.span();
                Block {
                    statements: vec![other],
                    span,
                }
            }
        }
    }

    /// Whether this statement is a loop (a valid `continue` target)
    pub fn is_loop(&self) -> bool {
        matches!(self, Stmt::While(_) | Stmt::For(_) | Stmt::ForOf(_))
    }
}
