// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression AST nodes.

use crate::stmt::Stmt;
use crate::ty::TypeRef;
use crate::{NodeId, Span};

/// An expression in the AST.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

/// The kind of expression.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal; templates are kept as raw text
    String(String),
    /// Character literal
    Char(char),
    /// Boolean literal
    Bool(bool),
    /// `null`
    Null,
    /// Identifier
    Ident(String),
    /// `this`, optionally labeled (`this@Outer`)
    This(Option<String>),
    /// `super`
    Super,
    /// Parenthesized expression
    Paren(Box<Expr>),
    /// Binary operation
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Prefix operation
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Postfix `++` / `--`
    Postfix {
        op: PostfixOp,
        operand: Box<Expr>,
    },
    /// Not-null assertion `x!!`
    NotNull(Box<Expr>),
    /// Elvis `a ?: b`
    Elvis {
        value: Box<Expr>,
        default: Box<Expr>,
    },
    /// Call of a plain callee: `f(a, b)`, `Reader(x) { ... }`.
    /// A trailing lambda is appended to `args`.
    Call {
        callee: Box<Expr>,
        type_args: Vec<TypeRef>,
        args: Vec<Expr>,
    },
    /// Qualified call `receiver.method(args)` or safe call `receiver?.method(args)`.
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        /// Span of the selector (method name) only.
        method_span: Span,
        type_args: Vec<TypeRef>,
        args: Vec<Expr>,
        safe: bool,
    },
    /// Member access `object.field` / `object?.field`
    Field {
        object: Box<Expr>,
        field: String,
        field_span: Span,
        safe: bool,
    },
    /// Index access `a[i]`
    Index {
        object: Box<Expr>,
        indices: Vec<Expr>,
    },
    /// Lambda literal `{ a, b -> body }`
    Lambda {
        params: Vec<LambdaParam>,
        body: Vec<Stmt>,
    },
    /// Callable reference `::name` or `Type::name`
    CallableRef {
        receiver: Option<String>,
        name: String,
    },
    /// `if (cond) a else b`
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    /// `when (subject) { ... }`
    When {
        subject: Option<Box<Expr>>,
        arms: Vec<WhenArm>,
    },
    /// `try { } catch (e: T) { } finally { }`
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    /// Braced branch body of `if`/`when`
    Block(Vec<Stmt>),
    /// `x as T` / `x as? T`
    Cast {
        expr: Box<Expr>,
        ty: TypeRef,
        safe: bool,
    },
    /// `x is T` / `x !is T`
    Is {
        expr: Box<Expr>,
        ty: TypeRef,
        negated: bool,
    },
    /// `return` / `return@label value`
    Return {
        label: Option<String>,
        value: Option<Box<Expr>>,
    },
    /// `throw e`
    Throw(Box<Expr>),
    /// `break` / `break@label`
    Break(Option<String>),
    /// `continue` / `continue@label`
    Continue(Option<String>),
}

impl Expr {
    /// True for expressions that evaluate to a function value.
    pub fn is_function_value(&self) -> bool {
        match &self.kind {
            ExprKind::Lambda { .. } | ExprKind::CallableRef { .. } => true,
            ExprKind::Paren(inner) => inner.is_function_value(),
            _ => false,
        }
    }

    /// Name referenced by a plain identifier expression.
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// A lambda parameter. Lambdas without explicit parameters bind `it`.
#[derive(Debug, Clone)]
pub struct LambdaParam {
    pub name: String,
    pub ty: Option<TypeRef>,
}

/// One `when` branch.
#[derive(Debug, Clone)]
pub struct WhenArm {
    pub conditions: Vec<WhenCondition>,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone)]
pub enum WhenCondition {
    Expr(Expr),
    Is { ty: TypeRef, negated: bool },
    In { expr: Expr, negated: bool },
    Else,
}

/// `catch (name: Type) { body }`
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub name: String,
    pub ty: TypeRef,
    pub body: Vec<Stmt>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Identical,
    NotIdentical,
    Lt,
    Gt,
    Le,
    Ge,
    // Logical
    And,
    Or,
    // Other
    Range,
    In,
    NotIn,
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    PreInc,
    PreDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Inc,
    Dec,
}
