// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Statement AST nodes.

use crate::decl::Decl;
use crate::expr::{BinOp, Expr};
use crate::ty::TypeRef;
use crate::{NodeId, Span};

/// A statement in the AST.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

/// The kind of statement.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Expression statement (includes `return`, `throw`, `if`, `when`, `try`)
    Expr(Expr),
    /// Local `val` / `var`
    Local {
        name: String,
        name_span: Span,
        mutable: bool,
        ty: Option<TypeRef>,
        init: Option<Expr>,
    },
    /// Destructuring `val (a, b) = init`
    LocalTuple {
        names: Vec<String>,
        mutable: bool,
        init: Expr,
    },
    /// Assignment `target = value` or compound `target += value`
    Assign {
        target: Expr,
        op: Option<BinOp>,
        value: Expr,
    },
    /// `for (binding in iter) { body }`
    For {
        label: Option<String>,
        binding: String,
        iter: Expr,
        body: Vec<Stmt>,
    },
    /// `while (cond) { body }`
    While {
        label: Option<String>,
        cond: Expr,
        body: Vec<Stmt>,
    },
    /// `do { body } while (cond)`
    DoWhile {
        label: Option<String>,
        body: Vec<Stmt>,
        cond: Expr,
    },
    /// Local function or class declared inside a body
    Decl(Box<Decl>),
}

impl Stmt {
    /// Name introduced by a local declaration statement, if any.
    pub fn declared_name(&self) -> Option<&str> {
        match &self.kind {
            StmtKind::Local { name, .. } => Some(name),
            _ => None,
        }
    }
}
