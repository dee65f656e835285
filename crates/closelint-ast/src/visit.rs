// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Ordered access to the direct children of expressions and statements.

use crate::expr::{Expr, ExprKind, WhenCondition};
use crate::stmt::{Stmt, StmtKind};

/// A direct child of a node: either an expression or a nested statement list.
#[derive(Debug, Clone, Copy)]
pub enum Child<'a> {
    Expr(&'a Expr),
    Stmts(&'a [Stmt]),
}

impl Expr {
    /// Direct children in evaluation order (receiver before arguments).
    pub fn children(&self) -> Vec<Child<'_>> {
        let mut out = Vec::new();
        match &self.kind {
            ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::String(_) | ExprKind::Char(_) |
            ExprKind::Bool(_) | ExprKind::Null | ExprKind::Ident(_) | ExprKind::This(_) |
            ExprKind::Super | ExprKind::CallableRef { .. } | ExprKind::Break(_) |
            ExprKind::Continue(_) => {}
            ExprKind::Paren(inner) | ExprKind::NotNull(inner) | ExprKind::Throw(inner) => {
                out.push(Child::Expr(inner));
            }
            ExprKind::Unary { operand, .. } | ExprKind::Postfix { operand, .. } => {
                out.push(Child::Expr(operand));
            }
            ExprKind::Binary { left, right, .. } => {
                out.push(Child::Expr(left));
                out.push(Child::Expr(right));
            }
            ExprKind::Elvis { value, default } => {
                out.push(Child::Expr(value));
                out.push(Child::Expr(default));
            }
            ExprKind::Call { callee, args, .. } => {
                out.push(Child::Expr(callee));
                out.extend(args.iter().map(Child::Expr));
            }
            ExprKind::MethodCall { receiver, args, .. } => {
                out.push(Child::Expr(receiver));
                out.extend(args.iter().map(Child::Expr));
            }
            ExprKind::Field { object, .. } => out.push(Child::Expr(object)),
            ExprKind::Index { object, indices } => {
                out.push(Child::Expr(object));
                out.extend(indices.iter().map(Child::Expr));
            }
            ExprKind::Lambda { body, .. } | ExprKind::Block(body) => out.push(Child::Stmts(body)),
            ExprKind::If { cond, then_branch, else_branch } => {
                out.push(Child::Expr(cond));
                out.push(Child::Expr(then_branch));
                if let Some(e) = else_branch {
                    out.push(Child::Expr(e));
                }
            }
            ExprKind::When { subject, arms } => {
                if let Some(s) = subject {
                    out.push(Child::Expr(s));
                }
                for arm in arms {
                    for cond in &arm.conditions {
                        match cond {
                            WhenCondition::Expr(e) | WhenCondition::In { expr: e, .. } => out.push(Child::Expr(e)),
                            WhenCondition::Is { .. } | WhenCondition::Else => {}
                        }
                    }
                    out.push(Child::Expr(&arm.body));
                }
            }
            ExprKind::Try { body, catches, finally } => {
                out.push(Child::Stmts(body));
                for c in catches {
                    out.push(Child::Stmts(&c.body));
                }
                if let Some(f) = finally {
                    out.push(Child::Stmts(f));
                }
            }
            ExprKind::Cast { expr, .. } | ExprKind::Is { expr, .. } => out.push(Child::Expr(expr)),
            ExprKind::Return { value, .. } => {
                if let Some(v) = value {
                    out.push(Child::Expr(v));
                }
            }
        }
        out
    }
}

impl Stmt {
    /// Direct children in evaluation order. Local declarations contribute nothing.
    pub fn children(&self) -> Vec<Child<'_>> {
        match &self.kind {
            StmtKind::Expr(e) => vec![Child::Expr(e)],
            StmtKind::Local { init, .. } => init.iter().map(Child::Expr).collect(),
            StmtKind::LocalTuple { init, .. } => vec![Child::Expr(init)],
            // Kotlin evaluates the right-hand side before storing
            StmtKind::Assign { target, value, .. } => vec![Child::Expr(value), Child::Expr(target)],
            StmtKind::For { iter, body, .. } => vec![Child::Expr(iter), Child::Stmts(body)],
            StmtKind::While { cond, body, .. } => vec![Child::Expr(cond), Child::Stmts(body)],
            StmtKind::DoWhile { body, cond, .. } => vec![Child::Stmts(body), Child::Expr(cond)],
            StmtKind::Decl(_) => Vec::new(),
        }
    }
}
