// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! One analyzable body and the parent links of its expressions.

use std::collections::HashMap;

use closelint_ast::decl::Decl;
use closelint_ast::expr::{Expr, ExprKind};
use closelint_ast::stmt::{Stmt, StmtKind};
use closelint_ast::{Child, NodeId, Span};

/// A piece of code analyzed on its own.
#[derive(Debug, Clone, Copy)]
pub enum Body<'a> {
    /// Statements of a function or lambda. For lambdas the last expression is the result.
    Block { stmts: &'a [Stmt], tail_returns: bool },
    /// `fun f() = expr`
    Expr(&'a Expr),
    /// Property initializer; its value is stored in the property.
    Initializer(&'a Expr),
}

/// How an expression's value is consumed by its parent.
#[derive(Debug, Clone, Copy)]
pub enum Link<'a> {
    /// Receiver of this method call
    Receiver(&'a Expr),
    /// Object of this member access
    Member(&'a Expr),
    /// Argument `index` of this call
    Argument { call: &'a Expr, index: usize },
    /// Parentheses, `!!` or a cast around the value
    Transparent(&'a Expr),
    /// Leaves the body as its result
    Return(Span),
    /// Initializer of a local declared at `stmts[index]`
    LocalInit { stmts: &'a [Stmt], index: usize, name: &'a str, span: Span },
    /// Assigned to an existing local at `stmts[index]`
    AssignLocal { stmts: &'a [Stmt], index: usize, name: &'a str, span: Span },
    /// Stored through a member access or index
    FieldStore(Span),
    /// Statement value nobody reads
    Discarded,
    /// Operand, condition, branch result and anything else
    Other,
}

/// Code inside a body that is analyzed separately.
#[derive(Debug, Clone, Copy)]
pub enum Nested<'a> {
    Lambda(&'a [Stmt]),
    Decl(&'a Decl),
}

/// Expressions of one body with their parent links, in source order.
///
/// Lambdas and local declarations are recorded as [`Nested`] and not entered.
#[derive(Debug, Default)]
pub struct BodyMap<'a> {
    links: HashMap<NodeId, Link<'a>>,
    nodes: HashMap<NodeId, &'a Expr>,
    order: Vec<&'a Expr>,
    nested: Vec<Nested<'a>>,
}

impl<'a> BodyMap<'a> {
    pub fn build(body: Body<'a>) -> Self {
        let mut map = BodyMap::default();
        match body {
            Body::Block { stmts, tail_returns } => map.walk_stmts(stmts, tail_returns),
            Body::Expr(e) => map.walk_expr(e, Link::Return(e.span)),
            Body::Initializer(e) => map.walk_expr(e, Link::FieldStore(e.span)),
        }
        map
    }

    pub fn link(&self, id: NodeId) -> Option<Link<'a>> {
        self.links.get(&id).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&'a Expr> {
        self.nodes.get(&id).copied()
    }

    /// Every expression of the body, parents before children.
    pub fn exprs(&self) -> &[&'a Expr] {
        &self.order
    }

    pub fn nested(&self) -> &[Nested<'a>] {
        &self.nested
    }

    fn walk_stmts(&mut self, stmts: &'a [Stmt], tail_returns: bool) {
        for (index, stmt) in stmts.iter().enumerate() {
            match &stmt.kind {
                StmtKind::Expr(e) => {
                    let link = if tail_returns && index + 1 == stmts.len() {
                        Link::Return(e.span)
                    } else {
                        Link::Discarded
                    };
                    self.walk_expr(e, link);
                }
                StmtKind::Local { name, init, .. } => {
                    if let Some(init) = init {
                        self.walk_expr(init, Link::LocalInit { stmts, index, name: name.as_str(), span: stmt.span });
                    }
                }
                StmtKind::LocalTuple { init, .. } => self.walk_expr(init, Link::Other),
                StmtKind::Assign { target, op, value } => {
                    let link = match (&target.kind, op) {
                        (ExprKind::Ident(name), None) => {
                            Link::AssignLocal { stmts, index, name: name.as_str(), span: stmt.span }
                        }
                        (ExprKind::Field { .. } | ExprKind::Index { .. }, None) => Link::FieldStore(target.span),
                        _ => Link::Other,
                    };
                    self.walk_expr(value, link);
                    self.walk_expr(target, Link::Other);
                }
                StmtKind::For { iter, body, .. } => {
                    self.walk_expr(iter, Link::Other);
                    self.walk_stmts(body, false);
                }
                StmtKind::While { cond, body, .. } | StmtKind::DoWhile { cond, body, .. } => {
                    self.walk_expr(cond, Link::Other);
                    self.walk_stmts(body, false);
                }
                StmtKind::Decl(decl) => self.nested.push(Nested::Decl(decl)),
            }
        }
    }

    fn walk_expr(&mut self, expr: &'a Expr, link: Link<'a>) {
        self.links.insert(expr.id, link);
        self.nodes.insert(expr.id, expr);
        self.order.push(expr);

        match &expr.kind {
            ExprKind::Lambda { body, .. } => self.nested.push(Nested::Lambda(body)),
            ExprKind::MethodCall { receiver, args, .. } => {
                self.walk_expr(receiver, Link::Receiver(expr));
                for (index, arg) in args.iter().enumerate() {
                    self.walk_expr(arg, Link::Argument { call: expr, index });
                }
            }
            ExprKind::Call { callee, args, .. } => {
                self.walk_expr(callee, Link::Other);
                for (index, arg) in args.iter().enumerate() {
                    self.walk_expr(arg, Link::Argument { call: expr, index });
                }
            }
            ExprKind::Field { object, .. } => self.walk_expr(object, Link::Member(expr)),
            ExprKind::Paren(inner) | ExprKind::NotNull(inner) | ExprKind::Cast { expr: inner, .. } => {
                self.walk_expr(inner, Link::Transparent(expr));
            }
            ExprKind::Return { value: Some(value), .. } => self.walk_expr(value, Link::Return(expr.span)),
            _ => {
                for child in expr.children() {
                    match child {
                        Child::Expr(e) => self.walk_expr(e, Link::Other),
                        Child::Stmts(stmts) => self.walk_stmts(stmts, false),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closelint_ast::decl::{DeclKind, FnBody};

    fn with_body<R>(src: &str, f: impl FnOnce(&BodyMap<'_>) -> R) -> R {
        let lexed = closelint_lexer::Lexer::new(src).tokenize();
        let parsed = closelint_parser::Parser::new(lexed.tokens).parse();
        assert!(parsed.is_ok(), "Parse errors: {:?}", parsed.errors);
        let DeclKind::Fn(func) = &parsed.decls[0].kind else { panic!("Expected function") };
        let FnBody::Block(stmts) = &func.body else { panic!("Expected block body") };
        let map = BodyMap::build(Body::Block { stmts, tail_returns: false });
        f(&map)
    }

    fn find<'m, 'a>(map: &'m BodyMap<'a>, pred: impl Fn(&Expr) -> bool) -> &'a Expr {
        map.exprs().iter().copied().find(|e| pred(e)).unwrap()
    }

    #[test]
    fn receivers_and_arguments_are_linked() {
        with_body("fun f() {\n    sink(StringReader(\"x\").buffered())\n}", |map| {
            let ctor = find(map, |e| matches!(&e.kind, ExprKind::Call { callee, .. } if callee.as_ident() == Some("StringReader")));
            assert!(matches!(map.link(ctor.id), Some(Link::Receiver(_))));
            let buffered = find(map, |e| matches!(&e.kind, ExprKind::MethodCall { method, .. } if method == "buffered"));
            assert!(matches!(map.link(buffered.id), Some(Link::Argument { index: 0, .. })));
        });
    }

    #[test]
    fn locals_and_fields() {
        with_body("fun f() {\n    val r = open()\n    this.r = open()\n    r = open()\n}", |map| {
            let links: Vec<_> = map
                .exprs()
                .iter()
                .filter(|e| matches!(&e.kind, ExprKind::Call { .. }))
                .filter_map(|e| map.link(e.id))
                .collect();
            assert!(matches!(links[0], Link::LocalInit { name: "r", index: 0, .. }));
            assert!(matches!(links[1], Link::FieldStore(_)));
            assert!(matches!(links[2], Link::AssignLocal { name: "r", index: 2, .. }));
        });
    }

    #[test]
    fn lambdas_are_not_entered() {
        with_body("fun f() {\n    run { StringReader(\"x\") }\n    fun g() = 1\n}", |map| {
            assert_eq!(map.nested().len(), 2);
            assert!(!map.exprs().iter().any(|e| matches!(&e.kind, ExprKind::Call { callee, .. } if callee.as_ident() == Some("StringReader"))));
        });
    }

    #[test]
    fn tail_of_lambda_returns() {
        let src = "fun f() {\n    StringReader(\"x\")\n}";
        let lexed = closelint_lexer::Lexer::new(src).tokenize();
        let parsed = closelint_parser::Parser::new(lexed.tokens).parse();
        let DeclKind::Fn(func) = &parsed.decls[0].kind else { panic!() };
        let FnBody::Block(stmts) = &func.body else { panic!() };
        let as_lambda = BodyMap::build(Body::Block { stmts, tail_returns: true });
        let ctor = as_lambda.exprs()[0];
        assert!(matches!(as_lambda.link(ctor.id), Some(Link::Return(_))));
        let as_fn = BodyMap::build(Body::Block { stmts, tail_returns: false });
        assert!(matches!(as_fn.link(ctor.id), Some(Link::Discarded)));
    }
}
