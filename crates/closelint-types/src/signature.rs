// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Callee signatures and the shape of their bodies.

use closelint_ast::decl::{FnBody, FnDecl};
use closelint_ast::expr::{Expr, ExprKind};
use closelint_ast::stmt::{Stmt, StmtKind};
use closelint_ast::Child;

use crate::builtins;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalleeKind {
    /// `Foo(...)` where `Foo` is a class
    Constructor,
    /// Top-level or local function
    Function,
    /// Member function called on a receiver
    Method,
    /// Extension function called on a receiver
    Extension,
}

/// What a callee hands back when its result is an input it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughOf {
    /// The receiver (`this` of an extension or member, or the target of `also`)
    Receiver,
    /// The argument at this position
    Parameter(usize),
}

/// How a callee's result relates to its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    /// The result is a new value. Its caller owns it.
    Fresh,
    /// Every path returns one of the inputs unchanged.
    PassThrough(PassThroughOf),
    /// No body to look at (abstract, interface or external declaration).
    Unavailable,
}

/// Everything the ownership analysis needs to know about a call target.
#[derive(Debug, Clone, PartialEq)]
pub struct CalleeSignature {
    pub name: String,
    pub kind: CalleeKind,
    pub params: Vec<Type>,
    pub ret: Type,
    /// Receiver type of an extension function
    pub extension_on: Option<Type>,
    pub body: BodyShape,
    /// Closing the result closes the receiver as well.
    pub adopts_receiver: bool,
}

impl CalleeSignature {
    pub fn is_pass_through(&self) -> bool {
        matches!(self.body, BodyShape::PassThrough(_))
    }

    /// Signature of the constructor of class `name`.
    pub fn constructor(name: &str, params: Vec<Type>) -> Self {
        CalleeSignature {
            name: name.to_string(),
            kind: CalleeKind::Constructor,
            params,
            ret: Type::named(name),
            extension_on: None,
            body: BodyShape::Fresh,
            adopts_receiver: false,
        }
    }

    /// Signature of a declared function with an already resolved return type.
    pub fn of_fn(decl: &FnDecl, kind: CalleeKind, ret: Type) -> Self {
        let has_receiver = matches!(kind, CalleeKind::Method | CalleeKind::Extension);
        CalleeSignature {
            name: decl.name.clone(),
            kind,
            params: decl.params.iter().map(|p| Type::from_ref(&p.ty)).collect(),
            ret,
            extension_on: decl.receiver.as_ref().map(Type::from_ref),
            body: body_shape(decl, has_receiver),
            adopts_receiver: false,
        }
    }
}

/// Inspect a function body to see whether it only returns one of its inputs.
///
/// `has_receiver` is set for extensions and members, whose `this` is an input.
pub fn body_shape(decl: &FnDecl, has_receiver: bool) -> BodyShape {
    match &decl.body {
        FnBody::None => BodyShape::Unavailable,
        FnBody::Expr(e) => match returned_input(e, decl, has_receiver) {
            Some(src) => BodyShape::PassThrough(src),
            None => BodyShape::Fresh,
        },
        FnBody::Block(stmts) => {
            let mut returns = Vec::new();
            collect_returns(stmts, &mut returns);
            let mut sources = returns.iter().map(|e| returned_input(e, decl, has_receiver));
            match sources.next() {
                Some(Some(first)) if sources.all(|s| s == Some(first)) => BodyShape::PassThrough(first),
                _ => BodyShape::Fresh,
            }
        }
    }
}

/// Which input, if any, `expr` evaluates to without modification.
fn returned_input(expr: &Expr, decl: &FnDecl, has_receiver: bool) -> Option<PassThroughOf> {
    match &expr.kind {
        ExprKind::Paren(inner) | ExprKind::NotNull(inner) => returned_input(inner, decl, has_receiver),
        ExprKind::Cast { expr, .. } => returned_input(expr, decl, has_receiver),
        ExprKind::This(None) if has_receiver => Some(PassThroughOf::Receiver),
        ExprKind::Ident(name) => decl.param_index(name).map(PassThroughOf::Parameter),
        ExprKind::MethodCall { receiver, method, args, .. } => {
            match builtins::method_signature(method, args.len(), None)?.body {
                BodyShape::PassThrough(PassThroughOf::Receiver) => returned_input(receiver, decl, has_receiver),
                _ => None,
            }
        }
        ExprKind::Call { callee, args, .. } => {
            let name = callee.as_ident()?;
            match builtins::function_signature(name, args.len())?.body {
                BodyShape::PassThrough(PassThroughOf::Parameter(i)) => returned_input(args.get(i)?, decl, has_receiver),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Values of the unlabeled `return`s that leave this function.
///
/// Lambdas and local declarations have their own returns and are skipped.
fn collect_returns<'a>(stmts: &'a [Stmt], out: &mut Vec<&'a Expr>) {
    for stmt in stmts {
        if matches!(stmt.kind, StmtKind::Decl(_)) {
            continue;
        }
        for child in stmt.children() {
            collect_child_returns(child, out);
        }
    }
}

fn collect_child_returns<'a>(child: Child<'a>, out: &mut Vec<&'a Expr>) {
    match child {
        Child::Stmts(stmts) => collect_returns(stmts, out),
        Child::Expr(expr) => match &expr.kind {
            ExprKind::Lambda { .. } => {}
            ExprKind::Return { label: None, value: Some(value) } => {
                out.push(value);
                collect_child_returns(Child::Expr(value), out);
            }
            _ => {
                for c in expr.children() {
                    collect_child_returns(c, out);
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closelint_ast::decl::DeclKind;

    fn parse(src: &str) -> Vec<closelint_ast::decl::Decl> {
        let lexed = closelint_lexer::Lexer::new(src).tokenize();
        let parsed = closelint_parser::Parser::new(lexed.tokens).parse();
        assert!(parsed.is_ok(), "Parse errors: {:?}", parsed.errors);
        parsed.decls
    }

    fn first_fn(src: &str) -> FnDecl {
        match parse(src).into_iter().next().map(|d| d.kind) {
            Some(DeclKind::Fn(f)) => f,
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn expression_body_returning_parameter() {
        let f = first_fn("fun id(c: Closeable) = c");
        assert_eq!(body_shape(&f, f.is_extension()), BodyShape::PassThrough(PassThroughOf::Parameter(0)));
    }

    #[test]
    fn block_body_returning_receiver() {
        let f = first_fn("fun Closeable.tap(): Closeable {\n    println(this.toString())\n    return this\n}");
        assert_eq!(body_shape(&f, f.is_extension()), BodyShape::PassThrough(PassThroughOf::Receiver));
    }

    #[test]
    fn returns_through_scope_functions() {
        let f = first_fn("fun log(c: Closeable): Closeable = c.also { println(it) }");
        assert_eq!(body_shape(&f, f.is_extension()), BodyShape::PassThrough(PassThroughOf::Parameter(0)));
    }

    #[test]
    fn member_returning_this_passes_its_receiver() {
        let decls = parse("class Conn : Closeable {\n    fun timeout(t: Int): Conn {\n        return this\n    }\n}");
        let DeclKind::Class(class) = &decls[0].kind else { panic!("Expected class") };
        let timeout = class.methods().next().unwrap();
        assert_eq!(body_shape(timeout, true), BodyShape::PassThrough(PassThroughOf::Receiver));
        assert_eq!(body_shape(timeout, false), BodyShape::Fresh);
    }

    #[test]
    fn constructor_body_is_fresh() {
        let f = first_fn("fun open() = StringReader(\"close me\")");
        assert_eq!(body_shape(&f, f.is_extension()), BodyShape::Fresh);
    }

    #[test]
    fn disagreeing_returns_are_fresh() {
        let f = first_fn("fun pick(a: Reader, b: Reader): Reader {\n    if (flag) return a\n    return b\n}");
        assert_eq!(body_shape(&f, f.is_extension()), BodyShape::Fresh);
    }

    #[test]
    fn lambda_returns_are_ignored() {
        let f = first_fn("fun f(a: Reader): Reader {\n    run { return@run }\n    return a\n}");
        assert_eq!(body_shape(&f, f.is_extension()), BodyShape::PassThrough(PassThroughOf::Parameter(0)));
    }

    #[test]
    fn abstract_body_is_unavailable() {
        let f = first_fn("abstract fun open(): Reader");
        assert_eq!(body_shape(&f, f.is_extension()), BodyShape::Unavailable);
    }
}
