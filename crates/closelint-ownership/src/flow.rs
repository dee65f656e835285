// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Flow tracking: follow each origin to its first decisive use.
//!
//! A value is followed up through its parents. Parentheses, `!!`, casts and
//! pass-through calls keep it alive; binding it to a local switches to
//! scanning the rest of the block for the first reference to that local.
//! Anything the tracker cannot follow with certainty ends as `Untracked`.

use closelint_ast::expr::{BinOp, Expr, ExprKind};
use closelint_ast::stmt::{Stmt, StmtKind};
use closelint_ast::Child;
use closelint_types::{BodyShape, PassThroughOf, Resolver};
use tracing::{debug, trace};

use crate::body::{BodyMap, Link};
use crate::error::AnalysisError;
use crate::state::{OwnershipState, TrackedValue, UseSiteKind};

enum Step<'a> {
    Continue(&'a Expr),
    Done(OwnershipState),
}

pub struct FlowTracker<'m, 'a> {
    map: &'m BodyMap<'a>,
    resolver: &'m dyn Resolver,
    closing_functions: &'m [String],
}

impl<'m, 'a> FlowTracker<'m, 'a> {
    pub fn new(map: &'m BodyMap<'a>, resolver: &'m dyn Resolver, closing_functions: &'m [String]) -> Self {
        Self { map, resolver, closing_functions }
    }

    /// Drive `value` from `Created` to a terminal state.
    pub fn track(&self, value: &mut TrackedValue) -> Result<(), AnalysisError> {
        let mut current = match self.map.node(value.origin.id) {
            Some(expr) => expr,
            None => {
                value.settle(OwnershipState::Untracked);
                return Ok(());
            }
        };
        loop {
            match self.step(current, value)? {
                Step::Continue(next) => current = next,
                Step::Done(state) => {
                    value.settle(state);
                    break;
                }
            }
        }
        debug!(origin = ?value.origin.span, state = ?value.state, "tracked");
        Ok(())
    }

    fn step(&self, current: &'a Expr, value: &mut TrackedValue) -> Result<Step<'a>, AnalysisError> {
        let Some(link) = self.map.link(current.id) else {
            return Ok(Step::Done(OwnershipState::Untracked));
        };
        trace!(at = ?current.span, "use site");

        Ok(match link {
            Link::Receiver(call) => self.receiver_of(call, value)?,
            Link::Member(access) => match &access.kind {
                ExprKind::Field { field_span, .. } => {
                    value.record(UseSiteKind::ChainedCall, *field_span);
                    Step::Done(OwnershipState::Leaked { at: *field_span })
                }
                _ => Step::Done(OwnershipState::Untracked),
            },
            Link::Argument { call, index } => {
                let sig = self.resolver.callee_signature(call)?;
                match sig.map(|s| s.body) {
                    Some(BodyShape::PassThrough(PassThroughOf::Parameter(i))) if i == index => {
                        value.record(UseSiteKind::ChainedCall, call.span);
                        Step::Continue(call)
                    }
                    _ => {
                        value.record(UseSiteKind::Argument, current.span);
                        Step::Done(OwnershipState::Transferred { at: current.span })
                    }
                }
            }
            Link::Transparent(parent) => Step::Continue(parent),
            Link::Return(span) => {
                value.record(UseSiteKind::Return, span);
                Step::Done(OwnershipState::Transferred { at: span })
            }
            Link::FieldStore(span) => {
                value.record(UseSiteKind::FieldStore, span);
                Step::Done(OwnershipState::Transferred { at: span })
            }
            Link::LocalInit { stmts, index, name, span } | Link::AssignLocal { stmts, index, name, span } => {
                value.record(UseSiteKind::Rebind, span);
                match first_reference(stmts, index + 1, name) {
                    Some(reference) => Step::Continue(reference),
                    None => Step::Done(OwnershipState::Untracked),
                }
            }
            Link::Discarded | Link::Other => Step::Done(OwnershipState::Untracked),
        })
    }

    fn receiver_of(&self, call: &'a Expr, value: &mut TrackedValue) -> Result<Step<'a>, AnalysisError> {
        let ExprKind::MethodCall { method, method_span, args, .. } = &call.kind else {
            return Ok(Step::Done(OwnershipState::Untracked));
        };
        if self.is_closing_call(method, args) {
            value.record(UseSiteKind::ClosingCall, *method_span);
            return Ok(Step::Done(OwnershipState::Consumed { at: *method_span }));
        }
        match self.resolver.callee_signature(call)? {
            Some(sig) if sig.body == BodyShape::PassThrough(PassThroughOf::Receiver) => {
                value.record(UseSiteKind::ChainedCall, *method_span);
                Ok(Step::Continue(call))
            }
            // The wrapper now owns the value and closes it with itself
            Some(sig) if sig.adopts_receiver => {
                value.record(UseSiteKind::Argument, *method_span);
                Ok(Step::Done(OwnershipState::Transferred { at: *method_span }))
            }
            _ => {
                value.record(UseSiteKind::ChainedCall, *method_span);
                Ok(Step::Done(OwnershipState::Leaked { at: *method_span }))
            }
        }
    }

    /// `receiver.use { }`: a configured name with a single function-valued argument.
    fn is_closing_call(&self, method: &str, args: &[Expr]) -> bool {
        self.closing_functions.iter().any(|f| f == method) && args.len() == 1 && args[0].is_function_value()
    }
}

/// What scanning for a local's next reference turned up.
enum Scan<'a> {
    Found(&'a Expr),
    /// Control flow or scoping the tracker does not follow
    Stop,
    Clear,
}

/// First reference to `name` in `stmts[from..]`, unless something
/// the tracker cannot see through comes first.
fn first_reference<'a>(stmts: &'a [Stmt], from: usize, name: &str) -> Option<&'a Expr> {
    for stmt in stmts.get(from..).unwrap_or(&[]) {
        match scan_stmt(stmt, name) {
            Scan::Found(reference) => return Some(reference),
            Scan::Stop => return None,
            Scan::Clear => {}
        }
    }
    None
}

fn scan_stmt<'a>(stmt: &'a Stmt, name: &str) -> Scan<'a> {
    match &stmt.kind {
        StmtKind::Expr(e) => scan_expr(e, name),
        StmtKind::Local { name: declared, init, .. } => {
            if let Some(init) = init {
                let scan = scan_expr(init, name);
                if !matches!(scan, Scan::Clear) {
                    return scan;
                }
            }
            if declared == name { Scan::Stop } else { Scan::Clear }
        }
        StmtKind::LocalTuple { names, init, .. } => match scan_expr(init, name) {
            Scan::Clear if names.iter().any(|n| n == name) => Scan::Stop,
            scan => scan,
        },
        StmtKind::Assign { target, value, .. } => {
            let scan = scan_expr(value, name);
            if !matches!(scan, Scan::Clear) {
                return scan;
            }
            // Reassignment ends the binding we were following
            if target.as_ident() == Some(name) {
                return Scan::Stop;
            }
            scan_expr(target, name)
        }
        StmtKind::For { iter, .. } => match scan_expr(iter, name) {
            Scan::Clear => Scan::Stop,
            scan => scan,
        },
        StmtKind::While { .. } | StmtKind::DoWhile { .. } | StmtKind::Decl(_) => Scan::Stop,
    }
}

/// Scan `first`, and stop afterwards if it held no reference.
fn then_stop<'a>(first: Option<&'a Expr>, name: &str) -> Scan<'a> {
    match first.map(|e| scan_expr(e, name)) {
        Some(Scan::Found(e)) => Scan::Found(e),
        _ => Scan::Stop,
    }
}

fn scan_expr<'a>(expr: &'a Expr, name: &str) -> Scan<'a> {
    match &expr.kind {
        ExprKind::Ident(n) if n == name => Scan::Found(expr),
        ExprKind::String(text) if template_mentions(text, name) => Scan::Stop,
        ExprKind::Lambda { .. } | ExprKind::Try { .. } | ExprKind::Break(_) | ExprKind::Continue(_) => Scan::Stop,
        ExprKind::If { cond, .. } => then_stop(Some(cond.as_ref()), name),
        ExprKind::When { subject, .. } => then_stop(subject.as_deref(), name),
        ExprKind::Binary { op: BinOp::And | BinOp::Or, left, .. } => then_stop(Some(left.as_ref()), name),
        ExprKind::Elvis { value, .. } => then_stop(Some(value.as_ref()), name),
        ExprKind::MethodCall { receiver, safe: true, .. } => then_stop(Some(receiver.as_ref()), name),
        ExprKind::Field { object, safe: true, .. } => then_stop(Some(object.as_ref()), name),
        ExprKind::Return { value, .. } => then_stop(value.as_deref(), name),
        ExprKind::Throw(value) => then_stop(Some(value.as_ref()), name),
        _ => {
            for child in expr.children() {
                let scan = match child {
                    Child::Expr(e) => scan_expr(e, name),
                    Child::Stmts(stmts) => scan_stmts(stmts, name),
                };
                if !matches!(scan, Scan::Clear) {
                    return scan;
                }
            }
            Scan::Clear
        }
    }
}

/// Whether a `$name` or `${...}` hole of a string literal mentions `name`.
fn template_mentions(text: &str, name: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut rest = text;
    while let Some(at) = rest.find('$') {
        rest = &rest[at + 1..];
        let hole = match rest.strip_prefix('{') {
            Some(inner) => inner.split('}').next().unwrap_or(""),
            None => &rest[..rest.find(|c: char| !is_word(c)).unwrap_or(rest.len())],
        };
        if hole.split(|c: char| !is_word(c)).any(|word| word == name) {
            return true;
        }
    }
    false
}

fn scan_stmts<'a>(stmts: &'a [Stmt], name: &str) -> Scan<'a> {
    for stmt in stmts {
        let scan = scan_stmt(stmt, name);
        if !matches!(scan, Scan::Clear) {
            return scan;
        }
    }
    Scan::Clear
}

#[cfg(test)]
mod tests {
    use super::*;
    use closelint_ast::decl::{DeclKind, FnBody};

    fn reference_text(src: &str) -> Option<String> {
        let lexed = closelint_lexer::Lexer::new(src).tokenize();
        let parsed = closelint_parser::Parser::new(lexed.tokens).parse();
        assert!(parsed.is_ok(), "Parse errors: {:?}", parsed.errors);
        let DeclKind::Fn(func) = &parsed.decls[0].kind else { panic!("Expected function") };
        let FnBody::Block(stmts) = &func.body else { panic!("Expected block body") };
        first_reference(stmts, 1, "r").map(|e| src[e.span.start..e.span.end].to_string())
    }

    #[test]
    fn templates_mentioning_the_local_stop_the_scan() {
        assert_eq!(reference_text("fun f() {\n    val r = open()\n    println(\"$r\")\n    r.read()\n}"), None);
        assert_eq!(reference_text("fun f() {\n    val r = open()\n    println(\"${r.ready()}\")\n    r.read()\n}"), None);
        assert_eq!(
            reference_text("fun f() {\n    val r = open()\n    println(\"$reader ${r2}\")\n    r.read()\n}"),
            Some("r".to_string())
        );
    }

    #[test]
    fn finds_reference_in_later_statement() {
        assert_eq!(reference_text("fun f() {\n    val r = open()\n    println(1)\n    r.read()\n}"), Some("r".to_string()));
    }

    #[test]
    fn branches_stop_the_scan() {
        assert_eq!(reference_text("fun f() {\n    val r = open()\n    if (ok) println(1)\n    r.read()\n}"), None);
        assert_eq!(reference_text("fun f() {\n    val r = open()\n    for (i in 0..3) {}\n    r.read()\n}"), None);
        assert_eq!(reference_text("fun f() {\n    val r = open()\n    run { r.read() }\n}"), None);
    }

    #[test]
    fn condition_of_a_branch_is_still_scanned() {
        assert!(reference_text("fun f() {\n    val r = open()\n    if (r.ready()) println(1)\n}").is_some());
    }

    #[test]
    fn shadowing_and_reassignment_stop_the_scan() {
        assert_eq!(reference_text("fun f() {\n    val r = open()\n    val r = other()\n    r.read()\n}"), None);
        assert_eq!(reference_text("fun f() {\n    var r = open()\n    r = other()\n    r.read()\n}"), None);
    }

    #[test]
    fn reference_in_the_shadowing_initializer_counts() {
        assert!(reference_text("fun f() {\n    val r = open()\n    val r = r.buffered()\n}").is_some());
    }

    #[test]
    fn end_of_block_finds_nothing() {
        assert_eq!(reference_text("fun f() {\n    val r = open()\n}"), None);
    }
}
