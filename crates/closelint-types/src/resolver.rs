// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Call and type resolution over a single parsed file.

use std::cell::Cell;
use std::collections::HashMap;

use closelint_ast::decl::{ClassDecl, Decl, DeclKind, FnBody, FnDecl};
use closelint_ast::expr::{Expr, ExprKind};
use closelint_ast::stmt::{Stmt, StmtKind};
use closelint_ast::Child;
use tracing::{debug, trace};

use crate::builtins;
use crate::error::ResolveError;
use crate::signature::{BodyShape, CalleeKind, CalleeSignature, PassThroughOf};
use crate::table::TypeTable;
use crate::types::Type;

/// How deep return-type inference may follow expression bodies.
const MAX_INFERENCE_DEPTH: usize = 16;

/// Type and call-target queries the ownership analysis relies on.
pub trait Resolver {
    /// Whether values of `ty` are closeable resources.
    fn is_resource_type(&self, ty: &Type) -> Result<bool, ResolveError>;

    /// The target of a call or method call expression, if it can be determined.
    fn callee_signature(&self, call: &Expr) -> Result<Option<CalleeSignature>, ResolveError>;
}

#[derive(Debug, Clone, Copy)]
struct FnEntry<'a> {
    decl: &'a FnDecl,
    owner: Option<&'a str>,
}

impl FnEntry<'_> {
    fn kind(&self) -> CalleeKind {
        if self.decl.is_extension() {
            CalleeKind::Extension
        } else if self.owner.is_some() {
            CalleeKind::Method
        } else {
            CalleeKind::Function
        }
    }

    fn accepts(&self, argc: usize) -> bool {
        let params = &self.decl.params;
        let required = params.iter().filter(|p| p.default.is_none() && !p.is_vararg).count();
        if params.iter().any(|p| p.is_vararg) {
            argc >= required
        } else {
            required <= argc && argc <= params.len()
        }
    }
}

/// Resolver for one source file: its own declarations plus library knowledge.
///
/// Overloads are told apart by name and argument count only.
pub struct ProgramResolver<'a> {
    table: TypeTable,
    classes: HashMap<&'a str, &'a ClassDecl>,
    functions: HashMap<&'a str, Vec<FnEntry<'a>>>,
    depth: Cell<usize>,
}

impl<'a> ProgramResolver<'a> {
    pub fn new(decls: &'a [Decl], extra_closeables: &[String]) -> Self {
        let mut resolver = ProgramResolver {
            table: TypeTable::with_builtins(),
            classes: HashMap::new(),
            functions: HashMap::new(),
            depth: Cell::new(0),
        };
        for name in extra_closeables {
            resolver.table.add_closeable(name.clone());
        }
        for decl in decls {
            resolver.collect_decl(decl, None);
        }
        debug!(
            classes = resolver.classes.len(),
            functions = resolver.functions.values().map(Vec::len).sum::<usize>(),
            "collected declarations"
        );
        resolver
    }

    fn collect_decl(&mut self, decl: &'a Decl, owner: Option<&'a str>) {
        match &decl.kind {
            DeclKind::Class(class) => {
                let supers = class
                    .supertypes
                    .iter()
                    .filter_map(|t| t.simple_name().map(str::to_string))
                    .collect();
                self.table.declare(&class.name, supers, class.name_span);
                self.classes.insert(class.name.as_str(), class);
                for member in &class.members {
                    self.collect_decl(member, Some(class.name.as_str()));
                }
            }
            DeclKind::Fn(f) => {
                self.functions.entry(f.name.as_str()).or_default().push(FnEntry { decl: f, owner });
                match &f.body {
                    FnBody::Block(stmts) => self.collect_local_stmts(stmts),
                    FnBody::Expr(e) => self.collect_local_child(Child::Expr(e)),
                    FnBody::None => {}
                }
            }
            DeclKind::Property(p) => {
                if let Some(init) = &p.init {
                    self.collect_local_child(Child::Expr(init));
                }
                if let Some(FnBody::Block(stmts)) = &p.getter {
                    self.collect_local_stmts(stmts);
                }
            }
            DeclKind::Init(stmts) => self.collect_local_stmts(stmts),
            DeclKind::Package(_) | DeclKind::Import(_) => {}
        }
    }

    /// Local functions and classes become visible file-wide.
    fn collect_local_stmts(&mut self, stmts: &'a [Stmt]) {
        for stmt in stmts {
            if let StmtKind::Decl(decl) = &stmt.kind {
                self.collect_decl(decl, None);
                continue;
            }
            for child in stmt.children() {
                self.collect_local_child(child);
            }
        }
    }

    fn collect_local_child(&mut self, child: Child<'a>) {
        match child {
            Child::Stmts(stmts) => self.collect_local_stmts(stmts),
            Child::Expr(e) => {
                for c in e.children() {
                    self.collect_local_child(c);
                }
            }
        }
    }

    fn find_fn(&self, name: &str, argc: usize, on_receiver: bool) -> Option<FnEntry<'a>> {
        self.functions.get(name)?.iter().copied().find(|entry| {
            let receiver_ok = if on_receiver {
                entry.decl.is_extension() || entry.owner.is_some()
            } else {
                !entry.decl.is_extension()
            };
            receiver_ok && entry.accepts(argc)
        })
    }

    fn signature_of(&self, entry: FnEntry<'a>) -> Result<CalleeSignature, ResolveError> {
        let ret = self.return_type(entry.decl)?;
        Ok(CalleeSignature::of_fn(entry.decl, entry.kind(), ret))
    }

    fn constructor_of(&self, name: &str) -> CalleeSignature {
        let params = match self.classes.get(name) {
            Some(class) => class.params.iter().map(|p| Type::from_ref(&p.ty)).collect(),
            None => Vec::new(),
        };
        CalleeSignature::constructor(name, params)
    }

    /// Declared return type, or the type of an expression body.
    fn return_type(&self, decl: &FnDecl) -> Result<Type, ResolveError> {
        if let Some(ty) = &decl.ret_ty {
            return Ok(Type::from_ref(ty));
        }
        match &decl.body {
            FnBody::Expr(body) => {
                let depth = self.depth.get();
                if depth >= MAX_INFERENCE_DEPTH {
                    return Err(ResolveError::InferenceCycle {
                        function: decl.name.clone(),
                        depth,
                        span: decl.name_span,
                    });
                }
                self.depth.set(depth + 1);
                let result = self.infer(body, Some(decl));
                self.depth.set(depth);
                result
            }
            FnBody::Block(_) => Ok(Type::Unit),
            FnBody::None => Ok(Type::Unknown),
        }
    }

    /// Best-effort type of `expr`, evaluated inside function `ctx`.
    fn infer(&self, expr: &Expr, ctx: Option<&FnDecl>) -> Result<Type, ResolveError> {
        Ok(match &expr.kind {
            ExprKind::Int(_) => Type::named("Int"),
            ExprKind::Float(_) => Type::named("Double"),
            ExprKind::String(_) => Type::named("String"),
            ExprKind::Char(_) => Type::named("Char"),
            ExprKind::Bool(_) => Type::named("Boolean"),
            ExprKind::Paren(inner) => self.infer(inner, ctx)?,
            ExprKind::NotNull(inner) => self.infer(inner, ctx)?.non_null().clone(),
            ExprKind::Elvis { value, .. } => self.infer(value, ctx)?.non_null().clone(),
            ExprKind::Cast { ty, safe, .. } => {
                let ty = Type::from_ref(ty);
                if *safe { Type::Nullable(Box::new(ty)) } else { ty }
            }
            ExprKind::Ident(name) => ctx
                .and_then(|f| f.params.iter().find(|p| &p.name == name))
                .map(|p| Type::from_ref(&p.ty))
                .unwrap_or(Type::Unknown),
            ExprKind::This(None) => ctx
                .and_then(|f| f.receiver.as_ref())
                .map(Type::from_ref)
                .unwrap_or(Type::Unknown),
            ExprKind::Call { args, .. } => match self.callee_signature(expr)? {
                Some(sig) => match sig.body {
                    BodyShape::PassThrough(PassThroughOf::Parameter(i)) => match args.get(i) {
                        Some(arg) => self.infer(arg, ctx)?,
                        None => Type::Unknown,
                    },
                    _ => sig.ret,
                },
                None => Type::Unknown,
            },
            ExprKind::MethodCall { receiver, args, .. } => match self.callee_signature(expr)? {
                Some(sig) => match sig.body {
                    BodyShape::PassThrough(PassThroughOf::Receiver) => self.infer(receiver, ctx)?,
                    BodyShape::PassThrough(PassThroughOf::Parameter(i)) => match args.get(i) {
                        Some(arg) => self.infer(arg, ctx)?,
                        None => Type::Unknown,
                    },
                    _ => sig.ret,
                },
                None => Type::Unknown,
            },
            ExprKind::If { then_branch, else_branch: Some(else_branch), .. } => {
                let then_ty = self.infer(then_branch, ctx)?;
                if then_ty == self.infer(else_branch, ctx)? { then_ty } else { Type::Unknown }
            }
            _ => Type::Unknown,
        })
    }

    fn resolve_call(&self, name: &str, argc: usize) -> Result<Option<CalleeSignature>, ResolveError> {
        if self.classes.contains_key(name) {
            return Ok(Some(self.constructor_of(name)));
        }
        if let Some(entry) = self.find_fn(name, argc, false) {
            return self.signature_of(entry).map(Some);
        }
        if let Some(sig) = builtins::function_signature(name, argc) {
            return Ok(Some(sig));
        }
        // Unknown capitalized callees are library constructors
        if self.table.contains(name) || name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Ok(Some(self.constructor_of(name)));
        }
        Ok(None)
    }

    fn resolve_method(&self, receiver: &Expr, method: &str, argc: usize) -> Result<Option<CalleeSignature>, ResolveError> {
        if let Some(entry) = self.find_fn(method, argc, true) {
            return self.signature_of(entry).map(Some);
        }
        if let Some(sig) = builtins::method_signature(method, argc, simple_name(receiver)) {
            return Ok(Some(sig));
        }
        // `java.io.StringReader(...)` parses as a call on the package path
        if self.table.contains(method) && method.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Ok(Some(self.constructor_of(method)));
        }
        Ok(None)
    }
}

impl Resolver for ProgramResolver<'_> {
    fn is_resource_type(&self, ty: &Type) -> Result<bool, ResolveError> {
        match ty.non_null() {
            Type::Named { name, .. } => self.table.is_closeable(name),
            _ => Ok(false),
        }
    }

    fn callee_signature(&self, call: &Expr) -> Result<Option<CalleeSignature>, ResolveError> {
        let sig = match &call.kind {
            ExprKind::Call { callee, args, .. } => match callee.as_ident() {
                Some(name) => self.resolve_call(name, args.len())?,
                None => None,
            },
            ExprKind::MethodCall { receiver, method, args, .. } => self.resolve_method(receiver, method, args.len())?,
            _ => None,
        };
        trace!(span = ?call.span, resolved = sig.as_ref().map(|s| s.name.as_str()), "callee lookup");
        Ok(sig)
    }
}

/// `Files` for both `Files` and `java.nio.file.Files`.
fn simple_name(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(name.as_str()),
        ExprKind::Field { field, .. } => Some(field.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Vec<Decl> {
        let lexed = closelint_lexer::Lexer::new(src).tokenize();
        let parsed = closelint_parser::Parser::new(lexed.tokens).parse();
        assert!(parsed.is_ok(), "Parse errors: {:?}", parsed.errors);
        parsed.decls
    }

    /// Expression body of the function called `name`.
    fn body_of<'d>(decls: &'d [Decl], name: &str) -> &'d Expr {
        decls
            .iter()
            .find_map(|d| match &d.kind {
                DeclKind::Fn(f) if f.name == name => match &f.body {
                    FnBody::Expr(e) => Some(e),
                    _ => None,
                },
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn constructors_of_library_types_are_resources() {
        let decls = parse("fun call() = StringReader(\"x\")");
        let resolver = ProgramResolver::new(&decls, &[]);
        let sig = resolver.callee_signature(body_of(&decls, "call")).unwrap().unwrap();
        assert_eq!(sig.kind, CalleeKind::Constructor);
        assert!(resolver.is_resource_type(&sig.ret).unwrap());
    }

    #[test]
    fn inferred_return_types_follow_expression_bodies() {
        let decls = parse("fun iReturnCloseable() = StringReader(\"close me\")\nfun call() = iReturnCloseable()");
        let resolver = ProgramResolver::new(&decls, &[]);
        let sig = resolver.callee_signature(body_of(&decls, "call")).unwrap().unwrap();
        assert_eq!(sig.kind, CalleeKind::Function);
        assert_eq!(sig.ret, Type::named("StringReader"));
        assert_eq!(sig.body, BodyShape::Fresh);
    }

    #[test]
    fn extensions_resolve_by_name() {
        let decls = parse("fun Closeable.tap(): Closeable {\n    return this\n}\nfun call(r: Reader) = r.tap()");
        let resolver = ProgramResolver::new(&decls, &[]);
        let sig = resolver.callee_signature(body_of(&decls, "call")).unwrap().unwrap();
        assert_eq!(sig.kind, CalleeKind::Extension);
        assert_eq!(sig.body, BodyShape::PassThrough(PassThroughOf::Receiver));
    }

    #[test]
    fn user_classes_extending_closeable() {
        let decls = parse("class Pool : Closeable {\n    override fun close() {}\n}\nfun call() = Pool()");
        let resolver = ProgramResolver::new(&decls, &[]);
        let sig = resolver.callee_signature(body_of(&decls, "call")).unwrap().unwrap();
        assert!(resolver.is_resource_type(&sig.ret).unwrap());
        assert!(!resolver.is_resource_type(&Type::named("String")).unwrap());
    }

    #[test]
    fn configured_closeables() {
        let decls = parse("fun call() = Lease()");
        let resolver = ProgramResolver::new(&decls, &["Lease".to_string()]);
        assert!(resolver.is_resource_type(&Type::named("Lease")).unwrap());
    }

    #[test]
    fn unknown_lowercase_calls_do_not_resolve() {
        let decls = parse("fun call() = mystery(1)");
        let resolver = ProgramResolver::new(&decls, &[]);
        assert!(resolver.callee_signature(body_of(&decls, "call")).unwrap().is_none());
    }

    #[test]
    fn arity_selects_overload() {
        let decls = parse("fun open(a: Int) = StringReader(\"x\")\nfun open(a: Int, b: Int) = 3\nfun call() = open(1, 2)");
        let resolver = ProgramResolver::new(&decls, &[]);
        let sig = resolver.callee_signature(body_of(&decls, "call")).unwrap().unwrap();
        assert_eq!(sig.ret, Type::named("Int"));
    }

    #[test]
    fn mutual_inference_reports_a_cycle() {
        let decls = parse("fun a() = b()\nfun b() = a()\nfun call() = a()");
        let resolver = ProgramResolver::new(&decls, &[]);
        let err = resolver.callee_signature(body_of(&decls, "call")).unwrap_err();
        assert!(matches!(err, ResolveError::InferenceCycle { .. }));
    }

    #[test]
    fn fluent_member_returns_its_receiver() {
        let decls = parse(
            "class Conn : Closeable {\n    fun timeout(t: Int): Conn {\n        return this\n    }\n}\nfun configured(c: Conn) = c.timeout(5)",
        );
        let resolver = ProgramResolver::new(&decls, &[]);
        let sig = resolver.callee_signature(body_of(&decls, "configured")).unwrap().unwrap();
        assert_eq!(sig.kind, CalleeKind::Method);
        assert_eq!(sig.body, BodyShape::PassThrough(PassThroughOf::Receiver));
    }

    #[test]
    fn lines_opens_a_stream_only_on_files() {
        let decls = parse("fun stream(p: Path) = Files.lines(p)\nfun text(s: String) = s.lines()");
        let resolver = ProgramResolver::new(&decls, &[]);
        let sig = resolver.callee_signature(body_of(&decls, "stream")).unwrap().unwrap();
        assert!(resolver.is_resource_type(&sig.ret).unwrap());
        assert!(resolver.callee_signature(body_of(&decls, "text")).unwrap().is_none());
    }

    #[test]
    fn local_functions_are_visible() {
        let decls = parse("fun outer() {\n    fun inner() = StringReader(\"x\")\n}\nfun call() = inner()");
        let resolver = ProgramResolver::new(&decls, &[]);
        let sig = resolver.callee_signature(body_of(&decls, "call")).unwrap().unwrap();
        assert_eq!(sig.ret, Type::named("StringReader"));
    }
}
