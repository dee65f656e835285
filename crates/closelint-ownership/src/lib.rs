// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Ownership analysis for closeable resources.
//!
//! Every resource a body creates must either be closed with the scoped-closing
//! call (`use { }` by default) or handed to someone else: returned, passed as an
//! argument, or stored into a field. Calling anything else on it first is a
//! leak and produces a [`Finding`].
//!
//! The analysis is intraprocedural. Each function body, lambda body and
//! property initializer is analyzed on its own; parameters and extension
//! receivers are borrowed and never tracked.

mod body;
mod classify;
mod error;
mod flow;
mod report;
mod sources;
mod state;
mod verdict;

pub use body::Body;
pub use classify::CapabilityClassifier;
pub use error::AnalysisError;
pub use report::{message, Finding, Location, RULE_NAME};
pub use state::{Origin, OwnershipState, TrackedValue, UseSite, UseSiteKind};
pub use verdict::{verdict, Verdict};

use closelint_ast::decl::{Decl, DeclKind, FnBody, FnDecl, PropertyDecl};
use closelint_ast::stmt::Stmt;
use closelint_ast::LineMap;
use closelint_types::Resolver;
use tracing::debug;

use body::{BodyMap, Nested};
use flow::FlowTracker;

/// Knobs of the analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Method names that close their receiver when given a single lambda.
    pub closing_functions: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self { closing_functions: vec!["use".to_string()] }
    }
}

impl AnalysisOptions {
    /// The closing function named in messages.
    pub fn primary_closing_function(&self) -> &str {
        self.closing_functions.first().map(String::as_str).unwrap_or("use")
    }
}

/// Analyzer for the bodies of one file.
///
/// Holds a per-run type cache, so it is not `Sync`; hosts that analyze in
/// parallel create one analyzer per worker.
pub struct Analyzer<'a> {
    resolver: &'a dyn Resolver,
    classifier: CapabilityClassifier<'a>,
    options: &'a AnalysisOptions,
    lines: &'a LineMap,
}

impl<'a> Analyzer<'a> {
    pub fn new(resolver: &'a dyn Resolver, options: &'a AnalysisOptions, lines: &'a LineMap) -> Self {
        Self { resolver, classifier: CapabilityClassifier::new(resolver), options, lines }
    }

    /// Analyze a function together with the lambdas and local functions inside it.
    pub fn analyze_fn(&self, func: &FnDecl) -> Result<Vec<Finding>, AnalysisError> {
        let mut values = Vec::new();
        self.collect_fn(func, &mut values)?;
        Ok(self.finish(&values))
    }

    /// Analyze a lambda body on its own. Its last expression is its result.
    pub fn analyze_lambda(&self, stmts: &[Stmt]) -> Result<Vec<Finding>, AnalysisError> {
        let mut values = Vec::new();
        self.collect(Body::Block { stmts, tail_returns: true }, &mut values)?;
        Ok(self.finish(&values))
    }

    /// Analyze an `init { }` block.
    pub fn analyze_init(&self, stmts: &[Stmt]) -> Result<Vec<Finding>, AnalysisError> {
        let mut values = Vec::new();
        self.collect(Body::Block { stmts, tail_returns: false }, &mut values)?;
        Ok(self.finish(&values))
    }

    /// Analyze a property: its initializer stores into the property, its getter is a function body.
    pub fn analyze_property(&self, prop: &PropertyDecl) -> Result<Vec<Finding>, AnalysisError> {
        let mut values = Vec::new();
        if let Some(init) = &prop.init {
            self.collect(Body::Initializer(init), &mut values)?;
        }
        match &prop.getter {
            Some(FnBody::Block(stmts)) => self.collect(Body::Block { stmts, tail_returns: false }, &mut values)?,
            Some(FnBody::Expr(e)) => self.collect(Body::Expr(e), &mut values)?,
            Some(FnBody::None) | None => {}
        }
        Ok(self.finish(&values))
    }

    /// Every tracked value of a body and the bodies nested in it, in a terminal state.
    pub fn track(&self, body: Body<'_>) -> Result<Vec<TrackedValue>, AnalysisError> {
        let mut values = Vec::new();
        self.collect(body, &mut values)?;
        Ok(values)
    }

    fn collect_fn(&self, func: &FnDecl, out: &mut Vec<TrackedValue>) -> Result<(), AnalysisError> {
        debug!(function = %func.name, "analyzing");
        match &func.body {
            FnBody::Block(stmts) => self.collect(Body::Block { stmts, tail_returns: false }, out),
            FnBody::Expr(e) => self.collect(Body::Expr(e), out),
            FnBody::None => Ok(()),
        }
    }

    fn collect(&self, body: Body<'_>, out: &mut Vec<TrackedValue>) -> Result<(), AnalysisError> {
        let map = BodyMap::build(body);
        let mut values = sources::detect_origins(&map, self.resolver, &self.classifier)?;
        let tracker = FlowTracker::new(&map, self.resolver, &self.options.closing_functions);
        for value in &mut values {
            tracker.track(value)?;
        }
        out.extend(values);

        for nested in map.nested() {
            match *nested {
                Nested::Lambda(stmts) => self.collect(Body::Block { stmts, tail_returns: true }, out)?,
                Nested::Decl(decl) => self.collect_decl(decl, out)?,
            }
        }
        Ok(())
    }

    fn collect_decl(&self, decl: &Decl, out: &mut Vec<TrackedValue>) -> Result<(), AnalysisError> {
        match &decl.kind {
            DeclKind::Fn(func) => self.collect_fn(func, out),
            DeclKind::Class(class) => {
                for member in &class.members {
                    self.collect_decl(member, out)?;
                }
                Ok(())
            }
            DeclKind::Property(prop) => {
                if let Some(init) = &prop.init {
                    self.collect(Body::Initializer(init), out)?;
                }
                Ok(())
            }
            DeclKind::Init(stmts) => self.collect(Body::Block { stmts, tail_returns: false }, out),
            DeclKind::Package(_) | DeclKind::Import(_) => Ok(()),
        }
    }

    fn finish(&self, values: &[TrackedValue]) -> Vec<Finding> {
        report::report(values, self.lines, self.options.primary_closing_function())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closelint_types::ProgramResolver;

    /// Findings of every function in `src`, as `(line, column)` pairs.
    fn check(src: &str) -> Vec<(usize, usize)> {
        let lexed = closelint_lexer::Lexer::new(src).tokenize();
        assert!(lexed.is_ok(), "Lex errors: {:?}", lexed.errors);
        let parsed = closelint_parser::Parser::new(lexed.tokens).parse();
        assert!(parsed.is_ok(), "Parse errors: {:?}", parsed.errors);
        let resolver = ProgramResolver::new(&parsed.decls, &[]);
        let options = AnalysisOptions::default();
        let lines = LineMap::new(src);
        let analyzer = Analyzer::new(&resolver, &options, &lines);
        let mut out = Vec::new();
        for decl in &parsed.decls {
            if let DeclKind::Fn(func) = &decl.kind {
                out.extend(analyzer.analyze_fn(func).unwrap());
            }
        }
        out.into_iter().map(|f| (f.location.line, f.location.column)).collect()
    }

    #[test]
    fn chained_use_is_compliant() {
        assert!(check("fun f() {\n    StringReader(\"x\").use { it.readLines() }\n}").is_empty());
    }

    #[test]
    fn chained_misuse_reported_at_method() {
        assert_eq!(check("fun f() {\n    StringReader(\"x\").forEachLine { println(it) }\n}"), vec![(2, 23)]);
    }

    #[test]
    fn stored_then_used_is_compliant() {
        assert!(check("fun f() {\n    val r = StringReader(\"x\")\n    r.use { it.read() }\n}").is_empty());
        assert!(check("fun f() {\n    val lines = StringReader(\"x\").use { it.readLines() }\n}").is_empty());
    }

    #[test]
    fn stored_then_misused_reported_at_method() {
        assert_eq!(check("fun f() {\n    val reader = StringReader(\"x\")\n    reader.readLines()\n}"), vec![(3, 12)]);
    }

    #[test]
    fn rebinding_is_followed() {
        assert_eq!(check("fun f() {\n    val a = StringReader(\"x\")\n    val b = a\n    b.read()\n}"), vec![(4, 7)]);
    }

    #[test]
    fn parameters_and_receivers_are_borrowed() {
        let src = "fun debug(c: Closeable) {\n    println(c.toString())\n}\nfun Closeable.tap(): Closeable {\n    println(this.toString())\n    return this\n}";
        assert!(check(src).is_empty());
    }

    #[test]
    fn pass_through_calls_are_transparent() {
        let src = "fun Closeable.tap(): Closeable {\n    return this\n}\nfun f() {\n    StringReader(\"x\").tap().use { }\n    StringReader(\"y\").also { println(it) }.close()\n}";
        assert_eq!(check(src), vec![(6, 44)]);
    }

    #[test]
    fn transfers_are_compliant() {
        let src = "fun a() = StringReader(\"x\")\nfun b(): Reader {\n    return StringReader(\"x\")\n}\nfun c() {\n    consume(StringReader(\"x\"))\n}\nfun d() {\n    val r = StringReader(\"x\")\n    holder.reader = r\n}";
        assert!(check(src).is_empty());
    }

    #[test]
    fn callers_of_resource_functions_own_the_result() {
        let src = "fun open() = StringReader(\"x\")\nfun f() {\n    open().read()\n    open().use { }\n}";
        assert_eq!(check(src), vec![(3, 12)]);
    }

    #[test]
    fn branches_make_values_untracked() {
        let src = "fun f(flag: Boolean) {\n    val r = StringReader(\"x\")\n    if (flag) println(1)\n    r.read()\n}";
        assert!(check(src).is_empty());
    }

    #[test]
    fn lambda_bodies_are_analyzed() {
        let src = "fun f() {\n    run {\n        StringReader(\"x\").read()\n    }\n    val make = { StringReader(\"y\") }\n}";
        assert_eq!(check(src), vec![(3, 27)]);
    }

    #[test]
    fn wrappers_take_ownership() {
        let src = "fun f(path: String) {\n    FileInputStream(path).bufferedReader().use { it.readText() }\n}";
        assert!(check(src).is_empty());
    }

    #[test]
    fn member_access_leaks() {
        assert_eq!(check("fun f() {\n    val n = Socket().port\n}"), vec![(2, 22)]);
    }

    #[test]
    fn one_finding_per_origin() {
        let src = "fun f() {\n    val r = StringReader(\"x\")\n    r.read()\n    r.read()\n}";
        assert_eq!(check(src).len(), 1);
    }

    #[test]
    fn analysis_is_idempotent() {
        let src = "fun f() {\n    StringReader(\"x\").read()\n    val r = StringReader(\"y\")\n    r.ready()\n}";
        assert_eq!(check(src), check(src));
    }

    #[test]
    fn custom_closing_functions() {
        let src = "fun f() {\n    StringReader(\"x\").autoClose { }\n}";
        let lexed = closelint_lexer::Lexer::new(src).tokenize();
        let parsed = closelint_parser::Parser::new(lexed.tokens).parse();
        let resolver = ProgramResolver::new(&parsed.decls, &[]);
        let options = AnalysisOptions { closing_functions: vec!["autoClose".to_string()] };
        let lines = LineMap::new(src);
        let analyzer = Analyzer::new(&resolver, &options, &lines);
        let DeclKind::Fn(func) = &parsed.decls[0].kind else { panic!("Expected function") };
        assert!(analyzer.analyze_fn(func).unwrap().is_empty());
        assert_eq!(options.primary_closing_function(), "autoClose");
    }

    #[test]
    fn inference_cycles_fail_the_function() {
        let src = "fun a() = b()\nfun b() = a()\nfun f() {\n    a()\n}";
        let lexed = closelint_lexer::Lexer::new(src).tokenize();
        let parsed = closelint_parser::Parser::new(lexed.tokens).parse();
        let resolver = ProgramResolver::new(&parsed.decls, &[]);
        let options = AnalysisOptions::default();
        let lines = LineMap::new(src);
        let analyzer = Analyzer::new(&resolver, &options, &lines);
        let DeclKind::Fn(func) = &parsed.decls[2].kind else { panic!("Expected function") };
        assert!(matches!(analyzer.analyze_fn(func), Err(AnalysisError::Resolve(_))));
    }
}
