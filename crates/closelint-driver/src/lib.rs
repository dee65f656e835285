// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Checks one source file end to end.
//!
//! Lexing, parsing, resolution and the ownership analysis are run in order.
//! A function the analysis cannot handle is skipped and reported as a note;
//! the rest of the file is still checked.

pub mod config;

pub use config::{ConfigError, LintConfig, RuleConfig, CONFIG_FILE_NAME};

use closelint_ast::decl::{Decl, DeclKind};
use closelint_ast::{LineMap, Span};
use closelint_diagnostics::{Diagnostic, Severity, ToDiagnostic};
use closelint_lexer::Lexer;
use closelint_ownership::{AnalysisError, Analyzer, Finding};
use closelint_parser::Parser;
use closelint_types::ProgramResolver;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of checking one file.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub file: String,
    pub findings: Vec<FindingRecord>,
    pub skipped: Vec<SkippedFunction>,
    /// Lex and parse errors, findings and skip notes, ready for display
    pub diagnostics: Vec<Diagnostic>,
    /// The file did not lex or parse, so nothing was analyzed.
    pub syntax_failed: bool,
}

/// A finding with the severity it was reported at.
#[derive(Debug, Clone, Serialize)]
pub struct FindingRecord {
    pub rule: &'static str,
    pub severity: Severity,
    pub line: usize,
    pub column: usize,
    pub span: Span,
    pub origin: Span,
    pub message: String,
}

/// A function left out because its analysis failed.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFunction {
    pub name: String,
    pub span: Span,
    pub reason: String,
}

impl CheckReport {
    fn empty(file: &str) -> Self {
        Self {
            file: file.to_string(),
            findings: Vec::new(),
            skipped: Vec::new(),
            diagnostics: Vec::new(),
            syntax_failed: false,
        }
    }

    /// Whether the file should fail the run.
    pub fn has_errors(&self) -> bool {
        self.syntax_failed || self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// A unit analyzed on its own, with the name used when it is skipped.
enum Unit<'a> {
    Fn(String, &'a closelint_ast::decl::FnDecl, Span),
    Property(String, &'a closelint_ast::decl::PropertyDecl, Span),
    Init(String, &'a [closelint_ast::stmt::Stmt], Span),
}

fn collect_units<'a>(decls: &'a [Decl], owner: Option<&str>, out: &mut Vec<Unit<'a>>) {
    let qualify = |name: &str| match owner {
        Some(owner) => format!("{}.{}", owner, name),
        None => name.to_string(),
    };
    for decl in decls {
        match &decl.kind {
            DeclKind::Fn(f) => out.push(Unit::Fn(qualify(&f.name), f, decl.span)),
            DeclKind::Property(p) => out.push(Unit::Property(qualify(&p.name), p, decl.span)),
            DeclKind::Init(stmts) => out.push(Unit::Init(qualify("<init>"), stmts, decl.span)),
            DeclKind::Class(class) => collect_units(&class.members, Some(&qualify(&class.name)), out),
            DeclKind::Package(_) | DeclKind::Import(_) => {}
        }
    }
}

/// Check `source`, reporting locations against `file`.
pub fn check_source(source: &str, file: &str, config: &LintConfig) -> CheckReport {
    info!(file, "checking");
    let mut report = CheckReport::empty(file);

    let lexed = Lexer::new(source).tokenize();
    if !lexed.is_ok() {
        report.syntax_failed = true;
        report.diagnostics.extend(lexed.errors.iter().map(ToDiagnostic::to_diagnostic));
        return report;
    }

    let parsed = Parser::new(lexed.tokens).parse();
    if !parsed.is_ok() {
        report.syntax_failed = true;
        report.diagnostics.extend(parsed.errors.iter().map(ToDiagnostic::to_diagnostic));
        return report;
    }

    let rule = &config.closeable_requires_use;
    if !rule.active {
        debug!(file, "CloseableRequiresUse is inactive");
        return report;
    }

    let resolver = ProgramResolver::new(&parsed.decls, &rule.closeable_types);
    let options = rule.analysis_options();
    let lines = LineMap::new(source);
    let analyzer = Analyzer::new(&resolver, &options, &lines);

    let mut units = Vec::new();
    collect_units(&parsed.decls, None, &mut units);

    let mut findings: Vec<Finding> = Vec::new();
    for unit in &units {
        let (name, span, result) = match unit {
            Unit::Fn(name, f, span) => (name, *span, analyzer.analyze_fn(f)),
            Unit::Property(name, p, span) => (name, *span, analyzer.analyze_property(p)),
            Unit::Init(name, stmts, span) => (name, *span, analyzer.analyze_init(stmts)),
        };
        match result {
            Ok(found) => findings.extend(found),
            Err(err) => report.skip(name, span, &err),
        }
    }

    findings.sort_by_key(|f| (f.origin.start, f.origin.end));
    for finding in &findings {
        report.diagnostics.push(finding.to_diagnostic().with_severity(rule.severity));
        report.findings.push(FindingRecord {
            rule: finding.rule,
            severity: rule.severity,
            line: finding.location.line,
            column: finding.location.column,
            span: finding.span,
            origin: finding.origin,
            message: finding.message.clone(),
        });
    }
    info!(file, findings = report.findings.len(), skipped = report.skipped.len(), "checked");
    report
}

impl CheckReport {
    fn skip(&mut self, name: &str, span: Span, err: &AnalysisError) {
        warn!(function = name, error = %err, "skipping function");
        self.diagnostics.push(err.to_diagnostic().with_note(format!("`{}` was not checked", name)));
        self.skipped.push(SkippedFunction { name: name.to_string(), span, reason: err.to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_rule_reports_nothing() {
        let mut config = LintConfig::default();
        config.closeable_requires_use.active = false;
        let report = check_source("fun f() {\n    StringReader(\"x\").read()\n}", "A.kt", &config);
        assert!(report.findings.is_empty());
        assert!(!report.has_errors());
    }

    #[test]
    fn severity_comes_from_config() {
        let mut config = LintConfig::default();
        config.closeable_requires_use.severity = Severity::Error;
        let report = check_source("fun f() {\n    StringReader(\"x\").read()\n}", "A.kt", &config);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, Severity::Error);
        assert!(report.has_errors());
    }

    #[test]
    fn syntax_errors_stop_the_check() {
        let report = check_source("fun f( {", "A.kt", &LintConfig::default());
        assert!(report.syntax_failed);
        assert!(report.has_errors());
        assert!(report.findings.is_empty());
    }

    #[test]
    fn failing_function_is_skipped_alone() {
        let src = "fun a() = b()\nfun b() = a()\nfun uses() {\n    a()\n}\nfun leaks() {\n    StringReader(\"x\").read()\n}";
        let report = check_source(src, "A.kt", &LintConfig::default());
        assert_eq!(report.findings.len(), 1);
        assert!(report.skipped.iter().any(|s| s.name == "uses"));
        assert!(report.diagnostics.iter().any(|d| d.severity == Severity::Note));
        assert!(!report.has_errors());
    }

    #[test]
    fn members_and_properties_are_checked() {
        let src = "class Holder {\n    val kept = StringReader(\"kept\")\n    val size = StringReader(\"x\").read()\n    fun go() {\n        Socket().getInputStream()\n    }\n}";
        let report = check_source(src, "A.kt", &LintConfig::default());
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[0].line, 3);
        assert_eq!(report.findings[1].line, 5);
    }
}
