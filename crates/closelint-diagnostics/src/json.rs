// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! JSON diagnostic output for machine consumption.
//!
//! Use `closelint check --format json` to get this output.

use closelint_ast::LineMap;
use serde::Serialize;

use crate::codes::CodeRegistry;
use crate::{Diagnostic, LabelStyle, Severity};

/// All diagnostics of one checked file.
#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    /// Schema version for forward compatibility.
    pub version: u32,
    pub file: String,
    /// No error-severity diagnostics.
    pub success: bool,
    pub diagnostics: Vec<JsonDiagnostic>,
    pub error_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub message: String,
    /// Primary source location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    pub labels: Vec<JsonLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// A location with 1-based line and column.
#[derive(Debug, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
    pub source_line: String,
}

#[derive(Debug, Serialize)]
pub struct JsonLabel {
    /// "primary" or "secondary".
    pub role: LabelStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub start: LineCol,
    pub end: LineCol,
}

#[derive(Debug, Serialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

/// Convert diagnostics of one file to a structured report.
pub fn to_json_report(diagnostics: &[Diagnostic], source: &str, file: &str) -> DiagnosticReport {
    let registry = CodeRegistry::default();
    let lines = LineMap::new(source);

    let error_count = diagnostics.iter().filter(|d| d.severity == Severity::Error).count();
    let warning_count = diagnostics.iter().filter(|d| d.severity == Severity::Warning).count();

    DiagnosticReport {
        version: 1,
        file: file.to_string(),
        success: error_count == 0,
        diagnostics: diagnostics.iter().map(|d| to_json_diagnostic(d, source, &lines, &registry)).collect(),
        error_count,
        warning_count,
    }
}

fn to_json_diagnostic(diag: &Diagnostic, source: &str, lines: &LineMap, registry: &CodeRegistry) -> JsonDiagnostic {
    let code = diag.code.as_ref().map(|c| c.0.clone());
    let category = code.as_deref().and_then(|c| registry.get(c)).map(|info| info.category.to_string());

    let location = diag.primary_span().map(|span| {
        let (line, column) = lines.line_col(span.start);
        SourceLocation {
            line,
            column,
            byte_offset: span.start,
            source_line: lines.line_text(source, line).unwrap_or("").to_string(),
        }
    });

    let line_col = |offset: usize| {
        let (line, column) = lines.line_col(offset);
        LineCol { line, column, byte_offset: offset }
    };
    let labels = diag
        .labels
        .iter()
        .map(|l| JsonLabel {
            role: l.style,
            message: l.message.clone(),
            start: line_col(l.span.start),
            end: line_col(l.span.end),
        })
        .collect();

    JsonDiagnostic {
        severity: diag.severity,
        code,
        category,
        message: diag.message.clone(),
        location,
        labels,
        notes: diag.notes.clone(),
        help: diag.help.clone(),
    }
}

/// Serialize a report to pretty JSON.
pub fn to_json_string<T: Serialize + ?Sized>(report: &T) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use closelint_ast::Span;

    #[test]
    fn report_counts_and_locates() {
        let src = "fun f() {\n    StringReader(\"x\").read()\n}\n";
        let at = src.find("read()").unwrap();
        let diags = vec![
            Diagnostic::warning("leak").with_code("C0300").with_primary(Span::new(at, at + 4), "here"),
            Diagnostic::note("skipped"),
        ];
        let report = to_json_report(&diags, src, "A.kt");
        assert!(report.success);
        assert_eq!(report.warning_count, 1);
        let loc = report.diagnostics[0].location.as_ref().unwrap();
        assert_eq!((loc.line, loc.column), (2, 23));
        assert_eq!(report.diagnostics[0].category.as_deref(), Some("Ownership"));

        let value: serde_json::Value = serde_json::from_str(&to_json_string(&report)).unwrap();
        assert_eq!(value["diagnostics"][0]["severity"], "warning");
        assert_eq!(value["diagnostics"][0]["labels"][0]["role"], "primary");
        assert!(value["diagnostics"][1].get("location").is_none());
    }
}
