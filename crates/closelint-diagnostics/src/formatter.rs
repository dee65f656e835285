// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal formatter for diagnostics.
//!
//! ```text
//! warning[C0300]: Owned Closeable instances must be invoked with .use { }; ...
//!   --> Reader.kt:4:12
//!    |
//!  3 |     val reader = StringReader("x")
//!    |                  ----------------- created here
//!  4 |     reader.readLines()
//!    |            ^^^^^^^^^ used before it is closed
//!    |
//!    = note: rule: CloseableRequiresUse
//! ```

use std::collections::BTreeMap;

use colored::Colorize;

use closelint_ast::LineMap;

use crate::{Diagnostic, LabelStyle, Severity};

/// Formats diagnostics for terminal output.
pub struct DiagnosticFormatter<'a> {
    source: &'a str,
    file_name: Option<&'a str>,
    line_map: LineMap,
}

/// A source line with its labels.
struct AnnotatedLine {
    line_num: usize,
    text: String,
    annotations: Vec<Annotation>,
}

struct Annotation {
    col_start: usize,
    col_end: usize,
    style: LabelStyle,
    message: Option<String>,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, file_name: None, line_map: LineMap::new(source) }
    }

    pub fn with_file_name(mut self, name: &'a str) -> Self {
        self.file_name = Some(name);
        self
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();
        self.format_header(&mut out, diagnostic);

        let annotated = self.collect_annotated_lines(diagnostic);
        let Some(primary) = diagnostic.primary_span() else {
            self.format_footer(&mut out, diagnostic);
            return out;
        };

        let (line, col) = self.line_map.line_col(primary.start);
        let file = self.file_name.unwrap_or("<source>");
        out.push_str(&format!("  {} {}:{}:{}\n", "-->".blue(), file, line, col));

        let max_line = annotated.last().map(|a| a.line_num).unwrap_or(1);
        let gutter_width = max_line.to_string().len().max(2);

        let mut prev_line_num: Option<usize> = None;
        for annotated_line in &annotated {
            match prev_line_num {
                None => out.push_str(&format!("{} {}\n", " ".repeat(gutter_width + 1), "|".blue())),
                Some(prev) if annotated_line.line_num > prev + 1 => {
                    out.push_str(&format!("{} {}\n", " ".repeat(gutter_width), "...".blue()));
                }
                Some(_) => {}
            }

            out.push_str(&format!(
                "{:>width$} {} {}\n",
                annotated_line.line_num.to_string().blue().bold(),
                "|".blue(),
                annotated_line.text,
                width = gutter_width + 1,
            ));
            self.format_annotations(&mut out, annotated_line, gutter_width);
            prev_line_num = Some(annotated_line.line_num);
        }

        if !diagnostic.notes.is_empty() || diagnostic.help.is_some() {
            out.push_str(&format!("{} {}\n", " ".repeat(gutter_width + 1), "|".blue()));
        }
        self.format_footer(&mut out, diagnostic);
        out
    }

    fn format_header(&self, out: &mut String, diagnostic: &Diagnostic) {
        let severity = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Note => "note".blue().bold(),
        };

        match &diagnostic.code {
            Some(code) => out.push_str(&format!(
                "{}[{}]: {}\n",
                severity,
                code.0.as_str().bold(),
                diagnostic.message.bold()
            )),
            None => out.push_str(&format!("{}: {}\n", severity, diagnostic.message.bold())),
        }
    }

    fn format_footer(&self, out: &mut String, diagnostic: &Diagnostic) {
        let pad = " ".repeat(3);
        for note in &diagnostic.notes {
            out.push_str(&format!("{} {} {}: {}\n", pad, "=".cyan(), "note".cyan().bold(), note));
        }
        if let Some(ref help) = diagnostic.help {
            out.push_str(&format!("{} {} {}: {}\n", pad, "=".cyan(), "help".cyan().bold(), help));
        }
    }

    fn collect_annotated_lines(&self, diagnostic: &Diagnostic) -> Vec<AnnotatedLine> {
        let mut lines: BTreeMap<usize, AnnotatedLine> = BTreeMap::new();

        for label in &diagnostic.labels {
            let (line_num, col_start) = self.line_map.line_col(label.span.start);
            let (end_line, col_end) = self.line_map.line_col(label.span.end);
            let text = self.line_map.line_text(self.source, line_num).unwrap_or("");

            // Multi-line spans are underlined to the end of their first line
            let col_end = if end_line == line_num { col_end } else { text.len() + 1 };

            let entry = lines.entry(line_num).or_insert_with(|| AnnotatedLine {
                line_num,
                text: text.to_string(),
                annotations: Vec::new(),
            });
            entry.annotations.push(Annotation {
                col_start,
                col_end: col_end.max(col_start + 1),
                style: label.style,
                message: label.message.clone(),
            });
        }

        lines.into_values().collect()
    }

    fn format_annotations(&self, out: &mut String, annotated_line: &AnnotatedLine, gutter_width: usize) {
        let gutter = format!("{} {}", " ".repeat(gutter_width + 1), "|".blue());
        let mut sorted: Vec<&Annotation> = annotated_line.annotations.iter().collect();
        sorted.sort_by_key(|a| (a.style != LabelStyle::Primary, a.col_start));

        for ann in sorted {
            let width = ann.col_end - ann.col_start;
            let marks = match ann.style {
                LabelStyle::Primary => "^".repeat(width).red().bold().to_string(),
                LabelStyle::Secondary => "-".repeat(width).blue().to_string(),
            };
            let message = match (&ann.message, ann.style) {
                (Some(msg), LabelStyle::Primary) => format!(" {}", msg.red().bold()),
                (Some(msg), LabelStyle::Secondary) => format!(" {}", msg.blue()),
                (None, _) => String::new(),
            };
            out.push_str(&format!("{} {}{}{}\n", gutter, " ".repeat(ann.col_start - 1), marks, message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closelint_ast::Span;

    #[test]
    fn renders_location_and_labels() {
        colored::control::set_override(false);
        let src = "fun f() {\n    val reader = StringReader(\"x\")\n    reader.readLines()\n}\n";
        let start = src.find("readLines").unwrap();
        let origin = src.find("StringReader").unwrap();
        let diag = Diagnostic::warning("leak")
            .with_code("C0300")
            .with_primary(Span::new(start, start + 9), "used before it is closed")
            .with_secondary(Span::new(origin, origin + 17), "created here")
            .with_note("rule: CloseableRequiresUse");
        let out = DiagnosticFormatter::new(src).with_file_name("A.kt").format(&diag);
        assert!(out.starts_with("warning[C0300]: leak\n"));
        assert!(out.contains("--> A.kt:3:12"));
        assert!(out.contains("^^^^^^^^^ used before it is closed"));
        assert!(out.contains("----------------- created here"));
        assert!(out.contains("= note: rule: CloseableRequiresUse"));
    }

    #[test]
    fn diagnostics_without_labels_have_no_snippet() {
        colored::control::set_override(false);
        let out = DiagnosticFormatter::new("").format(&Diagnostic::error("cannot read file"));
        assert_eq!(out, "error: cannot read file\n");
    }
}
