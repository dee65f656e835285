// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Findings for leaked values.

use closelint_ast::{LineMap, Span};

use crate::state::{OwnershipState, TrackedValue};
use crate::verdict::{verdict, Verdict};

pub const RULE_NAME: &str = "CloseableRequiresUse";

/// 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// A resource the analyzed code owns but used without closing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub rule: &'static str,
    /// The offending use: the selector of the call on the unclosed value
    pub span: Span,
    pub location: Location,
    /// Where the value was created
    pub origin: Span,
    pub message: String,
}

pub fn message(closing_function: &str) -> String {
    format!(
        "Owned Closeable instances must be invoked with .{} {{ }}; see documentation for definitions of 'owned'.",
        closing_function
    )
}

/// One finding per violating value, ordered by where the value was created.
pub fn report(values: &[TrackedValue], lines: &LineMap, closing_function: &str) -> Vec<Finding> {
    let mut findings: Vec<Finding> = values
        .iter()
        .filter(|v| verdict(&v.state) == Verdict::Violation)
        .filter_map(|v| {
            let span = match v.state {
                OwnershipState::Leaked { at } => at,
                _ => v.terminal_site()?.span,
            };
            let (line, column) = lines.line_col(span.start);
            Some(Finding {
                rule: RULE_NAME,
                span,
                location: Location { line, column },
                origin: v.origin.span,
                message: message(closing_function),
            })
        })
        .collect();
    findings.sort_by_key(|f| (f.origin.start, f.origin.end, f.span.start));
    findings.dedup_by_key(|f| (f.origin.start, f.origin.end));
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Origin;
    use closelint_ast::NodeId;
    use closelint_types::Type;

    fn value(origin: Span, state: OwnershipState) -> TrackedValue {
        let mut v = TrackedValue::new(Origin { id: NodeId(origin.start as u32), span: origin, ty: Type::named("Reader") });
        v.settle(state);
        v
    }

    #[test]
    fn reports_leaks_in_origin_order() {
        let src = "a\nbb.read\ncc.read\n";
        let lines = LineMap::new(src);
        let values = vec![
            value(Span::new(10, 12), OwnershipState::Leaked { at: Span::new(13, 17) }),
            value(Span::new(0, 1), OwnershipState::Consumed { at: Span::new(0, 1) }),
            value(Span::new(2, 4), OwnershipState::Leaked { at: Span::new(5, 9) }),
        ];
        let findings = report(&values, &lines, "use");
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].location, Location { line: 2, column: 4 });
        assert_eq!(findings[1].location, Location { line: 3, column: 4 });
        assert_eq!(findings[0].rule, "CloseableRequiresUse");
    }

    #[test]
    fn message_names_the_closing_function() {
        assert_eq!(
            message("use"),
            "Owned Closeable instances must be invoked with .use { }; see documentation for definitions of 'owned'."
        );
        assert!(message("autoClose").contains(".autoClose { }"));
    }
}
