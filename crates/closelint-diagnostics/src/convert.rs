// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conversions from phase errors and findings to `Diagnostic`.

use crate::codes::{ANALYSIS_SKIPPED, CLOSEABLE_REQUIRES_USE, LEX_ERROR, PARSE_ERROR};
use crate::{Diagnostic, ToDiagnostic};

// ============================================================================
// Lex Errors
// ============================================================================

impl ToDiagnostic for closelint_lexer::LexError {
    fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(&self.message)
            .with_code(LEX_ERROR)
            .with_primary(self.span, "here");

        if let Some(ref hint) = self.hint {
            diag = diag.with_help(hint.as_str());
        }

        diag
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

impl ToDiagnostic for closelint_parser::ParseError {
    fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(&self.message)
            .with_code(PARSE_ERROR)
            .with_primary(self.span, "here");

        if let Some(ref hint) = self.hint {
            diag = diag.with_help(hint.as_str());
        }

        diag
    }
}

// ============================================================================
// Resolution and analysis failures
// ============================================================================

impl ToDiagnostic for closelint_types::ResolveError {
    fn to_diagnostic(&self) -> Diagnostic {
        use closelint_types::ResolveError::*;

        let diag = Diagnostic::note(self.to_string()).with_code(ANALYSIS_SKIPPED);
        match self {
            InferenceCycle { span, .. } => diag
                .with_primary(*span, "return type inferred from its own body")
                .with_help("add an explicit return type"),
            SupertypeCycle { span, .. } => diag.with_primary(*span, "declared here"),
        }
    }
}

impl ToDiagnostic for closelint_ownership::AnalysisError {
    fn to_diagnostic(&self) -> Diagnostic {
        match self {
            closelint_ownership::AnalysisError::Resolve(e) => e.to_diagnostic(),
        }
    }
}

// ============================================================================
// Findings
// ============================================================================

impl ToDiagnostic for closelint_ownership::Finding {
    fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::warning(&self.message)
            .with_code(CLOSEABLE_REQUIRES_USE)
            .with_primary(self.span, "used before it is closed");
        if self.origin != self.span {
            diag = diag.with_secondary(self.origin, "created here");
        }
        diag.with_note(format!("rule: {}", self.rule))
    }
}
