// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Analysis errors.

use closelint_ast::Span;
use closelint_types::ResolveError;
use thiserror::Error;

/// Why a function could not be analyzed.
///
/// Only resolver failures end up here; unknown shapes degrade to untracked values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl AnalysisError {
    pub fn span(&self) -> Span {
        match self {
            AnalysisError::Resolve(e) => e.span(),
        }
    }
}
