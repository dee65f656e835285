// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Resolution errors.

use closelint_ast::Span;
use thiserror::Error;

/// A failure while answering a resolver query.
///
/// The analysis treats these as fatal for the function being analyzed only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// Return-type inference kept following expression bodies into each other.
    #[error("cannot infer the return type of `{function}`: inference recursed {depth} levels deep")]
    InferenceCycle { function: String, depth: usize, span: Span },

    /// A class appears among its own supertypes.
    #[error("type `{name}` inherits from itself")]
    SupertypeCycle { name: String, span: Span },
}

impl ResolveError {
    pub fn span(&self) -> Span {
        match self {
            ResolveError::InferenceCycle { span, .. } | ResolveError::SupertypeCycle { span, .. } => *span,
        }
    }
}
