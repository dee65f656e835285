// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Syntax tree for the Kotlin-like source subset closelint analyzes.
//!
//! Shared between the lexer, parser, resolver and the ownership analysis.

pub mod span;
pub mod token;
pub mod ty;
pub mod expr;
pub mod stmt;
pub mod decl;
pub mod visit;

pub use span::{Span, LineMap};
pub use visit::Child;

/// Unique identifier for AST nodes.
///
/// The ownership analysis keys its parent links and use sites by node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
}
