// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Types and call resolution for closelint.
//!
//! The ownership analysis only ever talks to the [`Resolver`] trait.
//! [`ProgramResolver`] is the file-level implementation the driver uses.

mod builtins;
mod error;
mod resolver;
mod signature;
mod table;
mod types;

pub use error::ResolveError;
pub use resolver::{ProgramResolver, Resolver};
pub use signature::{BodyShape, CalleeKind, CalleeSignature, PassThroughOf};
pub use table::TypeTable;
pub use types::Type;
