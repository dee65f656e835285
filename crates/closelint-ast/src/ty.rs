// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type references as written in source.
//!
//! These are syntactic; `closelint-types` turns them into resolved types.

use crate::Span;

/// A type annotation such as `Closeable`, `List<String>?` or `(Reader) -> Unit`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub kind: TypeRefKind,
    pub nullable: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRefKind {
    /// Possibly qualified name with type arguments: `java.io.Reader`, `Map<K, V>`.
    Named { path: Vec<String>, args: Vec<TypeRef> },
    /// Function type: `(A, B) -> R`, optionally with a receiver `T.() -> R`.
    Function {
        receiver: Option<Box<TypeRef>>,
        params: Vec<TypeRef>,
        ret: Box<TypeRef>,
    },
    /// Star projection `*` inside type arguments.
    Star,
}

impl TypeRef {
    /// The unqualified name of a named type (`java.io.Reader` -> `Reader`).
    pub fn simple_name(&self) -> Option<&str> {
        match &self.kind {
            TypeRefKind::Named { path, .. } => path.last().map(String::as_str),
            _ => None,
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TypeRefKind::Named { path, args } => {
                write!(f, "{}", path.join("."))?;
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
            }
            TypeRefKind::Function { receiver, params, ret } => {
                if let Some(recv) = receiver {
                    write!(f, "{}.", recv)?;
                }
                let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "({}) -> {}", params.join(", "), ret)?;
            }
            TypeRefKind::Star => write!(f, "*")?,
        }
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}
