// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type representation.

use std::fmt;

use closelint_ast::ty::{TypeRef, TypeRefKind};

/// A resolved type.
///
/// Names are unqualified: `java.io.Reader` and `Reader` are the same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A class, interface or object type with its type arguments
    Named { name: String, args: Vec<Type> },
    /// `T?`
    Nullable(Box<Type>),
    /// Function type `(A, B) -> R`
    Function { params: Vec<Type>, ret: Box<Type> },
    /// `Unit`, also the type of block-bodied functions without a return type
    Unit,
    /// Anything the resolver could not determine
    Unknown,
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named { name: name.into(), args: Vec::new() }
    }

    /// Resolve a written type annotation.
    pub fn from_ref(ty: &TypeRef) -> Self {
        let base = match &ty.kind {
            TypeRefKind::Named { path, args } => match path.last().map(String::as_str) {
                Some("Unit") => Type::Unit,
                Some(name) => Type::Named {
                    name: name.to_string(),
                    args: args.iter().map(Type::from_ref).collect(),
                },
                None => Type::Unknown,
            },
            TypeRefKind::Function { receiver, params, ret } => Type::Function {
                params: receiver
                    .iter()
                    .map(|r| Type::from_ref(r))
                    .chain(params.iter().map(Type::from_ref))
                    .collect(),
                ret: Box::new(Type::from_ref(ret)),
            },
            TypeRefKind::Star => Type::Unknown,
        };
        if ty.nullable && base != Type::Unknown {
            Type::Nullable(Box::new(base))
        } else {
            base
        }
    }

    /// The type with any nullability stripped.
    pub fn non_null(&self) -> &Type {
        match self {
            Type::Nullable(inner) => inner.non_null(),
            other => other,
        }
    }

    /// Class name of a (possibly nullable) named type.
    pub fn name(&self) -> Option<&str> {
        match self.non_null() {
            Type::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Named { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            Type::Nullable(inner) => write!(f, "{}?", inner),
            Type::Function { params, ret } => {
                let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "({}) -> {}", params.join(", "), ret)
            }
            Type::Unit => write!(f, "Unit"),
            Type::Unknown => write!(f, "<unknown>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closelint_ast::Span;

    fn named_ref(path: &[&str], nullable: bool) -> TypeRef {
        TypeRef {
            kind: TypeRefKind::Named { path: path.iter().map(|s| s.to_string()).collect(), args: Vec::new() },
            nullable,
            span: Span::default(),
        }
    }

    #[test]
    fn qualified_names_are_unqualified() {
        assert_eq!(Type::from_ref(&named_ref(&["java", "io", "Reader"], false)), Type::named("Reader"));
    }

    #[test]
    fn nullable_wraps_and_strips() {
        let ty = Type::from_ref(&named_ref(&["Reader"], true));
        assert_eq!(ty.to_string(), "Reader?");
        assert_eq!(ty.non_null(), &Type::named("Reader"));
        assert_eq!(ty.name(), Some("Reader"));
    }

    #[test]
    fn unit_is_special() {
        assert_eq!(Type::from_ref(&named_ref(&["Unit"], false)), Type::Unit);
    }
}
