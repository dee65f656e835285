// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Capability classification: is a type a closeable resource.

use std::cell::RefCell;
use std::collections::HashMap;

use closelint_types::{Resolver, Type};

use crate::error::AnalysisError;

/// Memoizing front for [`Resolver::is_resource_type`].
///
/// The cache belongs to one analyzer run and is never shared between threads.
pub struct CapabilityClassifier<'r> {
    resolver: &'r dyn Resolver,
    cache: RefCell<HashMap<Type, bool>>,
}

impl<'r> CapabilityClassifier<'r> {
    pub fn new(resolver: &'r dyn Resolver) -> Self {
        Self { resolver, cache: RefCell::new(HashMap::new()) }
    }

    pub fn is_resource_type(&self, ty: &Type) -> Result<bool, AnalysisError> {
        if ty.is_unknown() {
            return Ok(false);
        }
        if let Some(&known) = self.cache.borrow().get(ty) {
            return Ok(known);
        }
        let answer = self.resolver.is_resource_type(ty)?;
        self.cache.borrow_mut().insert(ty.clone(), answer);
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use closelint_ast::expr::Expr;
    use closelint_types::{CalleeSignature, ResolveError};

    struct Counting {
        calls: Cell<usize>,
    }

    impl Resolver for Counting {
        fn is_resource_type(&self, ty: &Type) -> Result<bool, ResolveError> {
            self.calls.set(self.calls.get() + 1);
            Ok(ty.name() == Some("Socket"))
        }

        fn callee_signature(&self, _call: &Expr) -> Result<Option<CalleeSignature>, ResolveError> {
            Ok(None)
        }
    }

    #[test]
    fn answers_are_memoized() {
        let resolver = Counting { calls: Cell::new(0) };
        let classifier = CapabilityClassifier::new(&resolver);
        assert!(classifier.is_resource_type(&Type::named("Socket")).unwrap());
        assert!(classifier.is_resource_type(&Type::named("Socket")).unwrap());
        assert!(!classifier.is_resource_type(&Type::named("String")).unwrap());
        assert_eq!(resolver.calls.get(), 2);
    }

    #[test]
    fn unknown_is_never_a_resource() {
        let resolver = Counting { calls: Cell::new(0) };
        let classifier = CapabilityClassifier::new(&resolver);
        assert!(!classifier.is_resource_type(&Type::Unknown).unwrap());
        assert_eq!(resolver.calls.get(), 0);
    }
}
