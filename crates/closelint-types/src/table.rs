// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Class hierarchy known to the resolver.

use std::collections::{HashMap, HashSet};

use closelint_ast::Span;

use crate::builtins::{CLOSEABLE_ROOTS, CLOSEABLE_TYPES};
use crate::error::ResolveError;

#[derive(Debug, Clone)]
struct ClassEntry {
    supertypes: Vec<String>,
    span: Span,
}

/// Names of classes and their direct supertypes.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    classes: HashMap<String, ClassEntry>,
    roots: HashSet<String>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table preloaded with the closeable types of the Java library.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        for root in CLOSEABLE_ROOTS {
            table.roots.insert(root.to_string());
        }
        for (name, supers) in CLOSEABLE_TYPES {
            table.declare(name, supers.iter().map(|s| s.to_string()).collect(), Span::default());
        }
        table
    }

    /// Treat `name` as closeable regardless of its supertypes.
    pub fn add_closeable(&mut self, name: impl Into<String>) {
        self.roots.insert(name.into());
    }

    /// Record a class. A later declaration with the same name replaces the earlier one.
    pub fn declare(&mut self, name: &str, supertypes: Vec<String>, span: Span) {
        self.classes.insert(name.to_string(), ClassEntry { supertypes, span });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name) || self.roots.contains(name)
    }

    /// Whether `name` is, or transitively extends, a closeable root.
    pub fn is_closeable(&self, name: &str) -> Result<bool, ResolveError> {
        let mut on_path = HashSet::new();
        let mut done = HashSet::new();
        self.reaches_root(name, &mut on_path, &mut done)
    }

    fn reaches_root<'a>(
        &'a self,
        name: &'a str,
        on_path: &mut HashSet<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<bool, ResolveError> {
        if self.roots.contains(name) {
            return Ok(true);
        }
        let Some(entry) = self.classes.get(name) else {
            return Ok(false);
        };
        if !on_path.insert(name) {
            return Err(ResolveError::SupertypeCycle { name: name.to_string(), span: entry.span });
        }
        for sup in &entry.supertypes {
            if done.contains(sup.as_str()) {
                continue;
            }
            if self.reaches_root(sup, on_path, done)? {
                return Ok(true);
            }
            done.insert(sup.as_str());
        }
        on_path.remove(name);
        Ok(false)
    }
}
