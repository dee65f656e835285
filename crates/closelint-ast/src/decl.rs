// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Declaration AST nodes.

use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::ty::TypeRef;
use crate::{NodeId, Span};

/// A top-level or member declaration.
#[derive(Debug, Clone)]
pub struct Decl {
    pub id: NodeId,
    pub kind: DeclKind,
    pub span: Span,
}

/// The kind of declaration.
#[derive(Debug, Clone)]
pub enum DeclKind {
    /// `package a.b.c`
    Package(Vec<String>),
    /// `import a.b.C` / `import a.b.*` / `import a.b.C as D`
    Import(ImportDecl),
    /// Function, extension function or member function
    Fn(FnDecl),
    /// `class`, `interface` or `object`
    Class(ClassDecl),
    /// Top-level or member property
    Property(PropertyDecl),
    /// `init { }` block inside a class body
    Init(Vec<Stmt>),
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: Vec<String>,
    pub wildcard: bool,
    pub alias: Option<String>,
}

/// A function declaration.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub name_span: Span,
    pub modifiers: Vec<String>,
    pub type_params: Vec<String>,
    /// Receiver type of an extension function (`fun Closeable.tap()`).
    pub receiver: Option<TypeRef>,
    pub params: Vec<Param>,
    pub ret_ty: Option<TypeRef>,
    pub body: FnBody,
}

impl FnDecl {
    pub fn is_extension(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

/// The body of a function.
#[derive(Debug, Clone)]
pub enum FnBody {
    /// `{ statements }`
    Block(Vec<Stmt>),
    /// `= expression`
    Expr(Expr),
    /// Abstract or interface member without a body
    None,
}

/// A function or constructor parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<Expr>,
    /// `val`/`var` constructor parameter declaring a property.
    pub is_property: bool,
    pub is_vararg: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Object,
}

/// A class, interface or object declaration.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub name_span: Span,
    pub kind: ClassKind,
    pub modifiers: Vec<String>,
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    pub supertypes: Vec<TypeRef>,
    pub members: Vec<Decl>,
}

impl ClassDecl {
    pub fn methods(&self) -> impl Iterator<Item = &FnDecl> {
        self.members.iter().filter_map(|m| match &m.kind {
            DeclKind::Fn(f) => Some(f),
            _ => None,
        })
    }
}

/// A property declaration (`val reader = ...`, `var count: Int = 0`).
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: String,
    pub name_span: Span,
    pub modifiers: Vec<String>,
    pub mutable: bool,
    pub receiver: Option<TypeRef>,
    pub ty: Option<TypeRef>,
    pub init: Option<Expr>,
    /// Custom getter body (`get() = ...`).
    pub getter: Option<FnBody>,
}
