use std::collections::HashMap;

use crate::types::Ty;

/// Index of a scope inside an [`Environment`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The root scope, which is never discarded.
    pub const GLOBAL: ScopeId = ScopeId(0);
}

#[derive(Clone, Debug, PartialEq)]
pub struct Binding<H> {
    pub handle: H,
    pub ty: Ty,
}

#[derive(Clone, Debug)]
struct Scope<H> {
    parent: Option<ScopeId>,
    records: HashMap<Box<str>, Binding<H>>,
}

/// An arena of scopes. Each scope maps names to a storage handle and the
/// declared type, and optionally links to a parent scope. Lookups walk from
/// the given scope up to [`Environment::GLOBAL`].
///
/// Scopes are discarded in LIFO order, which matches how nested function
/// bodies are compiled.
#[derive(Debug)]
pub struct Environment<H> {
    scopes: Vec<Scope<H>>,
}

impl<H: Clone> Environment<H> {
    pub const GLOBAL: ScopeId = ScopeId::GLOBAL;

    pub fn new() -> Environment<H> {
        Environment {
            scopes: vec![Scope {
                parent: None,
                records: HashMap::new(),
            }],
        }
    }

    /// Creates an empty scope whose parent is `parent`.
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        self.push(Scope {
            parent: Some(parent),
            records: HashMap::new(),
        })
    }

    /// Creates a copy of `of`: same records, same parent. Definitions made in
    /// the snapshot are not visible from the original scope.
    pub fn snapshot(&mut self, of: ScopeId) -> ScopeId {
        let copy = self.scopes[of.0].clone();
        self.push(copy)
    }

    /// Drops `id`, which must be the most recently created scope.
    pub fn discard(&mut self, id: ScopeId) {
        debug_assert_ne!(id, Self::GLOBAL, "can't discard the global scope");
        debug_assert_eq!(id.0 + 1, self.scopes.len(), "scopes are discarded in LIFO order");
        self.scopes.truncate(id.0);
    }

    /// Binds `name` in `scope`, overwriting any previous binding of the same
    /// name in that scope. Returns the handle.
    pub fn define(&mut self, scope: ScopeId, name: &str, handle: H, ty: Ty) -> H {
        let binding = Binding {
            handle: handle.clone(),
            ty,
        };
        self.scopes[scope.0].records.insert(name.into(), binding);
        handle
    }

    /// Resolves `name`, starting at `scope` and walking through its parents.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Binding<H>> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(binding) = scope.records.get(name) {
                return Some(binding);
            }
            current = scope.parent;
        }
        None
    }

    fn push(&mut self, scope: Scope<H>) -> ScopeId {
        self.scopes.push(scope);
        ScopeId(self.scopes.len() - 1)
    }
}

impl<H: Clone> Default for Environment<H> {
    fn default() -> Self {
        Self::new()
    }
}
