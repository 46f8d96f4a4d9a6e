use lasso::{Spur, ThreadedRodeo};

/// Interned identifier for a type or predicate name.
pub type Name = Spur;

/// Thread-safe interner for vocabulary names.
///
/// Guarantees:
/// - The same string always produces the same `Name`
/// - Different strings always produce different `Name`s
/// - A `Name` can be resolved back to its string
pub struct SymbolStore {
    rodeo: ThreadedRodeo,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Intern a name, returning the existing id if it was seen before.
    pub fn intern(&self, name: &str) -> Name {
        self.rodeo.get_or_intern(name)
    }

    /// Resolve a name back to its string.
    /// Returns None if the name was not created by this store.
    pub fn resolve(&self, name: Name) -> Option<&str> {
        self.rodeo.try_resolve(&name)
    }

    /// Look up a name without interning it.
    pub fn get(&self, name: &str) -> Option<Name> {
        self.rodeo.get(name)
    }

    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for SymbolStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SymbolStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolStore")
            .field("len", &self.rodeo.len())
            .finish()
    }
}
