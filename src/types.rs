//! Tree-shaped subtype relation over vocabulary types.
//!
//! Every declared type either has a parent or is a root; the distinguished
//! [`TypeId::GENERIC`] type sits above all roots and is a supertype of
//! everything. Built-in types are leaves and refuse further subtyping.

use crate::symbol::Name;

/// Identifier of a type inside one [`TypeHierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    /// The type every other type specializes.
    pub const GENERIC: TypeId = TypeId(0);

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct TypeNode {
    name: Name,
    parent: Option<TypeId>,
    depth: u32,
    builtin: bool,
}

/// Forest of declared types rooted under [`TypeId::GENERIC`].
#[derive(Debug, Clone)]
pub struct TypeHierarchy {
    nodes: Vec<TypeNode>,
}

impl TypeHierarchy {
    /// Create a hierarchy holding only the generic type, named `generic_name`.
    pub fn new(generic_name: Name) -> Self {
        Self {
            nodes: vec![TypeNode {
                name: generic_name,
                parent: None,
                depth: 0,
                builtin: false,
            }],
        }
    }

    /// Add a type below `parent` (or as a new root when `None`).
    ///
    /// Returns None if the parent is a built-in type, which cannot be
    /// specialized.
    pub fn declare(&mut self, name: Name, parent: Option<TypeId>, builtin: bool) -> Option<TypeId> {
        let depth = match parent {
            Some(p) => {
                let node = self.nodes.get(p.index())?;
                if node.builtin {
                    return None;
                }
                node.depth + 1
            }
            None => 1,
        };
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(TypeNode {
            name,
            parent: parent.filter(|p| *p != TypeId::GENERIC),
            depth,
            builtin,
        });
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.nodes.len() as u32).map(TypeId)
    }

    pub fn name(&self, id: TypeId) -> Name {
        self.nodes[id.index()].name
    }

    pub fn parent(&self, id: TypeId) -> Option<TypeId> {
        self.nodes[id.index()].parent
    }

    pub fn is_builtin(&self, id: TypeId) -> bool {
        self.nodes[id.index()].builtin
    }

    /// Distance from the generic type; deeper means more specific.
    pub fn depth(&self, id: TypeId) -> u32 {
        self.nodes[id.index()].depth
    }

    /// Whether `sub` equals `sup` or is a transitive subtype of it.
    pub fn is_super_type_of(&self, sup: TypeId, sub: TypeId) -> bool {
        if sup == TypeId::GENERIC || sup == sub {
            return true;
        }
        let target_depth = self.depth(sup);
        let mut current = sub;
        while self.depth(current) > target_depth {
            match self.parent(current) {
                Some(p) if p == sup => return true,
                Some(p) => current = p,
                None => return false,
            }
        }
        false
    }

    /// Whether one of the two types subsumes the other.
    pub fn compatible(&self, a: TypeId, b: TypeId) -> bool {
        self.is_super_type_of(a, b) || self.is_super_type_of(b, a)
    }

    /// The more specific of two comparable types, None when incomparable.
    pub fn most_specific(&self, a: TypeId, b: TypeId) -> Option<TypeId> {
        if self.is_super_type_of(a, b) {
            Some(b)
        } else if self.is_super_type_of(b, a) {
            Some(a)
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/types.rs"]
mod tests;
