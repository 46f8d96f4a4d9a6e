//! Typed predicate vocabulary.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::oracle::{PredicateDescriptor, TypeDescriptor, VocabularyDescriptor};
use crate::symbol::{Name, SymbolStore};
use crate::types::{TypeHierarchy, TypeId};

/// Name of the implicit supertype of every declared type.
pub const GENERIC_TYPE_NAME: &str = "generic";

/// Identifier of a predicate inside one [`Vocabulary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PredicateId(u32);

impl PredicateId {
    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How argument order affects atom identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArgumentOrder {
    /// Arguments are positional.
    #[default]
    Ordered,
    /// Argument order is irrelevant; atoms are kept with sorted arguments.
    Symmetric,
}

impl ArgumentOrder {
    pub fn is_symmetric(self) -> bool {
        matches!(self, ArgumentOrder::Symmetric)
    }

    /// Put `args` into the canonical order for this predicate kind.
    pub fn canonicalize(self, args: &mut [u32]) {
        if self.is_symmetric() {
            args.sort_unstable();
        }
    }

    /// Whether two argument lists denote the same atom.
    pub fn same_arguments(self, a: &[u32], b: &[u32]) -> bool {
        if a == b {
            return true;
        }
        if !self.is_symmetric() || a.len() != b.len() {
            return false;
        }
        let mut a: SmallVec<[u32; 4]> = SmallVec::from_slice(a);
        let mut b: SmallVec<[u32; 4]> = SmallVec::from_slice(b);
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

/// Flags attached to a predicate declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PredicateFlags {
    /// Argument order does not matter.
    pub symmetric: bool,
    /// Truth value is derived rather than observed.
    pub calculated: bool,
}

/// A predicate symbol with its argument types.
#[derive(Debug, Clone)]
pub struct PredicateDefinition {
    name: Name,
    arg_types: SmallVec<[TypeId; 4]>,
    order: ArgumentOrder,
    calculated: bool,
}

impl PredicateDefinition {
    pub fn name(&self) -> Name {
        self.name
    }

    pub fn arg_types(&self) -> &[TypeId] {
        &self.arg_types
    }

    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }

    pub fn order(&self) -> ArgumentOrder {
        self.order
    }

    pub fn is_symmetric(&self) -> bool {
        self.order.is_symmetric()
    }

    pub fn is_calculated(&self) -> bool {
        self.calculated
    }
}

impl PartialEq for PredicateDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arg_types == other.arg_types
    }
}

impl Eq for PredicateDefinition {}

/// Types and predicates a search ranges over.
///
/// A vocabulary is assembled once, then frozen behind an `Arc` and shared by
/// the atom universe and every clause built from it.
#[derive(Debug)]
pub struct Vocabulary {
    symbols: SymbolStore,
    types: TypeHierarchy,
    type_ids: HashMap<Name, TypeId>,
    predicates: Vec<PredicateDefinition>,
    predicate_ids: HashMap<Name, PredicateId>,
}

impl Vocabulary {
    pub fn new() -> Self {
        let symbols = SymbolStore::new();
        let generic = symbols.intern(GENERIC_TYPE_NAME);
        let mut type_ids = HashMap::new();
        type_ids.insert(generic, TypeId::GENERIC);
        Self {
            types: TypeHierarchy::new(generic),
            symbols,
            type_ids,
            predicates: Vec::new(),
            predicate_ids: HashMap::new(),
        }
    }

    /// Rebuild a vocabulary from its protocol description.
    ///
    /// Types must be listed after their parents.
    pub fn from_descriptor(descriptor: &VocabularyDescriptor) -> Result<Self> {
        let mut vocabulary = Self::new();
        for ty in &descriptor.types {
            if ty.builtin {
                if ty.parent.is_some() {
                    return Err(Error::Vocabulary(format!(
                        "built-in type `{}` cannot have a parent",
                        ty.name
                    )));
                }
                vocabulary.declare_builtin_type(&ty.name)?;
            } else {
                vocabulary.declare_type(&ty.name, ty.parent.as_deref())?;
            }
        }
        for pred in &descriptor.predicates {
            let arg_types: Vec<&str> = pred.arg_types.iter().map(String::as_str).collect();
            vocabulary.declare_predicate(
                &pred.name,
                &arg_types,
                PredicateFlags {
                    symmetric: pred.symmetric,
                    calculated: pred.calculated,
                },
            )?;
        }
        Ok(vocabulary)
    }

    /// Declare a type below `parent`, or a new root when `parent` is None.
    pub fn declare_type(&mut self, name: &str, parent: Option<&str>) -> Result<TypeId> {
        let parent = parent.map(|p| self.require_type(p)).transpose()?;
        self.insert_type(name, parent, false)
    }

    /// Declare a built-in leaf type such as `int` or `string`.
    pub fn declare_builtin_type(&mut self, name: &str) -> Result<TypeId> {
        self.insert_type(name, None, true)
    }

    fn insert_type(&mut self, name: &str, parent: Option<TypeId>, builtin: bool) -> Result<TypeId> {
        let interned = self.symbols.intern(name);
        if self.type_ids.contains_key(&interned) {
            return Err(Error::Vocabulary(format!("type `{name}` declared twice")));
        }
        let id = self.types.declare(interned, parent, builtin).ok_or_else(|| {
            Error::Vocabulary(format!(
                "type `{name}` cannot specialize built-in type `{}`",
                parent.map(|p| self.type_name(p)).unwrap_or(GENERIC_TYPE_NAME)
            ))
        })?;
        self.type_ids.insert(interned, id);
        Ok(id)
    }

    fn require_type(&self, name: &str) -> Result<TypeId> {
        self.type_id(name)
            .ok_or_else(|| Error::Vocabulary(format!("unknown type `{name}`")))
    }

    /// Declare a predicate over previously declared argument types.
    pub fn declare_predicate(
        &mut self,
        name: &str,
        arg_types: &[&str],
        flags: PredicateFlags,
    ) -> Result<PredicateId> {
        let interned = self.symbols.intern(name);
        if self.predicate_ids.contains_key(&interned) {
            return Err(Error::Vocabulary(format!("predicate `{name}` declared twice")));
        }
        let arg_types = arg_types
            .iter()
            .map(|t| self.require_type(t))
            .collect::<Result<SmallVec<[TypeId; 4]>>>()?;
        if flags.symmetric && arg_types.windows(2).any(|w| w[0] != w[1]) {
            return Err(Error::Vocabulary(format!(
                "symmetric predicate `{name}` needs identical argument types"
            )));
        }
        let id = PredicateId(self.predicates.len() as u32);
        self.predicates.push(PredicateDefinition {
            name: interned,
            arg_types,
            order: if flags.symmetric {
                ArgumentOrder::Symmetric
            } else {
                ArgumentOrder::Ordered
            },
            calculated: flags.calculated,
        });
        self.predicate_ids.insert(interned, id);
        Ok(id)
    }

    pub fn types(&self) -> &TypeHierarchy {
        &self.types
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        let interned = self.symbols.get(name)?;
        self.type_ids.get(&interned).copied()
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        self.symbols
            .resolve(self.types.name(id))
            .unwrap_or("<unknown type>")
    }

    pub fn predicate(&self, id: PredicateId) -> &PredicateDefinition {
        &self.predicates[id.index()]
    }

    pub fn predicate_id(&self, name: &str) -> Option<PredicateId> {
        let interned = self.symbols.get(name)?;
        self.predicate_ids.get(&interned).copied()
    }

    pub fn predicate_name(&self, id: PredicateId) -> &str {
        self.symbols
            .resolve(self.predicate(id).name)
            .unwrap_or("<unknown predicate>")
    }

    pub fn predicates(&self) -> impl Iterator<Item = (PredicateId, &PredicateDefinition)> {
        self.predicates
            .iter()
            .enumerate()
            .map(|(i, def)| (PredicateId(i as u32), def))
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    pub fn max_arity(&self) -> usize {
        self.predicates.iter().map(|p| p.arity()).max().unwrap_or(0)
    }

    /// Build an atom of `predicate` over `vars`, canonicalizing symmetric arguments.
    pub fn instance(&self, predicate: PredicateId, vars: &[u32]) -> Instance {
        Instance::new(predicate, self.predicate(predicate).order(), vars)
    }

    /// Protocol description of this vocabulary for the oracle.
    pub fn descriptor(&self) -> VocabularyDescriptor {
        let types = self
            .types
            .ids()
            .filter(|id| *id != TypeId::GENERIC)
            .map(|id| TypeDescriptor {
                name: self.type_name(id).to_string(),
                parent: self
                    .types
                    .parent(id)
                    .map(|p| self.type_name(p).to_string()),
                builtin: self.types.is_builtin(id),
            })
            .collect();
        let predicates = self
            .predicates()
            .map(|(id, def)| PredicateDescriptor {
                name: self.predicate_name(id).to_string(),
                arg_types: def
                    .arg_types()
                    .iter()
                    .map(|t| self.type_name(*t).to_string())
                    .collect(),
                symmetric: def.is_symmetric(),
                calculated: def.is_calculated(),
            })
            .collect();
        VocabularyDescriptor { types, predicates }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/vocabulary.rs"]
mod tests;
