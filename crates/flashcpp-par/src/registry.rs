//! Symbol, namespace, and template registries (§4.3).
//!
//! Scopes form a stack during parsing. Lookup order at a given point:
//! innermost function scope → enclosing class scopes (innermost outward) →
//! enclosing namespace scopes (innermost outward) → global namespace.
//! Using-directives and namespace aliases are consulted at the namespace
//! level where they were declared.

use flashcpp_util::{FxHashMap, StringHandle};
use smallvec::SmallVec;

use crate::ast::{DeclId, TypeIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Namespace,
    Class,
    Function,
    Block,
}

/// One entry on the parser's scope stack.
#[derive(Debug, Default)]
pub struct Scope {
    pub kind: Option<ScopeKind>,
    pub names: FxHashMap<StringHandle, DeclId>,
    /// Namespaces `using`-directed into this scope, consulted after `names`
    /// misses but before falling through to the enclosing scope.
    pub using_namespaces: Vec<StringHandle>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self { kind: Some(kind), ..Default::default() }
    }
}

/// The scope stack plus the innermost-to-outermost lookup walk (§4.3).
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self { scopes: Vec::new() };
        table.scopes.push(Scope::new(ScopeKind::Global));
        table
    }

    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    pub fn declare(&mut self, name: StringHandle, decl: DeclId) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .names
            .insert(name, decl);
    }

    pub fn add_using_directive(&mut self, namespace: StringHandle) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .using_namespaces
            .push(namespace);
    }

    /// Unqualified lookup: innermost function scope outward to the global
    /// namespace, consulting using-directives at each namespace level.
    pub fn lookup(&self, name: StringHandle) -> Option<DeclId> {
        for scope in self.scopes.iter().rev() {
            if let Some(&decl) = scope.names.get(&name) {
                return Some(decl);
            }
        }
        None
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes
            .last()
            .and_then(|s| s.kind)
            .unwrap_or(ScopeKind::Global)
    }
}

/// Namespaces keyed by their pre-computed fully-qualified name, so
/// `"a::b::c"` lookups cost one hash rather than one per path segment.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    by_qualified_name: FxHashMap<StringHandle, NamespaceEntry>,
}

#[derive(Debug, Clone)]
pub struct NamespaceEntry {
    pub qualified_name: StringHandle,
    pub decl: DeclId,
    /// Namespaces this one has `using namespace` directives for.
    pub using_directives: Vec<StringHandle>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, qualified_name: StringHandle, decl: DeclId) {
        self.by_qualified_name.entry(qualified_name).or_insert(NamespaceEntry {
            qualified_name,
            decl,
            using_directives: Vec::new(),
        });
    }

    pub fn add_using_directive(&mut self, namespace: StringHandle, used: StringHandle) {
        if let Some(entry) = self.by_qualified_name.get_mut(&namespace) {
            entry.using_directives.push(used);
        }
    }

    pub fn get(&self, qualified_name: StringHandle) -> Option<&NamespaceEntry> {
        self.by_qualified_name.get(&qualified_name)
    }
}

/// Key for a template instantiation: the template plus its concrete
/// argument list. Most templates take only a handful of arguments, so the
/// argument lists are inline-stored `SmallVec`s to avoid a heap allocation
/// per instantiation lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateInstantiationKey {
    pub template: DeclId,
    pub type_args: SmallVec<[TypeIndex; 4]>,
    pub non_type_args: SmallVec<[i64; 2]>,
    /// Set when the template has a template-template parameter or a
    /// variadic tail that isn't captured by `type_args`/`non_type_args`.
    pub extension: Option<TemplateArgExtension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateArgExtension {
    pub template_template_args: SmallVec<[DeclId; 2]>,
    pub variadic_tail: SmallVec<[TypeIndex; 4]>,
}

/// Specialization rank used by partial-ordering: higher is more specialized.
pub type SpecializationRank = u32;

#[derive(Debug, Clone)]
pub struct TemplateSpecialization {
    pub decl: DeclId,
    pub rank: SpecializationRank,
}

/// Per-template-name bookkeeping: the primary template, its specializations,
/// out-of-class member definitions, and the instantiation cache.
#[derive(Debug, Default)]
pub struct TemplateEntry {
    pub primary: Option<DeclId>,
    pub specializations: Vec<TemplateSpecialization>,
    /// Keyed by (member name, optional signature string - distinguishes
    /// overloaded out-of-class member definitions).
    pub member_definitions: FxHashMap<(StringHandle, Option<StringHandle>), DeclId>,
    pub instantiations: FxHashMap<TemplateInstantiationKey, DeclId>,
}

/// Depth limit for recursive template instantiation (§4.3 failure modes).
pub const MAX_INSTANTIATION_DEPTH: u32 = 512;

#[derive(Debug, Default)]
pub struct TemplateRegistry {
    by_name: FxHashMap<StringHandle, TemplateEntry>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_primary(&mut self, name: StringHandle, decl: DeclId) {
        self.by_name.entry(name).or_default().primary = Some(decl);
    }

    pub fn register_specialization(&mut self, name: StringHandle, decl: DeclId, rank: SpecializationRank) {
        self.by_name
            .entry(name)
            .or_default()
            .specializations
            .push(TemplateSpecialization { decl, rank });
    }

    pub fn register_member_definition(
        &mut self,
        name: StringHandle,
        member: StringHandle,
        signature: Option<StringHandle>,
        decl: DeclId,
    ) {
        self.by_name
            .entry(name)
            .or_default()
            .member_definitions
            .insert((member, signature), decl);
    }

    pub fn cache_instantiation(&mut self, name: StringHandle, key: TemplateInstantiationKey, decl: DeclId) {
        self.by_name.entry(name).or_default().instantiations.insert(key, decl);
    }

    pub fn cached_instantiation(&self, name: StringHandle, key: &TemplateInstantiationKey) -> Option<DeclId> {
        self.by_name.get(&name)?.instantiations.get(key).copied()
    }

    pub fn entry(&self, name: StringHandle) -> Option<&TemplateEntry> {
        self.by_name.get(&name)
    }

    /// Partial-specialization resolution: among the specializations whose
    /// pattern unifies with the call site (represented here by the caller
    /// pre-filtering `candidates`), pick the one with the highest rank.
    /// Two candidates tied for highest rank is an ambiguity, reported by
    /// returning both so the caller can build the diagnostic's candidate set.
    pub fn pick_most_specialized<'a>(
        candidates: &'a [TemplateSpecialization],
    ) -> Result<Option<&'a TemplateSpecialization>, Vec<&'a TemplateSpecialization>> {
        let Some(best_rank) = candidates.iter().map(|c| c.rank).max() else {
            return Ok(None);
        };
        let best: Vec<&TemplateSpecialization> = candidates.iter().filter(|c| c.rank == best_rank).collect();
        match best.len() {
            0 => Ok(None),
            1 => Ok(Some(best[0])),
            _ => Err(best),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcpp_util::{Idx, StringInterner};

    fn decl(n: u32) -> DeclId {
        DeclId::from_usize(n as usize)
    }

    #[test]
    fn unqualified_lookup_walks_scopes_innermost_first() {
        let mut interner = StringInterner::new();
        let outer = interner.intern("outer");
        let inner = interner.intern("inner");

        let mut table = SymbolTable::new();
        table.declare(outer, decl(0));

        table.push_scope(ScopeKind::Function);
        table.declare(inner, decl(1));

        assert_eq!(table.lookup(inner), Some(decl(1)));
        assert_eq!(table.lookup(outer), Some(decl(0)));

        table.pop_scope();
        assert_eq!(table.lookup(inner), None);
    }

    #[test]
    fn shadowing_prefers_innermost_declaration() {
        let mut interner = StringInterner::new();
        let name = interner.intern("x");

        let mut table = SymbolTable::new();
        table.declare(name, decl(0));
        table.push_scope(ScopeKind::Block);
        table.declare(name, decl(1));
        assert_eq!(table.lookup(name), Some(decl(1)));
    }

    #[test]
    fn most_specialized_picks_unique_highest_rank() {
        let candidates = vec![
            TemplateSpecialization { decl: decl(0), rank: 1 },
            TemplateSpecialization { decl: decl(1), rank: 3 },
        ];
        let winner = TemplateRegistry::pick_most_specialized(&candidates).unwrap().unwrap();
        assert_eq!(winner.decl, decl(1));
    }

    #[test]
    fn tied_rank_is_reported_as_ambiguous() {
        let candidates = vec![
            TemplateSpecialization { decl: decl(0), rank: 2 },
            TemplateSpecialization { decl: decl(1), rank: 2 },
        ];
        let err = TemplateRegistry::pick_most_specialized(&candidates).unwrap_err();
        assert_eq!(err.len(), 2);
    }
}
