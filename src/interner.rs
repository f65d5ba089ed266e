//! The attribute/string interner and the per-attribute domain registry.
//!
//! [`Config`] is the single-writer-during-setup, multi-reader-during-evaluation
//! registry described by the core: it hands out dense [`VariableId`]s for
//! attribute names and dense, per-attribute [`StringId`]s for string literals.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use crate::domain::{AttributeDomain, Bound, ValueType};

/// A dense id assigned to a registered attribute, stable for the [`Config`]'s lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(pub(crate) u32);

impl VariableId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for VariableId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "var({})", self.0)
    }
}

/// A dense, per-attribute id assigned to an interned string literal.
///
/// Ids are dense starting at zero *per attribute*; the same bytes interned
/// under two different attributes get unrelated ids (see spec.md's "String
/// identity" design note). [`StringTable::SENTINEL`] is returned by the
/// non-interning lookup when a string was never seen by any predicate: it
/// cannot equal a real predicate's interned id, so event values built from
/// it never spuriously match an equality/set predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringId(pub(crate) u32);

impl Display for StringId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "str({})", self.0)
    }
}

/// Per-attribute string table: forward (text -> id) and reverse (id -> text).
///
/// The reverse direction exists because the `String` special predicate
/// (CONTAINS/STARTS_WITH/ENDS_WITH) needs the raw bytes of an event's
/// string value, not just its interned id.
#[derive(Clone, Debug, Default)]
pub struct StringTable {
    by_text: HashMap<String, StringId>,
    by_id: Vec<String>,
}

impl StringTable {
    /// Sentinel id returned by [`StringTable::get`] for a string that has
    /// never been interned. No predicate literal can ever be assigned this
    /// id, so it safely never equality-matches a real predicate.
    pub const SENTINEL: StringId = StringId(u32::MAX);

    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `value`, allocating a fresh dense id if it has not been seen
    /// before. Used by the compiler's `assign_str_id` pass for predicate
    /// literals.
    pub fn get_or_intern(&mut self, value: &str) -> StringId {
        if let Some(&id) = self.by_text.get(value) {
            return id;
        }
        let id = StringId(self.by_id.len() as u32);
        self.by_text.insert(value.to_owned(), id);
        self.by_id.push(value.to_owned());
        id
    }

    /// Non-mutating lookup, used when resolving event values: returns
    /// [`StringTable::SENTINEL`] if `value` was never interned by any
    /// predicate literal.
    pub fn get(&self, value: &str) -> StringId {
        self.by_text.get(value).copied().unwrap_or(Self::SENTINEL)
    }

    pub fn resolve(&self, id: StringId) -> Option<&str> {
        self.by_id.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Fatal: a required attribute lookup failed, or a caller tried to register
/// an attribute whose domain is internally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("attribute {0:?} has already been registered")]
    AlreadyRegistered(String),
}

/// The process-wide attribute/string registry and per-attribute domain store.
///
/// Single-writer during setup (`add_attr_domain`/`get_id_for_attr`/
/// `get_id_for_string`), multi-reader during matching; no internal locking
/// is provided (see spec.md §5 — the caller must finish compiling before
/// any `match_node` call).
#[derive(Clone, Debug, Default)]
pub struct Config {
    by_name: HashMap<String, VariableId>,
    domains: Vec<AttributeDomain>,
    strings: Vec<StringTable>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute with an explicit domain. Re-registering a name
    /// already present is a conflicting declaration, not a no-op: it returns
    /// [`ConfigError::AlreadyRegistered`] rather than silently discarding the
    /// new domain and handing back the old id (spec.md §5.1 lists duplicate
    /// attribute registration as a recoverable error).
    pub fn add_attr_domain(
        &mut self,
        name: &str,
        value_type: ValueType,
        bound: Bound,
        allow_undefined: bool,
    ) -> Result<VariableId, ConfigError> {
        if self.by_name.contains_key(name) {
            return Err(ConfigError::AlreadyRegistered(name.to_owned()));
        }
        let id = VariableId(self.domains.len() as u32);
        self.by_name.insert(name.to_owned(), id);
        self.domains.push(AttributeDomain {
            name: name.to_owned(),
            var_id: id,
            value_type,
            allow_undefined,
            bound,
        });
        self.strings.push(StringTable::new());
        Ok(id)
    }

    /// Idempotent attribute lookup used by the compiler's `assign_variable_id`
    /// pass: returns the existing id, or registers `name` with a permissive
    /// default domain (unbounded `Int64`, undefined not allowed) if it was
    /// never explicitly declared via [`Config::add_attr_domain`].
    pub fn get_id_for_attr(&mut self, name: &str) -> VariableId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        self.add_attr_domain(name, ValueType::Int64, Bound::unbounded_int(), false)
            .expect("first registration of a new name cannot fail")
    }

    pub fn var_exists(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn domain(&self, var_id: VariableId) -> &AttributeDomain {
        &self.domains[var_id.index()]
    }

    pub fn domain_by_name(&self, name: &str) -> Option<&AttributeDomain> {
        self.by_name.get(name).map(|&id| self.domain(id))
    }

    pub fn is_variable_allow_undefined(&self, var_id: VariableId) -> bool {
        self.domain(var_id).allow_undefined
    }

    /// Intern a string literal under its owning attribute, allocating a
    /// fresh per-attribute id if unseen.
    pub fn get_id_for_string(&mut self, attr_var: VariableId, literal: &str) -> StringId {
        self.strings[attr_var.index()].get_or_intern(literal)
    }

    /// Non-mutating string lookup used when resolving an event's string
    /// value against whatever predicates have already interned literals.
    pub fn lookup_string(&self, attr_var: VariableId, value: &str) -> StringId {
        self.strings[attr_var.index()].get(value)
    }

    pub fn resolve_string(&self, attr_var: VariableId, id: StringId) -> Option<&str> {
        self.strings[attr_var.index()].resolve(id)
    }

    /// How many distinct strings have been interned for `attr_var` so far.
    pub fn string_count(&self, attr_var: VariableId) -> usize {
        self.strings[attr_var.index()].len()
    }

    pub fn attribute_count(&self) -> usize {
        self.domains.len()
    }
}
