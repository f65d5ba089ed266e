//! Attribute domains: the declared value type, undefined-ability, and the
//! closed bound an attribute's values are promised to live in.
//!
//! There is no teacher analog for this module — `a-tree` has no bound
//! analyzer — so its shape follows directly from spec.md §3's "Attribute
//! domain" description.

use crate::interner::{StringId, VariableId};

/// The declared shape of an attribute's values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int64,
    Float64,
    String,
    IntList,
    StringList,
    SegmentList,
    FrequencyCapList,
}

/// A closed interval (or bounded-set descriptor, for strings) an
/// attribute's values are promised to fall within.
///
/// Only `Bool`/`Int64`/`Float64`/`String`-typed attributes carry a
/// meaningful bound; the bound analyzer refuses any other value type (see
/// [`crate::bound::get_variable_bound`]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bound {
    Bool,
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    /// `is_bounded` is false when the attribute's string domain was never
    /// declared as a finite set (e.g. free-form text); `min_id`/`max_id`
    /// bound the interned ids actually in use, `max_cardinality` bounds
    /// how many distinct strings the attribute may take.
    String {
        is_bounded: bool,
        min_id: StringId,
        max_id: StringId,
        max_cardinality: usize,
    },
}

impl Bound {
    pub fn unbounded_int() -> Self {
        Bound::Int { min: i64::MIN, max: i64::MAX }
    }

    pub fn unbounded_float() -> Self {
        Bound::Float { min: f64::NEG_INFINITY, max: f64::INFINITY }
    }

    pub fn unbounded_string() -> Self {
        Bound::String {
            is_bounded: false,
            min_id: StringId(0),
            max_id: StringId(u32::MAX - 1),
            max_cardinality: usize::MAX,
        }
    }
}

/// A registered attribute: its name, dense id, declared type, whether it
/// may be absent from an event without that being a contract violation,
/// and its value bound.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDomain {
    pub name: String,
    pub var_id: VariableId,
    pub value_type: ValueType,
    pub allow_undefined: bool,
    pub bound: Bound,
}
