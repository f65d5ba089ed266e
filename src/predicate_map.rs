//! Content-addressed predicate deduplication.
//!
//! Generalizes the teacher's `atree.rs` `expression_to_node: HashMap<...>`
//! whole-subtree dedup pattern (see `ATree::insert_node`) into the
//! spec.md §4.2/§4.3 `assign_pred_id` pass: every node in the tree, leaf or
//! internal, gets a dense predicate id, and two nodes with the same
//! structural content (per [`crate::ast::eq_expr`]) always get the same id.
//!
//! Unlike the teacher's single hash-based `OptimizedNode::id()` (which its
//! own doc comment flags as collision-prone), this map keys on an exact,
//! hashable canonical representation (`PredicateKey`) built from already
//! resolved children ids for `And`/`Or`/`Not`, so no linear fallback scan
//! is needed: structurally equal nodes are, by construction, key-equal.

use std::collections::HashMap;

use slab::Slab;

use crate::ast::{
    AttrRef, EqualityLit, ListValue, Node, NodeKind, NumericLit, PredId, SetList, SetScalar,
    SpecialNode, StringLit,
};
use crate::interner::VariableId;
use crate::value::EQUALITY_EPSILON;

#[inline]
fn quantize_key(x: f64) -> i64 {
    (x / EQUALITY_EPSILON).round() as i64
}

fn var_key(attr: &AttrRef) -> VariableId {
    attr.var()
}

fn string_key(lit: &StringLit) -> (VariableId, u32) {
    let value = lit.interned();
    (value.variable, value.id.0)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum SetScalarKey {
    Int(i64),
    Str((VariableId, u32)),
    Variable(VariableId),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum SetListKey {
    IntList(Vec<i64>),
    StrList(Vec<(VariableId, u32)>),
    Variable(VariableId),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ListValueKey {
    IntList(Vec<i64>),
    StrList(Vec<(VariableId, u32)>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum NumericLitKey {
    Int64(i64),
    Float64(i64),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EqualityLitKey {
    Int64(i64),
    Float64(i64),
    Str((VariableId, u32)),
}

/// The exact, hashable canonical representation of a node's content. Two
/// nodes produce equal keys iff [`crate::ast::eq_expr`] would consider them
/// structurally equal (given their children have already been assigned
/// final, deduplicated ids).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum PredicateKey {
    NumericCompare { op: crate::ast::CompareOp, var: VariableId, value: NumericLitKey },
    Equality { op: crate::ast::EqOp, var: VariableId, value: EqualityLitKey },
    And(PredId, PredId),
    Or(PredId, PredId),
    Not(PredId),
    Variable(VariableId),
    Set { op: crate::ast::SetOp, left: SetScalarKey, right: SetListKey },
    List { op: crate::ast::ListOp, var: VariableId, value: ListValueKey },
    FrequencyCap {
        frequency_type: crate::value::FrequencyType,
        namespace: (VariableId, u32),
        requested_value: i64,
        length_seconds: i64,
    },
    Segment { op: crate::ast::SegmentOp, segment_id: i64, seconds: i64 },
    Geo { lat: i64, lon: i64, radius_km: i64 },
    StringMatch { op: crate::ast::StringMatchOp, var: VariableId, pattern: String },
}

fn numeric_lit_key(value: &NumericLit) -> NumericLitKey {
    match value {
        NumericLit::Int64(i) => NumericLitKey::Int64(*i),
        NumericLit::Float64(f) => NumericLitKey::Float64(quantize_key(*f)),
    }
}

fn equality_lit_key(value: &EqualityLit) -> EqualityLitKey {
    match value {
        EqualityLit::Int64(i) => EqualityLitKey::Int64(*i),
        EqualityLit::Float64(f) => EqualityLitKey::Float64(quantize_key(*f)),
        EqualityLit::Str(lit) => EqualityLitKey::Str(string_key(lit)),
    }
}

fn set_scalar_key(scalar: &SetScalar) -> SetScalarKey {
    match scalar {
        SetScalar::Int(i) => SetScalarKey::Int(*i),
        SetScalar::Str(lit) => SetScalarKey::Str(string_key(lit)),
        SetScalar::Variable(attr) => SetScalarKey::Variable(var_key(attr)),
    }
}

fn set_list_key(list: &SetList) -> SetListKey {
    match list {
        SetList::IntList(v) => SetListKey::IntList(v.clone()),
        SetList::StrList(v) => SetListKey::StrList(v.iter().map(string_key).collect()),
        SetList::Variable(attr) => SetListKey::Variable(var_key(attr)),
    }
}

fn list_value_key(value: &ListValue) -> ListValueKey {
    match value {
        ListValue::IntList(v) => ListValueKey::IntList(v.clone()),
        ListValue::StrList(v) => ListValueKey::StrList(v.iter().map(string_key).collect()),
    }
}

/// Builds the canonical key for a node whose children (if any) already
/// carry their final, deduplicated `id`.
fn key_for(node: &Node) -> PredicateKey {
    match &node.kind {
        NodeKind::NumericCompare { op, attr, value } => {
            PredicateKey::NumericCompare { op: *op, var: var_key(attr), value: numeric_lit_key(value) }
        }
        NodeKind::Equality { op, attr, value } => {
            PredicateKey::Equality { op: *op, var: var_key(attr), value: equality_lit_key(value) }
        }
        NodeKind::And(l, r) => PredicateKey::And(l.id, r.id),
        NodeKind::Or(l, r) => PredicateKey::Or(l.id, r.id),
        NodeKind::Not(child) => PredicateKey::Not(child.id),
        NodeKind::Variable(attr) => PredicateKey::Variable(var_key(attr)),
        NodeKind::Set { op, left, right } => {
            PredicateKey::Set { op: *op, left: set_scalar_key(left), right: set_list_key(right) }
        }
        NodeKind::List { op, attr, value } => {
            PredicateKey::List { op: *op, var: var_key(attr), value: list_value_key(value) }
        }
        NodeKind::Special(SpecialNode::FrequencyCap {
            frequency_type,
            namespace,
            requested_value,
            length_seconds,
            ..
        }) => PredicateKey::FrequencyCap {
            frequency_type: *frequency_type,
            namespace: string_key(namespace),
            requested_value: *requested_value,
            length_seconds: *length_seconds,
        },
        NodeKind::Special(SpecialNode::Segment { op, segment_id, seconds, .. }) => {
            PredicateKey::Segment { op: *op, segment_id: *segment_id, seconds: *seconds }
        }
        NodeKind::Special(SpecialNode::Geo { lat, lon, radius_km, .. }) => PredicateKey::Geo {
            lat: quantize_key(*lat),
            lon: quantize_key(*lon),
            radius_km: quantize_key(*radius_km),
        },
        NodeKind::Special(SpecialNode::StringMatch { attr, op, pattern }) => {
            PredicateKey::StringMatch { op: *op, var: var_key(attr), pattern: pattern.clone() }
        }
    }
}

/// The canonical predicate table: dense ids from zero, one canonical clone
/// stored per distinct structural key.
///
/// Backed by a [`Slab`] rather than a plain `Vec`, mirroring the teacher's
/// `atree.rs` `ATree::nodes: Slab<Entry<T>>` storage convention; this map
/// never removes entries (predicate ids are stable for the `Config`'s
/// lifetime per spec.md §3), so in practice every insert's key equals the
/// table's length at insertion time, exactly like a `Vec::push`.
#[derive(Debug, Default)]
pub struct PredicateMap {
    canon: HashMap<PredicateKey, PredId>,
    nodes: Slab<Node>,
}

impl PredicateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: PredId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Interns `node` (whose children, if any, already carry final ids),
    /// returning the existing id for an equal predicate or allocating a
    /// fresh dense one and storing a canonical clone.
    fn intern(&mut self, node: &Node) -> PredId {
        let key = key_for(node);
        if let Some(&id) = self.canon.get(&key) {
            return id;
        }
        let mut canonical = node.clone();
        let id = self.nodes.insert(canonical.clone()) as PredId;
        canonical.id = id;
        self.nodes[id as usize] = canonical;
        self.canon.insert(key, id);
        id
    }

    /// Walks `node` post-order, assigning `id` to every node (leaf and
    /// internal) via [`PredicateMap::intern`]. Idempotent: re-running on an
    /// already-assigned tree reproduces the same ids.
    pub fn assign_pred_id(&mut self, node: &mut Node) -> PredId {
        match &mut node.kind {
            NodeKind::And(left, right) | NodeKind::Or(left, right) => {
                self.assign_pred_id(left);
                self.assign_pred_id(right);
            }
            NodeKind::Not(child) => {
                self.assign_pred_id(child);
            }
            _ => {}
        }
        if let NodeKind::Set { .. } = &node.kind {
            node.check_set_invariant();
        }
        let id = self.intern(node);
        node.id = id;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompareOp, EqOp};
    use crate::interner::Config;

    fn compiled(config: &mut Config, mut node: Node) -> Node {
        let mut names = Vec::new();
        crate::ast::referenced_attr_names(&node, &mut names);
        let names: Vec<String> = names.into_iter().map(str::to_owned).collect();
        for name in names {
            let var = config.get_id_for_attr(&name);
            assign_var_everywhere(&mut node, &name, var);
        }
        node
    }

    fn assign_var_everywhere(node: &mut Node, name: &str, var: VariableId) {
        let replace = |attr: &mut AttrRef| {
            if let AttrRef::Name(n) = attr {
                if n == name {
                    *attr = AttrRef::Var(var);
                }
            }
        };
        match &mut node.kind {
            NodeKind::NumericCompare { attr, .. }
            | NodeKind::Equality { attr, .. }
            | NodeKind::Variable(attr)
            | NodeKind::List { attr, .. } => replace(attr),
            NodeKind::And(l, r) | NodeKind::Or(l, r) => {
                assign_var_everywhere(l, name, var);
                assign_var_everywhere(r, name, var);
            }
            NodeKind::Not(child) => assign_var_everywhere(child, name, var),
            NodeKind::Set { left, right, .. } => {
                if let SetScalar::Variable(attr) = left {
                    replace(attr);
                }
                if let SetList::Variable(attr) = right {
                    replace(attr);
                }
            }
            NodeKind::Special(_) => {}
        }
    }

    #[test]
    fn structurally_equal_leaves_get_the_same_id() {
        let mut config = Config::new();
        let mut map = PredicateMap::new();

        let mut a = compiled(
            &mut config,
            Node::numeric_compare(CompareOp::LessThan, "age", NumericLit::Int64(30)),
        );
        let mut b = compiled(
            &mut config,
            Node::numeric_compare(CompareOp::LessThan, "age", NumericLit::Int64(30)),
        );

        let id_a = map.assign_pred_id(&mut a);
        let id_b = map.assign_pred_id(&mut b);

        assert_eq!(id_a, id_b);
        assert_eq!(1, map.len());
    }

    #[test]
    fn different_operators_get_different_ids() {
        let mut config = Config::new();
        let mut map = PredicateMap::new();

        let mut a = compiled(
            &mut config,
            Node::numeric_compare(CompareOp::LessThan, "age", NumericLit::Int64(30)),
        );
        let mut b = compiled(
            &mut config,
            Node::numeric_compare(CompareOp::GreaterThan, "age", NumericLit::Int64(30)),
        );

        let id_a = map.assign_pred_id(&mut a);
        let id_b = map.assign_pred_id(&mut b);

        assert_ne!(id_a, id_b);
        assert_eq!(2, map.len());
    }

    #[test]
    fn shared_subexpressions_dedup_through_and_nodes() {
        let mut config = Config::new();
        let mut map = PredicateMap::new();

        let shared = |config: &mut Config| {
            compiled(config, Node::equality(EqOp::Equal, "country", EqualityLit::Int64(1)))
        };
        let mut tree_a = Node::and(shared(&mut config), Node::variable("unused_a"));
        let mut tree_b = Node::and(shared(&mut config), Node::variable("unused_b"));
        let mut names_a = Vec::new();
        crate::ast::referenced_attr_names(&tree_a, &mut names_a);
        for name in names_a.into_iter().map(str::to_owned).collect::<Vec<_>>() {
            let var = config.get_id_for_attr(&name);
            assign_var_everywhere(&mut tree_a, &name, var);
        }
        let mut names_b = Vec::new();
        crate::ast::referenced_attr_names(&tree_b, &mut names_b);
        for name in names_b.into_iter().map(str::to_owned).collect::<Vec<_>>() {
            let var = config.get_id_for_attr(&name);
            assign_var_everywhere(&mut tree_b, &name, var);
        }

        map.assign_pred_id(&mut tree_a);
        map.assign_pred_id(&mut tree_b);

        let NodeKind::And(left_a, _) = &tree_a.kind else { unreachable!() };
        let NodeKind::And(left_b, _) = &tree_b.kind else { unreachable!() };
        assert_eq!(left_a.id, left_b.id);
    }

    use proptest::prelude::*;

    fn compare_op_strategy() -> impl Strategy<Value = CompareOp> {
        prop_oneof![
            Just(CompareOp::LessThan),
            Just(CompareOp::LessThanEqual),
            Just(CompareOp::GreaterThan),
            Just(CompareOp::GreaterThanEqual),
        ]
    }

    proptest! {
        /// Property 2 (spec.md §8): for any two structurally equal trees
        /// compiled against the same `Config`, every corresponding node
        /// pair gets the same predicate id.
        #[test]
        fn structurally_equal_numeric_compares_always_get_the_same_id(
            op in compare_op_strategy(),
            literal in any::<i64>(),
        ) {
            let mut config = Config::new();
            let mut map = PredicateMap::new();

            let mut a = compiled(&mut config, Node::numeric_compare(op, "age", NumericLit::Int64(literal)));
            let mut b = compiled(&mut config, Node::numeric_compare(op, "age", NumericLit::Int64(literal)));

            let id_a = map.assign_pred_id(&mut a);
            let id_b = map.assign_pred_id(&mut b);

            prop_assert_eq!(id_a, id_b);
        }

        /// Two trees that differ only in their literal never collide,
        /// ruling out an always-equal degenerate key implementation.
        #[test]
        fn numeric_compares_with_different_literals_never_collide(
            op in compare_op_strategy(),
            a_lit in any::<i64>(),
            b_lit in any::<i64>(),
        ) {
            prop_assume!(a_lit != b_lit);
            let mut config = Config::new();
            let mut map = PredicateMap::new();

            let mut a = compiled(&mut config, Node::numeric_compare(op, "age", NumericLit::Int64(a_lit)));
            let mut b = compiled(&mut config, Node::numeric_compare(op, "age", NumericLit::Int64(b_lit)));

            let id_a = map.assign_pred_id(&mut a);
            let id_b = map.assign_pred_id(&mut b);

            prop_assert_ne!(id_a, id_b);
        }
    }
}
