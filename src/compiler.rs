//! The three-pass compiler pipeline: `assign_variable_id`, `assign_str_id`,
//! `assign_pred_id`, run in that order (spec.md §4.3). Each pass is pure
//! aside from appending to [`Config`]/[`PredicateMap`], and idempotent:
//! running the pipeline twice on an already-compiled tree reproduces the
//! same ids.

use crate::ast::{
    referenced_attr_names, referenced_raw_strings, AttrRef, EqualityLit, ListValue, Node, NodeKind,
    SetList, SetScalar, SpecialNode, StringLit,
};
use crate::interner::{Config, VariableId};
use crate::predicate_map::PredicateMap;
use crate::value::StringValue;

fn resolve_attr(attr: &mut AttrRef, config: &mut Config) {
    if let AttrRef::Name(name) = attr {
        let var = config.get_id_for_attr(name);
        *attr = AttrRef::Var(var);
    }
}

/// Replaces every textual attribute reference in `node` with its interned
/// [`VariableId`], registering previously-unseen attribute names in
/// `config` with a default domain.
pub fn assign_variable_id(config: &mut Config, node: &mut Node) {
    match &mut node.kind {
        NodeKind::NumericCompare { attr, .. }
        | NodeKind::Equality { attr, .. }
        | NodeKind::Variable(attr)
        | NodeKind::List { attr, .. } => resolve_attr(attr, config),
        NodeKind::And(left, right) | NodeKind::Or(left, right) => {
            assign_variable_id(config, left);
            assign_variable_id(config, right);
        }
        NodeKind::Not(child) => assign_variable_id(config, child),
        NodeKind::Set { left, right, .. } => {
            if let SetScalar::Variable(attr) = left {
                resolve_attr(attr, config);
            }
            if let SetList::Variable(attr) = right {
                resolve_attr(attr, config);
            }
        }
        NodeKind::Special(special) => match special {
            SpecialNode::FrequencyCap { now_attr, caps_attr, .. } => {
                resolve_attr(now_attr, config);
                resolve_attr(caps_attr, config);
            }
            SpecialNode::Segment { now_attr, segments_attr, .. } => {
                resolve_attr(now_attr, config);
                resolve_attr(segments_attr, config);
            }
            SpecialNode::Geo { lat_attr, lon_attr, .. } => {
                resolve_attr(lat_attr, config);
                resolve_attr(lon_attr, config);
            }
            SpecialNode::StringMatch { attr, .. } => resolve_attr(attr, config),
        },
    }
}

fn intern_lit(lit: &mut StringLit, config: &mut Config, var: VariableId) {
    if let StringLit::Raw(text) = lit {
        let id = config.get_id_for_string(var, text);
        *lit = StringLit::Interned(StringValue::new(var, id, text.as_str()));
    }
}

/// Interns every string literal, requiring `assign_variable_id` to have
/// already resolved the owning attribute so the literal can be interned
/// under the right per-attribute table.
pub fn assign_str_id(config: &mut Config, node: &mut Node) {
    match &mut node.kind {
        NodeKind::Equality { attr, value: EqualityLit::Str(lit), .. } => {
            intern_lit(lit, config, attr.var());
        }
        NodeKind::Equality { .. } | NodeKind::NumericCompare { .. } | NodeKind::Variable(_) => {}
        NodeKind::And(left, right) | NodeKind::Or(left, right) => {
            assign_str_id(config, left);
            assign_str_id(config, right);
        }
        NodeKind::Not(child) => assign_str_id(config, child),
        NodeKind::Set { left, right, .. } => {
            let var = match (&left, &right) {
                (SetScalar::Variable(attr), _) => attr.var(),
                (_, SetList::Variable(attr)) => attr.var(),
                _ => unreachable!("Set node violates the exactly-one-variable-side invariant"),
            };
            if let SetScalar::Str(lit) = left {
                intern_lit(lit, config, var);
            }
            if let SetList::StrList(lits) = right {
                for lit in lits.iter_mut() {
                    intern_lit(lit, config, var);
                }
                lits.sort_by_key(|v| v.interned().id);
                lits.dedup_by_key(|v| v.interned().id);
            }
        }
        NodeKind::List { attr, value, .. } => {
            if let ListValue::StrList(lits) = value {
                let var = attr.var();
                for lit in lits.iter_mut() {
                    intern_lit(lit, config, var);
                }
                lits.sort_by_key(|v| v.interned().id);
                lits.dedup_by_key(|v| v.interned().id);
            }
        }
        NodeKind::Special(SpecialNode::FrequencyCap { caps_attr, namespace, .. }) => {
            intern_lit(namespace, config, caps_attr.var());
        }
        NodeKind::Special(_) => {}
    }
}

/// Assigns the dense, deduplicated predicate id to every node via the
/// shared [`PredicateMap`].
pub fn assign_pred_id(map: &mut PredicateMap, node: &mut Node) -> crate::ast::PredId {
    map.assign_pred_id(node)
}

/// Runs `assign_variable_id`, `assign_str_id`, `assign_pred_id` in order.
pub fn compile(config: &mut Config, map: &mut PredicateMap, node: &mut Node) {
    assign_variable_id(config, node);
    assign_str_id(config, node);
    assign_pred_id(map, node);
}

/// Validation helper (spec.md §4.6): returns `false` rather than panicking
/// when some attribute reference in `node` is not registered in `config`.
/// Intended to run before `assign_variable_id` so a caller can reject a
/// malformed tree instead of having it silently auto-register.
pub fn all_variables_in_config(config: &Config, node: &Node) -> bool {
    let mut names = Vec::new();
    referenced_attr_names(node, &mut names);
    names.iter().all(|name| config.var_exists(name))
}

/// Validation helper (spec.md §4.6): returns `false` if any string literal
/// in `node` belongs to an attribute whose string domain is declared
/// bounded and already at its max cardinality with a *new* value (i.e.
/// interning this literal would exceed the declared bound). Attributes
/// with an unbounded string domain always pass.
pub fn all_bounded_strings_valid(config: &Config, node: &Node) -> bool {
    let mut refs = Vec::new();
    referenced_raw_strings(node, &mut refs);
    for (attr_name, text) in refs {
        let Some(domain) = config.domain_by_name(attr_name) else {
            return false;
        };
        if let crate::domain::Bound::String { is_bounded: true, max_cardinality, .. } = domain.bound {
            let already_interned = config.lookup_string(domain.var_id, text)
                != crate::interner::StringTable::SENTINEL;
            if !already_interned && config.string_count(domain.var_id) + 1 >= max_cardinality {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompareOp, EqOp, ListOp, NumericLit};
    use crate::domain::{Bound, ValueType};

    #[test]
    fn assign_variable_id_resolves_every_reference() {
        let mut config = Config::new();
        let mut tree = Node::and(
            Node::numeric_compare(CompareOp::LessThan, "age", NumericLit::Int64(30)),
            Node::variable("is_eligible"),
        );

        assign_variable_id(&mut config, &mut tree);

        assert!(config.var_exists("age"));
        assert!(config.var_exists("is_eligible"));
    }

    #[test]
    fn assign_variable_id_is_idempotent() {
        let mut config = Config::new();
        let mut tree = Node::variable("is_eligible");

        assign_variable_id(&mut config, &mut tree);
        let var_first = config.get_id_for_attr("is_eligible");
        assign_variable_id(&mut config, &mut tree);
        let var_second = config.get_id_for_attr("is_eligible");

        assert_eq!(var_first, var_second);
    }

    #[test]
    fn assign_str_id_interns_equality_literals() {
        let mut config = Config::new();
        config
            .add_attr_domain("country", ValueType::String, Bound::unbounded_string(), false)
            .unwrap();
        let mut tree = Node::equality(EqOp::Equal, "country", EqualityLit::Str(StringLit::raw("US")));

        assign_variable_id(&mut config, &mut tree);
        assign_str_id(&mut config, &mut tree);

        let NodeKind::Equality { value: EqualityLit::Str(lit), .. } = &tree.kind else {
            panic!("expected Equality node")
        };
        assert!(matches!(lit, StringLit::Interned(_)));
    }

    #[test]
    fn assign_str_id_sorts_and_dedups_string_lists() {
        let mut config = Config::new();
        let mut tree = Node::list(
            ListOp::OneOf,
            "segments",
            ListValue::StrList(vec![
                StringLit::raw("b"),
                StringLit::raw("a"),
                StringLit::raw("a"),
            ]),
        );

        assign_variable_id(&mut config, &mut tree);
        assign_str_id(&mut config, &mut tree);

        let NodeKind::List { value: ListValue::StrList(lits), .. } = &tree.kind else {
            panic!("expected List node")
        };
        assert_eq!(2, lits.len());
        assert!(lits[0].interned().id.0 < lits[1].interned().id.0);
    }

    #[test]
    fn compile_assigns_the_same_pred_id_to_structurally_equal_trees() {
        let mut config = Config::new();
        let mut map = PredicateMap::new();
        let mut a = Node::numeric_compare(CompareOp::LessThan, "age", NumericLit::Int64(30));
        let mut b = Node::numeric_compare(CompareOp::LessThan, "age", NumericLit::Int64(30));

        compile(&mut config, &mut map, &mut a);
        compile(&mut config, &mut map, &mut b);

        assert_eq!(a.id, b.id);
    }

    #[test]
    fn all_variables_in_config_rejects_unregistered_attributes() {
        let config = Config::new();
        let tree = Node::variable("is_eligible");

        assert!(!all_variables_in_config(&config, &tree));
    }

    #[test]
    fn all_variables_in_config_accepts_registered_attributes() {
        let mut config = Config::new();
        let mut tree = Node::variable("is_eligible");
        assign_variable_id(&mut config, &mut tree);

        assert!(all_variables_in_config(&config, &tree));
    }

    /// spec.md §4.6: the capacity test is `count+1 < max` (reject when
    /// `count+1 >= max`), so a bounded string domain with `max_cardinality
    /// = 2` accepts exactly two distinct literals and rejects a third.
    #[test]
    fn all_bounded_strings_valid_rejects_a_new_literal_at_capacity() {
        let mut config = Config::new();
        config
            .add_attr_domain(
                "country",
                ValueType::String,
                Bound::String {
                    is_bounded: true,
                    min_id: crate::interner::StringId(0),
                    max_id: crate::interner::StringId(1),
                    max_cardinality: 2,
                },
                false,
            )
            .unwrap();
        let country = config.domain_by_name("country").unwrap().var_id;
        config.get_id_for_string(country, "US");
        config.get_id_for_string(country, "CA");

        let already_interned =
            Node::equality(EqOp::Equal, "country", EqualityLit::Str(StringLit::raw("US")));
        assert!(all_bounded_strings_valid(&config, &already_interned));

        let new_literal =
            Node::equality(EqOp::Equal, "country", EqualityLit::Str(StringLit::raw("MX")));
        assert!(!all_bounded_strings_valid(&config, &new_literal));
    }

    /// One string already interned against a cardinality of 3 leaves room
    /// for one more (`count+1 = 2 < 3`), so a second, never-seen literal
    /// is still accepted.
    #[test]
    fn all_bounded_strings_valid_accepts_a_new_literal_under_capacity() {
        let mut config = Config::new();
        config
            .add_attr_domain(
                "country",
                ValueType::String,
                Bound::String {
                    is_bounded: true,
                    min_id: crate::interner::StringId(0),
                    max_id: crate::interner::StringId(2),
                    max_cardinality: 3,
                },
                false,
            )
            .unwrap();
        let country = config.domain_by_name("country").unwrap().var_id;
        config.get_id_for_string(country, "US");

        let new_literal =
            Node::equality(EqOp::Equal, "country", EqualityLit::Str(StringLit::raw("CA")));
        assert!(all_bounded_strings_valid(&config, &new_literal));
    }

    /// Property 1 (spec.md §8): running the three compiler passes twice
    /// yields an identical tree (same variable, string and predicate ids).
    #[test]
    fn compiling_twice_is_a_no_op() {
        let mut config = Config::new();
        let mut map = PredicateMap::new();
        let mut tree = Node::and(
            Node::numeric_compare(CompareOp::LessThan, "age", NumericLit::Int64(30)),
            Node::equality(EqOp::Equal, "country", EqualityLit::Str(StringLit::raw("US"))),
        );

        compile(&mut config, &mut map, &mut tree);
        let once = tree.clone();
        compile(&mut config, &mut map, &mut tree);

        assert_eq!(once, tree);
    }
}
