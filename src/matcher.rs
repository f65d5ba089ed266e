//! The memoized matcher: `match_node` and the leaf predicate semantics
//! (spec.md §4.4).
//!
//! Generalizes the teacher's `atree.rs` `evaluate_and`/`evaluate_or`/
//! `lazy_evaluate` short-circuit recursion (binary, not the teacher's
//! n-ary `Vec<NodeId>` children, since this crate's [`crate::ast::Node`]
//! keeps `And`/`Or` strictly binary per spec.md §3) and `predicates.rs`'
//! per-operator `evaluate` methods, extended with the `FrequencyCap`,
//! `Segment`, `Geo` and `String` leaves the teacher does not have.

use crate::ast::{
    CompareOp, EqOp, EqualityLit, ListOp, ListValue, Node, NodeKind, NumericLit, SegmentOp, SetList,
    SetOp, SetScalar, SpecialNode, StringMatchOp,
};
use crate::event::Event;
use crate::interner::{Config, VariableId};
use crate::memoize::{Memoize, Report};
use crate::value::{feq, fne, FrequencyType, Value};

const EARTH_RADIUS_KM: f64 = 6372.8;
const TO_RAD: f64 = 3.1415926536 / 180.0;

/// The outcome of resolving an attribute against an event (spec.md §4.4.1).
enum Resolved<'a> {
    Defined(&'a Value),
    Undefined,
}

/// `get_variable` (spec.md §4.4.1): scans `event` for `var`. A registered,
/// `allow_undefined` attribute absent from the event resolves to
/// `Undefined` (every referring predicate evaluates false); an attribute
/// not marked `allow_undefined` and absent is a fatal contract violation
/// (`MISSING`), since that represents a caller bug, not an engine-level
/// tri-state.
fn get_variable<'a>(config: &Config, event: &'a Event, var: VariableId) -> Resolved<'a> {
    match event.get(var) {
        Some(value) => Resolved::Defined(value),
        None => {
            if config.is_variable_allow_undefined(var) {
                Resolved::Undefined
            } else {
                panic!(
                    "contract violation: attribute {} is missing from the event and is not allow_undefined",
                    config.domain(var).name
                );
            }
        }
    }
}

/// Entry point (spec.md §4.4): evaluate `node` against `event`. `memoize`
/// and `report` are independently optional, matching the source's
/// `memoize_opt`/`report_opt`. This is the only caller that may pass
/// `top_level = true`; every recursive call passes `false`.
pub fn match_node(
    config: &Config,
    event: &Event,
    node: &Node,
    mut memoize: Option<&mut Memoize>,
    mut report: Option<&mut Report>,
) -> bool {
    eval(config, event, node, &mut memoize, &mut report, true).unwrap_or(false)
}

/// Evaluates `node`, returning `Option<bool>` so AND/OR/NOT can propagate
/// an undefined leaf without forcing it to `false` prematurely — only the
/// outermost [`match_node`] call collapses a final `None` to `false`
/// (spec.md §4.4.1). Checks and updates the memo bitset by `node.id`
/// around the dispatch, and records a hit in `report` (distinguishing
/// `top_level` per spec.md §4.4.3).
fn eval(
    config: &Config,
    event: &Event,
    node: &Node,
    memoize: &mut Option<&mut Memoize>,
    report: &mut Option<&mut Report>,
    top_level: bool,
) -> Option<bool> {
    if node.id != crate::ast::UNASSIGNED {
        if let Some(memo) = memoize {
            if let Some(result) = memo.get_result(node.id) {
                if let Some(report) = report {
                    report.record_memo_hit(top_level);
                }
                return Some(result);
            }
        }
    }

    let result = match &node.kind {
        NodeKind::And(left, right) => eval_and(config, event, left, right, memoize, report),
        NodeKind::Or(left, right) => eval_or(config, event, left, right, memoize, report),
        NodeKind::Not(child) => eval(config, event, child, memoize, report, false).map(|b| !b),
        NodeKind::Variable(attr) => match get_variable(config, event, attr.var()) {
            Resolved::Defined(value) => Some(value.as_bool()),
            Resolved::Undefined => None,
        },
        NodeKind::NumericCompare { op, attr, value } => {
            match get_variable(config, event, attr.var()) {
                Resolved::Defined(observed) => Some(eval_numeric_compare(*op, observed, value)),
                Resolved::Undefined => None,
            }
        }
        NodeKind::Equality { op, attr, value } => match get_variable(config, event, attr.var()) {
            Resolved::Defined(observed) => Some(eval_equality(*op, observed, value)),
            Resolved::Undefined => None,
        },
        NodeKind::Set { op, left, right } => eval_set(config, event, *op, left, right),
        NodeKind::List { op, attr, value } => match get_variable(config, event, attr.var()) {
            Resolved::Defined(observed) => Some(eval_list(*op, observed, value)),
            Resolved::Undefined => None,
        },
        NodeKind::Special(special) => eval_special(config, event, special),
    };

    if node.id != crate::ast::UNASSIGNED {
        if let (Some(memo), Some(result)) = (memoize, result) {
            memo.set_result(node.id, Some(result));
        }
    }

    result
}

fn eval_and(
    config: &Config,
    event: &Event,
    left: &Node,
    right: &Node,
    memoize: &mut Option<&mut Memoize>,
    report: &mut Option<&mut Report>,
) -> Option<bool> {
    let lhs = eval(config, event, left, memoize, report, false);
    if let Some(false) = lhs {
        return Some(false);
    }
    let rhs = eval(config, event, right, memoize, report, false);
    match (lhs, rhs) {
        (Some(a), Some(b)) => Some(a && b),
        (_, Some(false)) => Some(false),
        _ => None,
    }
}

fn eval_or(
    config: &Config,
    event: &Event,
    left: &Node,
    right: &Node,
    memoize: &mut Option<&mut Memoize>,
    report: &mut Option<&mut Report>,
) -> Option<bool> {
    let lhs = eval(config, event, left, memoize, report, false);
    if let Some(true) = lhs {
        return Some(true);
    }
    let rhs = eval(config, event, right, memoize, report, false);
    match (lhs, rhs) {
        (Some(a), Some(b)) => Some(a || b),
        (_, Some(true)) => Some(true),
        _ => None,
    }
}

fn eval_numeric_compare(op: CompareOp, observed: &Value, literal: &NumericLit) -> bool {
    match (observed, literal) {
        (Value::Int64(a), NumericLit::Int64(b)) => match op {
            CompareOp::LessThan => a < b,
            CompareOp::LessThanEqual => a <= b,
            CompareOp::GreaterThan => a > b,
            CompareOp::GreaterThanEqual => a >= b,
        },
        (Value::Float64(a), NumericLit::Float64(b)) => match op {
            CompareOp::LessThan => *a < *b,
            CompareOp::LessThanEqual => *a <= *b,
            CompareOp::GreaterThan => *a > *b,
            CompareOp::GreaterThanEqual => *a >= *b,
        },
        _ => panic!(
            "contract violation: NumericCompare observed {} against a {:?} literal",
            observed.type_name(),
            literal
        ),
    }
}

fn eval_equality(op: EqOp, observed: &Value, literal: &EqualityLit) -> bool {
    let equal = match (observed, literal) {
        (Value::Int64(a), EqualityLit::Int64(b)) => a == b,
        (Value::Float64(a), EqualityLit::Float64(b)) => feq(*a, *b),
        (Value::String(a), EqualityLit::Str(lit)) => a.value_eq(lit.interned()),
        _ => panic!(
            "contract violation: Equality observed {} against a {:?} literal",
            observed.type_name(),
            literal
        ),
    };
    match op {
        EqOp::Equal => equal,
        EqOp::NotEqual => match (observed, literal) {
            (Value::Float64(a), EqualityLit::Float64(b)) => fne(*a, *b),
            _ => !equal,
        },
    }
}

/// `Set` nodes have no variable to run through `get_variable`/Undefined
/// directly when the literal side is the scalar; whichever side is the
/// `Variable` is resolved through `get_variable` and the other is read as
/// a plain literal.
fn eval_set(config: &Config, event: &Event, op: SetOp, left: &SetScalar, right: &SetList) -> Option<bool> {
    let contains = match (left, right) {
        (SetScalar::Int(needle), SetList::Variable(attr)) => {
            match get_variable(config, event, attr.var()) {
                Resolved::Defined(haystack) => haystack.as_int_list().contains(needle),
                Resolved::Undefined => return None,
            }
        }
        (SetScalar::Str(needle), SetList::Variable(attr)) => {
            match get_variable(config, event, attr.var()) {
                Resolved::Defined(haystack) => {
                    haystack.as_string_list().iter().any(|v| v.value_eq(needle.interned()))
                }
                Resolved::Undefined => return None,
            }
        }
        (SetScalar::Variable(attr), SetList::IntList(haystack)) => {
            match get_variable(config, event, attr.var()) {
                Resolved::Defined(needle) => haystack.contains(&needle.as_int64()),
                Resolved::Undefined => return None,
            }
        }
        (SetScalar::Variable(attr), SetList::StrList(haystack)) => {
            match get_variable(config, event, attr.var()) {
                Resolved::Defined(needle) => {
                    let needle = needle.as_string();
                    haystack.iter().any(|v| needle.value_eq(v.interned()))
                }
                Resolved::Undefined => return None,
            }
        }
        _ => panic!("contract violation: Set node does not have exactly one variable side"),
    };
    Some(match op {
        SetOp::In => contains,
        SetOp::NotIn => !contains,
    })
}

fn eval_list(op: ListOp, observed: &Value, literal: &ListValue) -> bool {
    match literal {
        ListValue::IntList(literal) => {
            let observed = observed.as_int_list();
            match op {
                ListOp::OneOf => literal.iter().any(|v| observed.contains(v)),
                ListOp::NoneOf => !literal.iter().any(|v| observed.contains(v)),
                ListOp::AllOf => literal.iter().all(|v| observed.contains(v)),
            }
        }
        ListValue::StrList(literal) => {
            let observed = observed.as_string_list();
            let present = |lit: &crate::ast::StringLit| {
                observed.iter().any(|v| v.value_eq(lit.interned()))
            };
            match op {
                ListOp::OneOf => literal.iter().any(present),
                ListOp::NoneOf => !literal.iter().any(present),
                ListOp::AllOf => literal.iter().all(present),
            }
        }
    }
}

fn eval_special(config: &Config, event: &Event, special: &SpecialNode) -> Option<bool> {
    match special {
        SpecialNode::FrequencyCap { now_attr, caps_attr, frequency_type, namespace, requested_value, length_seconds } => {
            eval_frequency_cap(
                config,
                event,
                now_attr.var(),
                caps_attr.var(),
                *frequency_type,
                namespace,
                *requested_value,
                *length_seconds,
            )
        }
        SpecialNode::Segment { now_attr, segments_attr, op, segment_id, seconds } => {
            eval_segment(config, event, now_attr.var(), segments_attr.var(), *op, *segment_id, *seconds)
        }
        SpecialNode::Geo { lat_attr, lon_attr, lat, lon, radius_km } => {
            eval_geo(config, event, lat_attr.var(), lon_attr.var(), *lat, *lon, *radius_km)
        }
        SpecialNode::StringMatch { attr, op, pattern } => {
            match get_variable(config, event, attr.var()) {
                Resolved::Defined(observed) => Some(eval_string_match(*op, &observed.as_string().text, pattern)),
                Resolved::Undefined => None,
            }
        }
    }
}

/// `WITHIN_CAP` (spec.md §4.4.2). The `id` side of the match is derived
/// from `frequency_type` via [`FrequencyType::fixed_id`]; see
/// `DESIGN.md`'s Open Question note on that constant mapping.
fn eval_frequency_cap(
    config: &Config,
    event: &Event,
    now_var: VariableId,
    caps_var: VariableId,
    frequency_type: FrequencyType,
    namespace: &crate::ast::StringLit,
    requested_value: i64,
    length_seconds: i64,
) -> Option<bool> {
    let now = match get_variable(config, event, now_var) {
        Resolved::Defined(v) => v.as_int64(),
        Resolved::Undefined => return None,
    };
    let caps = match get_variable(config, event, caps_var) {
        Resolved::Defined(v) => v.as_frequency_cap_list(),
        Resolved::Undefined => return None,
    };
    let namespace_id = namespace.interned().id;
    let target_id = frequency_type.fixed_id();

    let matching = caps
        .iter()
        .find(|cap| cap.frequency_type == frequency_type && cap.id == target_id && cap.namespace == namespace_id);

    let Some(cap) = matching else {
        // "If no matching cap is found -> true" (spec.md §4.4.2).
        return Some(true);
    };

    if length_seconds <= 0 {
        return Some(requested_value > cap.value);
    }
    let Some(timestamp) = cap.timestamp else {
        return Some(true);
    };
    if (now - timestamp / 1_000_000) > length_seconds {
        return Some(true);
    }
    Some(requested_value > cap.value)
}

/// `WITHIN`/`BEFORE` (spec.md §4.4.2). The segments list is required to be
/// sorted ascending by id (the event builder is responsible for that
/// invariant, same as `IntList`/`StringList` ordering).
fn eval_segment(
    config: &Config,
    event: &Event,
    now_var: VariableId,
    segments_var: VariableId,
    op: SegmentOp,
    segment_id: i64,
    seconds: i64,
) -> Option<bool> {
    let now = match get_variable(config, event, now_var) {
        Resolved::Defined(v) => v.as_int64(),
        Resolved::Undefined => return None,
    };
    let segments = match get_variable(config, event, segments_var) {
        Resolved::Defined(v) => v.as_segment_list(),
        Resolved::Undefined => return None,
    };

    for segment in segments {
        if segment.id < segment_id {
            continue;
        }
        if segment.id == segment_id {
            let age = now - segment.timestamp / 1_000_000;
            return Some(match op {
                SegmentOp::Within => age <= seconds,
                SegmentOp::Before => age > seconds,
            });
        }
        // segment.id > segment_id: the sorted scan has passed it.
        return Some(false);
    }
    Some(false)
}

/// `WITHIN_RADIUS` via the haversine approximation (spec.md §4.4.2/§6).
fn eval_geo(
    config: &Config,
    event: &Event,
    lat_var: VariableId,
    lon_var: VariableId,
    target_lat: f64,
    target_lon: f64,
    radius_km: f64,
) -> Option<bool> {
    let lat = match get_variable(config, event, lat_var) {
        Resolved::Defined(v) => v.as_float64(),
        Resolved::Undefined => return None,
    };
    let lon = match get_variable(config, event, lon_var) {
        Resolved::Defined(v) => v.as_float64(),
        Resolved::Undefined => return None,
    };

    let d_lat = (target_lat - lat) * TO_RAD;
    let d_lon = (target_lon - lon) * TO_RAD;
    let a = (d_lat / 2.0).sin().powi(2)
        + (lat * TO_RAD).cos() * (target_lat * TO_RAD).cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    let distance = EARTH_RADIUS_KM * c;
    Some(distance <= radius_km)
}

fn eval_string_match(op: StringMatchOp, observed: &str, pattern: &str) -> bool {
    match op {
        StringMatchOp::Contains => observed.contains(pattern),
        StringMatchOp::StartsWith => observed.starts_with(pattern),
        StringMatchOp::EndsWith => observed.ends_with(pattern),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EqOp, ListValue, Node, NumericLit, SegmentOp, SetList, SetOp, SetScalar};
    use crate::compiler::compile;
    use crate::domain::{Bound, ValueType};
    use crate::event::EventBuilder;
    use crate::predicate_map::PredicateMap;
    use crate::value::{FrequencyCapEntry, FrequencyType, SegmentEntry};

    fn config_age_country() -> Config {
        let mut config = Config::new();
        config.add_attr_domain("age", ValueType::Int64, Bound::Int { min: 0, max: 120 }, false).unwrap();
        config
            .add_attr_domain(
                "country",
                ValueType::String,
                Bound::String { is_bounded: true, min_id: crate::interner::StringId(0), max_id: crate::interner::StringId(2), max_cardinality: 3 },
                false,
            )
            .unwrap();
        config
    }

    fn compile_tree(config: &mut Config, map: &mut PredicateMap, mut tree: Node) -> Node {
        compile(config, map, &mut tree);
        tree
    }

    /// S1: `age >= 18 and country in ("US","CA")`.
    #[test]
    fn s1_numeric_and_set_combination() {
        let mut config = config_age_country();
        let mut map = PredicateMap::new();
        let tree = compile_tree(
            &mut config,
            &mut map,
            Node::and(
                Node::numeric_compare(CompareOp::GreaterThanEqual, "age", NumericLit::Int64(18)),
                Node::set_attr_in_list(
                    SetOp::In,
                    "country",
                    SetList::StrList(vec![crate::ast::StringLit::raw("US"), crate::ast::StringLit::raw("CA")]),
                ),
            ),
        );

        let event = |age: i64, country: &str| {
            EventBuilder::new(&config).with_int64("age", age).unwrap().with_string("country", country).unwrap().build()
        };

        assert!(match_node(&config, &event(21, "US"), &tree, None, None));
        assert!(!match_node(&config, &event(17, "US"), &tree, None, None));
        assert!(!match_node(&config, &event(21, "MX"), &tree, None, None));
    }

    /// S2: short-circuit — `false_var or (age > 0)`. A right side that
    /// would panic if touched proves OR short-circuits on a true left.
    #[test]
    fn s2_or_short_circuits_on_true_left() {
        let mut config = Config::new();
        config.add_attr_domain("false_var", ValueType::Bool, Bound::Bool, false).unwrap();
        config.add_attr_domain("age", ValueType::Int64, Bound::unbounded_int(), false).unwrap();
        let mut map = PredicateMap::new();
        let tree = compile_tree(
            &mut config,
            &mut map,
            Node::or(
                Node::variable("false_var"),
                Node::numeric_compare(CompareOp::GreaterThan, "age", NumericLit::Int64(0)),
            ),
        );

        let event_true_left =
            EventBuilder::new(&config).with_bool("false_var", true).unwrap().with_int64("age", -1).unwrap().build();
        assert!(match_node(&config, &event_true_left, &tree, None, None));

        let event_false_left =
            EventBuilder::new(&config).with_bool("false_var", false).unwrap().with_int64("age", 5).unwrap().build();
        assert!(match_node(&config, &event_false_left, &tree, None, None));
    }

    /// S3: `tags all of (1,2,3)`.
    #[test]
    fn s3_list_all_of() {
        let mut config = Config::new();
        config.add_attr_domain("tags", ValueType::IntList, Bound::unbounded_int(), false).unwrap();
        let mut map = PredicateMap::new();
        let tree = compile_tree(
            &mut config,
            &mut map,
            Node::list(ListOp::AllOf, "tags", ListValue::IntList(vec![1, 2, 3])),
        );

        let matches = EventBuilder::new(&config).with_int_list("tags", vec![3, 1, 2, 4]).unwrap().build();
        assert!(match_node(&config, &matches, &tree, None, None));

        let misses = EventBuilder::new(&config).with_int_list("tags", vec![1, 2]).unwrap().build();
        assert!(!match_node(&config, &misses, &tree, None, None));
    }

    /// S4: geo within 10km of Montreal.
    #[test]
    fn s4_geo_within_radius() {
        let mut config = Config::new();
        config.add_attr_domain("latitude", ValueType::Float64, Bound::unbounded_float(), false).unwrap();
        config.add_attr_domain("longitude", ValueType::Float64, Bound::unbounded_float(), false).unwrap();
        let mut map = PredicateMap::new();
        let tree =
            compile_tree(&mut config, &mut map, Node::geo_within_radius(45.5017, -73.5673, 10.0));

        let close = EventBuilder::new(&config)
            .with_float64("latitude", 45.5088)
            .unwrap()
            .with_float64("longitude", -73.5878)
            .unwrap()
            .build();
        assert!(match_node(&config, &close, &tree, None, None));

        let far = EventBuilder::new(&config)
            .with_float64("latitude", 40.7128)
            .unwrap()
            .with_float64("longitude", -74.0060)
            .unwrap()
            .build();
        assert!(!match_node(&config, &far, &tree, None, None));
    }

    /// S5: frequency cap.
    #[test]
    fn s5_frequency_cap_within() {
        let mut config = Config::new();
        config.add_attr_domain("now", ValueType::Int64, Bound::unbounded_int(), false).unwrap();
        config
            .add_attr_domain("frequency_caps", ValueType::FrequencyCapList, Bound::unbounded_int(), false)
            .unwrap();
        let mut map = PredicateMap::new();
        let mut tree_exact = Node::frequency_cap(FrequencyType::Campaign, "home", 3, 0);
        compile(&mut config, &mut map, &mut tree_exact);
        let mut tree_over = Node::frequency_cap(FrequencyType::Campaign, "home", 4, 0);
        compile(&mut config, &mut map, &mut tree_over);

        let caps_var = config.domain_by_name("frequency_caps").unwrap().var_id;
        let home_ns = config.lookup_string(caps_var, "home");
        let event = EventBuilder::new(&config)
            .with_int64("now", 1_600_000_060)
            .unwrap()
            .with_frequency_cap_list(
                "frequency_caps",
                vec![FrequencyCapEntry {
                    frequency_type: FrequencyType::Campaign,
                    id: FrequencyType::Campaign.fixed_id(),
                    namespace: home_ns,
                    value: 3,
                    timestamp: Some(1_600_000_000_000_000),
                }],
            )
            .unwrap()
            .build();

        assert!(!match_node(&config, &event, &tree_exact, None, None), "3 > 3 is false");
        assert!(match_node(&config, &event, &tree_over, None, None), "4 > 3 is true");
    }

    /// S5 (no matching cap): absent cap always returns true.
    #[test]
    fn frequency_cap_with_no_match_returns_true() {
        let mut config = Config::new();
        config.add_attr_domain("now", ValueType::Int64, Bound::unbounded_int(), false).unwrap();
        config
            .add_attr_domain("frequency_caps", ValueType::FrequencyCapList, Bound::unbounded_int(), false)
            .unwrap();
        let mut map = PredicateMap::new();
        let mut tree = Node::frequency_cap(FrequencyType::Campaign, "home", 1, 0);
        compile(&mut config, &mut map, &mut tree);

        let event = EventBuilder::new(&config)
            .with_int64("now", 0)
            .unwrap()
            .with_frequency_cap_list("frequency_caps", vec![])
            .unwrap()
            .build();

        assert!(match_node(&config, &event, &tree, None, None));
    }

    #[test]
    fn segment_within_and_before() {
        let mut config = Config::new();
        config.add_attr_domain("now", ValueType::Int64, Bound::unbounded_int(), false).unwrap();
        config
            .add_attr_domain("segments", ValueType::SegmentList, Bound::unbounded_int(), false)
            .unwrap();
        let mut map = PredicateMap::new();
        let mut within = Node::segment(SegmentOp::Within, 5, 3600);
        compile(&mut config, &mut map, &mut within);
        let mut before = Node::segment(SegmentOp::Before, 5, 3600);
        compile(&mut config, &mut map, &mut before);

        let event = EventBuilder::new(&config)
            .with_int64("now", 1_000_000)
            .unwrap()
            .with_segment_list(
                "segments",
                vec![SegmentEntry { id: 5, timestamp: (1_000_000 - 1_000) * 1_000_000 }],
            )
            .unwrap()
            .build();

        assert!(match_node(&config, &event, &within, None, None));
        assert!(!match_node(&config, &event, &before, None, None));
    }

    #[test]
    fn string_match_operators() {
        let mut config = Config::new();
        config.add_attr_domain("url", ValueType::String, Bound::unbounded_string(), false).unwrap();
        let mut map = PredicateMap::new();
        let mut contains = Node::string_match(StringMatchOp::Contains, "url", "example");
        compile(&mut config, &mut map, &mut contains);
        let mut starts = Node::string_match(StringMatchOp::StartsWith, "url", "https");
        compile(&mut config, &mut map, &mut starts);
        let mut ends = Node::string_match(StringMatchOp::EndsWith, "url", ".com");
        compile(&mut config, &mut map, &mut ends);

        let event =
            EventBuilder::new(&config).with_string("url", "https://example.com").unwrap().build();

        assert!(match_node(&config, &event, &contains, None, None));
        assert!(match_node(&config, &event, &starts, None, None));
        assert!(match_node(&config, &event, &ends, None, None));
    }

    /// Undefined propagation: `NOT (country == "US")` with `country`
    /// absent must be false, not true (spec.md §8 scenario + §9 note).
    #[test]
    fn undefined_under_not_does_not_flip_to_true() {
        let mut config = Config::new();
        config
            .add_attr_domain("country", ValueType::String, Bound::unbounded_string(), true)
            .unwrap();
        let mut map = PredicateMap::new();
        let tree = compile_tree(
            &mut config,
            &mut map,
            Node::not(Node::equality(EqOp::Equal, "country", EqualityLit::Str(crate::ast::StringLit::raw("US")))),
        );

        let event = EventBuilder::new(&config).build();
        assert!(!match_node(&config, &event, &tree, None, None));
    }

    #[test]
    #[should_panic(expected = "is missing from the event")]
    fn missing_non_undefined_attribute_is_a_contract_violation() {
        let mut config = Config::new();
        config.add_attr_domain("age", ValueType::Int64, Bound::unbounded_int(), false).unwrap();
        let mut map = PredicateMap::new();
        let tree = compile_tree(&mut config, &mut map, Node::numeric_compare(CompareOp::GreaterThan, "age", NumericLit::Int64(0)));

        let event = EventBuilder::new(&config).build();
        match_node(&config, &event, &tree, None, None);
    }

    #[test]
    fn memoization_does_not_change_the_result() {
        let mut config = config_age_country();
        let mut map = PredicateMap::new();
        let tree = compile_tree(
            &mut config,
            &mut map,
            Node::numeric_compare(CompareOp::GreaterThanEqual, "age", NumericLit::Int64(18)),
        );
        let event = EventBuilder::new(&config).with_int64("age", 21).unwrap().with_string("country", "US").unwrap().build();

        let without_memo = match_node(&config, &event, &tree, None, None);

        let mut memo = Memoize::new(map.len());
        let mut report = Report::new();
        let with_memo = match_node(&config, &event, &tree, Some(&mut memo), Some(&mut report));
        let with_memo_again = match_node(&config, &event, &tree, Some(&mut memo), Some(&mut report));

        assert_eq!(without_memo, with_memo);
        assert_eq!(with_memo, with_memo_again);
        assert_eq!(1, report.expressions_memoized);
    }
}
