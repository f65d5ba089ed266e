//! The bound analyzer: `get_variable_bound` (spec.md §4.5).
//!
//! No teacher analog — `a-tree` has no static analysis pass over its
//! trees, only the runtime matcher — so this module is built directly
//! from spec.md's algorithm description, using the same tagged-tree
//! recursion style `matcher.rs` uses for consistency with the rest of the
//! crate.

use crate::ast::{CompareOp, EqOp, EqualityLit, Node, NodeKind, NumericLit};
use crate::domain::{AttributeDomain, Bound as DomainBound, ValueType};
use crate::interner::VariableId;

/// The value interval an expression can constrain a single variable to.
/// Mirrors [`DomainBound`]'s shape but represents the *tightened* result
/// rather than a declared domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interval {
    Bool { min: bool, max: bool },
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

/// The bound a single subtree folds to; `touched` tracks whether any node
/// in that subtree actually referenced `domain.var_id` (the "was_touched"
/// flag of spec.md §4.5 step 5). `recurse` returns one of these per node
/// rather than threading a single mutable accumulator through the whole
/// tree, since AND and OR combine their two children's bounds differently
/// (intersection vs. union — see [`intersect`]/[`union`]).
struct Accumulator {
    lower: Bound1D,
    upper: Bound1D,
    touched: bool,
}

/// One side (lower or upper) of the interval being folded, generic over
/// the three supported scalar kinds so `fold_numeric`/`fold_bool` can
/// share the same tightening logic.
#[derive(Clone, Copy)]
enum Bound1D {
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// `get_variable_bound(domain, root)` (spec.md §4.5): computes the
/// tightest interval over `domain.var_id` that `root` constrains,
/// returning the full domain bound if `root` never mentions the variable.
///
/// # Panics
/// If `domain.value_type` is not `Bool`/`Int64`/`Float64`/`String` (a
/// fatal contract violation per spec.md §4.5's precondition — `String`
/// bound analysis is not offered, matching spec.md's "other types abort").
pub fn get_variable_bound(domain: &AttributeDomain, root: &Node) -> Interval {
    match domain.value_type {
        ValueType::Bool | ValueType::Int64 | ValueType::Float64 => {}
        other => panic!(
            "contract violation: get_variable_bound requested on unsupported domain type {other:?}"
        ),
    }

    let acc = recurse(domain, domain.var_id, root, false);

    if !acc.touched {
        return full_domain_interval(domain);
    }

    to_interval(domain, acc.lower, acc.upper)
}

fn full_domain_edges(domain: &AttributeDomain) -> (Bound1D, Bound1D) {
    match domain.bound {
        DomainBound::Bool => (Bound1D::Bool(false), Bound1D::Bool(true)),
        DomainBound::Int { min, max } => (Bound1D::Int(min), Bound1D::Int(max)),
        DomainBound::Float { min, max } => (Bound1D::Float(min), Bound1D::Float(max)),
        DomainBound::String { .. } => unreachable!("String domains are rejected before this point"),
    }
}

/// A fresh, untouched accumulator seeded at the domain's own edges — the
/// neutral starting point for a subtree that turns out not to mention
/// `domain.var_id` at all.
fn full_accumulator(domain: &AttributeDomain) -> Accumulator {
    let (lower, upper) = full_domain_edges(domain);
    Accumulator { lower, upper, touched: false }
}

fn full_domain_interval(domain: &AttributeDomain) -> Interval {
    match domain.bound {
        DomainBound::Bool => Interval::Bool { min: false, max: true },
        DomainBound::Int { min, max } => Interval::Int { min, max },
        DomainBound::Float { min, max } => Interval::Float { min, max },
        DomainBound::String { .. } => unreachable!("String domains are rejected before this point"),
    }
}

fn to_interval(domain: &AttributeDomain, lower: Bound1D, upper: Bound1D) -> Interval {
    match (domain.value_type, lower, upper) {
        (ValueType::Bool, Bound1D::Bool(min), Bound1D::Bool(max)) => Interval::Bool { min, max },
        (ValueType::Int64, Bound1D::Int(min), Bound1D::Int(max)) => Interval::Int { min, max },
        (ValueType::Float64, Bound1D::Float(min), Bound1D::Float(max)) => Interval::Float { min, max },
        _ => unreachable!("bound kind mismatched the domain's declared value type"),
    }
}

/// Walks `node`, returning the bound that subtree alone folds `target` to.
/// `is_reversed` toggles on every `NOT` (spec.md §4.5 step 2). `AND`
/// intersects its two children's bounds (a value must satisfy both sides);
/// `OR` takes their hull/union (a value need only satisfy one side, so the
/// combined bound must be at least as wide as either) — folding both into
/// one shared accumulator, as AND does, would treat `OR` as if it were
/// `AND` and can produce an unsound, inverted interval (e.g. `x < 10 OR x
/// > 90` must not shrink to empty).
fn recurse(domain: &AttributeDomain, target: VariableId, node: &Node, is_reversed: bool) -> Accumulator {
    match &node.kind {
        NodeKind::And(left, right) => {
            let left = recurse(domain, target, left, is_reversed);
            let right = recurse(domain, target, right, is_reversed);
            intersect(left, right)
        }
        NodeKind::Or(left, right) => {
            let left = recurse(domain, target, left, is_reversed);
            let right = recurse(domain, target, right, is_reversed);
            union(left, right)
        }
        NodeKind::Not(child) => recurse(domain, target, child, !is_reversed),
        NodeKind::Variable(attr) => {
            let mut acc = full_accumulator(domain);
            if attr.resolved() == Some(target) {
                acc.touched = true;
                let value = !is_reversed;
                fold_bool(&mut acc, value, value);
            }
            acc
        }
        NodeKind::NumericCompare { op, attr, value } => {
            let mut acc = full_accumulator(domain);
            if attr.resolved() == Some(target) {
                acc.touched = true;
                fold_numeric_compare(&mut acc, effective_op(*op, is_reversed), value);
            }
            acc
        }
        NodeKind::Equality { op, attr, value } => {
            let mut acc = full_accumulator(domain);
            if attr.resolved() == Some(target) {
                acc.touched = true;
                fold_equality(&mut acc, effective_eq_op(*op, is_reversed), value);
            }
            acc
        }
        // Set/List/Special predicates and Bool VARIABLE against a
        // non-matching attribute contribute nothing (spec.md §4.5 step 4):
        // an untouched, full-domain accumulator is the neutral element for
        // both `intersect` (leaves the other side unchanged) and `union`
        // (widens to the full domain, since this branch is compatible with
        // any value of `target`).
        NodeKind::Set { .. } | NodeKind::List { .. } | NodeKind::Special(_) => full_accumulator(domain),
    }
}

/// `AND`: a value must lie in both children's bounds, so the combined
/// bound is their intersection.
fn intersect(a: Accumulator, b: Accumulator) -> Accumulator {
    Accumulator { lower: lower_max(a.lower, b.lower), upper: upper_min(a.upper, b.upper), touched: a.touched || b.touched }
}

/// `OR`: a value need only lie in one child's bound, so the combined bound
/// is their hull — the tightest single interval that still contains both.
fn union(a: Accumulator, b: Accumulator) -> Accumulator {
    Accumulator { lower: lower_min(a.lower, b.lower), upper: upper_max(a.upper, b.upper), touched: a.touched || b.touched }
}

fn lower_max(a: Bound1D, b: Bound1D) -> Bound1D {
    match (a, b) {
        (Bound1D::Int(a), Bound1D::Int(b)) => Bound1D::Int(a.max(b)),
        (Bound1D::Float(a), Bound1D::Float(b)) => Bound1D::Float(a.max(b)),
        (Bound1D::Bool(a), Bound1D::Bool(b)) => Bound1D::Bool(a.max(b)),
        _ => unreachable!("mismatched bound kinds"),
    }
}

fn upper_min(a: Bound1D, b: Bound1D) -> Bound1D {
    match (a, b) {
        (Bound1D::Int(a), Bound1D::Int(b)) => Bound1D::Int(a.min(b)),
        (Bound1D::Float(a), Bound1D::Float(b)) => Bound1D::Float(a.min(b)),
        (Bound1D::Bool(a), Bound1D::Bool(b)) => Bound1D::Bool(a.min(b)),
        _ => unreachable!("mismatched bound kinds"),
    }
}

fn lower_min(a: Bound1D, b: Bound1D) -> Bound1D {
    match (a, b) {
        (Bound1D::Int(a), Bound1D::Int(b)) => Bound1D::Int(a.min(b)),
        (Bound1D::Float(a), Bound1D::Float(b)) => Bound1D::Float(a.min(b)),
        (Bound1D::Bool(a), Bound1D::Bool(b)) => Bound1D::Bool(a.min(b)),
        _ => unreachable!("mismatched bound kinds"),
    }
}

fn upper_max(a: Bound1D, b: Bound1D) -> Bound1D {
    match (a, b) {
        (Bound1D::Int(a), Bound1D::Int(b)) => Bound1D::Int(a.max(b)),
        (Bound1D::Float(a), Bound1D::Float(b)) => Bound1D::Float(a.max(b)),
        (Bound1D::Bool(a), Bound1D::Bool(b)) => Bound1D::Bool(a.max(b)),
        _ => unreachable!("mismatched bound kinds"),
    }
}

/// Reversal flips a comparison to its logical negation: `NOT (x < k)` is
/// `x >= k`.
fn effective_op(op: CompareOp, is_reversed: bool) -> CompareOp {
    if is_reversed {
        op.negate()
    } else {
        op
    }
}

fn effective_eq_op(op: EqOp, is_reversed: bool) -> EqOp {
    if is_reversed {
        op.negate()
    } else {
        op
    }
}

fn fold_bool(acc: &mut Accumulator, lower: bool, upper: bool) {
    if let (Bound1D::Bool(existing_lower), Bound1D::Bool(existing_upper)) = (acc.lower, acc.upper) {
        acc.lower = Bound1D::Bool(existing_lower || lower);
        acc.upper = Bound1D::Bool(existing_upper && upper);
    }
}

fn fold_numeric_compare(acc: &mut Accumulator, op: CompareOp, value: &NumericLit) {
    match (op, value) {
        // `x < k`: upper side is tightened to `k - 1` (Int) / `k - eps`
        // (Float); lower side is unconstrained by this node (copies the
        // domain's own lower edge, already the accumulator's seed value).
        (CompareOp::LessThan, NumericLit::Int64(k)) => tighten_upper_int(acc, k.saturating_sub(1)),
        (CompareOp::LessThan, NumericLit::Float64(k)) => tighten_upper_float(acc, k - f64::EPSILON),
        (CompareOp::LessThanEqual, NumericLit::Int64(k)) => tighten_upper_int(acc, *k),
        (CompareOp::LessThanEqual, NumericLit::Float64(k)) => tighten_upper_float(acc, *k),
        (CompareOp::GreaterThan, NumericLit::Int64(k)) => tighten_lower_int(acc, k.saturating_add(1)),
        (CompareOp::GreaterThan, NumericLit::Float64(k)) => tighten_lower_float(acc, k + f64::EPSILON),
        (CompareOp::GreaterThanEqual, NumericLit::Int64(k)) => tighten_lower_int(acc, *k),
        (CompareOp::GreaterThanEqual, NumericLit::Float64(k)) => tighten_lower_float(acc, *k),
    }
}

/// EQ tightens both sides to the literal; NE under non-reversal expands
/// to the full domain (any value but `k` is unconstrainable to a single
/// interval), under reversal it behaves like EQ on `k` (spec.md §4.5
/// step 3, "EQ tightens both sides ... NE under non-reversal expands").
fn fold_equality(acc: &mut Accumulator, op: EqOp, value: &EqualityLit) {
    match (op, value) {
        (EqOp::Equal, EqualityLit::Int64(k)) => {
            tighten_lower_int(acc, *k);
            tighten_upper_int(acc, *k);
        }
        (EqOp::Equal, EqualityLit::Float64(k)) => {
            tighten_lower_float(acc, *k);
            tighten_upper_float(acc, *k);
        }
        // NE under non-reversal: any value but k: does not shrink the
        // interval at all (every value in the domain remains reachable).
        (EqOp::NotEqual, EqualityLit::Int64(_)) | (EqOp::NotEqual, EqualityLit::Float64(_)) => {}
        (_, EqualityLit::Str(_)) => {
            // String equality never targets a Bool/Int/Float domain; a
            // well-formed tree cannot reach this arm for `target`.
        }
    }
}

fn tighten_lower_int(acc: &mut Accumulator, candidate: i64) {
    if let Bound1D::Int(existing) = acc.lower {
        acc.lower = Bound1D::Int(existing.max(candidate));
    }
}

fn tighten_upper_int(acc: &mut Accumulator, candidate: i64) {
    if let Bound1D::Int(existing) = acc.upper {
        acc.upper = Bound1D::Int(existing.min(candidate));
    }
}

fn tighten_lower_float(acc: &mut Accumulator, candidate: f64) {
    if let Bound1D::Float(existing) = acc.lower {
        acc.lower = Bound1D::Float(existing.max(candidate));
    }
}

fn tighten_upper_float(acc: &mut Accumulator, candidate: f64) {
    if let Bound1D::Float(existing) = acc.upper {
        acc.upper = Bound1D::Float(existing.min(candidate));
    }
}
