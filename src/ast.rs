//! The expression tree: a tagged union generalizing the teacher's
//! `Node`/`Predicate` split (`RustVersion/src/ast.rs`, `predicates.rs`) into
//! the full node-tag table spec.md §3 describes.
//!
//! Nodes are built through constructors with textual attribute references
//! and raw string literals; the compiler passes in `compiler.rs` mutate
//! them in place into their compiled form (`AttrRef::Var`, interned
//! `StringLit::Interned`, assigned `id`). `free_ast_node` from the source
//! lineage has no Rust callable: `Box`-owned subtrees are freed by drop
//! glue when a `Node` goes out of scope.

use crate::interner::{Config, VariableId};
use crate::value::{feq, FrequencyType, StringValue};

/// Sentinel predicate id meaning "not yet assigned by `assign_pred_id`".
pub const UNASSIGNED: PredId = u32::MAX;
pub type PredId = u32;

/// An attribute reference: textual until `assign_variable_id` resolves it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrRef {
    Name(String),
    Var(VariableId),
}

impl AttrRef {
    pub fn name(name: impl Into<String>) -> Self {
        AttrRef::Name(name.into())
    }

    pub fn var(&self) -> VariableId {
        match self {
            AttrRef::Var(v) => *v,
            AttrRef::Name(name) => {
                panic!("attribute {name:?} has not been compiled (assign_variable_id did not run)")
            }
        }
    }

    pub fn resolved(&self) -> Option<VariableId> {
        match self {
            AttrRef::Var(v) => Some(*v),
            AttrRef::Name(_) => None,
        }
    }
}

/// A string literal: raw until `assign_str_id` interns it under its owning
/// attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum StringLit {
    Raw(String),
    Interned(StringValue),
}

impl StringLit {
    pub fn raw(text: impl Into<String>) -> Self {
        StringLit::Raw(text.into())
    }

    pub fn interned(&self) -> &StringValue {
        match self {
            StringLit::Interned(v) => v,
            StringLit::Raw(text) => {
                panic!("string literal {text:?} has not been compiled (assign_str_id did not run)")
            }
        }
    }

    pub fn text(&self) -> &str {
        match self {
            StringLit::Raw(text) => text,
            StringLit::Interned(v) => &v.text,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl CompareOp {
    pub fn negate(self) -> Self {
        match self {
            CompareOp::LessThan => CompareOp::GreaterThanEqual,
            CompareOp::LessThanEqual => CompareOp::GreaterThan,
            CompareOp::GreaterThan => CompareOp::LessThanEqual,
            CompareOp::GreaterThanEqual => CompareOp::LessThan,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EqOp {
    Equal,
    NotEqual,
}

impl EqOp {
    pub fn negate(self) -> Self {
        match self {
            EqOp::Equal => EqOp::NotEqual,
            EqOp::NotEqual => EqOp::Equal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SetOp {
    In,
    NotIn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListOp {
    OneOf,
    NoneOf,
    AllOf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegmentOp {
    Within,
    Before,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StringMatchOp {
    Contains,
    StartsWith,
    EndsWith,
}

/// The non-variable operand of a `NumericCompare` node (Int64/Float64).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumericLit {
    Int64(i64),
    Float64(f64),
}

/// The non-variable operand of an `Equality` node (Int64/Float64/String).
#[derive(Clone, Debug, PartialEq)]
pub enum EqualityLit {
    Int64(i64),
    Float64(f64),
    Str(StringLit),
}

/// One side of a `Set` node: scalar or variable.
#[derive(Clone, Debug, PartialEq)]
pub enum SetScalar {
    Int(i64),
    Str(StringLit),
    Variable(AttrRef),
}

/// The other side of a `Set` node: list or variable.
#[derive(Clone, Debug, PartialEq)]
pub enum SetList {
    IntList(Vec<i64>),
    StrList(Vec<StringLit>),
    Variable(AttrRef),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ListValue {
    IntList(Vec<i64>),
    StrList(Vec<StringLit>),
}

/// `FrequencyCap`/`Segment`/`Geo`/`String` leaf predicates — net-new, no
/// teacher analog, grounded directly in spec.md §4.4.2/§6.
#[derive(Clone, Debug, PartialEq)]
pub enum SpecialNode {
    FrequencyCap {
        now_attr: AttrRef,
        caps_attr: AttrRef,
        frequency_type: FrequencyType,
        namespace: StringLit,
        requested_value: i64,
        length_seconds: i64,
    },
    Segment {
        now_attr: AttrRef,
        segments_attr: AttrRef,
        op: SegmentOp,
        segment_id: i64,
        seconds: i64,
    },
    Geo {
        lat_attr: AttrRef,
        lon_attr: AttrRef,
        lat: f64,
        lon: f64,
        radius_km: f64,
    },
    StringMatch {
        attr: AttrRef,
        op: StringMatchOp,
        pattern: String,
    },
}

impl SpecialNode {
    pub const NOW_ATTR: &'static str = "now";
    pub const FREQUENCY_CAPS_ATTR: &'static str = "frequency_caps";
    pub const SEGMENTS_ATTR: &'static str = "segments";
    pub const LATITUDE_ATTR: &'static str = "latitude";
    pub const LONGITUDE_ATTR: &'static str = "longitude";
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    NumericCompare { op: CompareOp, attr: AttrRef, value: NumericLit },
    Equality { op: EqOp, attr: AttrRef, value: EqualityLit },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
    Variable(AttrRef),
    Set { op: SetOp, left: SetScalar, right: SetList },
    List { op: ListOp, attr: AttrRef, value: ListValue },
    Special(SpecialNode),
}

/// A node in the expression tree: a tag (`kind`) plus the dense predicate
/// id `assign_pred_id` assigns it (`UNASSIGNED` until then).
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: PredId,
    pub kind: NodeKind,
}

impl Node {
    fn leaf(kind: NodeKind) -> Self {
        Node { id: UNASSIGNED, kind }
    }

    pub fn numeric_compare(op: CompareOp, attr: impl Into<String>, value: NumericLit) -> Self {
        Self::leaf(NodeKind::NumericCompare { op, attr: AttrRef::name(attr), value })
    }

    pub fn equality(op: EqOp, attr: impl Into<String>, value: EqualityLit) -> Self {
        Self::leaf(NodeKind::Equality { op, attr: AttrRef::name(attr), value })
    }

    pub fn and(left: Node, right: Node) -> Self {
        Self::leaf(NodeKind::And(Box::new(left), Box::new(right)))
    }

    pub fn or(left: Node, right: Node) -> Self {
        Self::leaf(NodeKind::Or(Box::new(left), Box::new(right)))
    }

    pub fn not(child: Node) -> Self {
        Self::leaf(NodeKind::Not(Box::new(child)))
    }

    pub fn variable(attr: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Variable(AttrRef::name(attr)))
    }

    /// `attr IN list` / `attr NOT IN list` (`left` is the attribute).
    pub fn set_attr_in_list(op: SetOp, attr: impl Into<String>, right: SetList) -> Self {
        Self::leaf(NodeKind::Set { op, left: SetScalar::Variable(AttrRef::name(attr)), right })
    }

    /// `value IN attr` / `value NOT IN attr` (`right` is the list-typed
    /// attribute).
    pub fn set_value_in_attr(op: SetOp, left: SetScalar, attr: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Set { op, left, right: SetList::Variable(AttrRef::name(attr)) })
    }

    pub fn list(op: ListOp, attr: impl Into<String>, value: ListValue) -> Self {
        Self::leaf(NodeKind::List { op, attr: AttrRef::name(attr), value })
    }

    pub fn frequency_cap(
        frequency_type: FrequencyType,
        namespace: impl Into<String>,
        requested_value: i64,
        length_seconds: i64,
    ) -> Self {
        Self::leaf(NodeKind::Special(SpecialNode::FrequencyCap {
            now_attr: AttrRef::name(SpecialNode::NOW_ATTR),
            caps_attr: AttrRef::name(SpecialNode::FREQUENCY_CAPS_ATTR),
            frequency_type,
            namespace: StringLit::raw(namespace),
            requested_value,
            length_seconds,
        }))
    }

    pub fn segment(op: SegmentOp, segment_id: i64, seconds: i64) -> Self {
        Self::leaf(NodeKind::Special(SpecialNode::Segment {
            now_attr: AttrRef::name(SpecialNode::NOW_ATTR),
            segments_attr: AttrRef::name(SpecialNode::SEGMENTS_ATTR),
            op,
            segment_id,
            seconds,
        }))
    }

    pub fn geo_within_radius(lat: f64, lon: f64, radius_km: f64) -> Self {
        Self::leaf(NodeKind::Special(SpecialNode::Geo {
            lat_attr: AttrRef::name(SpecialNode::LATITUDE_ATTR),
            lon_attr: AttrRef::name(SpecialNode::LONGITUDE_ATTR),
            lat,
            lon,
            radius_km,
        }))
    }

    pub fn string_match(op: StringMatchOp, attr: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Special(SpecialNode::StringMatch {
            attr: AttrRef::name(attr),
            op,
            pattern: pattern.into(),
        }))
    }

    /// Validates the "exactly one side is a variable" invariant for `Set`
    /// nodes; called by the compiler before `assign_pred_id` so a malformed
    /// tree panics with a diagnostic rather than evaluating nonsensically.
    pub fn check_set_invariant(&self) {
        if let NodeKind::Set { left, right, .. } = &self.kind {
            let left_is_var = matches!(left, SetScalar::Variable(_));
            let right_is_var = matches!(right, SetList::Variable(_));
            assert!(
                left_is_var != right_is_var,
                "Set node must have exactly one variable side, found left_is_var={left_is_var} right_is_var={right_is_var}"
            );
        }
    }
}

/// Deep-clones a node, matching spec.md §4.6's `clone_node` as a named
/// operation distinct from the derived `Clone` (kept since the compiler
/// passes and predicate map both need an owned duplicate under a fresh
/// `Box` tree).
pub fn clone_node(node: &Node) -> Node {
    node.clone()
}

/// Structural equality per spec.md §4.2: same tag, same payload; floats
/// via [`feq`], strings by `(var_id, str_id)`, lists by length then
/// elementwise order, `Special` predicates by every payload field. Not
/// `PartialEq` because `eq_expr` deliberately special-cases float epsilon
/// away from the bitwise comparison the derived `PartialEq` gives `Node`.
pub fn eq_expr(a: &Node, b: &Node) -> bool {
    match (&a.kind, &b.kind) {
        (
            NodeKind::NumericCompare { op: op_a, attr: attr_a, value: value_a },
            NodeKind::NumericCompare { op: op_b, attr: attr_b, value: value_b },
        ) => op_a == op_b && attr_eq(attr_a, attr_b) && numeric_lit_eq(value_a, value_b),
        (
            NodeKind::Equality { op: op_a, attr: attr_a, value: value_a },
            NodeKind::Equality { op: op_b, attr: attr_b, value: value_b },
        ) => op_a == op_b && attr_eq(attr_a, attr_b) && equality_lit_eq(value_a, value_b),
        (NodeKind::And(la, ra), NodeKind::And(lb, rb)) => eq_expr(la, lb) && eq_expr(ra, rb),
        (NodeKind::Or(la, ra), NodeKind::Or(lb, rb)) => eq_expr(la, lb) && eq_expr(ra, rb),
        (NodeKind::Not(a), NodeKind::Not(b)) => eq_expr(a, b),
        (NodeKind::Variable(a), NodeKind::Variable(b)) => attr_eq(a, b),
        (
            NodeKind::Set { op: op_a, left: left_a, right: right_a },
            NodeKind::Set { op: op_b, left: left_b, right: right_b },
        ) => op_a == op_b && set_scalar_eq(left_a, left_b) && set_list_eq(right_a, right_b),
        (
            NodeKind::List { op: op_a, attr: attr_a, value: value_a },
            NodeKind::List { op: op_b, attr: attr_b, value: value_b },
        ) => op_a == op_b && attr_eq(attr_a, attr_b) && list_value_eq(value_a, value_b),
        (NodeKind::Special(a), NodeKind::Special(b)) => special_eq(a, b),
        _ => false,
    }
}

fn attr_eq(a: &AttrRef, b: &AttrRef) -> bool {
    match (a, b) {
        (AttrRef::Var(a), AttrRef::Var(b)) => a == b,
        (AttrRef::Name(a), AttrRef::Name(b)) => a == b,
        _ => false,
    }
}

fn string_lit_eq(a: &StringLit, b: &StringLit) -> bool {
    match (a, b) {
        (StringLit::Interned(a), StringLit::Interned(b)) => a.variable == b.variable && a.id == b.id,
        (StringLit::Raw(a), StringLit::Raw(b)) => a == b,
        _ => false,
    }
}

fn numeric_lit_eq(a: &NumericLit, b: &NumericLit) -> bool {
    match (a, b) {
        (NumericLit::Int64(a), NumericLit::Int64(b)) => a == b,
        (NumericLit::Float64(a), NumericLit::Float64(b)) => feq(*a, *b),
        _ => false,
    }
}

fn equality_lit_eq(a: &EqualityLit, b: &EqualityLit) -> bool {
    match (a, b) {
        (EqualityLit::Int64(a), EqualityLit::Int64(b)) => a == b,
        (EqualityLit::Float64(a), EqualityLit::Float64(b)) => feq(*a, *b),
        (EqualityLit::Str(a), EqualityLit::Str(b)) => string_lit_eq(a, b),
        _ => false,
    }
}

fn set_scalar_eq(a: &SetScalar, b: &SetScalar) -> bool {
    match (a, b) {
        (SetScalar::Int(a), SetScalar::Int(b)) => a == b,
        (SetScalar::Str(a), SetScalar::Str(b)) => string_lit_eq(a, b),
        (SetScalar::Variable(a), SetScalar::Variable(b)) => attr_eq(a, b),
        _ => false,
    }
}

fn set_list_eq(a: &SetList, b: &SetList) -> bool {
    match (a, b) {
        (SetList::IntList(a), SetList::IntList(b)) => a == b,
        (SetList::StrList(a), SetList::StrList(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| string_lit_eq(a, b))
        }
        (SetList::Variable(a), SetList::Variable(b)) => attr_eq(a, b),
        _ => false,
    }
}

fn list_value_eq(a: &ListValue, b: &ListValue) -> bool {
    match (a, b) {
        (ListValue::IntList(a), ListValue::IntList(b)) => a == b,
        (ListValue::StrList(a), ListValue::StrList(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| string_lit_eq(a, b))
        }
        _ => false,
    }
}

fn special_eq(a: &SpecialNode, b: &SpecialNode) -> bool {
    match (a, b) {
        (
            SpecialNode::FrequencyCap {
                now_attr: na,
                caps_attr: ca,
                frequency_type: fa,
                namespace: nsa,
                requested_value: va,
                length_seconds: la,
            },
            SpecialNode::FrequencyCap {
                now_attr: nb,
                caps_attr: cb,
                frequency_type: fb,
                namespace: nsb,
                requested_value: vb,
                length_seconds: lb,
            },
        ) => {
            attr_eq(na, nb)
                && attr_eq(ca, cb)
                && fa == fb
                && string_lit_eq(nsa, nsb)
                && va == vb
                && la == lb
        }
        (
            SpecialNode::Segment { now_attr: na, segments_attr: sa, op: oa, segment_id: ia, seconds: seca },
            SpecialNode::Segment { now_attr: nb, segments_attr: sb, op: ob, segment_id: ib, seconds: secb },
        ) => attr_eq(na, nb) && attr_eq(sa, sb) && oa == ob && ia == ib && seca == secb,
        (
            SpecialNode::Geo { lat_attr: lata, lon_attr: lona, lat: latva, lon: lonva, radius_km: ra },
            SpecialNode::Geo { lat_attr: latb, lon_attr: lonb, lat: latvb, lon: lonvb, radius_km: rb },
        ) => {
            attr_eq(lata, latb)
                && attr_eq(lona, lonb)
                && feq(*latva, *latvb)
                && feq(*lonva, *lonvb)
                && feq(*ra, *rb)
        }
        (
            SpecialNode::StringMatch { attr: aa, op: oa, pattern: pa },
            SpecialNode::StringMatch { attr: ab, op: ob, pattern: pb },
        ) => attr_eq(aa, ab) && oa == ob && pa == pb,
        _ => false,
    }
}

/// Every attribute name still textual (`AttrRef::Name`) in the subtree,
/// used by `all_variables_in_config` before resolution.
pub fn referenced_attr_names<'a>(node: &'a Node, out: &mut Vec<&'a str>) {
    match &node.kind {
        NodeKind::NumericCompare { attr, .. }
        | NodeKind::Equality { attr, .. }
        | NodeKind::Variable(attr)
        | NodeKind::List { attr, .. } => push_name(attr, out),
        NodeKind::And(l, r) | NodeKind::Or(l, r) => {
            referenced_attr_names(l, out);
            referenced_attr_names(r, out);
        }
        NodeKind::Not(child) => referenced_attr_names(child, out),
        NodeKind::Set { left, right, .. } => {
            if let SetScalar::Variable(attr) = left {
                push_name(attr, out);
            }
            if let SetList::Variable(attr) = right {
                push_name(attr, out);
            }
        }
        NodeKind::Special(special) => match special {
            SpecialNode::FrequencyCap { now_attr, caps_attr, .. } => {
                push_name(now_attr, out);
                push_name(caps_attr, out);
            }
            SpecialNode::Segment { now_attr, segments_attr, .. } => {
                push_name(now_attr, out);
                push_name(segments_attr, out);
            }
            SpecialNode::Geo { lat_attr, lon_attr, .. } => {
                push_name(lat_attr, out);
                push_name(lon_attr, out);
            }
            SpecialNode::StringMatch { attr, .. } => push_name(attr, out),
        },
    }
}

fn push_name<'a>(attr: &'a AttrRef, out: &mut Vec<&'a str>) {
    if let AttrRef::Name(name) = attr {
        out.push(name);
    }
}

/// Every raw string literal still un-interned in the subtree, used by
/// `all_bounded_strings_valid` before interning.
pub fn referenced_raw_strings<'a>(node: &'a Node, out: &mut Vec<(&'a str, &'a str)>) {
    let push = |attr_name: &'a str, lit: &'a StringLit, out: &mut Vec<(&'a str, &'a str)>| {
        if let StringLit::Raw(text) = lit {
            out.push((attr_name, text));
        }
    };
    match &node.kind {
        NodeKind::Equality { attr: AttrRef::Name(name), value: EqualityLit::Str(lit), .. } => {
            push(name, lit, out)
        }
        NodeKind::And(l, r) | NodeKind::Or(l, r) => {
            referenced_raw_strings(l, out);
            referenced_raw_strings(r, out);
        }
        NodeKind::Not(child) => referenced_raw_strings(child, out),
        NodeKind::Set { left, right, .. } => {
            if let (SetScalar::Str(lit), SetList::Variable(AttrRef::Name(name))) = (left, right) {
                push(name, lit, out);
            }
            if let (SetScalar::Variable(AttrRef::Name(name)), SetList::StrList(lits)) = (left, right) {
                for lit in lits {
                    push(name, lit, out);
                }
            }
        }
        NodeKind::List { attr: AttrRef::Name(name), value: ListValue::StrList(lits), .. } => {
            for lit in lits {
                push(name, lit, out);
            }
        }
        NodeKind::Special(SpecialNode::FrequencyCap {
            caps_attr: AttrRef::Name(name),
            namespace,
            ..
        }) => push(name, namespace, out),
        _ => {}
    }
}

/// Used when a caller needs to resolve `attr` on a node the compiler
/// hasn't visited yet — primarily by tests constructing already-compiled
/// fixtures without running the full pass pipeline.
pub fn set_attr_var(attr: &mut AttrRef, config: &Config) {
    if let AttrRef::Name(name) = attr {
        if let Some(domain) = config.domain_by_name(name) {
            *attr = AttrRef::Var(domain.var_id);
        }
    }
}
