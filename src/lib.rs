//! The core of a Boolean expression evaluation engine for matching a large
//! population of predicate expressions ("targeting rules") against
//! incoming events.
//!
//! This crate implements the typed expression tree model, the
//! attribute/string interning and compilation pipeline, the memoized
//! matcher, and the static domain-bound analyzer described by the
//! surrounding specification. It deliberately does **not** implement a
//! parser (expressions are built through [`ast::Node`]'s constructors),
//! an enclosing index over many compiled expressions, event
//! serialization, or a CLI — those are external collaborators that
//! consume this crate's contracts.
//!
//! # Example
//!
//! ```
//! use predicate_core::ast::{CompareOp, EqOp, EqualityLit, Node, NumericLit, SetList, SetOp, StringLit};
//! use predicate_core::compiler::compile;
//! use predicate_core::domain::{Bound, ValueType};
//! use predicate_core::event::EventBuilder;
//! use predicate_core::interner::Config;
//! use predicate_core::matcher::match_node;
//! use predicate_core::predicate_map::PredicateMap;
//!
//! let mut config = Config::new();
//! config.add_attr_domain("age", ValueType::Int64, Bound::Int { min: 0, max: 120 }, false).unwrap();
//! config
//!     .add_attr_domain("country", ValueType::String, Bound::unbounded_string(), false)
//!     .unwrap();
//!
//! let mut map = PredicateMap::new();
//! let mut tree = Node::and(
//!     Node::numeric_compare(CompareOp::GreaterThanEqual, "age", NumericLit::Int64(18)),
//!     Node::set_attr_in_list(
//!         SetOp::In,
//!         "country",
//!         SetList::StrList(vec![StringLit::raw("US"), StringLit::raw("CA")]),
//!     ),
//! );
//! compile(&mut config, &mut map, &mut tree);
//!
//! let event = EventBuilder::new(&config)
//!     .with_int64("age", 21)
//!     .unwrap()
//!     .with_string("country", "US")
//!     .unwrap()
//!     .build();
//!
//! assert!(match_node(&config, &event, &tree, None, None));
//! ```
//!
//! # Pipeline
//!
//! A caller-built [`ast::Node`] tree with textual attribute references and
//! raw string literals is run through [`compiler::compile`] (which in
//! turn runs `assign_variable_id`, `assign_str_id`, `assign_pred_id`
//! against a shared [`interner::Config`] and [`predicate_map::PredicateMap`]).
//! The compiled tree is then held by the caller's own index structure and
//! evaluated per incoming event via [`matcher::match_node`], optionally
//! with a [`memoize::Memoize`] bitset to skip already-evaluated
//! sub-expressions across repeated calls over the same tree shape.
//! [`bound::get_variable_bound`] is a separate, independent static
//! analysis: given an [`domain::AttributeDomain`] and a compiled tree, it
//! infers the tightest interval the tree can constrain that attribute to,
//! for use by a surrounding pruning index.
pub mod ast;
pub mod bound;
pub mod compiler;
pub mod domain;
pub mod error;
pub mod event;
pub mod interner;
pub mod matcher;
pub mod memoize;
pub mod predicate_map;
pub mod value;

pub use crate::ast::{clone_node, eq_expr, Node};
pub use crate::bound::{get_variable_bound, Interval};
pub use crate::compiler::{all_bounded_strings_valid, all_variables_in_config, compile};
pub use crate::domain::{AttributeDomain, Bound, ValueType};
pub use crate::error::{ConfigError, EventError};
pub use crate::event::{Event, EventBuilder};
pub use crate::interner::{Config, StringId, VariableId};
pub use crate::matcher::match_node;
pub use crate::memoize::{Memoize, Report};
pub use crate::predicate_map::PredicateMap;
pub use crate::value::{
    FrequencyCapEntry, FrequencyType, SegmentEntry, StringValue, Value, EQUALITY_EPSILON,
};
