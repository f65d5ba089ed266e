//! Compiles a handful of targeting expressions against a shared `Config`
//! and matches one event against all of them, printing which expressions
//! the event satisfies.
use predicate_core::ast::{
    CompareOp, EqOp, EqualityLit, ListOp, ListValue, Node, NumericLit, SetList, SetOp, StringLit,
};
use predicate_core::compiler::compile;
use predicate_core::domain::{Bound, ValueType};
use predicate_core::event::EventBuilder;
use predicate_core::interner::Config;
use predicate_core::matcher::match_node;
use predicate_core::predicate_map::PredicateMap;

fn main() {
    let mut config = Config::new();
    config.add_attr_domain("exchange_id", ValueType::Int64, Bound::unbounded_int(), false).unwrap();
    config
        .add_attr_domain("deal_ids", ValueType::StringList, Bound::unbounded_string(), false)
        .unwrap();
    config
        .add_attr_domain("segment_ids", ValueType::IntList, Bound::unbounded_int(), false)
        .unwrap();
    config.add_attr_domain("country", ValueType::String, Bound::unbounded_string(), false).unwrap();
    config.add_attr_domain("city", ValueType::String, Bound::unbounded_string(), false).unwrap();

    let mut map = PredicateMap::new();

    let deal_ids_match = || {
        Node::list(
            ListOp::OneOf,
            "deal_ids",
            ListValue::StrList(vec![StringLit::raw("deal-1"), StringLit::raw("deal-2")]),
        )
    };
    let segments_match =
        || Node::list(ListOp::OneOf, "segment_ids", ListValue::IntList(vec![1, 2, 3]));
    let exchange_is_one = || Node::equality(EqOp::Equal, "exchange_id", EqualityLit::Int64(1));

    let expressions = [
        (
            "exchange + deals + segments + country in (FR, GB)",
            Node::and(
                Node::and(exchange_is_one(), deal_ids_match()),
                Node::and(
                    segments_match(),
                    Node::set_attr_in_list(
                        SetOp::In,
                        "country",
                        SetList::StrList(vec![StringLit::raw("FR"), StringLit::raw("GB")]),
                    ),
                ),
            ),
        ),
        (
            "exchange + deals + segments + (CA/QC or US/AZ)",
            Node::and(
                Node::and(exchange_is_one(), deal_ids_match()),
                Node::and(
                    segments_match(),
                    Node::or(
                        Node::and(
                            Node::equality(EqOp::Equal, "country", EqualityLit::Str(StringLit::raw("CA"))),
                            Node::set_attr_in_list(SetOp::In, "city", SetList::StrList(vec![StringLit::raw("QC")])),
                        ),
                        Node::and(
                            Node::equality(EqOp::Equal, "country", EqualityLit::Str(StringLit::raw("US"))),
                            Node::set_attr_in_list(SetOp::In, "city", SetList::StrList(vec![StringLit::raw("AZ")])),
                        ),
                    ),
                ),
            ),
        ),
        (
            "exchange + deals + segments only",
            Node::and(Node::and(exchange_is_one(), deal_ids_match()), segments_match()),
        ),
        (
            "age over 10000 (never matches this event shape)",
            Node::numeric_compare(CompareOp::GreaterThan, "exchange_id", NumericLit::Int64(10_000)),
        ),
    ];

    let compiled: Vec<(&str, Node)> = expressions
        .into_iter()
        .map(|(label, mut tree)| {
            compile(&mut config, &mut map, &mut tree);
            (label, tree)
        })
        .collect();

    let event = EventBuilder::new(&config)
        .with_int64("exchange_id", 1)
        .unwrap()
        .with_string_list("deal_ids", &["deal-3", "deal-1"])
        .unwrap()
        .with_int_list("segment_ids", vec![3, 4, 5])
        .unwrap()
        .with_string("country", "US")
        .unwrap()
        .with_string("city", "AZ")
        .unwrap()
        .build();

    for (label, tree) in &compiled {
        let matched = match_node(&config, &event, tree, None, None);
        println!("{matched}: {label}");
    }
}
