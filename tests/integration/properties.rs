#![allow(missing_docs)]

use myrial::{
    query::{Executor, PlanNode, PlanRef},
    relation::{Atom, Bag, Column, ColumnType, Schema, Tuple},
};
use proptest::prelude::*;

fn arb_type() -> impl Strategy<Value = ColumnType> {
    prop_oneof![Just(ColumnType::Int), Just(ColumnType::String)]
}

fn arb_schema() -> impl Strategy<Value = Schema> {
    prop::collection::vec(arb_type(), 0..5).prop_map(|types| {
        let columns = types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| Column::new(format!("c{i}"), ty))
            .collect();
        Schema::new(columns).expect("unique names")
    })
}

fn arb_atom(ty: ColumnType) -> BoxedStrategy<Atom> {
    match ty {
        ColumnType::Int => any::<i64>().prop_map(Atom::Int).boxed(),
        ColumnType::String => any::<String>().prop_map(Atom::String).boxed(),
    }
}

fn arb_tuple_for(schema: &Schema) -> BoxedStrategy<Tuple> {
    schema
        .types()
        .map(arb_atom)
        .collect::<Vec<_>>()
        .prop_map(Tuple::new)
        .boxed()
}

fn arb_schema_and_tuple() -> impl Strategy<Value = (Schema, Tuple)> {
    arb_schema().prop_flat_map(|schema| {
        let tuples = arb_tuple_for(&schema);
        (Just(schema), tuples)
    })
}

/// Small pairs so that duplicates and matches are common.
fn arb_pairs() -> impl Strategy<Value = Vec<Tuple>> {
    prop::collection::vec((0i64..4, 0i64..4), 0..16).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(a, b)| Tuple::new(vec![Atom::Int(a), Atom::Int(b)]))
            .collect()
    })
}

fn table(rows: Vec<Tuple>, names: [&str; 2]) -> PlanRef {
    let schema = Schema::from_strings(&[format!("{}:int", names[0]), format!("{}:int", names[1])])
        .expect("schema");
    PlanNode::table(rows, schema).expect("table")
}

fn eval(node: &PlanNode) -> Vec<Tuple> {
    Executor::in_memory()
        .evaluate(node)
        .expect("evaluate")
        .collect::<Result<_, _>>()
        .expect("stream")
}

proptest! {
    #[test]
    fn compatibility_is_symmetric(a in arb_schema(), b in arb_schema()) {
        prop_assert_eq!(a.compatible(&b), b.compatible(&a));
        prop_assert!(a.compatible(&a));
    }

    #[test]
    fn delimited_round_trip((schema, tuple) in arb_schema_and_tuple()) {
        prop_assume!(!schema.is_empty());
        let line = tuple.to_delimited_string();
        prop_assert_eq!(schema.tuple_from_string(&line).expect("parse"), tuple);
    }

    #[test]
    fn bag_operators_follow_multiplicities(a in arb_pairs(), b in arb_pairs()) {
        let left = table(a.clone(), ["x", "y"]);
        let right = table(b.clone(), ["x", "y"]);
        let ba: Bag = a.iter().cloned().collect();
        let bb: Bag = b.iter().cloned().collect();

        let union: Bag = eval(&PlanNode::union(left.clone(), right.clone()).expect("union"))
            .into_iter()
            .collect();
        let inter: Bag = eval(&PlanNode::intersect(left.clone(), right.clone()).expect("intersect"))
            .into_iter()
            .collect();
        let diff: Bag = eval(&PlanNode::diff(left.clone(), right.clone()).expect("diff"))
            .into_iter()
            .collect();
        let distinct: Bag = eval(&PlanNode::distinct(left.clone()).expect("distinct"))
            .into_iter()
            .collect();

        prop_assert_eq!(&union, &ba.union(&bb));
        for t in a.iter().chain(b.iter()) {
            let (ma, mb) = (ba.count(t), bb.count(t));
            prop_assert_eq!(union.count(t), ma + mb);
            prop_assert_eq!(inter.count(t), ma.min(mb));
            prop_assert_eq!(diff.count(t), ma.saturating_sub(mb));
            prop_assert_eq!(distinct.count(t), usize::from(ma > 0));
        }
    }

    #[test]
    fn distinct_is_idempotent_and_self_diff_is_empty(a in arb_pairs()) {
        let node = table(a, ["x", "y"]);
        let once = PlanNode::distinct(node.clone()).expect("distinct");
        let twice = PlanNode::distinct(once.clone()).expect("distinct");
        let once_bag: Bag = eval(&once).into_iter().collect();
        let twice_bag: Bag = eval(&twice).into_iter().collect();
        prop_assert_eq!(once_bag, twice_bag);
        prop_assert!(eval(&PlanNode::diff(node.clone(), node).expect("diff")).is_empty());
    }

    #[test]
    fn limit_yields_a_prefix(a in arb_pairs(), n in 0u64..20) {
        let node = table(a, ["x", "y"]);
        let all = eval(&node);
        let limited = eval(&PlanNode::limit(node, n).expect("limit"));
        let expect = (n as usize).min(all.len());
        prop_assert_eq!(limited.len(), expect);
        prop_assert_eq!(&limited[..], &all[..expect]);
    }

    #[test]
    fn join_commutes_up_to_column_order(a in arb_pairs(), b in arb_pairs()) {
        let l = table(a, ["src", "dst"]);
        let r = table(b, ["src", "dst"]);
        let lr = PlanNode::join(l.clone(), r.clone(), vec![(1, 2)], ["L", "R"]).expect("join");
        let rl = PlanNode::join(r, l, vec![(0, 3)], ["R", "L"]).expect("join");
        let lr_bag: Bag = eval(&lr).into_iter().collect();
        let rl_bag: Bag = eval(&rl)
            .into_iter()
            .map(|t| t.select(&[2, 3, 0, 1]).expect("arity"))
            .collect();
        prop_assert_eq!(lr_bag, rl_bag);
    }
}
