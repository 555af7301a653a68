mod common;

use common::access_log;
use formula_analytics::{
    all, any, collect_with, count_with, count_with_by, field, field_equals, is_even, is_number,
    is_odd, is_record, is_text, none, not, number, path, take_until, text, until, EvalOptions,
    Parallelism, Predicate, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn mixed() -> Vec<Value> {
    let mut items: Vec<Value> = [2, 3, 4, 5, 9, 11, 12, 15, 20, 21, 25, 26, 27]
        .into_iter()
        .map(Value::from)
        .collect();
    items.extend([Value::from("a"), Value::from("b")]);
    items
}

#[test]
fn numeric_guard_skips_text() {
    let items = mixed();
    assert_eq!(count_with(&items, &all([is_number()]), Parallelism::Sequential), 13);
    assert_eq!(count_with(&items, &all([is_number(), is_even()]), Parallelism::Sequential), 5);
    assert_eq!(count_with(&items, &is_odd(), Parallelism::PerPredicate), 8);
    assert_eq!(count_with(&items, &none([is_number()]), Parallelism::Sequential), 2);
}

#[test]
fn empty_combinators_are_neutral() {
    let v = Value::from(1);
    assert!(all(Vec::<Predicate>::new()).test(&v));
    assert!(!any(Vec::<Predicate>::new()).test(&v));
    assert!(none(Vec::<Predicate>::new()).test(&v));
    assert!(not(is_text()).test(&v));
}

#[test]
fn take_until_accumulates_newest_first() {
    let seq: Vec<Value> = ["foo", "bar"]
        .into_iter()
        .map(Value::from)
        .chain([3, 5, 6].into_iter().map(Value::from))
        .chain([Value::from("zoo")])
        .collect();

    let taken = take_until(&is_even(), &seq);
    assert_eq!(
        taken,
        vec![
            &Value::from(6),
            &Value::from(5),
            &Value::from(3),
            &Value::from("bar"),
            &Value::from("foo"),
        ]
    );
    assert!(until(&is_even(), &seq));
    assert!(!until(&is_even(), &seq[..4]));
    assert!(take_until(&is_even(), &seq[..4]).is_empty());
}

#[test]
fn field_predicates_compose_over_records() {
    let log = access_log(200);
    let slow_gets = all([
        is_record(),
        field_equals("method", "GET"),
        field("ms", number(|ms| ms >= 500.0)),
    ]);
    let pro_users = path(["user", "plan"], text(|plan| plan == "pro"));

    let expected_slow = log
        .iter()
        .filter(|r| {
            r.get("method") == Some(&Value::from("GET"))
                && r.get("ms").and_then(Value::as_number).is_some_and(|ms| ms >= 500.0)
        })
        .count() as u64;
    assert_eq!(count_with(&log, &slow_gets, Parallelism::Sequential), expected_slow);

    let either = slow_gets.clone().or(pro_users.clone());
    let both = slow_gets.and(pro_users);
    let n_either = count_with(&log, &either, Parallelism::PerPredicate);
    let n_both = count_with(&log, &both, Parallelism::PerPredicate);
    assert!(n_both <= expected_slow);
    assert!(n_either >= expected_slow);
}

#[test]
fn weighted_counts_agree_across_partitions() {
    let log = access_log(1_000);
    let errors = field("status", number(|s| s >= 400.0));
    let latency = |total: f64, record: &Value| {
        total + record.get("ms").and_then(Value::as_number).unwrap_or(0.0)
    };

    let sequential = count_with_by(&log, &errors, 10.0, latency, Parallelism::Sequential);
    let parallel = count_with_by(
        &log,
        &errors,
        10.0,
        latency,
        EvalOptions::new(Parallelism::PerPredicate).with_partition_len(16),
    );
    // Integral millisecond sums are exact in f64.
    assert_eq!(sequential, parallel);
    assert!(sequential > 10.0);
}

#[test]
fn collect_with_returns_matches_in_order() {
    let records: Vec<Value> = json!([{"n": 1}, {"n": 2}, "x", {"n": 3}, {"n": 4}])
        .as_array()
        .into_iter()
        .flatten()
        .cloned()
        .map(Value::from)
        .collect();
    let even = field("n", is_even());

    let seq = collect_with(&records, &even, Parallelism::Sequential);
    let par = collect_with(
        &records,
        &even,
        EvalOptions::new(Parallelism::PerPredicate).with_partition_len(1),
    );
    assert_eq!(seq, vec![&records[1], &records[4]]);
    assert_eq!(par, seq);
}
