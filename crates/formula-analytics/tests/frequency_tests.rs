mod common;

use common::access_log;
use formula_analytics::{
    collect_value_frequencies, collect_value_frequencies_for, merge_value_frequencies,
    sort_value_frequencies, value_frequencies, EvalOptions, FrequencyMap, KeyFilter, Merge,
    Parallelism, Tally, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn records(items: serde_json::Value) -> Vec<Value> {
    match Value::from(items) {
        Value::List(items) => items,
        other => vec![other],
    }
}

fn tally(pairs: &[(&str, u64)]) -> Tally {
    pairs.iter().copied().collect()
}

#[test]
fn tallies_every_top_level_field() {
    let records = records(json!([
        {"a": "a1", "b": "b1", "c": "c1"},
        {"a": "a2", "b": "b2"},
        {"a": "a2", "b": "b3", "c": "c2", "d": "d1"},
    ]));
    let freq = collect_value_frequencies(&records, &KeyFilter::new(), Parallelism::Sequential);

    let expected: FrequencyMap = [
        ("a", tally(&[("a1", 1), ("a2", 2)])),
        ("b", tally(&[("b1", 1), ("b2", 1), ("b3", 1)])),
        ("c", tally(&[("c1", 1), ("c2", 1)])),
        ("d", tally(&[("d1", 1)])),
    ]
    .into_iter()
    .collect();
    assert_eq!(freq, expected);
    assert_eq!(freq.keys().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
}

#[test]
fn sorting_orders_each_tally_by_count() {
    let map: FrequencyMap = [("a", tally(&[("a1", 2), ("a2", 5), ("a3", 1)]))]
        .into_iter()
        .collect();
    let sorted = sort_value_frequencies(map);
    let order: Vec<(&str, u64)> = sorted.get("a").unwrap().iter().collect();
    assert_eq!(order, vec![("a2", 5), ("a1", 2), ("a3", 1)]);

    let again = sort_value_frequencies(sorted.clone());
    assert_eq!(
        again.get("a").unwrap().iter().collect::<Vec<_>>(),
        sorted.get("a").unwrap().iter().collect::<Vec<_>>()
    );
}

#[test]
fn key_paths_and_key_sets_narrow_the_tally() {
    let log = access_log(100);
    let filter = KeyFilter::new().path(["user"]).keys(["region", "missing"]);
    let freq = collect_value_frequencies(&log, &filter, Parallelism::Sequential);

    assert_eq!(freq.keys().collect::<Vec<_>>(), vec!["region"]);
    let parsed = log.iter().filter(|r| r.as_record().is_some()).count() as u64;
    assert_eq!(freq.get("region").unwrap().total(), parsed);
    assert!(freq.get("missing").is_none());
}

#[test]
fn unresolved_paths_and_scalars_contribute_nothing() {
    let filter = KeyFilter::new().path(["user"]);
    let acc = value_frequencies(FrequencyMap::new(), &Value::from("plain text"), &filter);
    let acc = value_frequencies(acc, &json!({"user": 7}).into(), &filter);
    let acc = value_frequencies(acc, &json!({"session": {"id": 1}}).into(), &filter);
    assert!(acc.is_empty());
}

#[test]
fn nested_records_tally_under_dotted_keys() {
    let log = access_log(20);
    let filter = KeyFilter::new().depth(1);
    let freq = collect_value_frequencies(&log, &filter, Parallelism::Sequential);
    let plans = freq.get("user.plan").unwrap();
    assert_eq!(plans.get("pro") + plans.get("free"), freq.get("method").unwrap().total());
}

#[test]
fn parallel_collection_matches_sequential() {
    let log = access_log(2_000);
    let filter = KeyFilter::new();
    let expected = collect_value_frequencies(&log, &filter, Parallelism::Sequential);
    for partition_len in [1, 33, 512] {
        let options = EvalOptions::new(Parallelism::PerPredicate).with_partition_len(partition_len);
        assert_eq!(collect_value_frequencies(&log, &filter, options), expected);
    }
}

#[test]
fn extractors_concatenate_several_paths() {
    let records = records(json!([
        {"req": {"method": "GET"}, "resp": {"status": 200}},
        {"req": {"method": "POST"}, "resp": {"status": 200}},
        {"req": {"method": "GET"}},
    ]));

    fn req_and_resp(record: &Value) -> Vec<&Value> {
        ["req", "resp"]
            .into_iter()
            .filter_map(|key| record.get(key))
            .collect()
    }

    let freq = collect_value_frequencies_for(
        &records,
        req_and_resp,
        EvalOptions::new(Parallelism::Matrix).with_partition_len(1),
    );
    assert_eq!(freq.count("method", "GET"), 2);
    assert_eq!(freq.count("method", "POST"), 1);
    assert_eq!(freq.count("status", "200"), 2);
}

#[test]
fn merging_sums_counts_key_wise() {
    let a: FrequencyMap = [("a", tally(&[("x", 1)]))].into_iter().collect();
    let b: FrequencyMap = [("a", tally(&[("x", 2), ("y", 1)])), ("b", tally(&[("z", 4)]))]
        .into_iter()
        .collect();

    let merged = merge_value_frequencies(a.clone(), b.clone());
    assert_eq!(merged.count("a", "x"), 3);
    assert_eq!(merged.count("a", "y"), 1);
    assert_eq!(merged.count("b", "z"), 4);
    assert_eq!(merged, merge_value_frequencies(b, a.clone()));
    assert_eq!(merge_value_frequencies(FrequencyMap::empty(), a.clone()), a);
}

#[test]
fn frequency_maps_serialize_as_nested_objects() {
    let records = records(json!([{"status": 200}, {"status": 500}, {"status": 200}]));
    let freq = sort_value_frequencies(collect_value_frequencies(
        &records,
        &KeyFilter::new(),
        Parallelism::Sequential,
    ));
    assert_eq!(
        serde_json::to_value(&freq).unwrap(),
        json!({"status": {"200": 2, "500": 1}})
    );
}
