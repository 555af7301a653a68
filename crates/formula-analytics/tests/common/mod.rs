#![allow(dead_code)]

use formula_analytics::{field_equals, PivotFn, Value};
use serde_json::json;

pub const METHODS: [&str; 3] = ["GET", "POST", "PUT"];
pub const STATUSES: [i64; 3] = [200, 404, 500];
pub const REGIONS: [&str; 2] = ["eu", "us"];

/// A deterministic access log: `n` request records with every tenth line unparsed (plain text).
pub fn access_log(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            if i % 10 == 9 {
                return Value::from(format!("unparsed line {i}"));
            }
            let status = match i % 5 {
                3 => 404,
                4 => 500,
                _ => 200,
            };
            let plan = if i % 7 == 0 { "pro" } else { "free" };
            json!({
                "method": METHODS[i % 3],
                "status": status,
                "ms": (i * 37) % 1000,
                "user": {
                    "region": REGIONS[i % 2],
                    "plan": plan,
                },
            })
            .into()
        })
        .collect()
}

pub fn field_pivot(key: &'static str) -> PivotFn {
    PivotFn::single(move |v: &Value| field_equals(key, v.clone()))
}

/// Records whose `key` field equals `expected`, counted by hand.
pub fn count_field(records: &[Value], key: &str, expected: &Value) -> u64 {
    records
        .iter()
        .filter(|r| r.get(key) == Some(expected))
        .count() as u64
}
