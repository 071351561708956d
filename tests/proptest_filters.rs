//! Property-based tests using proptest
//!
//! These tests verify filter normalization, attribute ordering and query
//! encoding using randomized inputs.

use daktela_v6::api::http::build_query;
use daktela_v6::{Attributes, FilterExpression, FilterNode, Logic};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Generate a field name
fn arb_field() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9_]{0,15}"
}

/// Generate an operator, including ones the service may not know
fn arb_operator() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("eq".to_string()),
        Just("neq".to_string()),
        Just("lte".to_string()),
        Just("gte".to_string()),
        Just("in".to_string()),
        Just("like".to_string()),
        "[a-z~]{1,6}",
    ]
}

/// Generate a clause value: a string or a list of strings
fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[ -~]{0,20}".prop_map(Value::String),
        prop::collection::vec("[A-Z]{1,6}", 1..4).prop_map(|v| json!(v)),
    ]
}

/// Generate a (field, operator, value) triple
fn arb_triple() -> impl Strategy<Value = (String, String, Value)> {
    (arb_field(), arb_operator(), arb_value())
}

/// Generate a raw clause, either positional or named
fn arb_raw_clause() -> impl Strategy<Value = (Value, (String, String, Value))> {
    (arb_triple(), any::<bool>()).prop_map(|((field, operator, value), positional)| {
        let raw = if positional {
            json!([field, operator, value])
        } else {
            json!({"field": field, "operator": operator, "value": value})
        };
        (raw, (field, operator, value))
    })
}

fn arb_logic() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("and"), Just("or")]
}

/// Generate a normalized tree up to two levels deep
fn arb_expression() -> impl Strategy<Value = FilterExpression> {
    let group = (arb_logic(), prop::collection::vec(arb_triple(), 1..4)).prop_map(|(logic, triples)| {
        json!({
            "logic": logic,
            "filters": triples
                .into_iter()
                .map(|(f, o, v)| json!([f, o, v]))
                .collect::<Vec<_>>()
        })
    });
    let member = prop_oneof![
        3 => arb_raw_clause().prop_map(|(raw, _)| raw),
        1 => group,
    ];
    (arb_logic(), prop::collection::vec(member, 0..6)).prop_map(|(logic, members)| {
        let mut expression = FilterExpression::new();
        expression
            .merge_from(&json!({"logic": logic, "filters": members}))
            .expect("generated filters are valid");
        expression
    })
}

fn clause_triple(node: &FilterNode) -> Option<(String, String, Value)> {
    match node {
        FilterNode::Clause(c) => Some((c.field.clone(), c.operator.clone(), c.value.clone())),
        FilterNode::Group(_) => None,
    }
}

proptest! {
    /// Normalizing an already normalized tree is a no-op
    #[test]
    fn normalization_is_idempotent(expression in arb_expression()) {
        let mut again = FilterExpression::new();
        again.merge_from(&expression.to_value()).unwrap();
        prop_assert_eq!(again, expression);
    }

    /// Every element of a bare list becomes one named clause, in order
    #[test]
    fn merge_preserves_order(clauses in prop::collection::vec(arb_raw_clause(), 1..10)) {
        let raw: Vec<Value> = clauses.iter().map(|(raw, _)| raw.clone()).collect();
        let mut expression = FilterExpression::new();
        expression.merge_from(&json!(raw)).unwrap();

        prop_assert_eq!(expression.logic(), Some(Logic::And));
        let normalized: Vec<_> = expression.filters().iter().filter_map(clause_triple).collect();
        let expected: Vec<_> = clauses.into_iter().map(|(_, triple)| triple).collect();
        prop_assert_eq!(normalized, expected);
    }

    /// No positional form survives normalization
    #[test]
    fn no_positional_leaves(expression in arb_expression()) {
        fn check(value: &Value) -> bool {
            value["filters"].as_array().map_or(true, |members| {
                members.iter().all(|m| {
                    if m.get("filters").is_some() {
                        check(m)
                    } else {
                        m.is_object()
                            && m.get("field").is_some()
                            && m.get("operator").is_some()
                            && m.get("value").is_some()
                    }
                })
            })
        }
        prop_assert!(check(&expression.to_value()));
    }

    /// The first logic applied to the root wins
    #[test]
    fn root_logic_is_sticky(first in arb_logic(), second in arb_logic(), triple in arb_triple()) {
        let (field, operator, value) = triple;
        let mut expression = FilterExpression::new();
        expression.merge_from(&json!({"logic": first, "filters": [[field, operator, value]]})).unwrap();
        expression.merge_from(&json!({"logic": second, "filters": []})).unwrap();
        expression.add_clause("extra", "eq", "1");

        prop_assert_eq!(expression.logic().map(Logic::as_str), Some(first));
        prop_assert_eq!(expression.filters().len(), 2);
    }

    /// Appending clauses never drops earlier ones
    #[test]
    fn merge_appends(
        existing in prop::collection::vec(arb_triple(), 0..5),
        added in prop::collection::vec(arb_raw_clause(), 0..5)
    ) {
        let mut expression = FilterExpression::new();
        for (field, operator, value) in &existing {
            expression.add_clause(field, operator, value.clone());
        }
        let raw: Vec<Value> = added.iter().map(|(raw, _)| raw.clone()).collect();
        expression.merge_from(&json!(raw)).unwrap();

        prop_assert_eq!(expression.filters().len(), existing.len() + added.len());
    }

    /// Attribute keys keep first-insertion order and last value
    #[test]
    fn attributes_last_write_wins(entries in prop::collection::vec((0u8..5, any::<i64>()), 0..20)) {
        let mut attributes = Attributes::new();
        let mut expected: Vec<(String, i64)> = Vec::new();
        for (key, value) in &entries {
            let key = format!("k{}", key);
            attributes.insert(&key, *value);
            match expected.iter_mut().find(|(k, _)| *k == key) {
                Some((_, v)) => *v = *value,
                None => expected.push((key, *value)),
            }
        }

        let expected: serde_json::Map<String, Value> =
            expected.into_iter().map(|(k, v)| (k, json!(v))).collect();
        let actual = attributes.to_value();
        let actual_keys: Vec<&String> = actual.as_object().unwrap().keys().collect();
        let expected_keys: Vec<&String> = expected.keys().collect();
        prop_assert_eq!(actual_keys, expected_keys);
        prop_assert_eq!(actual, Value::Object(expected));
    }

    /// Encoded queries never contain raw separators from values
    #[test]
    fn query_values_are_escaped(value in "[ -~]{0,30}") {
        let query = build_query(&[("filter".to_string(), json!({"filters": [{"value": value}]}))]);
        prop_assert_eq!(query.matches('&').count(), 0);
        prop_assert_eq!(query.matches('=').count(), 1);
    }
}
