// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::issue::codes;
use crate::schema::{ParseError, Schema};
use crate::value::Value;

use futures::FutureExt;
use serde_json::json;

fn val(v: serde_json::Value) -> Value {
    serde_json::from_value(v).unwrap()
}

#[test]
fn test_configure_clones_instead_of_mutating() {
    let base = Schema::string();
    let relaxed = base.optional();

    // The original keeps rejecting missing input.
    let outcome = base.safe_parse(&Value::Undefined).unwrap();
    assert_eq!(
        outcome.failure().unwrap().issues[0].code.as_ref(),
        codes::REQUIRED
    );

    assert_eq!(relaxed.parse(&Value::Undefined).unwrap(), Value::from(""));
}

#[test]
fn test_refinement_lists_are_independent() {
    let one = Schema::string().refine(|_, scope| {
        scope.issue("first");
        Ok(vec![])
    });
    let two = one.refine(|_, scope| {
        scope.issue("second");
        Ok(vec![])
    });

    let outcome = one.safe_parse(&val(json!("x"))).unwrap();
    assert_eq!(outcome.failure().unwrap().issues.len(), 1);

    let outcome = two.safe_parse(&val(json!("x"))).unwrap();
    assert_eq!(outcome.failure().unwrap().issues.len(), 2);
}

#[test]
fn test_has_async_validators_walks_descendants() {
    let leaf = Schema::string().refine_async(|_, _| async { Ok(vec![]) }.boxed_local());
    let tree = Schema::object([("list", Schema::array(leaf))]);
    assert!(tree.has_async_validators());

    let plain = Schema::object([("list", Schema::array(Schema::string()))]);
    assert!(!plain.has_async_validators());
}

#[test]
fn test_sync_entry_points_reject_async_trees() {
    let schema = Schema::object([(
        "name",
        Schema::string().refine_async(|_, _| async { Ok(vec![]) }.boxed_local()),
    )]);

    match schema.safe_parse(&val(json!({"name": "x"}))) {
        Err(ParseError::AsyncValidators) => {}
        other => panic!("Expected ParseError::AsyncValidators, got {other:?}"),
    }
    match schema.parse(&val(json!({"name": "x"}))) {
        Err(ParseError::AsyncValidators) => {}
        other => panic!("Expected ParseError::AsyncValidators, got {other:?}"),
    }
}

#[test]
fn test_kind_defaults() {
    assert_eq!(Schema::string().default_value(), Value::from(""));
    assert_eq!(Schema::number().default_value(), Value::from(0i64));
    assert_eq!(Schema::boolean().default_value(), Value::from(false));
    assert_eq!(Schema::literal("on").default_value(), Value::from("on"));
    assert_eq!(
        Schema::array(Schema::string()).default_value(),
        Value::new_array()
    );
    assert_eq!(
        Schema::record(Schema::number()).default_value(),
        Value::new_object()
    );
    assert_eq!(
        Schema::union([Schema::number(), Schema::string()]).default_value(),
        Value::from(0i64)
    );
}
