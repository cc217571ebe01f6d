// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::issue::codes;
use crate::path::{Path, Segment};
use crate::refine::RefineError;
use crate::schema::{ParseError, Schema};
use crate::options::ParseOptions;
use crate::value::Value;

use serde_json::json;

fn val(v: serde_json::Value) -> Value {
    serde_json::from_value(v).unwrap()
}

#[test]
fn test_issue_attaches_to_last_accessed_field() {
    let schema = Schema::object([(
        "address",
        Schema::object([("city", Schema::string())]),
    )])
    .refine(|data, scope| {
        let _city = data.get("address").get("city");
        scope.issue("checked");
        Ok(vec![])
    });

    let outcome = schema
        .safe_parse(&val(json!({"address": {"city": "x"}})))
        .unwrap();
    let failure = outcome.failure().expect("expected a failed parse");
    assert_eq!(failure.issues.len(), 1);
    assert_eq!(
        failure.issues[0].path,
        Path::from(vec![Segment::key("address"), Segment::key("city")])
    );
}

#[test]
fn test_deep_access_attribution() {
    let schema = Schema::object([(
        "a",
        Schema::object([("b", Schema::array(Schema::number()))]),
    )])
    .refine(|data, scope| {
        let _leaf = data.get("a").get("b").at(2);
        scope.issue("out of range");
        Ok(vec![])
    });

    let outcome = schema
        .safe_parse(&val(json!({"a": {"b": [1, 2, 3]}})))
        .unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(
        failure.issues[0].path,
        Path::from(vec![
            Segment::key("a"),
            Segment::key("b"),
            Segment::index(2)
        ])
    );
}

#[test]
fn test_path_reset_between_refinements() {
    let schema = Schema::object([("a", Schema::string())])
        .refine(|data, _scope| {
            // Moves the cursor away from the node's own path.
            let _ = data.get("a");
            Ok(vec![])
        })
        .refine(|_, scope| {
            scope.issue("at own path");
            Ok(vec![])
        });

    let outcome = schema.safe_parse(&val(json!({"a": "x"}))).unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues.len(), 1);
    assert!(failure.issues[0].path.is_root());
}

#[test]
fn test_iteration_updates_path_per_element() {
    let schema = Schema::array(Schema::string()).refine(|items, scope| {
        for item in items.iter() {
            if item.value().as_string().map(|s| s.as_ref() == "bad").unwrap_or(false) {
                scope.issue("bad item");
            }
        }
        Ok(vec![])
    });

    let outcome = schema
        .safe_parse(&val(json!(["ok", "bad", "ok"])))
        .unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues.len(), 1);
    assert_eq!(failure.issues[0].path, Path::from(vec![Segment::index(1)]));
}

#[test]
fn test_return_style_issues() {
    let schema = Schema::string().refine(|value, scope| {
        if value.value().as_string().map(|s| s.len() < 5).unwrap_or(false) {
            return Ok(vec![scope.failure("too short")]);
        }
        Ok(vec![])
    });

    let outcome = schema.safe_parse(&val(json!("abc"))).unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues.len(), 1);
    assert_eq!(failure.issues[0].code.as_ref(), codes::CUSTOM);
    assert_eq!(failure.issues[0].message.as_ref(), "too short");

    assert!(schema.safe_parse(&val(json!("abcdef"))).unwrap().is_valid());
}

#[test]
fn test_message_override_collapses_issues() {
    let schema = Schema::string().refine_with_message(
        |_, scope| {
            scope.issue("one");
            scope.issue("two");
            Ok(vec![])
        },
        "collapsed",
    );

    let outcome = schema.safe_parse(&val(json!("x"))).unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues.len(), 1);
    assert_eq!(failure.issues[0].message.as_ref(), "collapsed");
    assert!(failure.issues[0].path.is_root());
}

#[test]
fn test_failed_refinement_becomes_exception_issue() {
    let schema = Schema::string()
        .refine(|_, _| Err(RefineError::failure("boom")))
        .refine(|_, scope| {
            scope.issue("still ran");
            Ok(vec![])
        });

    let outcome = schema.safe_parse(&val(json!("x"))).unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues.len(), 2);
    assert_eq!(failure.issues[0].code.as_ref(), codes::EXCEPTION);
    assert_eq!(failure.issues[0].message.as_ref(), "boom");
    assert_eq!(failure.issues[1].message.as_ref(), "still ran");
}

#[test]
fn test_missing_key_error_propagates() {
    let schema = Schema::string().refine(|_, scope| {
        let _flag = scope.get::<bool>("flag")?;
        Ok(vec![])
    });

    match schema.safe_parse(&val(json!("x"))) {
        Err(ParseError::MissingKey(e)) => assert_eq!(e.0.as_ref(), "flag"),
        other => panic!("Expected ParseError::MissingKey, got {other:?}"),
    }
}

#[test]
fn test_context_key_retrieval() {
    let schema = Schema::string().refine(|value, scope| {
        let max = scope.get::<usize>("max_len")?;
        if value.value().as_string().map(|s| s.len() > *max).unwrap_or(false) {
            scope.issue("too long");
        }
        Ok(vec![])
    });

    let options = ParseOptions::new().with_key("max_len", 3usize);
    let outcome = schema.safe_parse_with(&val(json!("abcd")), options).unwrap();
    assert_eq!(outcome.failure().unwrap().issues.len(), 1);

    let options = ParseOptions::new().with_key("max_len", 10usize);
    assert!(schema
        .safe_parse_with(&val(json!("abcd")), options)
        .unwrap()
        .is_valid());
}

#[test]
fn test_function_dependency_in_options_bag() {
    fn is_banned(name: &str) -> bool {
        name == "root"
    }

    let schema = Schema::string().refine(|value, scope| {
        let banned = *scope.get::<fn(&str) -> bool>("banned")?;
        if value.value().as_string().map(|s| banned(s)).unwrap_or(false) {
            scope.issue("name not allowed");
        }
        Ok(vec![])
    });

    let options = ParseOptions::new().with_key("banned", is_banned as fn(&str) -> bool);
    let outcome = schema.safe_parse_with(&val(json!("root")), options).unwrap();
    assert_eq!(
        outcome.failure().unwrap().issues[0].message.as_ref(),
        "name not allowed"
    );
}

#[test]
fn test_is_defined_consults_raw_input() {
    let schema = Schema::object([("nickname", Schema::string().optional())]).refine(
        |data, scope| {
            let nickname = data.get("nickname");
            if !scope.is_defined(&nickname) {
                scope.issue_with_code("missing", "no nickname given");
            }
            Ok(vec![])
        },
    );

    // The parsed value normalizes to "", but the raw input was absent.
    let outcome = schema.safe_parse(&val(json!({}))).unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues[0].code.as_ref(), "missing");
    assert_eq!(
        failure.issues[0].path,
        Path::from(vec![Segment::key("nickname")])
    );

    assert!(schema
        .safe_parse(&val(json!({"nickname": "ada"})))
        .unwrap()
        .is_valid());
}

#[test]
fn test_structural_issue_at_own_path_suppresses_refinements() {
    let schema = Schema::string().refine(|_, scope| {
        scope.issue("ran anyway");
        Ok(vec![])
    });

    let outcome = schema.safe_parse(&val(json!([]))).unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues.len(), 1);
    assert_eq!(failure.issues[0].code.as_ref(), codes::INVALID_TYPE);
}

#[test]
fn test_child_issue_does_not_suppress_parent_refinement() {
    let schema = Schema::object([("age", Schema::number())]).refine(|_, scope| {
        scope.issue("parent ran");
        Ok(vec![])
    });

    let outcome = schema.safe_parse(&val(json!({"age": []}))).unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues.len(), 2);
    assert!(failure
        .issues
        .iter()
        .any(|i| i.code.as_ref() == codes::INVALID_TYPE));
    assert!(failure.issues.iter().any(|i| i.message.as_ref() == "parent ran"));
}
