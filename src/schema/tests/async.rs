// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::issue::codes;
use crate::options::ParseOptions;
use crate::refine::RefineError;
use crate::schema::{ParseError, Schema};
use crate::value::Value;

use std::cell::RefCell;
use std::rc::Rc;

use futures::FutureExt;
use serde_json::json;

fn val(v: serde_json::Value) -> Value {
    serde_json::from_value(v).unwrap()
}

#[tokio::test]
async fn test_sync_phase_completes_before_async_phase() {
    let log = Rc::new(RefCell::new(Vec::new()));

    let log_async = Rc::clone(&log);
    let a = Schema::string().refine_async(move |_, _| {
        let log = Rc::clone(&log_async);
        async move {
            log.borrow_mut().push("async a");
            Ok(vec![])
        }
        .boxed_local()
    });

    let log_sync = Rc::clone(&log);
    let b = Schema::string().refine(move |_, _| {
        log_sync.borrow_mut().push("sync b");
        Ok(vec![])
    });

    let schema = Schema::object([("a", a), ("b", b)]);
    let outcome = schema
        .safe_parse_async(&val(json!({"a": "x", "b": "y"})))
        .await
        .unwrap();
    assert!(outcome.is_valid());
    assert_eq!(*log.borrow(), vec!["sync b", "async a"]);
}

#[tokio::test]
async fn test_async_refinements_run_sequentially() {
    let log = Rc::new(RefCell::new(Vec::new()));

    let log1 = Rc::clone(&log);
    let log2 = Rc::clone(&log);
    let schema = Schema::string()
        .refine_async(move |_, _| {
            let log = Rc::clone(&log1);
            async move {
                log.borrow_mut().push("first start");
                tokio::task::yield_now().await;
                log.borrow_mut().push("first end");
                Ok(vec![])
            }
            .boxed_local()
        })
        .refine_async(move |_, _| {
            let log = Rc::clone(&log2);
            async move {
                log.borrow_mut().push("second");
                Ok(vec![])
            }
            .boxed_local()
        });

    schema.safe_parse_async(&val(json!("x"))).await.unwrap();
    assert_eq!(*log.borrow(), vec!["first start", "first end", "second"]);
}

#[tokio::test]
async fn test_async_refinement_raises_issue() {
    let schema = Schema::string().refine_async(|value, scope| {
        async move {
            tokio::task::yield_now().await;
            if value.value().as_string().map(|s| s.as_ref() == "taken").unwrap_or(false) {
                scope.issue("already taken");
            }
            Ok(vec![])
        }
        .boxed_local()
    });

    let outcome = schema.safe_parse_async(&val(json!("taken"))).await.unwrap();
    let failure = outcome.failure().expect("expected a failed parse");
    assert_eq!(failure.issues.len(), 1);
    assert_eq!(failure.issues[0].message.as_ref(), "already taken");

    assert!(schema
        .safe_parse_async(&val(json!("free")))
        .await
        .unwrap()
        .is_valid());
}

#[tokio::test]
async fn test_own_path_issue_suppresses_async_refinement() {
    let ran = Rc::new(RefCell::new(false));
    let ran_flag = Rc::clone(&ran);
    let schema = Schema::string().refine_async(move |_, _| {
        let ran = Rc::clone(&ran_flag);
        async move {
            *ran.borrow_mut() = true;
            Ok(vec![])
        }
        .boxed_local()
    });

    let outcome = schema.safe_parse_async(&val(json!([]))).await.unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues.len(), 1);
    assert_eq!(failure.issues[0].code.as_ref(), codes::INVALID_TYPE);
    assert!(!*ran.borrow());
}

#[tokio::test]
async fn test_descendant_issue_does_not_suppress_parent_async() {
    let schema = Schema::object([("age", Schema::number())]).refine_async(|_, scope| {
        async move {
            scope.issue("parent ran");
            Ok(vec![])
        }
        .boxed_local()
    });

    let outcome = schema
        .safe_parse_async(&val(json!({"age": []})))
        .await
        .unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues.len(), 2);
    assert!(failure
        .issues
        .iter()
        .any(|i| i.code.as_ref() == codes::INVALID_TYPE));
    assert!(failure.issues.iter().any(|i| i.message.as_ref() == "parent ran"));
}

#[tokio::test]
async fn test_async_missing_key_propagates() {
    let schema = Schema::string().refine_async(|_, scope| {
        async move {
            let _dep = scope.get::<bool>("reachable")?;
            Ok(vec![])
        }
        .boxed_local()
    });

    match schema.safe_parse_async(&val(json!("x"))).await {
        Err(ParseError::MissingKey(e)) => assert_eq!(e.0.as_ref(), "reachable"),
        other => panic!("Expected ParseError::MissingKey, got {other:?}"),
    }
}

#[tokio::test]
async fn test_async_failure_recovered_as_exception() {
    let schema = Schema::string().refine_async(|_, _| {
        async move { Err(RefineError::failure("lookup timed out")) }.boxed_local()
    });

    let outcome = schema.safe_parse_async(&val(json!("x"))).await.unwrap();
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.issues[0].code.as_ref(), codes::EXCEPTION);
    assert_eq!(failure.issues[0].message.as_ref(), "lookup timed out");
}

#[tokio::test]
async fn test_availability_check_from_options_bag() {
    fn taken(name: &str) -> bool {
        name == "admin"
    }

    let schema = Schema::string().refine_async(|value, scope| {
        async move {
            let taken = *scope.get::<fn(&str) -> bool>("taken")?;
            tokio::task::yield_now().await;
            if value.value().as_string().map(|s| taken(s)).unwrap_or(false) {
                scope.issue("name unavailable");
            }
            Ok(vec![])
        }
        .boxed_local()
    });

    let options = ParseOptions::new().with_key("taken", taken as fn(&str) -> bool);
    let outcome = schema
        .safe_parse_async_with(&val(json!("admin")), options)
        .await
        .unwrap();
    assert_eq!(
        outcome.failure().unwrap().issues[0].message.as_ref(),
        "name unavailable"
    );
}

#[tokio::test]
async fn test_async_entry_point_accepts_sync_only_schema() {
    let schema = Schema::object([("name", Schema::string())]);
    let outcome = schema
        .safe_parse_async(&val(json!({"name": "x"})))
        .await
        .unwrap();
    assert!(outcome.is_valid());
}
