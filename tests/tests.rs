// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::rc::Rc;

use futures::FutureExt;
use serde_json::json;
use valrus::{codes, ParseOptions, Path, Schema, Segment, Value};

fn val(v: serde_json::Value) -> Value {
    serde_json::from_value(v).unwrap()
}

fn registration_schema() -> Schema {
    let interests = Schema::array(Schema::string())
        .refine(|items, scope| {
            if items.iter().count() == 0 {
                scope.issue("pick at least one interest");
            }
            Ok(vec![])
        })
        .refine(|items, scope| {
            let mut seen = BTreeSet::new();
            for item in items.iter() {
                if let Ok(s) = item.value().as_string() {
                    if !seen.insert(s.to_string()) {
                        scope.issue(format!("duplicate interest '{s}'"));
                    }
                }
            }
            Ok(vec![])
        });

    Schema::object([
        ("email", Schema::string()),
        ("password", Schema::string().optional()),
        ("passwordConfirm", Schema::string().optional()),
        ("interests", interests),
    ])
    .refine(|data, scope| {
        let password = data.get("password").value().clone();
        let confirm = data.get("passwordConfirm");
        if confirm.value() != &password {
            scope.issue("passwords don't match");
        }
        Ok(vec![])
    })
}

#[test]
fn registration_form_collects_field_issues() {
    // `interests` carries a sparse slot, which JSON cannot express.
    let interests = Value::from(vec![
        Value::from("coding"),
        Value::Undefined,
        Value::from("coding"),
        Value::from("movies"),
    ]);
    let mut fields: BTreeMap<Rc<str>, Value> = BTreeMap::new();
    fields.insert("passwordConfirm".into(), Value::from("  abc"));
    fields.insert("interests".into(), interests);
    let input = Value::from(fields);

    let outcome = registration_schema().safe_parse(&input).unwrap();
    let failure = outcome.failure().expect("expected a failed parse");
    assert_eq!(failure.issues.len(), 3);

    let email = Path::from(vec![Segment::key("email")]);
    assert!(failure
        .issues
        .iter()
        .any(|i| i.path == email && i.code.as_ref() == codes::REQUIRED));

    assert!(failure.issues.iter().any(|i| {
        i.code.as_ref() == codes::CUSTOM && i.message.as_ref() == "passwords don't match"
    }));

    let duplicate = Path::from(vec![Segment::key("interests"), Segment::index(2)]);
    assert!(failure.issues.iter().any(|i| {
        i.path == duplicate && i.message.as_ref() == "duplicate interest 'coding'"
    }));

    // The input tree keeps the raw value next to the cleaned one.
    let tree = failure.input_tree();
    let confirm = tree.get("passwordConfirm").expect("passwordConfirm node");
    assert_eq!(confirm.value, Value::from("  abc"));
    assert_eq!(confirm.parsed, Some(Value::from("abc")));
}

#[test]
fn valid_registration_parses_clean() {
    let input = val(json!({
        "email": "ada@example.com",
        "password": "secret",
        "passwordConfirm": "secret",
        "interests": ["coding"]
    }));

    let parsed = registration_schema().parse(&input).unwrap();
    assert_eq!(parsed, input);
}

#[test]
fn parse_surfaces_failure_with_issue_list() {
    let input = val(json!({"email": 1, "interests": []}));
    let err = registration_schema().parse(&input).unwrap_err();
    match err {
        valrus::ParseError::Invalid(failure) => {
            assert!(!failure.issues.is_empty());
            // email coerces to "1"; the empty interests list is the problem.
            assert!(failure
                .issues
                .iter()
                .any(|i| i.message.as_ref() == "pick at least one interest"));
        }
        other => panic!("Expected ParseError::Invalid, got {other:?}"),
    }
}

#[tokio::test]
async fn async_username_availability_end_to_end() {
    fn username_taken(name: &str) -> bool {
        name == "admin"
    }

    let schema = Schema::object([(
        "username",
        Schema::string().refine_async(|value, scope| {
            async move {
                let taken = *scope.get::<fn(&str) -> bool>("username_taken")?;
                tokio::task::yield_now().await;
                if value.value().as_string().map(|s| taken(s)).unwrap_or(false) {
                    scope.issue("username is not available");
                }
                Ok(vec![])
            }
            .boxed_local()
        }),
    )]);

    let options =
        ParseOptions::new().with_key("username_taken", username_taken as fn(&str) -> bool);
    let outcome = schema
        .safe_parse_async_with(&val(json!({"username": "admin"})), options)
        .await
        .unwrap();
    let failure = outcome.failure().expect("expected a failed parse");
    assert_eq!(
        failure.issues[0].path,
        Path::from(vec![Segment::key("username")])
    );
    assert_eq!(failure.issues[0].message.as_ref(), "username is not available");

    let options =
        ParseOptions::new().with_key("username_taken", username_taken as fn(&str) -> bool);
    assert!(schema
        .safe_parse_async_with(&val(json!({"username": "ada"})), options)
        .await
        .unwrap()
        .is_valid());
}
