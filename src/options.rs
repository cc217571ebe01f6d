// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-call parse options.
//!
//! The options bag carries the reserved scalar-policy namespaces (`string`,
//! `number`, `boolean`) consumed by the matching node kinds, plus a
//! free-form keyed store for runtime dependencies that refinements retrieve
//! through [`crate::RefineScope::get`].

use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;

use thiserror::Error;

/// A refinement asked for an options key the caller never supplied.
///
/// This is a caller configuration bug, not a data validation outcome: it is
/// the one error that unwinds through refinement execution, override
/// handling and child recursion unchanged instead of being recovered into
/// an `exception` issue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("context key `{0}` is not defined")]
pub struct MissingKeyError(pub Rc<str>);

/// String-node policy. Unset fields fall back to the node's own
/// configuration and finally to the engine defaults (coerce and trim on,
/// empty strings allowed).
#[derive(Debug, Clone, Copy, Default)]
pub struct StringPolicy {
    pub coerce: Option<bool>,
    pub trim: Option<bool>,
    pub empty: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberPolicy {
    pub coerce: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanPolicy {
    pub coerce: Option<bool>,
}

/// Options for one `parse`/`safe_parse` invocation.
#[derive(Clone, Default)]
pub struct ParseOptions {
    pub string: StringPolicy,
    pub number: NumberPolicy,
    pub boolean: BooleanPolicy,
    keys: BTreeMap<Rc<str>, Rc<dyn Any>>,
}

impl ParseOptions {
    pub fn new() -> ParseOptions {
        ParseOptions::default()
    }

    pub fn string(mut self, policy: StringPolicy) -> ParseOptions {
        self.string = policy;
        self
    }

    pub fn number(mut self, policy: NumberPolicy) -> ParseOptions {
        self.number = policy;
        self
    }

    pub fn boolean(mut self, policy: BooleanPolicy) -> ParseOptions {
        self.boolean = policy;
        self
    }

    /// Store an arbitrary value under `key` for retrieval inside
    /// refinements. Function dependencies are typically stored as plain
    /// `fn` pointers so the retrieval type is nameable.
    pub fn with_key<T: 'static>(mut self, key: impl Into<Rc<str>>, value: T) -> ParseOptions {
        self.keys.insert(key.into(), Rc::new(value));
        self
    }

    /// Retrieve a previously stored key, downcast to `T`.
    pub fn get<T: 'static>(&self, key: &str) -> Result<Rc<T>, MissingKeyError> {
        self.keys
            .get(key)
            .and_then(|v| Rc::clone(v).downcast::<T>().ok())
            .ok_or_else(|| MissingKeyError(key.into()))
    }
}

impl core::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("string", &self.string)
            .field("number", &self.number)
            .field("boolean", &self.boolean)
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}
