// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Refinement entries and message overrides.
//!
//! A refinement is a user-supplied validator run after structural parsing.
//! Entries are either anonymous (`.refine(..)`) or named with retained call
//! arguments when produced by an extension. Synchronous and asynchronous
//! entries live in separate ordered lists on the node.

use crate::context::RefineScope;
use crate::issue::{codes, Issue};
use crate::options::MissingKeyError;
use crate::path::Path;
use crate::tracked::Tracked;
use crate::value::Value;

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use thiserror::Error;

/// Error surface of a refinement callback.
///
/// `Failure` is the "refinement threw" case: recovered into an `exception`
/// issue at the node's own path so one misbehaving refinement cannot abort
/// the parse. `MissingKey` is the designated configuration error and
/// propagates out of the whole parse unchanged.
#[derive(Debug, Clone, Error)]
pub enum RefineError {
    #[error("{0}")]
    Failure(Rc<str>),

    #[error(transparent)]
    MissingKey(#[from] MissingKeyError),
}

impl RefineError {
    pub fn failure(message: impl Into<Rc<str>>) -> RefineError {
        RefineError::Failure(message.into())
    }
}

/// A refinement returns the issues it wants recorded (possibly none), on
/// top of whatever it raised through the scope, or fails.
pub type RefineResult = Result<Vec<Issue>, RefineError>;

pub type SyncValidator = Rc<dyn Fn(Tracked, RefineScope) -> RefineResult>;

pub type AsyncValidator = Rc<dyn Fn(Tracked, RefineScope) -> LocalBoxFuture<'static, RefineResult>>;

/// Replacement text for issues: either a fixed string or a callback that
/// inspects the original issue and produces a string or a full issue.
#[derive(Clone)]
pub enum MessageOverride {
    Text(Rc<str>),
    With(Rc<dyn Fn(&Issue) -> OverrideOutput>),
}

/// What a [`MessageOverride::With`] callback produces.
pub enum OverrideOutput {
    Message(Rc<str>),
    Issue(Issue),
}

impl MessageOverride {
    pub fn with(f: impl Fn(&Issue) -> OverrideOutput + 'static) -> MessageOverride {
        MessageOverride::With(Rc::new(f))
    }

    /// Apply to `original`, producing the replacement issue anchored at
    /// `path` (the issue's own path for core overrides, the node's own path
    /// for refinement overrides).
    pub(crate) fn apply(&self, original: &Issue, path: &Path) -> Issue {
        match self {
            MessageOverride::Text(message) => {
                Issue::new(path.clone(), Rc::clone(&original.code), Rc::clone(message))
            }
            MessageOverride::With(f) => match f(original) {
                OverrideOutput::Message(message) => {
                    Issue::new(path.clone(), Rc::clone(&original.code), message)
                }
                OverrideOutput::Issue(issue) => issue,
            },
        }
    }
}

impl From<&str> for MessageOverride {
    fn from(s: &str) -> Self {
        MessageOverride::Text(s.into())
    }
}

impl From<String> for MessageOverride {
    fn from(s: String) -> Self {
        MessageOverride::Text(s.into())
    }
}

impl core::fmt::Debug for MessageOverride {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MessageOverride::Text(s) => f.debug_tuple("Text").field(s).finish(),
            MessageOverride::With(_) => f.write_str("With(..)"),
        }
    }
}

/// Which core issue a node-level override replaces. Only the two structural
/// codes can be overridden this way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreCode {
    InvalidType,
    Required,
}

impl CoreCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoreCode::InvalidType => codes::INVALID_TYPE,
            CoreCode::Required => codes::REQUIRED,
        }
    }
}

/// A node-level override for one core issue code.
#[derive(Debug, Clone)]
pub struct CoreOverride {
    pub code: CoreCode,
    pub message: MessageOverride,
}

/// One synchronous refinement entry.
#[derive(Clone)]
pub struct Refinement {
    /// Extension name, `None` for anonymous `.refine(..)` entries.
    pub(crate) name: Option<Rc<str>>,
    /// Call arguments retained for introspection.
    pub(crate) args: Vec<Value>,
    pub(crate) run: SyncValidator,
    pub(crate) message: Option<MessageOverride>,
}

impl core::fmt::Debug for Refinement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Refinement")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("message", &self.message)
            .finish()
    }
}

/// One asynchronous refinement entry.
#[derive(Clone)]
pub struct AsyncRefinement {
    pub(crate) name: Option<Rc<str>>,
    pub(crate) args: Vec<Value>,
    pub(crate) run: AsyncValidator,
    pub(crate) message: Option<MessageOverride>,
}

impl core::fmt::Debug for AsyncRefinement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncRefinement")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("message", &self.message)
            .finish()
    }
}
