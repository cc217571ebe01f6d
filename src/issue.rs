// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Validation issues.

use crate::path::Path;

use core::fmt;
use std::rc::Rc;

/// Issue codes produced by the engine itself. Refinements may use any code;
/// [`codes::CUSTOM`] is the default for user-raised issues.
pub mod codes {
    /// Structural mismatch between the input and the node's type.
    pub const INVALID_TYPE: &str = "invalid_type";
    /// Input was null or missing where the node forbids it.
    pub const REQUIRED: &str = "required";
    /// A refinement callback failed with an error.
    pub const EXCEPTION: &str = "exception";
    /// Default code for issues raised by refinements.
    pub const CUSTOM: &str = "custom";
}

/// One structured validation error, attributed to a field path.
///
/// Issues accumulate in the parse context rather than aborting the parse.
/// The context deduplicates by identity ([`Rc::ptr_eq`]), not by content:
/// the same handle added twice counts once, while two issues with identical
/// content but separate allocations both count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub path: Path,
    pub code: Rc<str>,
    pub message: Rc<str>,
}

impl Issue {
    pub fn new(path: Path, code: impl Into<Rc<str>>, message: impl Into<Rc<str>>) -> Issue {
        Issue {
            path,
            code: code.into(),
            message: message.into(),
        }
    }

    /// A `custom`-coded issue, the shape refinements usually produce.
    pub fn custom(path: Path, message: impl Into<Rc<str>>) -> Issue {
        Issue::new(path, codes::CUSTOM, message)
    }

    pub(crate) fn invalid_type(path: Path, expected: &str, actual: &str) -> Issue {
        Issue::new(
            path,
            codes::INVALID_TYPE,
            format!("expected {expected}, got {actual}"),
        )
    }

    pub(crate) fn required(path: Path) -> Issue {
        Issue::new(path, codes::REQUIRED, "required value is missing")
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] at '{}': {}", self.code, self.path, self.message)
    }
}

/// Shared issue handle. Identity of the handle is the issue's identity for
/// deduplication and removal.
pub type IssueRef = Rc<Issue>;
