// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Parse outcomes and failure surfaces.

use crate::context::{InputMap, ParseContext};
use crate::issue::IssueRef;
use crate::options::MissingKeyError;
use crate::report::InputNode;
use crate::value::Value;

use thiserror::Error;

/// Outcome of a `safe_parse*` call. Data-shaped problems always land here
/// as `Invalid`, never as an error.
#[derive(Debug)]
pub enum Parsed {
    Valid(Value),
    Invalid(ParseFailure),
}

impl Parsed {
    pub(crate) fn from_context(ctx: ParseContext, parsed: Value) -> Parsed {
        let (issues, inputs) = ctx.into_parts();
        if issues.is_empty() {
            Parsed::Valid(parsed)
        } else {
            Parsed::Invalid(ParseFailure { issues, inputs })
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Parsed::Valid(_))
    }

    /// The parsed value, if validation produced no issues.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Parsed::Valid(value) => Some(value),
            Parsed::Invalid(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            Parsed::Valid(_) => None,
            Parsed::Invalid(failure) => Some(failure),
        }
    }
}

/// A failed parse: the flat issue list plus everything needed to
/// reconstruct the per-field input tree for form-style rendering.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub issues: Vec<IssueRef>,
    pub(crate) inputs: InputMap,
}

impl ParseFailure {
    /// Reconstruct the shape-mirroring input tree: raw value, parsed value
    /// and issues per visited field, branch-own issues on branches.
    pub fn input_tree(&self) -> InputNode {
        InputNode::build(&self.inputs, &self.issues)
    }
}

impl core::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "validation failed with {} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  {issue}")?;
        }
        Ok(())
    }
}

/// Errors surfaced by the entry points.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Validation produced issues (`parse`/`parse_async` only;
    /// `safe_parse*` report these through [`Parsed::Invalid`]).
    #[error("{0}")]
    Invalid(ParseFailure),

    /// A refinement asked for a context key the caller never supplied.
    /// Indicates a configuration bug, never a data problem.
    #[error(transparent)]
    MissingKey(#[from] MissingKeyError),

    /// A synchronous entry point was called on a tree containing
    /// asynchronous refinements.
    #[error("schema contains asynchronous validators; use parse_async or safe_parse_async")]
    AsyncValidators,
}
