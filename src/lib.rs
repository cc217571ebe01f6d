// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! valrus: a schema-driven validation engine.
//!
//! Declarative [`Schema`] trees describe the shape of untrusted input;
//! parsing produces typed data while collecting structured, per-field
//! [`Issue`]s instead of failing on the first error. Validation is
//! two-phase: a structural pass (type checks with coercion fallbacks), then
//! user refinements, synchronous across the whole tree first, asynchronous
//! after. Inside a refinement, field access through the [`Tracked`] view
//! attributes issues to the most recently read field without spelling out
//! a path.

mod context;
mod extension;
mod issue;
mod number;
mod options;
mod path;
mod refine;
mod report;
mod schema;
mod tracked;
mod value;

pub use context::{InputRecord, ParseContext, RefineScope};
pub use extension::{Extension, ExtensionRegistry, RegistryError};
pub use issue::{codes, Issue, IssueRef};
pub use number::Number;
pub use options::{BooleanPolicy, MissingKeyError, NumberPolicy, ParseOptions, StringPolicy};
pub use path::{Path, Segment};
pub use refine::{
    AsyncValidator, MessageOverride, OverrideOutput, RefineError, RefineResult, SyncValidator,
};
pub use report::InputNode;
pub use schema::{ParseError, ParseFailure, Parsed, Schema};
pub use tracked::Tracked;
pub use value::Value;
