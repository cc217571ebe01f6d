// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-call parse state.
//!
//! A [`ParseContext`] is created for one `parse`/`safe_parse` invocation and
//! discarded afterwards: it tracks the current field path, records the raw
//! and parsed value seen at every visited path, and accumulates issues.
//! Type nodes stay read-only throughout, which is what makes a single
//! schema safely reusable across concurrent parse calls.

use crate::issue::{Issue, IssueRef};
use crate::options::{MissingKeyError, ParseOptions};
use crate::path::{Path, Segment};
use crate::schema::Schema;
use crate::value::Value;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// What the structural phase recorded at one path.
#[derive(Debug, Clone)]
pub struct InputRecord {
    /// The raw input value seen at this path.
    pub raw: Value,
    /// The successfully parsed value, `None` if parsing failed here.
    pub parsed: Option<Value>,
    /// The node that parsed this path, after union resolution.
    pub node: Schema,
}

pub(crate) type InputMap = BTreeMap<Path, InputRecord>;

pub struct ParseContext {
    // Shared with Tracked wrappers and RefineScope so that field access
    // inside a refinement can move the cursor.
    cursor: Rc<RefCell<Path>>,
    inputs: Rc<RefCell<InputMap>>,
    issues: Vec<IssueRef>,
    options: Rc<ParseOptions>,
}

impl ParseContext {
    pub fn new(options: ParseOptions) -> ParseContext {
        ParseContext {
            cursor: Rc::new(RefCell::new(Path::root())),
            inputs: Rc::new(RefCell::new(BTreeMap::new())),
            issues: Vec::new(),
            options: Rc::new(options),
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The current path, cloned out of the cursor.
    pub fn path(&self) -> Path {
        self.cursor.borrow().clone()
    }

    pub(crate) fn set_path(&self, path: Path) {
        *self.cursor.borrow_mut() = path;
    }

    pub(crate) fn cursor(&self) -> Rc<RefCell<Path>> {
        Rc::clone(&self.cursor)
    }

    /// Descend into `segment` for the duration of `f`. The previous path is
    /// restored on every exit, including early `?` returns inside `f`.
    pub(crate) fn with_segment<T>(
        &mut self,
        segment: Segment,
        f: impl FnOnce(&mut ParseContext) -> T,
    ) -> T {
        let saved = self.path();
        self.cursor.borrow_mut().push(segment);
        let result = f(self);
        self.set_path(saved);
        result
    }

    /// Add an issue unless this exact handle is already present. Dedup is
    /// by handle identity, not content.
    pub fn add_issue(&mut self, issue: IssueRef) {
        if !self.issues.iter().any(|i| Rc::ptr_eq(i, &issue)) {
            self.issues.push(issue);
        }
    }

    pub fn raise(&mut self, issue: Issue) -> IssueRef {
        let issue = Rc::new(issue);
        self.issues.push(Rc::clone(&issue));
        issue
    }

    /// Remove an issue by handle identity.
    pub fn remove_issue(&mut self, issue: &IssueRef) {
        self.issues.retain(|i| !Rc::ptr_eq(i, issue));
    }

    pub fn issues(&self) -> &[IssueRef] {
        &self.issues
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    pub fn has_issue_at(&self, path: &Path) -> bool {
        self.issues.iter().any(|i| &i.path == path)
    }

    pub fn issues_at(&self, path: &Path) -> Vec<IssueRef> {
        self.issues
            .iter()
            .filter(|i| &i.path == path)
            .cloned()
            .collect()
    }

    /// Record what the structural phase saw at the current path.
    pub(crate) fn record_input(&mut self, raw: Value, parsed: Option<Value>, node: Schema) {
        let path = self.path();
        self.inputs
            .borrow_mut()
            .insert(path, InputRecord { raw, parsed, node });
    }

    pub fn input_record(&self, path: &Path) -> Option<InputRecord> {
        self.inputs.borrow().get(path).cloned()
    }

    /// Whether the *original raw input* at `path` was present and non-null.
    /// Structural parsing normalizes optional fields to their defaults, so
    /// this is the only reliable definedness check after the fact.
    pub fn raw_defined(&self, path: &Path) -> bool {
        match self.inputs.borrow().get(path) {
            Some(record) => !record.raw.is_absent(),
            None => false,
        }
    }

    /// An isolated copy for a union member trial. Issues, inputs and the
    /// cursor are copied; nothing a trial does leaks back.
    pub(crate) fn trial_clone(&self) -> ParseContext {
        ParseContext {
            cursor: Rc::new(RefCell::new(self.path())),
            inputs: Rc::new(RefCell::new(self.inputs.borrow().clone())),
            issues: self.issues.clone(),
            options: Rc::clone(&self.options),
        }
    }

    /// Build the scope handed to one refinement run, with the cursor reset
    /// to the node's own path.
    pub(crate) fn refine_scope(&self, base: Path) -> RefineScope {
        self.set_path(base.clone());
        RefineScope {
            base,
            cursor: Rc::clone(&self.cursor),
            options: Rc::clone(&self.options),
            inputs: Rc::clone(&self.inputs),
            raised: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<IssueRef>, InputMap) {
        let inputs = match Rc::try_unwrap(self.inputs) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.borrow().clone(),
        };
        (self.issues, inputs)
    }
}

/// The context-like handle a refinement callback receives.
///
/// It exposes issue raising, the options-bag accessor and raw-input
/// definedness checks, but no path manipulation or child-issue inspection.
/// Issues raised here are buffered and merged into the parse context after
/// the callback returns, so a message override can collapse them without
/// ever touching the shared issue list.
#[derive(Clone)]
pub struct RefineScope {
    base: Path,
    cursor: Rc<RefCell<Path>>,
    options: Rc<ParseOptions>,
    inputs: Rc<RefCell<InputMap>>,
    raised: Rc<RefCell<Vec<IssueRef>>>,
}

impl RefineScope {
    /// The path of the most recently accessed field, initially the node's
    /// own path.
    pub fn path(&self) -> Path {
        self.cursor.borrow().clone()
    }

    /// The node's own path, independent of any field access.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Raise a `custom` issue attributed to the most recently accessed
    /// field.
    pub fn issue(&self, message: impl Into<Rc<str>>) {
        let issue = Issue::custom(self.path(), message);
        self.raised.borrow_mut().push(Rc::new(issue));
    }

    /// Raise an issue with an explicit code, attributed to the most
    /// recently accessed field.
    pub fn issue_with_code(&self, code: impl Into<Rc<str>>, message: impl Into<Rc<str>>) {
        let issue = Issue::new(self.path(), code, message);
        self.raised.borrow_mut().push(Rc::new(issue));
    }

    /// Raise a fully formed issue as constructed by the caller.
    pub fn raise(&self, issue: Issue) {
        self.raised.borrow_mut().push(Rc::new(issue));
    }

    /// Build (but do not raise) a `custom` issue at the most recently
    /// accessed field, for return-style refinements.
    pub fn failure(&self, message: impl Into<Rc<str>>) -> Issue {
        Issue::custom(self.path(), message)
    }

    /// Retrieve a caller-supplied runtime dependency from the options bag.
    /// The missing-key error propagates out of the whole parse unchanged.
    pub fn get<T: 'static>(&self, key: &str) -> Result<Rc<T>, MissingKeyError> {
        self.options.get(key)
    }

    /// Whether the original raw input at `tracked`'s path was present and
    /// non-null.
    pub fn is_defined(&self, tracked: &crate::tracked::Tracked) -> bool {
        self.defined_at(tracked.path())
    }

    /// Path-based variant of [`RefineScope::is_defined`].
    pub fn defined_at(&self, path: &Path) -> bool {
        match self.inputs.borrow().get(path) {
            Some(record) => !record.raw.is_absent(),
            None => false,
        }
    }

    pub(crate) fn cursor(&self) -> Rc<RefCell<Path>> {
        Rc::clone(&self.cursor)
    }

    pub(crate) fn take_raised(&self) -> Vec<IssueRef> {
        core::mem::take(&mut *self.raised.borrow_mut())
    }
}
