// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Path-tracking view of a value.
//!
//! Inside a refinement callback the author navigates the value with
//! ordinary-looking accessors and then raises an issue without naming a
//! path; the issue must attach to the most recently accessed field. Since
//! raw struct field access cannot be intercepted in Rust, all reads are
//! routed through [`Tracked`]: every access moves a cursor shared with the
//! [`RefineScope`](crate::RefineScope) to the accessed child's path before
//! yielding the child. Each wrapper carries the path it was built for, so
//! looking a wrapper's path back up needs no side table.

use crate::path::{Path, Segment};
use crate::value::Value;

use std::cell::RefCell;
use std::rc::Rc;

/// A value wrapper that records where in the input tree it lives and
/// updates the shared cursor on every access.
#[derive(Clone)]
pub struct Tracked {
    value: Value,
    path: Path,
    cursor: Rc<RefCell<Path>>,
}

impl Tracked {
    pub(crate) fn new(value: Value, path: Path, cursor: Rc<RefCell<Path>>) -> Tracked {
        Tracked {
            value,
            path,
            cursor,
        }
    }

    /// The wrapped value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The path this wrapper was constructed for.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access an object field. The cursor moves to the field's path before
    /// the child is returned; absent fields yield an `Undefined` wrapper at
    /// the same path so definedness checks still attribute correctly.
    pub fn get(&self, key: &str) -> Tracked {
        self.descend(Segment::key(key), self.value[key].clone())
    }

    /// Access an array element by index.
    pub fn at(&self, index: usize) -> Tracked {
        self.descend(Segment::index(index), self.value[index].clone())
    }

    /// Iterate an array, moving the cursor to each element's path as it is
    /// yielded. Sparse (undefined) slots are skipped. Non-arrays yield
    /// nothing.
    pub fn iter(&self) -> TrackedIter {
        let len = self.value.as_array().map(Vec::len).unwrap_or(0);
        TrackedIter {
            parent: self.clone(),
            next: 0,
            len,
        }
    }

    /// Iterate an object's entries, moving the cursor per visited key.
    /// Undefined values are skipped. Non-objects yield nothing.
    pub fn entries(&self) -> Vec<(Rc<str>, Tracked)> {
        match self.value.as_object() {
            Ok(map) => map
                .iter()
                .filter(|(_, v)| !v.is_undefined())
                .map(|(k, _)| (Rc::clone(k), self.get(k)))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn descend(&self, segment: Segment, child: Value) -> Tracked {
        let path = self.path.child(segment);
        *self.cursor.borrow_mut() = path.clone();
        Tracked {
            value: child,
            path,
            cursor: Rc::clone(&self.cursor),
        }
    }
}

impl core::fmt::Debug for Tracked {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracked")
            .field("path", &self.path)
            .field("value", &self.value)
            .finish()
    }
}

pub struct TrackedIter {
    parent: Tracked,
    next: usize,
    len: usize,
}

impl Iterator for TrackedIter {
    type Item = Tracked;

    fn next(&mut self) -> Option<Tracked> {
        while self.next < self.len {
            let index = self.next;
            self.next += 1;
            if self.parent.value[index].is_undefined() {
                continue;
            }
            return Some(self.parent.at(index));
        }
        None
    }
}
