// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Parsed-input tree reconstruction.
//!
//! For form-style error rendering a failed parse exposes a tree mirroring
//! the schema's shape: every visited field carries the raw value seen
//! there, the successfully parsed value (if any) and the issues raised at
//! exactly that path. Branches additionally carry their own issues:
//! issues attributed to the branch itself, not to its descendants.

use crate::context::InputMap;
use crate::issue::IssueRef;
use crate::path::Segment;
use crate::value::Value;

use std::collections::BTreeMap;
use std::rc::Rc;

/// One field of the parsed-input tree.
#[derive(Debug, Clone)]
pub struct InputNode {
    /// Raw input seen at this path; `Undefined` when the path was never
    /// visited (issue-only nodes).
    pub value: Value,
    /// The successfully parsed value, `None` if parsing failed here.
    pub parsed: Option<Value>,
    /// Issues raised with exactly this path.
    pub issues: Vec<IssueRef>,
    children: BTreeMap<Segment, InputNode>,
}

impl InputNode {
    fn empty() -> InputNode {
        InputNode {
            value: Value::Undefined,
            parsed: None,
            issues: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    pub(crate) fn build(inputs: &InputMap, issues: &[IssueRef]) -> InputNode {
        let mut root = InputNode::empty();
        for (path, record) in inputs.iter() {
            let node = root.ensure(path.segments());
            node.value = record.raw.clone();
            node.parsed = record.parsed.clone();
        }
        for issue in issues {
            let node = root.ensure(issue.path.segments());
            node.issues.push(Rc::clone(issue));
        }
        root
    }

    fn ensure(&mut self, segments: &[Segment]) -> &mut InputNode {
        match segments.first() {
            None => self,
            Some(segment) => self
                .children
                .entry(segment.clone())
                .or_insert_with(InputNode::empty)
                .ensure(&segments[1..]),
        }
    }

    /// Child by object key.
    pub fn get(&self, key: &str) -> Option<&InputNode> {
        self.children.get(&Segment::key(key))
    }

    /// Child by array index.
    pub fn at(&self, index: usize) -> Option<&InputNode> {
        self.children.get(&Segment::Index(index))
    }

    pub fn children(&self) -> impl Iterator<Item = (&Segment, &InputNode)> {
        self.children.iter()
    }

    pub fn is_branch(&self) -> bool {
        !self.children.is_empty()
    }
}
