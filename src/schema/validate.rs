// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Refinement phases.
//!
//! Refinements run after the whole tree's structural phase: depth-first,
//! children before a node's own list, with the current path reset to the
//! node's own path before each entry so attribution cannot leak between
//! refinements. The synchronous pass covers the entire tree before the
//! asynchronous pass starts; asynchronous entries run strictly one at a
//! time. A node whose exact path already carries an issue skips its own
//! refinements; its children still validate independently.

use crate::context::ParseContext;
use crate::issue::{codes, Issue, IssueRef};
use crate::options::MissingKeyError;
use crate::path::{Path, Segment};
use crate::refine::{AsyncRefinement, MessageOverride, Refinement, RefineError, RefineResult};
use crate::schema::{Schema, TypeKind};
use crate::tracked::Tracked;
use crate::value::Value;

use std::rc::Rc;

use futures::future::LocalBoxFuture;

impl Schema {
    /// Run the synchronous refinements for this subtree against the parsed
    /// `value`. Only nodes the structural phase visited participate.
    pub(crate) fn validate(
        &self,
        ctx: &mut ParseContext,
        value: &Value,
    ) -> Result<(), MissingKeyError> {
        let path = ctx.path();
        let Some(record) = ctx.input_record(&path) else {
            return Ok(());
        };
        // Unions validate as the member the structural phase resolved to.
        let node = match self.kind() {
            TypeKind::Union(_) => record.node,
            _ => self.clone(),
        };

        node.validate_children(ctx, value)?;

        if ctx.has_issue_at(&path) {
            return Ok(());
        }
        for entry in &node.node().refinements {
            run_refinement(ctx, &path, entry, value)?;
        }
        Ok(())
    }

    fn validate_children(
        &self,
        ctx: &mut ParseContext,
        value: &Value,
    ) -> Result<(), MissingKeyError> {
        match self.kind() {
            TypeKind::Object(o) => {
                for (name, child) in o.properties.iter() {
                    let child_value = value[name.as_ref()].clone();
                    ctx.with_segment(Segment::Key(Rc::clone(name)), |ctx| {
                        child.validate(ctx, &child_value)
                    })?;
                }
            }
            TypeKind::Array(a) => {
                if let Ok(items) = value.as_array() {
                    let items = items.clone();
                    for (i, element) in items.iter().enumerate() {
                        if element.is_undefined() {
                            continue;
                        }
                        ctx.with_segment(Segment::Index(i), |ctx| a.items.validate(ctx, element))?;
                    }
                }
            }
            TypeKind::Record(r) => {
                if let Ok(entries) = value.as_object() {
                    let entries = entries.clone();
                    for (key, element) in entries.iter() {
                        if element.is_undefined() {
                            continue;
                        }
                        ctx.with_segment(Segment::Key(Rc::clone(key)), |ctx| {
                            r.values.validate(ctx, element)
                        })?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Asynchronous twin of [`Schema::validate`]; started only after the
    /// entire tree's synchronous pass has completed.
    pub(crate) fn validate_async<'a>(
        &'a self,
        ctx: &'a mut ParseContext,
        value: &'a Value,
    ) -> LocalBoxFuture<'a, Result<(), MissingKeyError>> {
        Box::pin(async move {
            let path = ctx.path();
            let Some(record) = ctx.input_record(&path) else {
                return Ok(());
            };
            let node = match self.kind() {
                TypeKind::Union(_) => record.node,
                _ => self.clone(),
            };

            node.validate_children_async(ctx, value).await?;

            if ctx.has_issue_at(&path) {
                return Ok(());
            }
            for entry in &node.node().async_refinements {
                run_refinement_async(ctx, &path, entry, value).await?;
            }
            Ok(())
        })
    }

    async fn validate_children_async(
        &self,
        ctx: &mut ParseContext,
        value: &Value,
    ) -> Result<(), MissingKeyError> {
        match self.kind() {
            TypeKind::Object(o) => {
                for (name, child) in o.properties.iter() {
                    let child_value = value[name.as_ref()].clone();
                    let saved = ctx.path();
                    ctx.set_path(saved.child(Segment::Key(Rc::clone(name))));
                    let result = child.validate_async(ctx, &child_value).await;
                    ctx.set_path(saved);
                    result?;
                }
            }
            TypeKind::Array(a) => {
                if let Ok(items) = value.as_array() {
                    let items = items.clone();
                    for (i, element) in items.iter().enumerate() {
                        if element.is_undefined() {
                            continue;
                        }
                        let saved = ctx.path();
                        ctx.set_path(saved.child(Segment::Index(i)));
                        let result = a.items.validate_async(ctx, element).await;
                        ctx.set_path(saved);
                        result?;
                    }
                }
            }
            TypeKind::Record(r) => {
                if let Ok(entries) = value.as_object() {
                    let entries = entries.clone();
                    for (key, element) in entries.iter() {
                        if element.is_undefined() {
                            continue;
                        }
                        let saved = ctx.path();
                        ctx.set_path(saved.child(Segment::Key(Rc::clone(key))));
                        let result = r.values.validate_async(ctx, element).await;
                        ctx.set_path(saved);
                        result?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn run_refinement(
    ctx: &mut ParseContext,
    path: &Path,
    entry: &Refinement,
    value: &Value,
) -> Result<(), MissingKeyError> {
    let scope = ctx.refine_scope(path.clone());
    let tracked = Tracked::new(value.clone(), path.clone(), scope.cursor());
    let result = (entry.run)(tracked, scope.clone());
    finish_refinement(ctx, path, entry.message.as_ref(), scope.take_raised(), result)
}

async fn run_refinement_async(
    ctx: &mut ParseContext,
    path: &Path,
    entry: &AsyncRefinement,
    value: &Value,
) -> Result<(), MissingKeyError> {
    let scope = ctx.refine_scope(path.clone());
    let tracked = Tracked::new(value.clone(), path.clone(), scope.cursor());
    let result = (entry.run)(tracked, scope.clone()).await;
    finish_refinement(ctx, path, entry.message.as_ref(), scope.take_raised(), result)
}

/// Merge one refinement's outcome into the context: collapse collected
/// issues under a message override, convert a failure into an `exception`
/// issue at the node's own path, and re-raise the missing-key error.
fn finish_refinement(
    ctx: &mut ParseContext,
    path: &Path,
    message: Option<&MessageOverride>,
    mut collected: Vec<IssueRef>,
    result: RefineResult,
) -> Result<(), MissingKeyError> {
    let mut exception = None;
    match result {
        Ok(returned) => collected.extend(returned.into_iter().map(Rc::new)),
        Err(RefineError::MissingKey(e)) => return Err(e),
        Err(RefineError::Failure(text)) => {
            exception = Some(Issue::new(path.clone(), codes::EXCEPTION, text));
        }
    }

    match (message, collected.is_empty()) {
        (Some(replacement), false) => {
            // Originals never reached the context; only the replacement
            // does, at the node's own path.
            let issue = replacement.apply(&collected[0], path);
            ctx.raise(issue);
        }
        _ => {
            for issue in collected {
                ctx.add_issue(issue);
            }
        }
    }

    if let Some(issue) = exception {
        ctx.raise(issue);
    }
    Ok(())
}
