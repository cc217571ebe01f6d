// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Union member resolution.
//!
//! Before any checking, a union node delegates to one concrete member:
//! first by matching discriminant fields (literal-valued object
//! properties), then, for unions that are not fully discriminated, by
//! trying each member in declared order against an isolated clone of the
//! context and keeping the first whose trial adds no issues. Rejected
//! trials leak nothing into the real context. When nothing qualifies, the
//! first declared member is the stable fallback and raises its own issues.

use crate::context::ParseContext;
use crate::schema::{Schema, TypeKind};
use crate::value::Value;

use tracing::debug;

impl Schema {
    /// The concrete node to parse `raw` with. Non-union schemas resolve to
    /// themselves; nested unions resolve through.
    pub(crate) fn resolve(&self, ctx: &mut ParseContext, raw: &Value) -> Schema {
        let mut current = self.clone();
        loop {
            let next = match current.kind() {
                TypeKind::Union(u) if !u.members.is_empty() => {
                    resolve_members(&u.members, ctx, raw)
                }
                _ => return current,
            };
            current = next;
        }
    }
}

fn resolve_members(members: &[Schema], ctx: &mut ParseContext, raw: &Value) -> Schema {
    // (1) Discriminant match: an object member whose literal-valued
    // properties all match the input selects itself.
    let mut all_discriminated = true;
    for member in members {
        let literals = match member.kind() {
            TypeKind::Object(o) => o.literal_properties(),
            _ => {
                all_discriminated = false;
                continue;
            }
        };
        if literals.is_empty() {
            all_discriminated = false;
            continue;
        }
        if let Ok(object) = raw.as_object() {
            if literals
                .iter()
                .all(|(name, expected)| object.get(name.as_ref()) == Some(expected))
            {
                debug!(member = member.kind_name(), "union resolved by discriminant");
                return member.clone();
            }
        }
    }

    // (2) Fully discriminated but nothing matched: stable first-member
    // fallback, which will raise its own issues.
    if all_discriminated {
        return members[0].clone();
    }

    // (3) Ordered pure trials.
    for (index, member) in members.iter().enumerate() {
        let mut trial = ctx.trial_clone();
        let before = trial.issue_count();
        member.parse_input(&mut trial, raw);
        if trial.issue_count() == before {
            debug!(index, "union resolved by trial");
            return member.clone();
        }
    }

    members[0].clone()
}
