// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The type-node hierarchy.
//!
//! A [`Schema`] is an immutable description of one value's shape and
//! validation rules: a kind (scalar, literal, object, array, record or
//! union), optionality/nullability flags, core-issue message overrides and
//! two ordered refinement lists (synchronous and asynchronous). Composite
//! kinds own their child schemas, so schemas compose into trees.
//!
//! Schemas are built once and reused across many parse calls. Every
//! chainable configuration call clones the underlying node, a shallow copy
//! that shares child references but gets independent validator lists, so a
//! previously constructed schema is never mutated by later chaining:
//!
//! ```rust
//! use valrus::{Schema, Value};
//!
//! let base = Schema::string();
//! let required = base.clone();
//! let relaxed = base.optional();
//! // `required` still rejects missing input; `relaxed` does not.
//! # let _ = (required, relaxed);
//! ```
//!
//! Parsing is two-phase: a structural pass (type check, coercion fallback,
//! normalization, recursion into children) followed by refinements:
//! all synchronous refinements across the whole tree first, then all
//! asynchronous ones, both depth-first child-before-parent.

use crate::context::ParseContext;
use crate::issue::Issue;
use crate::options::{BooleanPolicy, NumberPolicy, ParseOptions, StringPolicy};
use crate::path::Path;
use crate::refine::{
    AsyncRefinement, AsyncValidator, CoreCode, CoreOverride, MessageOverride, Refinement,
    RefineResult, SyncValidator,
};
use crate::tracked::Tracked;
use crate::value::Value;

use std::collections::BTreeMap;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

pub mod error;
mod parse;
mod resolve;
mod validate;

pub use error::{ParseError, ParseFailure, Parsed};

/// A schema value: a shared, immutable type node.
#[derive(Clone)]
pub struct Schema {
    node: Rc<TypeNode>,
}

#[derive(Clone)]
pub(crate) struct TypeNode {
    pub(crate) kind: TypeKind,
    pub(crate) optional: bool,
    pub(crate) nullable: bool,
    pub(crate) default: Option<Value>,
    pub(crate) overrides: Vec<CoreOverride>,
    pub(crate) refinements: Vec<Refinement>,
    pub(crate) async_refinements: Vec<AsyncRefinement>,
}

#[derive(Clone)]
pub(crate) enum TypeKind {
    String(StringPolicy),
    Number(NumberPolicy),
    Boolean(BooleanPolicy),
    /// A fixed value; object properties of this kind act as union
    /// discriminants.
    Literal(Value),
    Object(ObjectKind),
    Array(ArrayKind),
    Record(RecordKind),
    Union(UnionKind),
}

#[derive(Clone)]
pub(crate) struct ObjectKind {
    pub(crate) properties: Rc<BTreeMap<Rc<str>, Schema>>,
}

impl ObjectKind {
    /// Property names whose schema is a literal, in map order. These are
    /// the discriminant candidates for union resolution.
    pub(crate) fn literal_properties(&self) -> Vec<(Rc<str>, Value)> {
        self.properties
            .iter()
            .filter_map(|(name, schema)| match &schema.node.kind {
                TypeKind::Literal(v) => Some((Rc::clone(name), v.clone())),
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone)]
pub(crate) struct ArrayKind {
    pub(crate) items: Schema,
    /// Wrap a scalar input into a one-element array instead of rejecting.
    pub(crate) wrap: bool,
}

#[derive(Clone)]
pub(crate) struct RecordKind {
    pub(crate) values: Schema,
}

#[derive(Clone)]
pub(crate) struct UnionKind {
    pub(crate) members: Rc<Vec<Schema>>,
}

impl Schema {
    fn from_kind(kind: TypeKind) -> Schema {
        Schema {
            node: Rc::new(TypeNode {
                kind,
                optional: false,
                nullable: false,
                default: None,
                overrides: Vec::new(),
                refinements: Vec::new(),
                async_refinements: Vec::new(),
            }),
        }
    }

    pub fn string() -> Schema {
        Schema::from_kind(TypeKind::String(StringPolicy::default()))
    }

    pub fn number() -> Schema {
        Schema::from_kind(TypeKind::Number(NumberPolicy::default()))
    }

    pub fn boolean() -> Schema {
        Schema::from_kind(TypeKind::Boolean(BooleanPolicy::default()))
    }

    pub fn literal(value: impl Into<Value>) -> Schema {
        Schema::from_kind(TypeKind::Literal(value.into()))
    }

    pub fn object<K: Into<Rc<str>>>(properties: impl IntoIterator<Item = (K, Schema)>) -> Schema {
        let properties = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<BTreeMap<_, _>>();
        Schema::from_kind(TypeKind::Object(ObjectKind {
            properties: Rc::new(properties),
        }))
    }

    pub fn array(items: Schema) -> Schema {
        Schema::from_kind(TypeKind::Array(ArrayKind { items, wrap: false }))
    }

    pub fn record(values: Schema) -> Schema {
        Schema::from_kind(TypeKind::Record(RecordKind { values }))
    }

    pub fn union(members: impl IntoIterator<Item = Schema>) -> Schema {
        Schema::from_kind(TypeKind::Union(UnionKind {
            members: Rc::new(members.into_iter().collect()),
        }))
    }

    pub(crate) fn kind(&self) -> &TypeKind {
        &self.node.kind
    }

    pub(crate) fn node(&self) -> &TypeNode {
        &self.node
    }

    /// Clone the node, apply `f`, and wrap the result. Children stay
    /// shared; validator lists become independent copies.
    fn update(&self, f: impl FnOnce(&mut TypeNode)) -> Schema {
        let mut node = (*self.node).clone();
        f(&mut node);
        Schema {
            node: Rc::new(node),
        }
    }

    /// Accept missing input, parsing it to the default value.
    pub fn optional(&self) -> Schema {
        self.update(|node| node.optional = true)
    }

    /// Accept null input, parsing it to the default value.
    pub fn nullable(&self) -> Schema {
        self.update(|node| node.nullable = true)
    }

    /// Override the kind default used when input is absent or unusable.
    pub fn with_default(&self, value: impl Into<Value>) -> Schema {
        let value = value.into();
        self.update(|node| node.default = Some(value))
    }

    /// Replace the message of `invalid_type` issues raised at this node.
    pub fn invalid_type_message(&self, message: impl Into<MessageOverride>) -> Schema {
        let message = message.into();
        self.update(|node| {
            node.overrides.push(CoreOverride {
                code: CoreCode::InvalidType,
                message,
            })
        })
    }

    /// Replace the message of `required` issues raised at this node.
    pub fn required_message(&self, message: impl Into<MessageOverride>) -> Schema {
        let message = message.into();
        self.update(|node| {
            node.overrides.push(CoreOverride {
                code: CoreCode::Required,
                message,
            })
        })
    }

    /// Append an anonymous synchronous refinement.
    pub fn refine(&self, f: impl Fn(Tracked, crate::RefineScope) -> RefineResult + 'static) -> Schema {
        self.push_sync(None, Vec::new(), Rc::new(f), None)
    }

    /// Append an anonymous synchronous refinement whose issues collapse
    /// into a single overridden issue at this node's path.
    pub fn refine_with_message(
        &self,
        f: impl Fn(Tracked, crate::RefineScope) -> RefineResult + 'static,
        message: impl Into<MessageOverride>,
    ) -> Schema {
        self.push_sync(None, Vec::new(), Rc::new(f), Some(message.into()))
    }

    /// Append an anonymous asynchronous refinement.
    pub fn refine_async(
        &self,
        f: impl Fn(Tracked, crate::RefineScope) -> LocalBoxFuture<'static, RefineResult> + 'static,
    ) -> Schema {
        self.push_async(None, Vec::new(), Rc::new(f), None)
    }

    /// Append an anonymous asynchronous refinement with a message override.
    pub fn refine_async_with_message(
        &self,
        f: impl Fn(Tracked, crate::RefineScope) -> LocalBoxFuture<'static, RefineResult> + 'static,
        message: impl Into<MessageOverride>,
    ) -> Schema {
        self.push_async(None, Vec::new(), Rc::new(f), Some(message.into()))
    }

    fn push_sync(
        &self,
        name: Option<Rc<str>>,
        args: Vec<Value>,
        run: SyncValidator,
        message: Option<MessageOverride>,
    ) -> Schema {
        self.update(|node| {
            node.refinements.push(Refinement {
                name,
                args,
                run,
                message,
            })
        })
    }

    fn push_async(
        &self,
        name: Option<Rc<str>>,
        args: Vec<Value>,
        run: AsyncValidator,
        message: Option<MessageOverride>,
    ) -> Schema {
        self.update(|node| {
            node.async_refinements.push(AsyncRefinement {
                name,
                args,
                run,
                message,
            })
        })
    }

    /// Register a named synchronous validator. A second application under
    /// the same name replaces the existing entry in place, keeping its
    /// position in the declaration order.
    pub(crate) fn with_named_sync(
        &self,
        name: Rc<str>,
        args: Vec<Value>,
        run: SyncValidator,
        message: Option<MessageOverride>,
    ) -> Schema {
        self.update(|node| {
            let entry = Refinement {
                name: Some(Rc::clone(&name)),
                args,
                run,
                message,
            };
            match node
                .refinements
                .iter_mut()
                .find(|r| r.name.as_deref() == Some(name.as_ref()))
            {
                Some(existing) => *existing = entry,
                None => node.refinements.push(entry),
            }
        })
    }

    /// Asynchronous counterpart of [`Schema::with_named_sync`].
    pub(crate) fn with_named_async(
        &self,
        name: Rc<str>,
        args: Vec<Value>,
        run: AsyncValidator,
        message: Option<MessageOverride>,
    ) -> Schema {
        self.update(|node| {
            let entry = AsyncRefinement {
                name: Some(Rc::clone(&name)),
                args,
                run,
                message,
            };
            match node
                .async_refinements
                .iter_mut()
                .find(|r| r.name.as_deref() == Some(name.as_ref()))
            {
                Some(existing) => *existing = entry,
                None => node.async_refinements.push(entry),
            }
        })
    }

    /// The call arguments a named validator was registered with, or `None`
    /// if no validator of that name is registered on this instance.
    pub fn refinement_args(&self, name: &str) -> Option<Vec<Value>> {
        self.node
            .refinements
            .iter()
            .find(|r| r.name.as_deref() == Some(name))
            .map(|r| r.args.clone())
            .or_else(|| {
                self.node
                    .async_refinements
                    .iter()
                    .find(|r| r.name.as_deref() == Some(name))
                    .map(|r| r.args.clone())
            })
    }

    /// Per-instance string policy; only meaningful on string nodes.
    pub fn string_policy(&self, policy: StringPolicy) -> Schema {
        self.update(|node| {
            if let TypeKind::String(p) = &mut node.kind {
                *p = policy;
            }
        })
    }

    /// Per-instance number policy; only meaningful on number nodes.
    pub fn number_policy(&self, policy: NumberPolicy) -> Schema {
        self.update(|node| {
            if let TypeKind::Number(p) = &mut node.kind {
                *p = policy;
            }
        })
    }

    /// Per-instance boolean policy; only meaningful on boolean nodes.
    pub fn boolean_policy(&self, policy: BooleanPolicy) -> Schema {
        self.update(|node| {
            if let TypeKind::Boolean(p) = &mut node.kind {
                *p = policy;
            }
        })
    }

    /// On array nodes, wrap a scalar input into a one-element array instead
    /// of raising `invalid_type`.
    pub fn wrap_scalar(&self) -> Schema {
        self.update(|node| {
            if let TypeKind::Array(a) = &mut node.kind {
                a.wrap = true;
            }
        })
    }

    /// Whether any asynchronous refinement exists on this node or any
    /// descendant. Synchronous entry points reject such schemas up front
    /// rather than silently dropping the async validators.
    pub fn has_async_validators(&self) -> bool {
        if !self.node.async_refinements.is_empty() {
            return true;
        }
        match &self.node.kind {
            TypeKind::Object(o) => o.properties.values().any(Schema::has_async_validators),
            TypeKind::Array(a) => a.items.has_async_validators(),
            TypeKind::Record(r) => r.values.has_async_validators(),
            TypeKind::Union(u) => u.members.iter().any(Schema::has_async_validators),
            _ => false,
        }
    }

    /// The value this node parses to when input is absent or unusable: the
    /// declared default if set, otherwise the kind default.
    pub fn default_value(&self) -> Value {
        if let Some(d) = &self.node.default {
            return d.clone();
        }
        match &self.node.kind {
            TypeKind::String(_) => Value::from(""),
            TypeKind::Number(_) => Value::from(0i64),
            TypeKind::Boolean(_) => Value::from(false),
            TypeKind::Literal(v) => v.clone(),
            TypeKind::Object(o) => {
                let map = o
                    .properties
                    .iter()
                    .map(|(name, child)| (Rc::clone(name), child.default_value()))
                    .collect::<BTreeMap<_, _>>();
                Value::from(map)
            }
            TypeKind::Array(_) => Value::new_array(),
            TypeKind::Record(_) => Value::new_object(),
            TypeKind::Union(u) => match u.members.first() {
                Some(first) => first.default_value(),
                None => Value::Null,
            },
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match &self.node.kind {
            TypeKind::String(_) => "string",
            TypeKind::Number(_) => "number",
            TypeKind::Boolean(_) => "boolean",
            TypeKind::Literal(_) => "literal",
            TypeKind::Object(_) => "object",
            TypeKind::Array(_) => "array",
            TypeKind::Record(_) => "record",
            TypeKind::Union(_) => "union",
        }
    }

    /// Apply any matching core-issue override to `issue`.
    pub(crate) fn apply_core_override(&self, issue: Issue, code: CoreCode) -> Issue {
        match self.node.overrides.iter().rev().find(|o| o.code == code) {
            Some(ov) => {
                let path = issue.path.clone();
                ov.message.apply(&issue, &path)
            }
            None => issue,
        }
    }
}

// Entry points.
impl Schema {
    /// Parse `raw`, returning the parsed value or a typed failure carrying
    /// the flat issue list and the per-field input tree.
    pub fn parse(&self, raw: &Value) -> Result<Value, ParseError> {
        self.parse_with(raw, ParseOptions::new())
    }

    pub fn parse_with(&self, raw: &Value, options: ParseOptions) -> Result<Value, ParseError> {
        match self.safe_parse_with(raw, options)? {
            Parsed::Valid(value) => Ok(value),
            Parsed::Invalid(failure) => Err(ParseError::Invalid(failure)),
        }
    }

    /// Parse `raw` without failing for data-shaped problems. Fails only for
    /// a missing context key or when the tree contains asynchronous
    /// validators (use [`Schema::safe_parse_async`] then).
    pub fn safe_parse(&self, raw: &Value) -> Result<Parsed, ParseError> {
        self.safe_parse_with(raw, ParseOptions::new())
    }

    pub fn safe_parse_with(&self, raw: &Value, options: ParseOptions) -> Result<Parsed, ParseError> {
        if self.has_async_validators() {
            return Err(ParseError::AsyncValidators);
        }
        let mut ctx = ParseContext::new(options);
        let parsed = self.parse_input(&mut ctx, raw);
        ctx.set_path(Path::root());
        self.validate(&mut ctx, &parsed)?;
        Ok(Parsed::from_context(ctx, parsed))
    }

    pub async fn parse_async(&self, raw: &Value) -> Result<Value, ParseError> {
        self.parse_async_with(raw, ParseOptions::new()).await
    }

    pub async fn parse_async_with(
        &self,
        raw: &Value,
        options: ParseOptions,
    ) -> Result<Value, ParseError> {
        match self.safe_parse_async_with(raw, options).await? {
            Parsed::Valid(value) => Ok(value),
            Parsed::Invalid(failure) => Err(ParseError::Invalid(failure)),
        }
    }

    pub async fn safe_parse_async(&self, raw: &Value) -> Result<Parsed, ParseError> {
        self.safe_parse_async_with(raw, ParseOptions::new()).await
    }

    /// Awaitable entry point, always allowed. All synchronous refinements
    /// across the whole tree run before the first asynchronous one.
    pub async fn safe_parse_async_with(
        &self,
        raw: &Value,
        options: ParseOptions,
    ) -> Result<Parsed, ParseError> {
        let mut ctx = ParseContext::new(options);
        let parsed = self.parse_input(&mut ctx, raw);
        ctx.set_path(Path::root());
        self.validate(&mut ctx, &parsed)?;
        ctx.set_path(Path::root());
        self.validate_async(&mut ctx, &parsed).await?;
        Ok(Parsed::from_context(ctx, parsed))
    }
}

impl core::fmt::Debug for Schema {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Schema")
            .field("kind", &self.kind_name())
            .field("optional", &self.node.optional)
            .field("nullable", &self.node.nullable)
            .field("refinements", &self.node.refinements.len())
            .field("async_refinements", &self.node.async_refinements.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    mod chain;
    mod extension;
    mod refine;
    mod report;
    mod r#async;
    mod structural;
    mod union;
}
