// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The extension registry.
//!
//! Extensions let third parties attach new, named, parameterized
//! validator-producing capabilities to schemas without touching the node
//! types: an extension is a factory from call arguments to a validator,
//! declared synchronous or asynchronous up front. Applying one to a schema
//! clones the node and registers the produced validator under the
//! extension's name with the call arguments retained, so a later
//! application of the same name replaces the entry in place and the
//! arguments stay introspectable.

use crate::refine::{AsyncValidator, MessageOverride, SyncValidator};
use crate::schema::Schema;
use crate::value::Value;

use std::collections::BTreeMap;
use std::rc::Rc;

use lazy_static::lazy_static;
use thiserror::Error;
use tracing::debug;

lazy_static! {
    /// Built-in chainable methods on `Schema`. An extension may not take
    /// any of these names; it would shadow built-in behavior.
    static ref RESERVED_NAMES: Vec<&'static str> = vec![
        "string",
        "number",
        "boolean",
        "literal",
        "object",
        "array",
        "record",
        "union",
        "optional",
        "nullable",
        "with_default",
        "invalid_type_message",
        "required_message",
        "refine",
        "refine_with_message",
        "refine_async",
        "refine_async_with_message",
        "string_policy",
        "number_policy",
        "boolean_policy",
        "wrap_scalar",
        "has_async_validators",
        "default_value",
        "refinement_args",
        "parse",
        "parse_with",
        "parse_async",
        "parse_async_with",
        "safe_parse",
        "safe_parse_with",
        "safe_parse_async",
        "safe_parse_async_with",
    ];
}

/// Errors that can occur when interacting with an [`ExtensionRegistry`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("extension registration failed: an extension named '{name}' is already registered")]
    AlreadyExists { name: Rc<str> },

    #[error("extension registration failed: the name '{name}' is invalid (empty or whitespace-only names are not allowed)")]
    InvalidName { name: Rc<str> },

    #[error("extension registration failed: '{name}' would shadow a built-in schema method")]
    ReservedName { name: Rc<str> },

    #[error("no extension named '{name}' is registered")]
    NotFound { name: Rc<str> },
}

enum ExtensionKind {
    Sync(Box<dyn Fn(&[Value]) -> SyncValidator>),
    Async(Box<dyn Fn(&[Value]) -> AsyncValidator>),
}

/// One registered extension: a name plus a validator factory.
pub struct Extension {
    name: Rc<str>,
    kind: ExtensionKind,
}

impl core::fmt::Debug for Extension {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field(
                "kind",
                match &self.kind {
                    ExtensionKind::Sync(_) => &"sync",
                    ExtensionKind::Async(_) => &"async",
                },
            )
            .finish()
    }
}

/// A named collection of extensions applicable to schemas.
pub struct ExtensionRegistry {
    name: Rc<str>,
    entries: BTreeMap<Rc<str>, Rc<Extension>>,
}

impl ExtensionRegistry {
    /// Create a new, empty registry with a given name.
    pub fn new(registry_name: impl Into<Rc<str>>) -> ExtensionRegistry {
        ExtensionRegistry {
            name: registry_name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Get the name of this registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a synchronous extension: `factory` turns call arguments
    /// into the validator that will run at parse time.
    pub fn attach_sync(
        &mut self,
        name: impl Into<Rc<str>>,
        factory: impl Fn(&[Value]) -> SyncValidator + 'static,
    ) -> Result<(), RegistryError> {
        self.attach(name.into(), ExtensionKind::Sync(Box::new(factory)))
    }

    /// Register an asynchronous extension.
    pub fn attach_async(
        &mut self,
        name: impl Into<Rc<str>>,
        factory: impl Fn(&[Value]) -> AsyncValidator + 'static,
    ) -> Result<(), RegistryError> {
        self.attach(name.into(), ExtensionKind::Async(Box::new(factory)))
    }

    fn attach(&mut self, name: Rc<str>, kind: ExtensionKind) -> Result<(), RegistryError> {
        if name.is_empty() || name.trim().is_empty() {
            return Err(RegistryError::InvalidName { name });
        }
        if RESERVED_NAMES.contains(&name.as_ref()) {
            return Err(RegistryError::ReservedName { name });
        }
        if self.entries.contains_key(&name) {
            return Err(RegistryError::AlreadyExists { name });
        }
        debug!(registry = self.name.as_ref(), extension = name.as_ref(), "extension attached");
        self.entries
            .insert(Rc::clone(&name), Rc::new(Extension { name, kind }));
        Ok(())
    }

    /// Apply a registered extension to `schema` with `args`, producing a
    /// new schema with the validator registered under the extension's
    /// name. Applying the same extension again replaces its entry rather
    /// than appending a duplicate.
    pub fn apply(
        &self,
        schema: &Schema,
        name: &str,
        args: &[Value],
    ) -> Result<Schema, RegistryError> {
        self.apply_with(schema, name, args, None)
    }

    /// [`ExtensionRegistry::apply`] with a message override: all issues the
    /// produced validator raises collapse into one overridden issue at the
    /// node's own path.
    pub fn apply_with(
        &self,
        schema: &Schema,
        name: &str,
        args: &[Value],
        message: Option<MessageOverride>,
    ) -> Result<Schema, RegistryError> {
        let extension = self
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::NotFound { name: name.into() })?;
        let name = Rc::clone(&extension.name);
        Ok(match &extension.kind {
            ExtensionKind::Sync(factory) => {
                schema.with_named_sync(name, args.to_vec(), factory(args), message)
            }
            ExtensionKind::Async(factory) => {
                schema.with_named_async(name, args.to_vec(), factory(args), message)
            }
        })
    }

    /// The exact arguments `schema` was given when `name` was applied to
    /// it, or `None` if this extension was never applied to that instance.
    pub fn call_args(&self, schema: &Schema, name: &str) -> Option<Vec<Value>> {
        if !self.entries.contains_key(name) {
            return None;
        }
        schema.refinement_args(name)
    }

    /// Check if an extension with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// List all registered extension names.
    pub fn list_names(&self) -> Vec<Rc<str>> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        ExtensionRegistry::new("EXTENSION_REGISTRY")
    }
}
