// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structural parse phase.
//!
//! One pass per node: resolve unions, handle null/missing input, type-check
//! with a coercion fallback, normalize, apply core-issue overrides, record
//! what was seen, then recurse into children. Structural problems become
//! issues and the node's default value; the parse itself never aborts.

use crate::context::ParseContext;
use crate::issue::Issue;
use crate::number::Number;
use crate::options::ParseOptions;
use crate::path::Segment;
use crate::refine::CoreCode;
use crate::schema::{Schema, TypeKind};
use crate::value::Value;

use std::collections::BTreeMap;
use std::rc::Rc;
use std::str::FromStr;

// Engine defaults for the scalar policies: coerce and trim on, empty
// strings allowed. Node-level configuration wins over the options bag.
fn string_coerce(schema: &Schema, opts: &ParseOptions) -> bool {
    match schema.kind() {
        TypeKind::String(p) => p.coerce.or(opts.string.coerce).unwrap_or(true),
        _ => false,
    }
}

fn string_trim(schema: &Schema, opts: &ParseOptions) -> bool {
    match schema.kind() {
        TypeKind::String(p) => p.trim.or(opts.string.trim).unwrap_or(true),
        _ => false,
    }
}

fn string_empty(schema: &Schema, opts: &ParseOptions) -> bool {
    match schema.kind() {
        TypeKind::String(p) => p.empty.or(opts.string.empty).unwrap_or(true),
        _ => true,
    }
}

fn number_coerce(schema: &Schema, opts: &ParseOptions) -> bool {
    match schema.kind() {
        TypeKind::Number(p) => p.coerce.or(opts.number.coerce).unwrap_or(true),
        _ => false,
    }
}

fn boolean_coerce(schema: &Schema, opts: &ParseOptions) -> bool {
    match schema.kind() {
        TypeKind::Boolean(p) => p.coerce.or(opts.boolean.coerce).unwrap_or(true),
        _ => false,
    }
}

/// How an absent input presented itself.
enum Absent {
    Missing,
    Null,
}

impl Schema {
    /// Parse `raw` at the context's current path, accumulating issues and
    /// returning the parsed value (the node default when parsing fails).
    pub(crate) fn parse_input(&self, ctx: &mut ParseContext, raw: &Value) -> Value {
        let resolved = self.resolve(ctx, raw);
        resolved.parse_resolved(ctx, raw)
    }

    fn parse_resolved(&self, ctx: &mut ParseContext, raw: &Value) -> Value {
        let path = ctx.path();

        if let Some(absent) = self.absent_kind(raw, ctx.options()) {
            let allowed = match absent {
                Absent::Missing => self.node().optional,
                Absent::Null => self.node().nullable,
            };
            let default = self.default_value();
            if allowed {
                ctx.record_input(raw.clone(), Some(default.clone()), self.clone());
            } else {
                let issue = self.apply_core_override(Issue::required(path), CoreCode::Required);
                ctx.raise(issue);
                ctx.record_input(raw.clone(), None, self.clone());
            }
            return default;
        }

        let value = match self.check(raw, &path) {
            Ok(()) => raw.clone(),
            Err(issue) => match self.coerce(raw, ctx.options()) {
                // A usable coercion discards the failing check.
                Some(coerced) => coerced,
                None => {
                    let issue = self.apply_core_override(issue, CoreCode::InvalidType);
                    ctx.raise(issue);
                    ctx.record_input(raw.clone(), None, self.clone());
                    return self.default_value();
                }
            },
        };

        let value = self.clean(value, ctx.options());
        let parsed = self.parse_children(ctx, value);
        ctx.record_input(raw.clone(), Some(parsed.clone()), self.clone());
        parsed
    }

    /// Null, missing, or (for strings that disallow it) post-trim empty.
    fn absent_kind(&self, raw: &Value, opts: &ParseOptions) -> Option<Absent> {
        match raw {
            Value::Undefined => Some(Absent::Missing),
            Value::Null => Some(Absent::Null),
            Value::String(s)
                if !string_empty(self, opts)
                    && matches!(self.kind(), TypeKind::String(_))
                    && self.trimmed(s, opts).is_empty() =>
            {
                Some(Absent::Missing)
            }
            _ => None,
        }
    }

    fn trimmed<'a>(&self, s: &'a str, opts: &ParseOptions) -> &'a str {
        if string_trim(self, opts) {
            s.trim()
        } else {
            s
        }
    }

    /// The primary type check: pass, or an `invalid_type` issue at `path`.
    fn check(&self, raw: &Value, path: &crate::path::Path) -> Result<(), Issue> {
        let ok = match (self.kind(), raw) {
            (TypeKind::String(_), Value::String(_)) => true,
            (TypeKind::Number(_), Value::Number(_)) => true,
            (TypeKind::Boolean(_), Value::Bool(_)) => true,
            (TypeKind::Literal(expected), v) => v == expected,
            (TypeKind::Object(_), Value::Object(_)) => true,
            (TypeKind::Array(_), Value::Array(_)) => true,
            (TypeKind::Record(_), Value::Object(_)) => true,
            // Unions are resolved to a member before checking; an empty
            // union has nothing to resolve to and rejects everything.
            (TypeKind::Union(_), _) => false,
            _ => false,
        };
        if ok {
            return Ok(());
        }
        let expected = match self.kind() {
            TypeKind::Literal(v) => format!("literal {v}"),
            _ => self.kind_name().to_string(),
        };
        Err(Issue::invalid_type(path.clone(), &expected, raw.type_name()))
    }

    /// Best-effort conversion of an input that failed the primary check.
    fn coerce(&self, raw: &Value, opts: &ParseOptions) -> Option<Value> {
        match self.kind() {
            TypeKind::String(_) if string_coerce(self, opts) => match raw {
                Value::Number(n) => Some(Value::from(n.to_string())),
                Value::Bool(b) => Some(Value::from(if *b { "true" } else { "false" })),
                _ => None,
            },
            TypeKind::Number(_) if number_coerce(self, opts) => match raw {
                Value::String(s) => Number::from_str(s.trim()).ok().map(Value::from),
                Value::Bool(b) => Some(Value::from(i64::from(*b))),
                _ => None,
            },
            TypeKind::Boolean(_) if boolean_coerce(self, opts) => match raw {
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Some(Value::from(true)),
                    "false" | "0" => Some(Value::from(false)),
                    _ => None,
                },
                Value::Number(n) => match n.as_i64() {
                    Some(1) => Some(Value::from(true)),
                    Some(0) => Some(Value::from(false)),
                    _ => None,
                },
                _ => None,
            },
            TypeKind::Array(a) if a.wrap => Some(Value::from(vec![raw.clone()])),
            _ => None,
        }
    }

    /// Normalization: trim strings, drop unknown object keys.
    fn clean(&self, value: Value, opts: &ParseOptions) -> Value {
        match self.kind() {
            TypeKind::String(_) if string_trim(self, opts) => match &value {
                Value::String(s) => Value::from(s.trim()),
                _ => value,
            },
            TypeKind::Object(o) => match &value {
                Value::Object(map) => {
                    let kept = map
                        .iter()
                        .filter(|(k, _)| o.properties.contains_key(k.as_ref()))
                        .map(|(k, v)| (Rc::clone(k), v.clone()))
                        .collect::<BTreeMap<_, _>>();
                    Value::from(kept)
                }
                _ => value,
            },
            _ => value,
        }
    }

    fn parse_children(&self, ctx: &mut ParseContext, value: Value) -> Value {
        match self.kind() {
            TypeKind::Object(o) => {
                let mut out = BTreeMap::new();
                for (name, child) in o.properties.iter() {
                    let raw_child = value[name.as_ref()].clone();
                    let parsed = ctx.with_segment(Segment::Key(Rc::clone(name)), |ctx| {
                        child.parse_input(ctx, &raw_child)
                    });
                    out.insert(Rc::clone(name), parsed);
                }
                Value::from(out)
            }
            TypeKind::Array(a) => {
                let items = match &value {
                    Value::Array(items) => items.as_ref().clone(),
                    _ => return value,
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, element) in items.iter().enumerate() {
                    // Sparse slots pass through untouched: no default, no
                    // issue, no record.
                    if element.is_undefined() {
                        out.push(Value::Undefined);
                        continue;
                    }
                    let parsed = ctx.with_segment(Segment::Index(i), |ctx| {
                        a.items.parse_input(ctx, element)
                    });
                    out.push(parsed);
                }
                Value::from(out)
            }
            TypeKind::Record(r) => {
                let entries = match &value {
                    Value::Object(map) => map.as_ref().clone(),
                    _ => return value,
                };
                let mut out = BTreeMap::new();
                for (key, element) in entries.iter() {
                    if element.is_undefined() {
                        continue;
                    }
                    let parsed = ctx.with_segment(Segment::Key(Rc::clone(key)), |ctx| {
                        r.values.parse_input(ctx, element)
                    });
                    out.insert(Rc::clone(key), parsed);
                }
                Value::from(out)
            }
            _ => value,
        }
    }
}
