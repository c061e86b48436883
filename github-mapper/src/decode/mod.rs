//! Mapping response trees onto typed records.
//!
//! Records implement [`Decode`] by reading their fields through a [`DecodeContext`], which knows
//! which gated fields the query asked for and where in the response decoding currently is.

use crate::error::DecodeError;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::models::Timestamp;
use crate::models::connection::Connection;
use crate::pagination::Page;
use crate::query::QuerySpec;
use crate::registry::FieldDescriptor;
use crate::registry::PathSegment;

mod nullable;

pub use nullable::Nullable;

/// Response key of a union's type discriminator.
pub const TYPENAME: &str = "__typename";

/// A record that can be built from a response value.
pub trait Decode: Sized {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError>;
}

/// State threaded through a decode: the query's variables and the current response path.
#[derive(Debug)]
pub struct DecodeContext<'a> {
    variables: &'a Object,
    path: Path,
}

impl<'a> DecodeContext<'a> {
    /// A context at the root of `data`, for a query sent with `variables`.
    pub fn new(variables: &'a Object) -> Self {
        Self {
            variables,
            path: Path::empty(),
        }
    }

    /// Where in the response decoding currently is.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the query selected `field`: ungated fields always are, gated ones when their
    /// include flag was sent as `true`.
    pub fn is_requested(&self, field: &FieldDescriptor) -> bool {
        match field.include_flag {
            None => true,
            Some(flag) => self
                .variables
                .get(flag)
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    /// The object held by `value`.
    pub fn object<'v>(&self, value: &'v Value) -> Result<&'v Object, DecodeError> {
        ensure_object_ref!(value).map_err(|reason| DecodeError::invalid_value(&self.path, reason))
    }

    /// Decode a field that may be gated.
    ///
    /// A field the query did not ask for decodes to `T::default()` without looking at the
    /// response.
    pub fn field<T: Decode + Default>(
        &mut self,
        node: &Object,
        field: &FieldDescriptor,
    ) -> Result<T, DecodeError> {
        if !self.is_requested(field) {
            return Ok(T::default());
        }
        self.decode_field(node, field)
    }

    /// Decode a field the query must have selected.
    pub fn required<T: Decode>(
        &mut self,
        node: &Object,
        field: &FieldDescriptor,
    ) -> Result<T, DecodeError> {
        if !self.is_requested(field) {
            return Err(DecodeError::NotRequested {
                field: field.name.to_string(),
            });
        }
        self.decode_field(node, field)
    }

    fn decode_field<T: Decode>(
        &mut self,
        node: &Object,
        field: &FieldDescriptor,
    ) -> Result<T, DecodeError> {
        let key = field.response_key();
        self.path.push_key(key);
        let result = match node.get(key) {
            Some(value) => T::decode(value, self),
            // a gated field that was asked for must be there, null or not
            None if field.nullable && field.include_flag.is_none() => {
                T::decode(&Value::Null, self)
            }
            None => Err(DecodeError::MissingRequiredField {
                path: self.path.clone(),
            }),
        };
        self.path.pop();
        result
    }

    /// The `__typename` of a union member.
    pub fn discriminator<'v>(&mut self, node: &'v Object) -> Result<&'v str, DecodeError> {
        self.path.push_key(TYPENAME);
        let result = match node.get(TYPENAME) {
            Some(Value::String(typename)) => Ok(typename.as_str()),
            Some(other) => Err(DecodeError::invalid_value(
                &self.path,
                format!("expected a type name, found {}", other.kind()),
            )),
            None => Err(DecodeError::MissingRequiredField {
                path: self.path.clone(),
            }),
        };
        self.path.pop();
        result
    }

    fn element<T: Decode>(&mut self, index: usize, value: &Value) -> Result<T, DecodeError> {
        self.path.push_index(index);
        let result = T::decode(value, self);
        self.path.pop();
        result
    }

    /// Follow the response path of the query's operation from the root of `data`.
    ///
    /// Returns `None` when an object along the path is `null`, e.g. a repository that does not
    /// exist, or when a type condition on the path does not match, e.g. a commit lookup that
    /// resolved to a tree.
    fn descend<'v>(
        &mut self,
        spec: &QuerySpec,
        data: &'v Value,
    ) -> Result<Option<&'v Value>, DecodeError> {
        let mut current = data;
        for segment in spec.operation().path {
            match segment {
                PathSegment::Field { name, .. } => {
                    let object = self.object(current)?;
                    self.path.push_key(*name);
                    match object.get(*name) {
                        Some(Value::Null) => {
                            tracing::debug!(path = %self.path, "null along the operation path");
                            return Ok(None);
                        }
                        Some(value) => current = value,
                        None => {
                            return Err(DecodeError::MissingRequiredField {
                                path: self.path.clone(),
                            });
                        }
                    }
                }
                PathSegment::On(expected) => {
                    let object = self.object(current)?;
                    let typename = self.discriminator(object)?;
                    if typename != *expected {
                        tracing::debug!(
                            path = %self.path,
                            typename,
                            expected,
                            "operation path resolved to another type"
                        );
                        return Ok(None);
                    }
                }
            }
        }
        Ok(Some(current))
    }
}

/// Decode one page of a collection operation's response.
pub(crate) fn page<T: Decode>(spec: &QuerySpec, data: &Value) -> Result<Page<T>, DecodeError> {
    let mut ctx = DecodeContext::new(spec.variables());
    match ctx.descend(spec, data)? {
        Some(connection) => Connection::<T>::decode(connection, &mut ctx).map(Page::from),
        None => Ok(Page::default()),
    }
}

/// Decode the target of an entity operation's response.
pub(crate) fn entity<T: Decode>(spec: &QuerySpec, data: &Value) -> Result<Option<T>, DecodeError> {
    let mut ctx = DecodeContext::new(spec.variables());
    match ctx.descend(spec, data)? {
        Some(entity) => T::decode(entity, &mut ctx).map(Some),
        None => Ok(None),
    }
}

macro_rules! impl_decode_with_serde {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Decode for $ty {
                fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
                    serde_json_bytes::from_value(value.clone())
                        .map_err(|error| DecodeError::invalid_value(ctx.path(), error.to_string()))
                }
            }
        )*
    };
}

impl_decode_with_serde!(String, bool, i32, i64, u32, u64, f64, Timestamp);

impl<T: Decode> Decode for Option<T> {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            value => T::decode(value, ctx).map(Some),
        }
    }
}

impl<T: Decode> Decode for Nullable<T> {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        Option::<T>::decode(value, ctx).map(Nullable::from)
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let Value::Array(elements) = value else {
            return Err(DecodeError::invalid_value(
                ctx.path(),
                format!("expected an array, found {}", value.kind()),
            ));
        };
        elements
            .iter()
            .enumerate()
            .map(|(index, element)| ctx.element(index, element))
            .collect()
    }
}
