//! The field descriptor registry.
//!
//! Every output field the mapper knows about is declared once as a `static`
//! [`FieldDescriptor`] next to the record it decodes into (see [`crate::models`]). Shapes group
//! descriptors per remote type, operations describe how a shape is reached from the query root.
//! The [`Registry`] indexes all of it once, on first use, and is read-only afterwards.

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::error::MappingError;
use crate::models;
use crate::query::render;

pub mod operations;

pub use operations::CURSOR_VARIABLE;
pub use operations::OPERATIONS;
pub use operations::PAGE_SIZE_VARIABLE;

/// How a field is shaped in the remote schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// A leaf value.
    Scalar,
    /// A nested object with its own selection set.
    Object(&'static EntityShape),
    /// An interface or union, decoded by its `__typename`.
    Union(&'static UnionShape),
    /// A cursor-paginated collection.
    Connection(ConnectionShape),
}

/// One optional output field and where it lives in the remote schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Name the host asks for.
    pub name: &'static str,
    /// Field name in the remote schema.
    pub remote_name: &'static str,
    /// Alias the field is selected under, if it differs from the remote name.
    pub alias: Option<&'static str>,
    /// Boolean variable gating the field with `@include(if: ...)`.
    pub include_flag: Option<&'static str>,
    /// Whether the remote schema may return `null` (or omit the key) for this field.
    pub nullable: bool,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn scalar(name: &'static str, remote_name: &'static str) -> Self {
        Self {
            name,
            remote_name,
            alias: None,
            include_flag: None,
            nullable: false,
            kind: FieldKind::Scalar,
        }
    }

    pub const fn object(
        name: &'static str,
        remote_name: &'static str,
        shape: &'static EntityShape,
    ) -> Self {
        Self {
            kind: FieldKind::Object(shape),
            ..Self::scalar(name, remote_name)
        }
    }

    pub const fn union(
        name: &'static str,
        remote_name: &'static str,
        shape: &'static UnionShape,
    ) -> Self {
        Self {
            kind: FieldKind::Union(shape),
            ..Self::scalar(name, remote_name)
        }
    }

    pub const fn connection(
        name: &'static str,
        remote_name: &'static str,
        shape: ConnectionShape,
    ) -> Self {
        Self {
            kind: FieldKind::Connection(shape),
            ..Self::scalar(name, remote_name)
        }
    }

    pub const fn alias(self, alias: &'static str) -> Self {
        Self {
            alias: Some(alias),
            ..self
        }
    }

    pub const fn include_if(self, flag: &'static str) -> Self {
        Self {
            include_flag: Some(flag),
            ..self
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    /// The key this field appears under in a response object.
    pub fn response_key(&self) -> &'static str {
        self.alias.unwrap_or(self.remote_name)
    }
}

/// The selection of one remote object type.
///
/// A "full" shape may extend a "basic" one through `base`: the basic fields are selected first
/// and looked up as if they were declared on the full shape.
#[derive(PartialEq, Eq)]
pub struct EntityShape {
    /// Registry key.
    pub name: &'static str,
    /// GraphQL type name.
    pub typename: &'static str,
    pub base: Option<&'static EntityShape>,
    pub fields: &'static [&'static FieldDescriptor],
}

impl EntityShape {
    /// Every field of the shape, basic fields first, in declaration order.
    pub fn all_fields(&self) -> Vec<&'static FieldDescriptor> {
        let mut fields = self.base.map(EntityShape::all_fields).unwrap_or_default();
        fields.extend(self.fields.iter().copied());
        fields
    }
}

impl fmt::Debug for EntityShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityShape").field(&self.typename).finish()
    }
}

/// One member type of a [`UnionShape`].
#[derive(Debug, PartialEq, Eq)]
pub struct VariantShape {
    pub typename: &'static str,
    pub fields: &'static [&'static FieldDescriptor],
}

/// An interface or union type.
///
/// `common` holds the interface fields every member exposes; each variant is selected with an
/// inline fragment. `__typename` is always selected.
#[derive(PartialEq, Eq)]
pub struct UnionShape {
    pub name: &'static str,
    pub common: &'static [&'static FieldDescriptor],
    pub variants: &'static [VariantShape],
}

impl fmt::Debug for UnionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UnionShape").field(&self.name).finish()
    }
}

/// The node type of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeShape {
    Entity(&'static EntityShape),
    Union(&'static UnionShape),
}

impl NodeShape {
    pub fn name(&self) -> &'static str {
        match self {
            NodeShape::Entity(shape) => shape.name,
            NodeShape::Union(shape) => shape.name,
        }
    }
}

/// A cursor-paginated collection: `totalCount`, `pageInfo` and `nodes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionShape {
    pub node: NodeShape,
    /// Variable holding the `first:` argument.
    pub page_size_variable: &'static str,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl ConnectionShape {
    /// Resolve a requested page size against the bounds of this connection.
    pub fn page_size(&self, collection: &str, requested: Option<u32>) -> Result<u32, MappingError> {
        match requested {
            None => Ok(self.default_page_size),
            Some(requested) if requested > self.max_page_size => {
                Err(MappingError::PageSizeExceeded {
                    collection: collection.to_string(),
                    requested,
                    maximum: self.max_page_size,
                })
            }
            Some(requested) => Ok(requested),
        }
    }
}

/// A declared variable of an operation, e.g. `$owner: String!`.
#[derive(Debug, PartialEq, Eq)]
pub struct ArgumentDescriptor {
    pub name: &'static str,
    /// GraphQL input type.
    pub ty: &'static str,
}

impl ArgumentDescriptor {
    pub fn is_required(&self) -> bool {
        self.ty.ends_with('!')
    }
}

/// One step from the query root to an operation's target.
#[derive(Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A field with literal arguments, e.g. `repository(owner: $owner, name: $repo)`.
    Field {
        name: &'static str,
        arguments: &'static [(&'static str, &'static str)],
    },
    /// An inline fragment, e.g. `... on Commit`. Adds no nesting to the response.
    On(&'static str),
}

/// What an operation returns.
#[derive(Debug, PartialEq, Eq)]
pub enum OperationTarget {
    /// A single, possibly null, object.
    Entity(&'static EntityShape),
    /// A connection walked page by page; the last path segment is the connection field.
    Collection(ConnectionShape),
}

/// A named root query.
#[derive(Debug, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// Registry key.
    pub name: &'static str,
    /// GraphQL operation name.
    pub operation_name: &'static str,
    pub arguments: &'static [ArgumentDescriptor],
    pub path: &'static [PathSegment],
    pub target: OperationTarget,
}

impl OperationDescriptor {
    /// The shape of the entities this operation returns.
    pub fn node(&self) -> NodeShape {
        match &self.target {
            OperationTarget::Entity(shape) => NodeShape::Entity(shape),
            OperationTarget::Collection(connection) => connection.node,
        }
    }

    /// The response keys leading to the target, skipping inline fragments.
    pub fn response_path(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.path.iter().filter_map(|segment| match segment {
            PathSegment::Field { name, .. } => Some(*name),
            PathSegment::On(_) => None,
        })
    }
}

/// Field index of one shape.
#[derive(Debug)]
pub struct EntityIndex {
    pub shape: NodeShape,
    fields: IndexMap<&'static str, &'static FieldDescriptor>,
}

impl EntityIndex {
    fn new(shape: NodeShape) -> Self {
        let fields: Vec<&'static FieldDescriptor> = match shape {
            NodeShape::Entity(entity) => entity.all_fields(),
            NodeShape::Union(union) => union.common.to_vec(),
        };
        let mut index = IndexMap::with_capacity(fields.len());
        for field in fields {
            if index.insert(field.name, field).is_some() {
                tracing::warn!(
                    shape = shape.name(),
                    field = field.name,
                    "field declared twice, the last declaration wins"
                );
            }
        }
        Self {
            shape,
            fields: index,
        }
    }

    /// Look a field up by the name the host asks for.
    pub fn lookup(&self, name: &str) -> Result<&'static FieldDescriptor, MappingError> {
        self.fields
            .get(name)
            .copied()
            .ok_or_else(|| MappingError::unknown_field(self.shape.name(), name))
    }

    /// Declaration position of a field, used to order selections canonically.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }

    /// Every field of the shape in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> + '_ {
        self.fields.values().copied()
    }
}

/// An operation with everything derived from its descriptor at initialization.
#[derive(Debug)]
pub struct PreparedOperation {
    pub descriptor: &'static OperationDescriptor,
    /// The query document, identical for every request of this operation.
    pub document: String,
    /// Every include flag of the target shape, in selection order.
    pub flags: Vec<&'static str>,
    /// Connection fields nested below the target, in selection order.
    pub connections: Vec<&'static FieldDescriptor>,
}

impl PreparedOperation {
    fn new(descriptor: &'static OperationDescriptor) -> Self {
        let reachable = render::reachable(descriptor.node());
        Self {
            descriptor,
            document: render::document(descriptor),
            flags: reachable.flags,
            connections: reachable.connections,
        }
    }

    /// Look a nested connection up by the name the host asks for.
    pub fn connection(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.connections
            .iter()
            .find(|field| field.name == name)
            .copied()
    }
}

/// The process-wide catalogue of shapes and operations.
#[derive(Debug)]
pub struct Registry {
    entities: IndexMap<&'static str, EntityIndex>,
    operations: IndexMap<&'static str, PreparedOperation>,
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| Registry::new(models::SHAPES, OPERATIONS));

impl Registry {
    /// The registry, built on first access.
    pub fn global() -> &'static Registry {
        &REGISTRY
    }

    pub(crate) fn new(
        shapes: &'static [NodeShape],
        operations: &'static [&'static OperationDescriptor],
    ) -> Self {
        let registry = Self {
            entities: shapes
                .iter()
                .map(|shape| (shape.name(), EntityIndex::new(*shape)))
                .collect(),
            operations: operations
                .iter()
                .map(|operation| (operation.name, PreparedOperation::new(operation)))
                .collect(),
        };
        tracing::debug!(
            shapes = registry.entities.len(),
            operations = registry.operations.len(),
            "field descriptor registry initialized"
        );
        registry
    }

    /// The field index of a shape.
    pub fn entity(&self, name: &str) -> Result<&EntityIndex, MappingError> {
        self.entities
            .get(name)
            .ok_or_else(|| MappingError::UnknownEntity(name.to_string()))
    }

    pub fn operation(&self, name: &str) -> Result<&PreparedOperation, MappingError> {
        self.operations
            .get(name)
            .ok_or_else(|| MappingError::UnknownOperation(name.to_string()))
    }

    pub fn operations(&self) -> impl Iterator<Item = &PreparedOperation> + '_ {
        self.operations.values()
    }
}
