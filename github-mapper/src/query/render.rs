//! Rendering of query documents.
//!
//! A document declares every field of the target shape; gated fields carry an
//! `@include(if: $flag)` directive. The same operation therefore always renders the same
//! document, and requests differ only by their variables.

use crate::decode::TYPENAME;
use crate::models::connection::NODES;
use crate::models::connection::PAGE_INFO;
use crate::models::connection::TOTAL_COUNT;
use crate::registry::CURSOR_VARIABLE;
use crate::registry::FieldDescriptor;
use crate::registry::FieldKind;
use crate::registry::NodeShape;
use crate::registry::OperationDescriptor;
use crate::registry::OperationTarget;
use crate::registry::PathSegment;
use crate::registry::UnionShape;

const INDENT: &str = "  ";

/// Variables a target shape needs beyond the operation's own arguments.
#[derive(Debug, Default)]
pub(crate) struct Reachable {
    pub(crate) flags: Vec<&'static str>,
    pub(crate) connections: Vec<&'static FieldDescriptor>,
}

/// Collect the include flags and nested connections below `node`, in selection order.
pub(crate) fn reachable(node: NodeShape) -> Reachable {
    let mut reachable = Reachable::default();
    reachable.visit_node(node);
    reachable
}

impl Reachable {
    fn visit_node(&mut self, node: NodeShape) {
        match node {
            NodeShape::Entity(shape) => self.visit_fields(&shape.all_fields()),
            NodeShape::Union(shape) => {
                self.visit_fields(shape.common);
                for variant in shape.variants {
                    self.visit_fields(variant.fields);
                }
            }
        }
    }

    fn visit_fields(&mut self, fields: &[&'static FieldDescriptor]) {
        for field in fields {
            if let Some(flag) = field.include_flag {
                if !self.flags.contains(&flag) {
                    self.flags.push(flag);
                }
            }
            match field.kind {
                FieldKind::Scalar => {}
                FieldKind::Object(shape) => self.visit_node(NodeShape::Entity(shape)),
                FieldKind::Union(shape) => self.visit_node(NodeShape::Union(shape)),
                FieldKind::Connection(connection) => {
                    if !self.connections.iter().any(|known| known.name == field.name) {
                        self.connections.push(field);
                    }
                    self.visit_node(connection.node);
                }
            }
        }
    }
}

/// Render the query document of an operation.
pub(crate) fn document(operation: &OperationDescriptor) -> String {
    let reachable = reachable(operation.node());
    let mut definitions: Vec<String> = operation
        .arguments
        .iter()
        .map(|argument| format!("${}: {}", argument.name, argument.ty))
        .collect();
    if let OperationTarget::Collection(connection) = &operation.target {
        definitions.push(format!("${}: Int!", connection.page_size_variable));
        definitions.push(format!("${CURSOR_VARIABLE}: String"));
    }
    for field in &reachable.connections {
        if let FieldKind::Connection(connection) = field.kind {
            definitions.push(format!("${}: Int!", connection.page_size_variable));
        }
    }
    for flag in &reachable.flags {
        definitions.push(format!("${flag}: Boolean!"));
    }

    let mut writer = Writer::default();
    if definitions.is_empty() {
        writer.open(&format!("query {}", operation.operation_name));
    } else {
        writer.open(&format!(
            "query {}({})",
            operation.operation_name,
            definitions.join(", ")
        ));
    }

    let last = operation.path.len().saturating_sub(1);
    for (position, segment) in operation.path.iter().enumerate() {
        match segment {
            PathSegment::Field { name, arguments } => {
                let mut arguments: Vec<String> = arguments
                    .iter()
                    .map(|(argument, value)| format!("{argument}: {value}"))
                    .collect();
                if position == last {
                    if let OperationTarget::Collection(connection) = &operation.target {
                        arguments.push(format!("first: ${}", connection.page_size_variable));
                        arguments.push(format!("after: ${CURSOR_VARIABLE}"));
                    }
                }
                if arguments.is_empty() {
                    writer.open(name);
                } else {
                    writer.open(&format!("{name}({})", arguments.join(", ")));
                }
                if let Some(PathSegment::On(_)) = operation.path.get(position + 1) {
                    writer.line(TYPENAME);
                }
            }
            PathSegment::On(typename) => writer.open(&format!("... on {typename}")),
        }
    }

    match &operation.target {
        OperationTarget::Collection(connection) => writer.connection(connection.node),
        OperationTarget::Entity(shape) => writer.fields(&shape.all_fields()),
    }

    for _ in operation.path {
        writer.close();
    }
    writer.close();
    writer.out
}

#[derive(Default)]
struct Writer {
    out: String,
    depth: usize,
}

impl Writer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, head: &str) {
        self.line(&format!("{head} {{"));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth -= 1;
        self.line("}");
    }

    fn fields(&mut self, fields: &[&'static FieldDescriptor]) {
        for field in fields {
            self.field(field);
        }
    }

    fn field(&mut self, field: &FieldDescriptor) {
        let mut head = match field.alias {
            Some(alias) => format!("{alias}: {}", field.remote_name),
            None => field.remote_name.to_string(),
        };
        if let FieldKind::Connection(connection) = field.kind {
            head.push_str(&format!("(first: ${})", connection.page_size_variable));
        }
        if let Some(flag) = field.include_flag {
            head.push_str(&format!(" @include(if: ${flag})"));
        }
        match field.kind {
            FieldKind::Scalar => self.line(&head),
            FieldKind::Object(shape) => {
                self.open(&head);
                self.fields(&shape.all_fields());
                self.close();
            }
            FieldKind::Union(shape) => {
                self.open(&head);
                self.union(shape);
                self.close();
            }
            FieldKind::Connection(connection) => {
                self.open(&head);
                self.connection(connection.node);
                self.close();
            }
        }
    }

    fn union(&mut self, shape: &UnionShape) {
        self.line(TYPENAME);
        self.fields(shape.common);
        for variant in shape.variants {
            // an empty selection set does not parse
            if variant.fields.is_empty() {
                continue;
            }
            self.open(&format!("... on {}", variant.typename));
            self.fields(variant.fields);
            self.close();
        }
    }

    fn connection(&mut self, node: NodeShape) {
        self.field(&TOTAL_COUNT);
        self.field(&PAGE_INFO);
        self.open(NODES.remote_name);
        match node {
            NodeShape::Entity(shape) => self.fields(&shape.all_fields()),
            NodeShape::Union(shape) => self.union(shape),
        }
        self.close();
    }
}
