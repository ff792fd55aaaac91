//! Element model: tagged tree nodes and schema-driven child introspection

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use uuid::Uuid;

use crate::domain::schema::{ChildSpec, Multiplicity, SchemaRegistry};

/// Opaque node identity, unique within a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Content of a node field.
///
/// Nested nodes only ever sit in fields the registry declares node-typed.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Scalar, list of scalars or map (e.g. a parameter bag)
    Value(Value),
    Node(Box<Node>),
    Nodes(Vec<Node>),
}

/// A tree node: identity, kind discriminator, visibility flag and kind-specific fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    kind: String,
    show: bool,
    fields: BTreeMap<String, Field>,
}

impl Node {
    pub fn new(kind: impl Into<String>) -> Self {
        Self::with_identity(kind, NodeId::generate())
    }

    pub fn with_identity(kind: impl Into<String>, id: NodeId) -> Self {
        Self {
            id,
            kind: kind.into(),
            show: true,
            fields: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn show(&self) -> bool {
        self.show
    }

    pub fn set_show(&mut self, show: bool) {
        self.show = show;
    }

    /// User-visible `id` property, else the node identity.
    pub fn camel_id(&self) -> &str {
        self.str_value("id").unwrap_or(self.id.as_str())
    }

    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_value(name, value.into());
        self
    }

    pub fn with_child(mut self, name: &str, child: Node) -> Self {
        self.set_child(name, child);
        self
    }

    pub fn with_children(mut self, name: &str, children: Vec<Node>) -> Self {
        self.fields.insert(name.to_string(), Field::Nodes(children));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(name)
    }

    pub fn insert_field(&mut self, name: &str, field: Field) {
        self.fields.insert(name.to_string(), field);
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.fields.remove(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(Field::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn str_value(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    pub fn set_value(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), Field::Value(value));
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        match self.fields.get(name) {
            Some(Field::Node(n)) => Some(n),
            _ => None,
        }
    }

    pub fn set_child(&mut self, name: &str, child: Node) {
        self.fields
            .insert(name.to_string(), Field::Node(Box::new(child)));
    }

    pub fn children(&self, name: &str) -> &[Node] {
        match self.fields.get(name) {
            Some(Field::Nodes(nodes)) => nodes,
            _ => &[],
        }
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        match self.fields.get_mut(name) {
            Some(Field::Node(n)) => Some(n),
            _ => None,
        }
    }

    pub fn children_mut(&mut self, name: &str) -> Option<&mut Vec<Node>> {
        match self.fields.get_mut(name) {
            Some(Field::Nodes(nodes)) => Some(nodes),
            _ => None,
        }
    }

    /// Insert `child` into the list `name` at `position` (clamped), creating the list.
    pub fn insert_child(&mut self, name: &str, position: Option<usize>, child: Node) {
        if self.children_mut(name).is_none() {
            self.insert_field(name, Field::Nodes(Vec::new()));
        }
        if let Some(list) = self.children_mut(name) {
            let at = position.unwrap_or(list.len()).min(list.len());
            list.insert(at, child);
        }
    }

    /// Every directly nested node, in field order.
    pub fn nested(&self) -> impl Iterator<Item = &Node> {
        self.fields.values().flat_map(|f| {
            let (single, list): (Option<&Node>, &[Node]) = match f {
                Field::Value(_) => (None, &[]),
                Field::Node(n) => (Some(n.as_ref()), &[]),
                Field::Nodes(ns) => (None, ns.as_slice()),
            };
            single.into_iter().chain(list.iter())
        })
    }

    /// Deep copy; `regenerate_ids` replaces every identity in the subtree.
    pub fn clone_node(&self, regenerate_ids: bool) -> Node {
        let mut copy = self.clone();
        if regenerate_ids {
            copy.regenerate_ids();
        }
        copy
    }

    fn regenerate_ids(&mut self) {
        self.id = NodeId::generate();
        for field in self.fields.values_mut() {
            match field {
                Field::Value(_) => {}
                Field::Node(n) => n.regenerate_ids(),
                Field::Nodes(ns) => ns.iter_mut().for_each(Node::regenerate_ids),
            }
        }
    }

    /// Pre-order list of this node and all nested nodes.
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut nested: Vec<&Node> = current.nested().collect();
            nested.reverse();
            stack.extend(nested);
        }
        out
    }
}

/// Nodes held by `node` in the field described by `spec`: zero, one or many.
pub fn children_of<'a>(node: &'a Node, spec: &ChildSpec) -> Vec<&'a Node> {
    match spec.multiplicity {
        Multiplicity::Single => node.child(&spec.field).into_iter().collect(),
        Multiplicity::Array => node.children(&spec.field).iter().collect(),
    }
}

/// Schema-driven pre-order walk; `visit` receives each node with its depth.
pub fn walk<'a>(registry: &SchemaRegistry, node: &'a Node, visit: &mut dyn FnMut(&'a Node, usize)) {
    walk_at(registry, node, 0, visit);
}

fn walk_at<'a>(
    registry: &SchemaRegistry,
    node: &'a Node,
    depth: usize,
    visit: &mut dyn FnMut(&'a Node, usize),
) {
    visit(node, depth);
    for spec in registry.child_specs(node.kind()) {
        for child in children_of(node, &spec) {
            walk_at(registry, child, depth + 1, visit);
        }
    }
}

/// Text of a scalar value; `None` for null, sequences and maps.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
