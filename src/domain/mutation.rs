//! Structural tree edits
//!
//! Every operation is pure: it takes a document and returns a new one. Edits that cannot be
//! applied (missing identity, cyclic move, refused placement) return the input unchanged.

use tracing::{debug, instrument, warn};

use crate::domain::document::Document;
use crate::domain::element::{children_of, Field, Node, NodeId};
use crate::domain::schema::{
    Category, ChildSpec, Multiplicity, SchemaRegistry, EXPRESSION_FIELD, EXPRESSION_KIND, STEPS,
};

/// Kind of the bean collection flow.
pub const BEANS_KIND: &str = "Beans";
const BEANS_FIELD: &str = "beans";

/// One hop from a node into one of its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathStep {
    field: String,
    index: Option<usize>,
}

/// Result of [`TreeEditor::find`].
#[derive(Debug, Clone)]
pub struct Located<'a> {
    pub node: &'a Node,
    /// `None` for top-level nodes
    pub parent_id: Option<NodeId>,
    /// Parent field holding the node; `None` for top-level nodes
    pub field: Option<String>,
    /// Index in the holding list; `None` for single slots
    pub position: Option<usize>,
    /// Identities from the top-level node down to the parent
    pub ancestors: Vec<NodeId>,
    top: usize,
    path: Vec<PathStep>,
}

impl Located<'_> {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Schema-driven editor over documents.
#[derive(Debug, Clone, Copy)]
pub struct TreeEditor<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> TreeEditor<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Depth-first search by identity; first match wins.
    pub fn find<'a>(&self, doc: &'a Document, id: &NodeId) -> Option<Located<'a>> {
        for (top, flow) in doc.flows.iter().enumerate() {
            if flow.id() == id {
                return Some(Located {
                    node: flow,
                    parent_id: None,
                    field: None,
                    position: Some(top),
                    ancestors: Vec::new(),
                    top,
                    path: Vec::new(),
                });
            }
            let mut ancestors = Vec::new();
            let mut path = Vec::new();
            if let Some(found) = self.search(flow, id, top, &mut ancestors, &mut path) {
                return Some(found);
            }
        }
        None
    }

    fn search<'a>(
        &self,
        parent: &'a Node,
        id: &NodeId,
        top: usize,
        ancestors: &mut Vec<NodeId>,
        path: &mut Vec<PathStep>,
    ) -> Option<Located<'a>> {
        ancestors.push(parent.id().clone());
        for spec in self.registry.child_specs(parent.kind()) {
            for (i, child) in children_of(parent, &spec).into_iter().enumerate() {
                let index = (spec.multiplicity == Multiplicity::Array).then_some(i);
                path.push(PathStep {
                    field: spec.field.clone(),
                    index,
                });
                if child.id() == id {
                    return Some(Located {
                        node: child,
                        parent_id: Some(parent.id().clone()),
                        field: Some(spec.field.clone()),
                        position: index,
                        ancestors: ancestors.clone(),
                        top,
                        path: path.clone(),
                    });
                }
                if let Some(found) = self.search(child, id, top, ancestors, path) {
                    return Some(found);
                }
                path.pop();
            }
        }
        ancestors.pop();
        None
    }

    /// Insert `node` under `parent_id` (or at top level).
    ///
    /// Placement order: a matching single slot, a matching typed list, the parent's `steps`.
    /// Flow kinds and unresolvable parents append to the top-level list.
    #[instrument(level = "debug", skip(self, doc, node), fields(kind = node.kind()))]
    pub fn add(
        &self,
        doc: &Document,
        node: Node,
        parent_id: Option<&NodeId>,
        position: Option<usize>,
    ) -> Document {
        let mut flows = doc.flows.clone();
        let is_flow = self.registry.category(node.kind()) == Some(Category::Flow);
        let parent = match parent_id {
            Some(pid) if !is_flow => self.find(doc, pid).map(|l| (l.top, l.path)),
            _ => None,
        };

        let Some((top, path)) = parent else {
            flows.push(node);
            return doc.with_flows(flows);
        };
        let Some(parent) = resolve_mut(&mut flows, top, &path) else {
            return doc.clone();
        };
        if self.place(parent, node, position) {
            doc.with_flows(flows)
        } else {
            doc.clone()
        }
    }

    fn place(&self, parent: &mut Node, node: Node, position: Option<usize>) -> bool {
        let specs = self.registry.child_specs(parent.kind());

        let single = specs.iter().find(|s| {
            s.multiplicity == Multiplicity::Single && s.constraint == node.kind()
        });
        if let Some(spec) = single {
            parent.set_child(&spec.field, node);
            return true;
        }

        let typed = specs.iter().find(|s| {
            s.multiplicity == Multiplicity::Array && s.constraint == node.kind()
        });
        if let Some(spec) = typed {
            parent.insert_child(&spec.field, position, node);
            return true;
        }

        let steps = specs.iter().find(|s| s.is_steps());
        if let Some(spec) = steps.filter(|s| self.registry.accepts(s, node.kind())) {
            parent.insert_child(&spec.field, position, node);
            return true;
        }

        warn!("place: {} does not accept {}", parent.kind(), node.kind());
        false
    }

    /// Remove the node with `id`; single slots are cleared.
    #[instrument(level = "debug", skip(self, doc))]
    pub fn delete(&self, doc: &Document, id: &NodeId) -> Document {
        let Some(located) = self.find(doc, id) else {
            debug!("delete: {} not found", id);
            return doc.clone();
        };
        let mut flows = doc.flows.clone();
        if remove_at(&mut flows, located.top, &located.path).is_none() {
            return doc.clone();
        }
        doc.with_flows(flows)
    }

    /// Move `source` relative to `target`.
    ///
    /// Branch and endpoint targets receive the source as their first step. Other targets get
    /// the source inserted at the target's original position in the target's parent. Moving a
    /// node onto itself or into its own subtree leaves the document unchanged.
    #[instrument(level = "debug", skip(self, doc))]
    pub fn move_node(&self, doc: &Document, source: &NodeId, target: &NodeId) -> Document {
        if source == target {
            return doc.clone();
        }
        let (Some(src), Some(tgt)) = (self.find(doc, source), self.find(doc, target)) else {
            debug!("move_node: source or target missing");
            return doc.clone();
        };
        if tgt.ancestors.contains(source) {
            warn!("move_node: refusing to move {} into its own subtree", source);
            return doc.clone();
        }

        let moved = src.node.clone();
        let container = matches!(
            self.registry.category(tgt.node.kind()),
            Some(Category::Branch) | Some(Category::Endpoint)
        );
        let steps_accepts = self
            .registry
            .child_spec(tgt.node.kind(), STEPS)
            .is_some_and(|s| self.registry.accepts(&s, moved.kind()));

        if container && steps_accepts {
            let without = self.delete(doc, source);
            return self.insert_into(doc, &without, target, STEPS, Some(0), moved);
        }

        match (&tgt.parent_id, &tgt.field, tgt.position) {
            (None, _, Some(at)) if src.is_top_level() => {
                let mut flows = self.delete(doc, source).flows;
                let at = at.min(flows.len());
                flows.insert(at, moved);
                doc.with_flows(flows)
            }
            (Some(parent), Some(field), Some(at)) => {
                let accepts = self
                    .find(doc, parent)
                    .and_then(|p| self.registry.child_spec(p.node.kind(), field))
                    .is_some_and(|s| self.registry.accepts(&s, moved.kind()));
                if !accepts {
                    warn!("move_node: {} cannot hold {}", field, moved.kind());
                    return doc.clone();
                }
                let without = self.delete(doc, source);
                self.insert_into(doc, &without, parent, field, Some(at), moved)
            }
            _ => doc.clone(),
        }
    }

    fn insert_into(
        &self,
        original: &Document,
        doc: &Document,
        parent: &NodeId,
        field: &str,
        position: Option<usize>,
        node: Node,
    ) -> Document {
        let Some(located) = self.find(doc, parent) else {
            return original.clone();
        };
        let mut flows = doc.flows.clone();
        match resolve_mut(&mut flows, located.top, &located.path) {
            Some(p) => {
                p.insert_child(field, position, node);
                doc.with_flows(flows)
            }
            None => original.clone(),
        }
    }

    /// Replace the node carrying the replacement's identity.
    #[instrument(level = "debug", skip(self, doc, replacement), fields(id = %replacement.id()))]
    pub fn update(&self, doc: &Document, replacement: &Node) -> Document {
        let Some(located) = self.find(doc, replacement.id()) else {
            debug!("update: not found");
            return doc.clone();
        };
        let mut flows = doc.flows.clone();
        match resolve_mut(&mut flows, located.top, &located.path) {
            Some(slot) => {
                *slot = replacement.clone();
                doc.with_flows(flows)
            }
            None => doc.clone(),
        }
    }

    /// Deep copy; `regenerate_ids` replaces every identity in the subtree.
    pub fn clone_node(&self, node: &Node, regenerate_ids: bool) -> Node {
        node.clone_node(regenerate_ids)
    }

    /// Top-level node (route, rest, ...) owning `id`.
    pub fn top_level_of<'a>(&self, doc: &'a Document, id: &NodeId) -> Option<&'a Node> {
        self.find(doc, id).map(|l| &doc.flows[l.top])
    }

    /// Identities from the top-level node down to `id`, inclusive.
    pub fn path_ids(&self, doc: &Document, id: &NodeId) -> Vec<NodeId> {
        match self.find(doc, id) {
            Some(located) => {
                let mut ids = located.ancestors;
                ids.push(id.clone());
                ids
            }
            None => Vec::new(),
        }
    }

    /// Whether any node declares `id` as its user-visible `id` property.
    pub fn contains_camel_id(&self, doc: &Document, id: &str) -> bool {
        doc.flows
            .iter()
            .flat_map(Node::descendants)
            .any(|n| n.str_value("id") == Some(id))
    }

    pub fn route_ids(&self, doc: &Document) -> Vec<String> {
        doc.routes().map(|r| r.camel_id().to_string()).collect()
    }

    /// Insert or replace a bean in the document's bean collection.
    ///
    /// Matches by identity, then by declared `name`; otherwise appends. The collection is
    /// created when the document has none.
    #[instrument(level = "debug", skip(self, doc, bean))]
    pub fn upsert_bean(&self, doc: &Document, bean: Node) -> Document {
        let mut flows = doc.flows.clone();
        let index = match flows.iter().position(|f| f.kind() == BEANS_KIND) {
            Some(i) => i,
            None => {
                flows.push(Node::new(BEANS_KIND).with_children(BEANS_FIELD, Vec::new()));
                flows.len() - 1
            }
        };
        let collection = &mut flows[index];
        if collection.children_mut(BEANS_FIELD).is_none() {
            collection.insert_field(BEANS_FIELD, Field::Nodes(Vec::new()));
        }
        if let Some(beans) = collection.children_mut(BEANS_FIELD) {
            let name = bean.str_value("name").map(str::to_string);
            let existing = beans.iter().position(|b| b.id() == bean.id()).or_else(|| {
                name.as_deref()
                    .and_then(|n| beans.iter().position(|b| b.str_value("name") == Some(n)))
            });
            match existing {
                Some(i) => beans[i] = bean,
                None => beans.push(bean),
            }
        }
        doc.with_flows(flows)
    }

    /// Remove a bean by identity; an emptied collection is removed as well.
    pub fn delete_bean(&self, doc: &Document, id: &NodeId) -> Document {
        let mut flows = doc.flows.clone();
        let mut changed = false;
        for collection in flows.iter_mut().filter(|f| f.kind() == BEANS_KIND) {
            if let Some(beans) = collection.children_mut(BEANS_FIELD) {
                let before = beans.len();
                beans.retain(|b| b.id() != id);
                changed |= beans.len() != before;
            }
        }
        if !changed {
            return doc.clone();
        }
        flows.retain(|f| f.kind() != BEANS_KIND || !f.children(BEANS_FIELD).is_empty());
        doc.with_flows(flows)
    }

    /// Language name of a node's expression, e.g. `simple`.
    pub fn expression_language<'a>(&self, node: &'a Node) -> Option<&'a str> {
        node.child(EXPRESSION_FIELD)?
            .fields()
            .find(|(name, field)| matches!(field, Field::Node(_)) && self.registry.is_language(name))
            .map(|(name, _)| name)
    }

    /// Copy of `node` whose expression is `language` with `text`; unknown languages are ignored.
    pub fn with_expression(&self, node: &Node, language: &str, text: &str) -> Node {
        let Some(spec) = self.language_spec(language) else {
            warn!("with_expression: unknown language {}", language);
            return node.clone();
        };
        let mut expression = node
            .child(EXPRESSION_FIELD)
            .cloned()
            .unwrap_or_else(|| Node::new(EXPRESSION_KIND));
        for other in self.registry.child_specs(EXPRESSION_KIND) {
            expression.remove(&other.field);
        }
        expression.set_child(
            &spec.field,
            Node::new(spec.constraint.as_str()).with_value("expression", text),
        );
        let mut copy = node.clone();
        copy.set_child(EXPRESSION_FIELD, expression);
        copy
    }

    fn language_spec(&self, language: &str) -> Option<ChildSpec> {
        self.registry.child_spec(EXPRESSION_KIND, language)
    }
}

/// Follow `path` from `flows[top]` to a mutable node.
fn resolve_mut<'a>(flows: &'a mut [Node], top: usize, path: &[PathStep]) -> Option<&'a mut Node> {
    let mut current = flows.get_mut(top)?;
    for step in path {
        current = match step.index {
            None => current.child_mut(&step.field)?,
            Some(i) => current.children_mut(&step.field)?.get_mut(i)?,
        };
    }
    Some(current)
}

/// Detach the node at `path` from `flows[top]`.
fn remove_at(flows: &mut Vec<Node>, top: usize, path: &[PathStep]) -> Option<Node> {
    let Some((last, parent_path)) = path.split_last() else {
        return (top < flows.len()).then(|| flows.remove(top));
    };
    let parent = resolve_mut(flows, top, parent_path)?;
    match last.index {
        None => match parent.remove(&last.field)? {
            Field::Node(n) => Some(*n),
            _ => None,
        },
        Some(i) => {
            let list = parent.children_mut(&last.field)?;
            (i < list.len()).then(|| list.remove(i))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builtin().expect("builtin catalog")
    }

    fn log(message: &str) -> Node {
        Node::new("LogDefinition").with_value("message", message)
    }

    fn doc_with(steps: Vec<Node>) -> Document {
        let from = Node::new("FromDefinition")
            .with_value("uri", "direct:a")
            .with_children(STEPS, steps);
        let mut doc = Document::plain("a.yaml");
        doc.flows.push(Node::new("RouteDefinition").with_child("from", from));
        doc
    }

    fn step_messages(doc: &Document) -> Vec<String> {
        doc.flows[0]
            .child("from")
            .map(|f| f.children(STEPS))
            .unwrap_or_default()
            .iter()
            .filter_map(|n| n.str_value("message").map(str::to_string))
            .collect()
    }

    #[test]
    fn given_nested_node_when_find_then_reports_parent_field_position_and_ancestors() {
        let reg = registry();
        let editor = TreeEditor::new(&reg);
        let doc = doc_with(vec![log("a"), log("b")]);
        let target = doc.flows[0].child("from").expect("from").children(STEPS)[1].id().clone();

        let found = editor.find(&doc, &target).expect("found");

        let from_id = doc.flows[0].child("from").expect("from").id().clone();
        assert_eq!(found.parent_id.as_ref(), Some(&from_id));
        assert_eq!(found.field.as_deref(), Some(STEPS));
        assert_eq!(found.position, Some(1));
        assert_eq!(found.ancestors, vec![doc.flows[0].id().clone(), from_id]);
    }

    #[test]
    fn given_steps_when_remove_at_then_detached() {
        let mut flows = doc_with(vec![log("a"), log("b")]).flows;
        let path = vec![
            PathStep { field: "from".into(), index: None },
            PathStep { field: STEPS.into(), index: Some(0) },
        ];
        let removed = remove_at(&mut flows, 0, &path).expect("removed");
        assert_eq!(removed.str_value("message"), Some("a"));
        assert_eq!(flows[0].child("from").expect("from").children(STEPS).len(), 1);
    }

    #[test]
    fn given_position_beyond_end_when_add_then_appended() {
        let reg = registry();
        let editor = TreeEditor::new(&reg);
        let doc = doc_with(vec![log("a")]);
        let from_id = doc.flows[0].child("from").expect("from").id().clone();

        let out = editor.add(&doc, log("z"), Some(&from_id), Some(42));

        assert_eq!(step_messages(&out), vec!["a", "z"]);
        assert_eq!(step_messages(&doc), vec!["a"], "input untouched");
    }

    #[test]
    fn given_otherwise_added_to_choice_when_adding_then_single_slot_assigned() {
        let reg = registry();
        let editor = TreeEditor::new(&reg);
        let doc = doc_with(vec![Node::new("ChoiceDefinition")]);
        let choice_id = doc.flows[0].child("from").expect("from").children(STEPS)[0].id().clone();

        let out = editor.add(&doc, Node::new("OtherwiseDefinition"), Some(&choice_id), None);

        let choice = &out.flows[0].child("from").expect("from").children(STEPS)[0];
        assert_eq!(choice.child("otherwise").map(Node::kind), Some("OtherwiseDefinition"));
        assert!(choice.children(STEPS).is_empty());
    }

    #[test]
    fn given_set_body_when_with_expression_then_language_replaced() {
        let reg = registry();
        let editor = TreeEditor::new(&reg);
        let node = editor.with_expression(&Node::new("SetBodyDefinition"), "constant", "x");
        let node = editor.with_expression(&node, "simple", "${body}");
        assert_eq!(editor.expression_language(&node), Some("simple"));
        let expression = node.child(EXPRESSION_FIELD).expect("expression");
        assert!(expression.child("constant").is_none());
    }
}
