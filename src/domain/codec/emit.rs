use serde_yaml::{Mapping, Value};
use tracing::{debug, instrument};

use super::case::kebabize;
use super::Codec;
use crate::domain::document::{Document, DocumentShape, Envelope, DEFAULT_API_VERSION};
use crate::domain::element::{Field, Node};
use crate::domain::error::DomainResult;
use crate::domain::schema::{Category, ANY_STEP, EXPRESSION_FIELD, STEPS};

/// Where a node sits, which decides whether it is written wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    TopLevel,
    StepList,
    Named,
}

impl Codec<'_> {
    /// Canonical text for a document.
    #[instrument(level = "debug", skip(self, doc), fields(name = %doc.name))]
    pub fn serialize(&self, doc: &Document) -> DomainResult<String> {
        let value = self.to_value(doc);
        Ok(serde_yaml::to_string(&value)?)
    }

    /// Canonical generic value for a document, before text rendering.
    pub fn to_value(&self, doc: &Document) -> Value {
        match doc.shape {
            DocumentShape::Plain => Value::Sequence(self.emit_flows(&doc.flows)),
            DocumentShape::Crd => {
                let envelope = self.envelope_or_default(doc, "Integration");
                let mut spec = Mapping::new();
                spec.insert("flows".into(), Value::Sequence(self.emit_flows(&doc.flows)));
                for (k, v) in &envelope.extra_spec {
                    spec.insert(k.clone(), v.clone());
                }
                resource(&envelope, spec)
            }
            DocumentShape::Kamelet => {
                let envelope = self.envelope_or_default(doc, "Kamelet");
                let mut spec = envelope.extra_spec.clone();
                if let Some(template) = doc
                    .routes()
                    .next()
                    .and_then(|r| self.emit_node(r, Slot::Named))
                {
                    spec.insert("template".into(), template);
                }
                resource(&envelope, spec)
            }
        }
    }

    fn envelope_or_default(&self, doc: &Document, kind: &str) -> Envelope {
        doc.envelope.clone().unwrap_or_else(|| {
            let mut metadata = Mapping::new();
            metadata.insert("name".into(), doc.name.clone().into());
            Envelope {
                api_version: DEFAULT_API_VERSION.to_string(),
                kind: kind.to_string(),
                metadata,
                extra_spec: Mapping::new(),
            }
        })
    }

    /// Top-level entries; only flow kinds are written, matching what parse reads back.
    fn emit_flows(&self, flows: &[Node]) -> Vec<Value> {
        flows
            .iter()
            .filter(|n| {
                let is_flow = self.registry.category(n.kind()) == Some(Category::Flow);
                if !is_flow {
                    debug!("emit_flows: omitting top-level {}", n.kind());
                }
                is_flow
            })
            .filter_map(|n| self.emit_node(n, Slot::TopLevel))
            .collect()
    }

    /// Emit one node; unknown kinds are omitted.
    fn emit_node(&self, node: &Node, slot: Slot) -> Option<Value> {
        let Some(spec) = self.registry.kind(node.kind()) else {
            debug!("emit_node: omitting unknown kind {}", node.kind());
            return None;
        };

        let body = self.emit_body(node);
        let wrap = slot != Slot::Named && self.registry.is_wrapper_eligible(node.kind());
        if !wrap {
            return Some(body);
        }

        let step_name = spec.step_name.as_deref().unwrap_or(node.kind());
        let inner = match spec.value_field.as_deref() {
            // `beans: [...]` instead of `beans: {beans: [...]}`
            Some(field) => match body {
                Value::Mapping(mut m) => m
                    .remove(kebabize(field).as_str())
                    .unwrap_or(Value::Sequence(Vec::new())),
                other => other,
            },
            None => body,
        };
        let mut wrapper = Mapping::new();
        wrapper.insert(kebabize(step_name).into(), inner);
        Some(Value::Mapping(wrapper))
    }

    fn emit_body(&self, node: &Node) -> Value {
        let mut entries: Vec<(String, Value)> = Vec::new();
        for (name, field) in node.fields() {
            let emitted = match field {
                Field::Value(v) => clean_value(v).map(order_value),
                Field::Node(child) => self.emit_node(child, Slot::Named),
                Field::Nodes(children) => {
                    let slot = match self.registry.child_spec(node.kind(), name) {
                        Some(spec) if spec.constraint == ANY_STEP => Slot::StepList,
                        _ => Slot::Named,
                    };
                    let items: Vec<Value> = children
                        .iter()
                        .filter_map(|c| self.emit_node(c, slot))
                        .collect();
                    (!items.is_empty()).then_some(Value::Sequence(items))
                }
            };
            if let Some(value) = emitted {
                entries.push((kebabize(name), value));
            }
        }
        Value::Mapping(ordered(entries))
    }
}

fn resource(envelope: &Envelope, spec: Mapping) -> Value {
    let mut root = Mapping::new();
    root.insert("apiVersion".into(), envelope.api_version.clone().into());
    root.insert("kind".into(), envelope.kind.clone().into());
    root.insert("metadata".into(), Value::Mapping(envelope.metadata.clone()));
    root.insert("spec".into(), Value::Mapping(spec));
    Value::Mapping(root)
}

/// Drop nulls, blank strings and empty collections. `false` and `0` survive.
fn clean_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::Sequence(items) => {
            let items: Vec<Value> = items.iter().filter_map(clean_value).collect();
            (!items.is_empty()).then_some(Value::Sequence(items))
        }
        Value::Mapping(map) => {
            let mut out = Mapping::new();
            for (k, v) in map {
                if let Some(v) = clean_value(v) {
                    out.insert(k.clone(), v);
                }
            }
            (!out.is_empty()).then_some(Value::Mapping(out))
        }
        other => Some(other.clone()),
    }
}

fn key_rank(key: &str) -> u8 {
    match key {
        "uri" => 0,
        EXPRESSION_FIELD => 1,
        STEPS => 3,
        _ => 2,
    }
}

fn ordered(mut entries: Vec<(String, Value)>) -> Mapping {
    entries.sort_by(|(a, _), (b, _)| key_rank(a).cmp(&key_rank(b)).then_with(|| a.cmp(b)));
    entries
        .into_iter()
        .map(|(k, v)| (Value::String(k), v))
        .collect()
}

/// Apply key ordering to every map inside a plain value.
fn order_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut string_keyed = Vec::new();
            let mut other = Mapping::new();
            for (k, v) in map {
                match k {
                    Value::String(s) => string_keyed.push((s, order_value(v))),
                    k => {
                        other.insert(k, order_value(v));
                    }
                }
            }
            let mut out = ordered(string_keyed);
            out.extend(other);
            Value::Mapping(out)
        }
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(order_value).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::SchemaRegistry;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builtin().expect("builtin catalog")
    }

    #[test]
    fn given_parameter_bag_when_cleaning_then_false_and_zero_survive() {
        let bag: Value = serde_yaml::from_str("a: ''\nb: '  '\nc: false\nd: 0\ne: null\n").expect("yaml");
        let cleaned = clean_value(&bag).expect("non-empty");
        let map = cleaned.as_mapping().expect("mapping");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("c"), Some(&Value::Bool(false)));
        assert!(map.contains_key("d"));
    }

    #[test]
    fn given_keys_when_ordering_then_uri_expression_lexical_steps() {
        let entries = vec![
            ("steps".to_string(), Value::Null),
            ("id".to_string(), Value::Null),
            ("expression".to_string(), Value::Null),
            ("description".to_string(), Value::Null),
            ("uri".to_string(), Value::Null),
        ];
        let keys: Vec<_> = ordered(entries)
            .keys()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        assert_eq!(keys, vec!["uri", "expression", "description", "id", "steps"]);
    }

    #[test]
    fn given_unknown_kind_when_serialize_then_omitted() {
        let reg = registry();
        let mut doc = Document::plain("a.yaml");
        doc.flows.push(Node::new("MysteryDefinition").with_value("x", "y"));
        let text = Codec::new(&reg).serialize(&doc).expect("serialize");
        assert_eq!(text.trim(), "[]");
    }

    #[test]
    fn given_empty_nested_node_when_serialize_then_written_as_empty_map() {
        let reg = registry();
        let choice = Node::new("ChoiceDefinition").with_child("otherwise", Node::new("OtherwiseDefinition"));
        let route = Node::new("RouteDefinition").with_child(
            "from",
            Node::new("FromDefinition")
                .with_value("uri", "direct:a")
                .with_children("steps", vec![choice]),
        );
        let mut doc = Document::plain("a.yaml");
        doc.flows.push(route);
        let text = Codec::new(&reg).serialize(&doc).expect("serialize");
        assert!(text.contains("otherwise: {}"), "{text}");
        assert!(text.contains("- choice:"), "{text}");
    }
}
