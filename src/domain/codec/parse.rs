use serde_yaml::{Mapping, Value};
use tracing::{debug, instrument, warn};

use super::case::camelize_keys;
use super::{Codec, CAMEL_API_GROUP};
use crate::domain::document::{Document, DocumentShape, Envelope};
use crate::domain::element::{Field, Node};
use crate::domain::schema::{Category, Multiplicity, ANY_STEP, EXPRESSION_FIELD};

impl Codec<'_> {
    /// Parse text into a document named `name`.
    ///
    /// Malformed text and unrecognized resources yield an empty `plain` document.
    #[instrument(level = "debug", skip(self, text))]
    pub fn parse(&self, name: &str, text: &str) -> Document {
        let value: Value = match serde_yaml::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!("parse: malformed yaml in {}: {}", name, e);
                return Document::plain(name);
            }
        };

        match value {
            Value::Sequence(items) => {
                let mut doc = Document::plain(name);
                doc.flows = self.read_flows(items);
                doc
            }
            Value::Mapping(map) => self.read_resource(name, map),
            Value::Null => Document::plain(name),
            _ => {
                warn!("parse: {} is neither a list nor a resource", name);
                Document::plain(name)
            }
        }
    }

    fn read_resource(&self, name: &str, mut map: Mapping) -> Document {
        let kind = map.get("kind").and_then(Value::as_str).unwrap_or_default().to_string();
        let api_version = map
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let metadata = match map.remove("metadata") {
            Some(Value::Mapping(m)) => m,
            _ => Mapping::new(),
        };
        let mut spec = match map.remove("spec") {
            Some(Value::Mapping(m)) => m,
            _ => Mapping::new(),
        };

        let (shape, flows) = if kind == "Kamelet" {
            let template = spec.remove("template").unwrap_or(Value::Null);
            let route = match camelize_keys(template) {
                Value::Null => None,
                value => self.read_node("RouteDefinition", value),
            };
            (DocumentShape::Kamelet, route.into_iter().collect())
        } else if kind == "Integration" && api_version.starts_with(CAMEL_API_GROUP) {
            let flows = match spec.remove("flows") {
                Some(Value::Sequence(items)) => self.read_flows(items),
                _ => Vec::new(),
            };
            (DocumentShape::Crd, flows)
        } else {
            warn!("parse: unsupported resource kind '{}' in {}", kind, name);
            return Document::plain(name);
        };

        debug!("read_resource: shape={} flows={}", shape, flows.len());
        Document {
            name: name.to_string(),
            shape,
            envelope: Some(Envelope {
                api_version,
                kind,
                metadata,
                extra_spec: spec,
            }),
            flows,
        }
    }

    fn read_flows(&self, items: Vec<Value>) -> Vec<Node> {
        items
            .into_iter()
            .map(camelize_keys)
            .filter_map(|item| self.read_flow(item))
            .collect()
    }

    /// Top-level entry keyed by `route`, `from`, `rest`, `restConfiguration` or `beans`.
    fn read_flow(&self, item: Value) -> Option<Node> {
        let Value::Mapping(map) = item else {
            debug!("read_flow: skipping non-mapping entry");
            return None;
        };
        for (key, value) in map {
            let Some(key) = key.as_str() else { continue };
            if key == "from" {
                let from = self.read_node("FromDefinition", value)?;
                return Some(Node::new("RouteDefinition").with_child("from", from));
            }
            match self.registry.kind_for_step(key) {
                Some(kind) if self.registry.category(kind) == Some(Category::Flow) => {
                    return self.read_node(kind, value);
                }
                _ => debug!("read_flow: unknown top-level key '{}'", key),
            }
        }
        None
    }

    /// Step list entry of the form `{stepName: body}`.
    fn read_step(&self, item: Value) -> Option<Node> {
        let Value::Mapping(map) = item else {
            return None;
        };
        let (key, value) = map.into_iter().next()?;
        let key = key.as_str()?;
        match self.registry.kind_for_step(key) {
            Some(kind) => self.read_node(kind, value),
            None => {
                debug!("read_step: unknown step '{}'", key);
                None
            }
        }
    }

    /// Rebuild a node of `kind` from its body, with a fresh identity.
    pub(crate) fn read_node(&self, kind: &str, value: Value) -> Option<Node> {
        let spec = self.registry.kind(kind)?;
        let mut node = Node::new(kind);

        match value {
            Value::Mapping(map) => {
                let map = self.lift_languages(kind, map);
                for (key, value) in map {
                    let Some(key) = key.as_str() else { continue };
                    self.read_field(&mut node, key, value);
                }
            }
            Value::Sequence(items) => {
                let field = spec.value_field.as_deref()?;
                self.read_field(&mut node, field, Value::Sequence(items));
            }
            Value::Null => {}
            scalar => {
                // `to: direct:a`, `simple: ${body}`
                match spec.properties.iter().find(|p| p.required && p.is_string()) {
                    Some(target) => node.set_value(&target.name, scalar),
                    None => debug!("read_node: {} has no shorthand property", kind),
                }
            }
        }
        Some(node)
    }

    fn read_field(&self, node: &mut Node, key: &str, value: Value) {
        if value.is_null() {
            return;
        }
        let Some(child) = self.registry.child_spec(node.kind(), key) else {
            node.set_value(key, value);
            return;
        };

        match child.multiplicity {
            Multiplicity::Single => {
                if let Some(n) = self.read_child(&child.constraint, value) {
                    node.insert_field(key, Field::Node(Box::new(n)));
                }
            }
            Multiplicity::Array => {
                let items = match value {
                    Value::Sequence(items) => items,
                    Value::Mapping(m) => vec![Value::Mapping(m)],
                    _ => return,
                };
                let nodes: Vec<Node> = items
                    .into_iter()
                    .filter_map(|item| self.read_child(&child.constraint, item))
                    .filter(|n| self.registry.accepts(&child, n.kind()))
                    .collect();
                node.insert_field(key, Field::Nodes(nodes));
            }
        }
    }

    fn read_child(&self, constraint: &str, value: Value) -> Option<Node> {
        if constraint == ANY_STEP {
            self.read_step(value)
        } else {
            self.read_node(constraint, value)
        }
    }

    /// Move language keys placed directly on an expression-owning node under `expression`.
    fn lift_languages(&self, kind: &str, map: Mapping) -> Mapping {
        if !self.registry.owns_expression(kind) || map.contains_key(EXPRESSION_FIELD) {
            return map;
        }
        let has_language = map
            .keys()
            .filter_map(Value::as_str)
            .any(|k| self.registry.is_language(k) && self.registry.property(kind, k).is_none());
        if !has_language {
            return map;
        }

        let mut rest = Mapping::new();
        let mut expression = Mapping::new();
        for (k, v) in map {
            let is_language = k
                .as_str()
                .is_some_and(|k| self.registry.is_language(k) && self.registry.property(kind, k).is_none());
            if is_language {
                expression.insert(k, v);
            } else {
                rest.insert(k, v);
            }
        }
        rest.insert(EXPRESSION_FIELD.into(), Value::Mapping(expression));
        rest
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
    fn given_malformed_text_when_parse_then_empty_plain_document() {
        let reg = registry();
        let doc = Codec::new(&reg).parse("broken.yaml", "- route: [unclosed");
        assert_eq!(doc.shape, DocumentShape::Plain);
        assert!(doc.flows.is_empty());
        assert_eq!(doc.name, "broken.yaml");
    }

    #[test]
    fn given_scalar_step_when_parse_then_binds_first_required_string() {
        let reg = registry();
        let text = "- from:\n    uri: timer:tick\n    steps:\n    - to: direct:a\n";
        let doc = Codec::new(&reg).parse("a.yaml", text);
        let from = doc.flows[0].child("from").expect("from");
        let to = &from.children("steps")[0];
        assert_eq!(to.kind(), "ToDefinition");
        assert_eq!(to.str_value("uri"), Some("direct:a"));
    }

    #[test]
    fn given_language_on_step_when_parse_then_moved_under_expression() {
        let reg = registry();
        let text = "- route:\n    from:\n      uri: direct:a\n      steps:\n      - set-body:\n          simple: ${body}\n";
        let doc = Codec::new(&reg).parse("a.yaml", text);
        let set_body = &doc.flows[0].child("from").expect("from").children("steps")[0];
        let simple = set_body
            .child("expression")
            .and_then(|e| e.child("simple"))
            .expect("simple");
        assert_eq!(simple.kind(), "SimpleExpression");
        assert_eq!(simple.str_value("expression"), Some("${body}"));
    }

    #[test]
    fn given_unknown_step_when_parse_then_skipped() {
        let reg = registry();
        let text = "- route:\n    from:\n      uri: direct:a\n      steps:\n      - teleport:\n          where: mars\n      - log: hi\n";
        let doc = Codec::new(&reg).parse("a.yaml", text);
        let steps = doc.flows[0].child("from").expect("from").children("steps");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].kind(), "LogDefinition");
    }

    #[test]
    fn given_foreign_resource_when_parse_then_empty() {
        let reg = registry();
        let text = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: x\n";
        let doc = Codec::new(&reg).parse("cm.yaml", text);
        assert!(doc.flows.is_empty());
        assert!(doc.envelope.is_none());
    }
}
