//! Required-field, secret-field and placeholder checks

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_yaml::Value;

use crate::domain::document::Document;
use crate::domain::element::{scalar_text, walk, Field, Node, NodeId};
use crate::domain::endpoint::Endpoint;
use crate::domain::schema::{ParameterSpec, SchemaRegistry, EXPRESSION_KIND};

const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([^{}]+?)\s*\}\}";

static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();

/// Outcome of [`check_required`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub reasons: Vec<String>,
}

impl From<CheckResult> for (bool, Vec<String>) {
    fn from(r: CheckResult) -> Self {
        (r.valid, r.reasons)
    }
}

/// Failed check of one node inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub node_id: NodeId,
    pub kind: String,
    pub camel_id: String,
    pub reasons: Vec<String>,
}

/// Placeholders found under a node, by scope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PlaceholderSet {
    /// `{{global:name}}`
    pub global: BTreeSet<String>,
    /// `{{route:name}}`
    pub route: BTreeSet<String>,
    /// `{{name}}`
    pub exchange: BTreeSet<String>,
}

impl PlaceholderSet {
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.route.is_empty() && self.exchange.is_empty()
    }

    pub fn extend(&mut self, other: PlaceholderSet) {
        self.global.extend(other.global);
        self.route.extend(other.route);
        self.exchange.extend(other.exchange);
    }

    fn insert(&mut self, raw: &str) {
        if let Some(name) = raw.strip_prefix("global:") {
            self.global.insert(name.trim().to_string());
        } else if let Some(name) = raw.strip_prefix("route:") {
            self.route.insert(name.trim().to_string());
        } else {
            self.exchange.insert(raw.to_string());
        }
    }
}

/// Check required properties of `node` (not its descendants).
pub fn check_required(registry: &SchemaRegistry, node: &Node) -> CheckResult {
    let mut reasons = Vec::new();

    for property in registry.properties(node.kind()).iter().filter(|p| p.required) {
        if property.type_name == EXPRESSION_KIND {
            if !expression_defined(registry, node.child(&property.name)) {
                reasons.push("Expression is not defined".to_string());
            }
        } else if registry.is_node_typed(property) {
            let present = node.child(&property.name).is_some() || !node.children(&property.name).is_empty();
            if !present {
                reasons.push(format!("{} is required", property.display()));
            }
        } else if !is_filled(node.value(&property.name)) {
            reasons.push(format!("{} is required", property.display()));
        }
    }

    if registry.property(node.kind(), "uri").is_some() {
        if let Some(endpoint) = Endpoint::from_node(registry, node) {
            reasons.extend(check_endpoint(registry, &endpoint));
        }
    }

    CheckResult {
        valid: reasons.is_empty(),
        reasons,
    }
}

/// An expression passes when at least one populated language sub-node passes itself.
fn expression_defined(registry: &SchemaRegistry, expression: Option<&Node>) -> bool {
    let Some(expression) = expression else {
        return false;
    };
    registry
        .child_specs(EXPRESSION_KIND)
        .iter()
        .filter_map(|spec| expression.child(&spec.field))
        .any(|language| check_required(registry, language).valid)
}

fn check_endpoint(registry: &SchemaRegistry, endpoint: &Endpoint) -> Vec<String> {
    let parameters: &[ParameterSpec] = if endpoint.is_kamelet() {
        match endpoint.kamelet_name().and_then(|k| registry.kamelet(k)) {
            Some(kamelet) => &kamelet.properties,
            None => return Vec::new(),
        }
    } else {
        match registry.component(&endpoint.scheme) {
            Some(component) => &component.properties,
            None => return Vec::new(),
        }
    };

    let mut reasons = Vec::new();
    for parameter in parameters {
        match endpoint.value(&parameter.name) {
            None if parameter.required => {
                reasons.push(format!("{} is required", parameter.display()));
            }
            Some(value) if parameter.secret && !is_placeholder(value) => {
                reasons.push(format!("{} is set in plain text", parameter.display()));
            }
            _ => {}
        }
    }
    reasons
}

fn is_filled(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Sequence(items)) => !items.is_empty(),
        Some(Value::Mapping(map)) => !map.is_empty(),
        Some(v) => scalar_text(v).is_some_and(|s| !s.trim().is_empty()),
        None => false,
    }
}

fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.starts_with("{{") && v.ends_with("}}")
}

/// Check every node of a document; only failing nodes are reported.
pub fn check_document(registry: &SchemaRegistry, doc: &Document) -> Vec<Finding> {
    let mut findings = Vec::new();
    for flow in &doc.flows {
        walk(registry, flow, &mut |node, _| {
            let result = check_required(registry, node);
            if !result.valid {
                findings.push(Finding {
                    node_id: node.id().clone(),
                    kind: node.kind().to_string(),
                    camel_id: node.camel_id().to_string(),
                    reasons: result.reasons,
                });
            }
        });
    }
    findings
}

/// Scan all plain values under `node` for `{{name}}` placeholders.
pub fn find_placeholders(node: &Node) -> PlaceholderSet {
    let mut set = PlaceholderSet::default();
    let Some(pattern) = PLACEHOLDER.get_or_init(|| Regex::new(PLACEHOLDER_PATTERN).ok()) else {
        return set;
    };
    for n in node.descendants() {
        for (_, field) in n.fields() {
            if let Field::Value(value) = field {
                scan_value(pattern, value, &mut set);
            }
        }
    }
    set
}

fn scan_value(pattern: &Regex, value: &Value, set: &mut PlaceholderSet) {
    match value {
        Value::String(s) => {
            for capture in pattern.captures_iter(s) {
                if let Some(name) = capture.get(1) {
                    set.insert(name.as_str());
                }
            }
        }
        Value::Sequence(items) => items.iter().for_each(|v| scan_value(pattern, v, set)),
        Value::Mapping(map) => map.values().for_each(|v| scan_value(pattern, v, set)),
        Value::Tagged(tagged) => scan_value(pattern, &tagged.value, set),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builtin().expect("builtin catalog")
    }

    #[test]
    fn given_blank_message_when_check_required_then_reports_message() {
        let reg = registry();
        let log = Node::new("LogDefinition").with_value("message", "   ");
        let (valid, reasons): (bool, Vec<String>) = check_required(&reg, &log).into();
        assert!(!valid);
        assert_eq!(reasons, vec!["Message is required"]);
    }

    #[test]
    fn given_missing_name_and_expression_when_check_required_then_both_reported() {
        let reg = registry();
        let set_header = Node::new("SetHeaderDefinition");
        let result = check_required(&reg, &set_header);
        assert_eq!(result.reasons, vec!["Name is required", "Expression is not defined"]);
    }

    #[test]
    fn given_placeholders_in_nested_values_when_scanning_then_categorized() {
        let bag: Value = serde_yaml::from_str("a: '{{global:token}}'\nb: ['x {{route:limit}} y']\n").expect("yaml");
        let node = Node::new("ToDefinition")
            .with_value("uri", "http://{{host}}/{{ host }}")
            .with_value("parameters", bag);

        let set = find_placeholders(&node);

        assert_eq!(set.exchange.iter().collect::<Vec<_>>(), vec!["host"]);
        assert!(set.global.contains("token"));
        assert!(set.route.contains("limit"));
    }
}
