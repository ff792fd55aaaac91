//! Endpoint URIs: scheme, path parameters per connector syntax, query and parameter bag

use std::collections::BTreeMap;

use serde_yaml::Value;

use crate::domain::element::{scalar_text, Node};
use crate::domain::schema::{ComponentSpec, ParameterSpec, SchemaRegistry, EXPRESSION_FIELD};

pub const KAMELET_SCHEME: &str = "kamelet";

/// A parsed endpoint reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Endpoint {
    pub scheme: String,
    /// Everything between the scheme and the query string
    pub path: String,
    pub path_params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    /// The node's `parameters` map
    pub parameters: BTreeMap<String, String>,
}

impl Endpoint {
    /// Parse `uri`, naming path segments after the connector syntax when known.
    pub fn parse(uri: &str, component: Option<&ComponentSpec>) -> Self {
        let (scheme, rest) = match uri.split_once(':') {
            Some((scheme, rest)) => (scheme, rest),
            None => (uri, ""),
        };
        let rest = rest.strip_prefix("//").unwrap_or(rest);
        let (path, query) = match rest.split_once('?') {
            Some((p, q)) => (p, q),
            None => (rest, ""),
        };

        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();

        let path_params = component
            .map(|c| split_path(path, c))
            .unwrap_or_default();

        Self {
            scheme: scheme.to_string(),
            path: path.to_string(),
            path_params,
            query,
            parameters: BTreeMap::new(),
        }
    }

    /// Endpoint of a node with a `uri` property (or a literal expression), with its bag.
    pub fn from_node(registry: &SchemaRegistry, node: &Node) -> Option<Self> {
        let uri = endpoint_uri(node)?;
        let scheme = uri.split(':').next().unwrap_or_default();
        let mut endpoint = Self::parse(&uri, registry.component(scheme));
        if let Some(Value::Mapping(bag)) = node.value("parameters") {
            endpoint.parameters = bag
                .iter()
                .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_text(v)?)))
                .collect();
        }
        Some(endpoint)
    }

    /// Parameter value: path parameters, then the bag, then the query string.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.path_params
            .get(name)
            .or_else(|| self.parameters.get(name))
            .or_else(|| self.query.get(name))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn is_kamelet(&self) -> bool {
        self.scheme == KAMELET_SCHEME
    }

    /// Kamelet name of a `kamelet:` endpoint.
    pub fn kamelet_name(&self) -> Option<&str> {
        if !self.is_kamelet() {
            return None;
        }
        self.value("templateId")
            .or_else(|| self.path.split('/').next().filter(|s| !s.is_empty()))
    }

    /// `scheme:` followed by the required connector parameters as `name=value`, joined by `&`.
    ///
    /// Two endpoints address the same target iff their unique URIs are equal.
    pub fn unique_uri(&self, registry: &SchemaRegistry) -> String {
        let Some(component) = registry.component(&self.scheme) else {
            return format!("{}:{}", self.scheme, self.path);
        };
        let pairs: Vec<String> = component
            .properties
            .iter()
            .filter(|p| p.required)
            .filter_map(|p| self.value(&p.name).map(|v| format!("{}={}", p.name, v)))
            .collect();
        format!("{}:{}", self.scheme, pairs.join("&"))
    }
}

/// URI of an endpoint node: its `uri`, else the text of a literal expression.
pub fn endpoint_uri(node: &Node) -> Option<String> {
    if let Some(uri) = node.str_value("uri") {
        return Some(uri.to_string()).filter(|u| !u.trim().is_empty());
    }
    let expression = node.child(EXPRESSION_FIELD)?;
    ["constant", "simple"]
        .iter()
        .find_map(|lang| expression.child(lang)?.str_value("expression"))
        .map(str::to_string)
}

/// Name path segments after the connector syntax.
///
/// Delimiters are `:` and `/`; the last named segment absorbs the rest. With fewer segments
/// than names, optional names are dropped first.
fn split_path(path: &str, component: &ComponentSpec) -> BTreeMap<String, String> {
    if path.is_empty() {
        return BTreeMap::new();
    }
    let mut names: Vec<&ParameterSpec> = component.path_parameters().collect();
    let available = path.split([':', '/']).filter(|s| !s.is_empty()).count();
    while names.len() > available.max(1) {
        match names.iter().position(|p| !p.required) {
            Some(i) => names.remove(i),
            None => names.remove(names.len() - 1),
        };
    }
    if names.is_empty() {
        return BTreeMap::new();
    }
    names
        .iter()
        .zip(path.splitn(names.len(), [':', '/']))
        .filter(|(_, v)| !v.is_empty())
        .map(|(p, v)| (p.name.clone(), v.to_string()))
        .collect()
}
