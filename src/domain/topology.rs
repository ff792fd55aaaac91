//! Topology projection: derived graph of incoming endpoints, routes, outgoing calls, rest
//! services and beans across a set of documents

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::document::Document;
use crate::domain::element::{children_of, Node, NodeId};
use crate::domain::endpoint::{endpoint_uri, Endpoint};
use crate::domain::mutation::BEANS_KIND;
use crate::domain::schema::SchemaRegistry;

/// Step kinds that call out of a route.
pub const OUTGOING_KINDS: [&str; 6] = [
    "ToDefinition",
    "ToDynamicDefinition",
    "EnrichDefinition",
    "PollEnrichDefinition",
    "WireTapDefinition",
    "SagaDefinition",
];

/// Schemes classified as internal by default.
pub const DEFAULT_INTERNAL_SCHEMES: [&str; 3] = ["direct", "seda", "vertx"];

const REST_VERBS: [&str; 6] = ["get", "post", "put", "delete", "patch", "head"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorType {
    Component,
    Kamelet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingNode {
    pub id: String,
    pub title: String,
    pub internal: bool,
    pub connector_type: ConnectorType,
    pub scheme: String,
    pub unique_uri: String,
    pub uri: String,
    pub route_id: String,
    pub node_id: NodeId,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteNode {
    pub id: String,
    pub title: String,
    pub route_id: String,
    pub node_id: NodeId,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingNode {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub internal: bool,
    pub connector_type: Option<ConnectorType>,
    pub scheme: Option<String>,
    pub unique_uri: Option<String>,
    pub route_id: String,
    pub node_id: NodeId,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestNode {
    pub id: String,
    pub title: String,
    pub path: Option<String>,
    /// Verb targets, e.g. `direct:get-orders`
    pub uris: Vec<String>,
    pub node_id: NodeId,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeanNode {
    pub id: String,
    pub title: String,
    pub bean_type: Option<String>,
    pub node_id: NodeId,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Borrowed view over any graph node.
#[derive(Debug, Clone, Copy)]
pub enum GraphNode<'a> {
    Incoming(&'a IncomingNode),
    Route(&'a RouteNode),
    Outgoing(&'a OutgoingNode),
    Rest(&'a RestNode),
    Bean(&'a BeanNode),
}

impl<'a> GraphNode<'a> {
    pub fn id(&self) -> &'a str {
        match *self {
            GraphNode::Incoming(n) => &n.id,
            GraphNode::Route(n) => &n.id,
            GraphNode::Outgoing(n) => &n.id,
            GraphNode::Rest(n) => &n.id,
            GraphNode::Bean(n) => &n.id,
        }
    }

    pub fn title(&self) -> &'a str {
        match *self {
            GraphNode::Incoming(n) => &n.title,
            GraphNode::Route(n) => &n.title,
            GraphNode::Outgoing(n) => &n.title,
            GraphNode::Rest(n) => &n.title,
            GraphNode::Bean(n) => &n.title,
        }
    }

    pub fn file_name(&self) -> &'a str {
        match *self {
            GraphNode::Incoming(n) => &n.file_name,
            GraphNode::Route(n) => &n.file_name,
            GraphNode::Outgoing(n) => &n.file_name,
            GraphNode::Rest(n) => &n.file_name,
            GraphNode::Bean(n) => &n.file_name,
        }
    }
}

/// Result of a projection; created per call, never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Topology {
    pub incoming: Vec<IncomingNode>,
    pub routes: Vec<RouteNode>,
    pub outgoing: Vec<OutgoingNode>,
    pub rests: Vec<RestNode>,
    pub beans: Vec<BeanNode>,
    pub edges: Vec<Edge>,
}

impl Topology {
    pub fn nodes(&self) -> impl Iterator<Item = GraphNode<'_>> {
        self.incoming
            .iter()
            .map(GraphNode::Incoming)
            .chain(self.routes.iter().map(GraphNode::Route))
            .chain(self.outgoing.iter().map(GraphNode::Outgoing))
            .chain(self.rests.iter().map(GraphNode::Rest))
            .chain(self.beans.iter().map(GraphNode::Bean))
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }
}

/// Projects documents into a [`Topology`].
#[derive(Debug, Clone)]
pub struct TopologyProjector<'r> {
    registry: &'r SchemaRegistry,
    internal_schemes: Vec<String>,
}

impl<'r> TopologyProjector<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            internal_schemes: DEFAULT_INTERNAL_SCHEMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_internal_schemes(mut self, schemes: Vec<String>) -> Self {
        self.internal_schemes = schemes;
        self
    }

    fn is_internal(&self, scheme: &str) -> bool {
        self.internal_schemes.iter().any(|s| s == scheme)
    }

    #[instrument(level = "debug", skip_all, fields(documents = docs.len()))]
    pub fn project(&self, docs: &[Document]) -> Topology {
        let mut topology = Topology {
            incoming: docs.iter().flat_map(|d| self.incoming_nodes(d)).collect(),
            routes: docs.iter().flat_map(|d| self.route_nodes(d)).collect(),
            outgoing: docs.iter().flat_map(|d| self.outgoing_nodes(d)).collect(),
            rests: docs.iter().flat_map(|d| self.rest_nodes(d)).collect(),
            beans: docs.iter().flat_map(|d| self.bean_nodes(d)).collect(),
            edges: Vec::new(),
        };
        dedupe_by_id(&mut topology.incoming, |n| n.id.as_str());
        dedupe_by_id(&mut topology.routes, |n| n.id.as_str());
        dedupe_by_id(&mut topology.outgoing, |n| n.id.as_str());
        dedupe_by_id(&mut topology.rests, |n| n.id.as_str());
        dedupe_by_id(&mut topology.beans, |n| n.id.as_str());
        topology.edges = self.edges(&topology);
        debug!(
            "project: incoming={} routes={} outgoing={} edges={}",
            topology.incoming.len(),
            topology.routes.len(),
            topology.outgoing.len(),
            topology.edges.len()
        );
        topology
    }

    pub fn incoming_nodes(&self, doc: &Document) -> Vec<IncomingNode> {
        doc.routes()
            .filter_map(|route| {
                let from = route.child("from")?;
                let endpoint = Endpoint::from_node(self.registry, from)?;
                let route_id = route.camel_id().to_string();
                Some(IncomingNode {
                    id: format!("incoming-{}", route_id),
                    title: endpoint_uri(from).unwrap_or_default(),
                    internal: self.is_internal(&endpoint.scheme),
                    connector_type: connector_type(&endpoint),
                    scheme: endpoint.scheme.clone(),
                    unique_uri: endpoint.unique_uri(self.registry),
                    uri: endpoint_uri(from).unwrap_or_default(),
                    route_id,
                    node_id: from.id().clone(),
                    file_name: doc.name.clone(),
                })
            })
            .collect()
    }

    pub fn route_nodes(&self, doc: &Document) -> Vec<RouteNode> {
        doc.routes()
            .map(|route| {
                let route_id = route.camel_id().to_string();
                RouteNode {
                    id: format!("route-{}", route_id),
                    title: route
                        .str_value("description")
                        .unwrap_or(&route_id)
                        .to_string(),
                    route_id,
                    node_id: route.id().clone(),
                    file_name: doc.name.clone(),
                }
            })
            .collect()
    }

    pub fn outgoing_nodes(&self, doc: &Document) -> Vec<OutgoingNode> {
        let mut out = Vec::new();
        for route in doc.routes() {
            let route_id = route.camel_id();
            let mut steps = Vec::new();
            if let Some(from) = route.child("from") {
                self.collect_outgoing(from, &mut steps);
            }
            for step in steps {
                let endpoint = Endpoint::from_node(self.registry, step);
                out.push(OutgoingNode {
                    id: format!("outgoing-{}-{}", route_id, step.camel_id()),
                    title: endpoint_uri(step)
                        .unwrap_or_else(|| self.registry.title(step.kind()).to_string()),
                    kind: step.kind().to_string(),
                    internal: endpoint
                        .as_ref()
                        .is_some_and(|e| self.is_internal(&e.scheme)),
                    connector_type: endpoint.as_ref().map(connector_type),
                    scheme: endpoint.as_ref().map(|e| e.scheme.clone()),
                    unique_uri: endpoint.as_ref().map(|e| e.unique_uri(self.registry)),
                    route_id: route_id.to_string(),
                    node_id: step.id().clone(),
                    file_name: doc.name.clone(),
                });
            }
        }
        out
    }

    /// Outgoing steps below `node`, not descending into outgoing kinds.
    fn collect_outgoing<'a>(&self, node: &'a Node, out: &mut Vec<&'a Node>) {
        for spec in self.registry.child_specs(node.kind()) {
            for child in children_of(node, &spec) {
                if OUTGOING_KINDS.contains(&child.kind()) {
                    out.push(child);
                } else {
                    self.collect_outgoing(child, out);
                }
            }
        }
    }

    pub fn rest_nodes(&self, doc: &Document) -> Vec<RestNode> {
        doc.flows
            .iter()
            .filter(|n| n.kind() == "RestDefinition")
            .map(|rest| {
                let rest_id = rest.camel_id().to_string();
                let uris = REST_VERBS
                    .iter()
                    .flat_map(|verb| rest.children(verb))
                    .filter_map(|v| v.str_value("to").map(str::to_string))
                    .collect();
                RestNode {
                    id: format!("rest-{}", rest_id),
                    title: rest.str_value("path").unwrap_or(&rest_id).to_string(),
                    path: rest.str_value("path").map(str::to_string),
                    uris,
                    node_id: rest.id().clone(),
                    file_name: doc.name.clone(),
                }
            })
            .collect()
    }

    pub fn bean_nodes(&self, doc: &Document) -> Vec<BeanNode> {
        doc.flows
            .iter()
            .filter(|n| n.kind() == BEANS_KIND)
            .flat_map(|c| c.children("beans"))
            .filter_map(|bean| {
                let name = bean.str_value("name")?;
                Some(BeanNode {
                    id: format!("bean-{}", name),
                    title: name.to_string(),
                    bean_type: bean.str_value("type").map(str::to_string),
                    node_id: bean.id().clone(),
                    file_name: doc.name.clone(),
                })
            })
            .collect()
    }

    fn edges(&self, topology: &Topology) -> Vec<Edge> {
        let mut edges = Vec::new();

        for incoming in &topology.incoming {
            edges.push(edge(&incoming.id, &format!("route-{}", incoming.route_id)));
        }
        for outgoing in &topology.outgoing {
            edges.push(edge(&format!("route-{}", outgoing.route_id), &outgoing.id));
            if let Some(unique) = &outgoing.unique_uri {
                for target in find_by_unique_uri(&topology.incoming, unique) {
                    edges.push(edge(&outgoing.id, &target.id));
                }
            }
        }
        for rest in &topology.rests {
            for uri in &rest.uris {
                for target in self.find_incoming_by_uri(&topology.incoming, uri, None) {
                    edges.push(edge(&rest.id, &target.id));
                }
            }
        }
        edges
    }

    /// Incoming nodes addressed by `uri`, optionally restricted to one document.
    pub fn find_incoming_by_uri<'a>(
        &self,
        nodes: &'a [IncomingNode],
        uri: &str,
        file_name: Option<&str>,
    ) -> Vec<&'a IncomingNode> {
        let scheme = uri.split(':').next().unwrap_or_default();
        let unique = Endpoint::parse(uri, self.registry.component(scheme)).unique_uri(self.registry);
        find_by_unique_uri(nodes, &unique)
            .into_iter()
            .filter(|n| file_name.map_or(true, |f| n.file_name == f))
            .collect()
    }
}

pub fn find_by_unique_uri<'a>(nodes: &'a [IncomingNode], unique_uri: &str) -> Vec<&'a IncomingNode> {
    nodes.iter().filter(|n| n.unique_uri == unique_uri).collect()
}

/// Keep the first node of each graph identity; later documents repeating a route or bean id lose.
fn dedupe_by_id<T>(nodes: &mut Vec<T>, id: impl Fn(&T) -> &str) {
    let mut seen = HashSet::new();
    nodes.retain(|n| {
        let first = seen.insert(id(n).to_string());
        if !first {
            debug!("project: dropping duplicate graph node {}", id(n));
        }
        first
    });
}

fn connector_type(endpoint: &Endpoint) -> ConnectorType {
    if endpoint.is_kamelet() {
        ConnectorType::Kamelet
    } else {
        ConnectorType::Component
    }
}

fn edge(source: &str, target: &str) -> Edge {
    Edge {
        source: source.to_string(),
        target: target.to_string(),
    }
}
