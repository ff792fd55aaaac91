//! Documents: a named tree of top-level nodes plus the envelope of its physical shape

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::domain::element::Node;
use crate::domain::error::DomainError;

/// Default `apiVersion` of synthesized `crd` documents.
pub const DEFAULT_API_VERSION: &str = "camel.apache.org/v1";

/// Physical source shape of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentShape {
    /// Integration resource with `spec.flows`
    Crd,
    /// Bare list of flows
    #[default]
    Plain,
    /// Kamelet descriptor with `spec.template`
    Kamelet,
}

impl fmt::Display for DocumentShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentShape::Crd => "crd",
            DocumentShape::Plain => "plain",
            DocumentShape::Kamelet => "kamelet",
        };
        f.write_str(s)
    }
}

impl FromStr for DocumentShape {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crd" => Ok(DocumentShape::Crd),
            "plain" => Ok(DocumentShape::Plain),
            "kamelet" => Ok(DocumentShape::Kamelet),
            other => Err(DomainError::UnknownShape(other.to_string())),
        }
    }
}

/// Resource envelope carried verbatim for `crd` and `kamelet` documents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    pub api_version: String,
    pub kind: String,
    pub metadata: Mapping,
    /// `spec` keys other than the flows/template slot, e.g. a kamelet `definition`
    pub extra_spec: Mapping,
}

/// A named tree of top-level nodes. Changed only by whole-tree replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: String,
    pub shape: DocumentShape,
    pub envelope: Option<Envelope>,
    pub flows: Vec<Node>,
}

impl Document {
    /// Empty bare-list document.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: DocumentShape::Plain,
            envelope: None,
            flows: Vec::new(),
        }
    }

    /// Empty Integration resource named `name`.
    pub fn crd(name: impl Into<String>, api_version: impl Into<String>) -> Self {
        let name = name.into();
        let mut metadata = Mapping::new();
        metadata.insert("name".into(), name.clone().into());
        Self {
            name,
            shape: DocumentShape::Crd,
            envelope: Some(Envelope {
                api_version: api_version.into(),
                kind: "Integration".to_string(),
                metadata,
                extra_spec: Mapping::new(),
            }),
            flows: Vec::new(),
        }
    }

    /// Empty document of the given shape.
    pub fn empty(name: impl Into<String>, shape: DocumentShape, api_version: &str) -> Self {
        match shape {
            DocumentShape::Plain => Self::plain(name),
            DocumentShape::Crd => Self::crd(name, api_version),
            DocumentShape::Kamelet => {
                let mut doc = Self::crd(name, api_version);
                doc.shape = DocumentShape::Kamelet;
                if let Some(envelope) = doc.envelope.as_mut() {
                    envelope.kind = "Kamelet".to_string();
                }
                doc
            }
        }
    }

    /// Same document with a different tree.
    pub fn with_flows(&self, flows: Vec<Node>) -> Self {
        Self {
            name: self.name.clone(),
            shape: self.shape,
            envelope: self.envelope.clone(),
            flows,
        }
    }

    pub fn routes(&self) -> impl Iterator<Item = &Node> {
        self.flows.iter().filter(|n| n.kind() == "RouteDefinition")
    }

    /// Deep copy; `regenerate_ids` replaces every identity in the tree.
    pub fn clone_document(&self, regenerate_ids: bool) -> Self {
        self.with_flows(
            self.flows
                .iter()
                .map(|n| n.clone_node(regenerate_ids))
                .collect(),
        )
    }
}
