//! Schema registry: per-kind property tables plus connector and kamelet catalogs
//!
//! Every structural walk in the crate (parse, serialize, find, validate, project) is driven by
//! lookups into this registry. The registry is read-only after construction and is installed
//! at most once per process.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::error::{DomainError, DomainResult};

/// Field name of the open-ended step list.
pub const STEPS: &str = "steps";

/// Type constraint of a field that accepts any step kind.
pub const ANY_STEP: &str = "CamelElement";

/// Kind holding a language sub-node.
pub const EXPRESSION_KIND: &str = "ExpressionDefinition";

/// Field carrying the expression of expression-owning kinds.
pub const EXPRESSION_FIELD: &str = "expression";

const BUILTIN_CATALOG: &str = include_str!("../../resources/catalog.json");

/// Kinds that are always emitted flat, even inside a step list.
const FLAT_KINDS: [&str; 3] = ["FromDefinition", "OtherwiseDefinition", "DoFinallyDefinition"];

static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Flow,
    Endpoint,
    Step,
    Branch,
    Expression,
    Language,
    DataFormat,
    Verb,
    Bean,
}

/// Declared property of a node kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Declared type: `string`, `boolean`, `object`, a kind name or `CamelElement`
    #[serde(rename = "type", default = "default_type")]
    pub type_name: String,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub is_object: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub secret: bool,
}

fn default_type() -> String {
    "string".to_string()
}

impl PropertySpec {
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_string(&self) -> bool {
        self.type_name == "string" && !self.is_array
    }
}

/// Declared shape of a node kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSpec {
    /// Wrapper key used in text; absent for kinds that never appear wrapped
    #[serde(default)]
    pub step_name: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub title: Option<String>,
    /// Array property that receives a bare sequence value, e.g. `beans: [...]`
    #[serde(default)]
    pub value_field: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ParameterKind {
    Path,
    #[default]
    Parameter,
}

/// Declared parameter of a connector or kamelet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub kind: ParameterKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub secret: bool,
}

impl ParameterSpec {
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Connector catalog entry, keyed by URI scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub title: String,
    /// URI syntax, e.g. `jms:destinationType:destinationName`
    pub syntax: String,
    #[serde(default)]
    pub properties: Vec<ParameterSpec>,
}

impl ComponentSpec {
    /// Path parameters in the order they appear in the syntax.
    pub fn path_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.properties
            .iter()
            .filter(|p| p.kind == ParameterKind::Path)
    }
}

/// Kamelet catalog entry, keyed by kamelet name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KameletSpec {
    pub title: String,
    #[serde(rename = "type", default)]
    pub kamelet_type: String,
    #[serde(default)]
    pub properties: Vec<ParameterSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    Single,
    Array,
}

/// Node-typed field of a kind, derived from the registry on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpec {
    pub field: String,
    /// Accepted kind, or [`ANY_STEP`]
    pub constraint: String,
    pub multiplicity: Multiplicity,
}

impl ChildSpec {
    pub fn is_steps(&self) -> bool {
        self.field == STEPS
    }
}

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    kinds: BTreeMap<String, KindSpec>,
    #[serde(default)]
    components: BTreeMap<String, ComponentSpec>,
    #[serde(default)]
    kamelets: BTreeMap<String, KameletSpec>,
}

/// Read-only schema tables.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    kinds: BTreeMap<String, KindSpec>,
    by_step_name: HashMap<String, String>,
    components: BTreeMap<String, ComponentSpec>,
    kamelets: BTreeMap<String, KameletSpec>,
}

impl SchemaRegistry {
    /// Decode a JSON catalog.
    pub fn from_json(json: &str) -> DomainResult<Self> {
        let catalog: Catalog =
            serde_json::from_str(json).map_err(|e| DomainError::InvalidCatalog {
                message: e.to_string(),
            })?;

        let mut by_step_name = HashMap::new();
        for (kind, spec) in &catalog.kinds {
            if let Some(step) = &spec.step_name {
                if let Some(previous) = by_step_name.insert(step.clone(), kind.clone()) {
                    return Err(DomainError::InvalidCatalog {
                        message: format!(
                            "step name '{}' declared by both {} and {}",
                            step, previous, kind
                        ),
                    });
                }
            }
        }
        debug!(
            "from_json: kinds={} components={} kamelets={}",
            catalog.kinds.len(),
            catalog.components.len(),
            catalog.kamelets.len()
        );

        Ok(Self {
            kinds: catalog.kinds,
            by_step_name,
            components: catalog.components,
            kamelets: catalog.kamelets,
        })
    }

    /// Catalog compiled into the binary.
    pub fn builtin() -> DomainResult<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn kind(&self, kind: &str) -> Option<&KindSpec> {
        self.kinds.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = (&str, &KindSpec)> {
        self.kinds.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn kind_for_step(&self, step_name: &str) -> Option<&str> {
        self.by_step_name.get(step_name).map(String::as_str)
    }

    pub fn step_name(&self, kind: &str) -> Option<&str> {
        self.kind(kind).and_then(|k| k.step_name.as_deref())
    }

    pub fn category(&self, kind: &str) -> Option<Category> {
        self.kind(kind).map(|k| k.category)
    }

    pub fn title<'a>(&'a self, kind: &'a str) -> &'a str {
        self.kind(kind)
            .and_then(|k| k.title.as_deref())
            .unwrap_or(kind)
    }

    pub fn properties(&self, kind: &str) -> &[PropertySpec] {
        self.kind(kind)
            .map(|k| k.properties.as_slice())
            .unwrap_or_default()
    }

    pub fn property(&self, kind: &str, name: &str) -> Option<&PropertySpec> {
        self.properties(kind).iter().find(|p| p.name == name)
    }

    /// Whether a property holds nested nodes rather than plain values.
    pub fn is_node_typed(&self, property: &PropertySpec) -> bool {
        property.is_object
            && (property.type_name == ANY_STEP || self.kinds.contains_key(&property.type_name))
    }

    /// Node-typed fields of `kind` in declaration order; unknown kinds have none.
    pub fn child_specs(&self, kind: &str) -> Vec<ChildSpec> {
        self.properties(kind)
            .iter()
            .filter(|p| self.is_node_typed(p))
            .map(|p| ChildSpec {
                field: p.name.clone(),
                constraint: p.type_name.clone(),
                multiplicity: if p.is_array {
                    Multiplicity::Array
                } else {
                    Multiplicity::Single
                },
            })
            .collect()
    }

    pub fn child_spec(&self, kind: &str, field: &str) -> Option<ChildSpec> {
        self.child_specs(kind).into_iter().find(|s| s.field == field)
    }

    /// Whether the kind has the open-ended `steps` list.
    pub fn has_children_field(&self, kind: &str) -> bool {
        self.property(kind, STEPS)
            .is_some_and(|p| p.is_array && self.is_node_typed(p))
    }

    /// Whether a node of `kind` may sit in a field with this spec.
    pub fn accepts(&self, spec: &ChildSpec, kind: &str) -> bool {
        if spec.constraint == kind {
            return true;
        }
        spec.constraint == ANY_STEP && self.category(kind) == Some(Category::Step)
    }

    /// Whether nodes of `kind` are written as `{stepName: {...}}` in step lists and at top level.
    pub fn is_wrapper_eligible(&self, kind: &str) -> bool {
        let Some(spec) = self.kind(kind) else {
            return false;
        };
        spec.step_name.is_some()
            && !matches!(
                spec.category,
                Category::Expression | Category::Language | Category::DataFormat
            )
            && !FLAT_KINDS.contains(&kind)
    }

    /// Whether `kind` owns an expression sub-node.
    pub fn owns_expression(&self, kind: &str) -> bool {
        self.property(kind, EXPRESSION_FIELD)
            .is_some_and(|p| p.type_name == EXPRESSION_KIND)
    }

    /// Whether a field name of the expression kind names a language.
    pub fn is_language(&self, name: &str) -> bool {
        self.property(EXPRESSION_KIND, name).is_some()
    }

    pub fn component(&self, scheme: &str) -> Option<&ComponentSpec> {
        self.components.get(scheme)
    }

    pub fn kamelet(&self, name: &str) -> Option<&KameletSpec> {
        self.kamelets.get(name)
    }
}

/// Install the process-wide registry. Fails if one is already installed.
pub fn install(registry: SchemaRegistry) -> DomainResult<&'static SchemaRegistry> {
    REGISTRY
        .set(registry)
        .map_err(|_| DomainError::RegistryAlreadyInstalled)?;
    REGISTRY.get().ok_or(DomainError::RegistryAlreadyInstalled)
}

/// The installed registry, falling back to the built-in catalog.
pub fn global() -> DomainResult<&'static SchemaRegistry> {
    if let Some(registry) = REGISTRY.get() {
        return Ok(registry);
    }
    let builtin = SchemaRegistry::builtin()?;
    Ok(REGISTRY.get_or_init(|| builtin))
}
