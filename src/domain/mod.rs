//! Domain layer: element model, codec, mutation, topology and validation
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod codec;
pub mod document;
pub mod element;
pub mod endpoint;
pub mod error;
pub mod mutation;
pub mod schema;
pub mod topology;
pub mod validator;

pub use codec::Codec;
pub use document::{Document, DocumentShape, Envelope};
pub use element::{Field, Node, NodeId};
pub use error::{DomainError, DomainResult};
pub use mutation::{Located, TreeEditor};
pub use schema::{ChildSpec, SchemaRegistry};
pub use topology::{Topology, TopologyProjector};
pub use validator::{check_document, check_required, find_placeholders, CheckResult, PlaceholderSet};
