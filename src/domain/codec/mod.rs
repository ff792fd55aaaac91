//! Textual codec: YAML text ↔ [`Document`](crate::domain::Document)
//!
//! Parsing never fails: malformed or unrecognized text yields an empty document and unknown
//! kinds are skipped. Serialization is canonical, so `serialize(parse(t)) == t` holds for
//! canonical input.

pub mod case;
mod emit;
mod parse;

use crate::domain::schema::SchemaRegistry;

/// API group prefix of Integration resources.
pub const CAMEL_API_GROUP: &str = "camel.apache.org/";

/// Reads and writes documents against a schema registry.
#[derive(Debug, Clone, Copy)]
pub struct Codec<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> Codec<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }
}
