//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem) but are themselves
//! concrete structs, not traits.

mod document;
mod project;

pub use document::{document_name, DocumentService, FormatOutcome};
pub use project::ProjectService;
