//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{DocumentService, ProjectService};
use crate::config::Settings;
use crate::domain::SchemaRegistry;
use crate::infrastructure::catalog::load_registry;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraResult;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Process-wide schema registry
    pub registry: &'static SchemaRegistry,

    pub documents: DocumentService,
    pub project: ProjectService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> InfraResult<Self> {
        let settings = Arc::new(settings);
        let registry = load_registry(&settings, fs.as_ref())?;

        let documents = DocumentService::new(fs.clone(), registry, settings.clone());
        let project = ProjectService::new(fs.clone(), registry, settings.clone());

        Ok(Self {
            settings,
            fs,
            registry,
            documents,
            project,
        })
    }
}
