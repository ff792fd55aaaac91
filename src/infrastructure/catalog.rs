//! Schema catalog loading
//!
//! The built-in catalog is embedded in the binary; `settings.catalog` points at an
//! external JSON catalog that replaces it for the whole process.

use tracing::{debug, warn};

use crate::application::ApplicationError;
use crate::config::Settings;
use crate::domain::schema::{self, SchemaRegistry};
use crate::domain::DomainError;
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};

/// Resolve the process-wide registry, installing the external catalog if configured.
///
/// Once a registry is installed it stays; a later call with a different catalog keeps
/// the first one and logs a warning.
pub fn load_registry(settings: &Settings, fs: &dyn FileSystem) -> InfraResult<&'static SchemaRegistry> {
    let Some(path) = settings.catalog.as_ref() else {
        return schema::global().map_err(|e| ApplicationError::from(e).into());
    };

    debug!("load_registry: catalog={}", path.display());
    let json = fs
        .read_to_string(path)
        .map_err(|e| InfraError::io(format!("read catalog {}", path.display()), e))?;
    let registry = SchemaRegistry::from_json(&json).map_err(|source| InfraError::Catalog {
        path: path.clone(),
        source,
    })?;

    match schema::install(registry) {
        Ok(installed) => Ok(installed),
        Err(DomainError::RegistryAlreadyInstalled) => {
            warn!("load_registry: registry already installed, ignoring {}", path.display());
            schema::global().map_err(|e| ApplicationError::from(e).into())
        }
        Err(e) => Err(ApplicationError::from(e).into()),
    }
}
