//! Project service
//!
//! Discovers flow files below a directory, loads them in parallel and projects
//! the cross-document topology.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::application::services::document::{document_name, DocumentService};
use crate::application::{ApplicationError, ApplicationResult, ResultExt};
use crate::config::Settings;
use crate::domain::{Document, SchemaRegistry, Topology, TopologyProjector};
use crate::infrastructure::traits::FileSystem;

/// Service for operations over a directory of flow files.
pub struct ProjectService {
    fs: Arc<dyn FileSystem>,
    registry: &'static SchemaRegistry,
    settings: Arc<Settings>,
    documents: DocumentService,
}

impl ProjectService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        registry: &'static SchemaRegistry,
        settings: Arc<Settings>,
    ) -> Self {
        let documents = DocumentService::new(fs.clone(), registry, settings.clone());
        Self {
            fs,
            registry,
            settings,
            documents,
        }
    }

    /// Flow files below `dir` with one of the configured extensions, sorted.
    #[instrument(level = "debug", skip(self))]
    pub fn discover(&self, dir: &Path) -> ApplicationResult<Vec<PathBuf>> {
        if !self.fs.is_dir(dir) {
            return Err(ApplicationError::NotADirectory(dir.to_path_buf()));
        }
        let files: Vec<PathBuf> = self
            .fs
            .list_files(dir)
            .with_path_context("scan directory", dir)?
            .into_iter()
            .filter(|p| self.has_flow_extension(p))
            .collect();
        debug!("discover: found {} flow files", files.len());
        Ok(files)
    }

    fn has_flow_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .is_some_and(|ext| self.settings.file_extensions.iter().any(|e| *e == ext))
    }

    /// Load every flow file below `dir`; documents are named by their path relative to `dir`.
    pub fn load_all(&self, dir: &Path) -> ApplicationResult<Vec<Document>> {
        let files = self.discover(dir)?;
        let results: Vec<ApplicationResult<Document>> = files
            .par_iter()
            .map(|path| {
                let name = pathdiff::diff_paths(path, dir)
                    .map(|rel| rel.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_else(|| document_name(path));
                self.documents.load_as(path, &name)
            })
            .collect();

        // Collect successes, propagate first error
        let mut docs = Vec::with_capacity(results.len());
        for result in results {
            docs.push(result?);
        }
        Ok(docs)
    }

    /// Load the given files (directories are expanded), in parallel.
    pub fn load_paths(&self, paths: &[PathBuf]) -> ApplicationResult<Vec<Document>> {
        let mut docs = Vec::new();
        let mut files = Vec::new();
        for path in paths {
            if self.fs.is_dir(path) {
                docs.extend(self.load_all(path)?);
            } else {
                files.push(path.clone());
            }
        }
        let results: Vec<ApplicationResult<Document>> = files
            .par_iter()
            .map(|path| self.documents.load(path))
            .collect();
        for result in results {
            docs.push(result?);
        }
        Ok(docs)
    }

    /// Topology across all given documents, honoring `internal_schemes`.
    pub fn topology(&self, docs: &[Document]) -> Topology {
        TopologyProjector::new(self.registry)
            .with_internal_schemes(self.settings.internal_schemes.clone())
            .project(docs)
    }
}
