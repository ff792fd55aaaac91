//! Single-document service
//!
//! Loads, canonicalizes, checks and creates flow files.

use std::path::Path;
use std::sync::Arc;

use termtree::Tree;
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, ResultExt};
use crate::config::Settings;
use crate::domain::element::children_of;
use crate::domain::validator::Finding;
use crate::domain::{
    check_document, find_placeholders, Codec, Document, DocumentShape, Node, PlaceholderSet,
    SchemaRegistry,
};
use crate::infrastructure::traits::FileSystem;

/// Result of formatting a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOutcome {
    /// Canonical text
    pub text: String,
    /// Whether the canonical text differs from the file
    pub changed: bool,
}

/// Service for operations on one flow file.
pub struct DocumentService {
    fs: Arc<dyn FileSystem>,
    registry: &'static SchemaRegistry,
    settings: Arc<Settings>,
}

/// Document name for a file: its file name, or the whole path if there is none.
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl DocumentService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        registry: &'static SchemaRegistry,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            fs,
            registry,
            settings,
        }
    }

    fn codec(&self) -> Codec<'static> {
        Codec::new(self.registry)
    }

    /// Read and parse a file, naming the document after the file.
    pub fn load(&self, path: &Path) -> ApplicationResult<Document> {
        self.load_as(path, &document_name(path))
    }

    /// Read and parse a file under an explicit document name.
    #[instrument(level = "debug", skip(self))]
    pub fn load_as(&self, path: &Path, name: &str) -> ApplicationResult<Document> {
        let text = self
            .fs
            .read_to_string(path)
            .with_path_context("read flow", path)?;
        let doc = self.codec().parse(name, &text);
        debug!(
            "load_as: name={}, shape={}, flows={}",
            doc.name,
            doc.shape,
            doc.flows.len()
        );
        Ok(doc)
    }

    /// Write the canonical text of `doc` to `path`.
    #[instrument(level = "debug", skip(self, doc), fields(name = %doc.name))]
    pub fn save(&self, path: &Path, doc: &Document) -> ApplicationResult<()> {
        let text = self.codec().serialize(doc)?;
        self.fs
            .ensure_parent(path)
            .with_path_context("create parent", path)?;
        self.fs
            .write(path, &text)
            .with_path_context("write flow", path)?;
        info!("save: wrote {}", path.display());
        Ok(())
    }

    /// Canonical text for a file and whether it differs from what is on disk.
    pub fn format(&self, path: &Path) -> ApplicationResult<FormatOutcome> {
        let original = self
            .fs
            .read_to_string(path)
            .with_path_context("read flow", path)?;
        let doc = self.codec().parse(&document_name(path), &original);
        let text = self.codec().serialize(&doc)?;
        let changed = text != original;
        debug!("format: path={}, changed={}", path.display(), changed);
        Ok(FormatOutcome { text, changed })
    }

    /// Required-field findings for every node in a file.
    pub fn check(&self, path: &Path) -> ApplicationResult<Vec<Finding>> {
        let doc = self.load(path)?;
        Ok(check_document(self.registry, &doc))
    }

    /// Placeholders referenced anywhere in a file.
    pub fn placeholders(&self, path: &Path) -> ApplicationResult<PlaceholderSet> {
        let doc = self.load(path)?;
        let mut all = PlaceholderSet::default();
        for flow in &doc.flows {
            all.extend(find_placeholders(flow));
        }
        Ok(all)
    }

    /// Node tree of a document for display.
    pub fn render_tree(&self, doc: &Document) -> Tree<String> {
        let leaves: Vec<Tree<String>> = doc.flows.iter().map(|n| self.node_tree(n)).collect();
        Tree::new(format!("{} ({})", doc.name, doc.shape)).with_leaves(leaves)
    }

    fn node_tree(&self, node: &Node) -> Tree<String> {
        let label = self
            .registry
            .step_name(node.kind())
            .unwrap_or(node.kind())
            .to_string();
        let mut tree = Tree::new(format!("{} [{}]", label, node.camel_id()));
        for spec in self.registry.child_specs(node.kind()) {
            for child in children_of(node, &spec) {
                tree.push(self.node_tree(child));
            }
        }
        tree
    }

    /// Create an empty flow file. Refuses to overwrite.
    ///
    /// Shape defaults to `codec.default_shape`, name to the file stem.
    #[instrument(level = "debug", skip(self))]
    pub fn create(
        &self,
        path: &Path,
        shape: Option<DocumentShape>,
        name: Option<&str>,
    ) -> ApplicationResult<Document> {
        if self.fs.exists(path) {
            return Err(ApplicationError::AlreadyExists(path.to_path_buf()));
        }
        let shape = shape.unwrap_or(self.settings.codec.default_shape);
        let name = name.map(str::to_string).unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| document_name(path))
        });
        let doc = Document::empty(name, shape, &self.settings.codec.api_version);
        self.save(path, &doc)?;
        Ok(doc)
    }
}
