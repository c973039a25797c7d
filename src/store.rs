//! Document store
//!
//! Ties a [`Document`] to a [`StorageBackend`]: loads and parses the file,
//! hands the document to the editing engines and writes it back in one
//! whole-file update.

use crate::acl::AclEngine;
use crate::backend::{FileBackend, StorageBackend};
use crate::document::{Document, Placement};
use crate::error::{IetError, IetResult};
use crate::global::GlobalOptions;
use crate::target::TargetEngine;
use std::path::PathBuf;

/// A config file loaded from a storage backend
pub struct ConfigStore<B: StorageBackend> {
    backend: B,
    original_content: String,
    document: Document,
    target_placement: Placement,
}

impl ConfigStore<FileBackend> {
    /// Create a new builder for configuring the store
    ///
    /// The builder is not tied to the file backend; [`ConfigStoreBuilder::build`]
    /// accepts any [`StorageBackend`].
    pub fn builder() -> ConfigStoreBuilder {
        ConfigStoreBuilder::new()
    }

    /// Open a config file on the local filesystem with default settings
    pub fn open(path: impl Into<PathBuf>) -> IetResult<Self> {
        ConfigStoreBuilder::new().build_file(path)
    }
}

impl<B: StorageBackend> ConfigStore<B> {
    /// Fetch the backend content exactly as it is
    ///
    /// The text is remembered as the original content for diagnostics.
    pub fn read_raw(&mut self) -> IetResult<String> {
        let text = self.backend.content()?;
        log::info!(
            "Read {} bytes from {}",
            text.len(),
            self.backend.path().display()
        );
        self.original_content = text.clone();
        Ok(text)
    }

    /// Load and parse the backend content, replacing the held document
    pub fn read(&mut self) -> IetResult<&Document> {
        let text = self.read_raw()?;
        self.document = Document::parse(&text);
        Ok(&self.document)
    }

    /// Discard in-memory changes and reload from the backend
    pub fn refresh(&mut self) -> IetResult<()> {
        self.read()?;
        Ok(())
    }

    /// Merge directives and comments and persist the whole file
    pub fn write(&mut self) -> IetResult<()> {
        let text = self.document.render();
        self.backend.update(&text)?;
        log::info!(
            "Wrote {} bytes to {}",
            text.len(),
            self.backend.path().display()
        );
        Ok(())
    }

    /// Persist a raw string, bypassing the document model
    ///
    /// The held document is not touched; call [`refresh`](Self::refresh) to
    /// pick up the new content.
    pub fn write_raw(&mut self, text: &str) -> IetResult<()> {
        self.backend.update(text)?;
        log::info!(
            "Wrote {} raw bytes to {}",
            text.len(),
            self.backend.path().display()
        );
        Ok(())
    }

    /// Content as last read from the backend
    pub fn original_content(&self) -> &str {
        &self.original_content
    }

    /// Check if the held document differs from what was read
    pub fn is_modified(&self) -> bool {
        self.document.render() != self.original_content
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Engine for global options
    pub fn global(&self) -> GlobalOptions {
        GlobalOptions::new()
    }

    /// Engine for one target, using the store's target placement
    pub fn target(&self, iqn: &str) -> TargetEngine {
        TargetEngine::new(iqn).placement(self.target_placement)
    }

    /// Engine for the ACL line of one target
    ///
    /// ACL lines live in `initiators.allow` / `targets.allow`, so this is
    /// normally called on a store opened on one of those files.
    pub fn acl(&self, iqn: &str) -> AclEngine {
        AclEngine::new(iqn)
    }
}

/// Builder for configuring a [`ConfigStore`]
#[derive(Debug, Clone, Default)]
pub struct ConfigStoreBuilder {
    target_placement: Option<Placement>,
    create_missing: bool,
}

impl ConfigStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where `add_target` puts new target definitions (default: end of file)
    ///
    /// Only [`Placement::Start`] and [`Placement::End`] are accepted.
    pub fn target_placement(mut self, placement: Placement) -> Self {
        self.target_placement = Some(placement);
        self
    }

    /// Treat a missing file as empty (file backend only)
    pub fn create_missing(mut self, create: bool) -> Self {
        self.create_missing = create;
        self
    }

    /// Build a store on a local file and load it
    pub fn build_file(self, path: impl Into<PathBuf>) -> IetResult<ConfigStore<FileBackend>> {
        let backend = FileBackend::new(path).create_missing(self.create_missing);
        self.build(backend)
    }

    /// Build a store on the given backend and load it
    pub fn build<B: StorageBackend>(self, backend: B) -> IetResult<ConfigStore<B>> {
        let target_placement = self.target_placement.unwrap_or(Placement::End);

        if !matches!(target_placement, Placement::Start | Placement::End) {
            return Err(IetError::Config(
                "target_placement must be Placement::Start or Placement::End".to_string(),
            ));
        }

        let mut store = ConfigStore {
            backend,
            original_content: String::new(),
            document: Document::new(),
            target_placement,
        };
        store.read()?;
        Ok(store)
    }
}
