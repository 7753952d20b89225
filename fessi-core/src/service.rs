//! High-level service facade combining loaders, engine, and store.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::catalog::{CatalogError, load_catalog};
use crate::directory::{DirectoryError, load_directory};
use crate::engine::{
    FacilityImportStats, ImportOptions, MergeEngine, WasteItemImportStats, merge_facilities,
};
use crate::ports::{GraphStats, GraphStore, StoreError};

#[derive(thiserror::Error, Debug)]
/// Errors that abort an import.
pub enum ImportError {
    /// The waste-item catalog could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The facility directory could not be loaded.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    /// The graph store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ImportError {
    /// Whether the input file was missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ImportError::Catalog(CatalogError::NotFound(_))
                | ImportError::Directory(DirectoryError::NotFound(_))
        )
    }
}

/// Public entry point for importing data into the graph and inspecting it.
pub struct FessiService {
    store: Arc<dyn GraphStore>,
}

impl FessiService {
    /// Create a new service bound to the provided store.
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Import the facility directory.
    ///
    /// # Errors
    ///
    /// Returns an [`ImportError`] if the file cannot be loaded or the store
    /// fails. Loading happens before any write.
    pub async fn import_facilities(
        &self,
        path: &Path,
        dry_run: bool,
    ) -> Result<FacilityImportStats, ImportError> {
        let facilities = load_directory(path)?;
        Ok(merge_facilities(self.store.as_ref(), &facilities, dry_run).await?)
    }

    /// Import the waste-item catalog.
    ///
    /// # Errors
    ///
    /// Returns an [`ImportError`] if the file cannot be loaded or the store
    /// fails. Loading happens before any write.
    pub async fn import_waste_items(
        &self,
        path: &Path,
        options: ImportOptions,
    ) -> Result<WasteItemImportStats, ImportError> {
        let items = load_catalog(path)?;
        let stats = MergeEngine::new(self.store.as_ref(), options)
            .import_items(&items)
            .await?;
        Ok(stats)
    }

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be reached.
    pub async fn verify_connectivity(&self) -> Result<(), StoreError> {
        self.store.verify_connectivity().await
    }

    /// Node and relationship counts.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store query fails.
    pub async fn stats(&self) -> Result<GraphStats, StoreError> {
        self.store.stats().await
    }

    /// Remove everything from the graph.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the deletion fails.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        info!("clearing all data from the graph");
        self.store.clear_all().await
    }
}
