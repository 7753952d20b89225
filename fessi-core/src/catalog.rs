//! Loading of the waste-item catalog (Abfall-ABC CSV export).

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::model::CatalogItem;
use crate::parser::parse_disposal_targets;

#[derive(thiserror::Error, Debug)]
/// Errors raised while reading the waste-item catalog.
pub enum CatalogError {
    /// Catalog file does not exist.
    #[error("Catalog not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Catalog file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Catalog content is not valid CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
/// Raw catalog row before target parsing.
pub struct CatalogRow {
    /// Item name column.
    #[serde(rename = "Abfallart", default)]
    pub name: String,
    /// Free-text disposal-target column.
    #[serde(rename = "Entsorgungsweg", default)]
    pub disposal: String,
}

impl CatalogRow {
    /// Rows labelling an alphabetical section (“A”, “B”, …) carry no data.
    #[must_use]
    pub fn is_section_marker(&self) -> bool {
        let mut chars = self.name.trim().chars();
        let single_letter = matches!(
            (chars.next(), chars.next()),
            (Some(letter), None) if letter.is_alphabetic()
        );
        single_letter && self.disposal.trim().is_empty()
    }
}

/// Read catalog items from CSV data with an `Abfallart`/`Entsorgungsweg` header.
///
/// Section markers and rows without an item name are skipped.
///
/// # Errors
///
/// Returns [`CatalogError::Csv`] when the data is not valid CSV.
pub fn read_catalog<R: Read>(reader: R) -> Result<Vec<CatalogItem>, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let mut items = Vec::new();
    for record in csv_reader.deserialize::<CatalogRow>() {
        let row = record?;
        if row.is_section_marker() {
            debug!(marker = row.name.trim(), "skipping section marker");
            continue;
        }

        let name = row.name.trim();
        if name.is_empty() {
            continue;
        }

        items.push(CatalogItem {
            name: name.to_owned(),
            targets: parse_disposal_targets(&row.disposal),
        });
    }

    Ok(items)
}

/// Load catalog items from a CSV file.
///
/// # Errors
///
/// Returns [`CatalogError::NotFound`] if the file is missing, or another
/// [`CatalogError`] if it cannot be read or parsed.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogItem>, CatalogError> {
    let file = File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => CatalogError::NotFound(path.to_path_buf()),
        _ => CatalogError::Io(err),
    })?;

    info!(path = %path.display(), "loading waste items");
    let items = read_catalog(file)?;
    info!(count = items.len(), "waste items loaded");
    Ok(items)
}
