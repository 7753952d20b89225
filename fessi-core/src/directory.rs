//! Loading of the facility directory (`disposal_map_db.json`).

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::mem;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::model::Facility;

#[derive(thiserror::Error, Debug)]
/// Errors raised while reading the facility directory.
pub enum DirectoryError {
    /// Directory file does not exist.
    #[error("Facility directory not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Directory file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Directory content is not the expected JSON shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Entry as stored in the directory; any field may be missing or null.
#[derive(Debug, Default, Deserialize)]
struct DirectoryEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    opening_hours: Option<String>,
    #[serde(default)]
    contact: Option<String>,
    #[serde(default)]
    additional_info: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

impl DirectoryEntry {
    fn into_facility(self) -> Option<Facility> {
        let name = self.name.unwrap_or_default().trim().to_owned();
        if name.is_empty() {
            return None;
        }
        Some(Facility {
            name,
            address: self.address.unwrap_or_default(),
            opening_hours: self.opening_hours.unwrap_or_default(),
            contact: self.contact.unwrap_or_default(),
            additional_info: self.additional_info.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
        })
    }
}

/// Merge two records for the same facility.
///
/// Values already present in `base` are kept; empty fields are filled from
/// `newer`.
#[must_use]
pub fn merge_facility_records(base: Facility, newer: Facility) -> Facility {
    fn pick(kept: String, incoming: String) -> String {
        if kept.is_empty() { incoming } else { kept }
    }

    Facility {
        name: base.name,
        address: pick(base.address, newer.address),
        opening_hours: pick(base.opening_hours, newer.opening_hours),
        contact: pick(base.contact, newer.contact),
        additional_info: pick(base.additional_info, newer.additional_info),
        link: pick(base.link, newer.link),
    }
}

/// Collapse facility records sharing a name into one record each.
///
/// First-seen order is kept.
#[must_use]
pub fn dedupe_facilities<I>(records: I) -> Vec<Facility>
where
    I: IntoIterator<Item = Facility>,
{
    let (facilities, _) = records.into_iter().fold(
        (Vec::<Facility>::new(), HashMap::<String, usize>::new()),
        |(mut facilities, mut slots), incoming| {
            match slots.get(&incoming.name).and_then(|&slot| facilities.get_mut(slot)) {
                Some(existing) => {
                    *existing = merge_facility_records(mem::take(existing), incoming);
                }
                None => {
                    slots.insert(incoming.name.clone(), facilities.len());
                    facilities.push(incoming);
                }
            }
            (facilities, slots)
        },
    );
    facilities
}

/// Read the facility directory from JSON grouped by arbitrary keys.
///
/// Groups are visited in key order, entries without a name are dropped and
/// duplicates are merged by name.
///
/// # Errors
///
/// Returns [`DirectoryError::Json`] when the data does not have the expected shape.
pub fn read_directory<R: Read>(reader: R) -> Result<Vec<Facility>, DirectoryError> {
    let groups: BTreeMap<String, Vec<DirectoryEntry>> = serde_json::from_reader(reader)?;
    Ok(dedupe_facilities(
        groups
            .into_values()
            .flatten()
            .filter_map(DirectoryEntry::into_facility),
    ))
}

/// Load the facility directory from a JSON file.
///
/// # Errors
///
/// Returns [`DirectoryError::NotFound`] if the file is missing, or another
/// [`DirectoryError`] if it cannot be read or parsed.
pub fn load_directory(path: &Path) -> Result<Vec<Facility>, DirectoryError> {
    let file = File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => DirectoryError::NotFound(path.to_path_buf()),
        _ => DirectoryError::Io(err),
    })?;

    info!(path = %path.display(), "loading facilities");
    let facilities = read_directory(BufReader::new(file))?;
    info!(count = facilities.len(), "unique facilities loaded");
    Ok(facilities)
}
