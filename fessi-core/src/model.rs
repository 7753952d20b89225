//! Domain data structures for waste items, facilities, and waste streams.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fingerprint::{Uid, fingerprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Curbside bins that are modelled as waste streams rather than facilities.
pub enum WasteStream {
    /// Residual/gray bin.
    Residual,
    /// Organic waste bin.
    Organic,
    /// Paper and cardboard bin.
    Paper,
    /// Packaging bin.
    Packaging,
    /// Packaging bin under its “Gelbe Tonne” label.
    PackagingYellow,
}

impl WasteStream {
    /// Every stream in the fixed enumeration.
    pub const ALL: [WasteStream; 5] = [
        WasteStream::Residual,
        WasteStream::Organic,
        WasteStream::Paper,
        WasteStream::Packaging,
        WasteStream::PackagingYellow,
    ];

    /// Resolve a canonical target name to a stream, if it is one.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Restabfalltonne" => Some(WasteStream::Residual),
            "Biotonne" => Some(WasteStream::Organic),
            "Altpapiertonne" => Some(WasteStream::Paper),
            "Verpackungstonne" => Some(WasteStream::Packaging),
            "Verpackungstonne (Gelbe Tonne)" => Some(WasteStream::PackagingYellow),
            _ => None,
        }
    }

    /// Canonical node name of the stream.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WasteStream::Residual => "Restabfalltonne",
            WasteStream::Organic => "Biotonne",
            WasteStream::Paper => "Altpapiertonne",
            WasteStream::Packaging => "Verpackungstonne",
            WasteStream::PackagingYellow => "Verpackungstonne (Gelbe Tonne)",
        }
    }

    /// Fingerprint of the stream name.
    #[must_use]
    pub fn uid(self) -> Uid {
        fingerprint(self.as_str())
    }
}

impl fmt::Display for WasteStream {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Waste item keyed by its trimmed name.
pub struct WasteItem {
    /// Unique item name.
    pub name: String,
    /// Fingerprint of the name.
    pub uid: Uid,
}

impl WasteItem {
    /// Build an item from a raw catalog name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let name = name.trim().to_owned();
        let uid = fingerprint(&name);
        Self { name, uid }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Disposal facility as described by the facility directory.
///
/// Missing optional fields are represented by empty strings, which the merge
/// logic treats as “no value”.
pub struct Facility {
    /// Unique facility name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Opening hours.
    pub opening_hours: String,
    /// Contact information.
    pub contact: String,
    /// Free-form notes.
    pub additional_info: String,
    /// Website link.
    pub link: String,
}

impl Facility {
    /// Facility without directory data, created only because a target referenced it.
    #[must_use]
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.trim().to_owned(),
            ..Self::default()
        }
    }

    /// Fingerprint of the facility name.
    #[must_use]
    pub fn uid(&self) -> Uid {
        fingerprint(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Kind of node a disposal target resolves to.
pub enum TargetKind {
    /// One of the fixed waste streams.
    Stream,
    /// A facility, existing or not.
    Facility,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Classified disposal target.
pub enum Target {
    /// Target is a curbside bin.
    Stream(WasteStream),
    /// Target is a facility.
    Facility {
        /// Canonical facility name.
        name: String,
        /// Whether the facility was present in the store when the run started.
        known: bool,
    },
}

impl Target {
    /// Kind of the target.
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Stream(_) => TargetKind::Stream,
            Target::Facility { .. } => TargetKind::Facility,
        }
    }

    /// Canonical name of the target.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Target::Stream(stream) => stream.as_str(),
            Target::Facility { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Catalog row after parsing its disposal-target cell.
pub struct CatalogItem {
    /// Trimmed item name.
    pub name: String,
    /// Canonical, deduplicated target names.
    pub targets: BTreeSet<String>,
}
