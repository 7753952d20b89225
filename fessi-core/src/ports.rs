//! Traits describing the graph store and shared helper types.

use std::collections::{BTreeMap, HashSet};
use std::error::Error as StdError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Facility, WasteItem, WasteStream};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to the graph store.
pub enum StoreError {
    /// The store could not be reached or refused the credentials.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The store rejected a statement.
    #[error("Query error {code}: {message}")]
    Query {
        /// Store-specific status code.
        code: String,
        /// Human-readable message from the store.
        message: String,
    },
    /// Transport layer failed.
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),
    /// The store answered with something we could not interpret.
    #[error("Decode error: {0}")]
    Decode(String),
    /// Internal store error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// Outcome of a create-or-update operation.
pub enum Upsert {
    /// A new node or relationship was created.
    Created,
    /// An existing node or relationship was matched.
    Matched,
}

impl Upsert {
    /// Whether the operation created something.
    #[must_use]
    pub fn is_created(self) -> bool {
        matches!(self, Upsert::Created)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Outcome of linking an item to a waste stream.
pub struct StreamLink {
    /// Upsert of the stream node.
    pub stream: Upsert,
    /// Upsert of the `DISPOSED_IN` relationship.
    pub relationship: Upsert,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Node and relationship counts of the whole graph.
pub struct GraphStats {
    /// Node count per label.
    pub node_counts: BTreeMap<String, u64>,
    /// Total number of relationships.
    pub relationship_count: u64,
}

impl GraphStats {
    /// Sum of all node counts.
    #[must_use]
    pub fn total_nodes(&self) -> u64 {
        self.node_counts.values().sum()
    }
}

#[async_trait]
/// Persistent graph holding facilities, waste items and waste streams.
pub trait GraphStore: Send + Sync {
    /// Check that the store is reachable with the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store cannot be reached.
    async fn verify_connectivity(&self) -> Result<(), StoreError>;

    /// Names of all facilities currently stored.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the query fails.
    async fn facility_names(&self) -> Result<HashSet<String>, StoreError>;

    /// Open a unit of work. Writes become visible once it is committed.
    ///
    /// Finish every session with [`GraphSession::commit`] or
    /// [`GraphSession::rollback`]. A session dropped mid-way, e.g. because the
    /// import future was cancelled by a timeout, is not rolled back eagerly:
    /// a remote store keeps the open transaction until its own idle timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the session cannot be opened.
    async fn begin(&self) -> Result<Box<dyn GraphSession>, StoreError>;

    /// Node counts by label and the relationship count.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the query fails.
    async fn stats(&self) -> Result<GraphStats, StoreError>;

    /// Delete every node and relationship.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the deletion fails.
    async fn clear_all(&self) -> Result<(), StoreError>;
}

#[async_trait]
/// Unit of work against a [`GraphStore`].
///
/// Every write is keyed by a unique name or identifier, so repeating it is a
/// no-op apart from timestamps.
pub trait GraphSession: Send {
    /// Create the item keyed by name, or mark an existing one as updated.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store rejects the write.
    async fn merge_waste_item(
        &mut self,
        item: &WasteItem,
        at: DateTime<Utc>,
    ) -> Result<Upsert, StoreError>;

    /// Ensure the stream exists and the item is `DISPOSED_IN` it.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store rejects the write.
    async fn merge_stream_link(
        &mut self,
        item_name: &str,
        stream: WasteStream,
        at: DateTime<Utc>,
    ) -> Result<StreamLink, StoreError>;

    /// Link the item to the facility with exactly this name.
    ///
    /// Returns `None` when no such facility exists; nothing is written then.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store rejects the write.
    async fn link_facility(
        &mut self,
        item_name: &str,
        facility_name: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Upsert>, StoreError>;

    /// Create the facility keyed by its fingerprint, or update it in place.
    ///
    /// On update only non-empty incoming fields replace stored values.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store rejects the write.
    async fn merge_facility(
        &mut self,
        facility: &Facility,
        at: DateTime<Utc>,
    ) -> Result<Upsert, StoreError>;

    /// Make all writes of this session durable.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the commit fails.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard all writes of this session.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store cannot be told to roll back.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
