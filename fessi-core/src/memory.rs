//! In-memory graph store.
//!
//! Mirrors the upsert semantics of the Neo4j adapter so the import engine can
//! run without a database, e.g. in tests or for local experiments.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::fingerprint::Uid;
use crate::model::{Facility, WasteItem, WasteStream};
use crate::ports::{GraphSession, GraphStats, GraphStore, StoreError, StreamLink, Upsert};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Bookkeeping stored alongside every node.
pub struct NodeStamp {
    /// Fingerprint of the node name.
    pub uid: Uid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last matching upsert, if any.
    pub updated_at: Option<DateTime<Utc>>,
}

impl NodeStamp {
    fn new(uid: Uid, at: DateTime<Utc>) -> Self {
        Self {
            uid,
            created_at: at,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Timestamp-free view of the graph, convenient for comparing runs.
pub struct GraphSnapshot {
    /// Waste item names.
    pub waste_items: BTreeSet<String>,
    /// Waste stream names.
    pub streams: BTreeSet<String>,
    /// Facilities keyed by uid.
    pub facilities: BTreeMap<Uid, Facility>,
    /// `(item, stream)` pairs.
    pub disposed_in: BTreeSet<(String, String)>,
    /// `(item, facility)` pairs.
    pub disposed_at: BTreeSet<(String, String)>,
}

#[derive(Debug, Clone, Default)]
struct GraphState {
    waste_items: BTreeMap<String, NodeStamp>,
    streams: BTreeMap<String, NodeStamp>,
    facilities: BTreeMap<Uid, (Facility, NodeStamp)>,
    disposed_in: BTreeSet<(String, String)>,
    disposed_at: BTreeSet<(String, String)>,
}

impl GraphState {
    fn has_facility_named(&self, name: &str) -> bool {
        self.facilities
            .values()
            .any(|(facility, _)| facility.name == name)
    }

    fn merge_waste_item(&mut self, item: &WasteItem, at: DateTime<Utc>) -> Upsert {
        upsert_node(&mut self.waste_items, &item.name, item.uid.clone(), at)
    }

    fn merge_stream_link(
        &mut self,
        item_name: &str,
        stream: WasteStream,
        at: DateTime<Utc>,
    ) -> Result<StreamLink, StoreError> {
        if !self.waste_items.contains_key(item_name) {
            return Err(StoreError::Internal(format!(
                "waste item {item_name:?} does not exist"
            )));
        }
        let stream_upsert = match self.streams.get(stream.as_str()) {
            Some(_) => Upsert::Matched,
            None => upsert_node(&mut self.streams, stream.as_str(), stream.uid(), at),
        };
        let relationship = insert_edge(&mut self.disposed_in, item_name, stream.as_str());
        Ok(StreamLink {
            stream: stream_upsert,
            relationship,
        })
    }

    fn link_facility(&mut self, item_name: &str, facility_name: &str) -> Option<Upsert> {
        if !self.waste_items.contains_key(item_name) || !self.has_facility_named(facility_name) {
            return None;
        }
        Some(insert_edge(&mut self.disposed_at, item_name, facility_name))
    }

    fn merge_facility(&mut self, facility: &Facility, at: DateTime<Utc>) -> Upsert {
        let uid = facility.uid();
        match self.facilities.get_mut(&uid) {
            Some((stored, stamp)) => {
                for (field, incoming) in [
                    (&mut stored.address, &facility.address),
                    (&mut stored.opening_hours, &facility.opening_hours),
                    (&mut stored.contact, &facility.contact),
                    (&mut stored.additional_info, &facility.additional_info),
                    (&mut stored.link, &facility.link),
                ] {
                    if !incoming.is_empty() {
                        field.clone_from(incoming);
                    }
                }
                stamp.updated_at = Some(at);
                Upsert::Matched
            }
            None => {
                let stamp = NodeStamp::new(uid.clone(), at);
                self.facilities.insert(uid, (facility.clone(), stamp));
                Upsert::Created
            }
        }
    }

    fn replay(&mut self, write: &Write) -> Result<(), StoreError> {
        match write {
            Write::WasteItem(item, at) => {
                self.merge_waste_item(item, *at);
            }
            Write::StreamLink(item_name, stream, at) => {
                self.merge_stream_link(item_name, *stream, *at)?;
            }
            Write::FacilityLink(item_name, facility_name) => {
                self.link_facility(item_name, facility_name);
            }
            Write::Facility(facility, at) => {
                self.merge_facility(facility, *at);
            }
        }
        Ok(())
    }
}

/// One upsert recorded by a session, replayed onto the shared graph on commit.
#[derive(Debug, Clone)]
enum Write {
    WasteItem(WasteItem, DateTime<Utc>),
    StreamLink(String, WasteStream, DateTime<Utc>),
    FacilityLink(String, String),
    Facility(Facility, DateTime<Utc>),
}

#[derive(Debug, Clone, Default)]
/// Graph store kept entirely in memory. Clones share the same graph.
pub struct MemoryGraph {
    state: Arc<Mutex<GraphState>>,
    fail_after_writes: Arc<Mutex<Option<usize>>>,
}

impl MemoryGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every session fail once it has performed `writes` successful writes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] if the graph lock is poisoned.
    pub fn fail_after_writes(&self, writes: usize) -> Result<(), StoreError> {
        *lock(&self.fail_after_writes)? = Some(writes);
        Ok(())
    }

    /// Timestamp-free copy of the current graph.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] if the graph lock is poisoned.
    pub fn snapshot(&self) -> Result<GraphSnapshot, StoreError> {
        let state = lock(&self.state)?;
        Ok(GraphSnapshot {
            waste_items: state.waste_items.keys().cloned().collect(),
            streams: state.streams.keys().cloned().collect(),
            facilities: state
                .facilities
                .iter()
                .map(|(uid, (facility, _))| (uid.clone(), facility.clone()))
                .collect(),
            disposed_in: state.disposed_in.clone(),
            disposed_at: state.disposed_at.clone(),
        })
    }

    /// Bookkeeping of a waste item, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] if the graph lock is poisoned.
    pub fn waste_item(&self, name: &str) -> Result<Option<NodeStamp>, StoreError> {
        Ok(lock(&self.state)?.waste_items.get(name).cloned())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|err| StoreError::Internal(format!("memory graph lock poisoned: {err}")))
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn verify_connectivity(&self) -> Result<(), StoreError> {
        lock(&self.state).map(|_| ())
    }

    async fn facility_names(&self) -> Result<HashSet<String>, StoreError> {
        Ok(lock(&self.state)?
            .facilities
            .values()
            .map(|(facility, _)| facility.name.clone())
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn GraphSession>, StoreError> {
        let staged = lock(&self.state)?.clone();
        let remaining_writes = *lock(&self.fail_after_writes)?;
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.state),
            staged,
            journal: Vec::new(),
            remaining_writes,
        }))
    }

    async fn stats(&self) -> Result<GraphStats, StoreError> {
        let state = lock(&self.state)?;
        let mut node_counts = BTreeMap::new();
        for (label, count) in [
            ("Facility", state.facilities.len()),
            ("WasteItem", state.waste_items.len()),
            ("WasteStream", state.streams.len()),
        ] {
            if count > 0 {
                node_counts.insert(label.to_owned(), count as u64);
            }
        }
        Ok(GraphStats {
            node_counts,
            relationship_count: (state.disposed_in.len() + state.disposed_at.len()) as u64,
        })
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        *lock(&self.state)? = GraphState::default();
        Ok(())
    }
}

/// Session working on a private copy of the graph.
///
/// The copy answers reads and upsert outcomes. Commit replays the recorded
/// writes onto the shared graph as it is at that moment, so changes made by
/// other sessions or `clear_all` in the meantime are kept.
struct MemorySession {
    shared: Arc<Mutex<GraphState>>,
    staged: GraphState,
    journal: Vec<Write>,
    remaining_writes: Option<usize>,
}

impl MemorySession {
    fn spend_write(&mut self) -> Result<(), StoreError> {
        match self.remaining_writes.as_mut() {
            Some(0) => Err(StoreError::Internal("injected write failure".to_owned())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn upsert_node(
    nodes: &mut BTreeMap<String, NodeStamp>,
    name: &str,
    uid: Uid,
    at: DateTime<Utc>,
) -> Upsert {
    match nodes.get_mut(name) {
        Some(stamp) => {
            stamp.updated_at = Some(at);
            Upsert::Matched
        }
        None => {
            nodes.insert(name.to_owned(), NodeStamp::new(uid, at));
            Upsert::Created
        }
    }
}

fn insert_edge(edges: &mut BTreeSet<(String, String)>, from: &str, to: &str) -> Upsert {
    if edges.insert((from.to_owned(), to.to_owned())) {
        Upsert::Created
    } else {
        Upsert::Matched
    }
}

#[async_trait]
impl GraphSession for MemorySession {
    async fn merge_waste_item(
        &mut self,
        item: &WasteItem,
        at: DateTime<Utc>,
    ) -> Result<Upsert, StoreError> {
        self.spend_write()?;
        let upsert = self.staged.merge_waste_item(item, at);
        self.journal.push(Write::WasteItem(item.clone(), at));
        Ok(upsert)
    }

    async fn merge_stream_link(
        &mut self,
        item_name: &str,
        stream: WasteStream,
        at: DateTime<Utc>,
    ) -> Result<StreamLink, StoreError> {
        self.spend_write()?;
        let link = self.staged.merge_stream_link(item_name, stream, at)?;
        self.journal
            .push(Write::StreamLink(item_name.to_owned(), stream, at));
        Ok(link)
    }

    async fn link_facility(
        &mut self,
        item_name: &str,
        facility_name: &str,
        _at: DateTime<Utc>,
    ) -> Result<Option<Upsert>, StoreError> {
        self.spend_write()?;
        let upsert = self.staged.link_facility(item_name, facility_name);
        if upsert.is_some() {
            self.journal.push(Write::FacilityLink(
                item_name.to_owned(),
                facility_name.to_owned(),
            ));
        }
        Ok(upsert)
    }

    async fn merge_facility(
        &mut self,
        facility: &Facility,
        at: DateTime<Utc>,
    ) -> Result<Upsert, StoreError> {
        self.spend_write()?;
        let upsert = self.staged.merge_facility(facility, at);
        self.journal.push(Write::Facility(facility.clone(), at));
        Ok(upsert)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut shared = lock(&self.shared)?;
        let mut next = shared.clone();
        for write in &self.journal {
            next.replay(write)?;
        }
        *shared = next;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
