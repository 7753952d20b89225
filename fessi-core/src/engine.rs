//! Graph merge engine: idempotent create-or-update of parsed catalog data.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::classify_target;
use crate::model::{CatalogItem, Facility, Target, WasteItem, WasteStream};
use crate::ports::{GraphSession, GraphStore, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// What to do with facility targets that have no matching Facility node.
pub enum PlaceholderPolicy {
    /// Leave the link out and report the name as unresolved.
    #[default]
    Skip,
    /// Create an empty Facility carrying only the name, then link to it.
    Create,
}

#[derive(Debug, Clone, Copy, Default)]
/// Options for one waste-item import.
pub struct ImportOptions {
    /// Plan and report only; issue no writes.
    pub dry_run: bool,
    /// Handling of unresolved facility targets.
    pub placeholders: PlaceholderPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A waste item together with its classified targets.
pub struct PlannedItem {
    /// Item to upsert.
    pub item: WasteItem,
    /// Classified disposal targets.
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Every decision of an import, computed before anything is written.
pub struct ImportPlan {
    /// Items in catalog order.
    pub items: Vec<PlannedItem>,
    /// Streams referenced by at least one item.
    pub streams: BTreeSet<WasteStream>,
    /// Facility names not present in the store when the plan was built.
    pub unresolved_facilities: BTreeSet<String>,
}

impl ImportPlan {
    /// Classify the targets of every item against the known facility names.
    #[must_use]
    pub fn build(items: &[CatalogItem], known_facilities: &HashSet<String>) -> Self {
        let mut plan = Self::default();
        for catalog_item in items {
            let targets: Vec<Target> = catalog_item
                .targets
                .iter()
                .map(|name| classify_target(name, known_facilities))
                .collect();

            for target in &targets {
                match target {
                    Target::Stream(stream) => {
                        plan.streams.insert(*stream);
                    }
                    Target::Facility { name, known: false } => {
                        plan.unresolved_facilities.insert(name.clone());
                    }
                    Target::Facility { known: true, .. } => {}
                }
            }

            plan.items.push(PlannedItem {
                item: WasteItem::new(&catalog_item.name),
                targets,
            });
        }
        plan
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Result of a waste-item import.
pub struct WasteItemImportStats {
    /// Items read from the catalog.
    pub items_loaded: usize,
    /// Items newly created.
    pub items_created: usize,
    /// Items that already existed.
    pub items_updated: usize,
    /// Distinct streams referenced by the catalog.
    pub streams_needed: BTreeSet<WasteStream>,
    /// Stream nodes newly created.
    pub streams_created: usize,
    /// `DISPOSED_IN` and `DISPOSED_AT` relationships newly created.
    pub relationships_created: usize,
    /// Placeholder facilities newly created.
    pub placeholders_created: usize,
    /// Facility targets that could not be linked.
    pub unresolved_facilities: BTreeSet<String>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Result of a facility-directory import.
pub struct FacilityImportStats {
    /// Unique facilities read from the directory.
    pub loaded: usize,
    /// Facilities newly created.
    pub created: usize,
    /// Facilities that already existed and were updated.
    pub updated: usize,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

/// Writes parsed catalog items into a [`GraphStore`].
///
/// Rows are processed strictly one after another inside a single session. The
/// known facility names are read once per run.
pub struct MergeEngine<'store> {
    store: &'store dyn GraphStore,
    options: ImportOptions,
}

impl<'store> MergeEngine<'store> {
    /// Create an engine writing to `store`.
    #[must_use]
    pub fn new(store: &'store dyn GraphStore, options: ImportOptions) -> Self {
        Self { store, options }
    }

    /// Import the given catalog items.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store fails. The session is rolled
    /// back first, so a failed run leaves no partial writes behind.
    pub async fn import_items(
        &self,
        items: &[CatalogItem],
    ) -> Result<WasteItemImportStats, StoreError> {
        let known_facilities = self.store.facility_names().await?;
        info!(count = known_facilities.len(), "existing facilities in store");

        let plan = ImportPlan::build(items, &known_facilities);
        if self.options.dry_run {
            return Ok(self.dry_run_stats(&plan));
        }

        let mut session = self.store.begin().await?;
        let outcome = self.apply(&plan, &mut *session, Utc::now()).await;
        match outcome {
            Ok(stats) => {
                session.commit().await?;
                info!(
                    items = stats.items_created + stats.items_updated,
                    relationships = stats.relationships_created,
                    "waste item import complete"
                );
                Ok(stats)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    warn!(error = %rollback_err, "rollback after failed import also failed");
                }
                Err(err)
            }
        }
    }

    fn dry_run_stats(&self, plan: &ImportPlan) -> WasteItemImportStats {
        info!("dry run, no changes will be made");
        for planned in &plan.items {
            debug!(item = %planned.item.name, targets = planned.targets.len(), "would upsert waste item");
        }
        let streams: Vec<&str> = plan.streams.iter().map(|stream| stream.as_str()).collect();
        info!(?streams, "waste streams needed");
        if !plan.unresolved_facilities.is_empty() {
            match self.options.placeholders {
                PlaceholderPolicy::Skip => warn!(
                    facilities = ?plan.unresolved_facilities,
                    "unmatched facilities will not be linked"
                ),
                PlaceholderPolicy::Create => warn!(
                    facilities = ?plan.unresolved_facilities,
                    "unmatched facilities will be created as placeholders"
                ),
            }
        }

        WasteItemImportStats {
            items_loaded: plan.items.len(),
            streams_needed: plan.streams.clone(),
            unresolved_facilities: plan.unresolved_facilities.clone(),
            dry_run: true,
            ..WasteItemImportStats::default()
        }
    }

    async fn apply(
        &self,
        plan: &ImportPlan,
        session: &mut dyn GraphSession,
        at: DateTime<Utc>,
    ) -> Result<WasteItemImportStats, StoreError> {
        let mut stats = WasteItemImportStats {
            items_loaded: plan.items.len(),
            streams_needed: plan.streams.clone(),
            ..WasteItemImportStats::default()
        };

        for planned in &plan.items {
            let name = planned.item.name.as_str();
            if session.merge_waste_item(&planned.item, at).await?.is_created() {
                stats.items_created += 1;
            } else {
                stats.items_updated += 1;
            }

            for target in &planned.targets {
                match target {
                    Target::Stream(stream) => {
                        let link = session.merge_stream_link(name, *stream, at).await?;
                        stats.streams_created += usize::from(link.stream.is_created());
                        stats.relationships_created += usize::from(link.relationship.is_created());
                        debug!(item = name, stream = %stream, "DISPOSED_IN");
                    }
                    Target::Facility {
                        name: facility,
                        known,
                    } => {
                        self.link_facility(session, &mut stats, name, facility, *known, at)
                            .await?;
                    }
                }
            }
        }

        Ok(stats)
    }

    async fn link_facility(
        &self,
        session: &mut dyn GraphSession,
        stats: &mut WasteItemImportStats,
        item: &str,
        facility: &str,
        known: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if !known && self.options.placeholders == PlaceholderPolicy::Create {
            let placeholder = Facility::placeholder(facility);
            if session.merge_facility(&placeholder, at).await?.is_created() {
                stats.placeholders_created += 1;
                info!(facility, "created placeholder facility");
            }
        }

        match session.link_facility(item, facility, at).await? {
            Some(upsert) => {
                stats.relationships_created += usize::from(upsert.is_created());
                debug!(item, facility, "DISPOSED_AT");
            }
            None => {
                warn!(item, facility, "could not link to facility");
                stats.unresolved_facilities.insert(facility.to_owned());
            }
        }
        Ok(())
    }
}

/// Upsert facility records into the store inside one session.
///
/// # Errors
///
/// Returns a [`StoreError`] when the store fails; the session is rolled back.
pub async fn merge_facilities(
    store: &dyn GraphStore,
    facilities: &[Facility],
    dry_run: bool,
) -> Result<FacilityImportStats, StoreError> {
    let mut stats = FacilityImportStats {
        loaded: facilities.len(),
        dry_run,
        ..FacilityImportStats::default()
    };

    if dry_run {
        info!("dry run, no changes will be made");
        for facility in facilities {
            info!(name = %facility.name, "would upsert facility");
        }
        return Ok(stats);
    }

    let at = Utc::now();
    let mut session = store.begin().await?;
    for facility in facilities {
        let outcome = session.merge_facility(facility, at).await;
        match outcome {
            Ok(upsert) if upsert.is_created() => stats.created += 1,
            Ok(_) => stats.updated += 1,
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    warn!(error = %rollback_err, "rollback after failed import also failed");
                }
                return Err(err);
            }
        }
        debug!(name = %facility.name, uid = %facility.uid(), "facility upserted");
    }
    session.commit().await?;

    info!(
        created = stats.created,
        updated = stats.updated,
        "facility import complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::memory::{GraphSnapshot, MemoryGraph};

    fn catalog_item(name: &str, targets: &[&str]) -> CatalogItem {
        CatalogItem {
            name: name.to_owned(),
            targets: targets.iter().map(|target| (*target).to_owned()).collect(),
        }
    }

    async fn seeded_graph(names: &[&str]) -> MemoryGraph {
        let graph = MemoryGraph::new();
        let facilities: Vec<Facility> = names.iter().map(|name| Facility::placeholder(name)).collect();
        merge_facilities(&graph, &facilities, false)
            .await
            .expect("seed facilities");
        graph
    }

    #[test]
    fn plan_collects_streams_and_unresolved_facilities() {
        let known: HashSet<String> = HashSet::from(["Wertstoffhof Nord".to_owned()]);
        let plan = ImportPlan::build(
            &[
                catalog_item("Akku", &["Wertstoffhof Nord", "Klamoddekurier"]),
                catalog_item("Apfel", &["Biotonne"]),
            ],
            &known,
        );
        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.streams, BTreeSet::from([WasteStream::Organic]));
        assert_eq!(
            plan.unresolved_facilities,
            BTreeSet::from(["Klamoddekurier".to_owned()])
        );
    }

    #[tokio::test]
    async fn creates_items_streams_and_links() {
        let graph = seeded_graph(&["Wertstoffhof Nord"]).await;
        let engine = MergeEngine::new(&graph, ImportOptions::default());
        let stats = engine
            .import_items(&[
                catalog_item("Akku", &["Wertstoffhof Nord", "Restabfalltonne"]),
                catalog_item("Apfel", &["Biotonne", "Restabfalltonne"]),
            ])
            .await
            .expect("import");

        assert_eq!(stats.items_created, 2);
        assert_eq!(stats.streams_created, 2);
        assert_eq!(stats.relationships_created, 4);
        assert!(stats.unresolved_facilities.is_empty());

        let snapshot = graph.snapshot().expect("snapshot");
        assert!(
            snapshot
                .disposed_at
                .contains(&("Akku".to_owned(), "Wertstoffhof Nord".to_owned()))
        );
        assert_eq!(snapshot.disposed_in.len(), 3);
    }

    #[tokio::test]
    async fn second_run_creates_nothing() {
        let graph = seeded_graph(&["Wertstoffhof Nord"]).await;
        let items = [catalog_item("Akku", &["Wertstoffhof Nord", "Biotonne"])];
        let engine = MergeEngine::new(&graph, ImportOptions::default());

        engine.import_items(&items).await.expect("first run");
        let before = graph.snapshot().expect("snapshot");
        let stats = engine.import_items(&items).await.expect("second run");

        assert_eq!(graph.snapshot().expect("snapshot"), before);
        assert_eq!(stats.items_created, 0);
        assert_eq!(stats.items_updated, 1);
        assert_eq!(stats.streams_created, 0);
        assert_eq!(stats.relationships_created, 0);

        let stamp = graph.waste_item("Akku").expect("lookup").expect("item exists");
        assert!(stamp.updated_at.is_some());
    }

    #[tokio::test]
    async fn unmatched_facility_is_reported_and_not_created() {
        let graph = MemoryGraph::new();
        let engine = MergeEngine::new(&graph, ImportOptions::default());
        let stats = engine
            .import_items(&[catalog_item("Jacke", &["Klamoddekurier"])])
            .await
            .expect("import");

        assert_eq!(
            stats.unresolved_facilities,
            BTreeSet::from(["Klamoddekurier".to_owned()])
        );
        assert_eq!(stats.relationships_created, 0);
        assert!(graph.snapshot().expect("snapshot").facilities.is_empty());
    }

    #[tokio::test]
    async fn create_policy_adds_placeholder_once() {
        let graph = MemoryGraph::new();
        let options = ImportOptions {
            placeholders: PlaceholderPolicy::Create,
            ..ImportOptions::default()
        };
        let engine = MergeEngine::new(&graph, options);
        let stats = engine
            .import_items(&[
                catalog_item("Jacke", &["Klamoddekurier"]),
                catalog_item("Hose", &["Klamoddekurier"]),
            ])
            .await
            .expect("import");

        assert_eq!(stats.placeholders_created, 1);
        assert_eq!(stats.relationships_created, 2);
        assert!(stats.unresolved_facilities.is_empty());
        assert_eq!(graph.snapshot().expect("snapshot").facilities.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_reports_without_writing() {
        let graph = MemoryGraph::new();
        let options = ImportOptions {
            dry_run: true,
            ..ImportOptions::default()
        };
        let stats = MergeEngine::new(&graph, options)
            .import_items(&[catalog_item("Akku", &["Biotonne", "Klamoddekurier"])])
            .await
            .expect("dry run");

        assert!(stats.dry_run);
        assert_eq!(stats.items_loaded, 1);
        assert_eq!(stats.streams_needed, BTreeSet::from([WasteStream::Organic]));
        assert_eq!(stats.items_created, 0);
        assert_eq!(
            stats.unresolved_facilities,
            BTreeSet::from(["Klamoddekurier".to_owned()])
        );
        assert_eq!(graph.snapshot().expect("snapshot"), GraphSnapshot::default());
    }

    #[tokio::test]
    async fn store_failure_aborts_and_rolls_back() {
        let graph = MemoryGraph::new();
        graph.fail_after_writes(2).expect("configure");
        let result = MergeEngine::new(&graph, ImportOptions::default())
            .import_items(&[
                catalog_item("Akku", &["Biotonne"]),
                catalog_item("Apfel", &["Biotonne"]),
            ])
            .await;

        assert!(matches!(result, Err(StoreError::Internal(_))));
        assert_eq!(graph.snapshot().expect("snapshot"), GraphSnapshot::default());
    }

    #[tokio::test]
    async fn facility_reimport_keeps_existing_fields() {
        let graph = MemoryGraph::new();
        let full = Facility {
            name: "Wertstoffhof West".to_owned(),
            address: "Am Römerhof 16".to_owned(),
            ..Facility::default()
        };
        let first = merge_facilities(&graph, &[full], false).await.expect("first");
        assert_eq!(first.created, 1);

        let second = merge_facilities(&graph, &[Facility::placeholder("Wertstoffhof West")], false)
            .await
            .expect("second");
        assert_eq!(second.updated, 1);

        let snapshot = graph.snapshot().expect("snapshot");
        let stored = snapshot.facilities.values().next().expect("one facility");
        assert_eq!(stored.address, "Am Römerhof 16");
    }
}
