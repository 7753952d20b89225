use fessi_core::{FacilityImportStats, GraphStats, WasteItemImportStats};

#[expect(clippy::print_stdout, reason = "import summary is the command output")]
pub(crate) fn print_facility_stats(stats: &FacilityImportStats) {
    println!("\nImport Statistics:");
    println!("  Facilities loaded: {}", stats.loaded);
    println!("  Facilities created: {}", stats.created);
    println!("  Facilities updated: {}", stats.updated);
    if stats.dry_run {
        println!("  (dry run - no changes made)");
    }
}

#[expect(clippy::print_stdout, reason = "import summary is the command output")]
pub(crate) fn print_waste_item_stats(stats: &WasteItemImportStats) {
    println!("\nImport Statistics:");
    println!("  Items loaded: {}", stats.items_loaded);
    println!("  Items created: {}", stats.items_created);
    println!("  Items updated: {}", stats.items_updated);
    println!("  WasteStream nodes needed: {}", stats.streams_needed.len());
    for stream in &stats.streams_needed {
        println!("    - {stream}");
    }
    println!("  WasteStream nodes created: {}", stats.streams_created);
    println!("  Relationships created: {}", stats.relationships_created);
    println!("  Placeholder facilities created: {}", stats.placeholders_created);
    if !stats.unresolved_facilities.is_empty() {
        println!("  Unresolved facilities ({}):", stats.unresolved_facilities.len());
        for name in &stats.unresolved_facilities {
            println!("    - {name}");
        }
    }
    if stats.dry_run {
        println!("  (dry run - no changes made)");
    }
}

#[expect(clippy::print_stdout, reason = "database statistics are the command output")]
pub(crate) fn print_graph_stats(stats: &GraphStats) {
    println!("\nDatabase Statistics:");
    println!("  Total nodes: {}", stats.total_nodes());
    println!("  Total relationships: {}", stats.relationship_count);
    if stats.node_counts.is_empty() {
        println!("  No nodes in database");
        return;
    }
    println!("  Node counts by label:");
    for (label, count) in &stats.node_counts {
        println!("    {label}: {count}");
    }
}
