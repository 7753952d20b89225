//! Canonical spelling for disposal-target names.

/// Map a raw target name to its canonical form.
///
/// The input is trimmed first. Names without a known variant are returned
/// trimmed but otherwise unchanged.
#[must_use]
pub fn normalize_target_name(raw: &str) -> String {
    let name = raw.trim();
    canonical_variant(name).unwrap_or(name).to_owned()
}

// Catalog typos, hyphenation and spacing differences, and synonyms.
fn canonical_variant(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "Fachhandel/Hersteller" | "Fachhandel / Herstelle" => "Fachhandel / Hersteller",
        "Mobile Elektrokleingerätesam-mlung" => "Mobile Elektrokleingerätesammlung",
        "Abfallumladeanlage FES"
        | "Abfallumladeanlage (FES)"
        | "Abfallumladeanlage"
        | "Abfallumladeanlage \tFES" => "FES-Abfallumladeanlage",
        "Schadstoffsammlung FES"
        | "Schadstoffsammlung \tFES"
        | "Schadstoffsammlung\t FES"
        | "Schadstoffmobil FES" => "Schadstoffsammlung",
        "Restmülltonne" => "Restabfalltonne",
        _ => return None,
    };
    Some(canonical)
}
