//! Recovery of individual target names from run-on catalog cells.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Every target name known to appear concatenated in the catalog.
///
/// Order matters: longer and more specific names come first so that a short
/// name never matches inside a longer one.
pub const KNOWN_TARGETS: &[&str] = &[
    "Altkleidercontainer im öffentlichen Straßenraum",
    "Self Service am Wertstoffhof Nord",
    "Mobile Elektrokleingerätesam-mlung",
    "Mobile Elektrokleingerätesammlung",
    "Verpackungstonne (Gelbe Tonne)",
    "Öffentliche Gebäude / Einzelhandel",
    "Öffentliche Gebäude/Einzelhandel",
    "Fachhandel / Hersteller",
    "Fachhandel/Hersteller",
    "Abfallumladeanlage FES",
    "FES-Abfallumladeanlage",
    "Altpapiersortieranlage",
    "FES-Aktenvernichtung",
    "Deponiepark Wicker",
    "Rhein-Main-Deponie",
    "FES-Servicecenter",
    "Containergestellung",
    "Schadstoffsammlung",
    "Wertstoffhof Nord",
    "Wertstoffhof West",
    "Wertstoffhof Süd",
    "Wertstoffhof Ost",
    "Kofferraumservice",
    "Recyclingzentrum",
    "Verpackungstonne",
    "Altglascontainer",
    "Restabfalltonne",
    "Altpapiertonne",
    "Kleiderspende",
    "Möbelspende",
    "Sachspende",
    "Wertstoffinsel",
    "Altölverordnung",
    "Klamoddekurier",
    "Betriebshöfe FES",
    "Auf Anfrage",
    "Sperrmüll",
    "GWR GmbH",
    "RMB GmbH",
    "FFR GmbH",
    "Biotonne",
    "easi",
];

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    KNOWN_TARGETS
        .iter()
        .map(|name| {
            RegexBuilder::new(&regex::escape(name))
                .case_insensitive(true)
                .build()
                .expect("escaped literal is a valid pattern")
        })
        .collect()
});

/// Extract known target names from text that has no separators between them.
///
/// Matches are collected in catalog order, as they appear in the text
/// (original casing, not normalized). Each match is cut out of the remaining
/// text before the search continues, so no text is matched twice. Anything
/// not covered by a known name is dropped.
#[must_use]
pub fn split_concatenated(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut remaining = text.to_owned();

    for pattern in PATTERNS.iter() {
        while let Some(hit) = pattern.find(&remaining) {
            let range = hit.range();
            found.push(hit.as_str().to_owned());
            remaining.replace_range(range, " ");
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_space_separated_run() {
        let parts = split_concatenated("Wertstoffhof Nord Wertstoffhof West Schadstoffsammlung");
        assert_eq!(
            parts,
            vec!["Schadstoffsammlung", "Wertstoffhof Nord", "Wertstoffhof West"]
        );
    }

    #[test]
    fn recovers_any_two_glued_names_exactly_once() {
        for first in KNOWN_TARGETS {
            for second in KNOWN_TARGETS {
                let (lower_first, lower_second) = (first.to_lowercase(), second.to_lowercase());
                // skip pairs where one name is a spelling variant contained in the other
                if lower_first.contains(&lower_second) || lower_second.contains(&lower_first) {
                    continue;
                }
                let parts = split_concatenated(&format!("{first}{second}"));
                assert_eq!(
                    parts.iter().filter(|part| part == first).count(),
                    1,
                    "{first} in {parts:?}"
                );
                assert_eq!(
                    parts.iter().filter(|part| part == second).count(),
                    1,
                    "{second} in {parts:?}"
                );
            }
        }
    }

    #[test]
    fn longer_name_shadows_shorter_one() {
        let parts = split_concatenated("Self Service am Wertstoffhof Nord");
        assert_eq!(parts, vec!["Self Service am Wertstoffhof Nord"]);

        let parts = split_concatenated("Verpackungstonne (Gelbe Tonne) Biotonne");
        assert_eq!(parts, vec!["Verpackungstonne (Gelbe Tonne)", "Biotonne"]);
    }

    #[test]
    fn matches_case_insensitively_and_keeps_source_casing() {
        let parts = split_concatenated("zum WERTSTOFFHOF SÜD bringen");
        assert_eq!(parts, vec!["WERTSTOFFHOF SÜD"]);
    }

    #[test]
    fn repeated_name_is_collected_per_occurrence() {
        let parts = split_concatenated("Biotonne, sonst Biotonne");
        assert_eq!(parts, vec!["Biotonne", "Biotonne"]);
    }

    #[test]
    fn unmatched_text_yields_nothing() {
        assert!(split_concatenated("Laut FES: Hinweis").is_empty());
        assert!(split_concatenated("").is_empty());
    }
}
