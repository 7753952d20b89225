//! Extraction of canonical disposal targets from raw catalog cells.

use std::collections::BTreeSet;

use tracing::debug;

use crate::normalize::normalize_target_name;
use crate::splitter::split_concatenated;
use crate::validity::is_valid_target;

/// Cell content standing for “no disposal target”.
const PLACEHOLDER_DASH: &str = "-";

/// Single-line cells longer than this are treated as run-on concatenations.
const CONCATENATION_THRESHOLD: usize = 30;

/// Parse one disposal-target cell into its set of canonical target names.
///
/// Multi-line cells hold one candidate per line. Long single-line cells are
/// run through the concatenation splitter. A candidate that fails validation
/// gets a second chance through the splitter, which can still pull known
/// names out of a note. Cells without any recognizable target produce an
/// empty set.
#[must_use]
pub fn parse_disposal_targets(cell: &str) -> BTreeSet<String> {
    let mut targets = BTreeSet::new();
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER_DASH {
        return targets;
    }

    let multiline = trimmed.contains('\n');
    for line in trimmed.lines() {
        let candidate = line.trim();
        if candidate.is_empty() || candidate == PLACEHOLDER_DASH {
            continue;
        }

        if !multiline && candidate.chars().count() > CONCATENATION_THRESHOLD {
            extend_from_fragments(&mut targets, candidate);
        } else if is_valid_target(candidate) {
            targets.insert(normalize_target_name(candidate));
        } else {
            extend_from_fragments(&mut targets, candidate);
        }
    }

    if targets.is_empty() {
        debug!(cell = trimmed, "no disposal targets recognized");
    }
    targets
}

fn extend_from_fragments(targets: &mut BTreeSet<String>, text: &str) {
    targets.extend(
        split_concatenated(text)
            .into_iter()
            .filter(|fragment| is_valid_target(fragment))
            .map(|fragment| normalize_target_name(&fragment)),
    );
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn splits_long_single_line_cell() {
        assert_eq!(
            parse_disposal_targets("Wertstoffhof Nord Wertstoffhof West Schadstoffsammlung"),
            names(&["Wertstoffhof Nord", "Wertstoffhof West", "Schadstoffsammlung"])
        );
    }

    #[test]
    fn outer_line_breaks_do_not_make_a_cell_multiline() {
        let expected = names(&["Wertstoffhof Nord", "Wertstoffhof West", "Schadstoffsammlung"]);
        assert_eq!(
            parse_disposal_targets("Wertstoffhof Nord Wertstoffhof West Schadstoffsammlung\n"),
            expected
        );
        assert_eq!(
            parse_disposal_targets("\nWertstoffhof Nord Wertstoffhof West Schadstoffsammlung"),
            expected
        );
        assert_eq!(
            parse_disposal_targets("\r\n Wertstoffhof Nord Wertstoffhof West Schadstoffsammlung \r\n"),
            expected
        );
    }

    #[test]
    fn source_note_yields_nothing() {
        assert!(parse_disposal_targets("Laut FES: Hinweis").is_empty());
    }

    #[test]
    fn placeholder_and_blank_cells_yield_nothing() {
        assert!(parse_disposal_targets("-").is_empty());
        assert!(parse_disposal_targets(" - ").is_empty());
        assert!(parse_disposal_targets("").is_empty());
        assert!(parse_disposal_targets("\n \n").is_empty());
    }

    #[test]
    fn short_cell_is_normalized() {
        assert_eq!(
            parse_disposal_targets("Restmülltonne"),
            names(&["Restabfalltonne"])
        );
    }

    #[test]
    fn multiline_cell_keeps_each_line() {
        let cell = "Wertstoffhof Süd\nFachhandel/Hersteller\r\n-\n\nAbfallumladeanlage (FES)";
        assert_eq!(
            parse_disposal_targets(cell),
            names(&[
                "Wertstoffhof Süd",
                "Fachhandel / Hersteller",
                "FES-Abfallumladeanlage"
            ])
        );
    }

    #[test]
    fn multiline_lines_are_not_length_split() {
        // long but valid on its own line, and not in the pattern catalog
        let cell = "Wertstoffhof Nord\nAnnahmestelle der Stadtreinigung Frankfurt";
        assert_eq!(
            parse_disposal_targets(cell),
            names(&["Wertstoffhof Nord", "Annahmestelle der Stadtreinigung Frankfurt"])
        );
    }

    #[test]
    fn rejected_line_falls_back_to_pattern_extraction() {
        let cell = "Biotonne\nGrößere Mengen: Containergestellung";
        assert_eq!(
            parse_disposal_targets(cell),
            names(&["Biotonne", "Containergestellung"])
        );
    }

    #[test]
    fn alternatives_are_split() {
        assert_eq!(
            parse_disposal_targets("Biotonne oder Sperrmüll"),
            names(&["Biotonne", "Sperrmüll"])
        );
    }

    #[test]
    fn duplicates_collapse_after_normalization() {
        let cell = "Schadstoffsammlung FES\nSchadstoffsammlung\nSchadstoffmobil FES";
        assert_eq!(parse_disposal_targets(cell), names(&["Schadstoffsammlung"]));
    }

    #[test]
    fn long_cell_without_known_names_yields_nothing() {
        assert!(parse_disposal_targets("Bitte beim Kundenservice nachfragen, danke").is_empty());
    }
}
