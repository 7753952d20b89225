//! Heuristic filter separating disposal-target names from notes, hints and citations.

use tracing::debug;

/// Candidates shorter than this many characters are rejected.
const MIN_NAME_CHARS: usize = 3;

/// Lowercase fragments marking source citations, hints, quantity notes, and
/// references outside the disposal domain.
const DISQUALIFYING_FRAGMENTS: &[&str] = &[
    "laut ",
    "hinweis",
    " = ",
    "stück",
    "mengen",
    "kartons",
    "polizei",
    "elektrische zahnbürste",
    "sonst ",
    "selbstgebaut",
    "aus dem handel",
    "haushaltsübliche",
    "saubere ",
    "größere ",
    "kleinere ",
];

/// Lowercase prefixes of conditional or citation text.
const DISQUALIFYING_PREFIXES: &[&str] = &["laut", "ab ", "bis ", "lauut"];

/// Compound phrases joined by “oder” must go through the splitter instead.
const ALTERNATIVE_CONJUNCTION: &str = " oder ";

/// Decide whether a candidate looks like a disposal-target name.
///
/// This is an allow/deny heuristic, not a grammar: some genuine names may be
/// rejected and some notes accepted.
#[must_use]
pub fn is_valid_target(candidate: &str) -> bool {
    let name = candidate.trim();
    if name.chars().count() < MIN_NAME_CHARS {
        return false;
    }

    let lowered = name.to_lowercase();
    if let Some(fragment) = DISQUALIFYING_FRAGMENTS
        .iter()
        .find(|fragment| lowered.contains(*fragment))
    {
        debug!(candidate = name, fragment, "rejected disqualified phrase");
        return false;
    }

    if DISQUALIFYING_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        debug!(candidate = name, "rejected conditional or citation prefix");
        return false;
    }

    !lowered.contains(ALTERNATIVE_CONJUNCTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_facility_names() {
        assert!(is_valid_target("Wertstoffhof Nord"));
        assert!(is_valid_target("FES-Abfallumladeanlage"));
        assert!(is_valid_target("easi"));
    }

    #[test]
    fn rejects_near_empty_strings() {
        assert!(!is_valid_target(""));
        assert!(!is_valid_target("  "));
        assert!(!is_valid_target("ab"));
        // three characters counted as chars, not bytes
        assert!(is_valid_target("Öko"));
    }

    #[test]
    fn rejects_notes_and_hints_regardless_of_case() {
        assert!(!is_valid_target("Laut FES: Hinweis"));
        assert!(!is_valid_target("HINWEIS beachten"));
        assert!(!is_valid_target("1 Stück = Sperrmüll"));
        assert!(!is_valid_target("Polizeidienststelle"));
        assert!(!is_valid_target("Größere Mengen: Containergestellung"));
    }

    #[test]
    fn disqualifying_fragment_wins_over_surrounding_context() {
        for fragment in DISQUALIFYING_FRAGMENTS {
            let candidate = format!("Wertstoffhof Nord{fragment}Wertstoffhof West");
            assert!(!is_valid_target(&candidate), "accepted {candidate:?}");
        }
    }

    #[test]
    fn rejects_conditional_prefixes() {
        assert!(!is_valid_target("ab 3 Säcken Sperrmüll"));
        assert!(!is_valid_target("bis 2 Liter Schadstoffsammlung"));
        assert!(!is_valid_target("Lauut FES"));
    }

    #[test]
    fn rejects_unsplit_alternatives() {
        assert!(!is_valid_target("Wertstoffhof Nord oder Wertstoffhof West"));
    }
}
