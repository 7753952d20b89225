//! Classification of canonical target names.

use std::collections::HashSet;

use crate::model::{Target, WasteStream};

/// Classify a canonical target name as a waste stream or a facility.
///
/// Names in the fixed stream enumeration are streams, everything else is a
/// facility. Membership in `known_facilities` never changes the kind; it is
/// only carried along so the merge engine knows whether a node already exists.
#[must_use]
pub fn classify_target(name: &str, known_facilities: &HashSet<String>) -> Target {
    match WasteStream::from_name(name) {
        Some(stream) => Target::Stream(stream),
        None => Target::Facility {
            name: name.to_owned(),
            known: known_facilities.contains(name),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TargetKind;
    use crate::normalize::normalize_target_name;

    fn known(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn stream_names_are_streams() {
        let facilities = known(&[]);
        for stream in WasteStream::ALL {
            assert_eq!(
                classify_target(stream.as_str(), &facilities),
                Target::Stream(stream)
            );
        }
    }

    #[test]
    fn normalized_synonym_becomes_stream() {
        let name = normalize_target_name("Restmülltonne");
        let target = classify_target(&name, &known(&[]));
        assert_eq!(target.kind(), TargetKind::Stream);
        assert_eq!(target.name(), "Restabfalltonne");
    }

    #[test]
    fn known_and_unknown_facilities_are_both_facilities() {
        let facilities = known(&["Wertstoffhof Nord"]);
        assert_eq!(
            classify_target("Wertstoffhof Nord", &facilities),
            Target::Facility {
                name: "Wertstoffhof Nord".to_owned(),
                known: true
            }
        );
        assert_eq!(
            classify_target("Klamoddekurier", &facilities),
            Target::Facility {
                name: "Klamoddekurier".to_owned(),
                known: false
            }
        );
    }

    #[test]
    fn stream_wins_even_if_a_facility_shares_the_name() {
        let facilities = known(&["Biotonne"]);
        assert_eq!(
            classify_target("Biotonne", &facilities).kind(),
            TargetKind::Stream
        );
    }

    #[test]
    fn matching_is_exact() {
        assert_eq!(
            classify_target("biotonne", &known(&[])).kind(),
            TargetKind::Facility
        );
    }
}
