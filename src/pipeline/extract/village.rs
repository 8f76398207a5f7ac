//! Post-processing for extracted village names.
//!
//! The model frequently returns the whole first line of the notice as the
//! "village name". Deterministic cleanup handles the common glue; when the
//! result is still implausible, an ordered pattern table hunts for the name
//! inside the original value. Nothing here ever turns a non-empty value
//! into an empty one: the last resort is always the original value.

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::cleaner::clean_village_name;

/// Gujarati village names run 2 to 10 characters; anything longer is a
/// phrase that still has boilerplate in it.
const MIN_VILLAGE_CHARS: usize = 2;
const MAX_VILLAGE_CHARS: usize = 10;

/// A plausible village name contains none of these.
const FORBIDDEN_SUBSTRINGS: &[&str] = &[
    "સર્વે",
    "રેવન્યુ",
    "નંબર",
    "ગામ",
    "તાલુક",
    "જિલ્લ",
    "નોટિસ",
];

struct VillagePattern {
    regex: Regex,
    description: &'static str,
}

/// Ordered: the most specific introduction phrases first, the bare leading
/// word as a last resort.
static EXTRACTION_PATTERNS: LazyLock<Vec<VillagePattern>> = LazyLock::new(|| {
    vec![
        VillagePattern {
            regex: Regex::new(r"મોજે\s+([\p{Gujarati}]+)").expect("valid regex"),
            description: "name after moje (at village)",
        },
        VillagePattern {
            // Before gaam-then-name: "રીબડા ગામ સીમમાં" must yield રીબડા,
            // not the word after ગામ.
            regex: Regex::new(r"([\p{Gujarati}]+)\s+ગામ").expect("valid regex"),
            description: "name before gaam",
        },
        VillagePattern {
            regex: Regex::new(r"ગામ[:\s]+([\p{Gujarati}]+)").expect("valid regex"),
            description: "name after gaam (village)",
        },
        VillagePattern {
            regex: Regex::new(r"^\s*([\p{Gujarati}]+)").expect("valid regex"),
            description: "leading Gujarati word",
        },
    ]
});

/// Clean one extracted village value down to a bare, plausible name.
pub fn postprocess_village_name(raw: &str) -> String {
    let original = raw.trim();
    if original.is_empty() {
        return raw.to_string();
    }

    let cleaned = clean_village_name(original);
    if is_plausible(&cleaned) {
        return cleaned;
    }

    // Deterministic cleanup was not enough. Run the pattern table against
    // the ORIGINAL value: cleanup may already have destroyed the context
    // the patterns key on.
    for pattern in EXTRACTION_PATTERNS.iter() {
        let Some(captures) = pattern.regex.captures(original) else {
            continue;
        };
        let Some(matched) = captures.get(1) else {
            continue;
        };
        let candidate = clean_village_name(matched.as_str());
        if is_plausible(&candidate) {
            tracing::debug!(
                pattern = pattern.description,
                candidate = %candidate,
                "village name recovered by pattern"
            );
            return candidate;
        }
    }

    original.to_string()
}

fn is_plausible(name: &str) -> bool {
    let chars = name.chars().count();
    if !(MIN_VILLAGE_CHARS..=MAX_VILLAGE_CHARS).contains(&chars) {
        return false;
    }
    !FORBIDDEN_SUBSTRINGS
        .iter()
        .any(|forbidden| name.contains(forbidden))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_notice_line_reduces_to_bare_name() {
        assert_eq!(
            postprocess_village_name("ગામ રીબડાના રેવન્યુ સર્વે નં ૩૬૭"),
            "રીબડા"
        );
    }

    #[test]
    fn clean_name_passes_through() {
        assert_eq!(postprocess_village_name("રીબડા"), "રીબડા");
        assert_eq!(postprocess_village_name("કુવાડવા"), "કુવાડવા");
    }

    #[test]
    fn moje_pattern_recovers_name_from_long_phrase() {
        // Cleanup alone leaves "કુવાડવા તા રાજકોટ" (too long); the pattern
        // table picks the name out of the original phrase.
        let name = postprocess_village_name("મોજે કુવાડવા તા. રાજકોટ જિલ્લો રાજકોટ");
        assert_eq!(name, "કુવાડવા");
    }

    #[test]
    fn name_before_gaam_is_recovered() {
        let name = postprocess_village_name("જમીન આવેલી રીબડા ગામ સીમમાં");
        assert_eq!(name, "રીબડા");
    }

    #[test]
    fn never_returns_boilerplate() {
        for raw in [
            "ગામ રીબડાના રેવન્યુ સર્વે નં ૩૬૭",
            "મોજે કુવાડવા તા. રાજકોટ",
            "રીબડા ગામની સીમ",
        ] {
            let name = postprocess_village_name(raw);
            assert!(!name.contains("સર્વે"), "boilerplate in {name:?}");
            assert!(!name.contains("રેવન્યુ"), "boilerplate in {name:?}");
        }
    }

    #[test]
    fn non_empty_input_never_becomes_empty() {
        for raw in ["ગામ", "સર્વે નં", "ક", "રીબડા"] {
            assert!(
                !postprocess_village_name(raw).is_empty(),
                "emptied {raw:?}"
            );
        }
    }

    #[test]
    fn hopeless_value_falls_back_to_original() {
        // Latin text matches no Gujarati pattern and cleans to itself.
        let raw = "completely unrelated latin text about surveys";
        assert_eq!(postprocess_village_name(raw), raw);
    }

    #[test]
    fn empty_input_is_returned_unchanged() {
        assert_eq!(postprocess_village_name(""), "");
    }

    #[test]
    fn plausibility_bounds() {
        assert!(!is_plausible("ક"));
        assert!(is_plausible("રીબડા"));
        assert!(!is_plausible("રીબડા સર્વે"));
        assert!(!is_plausible("ખૂબ લાંબું નામ જે ગામ ન હોઈ શકે કારણ કે"));
    }
}
