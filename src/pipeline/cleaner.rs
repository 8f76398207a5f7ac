// Deterministic cleanup for village names lifted out of notice text.
// OCR output and model output both arrive with survey-number boilerplate,
// honorific prefixes and case particles glued onto the actual name.

/// Phrases removed outright before anything else. Longer phrases first so a
/// partial removal never leaves half a phrase behind.
const BOILERPLATE_PHRASES: &[&str] = &[
    "રેવન્યુ સર્વે નંબર",
    "રેવન્યુ સર્વે નં",
    "રે.સ.નં.",
    "રે.સ.નં",
    "સર્વે નંબર",
    "સર્વે નં",
    "બ્લોક નંબર",
    "બ્લોક નં",
    "ખાતા નંબર",
    "ખાતા નં",
    "રેવન્યુ",
    "સર્વે",
    "નંબર",
    "તાલુકો",
    "જિલ્લો",
];

/// Leading tokens dropped from the front of the name.
const PREFIX_TOKENS: &[&str] = &["ગામ", "ગામે", "મોજે", "મૌજે", "નં"];

/// Case particles dropped from the end of the name ("of Ribda" style
/// genitives and locatives).
const SUFFIX_PARTICLES: &[&str] = &["નાં", "ના", "ની", "નો", "નું", "માં", "થી"];

/// Clean one village name. Idempotent; empty input comes back unchanged,
/// and anything that cleans down to under 2 characters falls back to the
/// original so a bad cleanup can never erase a name.
pub fn clean_village_name(raw: &str) -> String {
    let original = raw.trim();
    if original.is_empty() {
        return raw.to_string();
    }

    let mut text = original.to_string();
    for phrase in BOILERPLATE_PHRASES {
        if text.contains(phrase) {
            text = text.replace(phrase, " ");
        }
    }
    text = strip_digits_and_punctuation(&text);
    text = strip_prefix_tokens(&text);
    text = strip_suffix_particles(&text);
    let cleaned = normalize_whitespace(&text);

    if cleaned.chars().count() < 2 {
        original.to_string()
    } else {
        cleaned
    }
}

/// Remove ASCII digits, Gujarati digits (૦ through ૯) and punctuation.
fn strip_digits_and_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_digit()
                || ('\u{0AE6}'..='\u{0AEF}').contains(&c)
                || c.is_ascii_punctuation()
                || c == '।'
                || c == '॥'
            {
                ' '
            } else {
                c
            }
        })
        .collect()
}

/// Drop leading tokens like "ગામ" (village) or "મોજે" (at/in) until the
/// first real token.
fn strip_prefix_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    while let Some(first) = tokens.first() {
        if PREFIX_TOKENS.contains(first) {
            tokens.remove(0);
        } else {
            break;
        }
    }
    tokens.join(" ")
}

/// Peel case particles off the end of the name. Loops so "ના" stacked on
/// "માં" still comes off in one cleaning pass; stops before the remainder
/// would drop under 3 characters, which keeps the pass idempotent.
fn strip_suffix_particles(text: &str) -> String {
    let mut current = text.trim().to_string();
    'outer: loop {
        for particle in SUFFIX_PARTICLES {
            if let Some(stem) = current.strip_suffix(particle) {
                let stem = stem.trim_end();
                if stem.chars().count() >= 3 {
                    current = stem.to_string();
                    continue 'outer;
                }
            }
        }
        break;
    }
    current
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
