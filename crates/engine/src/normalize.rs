use std::collections::BTreeSet;

use crate::model::Abbreviation;

/// Normalize a raw description to its comparable token set.
///
/// Lowercase, commas and semicolons become spaces, whitespace collapses,
/// then abbreviation expansions apply in table order as plain substring
/// replacements. Later expansions see the output of earlier ones.
pub fn tokenize(raw: &str, abbreviations: &[Abbreviation]) -> BTreeSet<String> {
    let mut text = raw
        .trim()
        .to_lowercase()
        .replace([',', ';'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    for abbrev in abbreviations {
        if !abbrev.from.is_empty() {
            text = text.replace(&abbrev.from, &abbrev.to);
        }
    }
    text.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn lowercases_and_splits_punctuation() {
        assert_eq!(
            tokenize("PUMP, Hydraulic;Main", &[]),
            set(&["pump", "hydraulic", "main"])
        );
    }

    #[test]
    fn collapses_whitespace_and_dedupes_tokens() {
        assert_eq!(tokenize("  bolt   bolt \t m12 ", &[]), set(&["bolt", "m12"]));
    }

    #[test]
    fn empty_input_gives_empty_set() {
        assert!(tokenize("   ", &[]).is_empty());
        assert!(tokenize("", &[]).is_empty());
    }

    #[test]
    fn abbreviations_apply_in_order() {
        let abbrevs = vec![
            Abbreviation::new("hyd", "hydraulic"),
            Abbreviation::new("hydraulic pump", "pump hydraulic"),
        ];
        assert_eq!(
            tokenize("HYD PUMP", &abbrevs),
            set(&["pump", "hydraulic"])
        );
    }

    #[test]
    fn abbreviations_match_case_insensitively() {
        let abbrevs = vec![Abbreviation::new("ASSY", "assembly")];
        assert_eq!(tokenize("Valve Assy", &abbrevs), set(&["valve", "assembly"]));
    }

    #[test]
    fn expansion_is_substring_level() {
        // "brg" inside "brgs" expands too; the table is ordered so callers
        // can list longer forms first when that matters.
        let abbrevs = vec![Abbreviation::new("brg", "bearing")];
        assert_eq!(tokenize("brgs", &abbrevs), set(&["bearings"]));
    }
}
