//! Categorical encoding tables
//!
//! Stable string-to-integer code tables for players, teams, and venues.
//! Codes start at 1; code 0 is reserved for identifiers never seen during
//! table construction, so an unknown name encodes instead of failing.

use std::collections::HashMap;

/// Reserved code for identifiers absent from the table
pub const UNKNOWN_CODE: i64 = 0;

/// One category's code table
#[derive(Debug, Clone, Default)]
pub struct CategoryEncoder {
    codes: HashMap<String, i64>,
}

impl CategoryEncoder {
    /// Build a table over the given values. Codes are assigned in sorted
    /// order so the table is stable for a given corpus.
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names: Vec<String> = values
            .into_iter()
            .map(normalize)
            .filter(|v| !v.is_empty())
            .collect();
        names.sort();
        names.dedup();

        let codes = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i as i64 + 1))
            .collect();
        CategoryEncoder { codes }
    }

    /// Encode a name; unknown names map to the reserved code
    pub fn encode(&self, value: &str) -> i64 {
        self.codes
            .get(&normalize(value))
            .copied()
            .unwrap_or(UNKNOWN_CODE)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// The full set of encoding tables the feature schema depends on.
/// Teams and opponents share one table: both columns draw from the same
/// identifier space.
#[derive(Debug, Clone, Default)]
pub struct EncodingTables {
    pub players: CategoryEncoder,
    pub teams: CategoryEncoder,
    pub venues: CategoryEncoder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_sorted_and_stable() {
        let encoder = CategoryEncoder::fit(["Charlie", "alpha", "Bravo"]);
        assert_eq!(encoder.encode("alpha"), 1);
        assert_eq!(encoder.encode("Bravo"), 2);
        assert_eq!(encoder.encode("charlie"), 3);
        assert_eq!(encoder.len(), 3);
    }

    #[test]
    fn test_unknown_maps_to_reserved_code() {
        let encoder = CategoryEncoder::fit(["alpha"]);
        assert_eq!(encoder.encode("never seen"), UNKNOWN_CODE);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let encoder = CategoryEncoder::fit(["V Kohli"]);
        assert_eq!(encoder.encode("  v kohli "), encoder.encode("V Kohli"));
        assert_ne!(encoder.encode("V Kohli"), UNKNOWN_CODE);
    }

    #[test]
    fn test_duplicates_collapse() {
        let encoder = CategoryEncoder::fit(["alpha", "Alpha", "ALPHA "]);
        assert_eq!(encoder.len(), 1);
    }
}
