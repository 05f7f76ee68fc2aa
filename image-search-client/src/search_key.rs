use serde::Serialize;
use std::fmt;

/// Canonical form of an entity name: trimmed and lower-cased.
///
/// Caches and in-flight tables are always keyed by `SearchKey`, never by the
/// raw name, so `" Mont Saint-Michel "` and `"mont saint-michel"` share state.
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug, Serialize)]
pub struct SearchKey(String);

impl SearchKey {
    pub fn normalize(name: &str) -> Self {
        SearchKey(name.trim().to_lowercase())
    }

    /// An empty key means there is nothing to search for.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SearchKey {
    fn from(name: &str) -> Self {
        SearchKey::normalize(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace_collapse() {
        let names = [
            "Château de Chambord",
            "  château de chambord",
            "CHÂTEAU DE CHAMBORD\t",
            "\n Château De Chambord \n",
        ];

        let keys: Vec<_> = names.iter().map(|n| SearchKey::normalize(n)).collect();
        assert!(keys.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(keys[0].as_str(), "château de chambord");
    }

    #[test]
    fn test_inner_whitespace_is_kept() {
        assert_ne!(
            SearchKey::normalize("notre dame"),
            SearchKey::normalize("notre  dame")
        );
    }

    #[test]
    fn test_blank_names_are_empty() {
        assert!(SearchKey::normalize("").is_empty());
        assert!(SearchKey::normalize("   \t\n").is_empty());
        assert!(!SearchKey::normalize(" x ").is_empty());
    }
}
