use fxhash::FxHashMap;

/// Explicit id mapping with a fallback-to-identity policy: looking up a key
/// with no entry returns the key unchanged. Used to rename facility columns
/// (for example when applying a de-identification key) without special-casing
/// ids that have no replacement.
#[derive(Debug, Default, Clone)]
pub struct IdMap {
    entries: FxHashMap<String, String>,
}

impl IdMap {
    pub fn lookup<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for IdMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_identity_fallback() {
        let map: IdMap = [("17".to_string(), "H001".to_string())].into_iter().collect();

        assert_eq!(map.lookup("17"), "H001");
        assert_eq!(map.lookup("23"), "23");
    }

    #[test]
    fn test_empty_map_is_identity() {
        let map = IdMap::default();

        assert!(map.is_empty());
        assert_eq!(map.lookup("anything"), "anything");
    }
}
