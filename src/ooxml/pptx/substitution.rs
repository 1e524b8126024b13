//! The caller-supplied substitution map.

/// Ordered mapping from placeholder key to replacement value.
///
/// Keys are matched literally and case-sensitively. Insertion order is the
/// order in which replacements are applied, which only matters when one
/// value contains another key. Inserting an existing key replaces its value
/// but keeps its position.
///
/// # Examples
///
/// ```rust
/// use slidefill::Substitutions;
///
/// let subs = Substitutions::new()
///     .with("{{TITLE}}", "Quarterly Review")
///     .with("{{AGENDA}}", "Numbers\n\nOutlook");
/// assert_eq!(subs.get("{{TITLE}}"), Some("Quarterly Review"));
/// assert_eq!(subs.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    entries: Vec<(String, String)>,
}

impl Substitutions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a substitution.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Builder-style [`insert`](Self::insert).
    #[inline]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Substitutions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut subs = Self::new();
        subs.extend(iter);
        subs
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Substitutions {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Substitutions {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut subs = Substitutions::from([("{{A}}", "1"), ("{{B}}", "2")]);
        subs.insert("{{A}}", "3");
        let pairs: Vec<_> = subs.iter().collect();
        assert_eq!(pairs, vec![("{{A}}", "3"), ("{{B}}", "2")]);
    }

    #[test]
    fn test_lookup() {
        let subs: Substitutions = vec![("$title".to_string(), "Hello".to_string())]
            .into_iter()
            .collect();
        assert!(subs.contains_key("$title"));
        assert_eq!(subs.get("$Title"), None);
        assert!(!subs.is_empty());
    }
}
