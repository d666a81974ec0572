use std::collections::{BTreeSet, HashMap};

/// A mapping from a name to the set of names registered under it.
///
/// Values are kept ordered so anything derived from a set (such as a
/// permitted-subclass list) comes out the same on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMultimap {
    inner: HashMap<String, BTreeSet<String>>,
}

impl NameMultimap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: &str) -> bool {
        match self.inner.get_mut(key) {
            Some(values) => values.insert(value.to_string()),
            None => {
                self.inner
                    .insert(key.to_string(), BTreeSet::from([value.to_string()]));
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.inner.get(key)
    }

    /// True when every one of `values` is registered under `key`.
    pub fn contains_all<'a>(&self, key: &str, values: impl IntoIterator<Item = &'a String>) -> bool {
        let empty = BTreeSet::new();
        let registered = self.inner.get(key).unwrap_or(&empty);
        values.into_iter().all(|v| registered.contains(v))
    }
}
