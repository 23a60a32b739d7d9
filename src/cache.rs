//! Key-based query invalidation.
//!
//! Resources include `QueryClient::version(key)` in their source, so bumping
//! a key's generation re-runs every fetch that depends on it. Keys are
//! slash-separated; invalidating `"ciudades"` also bumps `"ciudades/3"`.
use leptos::*;
use std::collections::HashMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryVersions {
    versions: HashMap<String, u64>,
}

impl QueryVersions {
    pub fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    /// Bumps `prefix` and every key nested under it. Returns how many
    /// keys were bumped.
    pub fn invalidate(&mut self, prefix: &str) -> usize {
        let mut bumped = 0;
        for (key, v) in self.versions.iter_mut() {
            if matches_prefix(key, prefix) {
                *v += 1;
                bumped += 1;
            }
        }
        if !self.versions.contains_key(prefix) {
            self.versions.insert(prefix.to_string(), 1);
            bumped += 1;
        }
        bumped
    }

    /// Makes a key known so later prefix invalidations reach it.
    pub fn register(&mut self, key: &str) {
        self.versions.entry(key.to_string()).or_insert(0);
    }
}

fn matches_prefix(key: &str, prefix: &str) -> bool {
    key == prefix || key.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

/// Reactive handle shared through context.
#[derive(Clone, Copy)]
pub struct QueryClient {
    versions: RwSignal<QueryVersions>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self { versions: create_rw_signal(QueryVersions::default()) }
    }

    /// Tracked read; call it inside a resource source closure.
    pub fn version(&self, key: &str) -> u64 {
        let known = self.versions.with_untracked(|v| v.versions.contains_key(key));
        if !known {
            self.versions.update_untracked(|v| v.register(key));
        }
        self.versions.with(|v| v.version(key))
    }

    pub fn invalidate(&self, prefix: &str) {
        tracing::debug!(prefix, "invalidating queries");
        self.versions.update(|v| {
            v.invalidate(prefix);
        });
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

pub fn use_query_client() -> QueryClient {
    use_context::<QueryClient>().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidation_reaches_nested_keys_only() {
        let mut q = QueryVersions::default();
        q.register("ciudades/3");
        q.register("ciudades/4");
        q.register("ciudadesx");
        q.register("barrios/1");

        q.invalidate("ciudades");
        assert_eq!(q.version("ciudades/3"), 1);
        assert_eq!(q.version("ciudades/4"), 1);
        assert_eq!(q.version("ciudadesx"), 0);
        assert_eq!(q.version("barrios/1"), 0);
    }

    #[test]
    fn unknown_keys_start_bumped() {
        let mut q = QueryVersions::default();
        assert_eq!(q.version("pacientes"), 0);
        q.invalidate("pacientes");
        q.invalidate("pacientes");
        assert_eq!(q.version("pacientes"), 2);
    }
}
