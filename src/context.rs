//! The mutable keyed store threaded through workflow execution.

use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A type-erased value stored in a [`Context`].
type Payload = Arc<dyn Any + Send + Sync>;

/// The mutable keyed store passed through the execution tree.
///
/// Rather than an unsynchronised map requiring callers to serialise every
/// access, the store is backed by a sharded concurrent map (`dashmap`).
/// This lets `ParallelWorkflow` honour its `share_context = true` contract
/// — children mutate the same logical Context concurrently — without the
/// core taking an application-level lock; callers still own the "write
/// disjoint keys" discipline, dashmap only guarantees memory safety, not
/// disjointness.
///
/// [`Context::clone`] is a cheap `Arc` clone: clones share the same
/// backing store, which is what `share_context = true` children want.
/// [`Context::fork`] produces a logically isolated copy (new backing map,
/// same payload Arcs) for the `share_context = false` path.
pub struct Context {
    values: Arc<DashMap<String, Payload>>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self {
            values: Arc::new(DashMap::new()),
        }
    }

    /// Inserts or overwrites the value at `key`.
    pub fn put<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.values.insert(key.into(), Arc::new(value));
    }

    /// Returns the value at `key` downcast to `T`, cloned out from under
    /// the shard lock. If the stored value is not assignable to `T`, this
    /// returns `None` rather than erroring — a type mismatch is
    /// deliberately treated as "key missing", not a cast failure.
    pub fn get_typed<T>(&self, key: &str) -> Option<T>
    where
        T: Any + Send + Sync + Clone,
    {
        self.values
            .get(key)
            .and_then(|v| v.downcast_ref::<T>().cloned())
    }

    /// Runs `f` against the value at `key` downcast to `T`, without
    /// cloning it out. Returns `None` if the key is absent or the stored
    /// value does not downcast to `T`.
    pub fn with_typed<T, R>(&self, key: &str, f: impl FnOnce(&T) -> R) -> Option<R>
    where
        T: Any + Send + Sync,
    {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>().map(f))
    }

    /// True if `key` is present, regardless of its value's type.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Removes the value at `key`. Returns true if a value was present.
    pub fn remove(&self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Snapshot of the keys currently stored.
    pub fn keys(&self) -> Vec<String> {
        self.values.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A cheap, shared handle to the same backing store: used when
    /// `ParallelWorkflow.share_context = true` hands every child the
    /// caller's own Context.
    pub fn share(&self) -> Context {
        self.clone()
    }

    /// An isolated copy with its own backing store, populated with the
    /// same payload references: used when
    /// `ParallelWorkflow.share_context = false`. Mutations made through a
    /// forked Context are never merged back into the parent.
    pub fn fork(&self) -> Context {
        let copy: DashMap<String, Payload> = self
            .values
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        Context {
            values: Arc::new(copy),
        }
    }
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("keys", &self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get_typed_roundtrip() {
        let ctx = Context::new();
        ctx.put("count", 42i64);
        assert_eq!(ctx.get_typed::<i64>("count"), Some(42));
    }

    #[test]
    fn type_mismatch_is_treated_as_absent() {
        let ctx = Context::new();
        ctx.put("count", 42i64);
        assert_eq!(ctx.get_typed::<String>("count"), None);
    }

    #[test]
    fn missing_key_is_absent() {
        let ctx = Context::new();
        assert_eq!(ctx.get_typed::<i64>("nope"), None);
        assert!(!ctx.contains_key("nope"));
    }

    #[test]
    fn fork_is_isolated_from_parent() {
        let ctx = Context::new();
        ctx.put("a", 1i64);
        let forked = ctx.fork();
        forked.put("b", 2i64);

        assert!(ctx.get_typed::<i64>("b").is_none());
        assert_eq!(forked.get_typed::<i64>("a"), Some(1));
    }

    #[test]
    fn share_is_visible_across_clones() {
        let ctx = Context::new();
        let shared = ctx.share();
        shared.put("b", 2i64);
        assert_eq!(ctx.get_typed::<i64>("b"), Some(2));
    }

    #[test]
    fn overwrite_replaces_value() {
        let ctx = Context::new();
        ctx.put("k", "first".to_string());
        ctx.put("k", "second".to_string());
        assert_eq!(ctx.get_typed::<String>("k").unwrap(), "second");
    }
}
