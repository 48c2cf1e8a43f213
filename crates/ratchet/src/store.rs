//! Store seams for the runtime.
//!
//! The runtime is the single writer: every `Select` answer and every
//! dispatched action goes through one [`StateStore`] owned by it.

use crate::action::Action;
use crate::reducer::Reducer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Single-writer state container driven by the runtime.
pub trait StateStore: Send {
    /// Snapshot of the current state.
    fn select(&self) -> Value;

    /// Fold one dispatched action into the state.
    fn apply(&mut self, action: &Action);
}

/// Read-only store over a state getter; `apply` is a no-op.
///
/// Saga test drivers use this where only `Select` answers matter.
pub struct FnStore {
    get: Box<dyn Fn() -> Value + Send>,
}

impl FnStore {
    pub fn new(get: impl Fn() -> Value + Send + 'static) -> Self {
        Self { get: Box::new(get) }
    }
}

impl StateStore for FnStore {
    fn select(&self) -> Value {
        (self.get)()
    }

    fn apply(&mut self, _action: &Action) {}
}

/// Reducers mounted at dot-separated paths inside one JSON state tree.
///
/// Each mount owns its slice: `apply` folds every mounted reducer into its
/// own path, and mounting seeds the slice with the reducer's initial state
/// so `select` is meaningful before the first dispatch.
pub struct MountedStore {
    state: Value,
    mounts: Vec<Mount>,
}

impl Default for MountedStore {
    fn default() -> Self {
        Self::new()
    }
}

struct Mount {
    path: Vec<String>,
    reducer: Box<dyn ErasedReducer>,
}

impl MountedStore {
    pub fn new() -> Self {
        Self {
            state: Value::Object(Map::new()),
            mounts: Vec::new(),
        }
    }

    /// Mount a reducer at `path` (e.g. `"app.search"`).
    pub fn mount<R>(&mut self, path: &str, reducer: R)
    where
        R: Reducer + 'static,
        R::State: Serialize + DeserializeOwned,
    {
        let path = split_path(path);
        let initial = serde_json::to_value(reducer.initial())
            .expect("reducer state must serialize to JSON");
        set_at(&mut self.state, &path, initial);
        self.mounts.push(Mount {
            path,
            reducer: Box::new(ErasedMount(reducer)),
        });
    }
}

impl StateStore for MountedStore {
    fn select(&self) -> Value {
        self.state.clone()
    }

    fn apply(&mut self, action: &Action) {
        for mount in &self.mounts {
            let prev = value_at_segments(&self.state, &mount.path).cloned();
            let next = mount.reducer.reduce_value(prev, action);
            set_at(&mut self.state, &mount.path, next);
        }
    }
}

/// Object-safe view of a [`Reducer`] over JSON slices.
trait ErasedReducer: Send {
    fn reduce_value(&self, state: Option<Value>, action: &Action) -> Value;
}

struct ErasedMount<R>(R);

impl<R> ErasedReducer for ErasedMount<R>
where
    R: Reducer,
    R::State: Serialize + DeserializeOwned,
{
    fn reduce_value(&self, state: Option<Value>, action: &Action) -> Value {
        let prev = state.map(|value| {
            serde_json::from_value(value).expect("mounted slice no longer matches its reducer")
        });
        serde_json::to_value(self.0.reduce(prev, action))
            .expect("reducer state must serialize to JSON")
    }
}

/// Navigate a dot-separated path into a state snapshot.
pub fn value_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = split_path(path);
    value_at_segments(root, &segments)
}

fn value_at_segments<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |value, segment| value.get(segment))
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_owned).collect()
}

/// Write `value` at `path`, creating intermediate objects as needed.
fn set_at(root: &mut Value, path: &[String], value: Value) {
    let (last, parents) = path.split_last().expect("mount path must not be empty");
    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = node
            .as_object_mut()
            .expect("just ensured an object")
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut()
        .expect("just ensured an object")
        .insert(last.clone(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::async_type::AsyncType;
    use crate::reducer::{FlagReducer, StatusReducer};
    use serde_json::json;

    #[test]
    fn mounting_seeds_initial_state() {
        let mut store = MountedStore::new();
        store.mount("app.sync", FlagReducer::new(AsyncType::define("SYNC")));
        store.mount("app.load", StatusReducer::new(AsyncType::define("LOAD")));

        assert_eq!(
            store.select(),
            json!({ "app": { "sync": false, "load": { "is_pending": false, "error": null } } })
        );
    }

    #[test]
    fn apply_folds_each_mount_into_its_own_slice() {
        let sync = AsyncType::define("SYNC");
        let load = AsyncType::define("LOAD");
        let mut store = MountedStore::new();
        store.mount("app.sync", FlagReducer::new(sync.clone()));
        store.mount("app.load", StatusReducer::new(load));

        store.apply(&Action::new(sync.pending));

        let state = store.select();
        assert_eq!(value_at(&state, "app.sync"), Some(&json!(true)));
        assert_eq!(
            value_at(&state, "app.load.is_pending"),
            Some(&json!(false))
        );
    }

    #[test]
    fn value_at_misses_return_none() {
        let state = json!({ "a": { "b": 1 } });
        assert_eq!(value_at(&state, "a.b"), Some(&json!(1)));
        assert_eq!(value_at(&state, "a.c"), None);
        assert_eq!(value_at(&state, "x.y"), None);
    }
}
