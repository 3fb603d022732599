//! Object Store
//!
//! Dynamic objects live in a process-wide arena and are addressed by
//! handle. A handle is a small `Copy` value: the entry's id plus a flag
//! saying whether reads and writes through it are observed.
//!
//! # How It Works
//!
//! 1. [`object`] and [`list`] allocate an entry and return a raw
//!    handle. Raw access is plain storage: no tracking, no
//!    notification.
//!
//! 2. [`reactive`] flips the handle's observed flag. The flag is part
//!    of the handle, not the entry, so wrapping is idempotent and every
//!    observed handle to one entry shares the same dependency sets.
//!
//! 3. Object values read through an observed handle come back observed
//!    themselves. Deep structures therefore become trackable lazily,
//!    one property read at a time, with no upfront traversal.
//!
//! # Thread Safety
//!
//! The arena sits behind a `RwLock`. Values are cloned out under the
//! lock and the lock is always released before the dependency graph
//! runs any subscriber, so effect bodies can freely touch the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock};

use indexmap::IndexMap;
use tracing::debug;

use super::graph;
use crate::value::{PropKey, Value};

/// Counter for generating unique object IDs.
static OBJECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique object ID.
fn next_object_id() -> ObjectId {
    ObjectId(OBJECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Unique identifier for a stored object.
///
/// Shared by every handle to the entry, raw and observed alike. The
/// dependency graph keys its property sets by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// The underlying integer, for diagnostics.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// What kind of container an object is.
///
/// Lists are objects whose keys are indexes. The distinction matters
/// for construction and for mirroring a container's shape, not for
/// access: both shapes read and write through the same methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Map,
    List,
}

/// One stored object: its shape and its properties in insertion order.
struct ObjectEntry {
    shape: Shape,
    props: IndexMap<PropKey, Value>,
}

// The arena. Entries stay until explicitly disposed. Handles are plain
// integers, so a handle can outlive its entry; reads through one then
// degrade to Null and writes are dropped.
static STORE: OnceLock<RwLock<HashMap<ObjectId, ObjectEntry>>> = OnceLock::new();

fn get_store() -> &'static RwLock<HashMap<ObjectId, ObjectEntry>> {
    STORE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Allocate a map-shaped object and return a raw handle to it.
///
/// # Example
///
/// ```rust,ignore
/// let user = object([("name", "ada"), ("logins", "0")]);
/// ```
pub fn object<K, V, I>(props: I) -> Value
where
    K: Into<PropKey>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    let props = props
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect();
    Value::Obj(insert_entry(Shape::Map, props))
}

/// Allocate a list-shaped object; items get index keys in order.
pub fn list<V, I>(items: I) -> Value
where
    V: Into<Value>,
    I: IntoIterator<Item = V>,
{
    let props = items
        .into_iter()
        .enumerate()
        .map(|(index, value)| (PropKey::Index(index), value.into()))
        .collect();
    Value::Obj(insert_entry(Shape::List, props))
}

fn insert_entry(shape: Shape, props: IndexMap<PropKey, Value>) -> ObjRef {
    let id = next_object_id();
    get_store()
        .write()
        .expect("object store lock poisoned")
        .insert(id, ObjectEntry { shape, props });
    ObjRef {
        id,
        observed: false,
    }
}

/// Return the observed flavor of a value.
///
/// Objects come back as observed handles to the same entry; wrapping
/// an already observed handle changes nothing. Every other value
/// passes through untouched, so callers can wrap unconditionally.
pub fn reactive(value: Value) -> Value {
    match value {
        Value::Obj(handle) => Value::Obj(handle.to_observed()),
        other => other,
    }
}

/// Check whether a value is an observed object handle.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Obj(handle) if handle.is_reactive())
}

/// Number of live entries in the arena. Intended for leak diagnostics.
pub fn object_count() -> usize {
    get_store()
        .read()
        .expect("object store lock poisoned")
        .len()
}

/// Handle to a stored object.
///
/// Copying a handle never copies the object. Raw and observed handles
/// to one entry share its identity ([`ObjRef::id`]) but compare
/// unequal to each other, mirroring the difference in behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    id: ObjectId,
    observed: bool,
}

impl ObjRef {
    /// Identity of the underlying entry.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Whether reads and writes through this handle participate in
    /// dependency tracking.
    pub fn is_reactive(&self) -> bool {
        self.observed
    }

    /// The observed flavor of this handle. Idempotent.
    pub(crate) fn to_observed(self) -> ObjRef {
        ObjRef {
            observed: true,
            ..self
        }
    }

    /// Read a property.
    ///
    /// Missing keys and disposed objects read as `Value::Null`; a
    /// dynamic object never fails a read. Through an observed handle
    /// the read is tracked, and an object value comes back observed
    /// too, so nested state stays trackable.
    pub fn get(&self, key: impl Into<PropKey>) -> Value {
        let key = key.into();
        let (mut value, live) = self.fetch(&key);

        if self.observed && live {
            if let Value::Obj(child) = &mut value {
                *child = child.to_observed();
            }
            graph::track(self.id, &key);
        }

        value
    }

    /// Read a property without tracking and without wrapping nested
    /// objects.
    pub fn get_untracked(&self, key: impl Into<PropKey>) -> Value {
        self.fetch(&key.into()).0
    }

    /// Fetch a property value plus whether the entry is still live.
    /// Tracking is skipped for dead entries so disposal does not grow
    /// the graph back.
    fn fetch(&self, key: &PropKey) -> (Value, bool) {
        let store = get_store().read().expect("object store lock poisoned");
        match store.get(&self.id) {
            Some(entry) => (
                entry.props.get(key).cloned().unwrap_or(Value::Null),
                true,
            ),
            None => (Value::Null, false),
        }
    }

    /// Write a property.
    ///
    /// The old value is captured, the assignment performed, and
    /// subscribers notified only when this handle is observed and the
    /// value actually changed. Equal writes are silent. Writes through
    /// a handle to a disposed object are dropped.
    pub fn set(&self, key: impl Into<PropKey>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        let changed = {
            let mut store = get_store().write().expect("object store lock poisoned");
            match store.get_mut(&self.id) {
                Some(entry) => {
                    let old = entry.props.get(&key).cloned().unwrap_or(Value::Null);
                    let changed = old != value;
                    entry.props.insert(key.clone(), value);
                    changed
                }
                None => {
                    debug!(object = self.id.raw(), key = %key, "write to disposed object ignored");
                    false
                }
            }
        };

        // The store lock is released; subscribers may re-enter freely.
        if self.observed && changed {
            graph::trigger(self.id, &key);
        }
    }

    /// Property keys in insertion order.
    ///
    /// A snapshot: later writes do not show up in an already returned
    /// list.
    pub fn keys(&self) -> Vec<PropKey> {
        let store = get_store().read().expect("object store lock poisoned");
        store
            .get(&self.id)
            .map(|entry| entry.props.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of properties. Zero for disposed objects.
    pub fn len(&self) -> usize {
        let store = get_store().read().expect("object store lock poisoned");
        store.get(&self.id).map_or(0, |entry| entry.props.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Container shape. Disposed handles report `Shape::Map`.
    pub fn shape(&self) -> Shape {
        let store = get_store().read().expect("object store lock poisoned");
        store.get(&self.id).map_or(Shape::Map, |entry| entry.shape)
    }

    pub fn contains_key(&self, key: impl Into<PropKey>) -> bool {
        let key = key.into();
        let store = get_store().read().expect("object store lock poisoned");
        store
            .get(&self.id)
            .is_some_and(|entry| entry.props.contains_key(&key))
    }

    /// Number of effects subscribed to one property of this object.
    pub fn subscriber_count(&self, key: impl Into<PropKey>) -> usize {
        graph::subscriber_count(self.id, &key.into())
    }

    /// Remove the entry and every dependency set hanging off it.
    ///
    /// Remaining handles keep working in degraded form: reads are
    /// Null, writes are dropped, nothing is notified. Disposing twice
    /// is a no-op.
    pub fn dispose(&self) {
        get_store()
            .write()
            .expect("object store lock poisoned")
            .remove(&self.id);
        graph::drop_object(self.id);
        debug!(object = self.id.raw(), "object disposed");
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
