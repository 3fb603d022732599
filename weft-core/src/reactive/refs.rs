//! Object Field Refs
//!
//! Bridges between whole objects and single slots. A [`FieldRef`] is a
//! slot view of one property: reads and writes pass straight through
//! to the object, so the ref and the property never disagree.
//! [`to_refs`] mirrors a whole object into slots so it can be pulled
//! apart without losing reactivity, and [`ProxyRefs`] reads a
//! slot-valued object as if the slots were plain properties.

use super::store::{list, object, ObjRef, Shape};
use crate::value::{PropKey, SlotRef, Value};

/// A slot view of one property of a stored object.
///
/// The ref holds no value of its own. Reading goes through the target
/// handle (so an observed target tracks as usual) and writing notifies
/// the target's subscribers like any other property write. A ref to a
/// missing property reads Null until something sets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    target: ObjRef,
    key: PropKey,
}

impl FieldRef {
    /// Create a slot view of one property of `target`.
    pub fn new(target: ObjRef, key: impl Into<PropKey>) -> Self {
        Self {
            target,
            key: key.into(),
        }
    }

    /// Read the property through the target handle.
    pub fn get(&self) -> Value {
        self.target.get(self.key.clone())
    }

    /// Write the property through the target handle.
    pub fn set(&self, value: impl Into<Value>) {
        self.target.set(self.key.clone(), value);
    }

    /// The property this ref points at.
    pub fn key(&self) -> &PropKey {
        &self.key
    }

    /// The object this ref points into.
    pub fn target(&self) -> ObjRef {
        self.target
    }
}

impl ObjRef {
    /// A slot view of one property of this object.
    pub fn field(&self, key: impl Into<PropKey>) -> FieldRef {
        FieldRef::new(*self, key)
    }

    /// A slot-unwrapping view of this object. See [`ProxyRefs`].
    pub fn proxy_refs(&self) -> ProxyRefs {
        ProxyRefs::new(*self)
    }
}

/// Mirror an object into a fresh object of slots.
///
/// The result is a raw object of the same shape whose every property
/// is a [`FieldRef`] into the source. Destructuring the mirror keeps
/// reactivity: each slot still reads and writes the original. Keys are
/// snapshotted; properties added to the source later are not mirrored.
pub fn to_refs(source: &ObjRef) -> Value {
    let keys = source.keys();
    match source.shape() {
        Shape::List => list(
            keys.into_iter()
                .map(|key| Value::Slot(SlotRef::Field(source.field(key)))),
        ),
        Shape::Map => object(keys.into_iter().map(|key| {
            let slot = Value::Slot(SlotRef::Field(source.field(key.clone())));
            (key, slot)
        })),
    }
}

/// A view of a slot-valued object that auto-unwraps its slots.
///
/// Reading a property whose value is a slot returns the slot's value;
/// writing such a property writes into the slot. Plain properties pass
/// through untouched. Composition roots use this so consumers can say
/// `state.get("count")` instead of unwrapping the slot by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyRefs {
    target: ObjRef,
}

impl ProxyRefs {
    pub fn new(target: ObjRef) -> Self {
        Self { target }
    }

    /// Read a property, unwrapping a slot value.
    pub fn get(&self, key: impl Into<PropKey>) -> Value {
        match self.target.get(key) {
            Value::Slot(slot) => slot.get(),
            other => other,
        }
    }

    /// Write a property.
    ///
    /// When the current value is a slot, the write goes into the slot and
    /// the property keeps pointing at it, whatever the incoming value is.
    /// Otherwise the property itself is replaced.
    pub fn set(&self, key: impl Into<PropKey>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        match self.target.get(key.clone()) {
            Value::Slot(slot) => slot.set(value),
            _ => self.target.set(key, value),
        }
    }

    /// The object underneath.
    pub fn target(&self) -> ObjRef {
        self.target
    }
}

/// Wrap an object in a slot-unwrapping view.
pub fn proxy_refs(target: &ObjRef) -> ProxyRefs {
    ProxyRefs::new(*target)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect::effect;
    use crate::reactive::signal::Signal;
    use crate::reactive::store::{is_reactive, reactive};
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn observed(value: Value) -> ObjRef {
        match reactive(value) {
            Value::Obj(handle) => handle,
            other => panic!("expected an object, got {other:?}"),
        }
    }

    #[test]
    fn field_ref_reads_and_writes_through() {
        let state = observed(object([("n", 1)]));
        let n = state.field("n");

        assert_eq!(n.get(), Value::from(1));

        n.set(2);
        assert_eq!(state.get_untracked("n"), Value::from(2));

        state.set("n", 3);
        assert_eq!(n.get(), Value::from(3));
    }

    #[test]
    fn field_ref_writes_notify_property_subscribers() {
        let state = observed(object([("n", 1)]));
        let runs = Arc::new(AtomicI32::new(0));

        let runs_clone = runs.clone();
        let _effect = effect(move || {
            state.get("n");
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        state.field("n").set(5);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn field_ref_to_a_missing_key_reads_null() {
        let state = observed(object([("present", 1)]));
        let absent = state.field("absent");

        assert_eq!(absent.get(), Value::Null);

        absent.set(7);
        assert_eq!(absent.get(), Value::from(7));
        assert!(state.contains_key("absent"));
    }

    #[test]
    fn field_refs_compare_structurally() {
        let state = observed(object([("a", 1), ("b", 2)]));

        assert_eq!(state.field("a"), state.field("a"));
        assert_ne!(state.field("a"), state.field("b"));
        assert_eq!(*state.field("a").key(), PropKey::from("a"));
        assert_eq!(state.field("a").target(), state);
    }

    #[test]
    fn to_refs_mirrors_each_property() {
        let state = observed(object([("a", 1), ("b", 2)]));
        let mirror = match to_refs(&state) {
            Value::Obj(handle) => handle,
            other => panic!("expected an object, got {other:?}"),
        };

        // The mirror itself is a plain raw object of slots.
        assert!(!mirror.is_reactive());
        assert_eq!(mirror.len(), 2);

        let Value::Slot(a) = mirror.get("a") else {
            panic!("expected a slot");
        };
        assert_eq!(a.get(), Value::from(1));

        // Slots stay live in both directions.
        a.set(Value::from(5));
        assert_eq!(state.get_untracked("a"), Value::from(5));

        state.set("a", 9);
        assert_eq!(a.get(), Value::from(9));
    }

    #[test]
    fn to_refs_preserves_list_shape() {
        let items = observed(list([10, 20]));
        let mirror = match to_refs(&items) {
            Value::Obj(handle) => handle,
            other => panic!("expected an object, got {other:?}"),
        };

        assert_eq!(mirror.shape(), Shape::List);
        let Value::Slot(first) = mirror.get(0usize) else {
            panic!("expected a slot");
        };
        assert_eq!(first.get(), Value::from(10));
    }

    #[test]
    fn to_refs_snapshots_the_key_set() {
        let state = observed(object([("a", 1)]));
        let mirror = match to_refs(&state) {
            Value::Obj(handle) => handle,
            other => panic!("expected an object, got {other:?}"),
        };

        state.set("b", 2);
        assert!(!mirror.contains_key("b"));
    }

    #[test]
    fn destructured_slots_keep_reactivity() {
        let state = observed(object([("count", 0)]));
        let mirror = match to_refs(&state) {
            Value::Obj(handle) => handle,
            other => panic!("expected an object, got {other:?}"),
        };
        let Value::Slot(count) = mirror.get("count") else {
            panic!("expected a slot");
        };

        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();
        let count_clone = count.clone();
        let _effect = effect(move || {
            count_clone.get();
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        state.set("count", 1);
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        count.set(Value::from(2));
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(state.get_untracked("count"), Value::from(2));
    }

    #[test]
    fn proxy_refs_unwraps_slots_on_read() {
        let count = Signal::new(1);
        let state = observed(object([
            ("count", Value::from(count.clone())),
            ("plain", Value::from("text")),
        ]));
        let view = proxy_refs(&state);

        assert_eq!(view.get("count"), Value::from(1));
        assert_eq!(view.get("plain"), Value::from("text"));
        assert_eq!(view.get("missing"), Value::Null);
        assert_eq!(view.target(), state);
    }

    #[test]
    fn proxy_refs_writes_into_slots() {
        let count = Signal::new(1);
        let state = observed(object([("count", Value::from(count.clone()))]));
        let view = proxy_refs(&state);

        view.set("count", 7);

        assert_eq!(count.get_untracked(), Value::from(7));
        assert_eq!(view.get("count"), Value::from(7));
        // The property still holds the slot itself.
        assert!(matches!(state.get_untracked("count"), Value::Slot(_)));
    }

    #[test]
    fn proxy_refs_forwards_slot_writes_into_the_existing_slot() {
        let old = Signal::new(1);
        let new = Signal::new(9);
        let state = observed(object([("count", Value::from(old.clone()))]));
        let view = proxy_refs(&state);

        view.set("count", Value::from(new.clone()));

        // The property keeps pointing at the original slot; the incoming
        // slot lands inside it as an ordinary value.
        assert_eq!(state.get_untracked("count"), Value::from(old.clone()));
        assert_eq!(old.get_untracked(), Value::from(new));
    }

    #[test]
    fn proxy_refs_sets_plain_properties_directly() {
        let state = observed(object([("plain", 1)]));
        let view = proxy_refs(&state);

        view.set("plain", 2);
        assert_eq!(state.get_untracked("plain"), Value::from(2));

        view.set("fresh", 3);
        assert_eq!(view.get("fresh"), Value::from(3));
    }

    #[test]
    fn slots_survive_wrapping() {
        // Wrapping an object does not disturb slot-valued properties.
        let count = Signal::new(5);
        let state = observed(object([("count", Value::from(count))]));

        assert!(is_reactive(&Value::Obj(state)));
        assert!(matches!(state.get("count"), Value::Slot(_)));
    }
}
