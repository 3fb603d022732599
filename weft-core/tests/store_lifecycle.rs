//! Store Lifecycle Tests
//!
//! This file compiles to its own test binary and holds a single test, so it
//! has the process-wide object store to itself and population counts stay
//! deterministic.

use pretty_assertions::assert_eq;
use weft_core::reactive::{object, object_count, reactive};
use weft_core::value::Value;

/// Test that construction and disposal drive the store's population.
#[test]
fn construction_and_disposal_drive_the_store_population() {
    assert_eq!(object_count(), 0);

    let plain = object([("a", 1)]);
    let plain_root = plain.as_obj().unwrap();
    assert_eq!(object_count(), 1);

    let state = reactive(object([("n", 1)]));
    let root = state.as_obj().unwrap();
    assert_eq!(object_count(), 2);

    // Nested constructors add one entry per object.
    let tree = object([("child", object([("leaf", 1)]))]);
    let tree_root = tree.as_obj().unwrap();
    let child_root = tree_root.get_untracked("child").as_obj().unwrap();
    assert_eq!(object_count(), 4);

    // Disposal removes exactly the disposed entry, once.
    root.dispose();
    assert_eq!(object_count(), 3);
    root.dispose();
    assert_eq!(object_count(), 3);

    // A dangling handle reads empty and its writes are dropped.
    assert_eq!(root.get_untracked("n"), Value::Null);
    root.set("n", 2);
    assert_eq!(root.get_untracked("n"), Value::Null);
    assert_eq!(object_count(), 3);

    plain_root.dispose();
    child_root.dispose();
    tree_root.dispose();
    assert_eq!(object_count(), 0);
}
