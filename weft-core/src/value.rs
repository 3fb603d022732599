//! Value Model
//!
//! The reactive engine operates on dynamically shaped state: objects whose
//! properties can hold primitives, nested objects, or reactive slots. This
//! module defines that shape as an explicit tagged value type instead of the
//! runtime marker probing a dynamic language would use.
//!
//! # Design
//!
//! - [`Value`] is the universal property type. `Null` doubles as the result
//!   of reading a missing property, so reads never fail.
//! - [`Value::Obj`] carries an [`ObjRef`] handle into the object store. The
//!   handle knows whether it is the raw object or its observed wrapper; see
//!   the store module for the read/write semantics of each.
//! - [`Value::Slot`] carries a [`SlotRef`]: a slot-like entity (value slot,
//!   field slot, or computed slot) stored *as a value* inside an object. The
//!   tag is assigned at construction, which is what lets the transparent
//!   slot view unwrap slots without probing for marker properties.
//! - Equality is strict per-variant value equality. Object handles compare
//!   by identity, slots by slot identity, floats by `f64` equality (so
//!   `NaN != NaN`, matching the strict-equality change detection of the
//!   write path).

use std::fmt;

use thiserror::Error;

use crate::reactive::{Computed, FieldRef, ObjRef, Signal};

/// A dynamically typed value stored in reactive state.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absence of a value; also what reading a missing property yields.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Handle to an object in the store (raw or observed).
    Obj(ObjRef),
    /// A slot-like entity stored as a property value.
    Slot(SlotRef),
}

impl Value {
    /// Name of the variant, used in diagnostics and conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Obj(_) => "object",
            Value::Slot(_) => "slot",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Object handle, if this value is an object.
    pub fn as_obj(&self) -> Option<ObjRef> {
        match self {
            Value::Obj(r) => Some(*r),
            _ => None,
        }
    }

    /// Slot reference, if this value is a stored slot.
    pub fn as_slot(&self) -> Option<&SlotRef> {
        match self {
            Value::Slot(s) => Some(s),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<ObjRef> for Value {
    fn from(r: ObjRef) -> Self {
        Value::Obj(r)
    }
}

impl From<SlotRef> for Value {
    fn from(s: SlotRef) -> Self {
        Value::Slot(s)
    }
}

impl From<Signal> for Value {
    fn from(s: Signal) -> Self {
        Value::Slot(SlotRef::Signal(s))
    }
}

impl From<FieldRef> for Value {
    fn from(f: FieldRef) -> Self {
        Value::Slot(SlotRef::Field(f))
    }
}

impl From<Computed> for Value {
    fn from(c: Computed) -> Self {
        Value::Slot(SlotRef::Computed(c))
    }
}

/// Error produced when a [`Value`] is converted to a mismatched Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found}")]
pub struct TypeError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl TypeError {
    fn new(expected: &'static str, found: &Value) -> Self {
        Self {
            expected,
            found: found.kind(),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(n) => Ok(n),
            other => Err(TypeError::new("int", &other)),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(n) => Ok(n as f64),
            other => Err(TypeError::new("float", &other)),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(TypeError::new("bool", &other)),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(TypeError::new("string", &other)),
        }
    }
}

/// A property key of an observed object.
///
/// Objects created from key/value pairs use `Name` keys; list-shaped objects
/// enumerate their elements under `Index` keys. Dependency tracking is
/// per-key, so `Name("0")` and `Index(0)` are distinct properties.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropKey {
    Name(String),
    Index(usize),
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropKey::Name(name) => f.write_str(name),
            PropKey::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for PropKey {
    fn from(s: &str) -> Self {
        PropKey::Name(s.to_owned())
    }
}

impl From<String> for PropKey {
    fn from(s: String) -> Self {
        PropKey::Name(s)
    }
}

impl From<usize> for PropKey {
    fn from(i: usize) -> Self {
        PropKey::Index(i)
    }
}

/// A reference to a slot-like entity: anything exposing a single reactive
/// `get`/`set` value cell.
///
/// The variant is fixed when the slot is created, so consumers (most notably
/// the transparent slot view) can distinguish slots from plain values by
/// matching on [`Value::Slot`] rather than probing for marker properties.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotRef {
    /// A free-standing value slot.
    Signal(Signal),
    /// A slot addressing one property of an observed object.
    Field(FieldRef),
    /// A memoized computed slot.
    Computed(Computed),
}

impl SlotRef {
    /// Read the slot's current value, tracking like a direct slot read.
    pub fn get(&self) -> Value {
        match self {
            SlotRef::Signal(s) => s.get(),
            SlotRef::Field(f) => f.get(),
            SlotRef::Computed(c) => c.get(),
        }
    }

    /// Write through to the slot.
    pub fn set(&self, value: Value) {
        match self {
            SlotRef::Signal(s) => s.set(value),
            SlotRef::Field(f) => f.set(value),
            SlotRef::Computed(c) => c.set(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(true).kind(), "bool");
        assert_eq!(Value::from(1).kind(), "int");
        assert_eq!(Value::from(1.5).kind(), "float");
        assert_eq!(Value::from("x").kind(), "string");
    }

    #[test]
    fn accessors_peek_without_converting() {
        let text = Value::from("label");
        assert_eq!(text.as_str(), Some("label"));
        assert_eq!(text.as_int(), None);
        assert!(text.as_slot().is_none());

        let slot = Value::from(Signal::new(4));
        assert_eq!(slot.as_str(), None);
        let inner = slot.as_slot().expect("slot accessor");
        assert_eq!(inner.get(), Value::from(4));
    }

    #[test]
    fn conversions_round_trip() {
        assert_eq!(i64::try_from(Value::from(42)), Ok(42));
        assert_eq!(f64::try_from(Value::from(2.5)), Ok(2.5));
        assert_eq!(bool::try_from(Value::from(true)), Ok(true));
        assert_eq!(String::try_from(Value::from("hi")), Ok("hi".to_owned()));
    }

    #[test]
    fn int_widens_to_float() {
        assert_eq!(f64::try_from(Value::from(3)), Ok(3.0));
        assert_eq!(Value::from(3).as_float(), Some(3.0));
    }

    #[test]
    fn mismatched_conversion_reports_kinds() {
        let err = i64::try_from(Value::from("nope")).unwrap_err();
        assert_eq!(err.expected, "int");
        assert_eq!(err.found, "string");
        assert_eq!(err.to_string(), "expected int, found string");
    }

    #[test]
    fn equality_is_strict_per_variant() {
        assert_eq!(Value::from(1), Value::from(1));
        assert_ne!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::from(0), Value::from(false));
        // NaN never equals itself, so a NaN write always looks like a change.
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn prop_key_display_and_identity() {
        assert_eq!(PropKey::from("name").to_string(), "name");
        assert_eq!(PropKey::from(3usize).to_string(), "3");
        assert_ne!(PropKey::from("0"), PropKey::from(0usize));
    }
}
