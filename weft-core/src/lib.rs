//! Weft Core
//!
//! This crate provides the core runtime for the Weft reactive state
//! framework. It implements:
//!
//! - A dynamically typed value model for reactive state
//! - Observed objects with per-property dependency tracking
//! - Reactive primitives (effects, computed slots, signals)
//! - Watch observers with cleanup hooks
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `value`: The dynamic [`Value`](value::Value) model, property
//!   keys, and slot references
//! - `reactive`: Dependency tracking, the object store, and the
//!   reactive primitives built on top of them
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::reactive::{effect, Computed, Signal};
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let doubled = {
//!     let count = count.clone();
//!     Computed::new(move || (count.get().as_int().unwrap_or(0) * 2).into())
//! };
//!
//! // Create an effect
//! {
//!     let count = count.clone();
//!     let doubled = doubled.clone();
//!     effect(move || {
//!         println!("count: {:?}, doubled: {:?}", count.get(), doubled.get());
//!     });
//! }
//!
//! // Update the signal
//! count.set(5);
//! // The effect re-runs and prints the new values
//! ```

pub mod reactive;
pub mod value;
