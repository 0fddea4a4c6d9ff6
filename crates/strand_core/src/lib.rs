//! Core types for the strand runtime.
//!
//! This crate contains the types that are independent of evaluation policy:
//! - `Value` - thread-safe runtime value, cheap to clone into a cache
//! - `Env` - lexical scope chain of one execution
//! - `FastHashMap` - hashbrown map with ahash

pub mod env;
pub mod value;

pub use env::{Env, Scope};
pub use value::{FastHashMap, Value, fast_map_new, fast_map_with_capacity};
