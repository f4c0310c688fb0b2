//! Memory model for the script engine
//!
//! This module provides the core memory abstractions:
//! - [`value`]: Runtime value representation and primitive conversions
//! - [`object`]: Heap objects (plain objects, arrays, errors, functions)
//! - [`scope`]: Lexical scopes and the sealable global scope
//! - [`heap`]: Allocation registry with collection statistics
//!
//! # Ownership
//!
//! Objects are `Rc<RefCell<Object>>`; the heap only holds weak references.
//! An object lives as long as a value, scope or closure refers to it.

pub mod heap;
pub mod object;
pub mod scope;
pub mod value;
