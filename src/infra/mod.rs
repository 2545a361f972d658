//! Infrastructure adapters: thread introspection backends.

pub mod threads;

pub use threads::{default_introspector, ThreadRegistry};
