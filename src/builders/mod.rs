//! Builders to construct guards from code or configuration.

pub mod guard_builder;

pub use guard_builder::PoolGuardBuilder;
