//! Shared utilities.

pub mod clock;
pub mod panic;
pub mod property;
pub mod telemetry;

pub use clock::*;
pub use panic::panic_message;
pub use property::DynamicProperty;
pub use telemetry::*;
