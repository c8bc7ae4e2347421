//! Process-wide utilities.

pub mod telemetry;

pub use telemetry::{init_telemetry, init_telemetry_json, init_with_format};
