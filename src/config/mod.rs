//! Configuration for the ZenML server bundle.
//!
//! - `values`: the configuration tree and its defaults
//! - `release`: release identity supplied by the invoker
//! - `loader`: layered YAML values with `--set` overrides
//! - `scalar`: text fields that accept any YAML scalar

pub mod loader;
mod release;
mod scalar;
mod values;

pub use loader::{ValuesLoader, load_values};
pub use release::*;
pub use values::*;
