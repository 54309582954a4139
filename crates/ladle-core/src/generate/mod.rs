//! The `virtual:generated-list` module.

pub mod codegen;
mod module;

pub use module::{fallback_module, find_provider, generate, PROVIDER_FILES};
