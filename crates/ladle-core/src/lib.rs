#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Story discovery for ladle.
//!
//! Turns the story files of a project into the `virtual:generated-list`
//! module consumed by the ladle UI, and instruments each story file so edits
//! propagate over HMR:
//!
//! ```text
//! glob patterns → match → extract (SWC, no execution) → validate keys → generate
//! ```
//!
//! The [`plugin::StoriesPlugin`] wires the pipeline into a Vite-style plugin
//! host and decides between the fallback module and a fatal error when
//! discovery fails.

pub mod config;
pub mod discover;
pub mod error;
pub mod generate;
pub mod plugin;
pub mod transform;

pub use config::Config;
pub use discover::{EntryDataSet, EntryDatum, SourceLoc};
pub use error::{ConfigError, DiscoveryError, DuplicateError, GenerationError, ParseError};
pub use generate::{fallback_module, generate};
pub use plugin::{BuildMode, Plugin, PluginContainer, StoriesPlugin};
