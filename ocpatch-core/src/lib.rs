//! Embeddable core library for ocpatch.
//!
//! Turns a golden OpenCore template into a finished `config.plist` for the
//! supported laptop: identity values, relaxed boot security, boot-args,
//! WiFi kext selection, firmware quirks, and a canonical driver list.
//!
//! # Port traits
//!
//! File access goes through [`TemplateStore`](ports::TemplateStore); the
//! [`adapters`] module provides the filesystem and in-memory implementations.
//!
//! # Entry points
//!
//! - [`plan_ops`](planner::plan_ops): the ordered rule list for one run
//! - [`patch_text`](pipeline::patch_text): apply rules to a string
//! - [`run_patch`](pipeline::run_patch): read, patch, back up, write, report
//! - [`patch_file`](pipeline::patch_file): in-place patch with defaults
//! - [`inspect`](inspect::inspect): current values of the rewritten keys

pub mod adapters;
pub mod inspect;
pub mod pipeline;
pub mod planner;
pub mod ports;
pub mod profile;
pub mod settings;

pub use inspect::{Inspection, inspect};
pub use pipeline::{PatchError, PatchOutcome, PatchedText, patch_file, patch_text, run_patch};
pub use planner::plan_ops;
pub use profile::HardwareProfile;
pub use settings::{PatchSettings, resolve_template};
