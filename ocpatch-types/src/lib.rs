//! Shared DTOs for the ocpatch workspace.
//!
//! # Design constraints
//! - Reports are serialized to disk next to the patched config.
//! - Parameters are built by the caller for one run and never persisted by the engine.
//! - Prefer adding optional fields over changing semantics.

pub mod ops;
pub mod params;
pub mod report;

/// Schema identifiers.
pub mod schema {
    pub const OCPATCH_REPORT_V1: &str = "ocpatch.report.v1";
}
