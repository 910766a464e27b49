//! Patch pipeline: plan, read, rewrite in memory, then back up and write.
//!
//! All filesystem access goes through [`TemplateStore`]. Nothing is written
//! unless every rule succeeded.

use crate::adapters::FsTemplateStore;
use crate::planner::plan_ops;
use crate::ports::TemplateStore;
use crate::settings::PatchSettings;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use ocpatch_edit::{EditError, PlistDocument, apply_op, render_patch, sha256_hex};
use ocpatch_types::ops::PlannedOp;
use ocpatch_types::params::PatchParameters;
use ocpatch_types::report::{OpResult, OpStatus, PatchReport, ToolInfo};
use tracing::{debug, info, warn};

/// Error type for pipeline results. Exit code 2 = invalid parameters, 1 = everything else.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("read {path}: {source:#}")]
    Read {
        path: Utf8PathBuf,
        source: anyhow::Error,
    },

    #[error("write {path}: {source:#}")]
    Write {
        path: Utf8PathBuf,
        source: anyhow::Error,
    },

    #[error("rule {op_id} failed: {source}")]
    Rule {
        op_id: String,
        #[source]
        source: EditError,
    },
}

impl PatchError {
    pub fn exit_code(&self) -> u8 {
        match self {
            PatchError::InvalidParams(_) => 2,
            _ => 1,
        }
    }
}

/// Result of applying rules to a string.
#[derive(Debug, Clone)]
pub struct PatchedText {
    pub text: String,
    pub results: Vec<OpResult>,
}

/// Apply `ops` in order. Missing targets are recorded and skipped; any other
/// rule failure aborts the whole run.
pub fn patch_text(template: &str, ops: &[PlannedOp]) -> Result<PatchedText, PatchError> {
    let mut doc = PlistDocument::new(template);
    let mut results = Vec::with_capacity(ops.len());

    for planned in ops {
        let rule = planned.op.rule_name();
        let (status, occurrences, message) = match apply_op(&mut doc, &planned.op) {
            Ok(rw) if rw.changed => (OpStatus::Applied, rw.occurrences, None),
            Ok(rw) => (OpStatus::Unchanged, rw.occurrences, None),
            Err(err) if err.is_recoverable() => {
                warn!(op_id = %planned.id, stage = %planned.stage, rule, "{err}");
                (OpStatus::NotFound, 0, Some(err.to_string()))
            }
            Err(source) => {
                return Err(PatchError::Rule {
                    op_id: planned.id.clone(),
                    source,
                });
            }
        };
        debug!(op_id = %planned.id, status = status.as_str(), occurrences, "rule");
        results.push(OpResult {
            op_id: planned.id.clone(),
            stage: planned.stage,
            rule: rule.to_string(),
            status,
            occurrences: occurrences as u64,
            message,
        });
    }

    Ok(PatchedText {
        text: doc.into_string(),
        results,
    })
}

/// Outcome of `run_patch`.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub report: PatchReport,
    /// Unified diff of the output against what it replaces. Empty when unchanged.
    pub patch: String,
    pub text: String,
}

/// Run the full pipeline for one template.
pub fn run_patch(
    settings: &PatchSettings,
    params: &PatchParameters,
    store: &dyn TemplateStore,
    tool: ToolInfo,
) -> Result<PatchOutcome, PatchError> {
    let template = settings.template.as_path();
    let output = settings.output_path();

    let mut report = PatchReport::new(
        tool,
        template.as_str(),
        output.as_str(),
        params.cpu_variant,
        params.os_version,
    );
    report.dry_run = settings.dry_run;

    let ops = plan_ops(params, &settings.profile)?;
    let before = read(store, template)?;
    let PatchedText { text, results } = patch_text(&before, &ops)?;

    // What the write would replace: the template itself, or an existing output file.
    let current = if output == template {
        Some(before.clone())
    } else if store.exists(output) {
        Some(read(store, output)?)
    } else {
        None
    };
    let baseline = current.as_deref().unwrap_or("");
    let patch = render_patch(output.as_str(), baseline, &text);

    for r in &results {
        report.summary.record(r.status);
    }
    report.results = results;
    report.summary.bytes_before = before.len() as u64;
    report.summary.bytes_after = text.len() as u64;
    report.sha256_before = Some(sha256_hex(before.as_bytes()));
    report.sha256_after = Some(sha256_hex(text.as_bytes()));

    let needs_write = current.as_deref() != Some(text.as_str());
    if !settings.dry_run && needs_write {
        if settings.backup_enabled
            && let Some(current) = &current
        {
            let backup = settings.backup_path();
            write(store, &backup, current)?;
            report.backup_path = Some(backup.to_string());
        }
        write(store, output, &text)?;
        report.summary.file_written = true;
    }
    report.ended_at = Some(Utc::now());

    info!(
        template = %template,
        output = %output,
        applied = report.summary.applied,
        unchanged = report.summary.unchanged,
        not_found = report.summary.not_found,
        written = report.summary.file_written,
        dry_run = settings.dry_run,
        "patch complete"
    );

    Ok(PatchOutcome {
        report,
        patch,
        text,
    })
}

/// Patch `path` in place with the default profile.
pub fn patch_file(path: &Utf8Path, params: &PatchParameters) -> Result<PatchReport, PatchError> {
    let settings = PatchSettings::new(path);
    let tool = ToolInfo {
        name: "ocpatch".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };
    run_patch(&settings, params, &FsTemplateStore, tool).map(|outcome| outcome.report)
}

fn read(store: &dyn TemplateStore, path: &Utf8Path) -> Result<String, PatchError> {
    store.read_template(path).map_err(|source| PatchError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write(store: &dyn TemplateStore, path: &Utf8Path, contents: &str) -> Result<(), PatchError> {
    store
        .write_file(path, contents.as_bytes())
        .map_err(|source| PatchError::Write {
            path: path.to_path_buf(),
            source,
        })
}
