//! Rendering helpers (markdown) for human-readable reports.

use ocpatch_types::report::{OpStatus, PatchReport};

pub fn render_report_md(report: &PatchReport) -> String {
    let mut out = String::new();
    out.push_str("# ocpatch report\n\n");
    out.push_str(&format!("- Template: `{}`\n", report.template));
    out.push_str(&format!("- Output: `{}`\n", report.output));
    out.push_str(&format!(
        "- Target: {} / macOS {}\n",
        report.cpu_variant, report.os_version
    ));
    if report.dry_run {
        out.push_str("- Mode: dry run\n");
    }
    out.push_str(&format!(
        "- Ops: {} (applied {}, unchanged {}, not found {})\n",
        report.summary.ops_total,
        report.summary.applied,
        report.summary.unchanged,
        report.summary.not_found
    ));
    out.push_str(&format!(
        "- Bytes: {} → {}\n",
        report.summary.bytes_before, report.summary.bytes_after
    ));
    out.push_str(&format!("- Written: {}\n", report.summary.file_written));
    if let Some(backup) = &report.backup_path {
        out.push_str(&format!("- Backup: `{}`\n", backup));
    }
    if let (Some(before), Some(after)) = (&report.sha256_before, &report.sha256_after) {
        out.push_str(&format!("- sha256: {} → {}\n", short(before), short(after)));
    }
    out.push('\n');

    let warnings: Vec<_> = report.warnings().collect();
    if !warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for w in warnings {
            let msg = w.message.as_deref().unwrap_or("target not found");
            out.push_str(&format!("- `{}`: {}\n", w.op_id, msg));
        }
        out.push('\n');
    }

    out.push_str("## Results\n\n");
    if report.results.is_empty() {
        out.push_str("_No results._\n");
        return out;
    }

    out.push_str("| # | Op | Stage | Rule | Status | Matches |\n");
    out.push_str("|---|----|-------|------|--------|---------|\n");
    for (i, r) in report.results.iter().enumerate() {
        out.push_str(&format!(
            "| {} | `{}` | {} | {} | {} | {} |\n",
            i + 1,
            r.op_id,
            r.stage,
            r.rule,
            status_label(r.status),
            r.occurrences
        ));
    }

    out
}

/// One-line summary for terminal output.
pub fn render_summary_line(report: &PatchReport) -> String {
    let verb = match (report.dry_run, report.summary.file_written) {
        (true, _) => "would patch",
        (false, true) => "patched",
        (false, false) => "unchanged",
    };
    format!(
        "{verb} {}: {} applied, {} unchanged, {} not found",
        report.output, report.summary.applied, report.summary.unchanged, report.summary.not_found
    )
}

fn status_label(s: OpStatus) -> &'static str {
    match s {
        OpStatus::Applied => "applied",
        OpStatus::Unchanged => "unchanged",
        OpStatus::NotFound => "**not found**",
    }
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
