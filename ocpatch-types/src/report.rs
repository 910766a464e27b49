use crate::ops::Stage;
use crate::params::{CpuVariant, OsVersionTag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Record of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub template: String,
    pub output: String,
    pub cpu_variant: CpuVariant,
    pub os_version: OsVersionTag,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub results: Vec<OpResult>,

    pub summary: PatchSummary,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_after: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

impl PatchReport {
    pub fn new(
        tool: ToolInfo,
        template: impl Into<String>,
        output: impl Into<String>,
        cpu_variant: CpuVariant,
        os_version: OsVersionTag,
    ) -> Self {
        Self {
            schema: crate::schema::OCPATCH_REPORT_V1.to_string(),
            tool,
            template: template.into(),
            output: output.into(),
            cpu_variant,
            os_version,
            dry_run: false,
            started_at: Utc::now(),
            ended_at: None,
            results: vec![],
            summary: PatchSummary::default(),
            sha256_before: None,
            sha256_after: None,
            backup_path: None,
        }
    }

    /// Results whose target was absent from the template.
    pub fn warnings(&self) -> impl Iterator<Item = &OpResult> {
        self.results
            .iter()
            .filter(|r| r.status == OpStatus::NotFound)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpResult {
    pub op_id: String,
    pub stage: Stage,
    pub rule: String,
    pub status: OpStatus,

    /// Number of value elements the rule matched.
    #[serde(default)]
    pub occurrences: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    /// The rule matched and changed the document.
    Applied,
    /// The rule matched but the document already held the target value.
    Unchanged,
    /// The key or marker is not present in this template.
    NotFound,
}

impl OpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OpStatus::Applied => "applied",
            OpStatus::Unchanged => "unchanged",
            OpStatus::NotFound => "not_found",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSummary {
    pub ops_total: u64,
    pub applied: u64,
    pub unchanged: u64,
    pub not_found: u64,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub file_written: bool,
}

impl PatchSummary {
    pub fn record(&mut self, status: OpStatus) {
        self.ops_total += 1;
        match status {
            OpStatus::Applied => self.applied += 1,
            OpStatus::Unchanged => self.unchanged += 1,
            OpStatus::NotFound => self.not_found += 1,
        }
    }
}
