use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a plist value element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Integer,
    Bool,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Bool => "bool",
        }
    }
}

/// A typed scalar written into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PlistValue {
    String(String),
    Integer(i64),
    Bool(bool),
}

impl PlistValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            PlistValue::String(_) => ValueType::String,
            PlistValue::Integer(_) => ValueType::Integer,
            PlistValue::Bool(_) => ValueType::Bool,
        }
    }
}

impl fmt::Display for PlistValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlistValue::String(s) => write!(f, "{s:?}"),
            PlistValue::Integer(i) => write!(f, "{i}"),
            PlistValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// How many occurrences of a key a rewrite expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// The key must be unique in the document; duplicates are an error.
    #[default]
    ExactlyOne,
    /// Every occurrence is rewritten identically.
    Any,
}

/// Region searched for the toggled field once the marker is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "chars", rename_all = "snake_case")]
pub enum ToggleScope {
    /// At most this many characters past the end of the marker element.
    Window(usize),
    /// Direct children of the `<dict>` that contains the marker.
    #[default]
    EnclosingDict,
}

/// A single text-rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatchOp {
    SetValue {
        key: String,
        value: PlistValue,
        #[serde(default)]
        cardinality: Cardinality,
    },
    ToggleNear {
        marker: String,
        field: String,
        enabled: bool,
        #[serde(default)]
        scope: ToggleScope,
    },
    ReplaceArray {
        key: String,
        block: String,
    },
    MergeBootArgs {
        tokens: Vec<String>,
    },
}

impl PatchOp {
    /// Short rule name used in logs and reports.
    pub fn rule_name(&self) -> &'static str {
        match self {
            PatchOp::SetValue { .. } => "set_value",
            PatchOp::ToggleNear { .. } => "toggle_near",
            PatchOp::ReplaceArray { .. } => "replace_array",
            PatchOp::MergeBootArgs { .. } => "merge_boot_args",
        }
    }
}

/// Pipeline stage an operation belongs to, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Smbios,
    ProductName,
    Security,
    BootArgs,
    KextSelection,
    Quirks,
    Drivers,
    Visibility,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Smbios => "smbios",
            Stage::ProductName => "product_name",
            Stage::Security => "security",
            Stage::BootArgs => "boot_args",
            Stage::KextSelection => "kext_selection",
            Stage::Quirks => "quirks",
            Stage::Drivers => "drivers",
            Stage::Visibility => "visibility",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation placed in the pipeline, with a stable id for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOp {
    pub id: String,
    pub stage: Stage,
    pub op: PatchOp,
}

impl PlannedOp {
    pub fn new(stage: Stage, id: impl Into<String>, op: PatchOp) -> Self {
        Self {
            id: id.into(),
            stage,
            op,
        }
    }
}
