//! Read-only view of the values the pipeline rewrites.

use ocpatch_edit::{EditResult, PlistDocument, count_key, count_values, get_value};
use ocpatch_types::ops::ValueType;
use serde::Serialize;

/// Keys `plan_ops` may rewrite, with their expected value element.
pub const RECOGNIZED_VALUES: &[(&str, ValueType)] = &[
    ("SystemSerialNumber", ValueType::String),
    ("MLB", ValueType::String),
    ("SystemUUID", ValueType::String),
    ("SystemProductName", ValueType::String),
    ("SecureBootModel", ValueType::String),
    ("DmgLoading", ValueType::String),
    ("ScanPolicy", ValueType::Integer),
    ("boot-args", ValueType::String),
    ("AppleXcpmCfgLock", ValueType::Bool),
    ("AppleCpuPmCfgLock", ValueType::Bool),
    ("DisableIoMapper", ValueType::Bool),
    ("DevirtualiseMmio", ValueType::Bool),
    ("SetupVirtualMap", ValueType::Bool),
    ("HideAuxiliary", ValueType::Bool),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyReading {
    pub key: String,
    pub value_type: ValueType,
    pub occurrences: usize,
    /// Present only when the key occurs exactly once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inspection {
    pub values: Vec<KeyReading>,
    /// Number of `<key>Drivers</key>` entries.
    pub drivers_keys: usize,
}

pub fn inspect(doc: &PlistDocument) -> EditResult<Inspection> {
    let mut values = Vec::with_capacity(RECOGNIZED_VALUES.len());
    for &(key, value_type) in RECOGNIZED_VALUES {
        let occurrences = count_values(doc, key, value_type)?;
        let value = if occurrences == 1 {
            get_value(doc, key, value_type)?
        } else {
            None
        };
        values.push(KeyReading {
            key: key.to_string(),
            value_type,
            occurrences,
            value,
        });
    }
    Ok(Inspection {
        values,
        drivers_keys: count_key(doc, "Drivers"),
    })
}
