//! Ordered rule list for one patch run.

use crate::pipeline::PatchError;
use crate::profile::{
    DMG_LOADING_ANY, HardwareProfile, SCAN_POLICY_ALL, SECURE_BOOT_MODEL_DISABLED,
    VERBOSE_BOOT_ARG, render_drivers_block,
};
use ocpatch_types::ops::{Cardinality, PatchOp, PlannedOp, PlistValue, Stage};
use ocpatch_types::params::PatchParameters;
use tracing::debug;
use uuid::Uuid;

/// Build the rules for `params` against `profile`, in stage order.
///
/// Identity values are validated here so a bad serial never reaches the
/// template.
pub fn plan_ops(
    params: &PatchParameters,
    profile: &HardwareProfile,
) -> Result<Vec<PlannedOp>, PatchError> {
    let mut ops = Vec::new();

    // SMBIOS
    if let Some(serial) = &params.smbios.serial {
        validate_serial("serial", serial)?;
        ops.push(set_string(Stage::Smbios, "smbios.serial", "SystemSerialNumber", serial));
    }
    if let Some(mlb) = &params.smbios.board_serial {
        validate_serial("board serial", mlb)?;
        ops.push(set_string(Stage::Smbios, "smbios.board_serial", "MLB", mlb));
    }
    if let Some(uuid) = &params.smbios.system_uuid {
        let uuid = normalize_uuid(uuid)?;
        ops.push(set_string(Stage::Smbios, "smbios.system_uuid", "SystemUUID", &uuid));
    }

    // Product name
    if profile.product_name.trim().is_empty() {
        return Err(PatchError::InvalidParams(
            "profile product name is empty".to_string(),
        ));
    }
    ops.push(set_string(
        Stage::ProductName,
        "product_name",
        "SystemProductName",
        &profile.product_name,
    ));

    // Security
    ops.push(set_string(
        Stage::Security,
        "security.secure_boot_model",
        "SecureBootModel",
        SECURE_BOOT_MODEL_DISABLED,
    ));
    ops.push(set_string(
        Stage::Security,
        "security.dmg_loading",
        "DmgLoading",
        DMG_LOADING_ANY,
    ));
    ops.push(PlannedOp::new(
        Stage::Security,
        "security.scan_policy",
        set("ScanPolicy", PlistValue::Integer(SCAN_POLICY_ALL)),
    ));

    // Boot args
    let mut tokens = Vec::new();
    if params.verbose_boot {
        tokens.push(VERBOSE_BOOT_ARG.to_string());
    }
    if params.debug_boot {
        tokens.extend(profile.debug_boot_args.iter().cloned());
    }
    if !tokens.is_empty() {
        ops.push(PlannedOp::new(
            Stage::BootArgs,
            "boot_args.merge",
            PatchOp::MergeBootArgs { tokens },
        ));
    }

    // Kext selection
    let Some(target) = profile.wifi_kext_for(params.os_version) else {
        return Err(PatchError::InvalidParams(format!(
            "profile has no WiFi kext for macOS {}",
            params.os_version
        )));
    };
    for kext in profile
        .wifi_kexts
        .iter()
        .filter(|k| k.bundle_path != target.bundle_path)
    {
        ops.push(toggle(profile, &kext.bundle_path, false));
    }
    ops.push(toggle(profile, &target.bundle_path, true));

    // Quirks
    for quirk in &profile.quirks {
        ops.push(PlannedOp::new(
            Stage::Quirks,
            format!("quirks.{}", quirk.key),
            set(&quirk.key, PlistValue::Bool(quirk.value)),
        ));
    }

    // Drivers
    ops.push(PlannedOp::new(
        Stage::Drivers,
        "drivers.normalize",
        PatchOp::ReplaceArray {
            key: "Drivers".to_string(),
            block: render_drivers_block(&profile.drivers),
        },
    ));

    // Visibility
    ops.push(PlannedOp::new(
        Stage::Visibility,
        "visibility.hide_auxiliary",
        set("HideAuxiliary", PlistValue::Bool(false)),
    ));

    debug!(
        ops = ops.len(),
        os_version = %params.os_version,
        wifi_kext = %target.bundle_path,
        "planned patch"
    );
    Ok(ops)
}

fn set(key: &str, value: PlistValue) -> PatchOp {
    PatchOp::SetValue {
        key: key.to_string(),
        value,
        cardinality: Cardinality::ExactlyOne,
    }
}

fn set_string(stage: Stage, id: &str, key: &str, value: &str) -> PlannedOp {
    PlannedOp::new(stage, id, set(key, PlistValue::String(value.to_string())))
}

fn toggle(profile: &HardwareProfile, bundle_path: &str, enabled: bool) -> PlannedOp {
    let verb = if enabled { "enable" } else { "disable" };
    PlannedOp::new(
        Stage::KextSelection,
        format!("kext.{verb}.{bundle_path}"),
        PatchOp::ToggleNear {
            marker: bundle_path.to_string(),
            field: "Enabled".to_string(),
            enabled,
            scope: profile.toggle_scope,
        },
    )
}

fn validate_serial(field: &str, value: &str) -> Result<(), PatchError> {
    if value.is_empty() {
        return Err(PatchError::InvalidParams(format!("{field} is empty")));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PatchError::InvalidParams(format!(
            "{field} must be alphanumeric: {value:?}"
        )));
    }
    Ok(())
}

/// Parse and render as upper-case hyphenated, the form OpenCore expects.
fn normalize_uuid(value: &str) -> Result<String, PatchError> {
    let uuid = Uuid::parse_str(value.trim())
        .map_err(|err| PatchError::InvalidParams(format!("system UUID {value:?}: {err}")))?;
    Ok(uuid.hyphenated().to_string().to_uppercase())
}
