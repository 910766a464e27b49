use ocpatch_types::ops::{Cardinality, PatchOp, PlannedOp, PlistValue, Stage, ToggleScope};
use ocpatch_types::params::{CpuVariant, OsVersionTag, PatchParameters, SmbiosValues};
use ocpatch_types::report::{OpStatus, PatchReport, PatchSummary, ToolInfo};
use pretty_assertions::assert_eq;
use serde_json::json;

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "ocpatch".to_string(),
        version: Some("0.0.0".to_string()),
    }
}

#[test]
fn set_value_op_serializes_with_type_tag() {
    let op = PatchOp::SetValue {
        key: "ScanPolicy".to_string(),
        value: PlistValue::Integer(0),
        cardinality: Cardinality::ExactlyOne,
    };
    let v = serde_json::to_value(&op).expect("serialize");
    assert_eq!(
        v,
        json!({
            "type": "set_value",
            "key": "ScanPolicy",
            "value": { "type": "integer", "value": 0 },
            "cardinality": "exactly_one"
        })
    );
}

#[test]
fn toggle_scope_defaults_to_enclosing_dict_when_missing() {
    let op: PatchOp = serde_json::from_value(json!({
        "type": "toggle_near",
        "marker": "AirportItlwm_Sonoma.kext",
        "field": "Enabled",
        "enabled": true
    }))
    .expect("deserialize");
    match op {
        PatchOp::ToggleNear { scope, .. } => assert_eq!(scope, ToggleScope::EnclosingDict),
        other => panic!("unexpected op {other:?}"),
    }
}

#[test]
fn window_scope_carries_char_count() {
    let v = serde_json::to_value(ToggleScope::Window(600)).expect("serialize");
    assert_eq!(v, json!({ "kind": "window", "chars": 600 }));
}

#[test]
fn planned_op_round_trips() {
    let op = PlannedOp::new(
        Stage::BootArgs,
        "boot_args.merge",
        PatchOp::MergeBootArgs {
            tokens: vec!["-v".to_string()],
        },
    );
    let text = serde_json::to_string(&op).expect("serialize");
    let back: PlannedOp = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(back, op);
}

#[test]
fn parameters_accept_minimal_json() {
    let params: PatchParameters = serde_json::from_value(json!({
        "cpu_variant": "comet_lake",
        "os_version": "ventura"
    }))
    .expect("deserialize");
    assert_eq!(params.cpu_variant, CpuVariant::CometLake);
    assert_eq!(params.os_version, OsVersionTag::Ventura);
    assert_eq!(params.smbios, SmbiosValues::default());
    assert!(!params.verbose_boot);
    assert!(!params.debug_boot);
}

#[test]
fn report_new_sets_schema_and_defaults() {
    let report = PatchReport::new(
        tool_info(),
        "EFI/OC/config.plist",
        "EFI/OC/config.plist",
        CpuVariant::IceLake,
        OsVersionTag::Sonoma,
    );
    assert_eq!(report.schema, ocpatch_types::schema::OCPATCH_REPORT_V1);
    assert!(report.results.is_empty());
    assert_eq!(report.summary, PatchSummary::default());
    assert!(report.ended_at.is_none());
    assert_eq!(report.warnings().count(), 0);
}

#[test]
fn summary_counts_each_status() {
    let mut summary = PatchSummary::default();
    summary.record(OpStatus::Applied);
    summary.record(OpStatus::Applied);
    summary.record(OpStatus::Unchanged);
    summary.record(OpStatus::NotFound);
    assert_eq!(summary.ops_total, 4);
    assert_eq!(summary.applied, 2);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.not_found, 1);
}
