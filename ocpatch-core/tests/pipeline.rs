//! Integration tests for the patch pipeline against realistic templates.

use camino::{Utf8Path, Utf8PathBuf};
use ocpatch_core::adapters::{FsTemplateStore, InMemoryTemplateStore};
use ocpatch_core::profile::{HardwareProfile, KextVariant};
use ocpatch_core::{PatchError, PatchSettings, patch_file, patch_text, plan_ops, run_patch};
use ocpatch_edit::{EditError, PlistDocument, get_value};
use ocpatch_types::ops::ValueType;
use ocpatch_types::params::{OsVersionTag, PatchParameters, SmbiosValues};
use ocpatch_types::report::{OpStatus, ToolInfo};
use pretty_assertions::assert_eq;
use std::io::Cursor;

const FIXTURE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../tests/fixtures/templates/config-cometlake.plist"
));

fn tool() -> ToolInfo {
    ToolInfo {
        name: "ocpatch".to_string(),
        version: Some("test".to_string()),
    }
}

fn params() -> PatchParameters {
    PatchParameters {
        smbios: SmbiosValues {
            serial: Some("C02ABC123XYZ".to_string()),
            board_serial: Some("C02123456789ABCDE".to_string()),
            system_uuid: Some("3f2504e0-4f89-11d3-9a0c-0305e82c3301".to_string()),
        },
        os_version: OsVersionTag::Sonoma,
        verbose_boot: true,
        ..PatchParameters::default()
    }
}

fn patch_fixture(params: &PatchParameters) -> String {
    let ops = plan_ops(params, &HardwareProfile::default()).expect("plan");
    patch_text(FIXTURE, &ops).expect("patch").text
}

fn parse(text: &str) -> plist::Dictionary {
    plist::Value::from_reader_xml(Cursor::new(text.as_bytes()))
        .expect("strict plist parse")
        .into_dictionary()
        .expect("root dict")
}

fn section<'a>(root: &'a plist::Dictionary, path: &[&str]) -> &'a plist::Dictionary {
    path.iter().fold(root, |dict, key| {
        dict.get(key)
            .and_then(plist::Value::as_dictionary)
            .unwrap_or_else(|| panic!("missing dict {key}"))
    })
}

fn kext_enabled(root: &plist::Dictionary, bundle: &str) -> bool {
    section(root, &["Kernel"])
        .get("Add")
        .and_then(plist::Value::as_array)
        .expect("Kernel > Add")
        .iter()
        .filter_map(plist::Value::as_dictionary)
        .find(|entry| entry.get("BundlePath").and_then(plist::Value::as_string) == Some(bundle))
        .and_then(|entry| entry.get("Enabled"))
        .and_then(plist::Value::as_boolean)
        .unwrap_or_else(|| panic!("kext {bundle}"))
}

fn data_elements(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("<data>") {
        let tail = &rest[start..];
        let end = tail.find("</data>").expect("closed data") + "</data>".len();
        out.push(&tail[..end]);
        rest = &tail[end..];
    }
    out
}

fn utf8_dir(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir")
}

#[test]
fn end_to_end_scenario() {
    let template = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist version=\"1.0\">\n<dict>\n\
        <key>Kernel</key><dict><key>Add</key><array>\n\
        <dict><key>BundlePath</key><string>A.kext</string><key>Enabled</key><true/></dict>\n\
        <dict><key>BundlePath</key><string>B.kext</string><key>Enabled</key><false/></dict>\n\
        </array></dict>\n\
        <key>NVRAM</key><dict><key>boot-args</key><string></string></dict>\n\
        <key>PlatformInfo</key><dict><key>SystemSerialNumber</key><string>PLACEHOLDER</string></dict>\n\
        </dict>\n</plist>\n";
    let profile = HardwareProfile {
        wifi_kexts: vec![
            KextVariant {
                os_version: OsVersionTag::Ventura,
                bundle_path: "A.kext".to_string(),
            },
            KextVariant {
                os_version: OsVersionTag::Sonoma,
                bundle_path: "B.kext".to_string(),
            },
        ],
        ..HardwareProfile::default()
    };
    let params = PatchParameters {
        smbios: SmbiosValues {
            serial: Some("C02ABC123XYZ".to_string()),
            ..SmbiosValues::default()
        },
        os_version: OsVersionTag::Sonoma,
        verbose_boot: true,
        ..PatchParameters::default()
    };

    let ops = plan_ops(&params, &profile).expect("plan");
    let patched = patch_text(template, &ops).expect("patch");
    let doc = PlistDocument::new(patched.text.as_str());

    assert_eq!(
        get_value(&doc, "SystemSerialNumber", ValueType::String).expect("serial"),
        Some("C02ABC123XYZ".to_string())
    );
    assert_eq!(
        get_value(&doc, "boot-args", ValueType::String).expect("boot-args"),
        Some("-v".to_string())
    );
    assert!(patched.text.contains("<string>A.kext</string><key>Enabled</key><false/>"));
    assert!(patched.text.contains("<string>B.kext</string><key>Enabled</key><true/>"));

    let root = parse(&patched.text);
    assert!(!kext_enabled(&root, "A.kext"));
    assert!(kext_enabled(&root, "B.kext"));
}

#[test]
fn patched_fixture_parses_strictly_with_expected_values() {
    let text = patch_fixture(&params());
    let root = parse(&text);

    let generic = section(&root, &["PlatformInfo", "Generic"]);
    let string = |key: &str| generic.get(key).and_then(plist::Value::as_string);
    assert_eq!(string("SystemSerialNumber"), Some("C02ABC123XYZ"));
    assert_eq!(string("MLB"), Some("C02123456789ABCDE"));
    assert_eq!(string("SystemUUID"), Some("3F2504E0-4F89-11D3-9A0C-0305E82C3301"));
    assert_eq!(string("SystemProductName"), Some("MacBookPro16,3"));

    let security = section(&root, &["Misc", "Security"]);
    assert_eq!(
        security.get("SecureBootModel").and_then(plist::Value::as_string),
        Some("Disabled")
    );
    assert_eq!(security.get("DmgLoading").and_then(plist::Value::as_string), Some("Any"));
    assert_eq!(
        security.get("ScanPolicy").and_then(plist::Value::as_signed_integer),
        Some(0)
    );

    let boot = section(&root, &["Misc", "Boot"]);
    assert_eq!(boot.get("HideAuxiliary").and_then(plist::Value::as_boolean), Some(false));

    let nvram = section(&root, &["NVRAM", "Add", "7C436110-AB2A-4BBB-A880-FE41995C9F82"]);
    assert_eq!(
        nvram.get("boot-args").and_then(plist::Value::as_string),
        Some("alcid=11 -igfxblr -v")
    );

    for quirk in ["AppleXcpmCfgLock", "AppleCpuPmCfgLock", "DisableIoMapper"] {
        let quirks = section(&root, &["Kernel", "Quirks"]);
        assert_eq!(quirks.get(quirk).and_then(plist::Value::as_boolean), Some(true), "{quirk}");
    }
    for quirk in ["DevirtualiseMmio", "SetupVirtualMap"] {
        let quirks = section(&root, &["Booter", "Quirks"]);
        assert_eq!(quirks.get(quirk).and_then(plist::Value::as_boolean), Some(true), "{quirk}");
    }

    for tag in OsVersionTag::ALL {
        let bundle = format!("AirportItlwm_{}.kext", match tag {
            OsVersionTag::BigSur => "BigSur",
            OsVersionTag::Monterey => "Monterey",
            OsVersionTag::Ventura => "Ventura",
            OsVersionTag::Sonoma => "Sonoma",
            OsVersionTag::Sequoia => "Sequoia",
        });
        assert_eq!(kext_enabled(&root, &bundle), tag == OsVersionTag::Sonoma, "{bundle}");
    }
    assert!(kext_enabled(&root, "Lilu.kext"));
    assert!(kext_enabled(&root, "IntelBluetoothFirmware.kext"));

    let drivers: Vec<&str> = section(&root, &["UEFI"])
        .get("Drivers")
        .and_then(plist::Value::as_array)
        .expect("UEFI > Drivers")
        .iter()
        .filter_map(plist::Value::as_dictionary)
        .filter_map(|d| d.get("Path").and_then(plist::Value::as_string))
        .collect();
    assert_eq!(
        drivers,
        vec!["HfsPlus.efi", "OpenRuntime.efi", "ResetNvramEntry.efi", "OpenCanopy.efi"]
    );
}

#[test]
fn every_data_element_survives_byte_for_byte() {
    let text = patch_fixture(&params());
    let before = data_elements(FIXTURE);
    assert!(!before.is_empty());
    assert_eq!(data_elements(&text), before);

    let original = parse(FIXTURE);
    let patched = parse(&text);
    assert_eq!(
        section(&patched, &["PlatformInfo", "Generic"]).get("ROM"),
        section(&original, &["PlatformInfo", "Generic"]).get("ROM")
    );
}

#[test]
fn second_run_is_byte_identical() {
    let params = PatchParameters {
        debug_boot: true,
        ..params()
    };
    let ops = plan_ops(&params, &HardwareProfile::default()).expect("plan");
    let first = patch_text(FIXTURE, &ops).expect("first");
    let second = patch_text(&first.text, &ops).expect("second");

    assert_eq!(second.text, first.text);
    assert!(
        second.results.iter().all(|r| r.status == OpStatus::Unchanged),
        "{:#?}",
        second.results
    );
}

#[test]
fn quirks_already_set_are_unchanged() {
    let text = patch_fixture(&PatchParameters::default());
    let ops: Vec<_> = plan_ops(&PatchParameters::default(), &HardwareProfile::default())
        .expect("plan")
        .into_iter()
        .filter(|op| op.id.starts_with("quirks."))
        .collect();
    assert_eq!(ops.len(), 5);

    let patched = patch_text(&text, &ops).expect("patch");
    assert_eq!(patched.text, text);
    assert!(patched.results.iter().all(|r| r.status == OpStatus::Unchanged));
}

#[test]
fn missing_drivers_is_a_warning() {
    let start = FIXTURE.find("\t\t<key>Drivers</key>").expect("drivers key");
    let close = "\n\t\t</array>\n";
    let end = start + FIXTURE[start..].find(close).expect("drivers end") + close.len();
    let template = format!("{}{}", &FIXTURE[..start], &FIXTURE[end..]);
    let path = Utf8Path::new("EFI/OC/config.plist");
    let store = InMemoryTemplateStore::new().with_file(path, template.clone());

    let outcome = run_patch(&PatchSettings::new(path), &params(), &store, tool()).expect("run");

    let warnings: Vec<&str> = outcome.report.warnings().map(|r| r.op_id.as_str()).collect();
    assert_eq!(warnings, vec!["drivers.normalize"]);
    assert_eq!(outcome.report.summary.not_found, 1);
    assert!(outcome.report.summary.file_written);
    assert!(!outcome.text.contains("<key>Drivers</key>"));
    parse(&outcome.text);
}

#[test]
fn dry_run_leaves_store_untouched() {
    let path = Utf8Path::new("config.plist");
    let store = InMemoryTemplateStore::new().with_file(path, FIXTURE);
    let settings = PatchSettings {
        dry_run: true,
        ..PatchSettings::new(path)
    };

    let outcome = run_patch(&settings, &params(), &store, tool()).expect("run");

    assert_eq!(store.get(path).as_deref(), Some(FIXTURE));
    assert_eq!(store.paths(), vec![Utf8PathBuf::from("config.plist")]);
    assert!(outcome.report.dry_run);
    assert!(!outcome.report.summary.file_written);
    assert!(outcome.patch.starts_with("--- a/config.plist\n+++ b/config.plist\n"));
    assert!(outcome.patch.contains("+\t\t\t<string>C02ABC123XYZ</string>"));
    assert_ne!(outcome.report.sha256_before, outcome.report.sha256_after);
}

#[test]
fn ambiguous_key_aborts_without_writing() {
    let template = FIXTURE.replacen(
        "<key>ScanPolicy</key>",
        "<key>ScanPolicy</key>\n\t\t\t<integer>1</integer>\n\t\t\t<key>ScanPolicy</key>",
        1,
    );
    let path = Utf8Path::new("config.plist");
    let store = InMemoryTemplateStore::new().with_file(path, template.clone());

    let err = run_patch(&PatchSettings::new(path), &params(), &store, tool()).expect_err("abort");

    match &err {
        PatchError::Rule { op_id, source } => {
            assert_eq!(op_id, "security.scan_policy");
            assert!(matches!(source, EditError::AmbiguousMatch { count: 2, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 1);
    assert_eq!(store.get(path), Some(template));
    assert_eq!(store.paths().len(), 1);
}

#[test]
fn invalid_params_fail_before_reading() {
    let store = InMemoryTemplateStore::new();
    let params = PatchParameters {
        smbios: SmbiosValues {
            serial: Some("bad serial".to_string()),
            ..SmbiosValues::default()
        },
        ..PatchParameters::default()
    };
    let err = run_patch(&PatchSettings::new("missing.plist"), &params, &store, tool())
        .expect_err("invalid");
    assert!(matches!(err, PatchError::InvalidParams(_)), "{err}");
}

#[test]
fn missing_template_is_a_read_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = utf8_dir(&dir).join("absent.plist");
    let err = run_patch(&PatchSettings::new(&path), &params(), &FsTemplateStore, tool())
        .expect_err("read");
    assert!(matches!(&err, PatchError::Read { path: p, .. } if *p == path), "{err}");
}

#[test]
fn in_place_patch_keeps_a_backup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = utf8_dir(&dir).join("config.plist");
    fs_err::write(&path, FIXTURE).expect("write fixture");

    let first = run_patch(&PatchSettings::new(&path), &params(), &FsTemplateStore, tool())
        .expect("first run");
    let backup = path.with_file_name("config.plist.ocpatch.bak");
    assert_eq!(first.report.backup_path.as_deref(), Some(backup.as_str()));
    assert_eq!(fs_err::read_to_string(&backup).expect("backup"), FIXTURE);
    assert_eq!(fs_err::read_to_string(&path).expect("output"), first.text);

    fs_err::write(&backup, "sentinel").expect("mark backup");
    let second = run_patch(&PatchSettings::new(&path), &params(), &FsTemplateStore, tool())
        .expect("second run");
    assert!(!second.report.summary.file_written);
    assert!(second.report.backup_path.is_none());
    assert!(second.patch.is_empty());
    assert_eq!(fs_err::read_to_string(&backup).expect("backup"), "sentinel");
}

#[test]
fn separate_output_leaves_template_alone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = utf8_dir(&dir);
    let template = root.join("templates/config-cometlake.plist");
    let output = root.join("EFI/OC/config.plist");
    fs_err::create_dir_all(template.parent().expect("parent")).expect("mkdir");
    fs_err::write(&template, FIXTURE).expect("write fixture");

    let settings = PatchSettings {
        output: Some(output.clone()),
        ..PatchSettings::new(&template)
    };
    let outcome = run_patch(&settings, &params(), &FsTemplateStore, tool()).expect("run");

    assert_eq!(fs_err::read_to_string(&template).expect("template"), FIXTURE);
    assert_eq!(fs_err::read_to_string(&output).expect("output"), outcome.text);
    assert!(outcome.report.backup_path.is_none());
    assert_eq!(outcome.report.output, output.as_str());
}

#[test]
fn patch_file_rewrites_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = utf8_dir(&dir).join("config.plist");
    fs_err::write(&path, FIXTURE).expect("write fixture");

    let report = patch_file(&path, &params()).expect("patch");

    assert!(report.summary.file_written);
    assert_eq!(report.summary.ops_total as usize, report.results.len());
    assert_eq!(report.summary.bytes_before, FIXTURE.len() as u64);
    let written = fs_err::read_to_string(&path).expect("read back");
    assert!(written.contains("<string>C02ABC123XYZ</string>"));
}
