//! Hardware profile of the one supported laptop model.
//!
//! Everything here is a property of the machine rather than of a session:
//! the SMBIOS model it poses as, which WiFi kext build goes with which
//! macOS release, the firmware quirks it needs, and the UEFI driver order.

use ocpatch_edit::escape_text;
use ocpatch_types::ops::ToggleScope;
use ocpatch_types::params::OsVersionTag;
use serde::{Deserialize, Serialize};

pub const SUPPORTED_PRODUCT_NAME: &str = "MacBookPro16,3";

/// `Misc > Security` values the target firmware can satisfy.
pub const SECURE_BOOT_MODEL_DISABLED: &str = "Disabled";
pub const DMG_LOADING_ANY: &str = "Any";
pub const SCAN_POLICY_ALL: i64 = 0;

pub const VERBOSE_BOOT_ARG: &str = "-v";

/// One build of a kext that ships per macOS release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KextVariant {
    pub os_version: OsVersionTag,
    /// `BundlePath` as written in `Kernel > Add`; also the toggle marker.
    pub bundle_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuirkSetting {
    pub key: String,
    pub value: bool,
}

/// An entry of `UEFI > Drivers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverEntry {
    pub path: String,

    #[serde(default)]
    pub comment: String,

    #[serde(default)]
    pub arguments: String,

    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    #[serde(default)]
    pub load_early: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl DriverEntry {
    pub fn new(path: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            comment: comment.into(),
            arguments: String::new(),
            enabled: true,
            load_early: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareProfile {
    pub product_name: String,
    pub wifi_kexts: Vec<KextVariant>,
    pub quirks: Vec<QuirkSetting>,
    /// Canonical `UEFI > Drivers` list. Order matters: the HFS+ driver must
    /// load before anything that reads from an HFS+ volume.
    pub drivers: Vec<DriverEntry>,
    /// Appended to `boot-args` when a debug boot is requested.
    pub debug_boot_args: Vec<String>,
    pub toggle_scope: ToggleScope,
}

impl Default for HardwareProfile {
    fn default() -> Self {
        Self {
            product_name: SUPPORTED_PRODUCT_NAME.to_string(),
            wifi_kexts: default_wifi_kexts(),
            quirks: default_quirks(),
            drivers: default_drivers(),
            debug_boot_args: vec!["keepsyms=1".to_string(), "debug=0x100".to_string()],
            toggle_scope: ToggleScope::EnclosingDict,
        }
    }
}

impl HardwareProfile {
    pub fn wifi_kext_for(&self, os_version: OsVersionTag) -> Option<&KextVariant> {
        self.wifi_kexts.iter().find(|k| k.os_version == os_version)
    }
}

pub fn default_wifi_kexts() -> Vec<KextVariant> {
    OsVersionTag::ALL
        .into_iter()
        .map(|os_version| KextVariant {
            os_version,
            bundle_path: format!("AirportItlwm_{}.kext", marketing_name(os_version)),
        })
        .collect()
}

fn marketing_name(tag: OsVersionTag) -> &'static str {
    match tag {
        OsVersionTag::BigSur => "BigSur",
        OsVersionTag::Monterey => "Monterey",
        OsVersionTag::Ventura => "Ventura",
        OsVersionTag::Sonoma => "Sonoma",
        OsVersionTag::Sequoia => "Sequoia",
    }
}

pub fn default_quirks() -> Vec<QuirkSetting> {
    [
        // CFG Lock cannot be cleared in this firmware.
        ("AppleXcpmCfgLock", true),
        ("AppleCpuPmCfgLock", true),
        // VT-d stays on in firmware.
        ("DisableIoMapper", true),
        ("DevirtualiseMmio", true),
        ("SetupVirtualMap", true),
    ]
    .into_iter()
    .map(|(key, value)| QuirkSetting {
        key: key.to_string(),
        value,
    })
    .collect()
}

pub fn default_drivers() -> Vec<DriverEntry> {
    vec![
        DriverEntry::new("HfsPlus.efi", "HFS+ file system"),
        DriverEntry::new("OpenRuntime.efi", "OpenCore runtime services"),
        DriverEntry::new("ResetNvramEntry.efi", "Reset NVRAM picker entry"),
        DriverEntry::new("OpenCanopy.efi", "Graphical picker"),
    ]
}

/// Render `<key>Drivers</key><array>…</array>` at column zero.
pub fn render_drivers_block(drivers: &[DriverEntry]) -> String {
    if drivers.is_empty() {
        return "<key>Drivers</key>\n<array/>".to_string();
    }

    let mut out = String::from("<key>Drivers</key>\n<array>\n");
    for d in drivers {
        out.push_str("\t<dict>\n");
        push_string(&mut out, "Arguments", &d.arguments);
        push_string(&mut out, "Comment", &d.comment);
        push_bool(&mut out, "Enabled", d.enabled);
        push_bool(&mut out, "LoadEarly", d.load_early);
        push_string(&mut out, "Path", &d.path);
        out.push_str("\t</dict>\n");
    }
    out.push_str("</array>");
    out
}

fn push_string(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!(
        "\t\t<key>{key}</key>\n\t\t<string>{}</string>\n",
        escape_text(value)
    ));
}

fn push_bool(out: &mut String, key: &str, value: bool) {
    let tag = if value { "<true/>" } else { "<false/>" };
    out.push_str(&format!("\t\t<key>{key}</key>\n\t\t{tag}\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_profile_covers_every_os_version() {
        let profile = HardwareProfile::default();
        for tag in OsVersionTag::ALL {
            assert!(profile.wifi_kext_for(tag).is_some(), "{tag}");
        }
        assert_eq!(
            profile.wifi_kext_for(OsVersionTag::Sonoma).map(|k| k.bundle_path.as_str()),
            Some("AirportItlwm_Sonoma.kext")
        );
    }

    #[test]
    fn hfs_driver_loads_first() {
        assert_eq!(default_drivers()[0].path, "HfsPlus.efi");
    }

    #[test]
    fn drivers_block_renders_dict_entries() {
        let block = render_drivers_block(&[DriverEntry::new("HfsPlus.efi", "HFS+ & co")]);
        assert_eq!(
            block,
            "<key>Drivers</key>\n<array>\n\t<dict>\n\t\t<key>Arguments</key>\n\t\t<string></string>\n\t\t<key>Comment</key>\n\t\t<string>HFS+ &amp; co</string>\n\t\t<key>Enabled</key>\n\t\t<true/>\n\t\t<key>LoadEarly</key>\n\t\t<false/>\n\t\t<key>Path</key>\n\t\t<string>HfsPlus.efi</string>\n\t</dict>\n</array>"
        );
    }

    #[test]
    fn empty_driver_list_renders_self_closing_array() {
        assert_eq!(render_drivers_block(&[]), "<key>Drivers</key>\n<array/>");
    }
}
