use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CPU family of the target machine. Selects which golden template is patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuVariant {
    #[default]
    CometLake,
    IceLake,
}

impl CpuVariant {
    pub const ALL: [CpuVariant; 2] = [CpuVariant::CometLake, CpuVariant::IceLake];

    pub fn as_str(self) -> &'static str {
        match self {
            CpuVariant::CometLake => "comet_lake",
            CpuVariant::IceLake => "ice_lake",
        }
    }

    /// File name of the golden template shipped for this variant.
    pub fn template_file_name(self) -> &'static str {
        match self {
            CpuVariant::CometLake => "config-cometlake.plist",
            CpuVariant::IceLake => "config-icelake.plist",
        }
    }
}

impl fmt::Display for CpuVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CpuVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "cometlake" => Ok(CpuVariant::CometLake),
            "icelake" => Ok(CpuVariant::IceLake),
            _ => Err(format!("unknown cpu variant: {s}")),
        }
    }
}

/// macOS release the installer targets. Selects which WiFi kext variant is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsVersionTag {
    BigSur,
    Monterey,
    Ventura,
    #[default]
    Sonoma,
    Sequoia,
}

impl OsVersionTag {
    pub const ALL: [OsVersionTag; 5] = [
        OsVersionTag::BigSur,
        OsVersionTag::Monterey,
        OsVersionTag::Ventura,
        OsVersionTag::Sonoma,
        OsVersionTag::Sequoia,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OsVersionTag::BigSur => "big_sur",
            OsVersionTag::Monterey => "monterey",
            OsVersionTag::Ventura => "ventura",
            OsVersionTag::Sonoma => "sonoma",
            OsVersionTag::Sequoia => "sequoia",
        }
    }

    /// Marketing major version, e.g. 14 for Sonoma.
    pub fn major_version(self) -> u32 {
        match self {
            OsVersionTag::BigSur => 11,
            OsVersionTag::Monterey => 12,
            OsVersionTag::Ventura => 13,
            OsVersionTag::Sonoma => 14,
            OsVersionTag::Sequoia => 15,
        }
    }
}

impl fmt::Display for OsVersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsVersionTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        OsVersionTag::ALL
            .into_iter()
            .find(|tag| {
                normalize(tag.as_str()) == key || tag.major_version().to_string() == key
            })
            .ok_or_else(|| format!("unknown macOS version: {s}"))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Synthetic identity values injected into `PlatformInfo > Generic`.
///
/// A `None` field leaves the template's value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmbiosValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_serial: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_uuid: Option<String>,
}

impl SmbiosValues {
    pub fn is_empty(&self) -> bool {
        self.serial.is_none() && self.board_serial.is_none() && self.system_uuid.is_none()
    }
}

/// Inputs for one patch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchParameters {
    pub cpu_variant: CpuVariant,

    #[serde(default)]
    pub smbios: SmbiosValues,

    pub os_version: OsVersionTag,

    #[serde(default)]
    pub verbose_boot: bool,

    /// Adds the profile's debug boot-args (symbol keeping, kernel debug flags).
    #[serde(default)]
    pub debug_boot: bool,
}
