//! Configuration file loading for ocpatch.
//!
//! Discovers and loads `ocpatch.toml` from the working directory.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use ocpatch_core::HardwareProfile;
use ocpatch_core::settings::DEFAULT_BACKUP_SUFFIX;
use ocpatch_types::params::{CpuVariant, OsVersionTag};
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "ocpatch.toml";

/// Templates directory used when neither the CLI nor the config names one.
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Top-level configuration from ocpatch.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OcpatchConfig {
    /// Default patch parameters.
    pub defaults: DefaultsConfig,

    /// Hardware profile overrides. Omitted fields keep the built-in values.
    pub profile: HardwareProfile,

    /// Backup settings.
    pub backups: BackupsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub cpu: Option<CpuVariant>,
    pub os_version: Option<OsVersionTag>,
    pub verbose_boot: bool,
    pub debug_boot: bool,
    pub templates_dir: Option<Utf8PathBuf>,
}

/// Backups section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupsConfig {
    /// Whether to back up a file before overwriting it.
    pub enabled: bool,

    /// Suffix for backup files.
    pub suffix: String,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

/// Discover `ocpatch.toml` in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse an ocpatch.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<OcpatchConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<OcpatchConfig> {
    let config: OcpatchConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config if given, else discover one in `dir`, else defaults.
pub fn load_or_default(explicit: Option<&Utf8Path>, dir: &Utf8Path) -> anyhow::Result<OcpatchConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(OcpatchConfig::default()),
    }
}

/// Patch flags as given on the command line, before merging.
#[derive(Debug, Clone, Default)]
pub struct CliPatchArgs {
    pub cpu: Option<CpuVariant>,
    pub os_version: Option<OsVersionTag>,
    pub verbose_boot: bool,
    pub debug_boot: bool,
    pub templates_dir: Option<Utf8PathBuf>,
    pub no_backup: bool,
}

/// Merged configuration combining config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub cpu: CpuVariant,
    pub os_version: OsVersionTag,
    pub verbose_boot: bool,
    pub debug_boot: bool,
    pub templates_dir: Utf8PathBuf,
    pub backups: BackupsConfig,
    pub profile: HardwareProfile,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: OcpatchConfig,
}

impl ConfigMerger {
    pub fn new(config: OcpatchConfig) -> Self {
        Self { config }
    }

    /// Merge with patch command arguments.
    ///
    /// Values given on the CLI replace config values; boolean flags can only
    /// turn a setting on, except `--no-backup` which turns backups off.
    pub fn merge_patch_args(self, cli: &CliPatchArgs) -> MergedConfig {
        let defaults = self.config.defaults;
        let mut backups = self.config.backups;
        if cli.no_backup {
            backups.enabled = false;
        }

        MergedConfig {
            cpu: cli.cpu.or(defaults.cpu).unwrap_or_default(),
            os_version: cli.os_version.or(defaults.os_version).unwrap_or_default(),
            verbose_boot: cli.verbose_boot || defaults.verbose_boot,
            debug_boot: cli.debug_boot || defaults.debug_boot,
            templates_dir: cli
                .templates_dir
                .clone()
                .or(defaults.templates_dir)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_TEMPLATES_DIR)),
            backups,
            profile: self.config.profile,
        }
    }

    pub fn profile(self) -> HardwareProfile {
        self.config.profile
    }
}
