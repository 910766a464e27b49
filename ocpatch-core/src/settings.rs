//! Clap-free settings for the patch pipeline.

use crate::profile::HardwareProfile;
use camino::{Utf8Path, Utf8PathBuf};
use ocpatch_types::params::CpuVariant;

pub const DEFAULT_BACKUP_SUFFIX: &str = ".ocpatch.bak";

/// Settings for one patch run.
#[derive(Debug, Clone)]
pub struct PatchSettings {
    /// Golden template to read.
    pub template: Utf8PathBuf,
    /// Where to write the result. `None` patches the template in place.
    pub output: Option<Utf8PathBuf>,

    pub dry_run: bool,

    // Backups
    pub backup_enabled: bool,
    pub backup_suffix: String,

    pub profile: HardwareProfile,
}

impl PatchSettings {
    pub fn new(template: impl Into<Utf8PathBuf>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    pub fn output_path(&self) -> &Utf8Path {
        self.output.as_deref().unwrap_or(&self.template)
    }

    /// Backup location for the output file, e.g. `config.plist.ocpatch.bak`.
    pub fn backup_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}{}", self.output_path(), self.backup_suffix))
    }
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            template: Utf8PathBuf::from("config.plist"),
            output: None,
            dry_run: false,
            backup_enabled: true,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            profile: HardwareProfile::default(),
        }
    }
}

/// Path of the golden template for `variant` inside `templates_dir`.
pub fn resolve_template(templates_dir: &Utf8Path, variant: CpuVariant) -> Utf8PathBuf {
    templates_dir.join(variant.template_file_name())
}
