mod config;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use config::{CliPatchArgs, ConfigMerger};
use fs_err as fs;
use ocpatch_core::adapters::FsTemplateStore;
use ocpatch_core::profile::HardwareProfile;
use ocpatch_core::{PatchError, PatchOutcome, PatchSettings, inspect, resolve_template, run_patch};
use ocpatch_edit::PlistDocument;
use ocpatch_render::{render_report_md, render_summary_line};
use ocpatch_types::params::{CpuVariant, OsVersionTag, PatchParameters, SmbiosValues};
use ocpatch_types::report::ToolInfo;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "ocpatch",
    version,
    about = "Patch an OpenCore config.plist golden template for the supported laptop."
)]
struct Cli {
    /// Config file (default: ./ocpatch.toml when present).
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Patch a template into a finished config.plist.
    Patch(PatchArgs),
    /// Show the hardware profile in effect.
    Profile(ProfileArgs),
    /// Print the current values of the keys ocpatch rewrites.
    Inspect(InspectArgs),
}

#[derive(Debug, Parser)]
struct PatchArgs {
    /// Template to patch. Overrides --templates-dir/--cpu selection.
    #[arg(long)]
    template: Option<Utf8PathBuf>,

    /// Directory holding config-<cpu>.plist golden templates.
    #[arg(long)]
    templates_dir: Option<Utf8PathBuf>,

    /// CPU variant selecting the template (comet-lake, ice-lake).
    #[arg(long)]
    cpu: Option<CpuVariant>,

    /// Output file (default: patch the template in place).
    #[arg(long, short)]
    output: Option<Utf8PathBuf>,

    /// SMBIOS system serial number.
    #[arg(long)]
    serial: Option<String>,

    /// SMBIOS board serial (MLB).
    #[arg(long)]
    mlb: Option<String>,

    /// SMBIOS system UUID.
    #[arg(long)]
    uuid: Option<String>,

    /// Target macOS release (name or major version).
    #[arg(long = "os")]
    os_version: Option<OsVersionTag>,

    /// Add -v to boot-args.
    #[arg(long, default_value_t = false)]
    verbose_boot: bool,

    /// Add the profile's debug tokens to boot-args.
    #[arg(long, default_value_t = false)]
    debug_boot: bool,

    /// Print the diff instead of writing.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Do not back up the file being overwritten.
    #[arg(long, default_value_t = false)]
    no_backup: bool,

    /// Write report.json, report.md and patch.diff here.
    #[arg(long)]
    report_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct ProfileArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct InspectArgs {
    /// config.plist to read.
    file: Utf8PathBuf,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            error!("{:?}", e);
            eprintln!("error: {:#}", e);
            let code = e.downcast_ref::<PatchError>().map_or(1, PatchError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cwd = Utf8PathBuf::from(".");
    let file_config = config::load_or_default(cli.config.as_deref(), &cwd)
        .context("load ocpatch.toml config")?;
    let merger = ConfigMerger::new(file_config);

    match cli.cmd {
        Command::Patch(args) => cmd_patch(args, merger),
        Command::Profile(args) => cmd_profile(args, merger.profile()),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn cmd_patch(args: PatchArgs, merger: ConfigMerger) -> anyhow::Result<()> {
    let merged = merger.merge_patch_args(&CliPatchArgs {
        cpu: args.cpu,
        os_version: args.os_version,
        verbose_boot: args.verbose_boot,
        debug_boot: args.debug_boot,
        templates_dir: args.templates_dir.clone(),
        no_backup: args.no_backup,
    });
    debug!(
        "merged config: cpu={}, os={}, verbose={}, debug={}, backups={}",
        merged.cpu, merged.os_version, merged.verbose_boot, merged.debug_boot, merged.backups.enabled
    );

    let template = args
        .template
        .unwrap_or_else(|| resolve_template(&merged.templates_dir, merged.cpu));

    let params = PatchParameters {
        cpu_variant: merged.cpu,
        smbios: SmbiosValues {
            serial: args.serial,
            board_serial: args.mlb,
            system_uuid: args.uuid,
        },
        os_version: merged.os_version,
        verbose_boot: merged.verbose_boot,
        debug_boot: merged.debug_boot,
    };
    let settings = PatchSettings {
        template,
        output: args.output,
        dry_run: args.dry_run,
        backup_enabled: merged.backups.enabled,
        backup_suffix: merged.backups.suffix,
        profile: merged.profile,
    };

    let outcome = run_patch(&settings, &params, &FsTemplateStore, tool_info())?;

    if let Some(dir) = &args.report_dir {
        write_report_artifacts(&outcome, dir)?;
        info!("wrote report to {}", dir);
    }

    if settings.dry_run {
        print!("{}", outcome.patch);
    }
    for w in outcome.report.warnings() {
        eprintln!(
            "warning: {} skipped: {}",
            w.op_id,
            w.message.as_deref().unwrap_or("target not found")
        );
    }
    println!("{}", render_summary_line(&outcome.report));
    Ok(())
}

fn write_report_artifacts(outcome: &PatchOutcome, dir: &Utf8Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir))?;
    write_json(&dir.join("report.json"), &outcome.report)?;
    fs::write(dir.join("report.md"), render_report_md(&outcome.report))?;
    fs::write(dir.join("patch.diff"), &outcome.patch)?;
    Ok(())
}

fn cmd_profile(args: ProfileArgs, profile: HardwareProfile) -> anyhow::Result<()> {
    match args.format {
        OutputFormat::Text => {
            println!("Product name: {}", profile.product_name);
            println!();
            println!("WiFi kexts:");
            for k in &profile.wifi_kexts {
                println!("  {:<10} {}", k.os_version.as_str(), k.bundle_path);
            }
            println!();
            println!("Quirks:");
            for q in &profile.quirks {
                println!("  {:<20} {}", q.key, q.value);
            }
            println!();
            println!("Drivers:");
            for (i, d) in profile.drivers.iter().enumerate() {
                println!("  {}. {}", i + 1, d.path);
            }
            println!();
            println!("Debug boot-args: {}", profile.debug_boot_args.join(" "));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let text = fs::read_to_string(&args.file).with_context(|| format!("read {}", args.file))?;
    let inspection = inspect(&PlistDocument::new(text))
        .with_context(|| format!("inspect {}", args.file))?;

    match args.format {
        OutputFormat::Text => {
            for r in &inspection.values {
                let shown = match (r.occurrences, &r.value) {
                    (0, _) => "<absent>".to_string(),
                    (1, Some(v)) => format!("{v:?}"),
                    (n, _) => format!("<{n} occurrences>"),
                };
                println!("{:<20} {}", r.key, shown);
            }
            let drivers = match inspection.drivers_keys {
                0 => "<absent>".to_string(),
                1 => "present".to_string(),
                n => format!("<{n} occurrences>"),
            };
            println!("{:<20} {}", "Drivers", drivers);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&inspection)?);
        }
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    fs::write(path, s).with_context(|| format!("write {}", path))?;
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "ocpatch".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    }
}
