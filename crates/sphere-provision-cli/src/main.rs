// crates/sphere-provision-cli/src/main.rs
// ============================================================================
// Module: Sphere Provision CLI Entry Point
// Description: Operator command line for catalogs and agent-config artifacts.
// Purpose: Generate validated config artifacts and validate environment catalogs.
// Dependencies: clap, serde_json, sphere-config-core, sphere-provision, thiserror
// ============================================================================

//! ## Overview
//! The provisioning CLI is the operator-side entry point: it loads an
//! environment catalog from disk, generates per-device (or batch) agent
//! config artifacts, and validates catalogs ahead of deployment. Generation
//! fails closed: an invalid merged document produces a non-zero exit and the
//! full violation list on stderr, never a partial artifact.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use sphere_config_core::AgentConfigDocument;
use sphere_config_core::DeviceIdentity;
use sphere_config_core::EnvironmentName;
use sphere_provision::BatchRequest;
use sphere_provision::EnvironmentCatalog;
use sphere_provision::artifact_file_name;
use sphere_provision::generate;
use sphere_provision::generate_batch;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "sphere-provision", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate agent config artifacts for one environment.
    Generate(GenerateCommand),
    /// Environment catalog utilities.
    Catalog {
        /// Selected catalog subcommand.
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

/// Arguments for artifact generation.
#[derive(Args, Debug)]
struct GenerateCommand {
    /// Target environment name from the catalog.
    #[arg(long, value_name = "NAME")]
    env: String,
    /// Workstation identifier of the physical host or farm slot.
    #[arg(long, value_name = "ID")]
    workstation_id: String,
    /// Clone instance index (0-based).
    #[arg(long, value_name = "N", default_value_t = 0)]
    instance_index: u32,
    /// Deployment location label (falls back to the environment default).
    #[arg(long, value_name = "LABEL")]
    location: Option<String>,
    /// Emulator instance name recorded in document metadata.
    #[arg(long, value_name = "NAME")]
    ldplayer_name: Option<String>,
    /// Number of documents to generate as an indexed batch.
    #[arg(long, value_name = "N", default_value_t = 1)]
    count: u32,
    /// First instance index of the batch (defaults to `--instance-index`).
    #[arg(long, value_name = "N")]
    start_index: Option<u32>,
    /// Directory holding the environment catalog (`<name>.json` files).
    #[arg(long, value_name = "DIR")]
    catalog: PathBuf,
    /// Output directory for generated artifacts.
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,
    /// Explicit output file path (single-document generation only).
    #[arg(long, value_name = "PATH")]
    output_file: Option<PathBuf>,
    /// Field override as `FIELD=JSON`, applied after identity merging.
    #[arg(long = "override", value_name = "FIELD=JSON", action = ArgAction::Append)]
    overrides: Vec<String>,
}

/// Catalog subcommands.
#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Validate every environment definition in a catalog directory.
    Validate(CatalogValidateCommand),
}

/// Arguments for catalog validation.
#[derive(Args, Debug)]
struct CatalogValidateCommand {
    /// Directory holding the environment catalog (`<name>.json` files).
    #[arg(long, value_name = "DIR")]
    catalog: PathBuf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying the message shown to the operator.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("sphere-provision {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        return Err(CliError::new("no subcommand given; see --help".to_string()));
    };

    match command {
        Commands::Generate(command) => command_generate(&command),
        Commands::Catalog {
            command,
        } => command_catalog(&command),
    }
}

// ============================================================================
// SECTION: Generate Command
// ============================================================================

/// Executes the `generate` command.
fn command_generate(command: &GenerateCommand) -> CliResult<ExitCode> {
    let catalog = EnvironmentCatalog::load_dir(&command.catalog)
        .map_err(|err| CliError::new(format!("catalog load failed: {err}")))?;
    let environment = EnvironmentName::from(command.env.as_str());
    let identity = build_identity(command)?;

    if command.count > 1 {
        if command.output_file.is_some() {
            return Err(CliError::new(
                "--output-file applies to single-document generation; batch artifacts are named \
                 sphere-agent-config-NNN.json under --output-dir"
                    .to_string(),
            ));
        }
        let start_index = command.start_index.unwrap_or(command.instance_index);
        let batch = BatchRequest {
            count: command.count,
            start_index,
        };
        let documents = generate_batch(&catalog, &environment, &identity, batch)
            .map_err(|err| CliError::new(err.to_string()))?;
        for (index, document) in (start_index..).zip(documents.iter()) {
            let path = command.output_dir.join(artifact_file_name(Some(index)));
            write_artifact(&path, document)?;
            write_stdout_line(&format!("wrote {}", path.display()))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let document =
        generate(&catalog, &environment, &identity).map_err(|err| CliError::new(err.to_string()))?;
    let path = single_output_path(command);
    write_artifact(&path, &document)?;
    write_stdout_line(&format!("wrote {}", path.display()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the device identity from generate arguments.
fn build_identity(command: &GenerateCommand) -> CliResult<DeviceIdentity> {
    let mut identity = DeviceIdentity::new(command.workstation_id.clone(), command.instance_index);
    if let Some(location) = &command.location {
        identity = identity.with_location(location.clone());
    }
    if let Some(name) = &command.ldplayer_name {
        identity = identity.with_ldplayer_name(name.clone());
    }
    identity.overrides = parse_overrides(&command.overrides)?;
    Ok(identity)
}

/// Parses repeated `FIELD=JSON` override arguments.
fn parse_overrides(entries: &[String]) -> CliResult<BTreeMap<String, Value>> {
    let mut overrides = BTreeMap::new();
    for entry in entries {
        let (field, value) = parse_override_entry(entry)?;
        overrides.insert(field, value);
    }
    Ok(overrides)
}

/// Parses one `FIELD=JSON` override argument.
fn parse_override_entry(entry: &str) -> CliResult<(String, Value)> {
    let (field, raw) = entry
        .split_once('=')
        .ok_or_else(|| CliError::new(format!("override must be FIELD=JSON: {entry}")))?;
    if field.is_empty() {
        return Err(CliError::new(format!("override field name is empty: {entry}")));
    }
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| CliError::new(format!("override value for {field} is not JSON: {err}")))?;
    Ok((field.to_string(), value))
}

/// Picks the output path for single-document generation.
fn single_output_path(command: &GenerateCommand) -> PathBuf {
    command
        .output_file
        .clone()
        .unwrap_or_else(|| command.output_dir.join(artifact_file_name(None)))
}

/// Writes one document to disk as pretty-printed JSON with a trailing newline.
fn write_artifact(path: &Path, document: &AgentConfigDocument) -> CliResult<()> {
    let mut rendered = document
        .to_json_string()
        .map_err(|err| CliError::new(format!("artifact serialization failed: {err}")))?;
    rendered.push('\n');
    fs::write(path, rendered)
        .map_err(|err| CliError::new(format!("write failed for {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Catalog Command
// ============================================================================

/// Executes the `catalog` subcommands.
fn command_catalog(command: &CatalogCommand) -> CliResult<ExitCode> {
    match command {
        CatalogCommand::Validate(command) => command_catalog_validate(command),
    }
}

/// Executes `catalog validate`: loads the directory and reports what it holds.
fn command_catalog_validate(command: &CatalogValidateCommand) -> CliResult<ExitCode> {
    let catalog = EnvironmentCatalog::load_dir(&command.catalog)
        .map_err(|err| CliError::new(format!("catalog invalid: {err}")))?;
    let mut names: Vec<&str> = catalog.names().collect();
    names.sort_unstable();
    write_stdout_line(&format!(
        "catalog ok: {} environment(s): {}",
        catalog.len(),
        names.join(", ")
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed writing to {stream}: {error}")
}

/// Reports an error on stderr and maps it to a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
