//! Dagger compiler command line.
//!
//! Usage:
//! - `daggerc check <manifest> [--options FILE] [--format text|json]`
//! - `daggerc generate <manifest> [--options FILE] [--out-dir DIR]`

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use dagger_compiler::{CompilerOptions, DeclarationManifest, RoundReport, compile};

#[derive(Parser, Debug)]
#[command(name = "daggerc")]
#[command(about = "Build, validate and generate Dagger components")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate every component and report diagnostics
    Check {
        /// Declaration manifest (YAML)
        manifest: PathBuf,

        /// Compiler options file (YAML)
        #[arg(long)]
        options: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Write the factory specifications of every generated component
    Generate {
        /// Declaration manifest (YAML)
        manifest: PathBuf,

        /// Compiler options file (YAML)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Output directory, one JSON file per component implementation
        #[arg(long = "out-dir", default_value = "generated")]
        out_dir: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    dagger_tools::init_logging();

    let args = Args::parse();
    match args.command {
        Command::Check {
            manifest,
            options,
            format,
        } => check(&manifest, options.as_deref(), format),
        Command::Generate {
            manifest,
            options,
            out_dir,
        } => generate(&manifest, options.as_deref(), &out_dir),
    }
}

fn run(manifest: &Path, options: Option<&Path>) -> RoundReport {
    let options = match options {
        Some(path) => CompilerOptions::load(path).unwrap_or_else(|e| {
            error!("Failed to load options from {}: {}", path.display(), e);
            process::exit(2);
        }),
        None => CompilerOptions::default(),
    };

    info!("Loading declarations from: {}", manifest.display());
    let manifest = DeclarationManifest::load(manifest).unwrap_or_else(|e| {
        error!("Failed to load manifest: {}", e);
        process::exit(2);
    });

    compile(&manifest.declarations, &options)
}

fn check(manifest: &Path, options: Option<&Path>, format: Format) {
    let report = run(manifest, options);

    match format {
        Format::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                process::exit(2);
            }
        },
        Format::Text => {
            if !report.diagnostics.is_empty() {
                println!("{}", report.format_diagnostics().trim_end());
            }
            info!(
                "{} of {} components generated",
                report.implementations().count(),
                report.components.len()
            );
        }
    }

    if report.has_errors() {
        process::exit(1);
    }
}

fn generate(manifest: &Path, options: Option<&Path>, out_dir: &Path) {
    let report = run(manifest, options);

    if report.has_errors() {
        error!("{}", report.format_diagnostics().trim_end());
        process::exit(1);
    }
    if !report.diagnostics.is_empty() {
        warn!("{}", report.format_diagnostics().trim_end());
    }

    if let Err(e) = fs::create_dir_all(out_dir) {
        error!("Failed to create {}: {}", out_dir.display(), e);
        process::exit(1);
    }

    for implementation in report.implementations() {
        let path = out_dir.join(format!("{}.json", implementation.class_name));
        let written = serde_json::to_string_pretty(implementation)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            error!("Failed to write {}: {}", path.display(), e);
            process::exit(1);
        }
        info!(
            "Wrote {} ({} factories)",
            path.display(),
            implementation.factories.len()
        );
    }
}
