//! Case Parts CLI - build driver for the modeling engine
//!
//! Commands: variants, validate, build, batch
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation or build failure

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use caseparts_core::{
    BuildPipeline, FailureMode, VariantId, VariantRecord, VariantRegistry,
};

#[derive(Parser)]
#[command(name = "caseparts-cli")]
#[command(about = "Case Parts CLI - parametric features for computer-case parts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory of JSON variant records; these override built-ins with the same id
    #[arg(short, long, default_value = "variants", global = true)]
    variants_dir: PathBuf,

    /// Downgrade incomplete markers from errors to warnings
    #[arg(long, global = true)]
    allow_incomplete: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available variants
    Variants,

    /// Build a variant's features and report validation
    Validate {
        /// Variant ID
        #[arg(short = 'V', long)]
        variant: String,
    },

    /// Build one part
    Build {
        /// Variant ID
        #[arg(short = 'V', long, required_unless_present = "payload", conflicts_with = "payload")]
        variant: Option<String>,

        /// JSON payload (VariantRecord)
        #[arg(short, long)]
        payload: Option<String>,
    },

    /// Build many parts; one failure does not stop the others
    Batch {
        /// Variant IDs (default: all)
        #[arg(short = 'V', long = "variant")]
        variants: Vec<String>,

        /// Write `<part_no>.json` for each built part here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let mut registry = VariantRegistry::builtin();
    match registry.extend_from_dir(&cli.variants_dir) {
        Ok(loaded) => tracing::debug!(loaded, dir = %cli.variants_dir.display(), "variant records"),
        Err(e) => {
            fail(&format!("Failed to load variants: {}", e));
            return ExitCode::FAILURE;
        }
    }

    let policy = if cli.allow_incomplete {
        FailureMode::Warn
    } else {
        FailureMode::Block
    };
    let pipeline = BuildPipeline::new(registry).with_policy(policy);

    match cli.command {
        Commands::Variants => {
            let variants: Vec<_> = pipeline.list_variants()
                .iter()
                .map(|v| serde_json::json!({
                    "id": v.id,
                    "name": v.name,
                    "family": v.family.name(),
                    "complete": v.is_complete(),
                }))
                .collect();
            emit(&variants)
        }

        Commands::Validate { variant } => {
            match pipeline.validate_variant(&variant) {
                Ok(result) => {
                    let code = emit(&result);
                    if result.valid { code } else { ExitCode::from(2) }
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "valid": false,
                        "kind": e.kind(),
                        "error": e.to_string(),
                    });
                    emit(&output);
                    ExitCode::from(2)
                }
            }
        }

        Commands::Build { variant, payload } => {
            let result = match (variant, payload) {
                (Some(id), _) => pipeline.build_variant(&id),
                (None, Some(payload)) => {
                    let record: VariantRecord = match serde_json::from_str(&payload) {
                        Ok(r) => r,
                        Err(e) => {
                            fail(&format!("Invalid payload: {}", e));
                            return ExitCode::FAILURE;
                        }
                    };
                    pipeline.build_record(&record)
                }
                (None, None) => {
                    fail("either --variant or --payload is required");
                    return ExitCode::FAILURE;
                }
            };

            match result {
                Ok(part) => emit(&serde_json::json!({ "success": true, "part": part })),
                Err(e) => {
                    emit(&serde_json::json!({
                        "success": false,
                        "kind": e.kind(),
                        "error": e.to_string(),
                    }));
                    ExitCode::from(2)
                }
            }
        }

        Commands::Batch { variants, out } => {
            let report = if variants.is_empty() {
                pipeline.build_all()
            } else {
                let ids: Vec<VariantId> = variants;
                pipeline.build_batch(&ids)
            };

            if let Some(dir) = out {
                if let Err(e) = write_parts(&dir, &report.built) {
                    fail(&format!("Failed to write parts to {}: {}", dir.display(), e));
                    return ExitCode::FAILURE;
                }
            }

            let code = emit(&report);
            if report.is_success() { code } else { ExitCode::from(2) }
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_level = if std::env::var_os("DEBUG").is_some() { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("caseparts_core={0},caseparts_cli={0}", default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn write_parts(dir: &Path, parts: &[caseparts_core::BuiltPart]) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    for part in parts {
        let path = dir.join(format!("{}.json", part.part.part_no));
        let json = serde_json::to_string_pretty(part)?;
        fs::write(&path, json)?;
        tracing::debug!(path = %path.display(), "wrote part");
    }
    Ok(())
}

fn emit<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            fail(&format!("Failed to serialize output: {}", e));
            ExitCode::FAILURE
        }
    }
}

fn fail(message: &str) {
    println!("{}", serde_json::json!({ "success": false, "error": message }));
}
