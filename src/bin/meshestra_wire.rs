//! meshestra-wire - compile DI declaration models into generated units

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use meshestra_compiler::codegen::emit::emit_rust_source;
use meshestra_compiler::{
    Compiler, CompilerOptions, DeclarationModel, Diagnostics, GeneratedUnit, UnitResult,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "meshestra-wire")]
#[command(about = "Compile dependency injection declarations into wired units")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile components and print the generated units
    Compile {
        /// Path to a JSON declaration model
        model: PathBuf,

        /// Only compile this component
        #[arg(short, long)]
        component: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Compile components and only report diagnostics
    Check {
        /// Path to a JSON declaration model
        model: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Rust,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let options = CompilerOptions::from_env();

    match cli.command {
        Commands::Compile {
            model,
            component,
            format,
        } => {
            let model = load_model(&model)?;
            let results = compile(&model, &options, component.as_deref());
            let units = report(&results)?;
            print_units(&units, &options, format, component.is_some())
        }
        Commands::Check { model } => {
            let model = load_model(&model)?;
            let results = compile(&model, &options, None);
            let units = report(&results)?;
            println!("{} component(s) compiled cleanly", units.len());
            Ok(())
        }
    }
}

fn load_model(path: &Path) -> anyhow::Result<DeclarationModel> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read declaration model {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse declaration model {}", path.display()))
}

fn compile(
    model: &DeclarationModel,
    options: &CompilerOptions,
    component: Option<&str>,
) -> Vec<(String, UnitResult)> {
    let compiler = Compiler::with_options(model, options.clone());
    match component {
        Some(name) => vec![(name.to_string(), compiler.compile(name))],
        None => compiler.compile_all(),
    }
}

/// Print every diagnostic to stderr; fail if any component failed.
fn report(results: &[(String, UnitResult)]) -> anyhow::Result<Vec<&GeneratedUnit>> {
    let mut units = Vec::new();
    let mut failed: Vec<&Diagnostics> = Vec::new();
    for (_, result) in results {
        match result {
            Ok(unit) => units.push(unit),
            Err(diagnostics) => failed.push(diagnostics),
        }
    }

    for diagnostics in &failed {
        eprintln!("{diagnostics}");
        for error in diagnostics.iter() {
            eprintln!("  error[{}]: {}", error.kind(), error);
        }
    }
    if !failed.is_empty() {
        bail!(
            "{} of {} component(s) failed to compile",
            failed.len(),
            results.len()
        );
    }
    Ok(units)
}

fn print_units(
    units: &[&GeneratedUnit],
    options: &CompilerOptions,
    format: Format,
    single: bool,
) -> anyhow::Result<()> {
    match format {
        Format::Json => {
            let json = match units {
                [unit] if single => serde_json::to_string_pretty(unit)?,
                _ => serde_json::to_string_pretty(units)?,
            };
            println!("{json}");
        }
        Format::Rust => {
            for unit in units {
                let source = emit_rust_source(unit, options)
                    .with_context(|| format!("Failed to emit {}", unit.name))?;
                println!("// {} (component {})", unit.name, unit.component);
                println!("{source}");
            }
        }
    }
    Ok(())
}
