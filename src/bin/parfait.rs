//! ctrl-parfait CLI
//!
//! Inspect the taxonomy, list asset options, and export measurement tables.
//!
//! Usage:
//!   cargo run --features cli --bin parfait -- taxonomy
//!   cargo run --features cli --bin parfait -- options 1.1
//!   cargo run --features cli --bin parfait -- rows --tab assessment
//!   cargo run --features cli --bin parfait -- export --tab framework --format json --out ./exports
//!
//! Configuration is read from the environment (and a `.env` file):
//!   PARFAIT_TAXONOMY, PARFAIT_EXPORT_DIR, PARFAIT_SEED_EXAMPLES, PARFAIT_RNG_SEED

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use ctrl_parfait::{Exporter, ParfaitConfig, TabType, Workspace};

#[derive(Parser, Debug)]
#[command(name = "parfait")]
#[command(about = "CIS safeguard measurement tables", long_about = None)]
struct Args {
    /// Taxonomy YAML file (defaults to the embedded CIS Controls)
    #[arg(long, env = "PARFAIT_TAXONOMY")]
    taxonomy: Option<PathBuf>,

    /// Seed for example rows
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarise the loaded taxonomy
    Taxonomy,

    /// List the asset options for a safeguard, in picker order
    Options { safeguard: String },

    /// Print a tab's example rows as JSON
    Rows {
        #[arg(long, default_value = "framework")]
        tab: TabType,
    },

    /// Export a tab's example rows
    Export {
        #[arg(long, default_value = "framework")]
        tab: TabType,

        /// json, xlsx, pdf or pptx
        #[arg(long, default_value = "json")]
        format: String,

        /// Output directory (overrides PARFAIT_EXPORT_DIR)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ctrl_parfait=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = ParfaitConfig::from_env();
    if let Some(path) = args.taxonomy {
        config = config.taxonomy_path(path);
    }
    if let Some(seed) = args.seed {
        config = config.rng_seed(seed);
    }

    let workspace = Workspace::from_config(&config).context("Failed to load workspace")?;

    match args.command {
        Command::Taxonomy => print_taxonomy(&workspace),
        Command::Options { safeguard } => {
            let Some(found) = workspace.index().find_safeguard(&safeguard) else {
                bail!("Unknown safeguard '{}'", safeguard);
            };
            println!("{} {}", found.number, found.name);
            for option in workspace.asset_options_for(&safeguard) {
                println!("  {:<32} {}", option.id, option.display_name);
            }
        }
        Command::Rows { tab } => {
            let json = serde_json::to_string_pretty(workspace.rows(tab))
                .context("Failed to serialise rows")?;
            println!("{}", json);
        }
        Command::Export { tab, format, out } => {
            let dir = out.unwrap_or_else(|| config.export_dir.clone());
            let path = Exporter::new(dir)
                .export(&format, &workspace.snapshot(tab))
                .await
                .with_context(|| format!("Failed to export {} tab as {}", tab, format))?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn print_taxonomy(workspace: &Workspace) {
    let taxonomy = workspace.taxonomy();
    println!(
        "{} controls, {} safeguards, {} asset classes, {} subclasses",
        taxonomy.control_count(),
        taxonomy.safeguard_count(),
        taxonomy.asset_classes.len(),
        taxonomy.subclass_count()
    );
    println!("Fingerprint: {}", workspace.index().fingerprint().short());

    for group in &taxonomy.control_groups {
        println!("{}", group.name);
        for control in &group.controls {
            println!("  {}", control.label());
            for safeguard in &control.safeguards {
                println!(
                    "    {} {} ({} options)",
                    safeguard.number,
                    safeguard.name,
                    workspace.asset_options_for(&safeguard.id).len()
                );
            }
        }
    }

    let attributes: Vec<_> = workspace.attributes().iter().map(|a| a.name.as_str()).collect();
    println!("Attributes: {}", attributes.join(", "));
}
