//! bbx-baskets - Basket resolution and merge tool
//!
//! `resolve`: field list + project id -> field-to-basket mapping (JSON)
//! `merge`:   field-to-basket mapping -> unified table (CSV)

use anyhow::{Context, Result};
use bbx_baskets::{merge, resolve, FieldToBasket};
use bbx_common::config::{load_config, resolve_basket_root, TomlConfig};
use bbx_common::fields::read_field_list;
use bbx_common::Warning;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

/// Command-line arguments for bbx-baskets
#[derive(Parser, Debug)]
#[command(name = "bbx-baskets")]
#[command(about = "Resolve and merge biobank extract baskets")]
#[command(version)]
struct Args {
    /// Config file (defaults to BBX_CONFIG, then the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the most recent basket of a project for each field
    Resolve {
        /// Folder containing the baskets
        #[arg(long, env = "BBX_BASKET_ROOT")]
        basket_root: Option<PathBuf>,

        /// Project id (falls back to project_id in the config file)
        #[arg(long)]
        project_id: Option<String>,

        /// Text file containing the fields, one per line
        field_list: PathBuf,

        /// JSON file to write the field-to-basket mapping
        #[arg(default_value = "field_to_basket.json")]
        out_file: PathBuf,
    },

    /// Build the unified table from a field-to-basket mapping
    Merge {
        /// Folder containing the baskets
        #[arg(long, env = "BBX_BASKET_ROOT")]
        basket_root: Option<PathBuf>,

        /// JSON file containing the field-to-basket mapping
        mapping_file: PathBuf,

        /// CSV file to write the resulting table
        #[arg(default_value = "raw_data.csv")]
        out_file: PathBuf,
    },
}

fn init_tracing(config: &TomlConfig) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .init();
}

fn report(warnings: &[Warning]) {
    for w in warnings {
        warn!("{}", w);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config);

    info!(
        "Starting bbx-baskets v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match args.command {
        Command::Resolve {
            basket_root,
            project_id,
            field_list,
            out_file,
        } => {
            let root = resolve_basket_root(basket_root.as_deref(), &config)?;
            let project_id = project_id
                .or_else(|| config.project_id.clone())
                .context("Project id not given on the command line or in the config file")?;

            info!("Retrieving fields from {}", field_list.display());
            let fields = read_field_list(&field_list)
                .with_context(|| format!("Failed to read field list {}", field_list.display()))?;

            let resolved = resolve(&root, &project_id, &fields)?;
            report(&resolved.warnings);

            info!("Saving the baskets in {}", out_file.display());
            resolved
                .value
                .save(&out_file)
                .with_context(|| format!("Failed to write {}", out_file.display()))?;
        }
        Command::Merge {
            basket_root,
            mapping_file,
            out_file,
        } => {
            let root = resolve_basket_root(basket_root.as_deref(), &config)?;
            let mapping = FieldToBasket::load(&mapping_file)
                .with_context(|| format!("Failed to load mapping {}", mapping_file.display()))?;

            info!("Creating data from {} baskets", mapping.by_basket().len());
            let merged = merge(&root, &mapping)?;
            report(&merged.warnings);

            info!("Saving data to {}", out_file.display());
            merged
                .value
                .write_csv(&out_file)
                .with_context(|| format!("Failed to write {}", out_file.display()))?;
            info!("Data saved successfully");
        }
    }

    Ok(())
}
