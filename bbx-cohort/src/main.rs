//! bbx-cohort - Cohort selection over a unified table
//!
//! `ancestry`: unified table -> subject ids of the ancestry cohort
//! `select`:   unified table -> table restricted to an instance and to
//!             subjects with the requested fields populated
//! `describe`: unified table -> per-field column inventory (JSON)

use anyhow::{Context, Result};
use bbx_cohort::describe::describe;
use bbx_cohort::filtering::{filter_instance, fully_populated, partially_populated};
use bbx_cohort::{AncestryConfig, AncestryFilter, MedoidStrategy};
use bbx_common::config::{load_config, TomlConfig};
use bbx_common::dictionary::FieldDictionary;
use bbx_common::fields::write_subject_list;
use bbx_common::{UnifiedTable, Warning};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};

/// Command-line arguments for bbx-cohort
#[derive(Parser, Debug)]
#[command(name = "bbx-cohort")]
#[command(about = "Select cohorts from a unified biobank table")]
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
    /// Subjects of consistent target ethnicity close to its genetic medoid
    Ancestry {
        /// Unified table (CSV)
        raw_data: PathBuf,

        /// Text file to write the resulting subject ids
        #[arg(default_value = "eu_eids.txt")]
        out_file: PathBuf,

        /// Distance to the medoid below which subjects are kept
        #[arg(long)]
        threshold: Option<f64>,

        /// Number of principal components used for distances
        #[arg(long)]
        components: Option<usize>,

        /// Ethnic background code of the reference group
        #[arg(long)]
        target_category: Option<String>,

        /// Medoid algorithm: full-matrix or memory-efficient
        #[arg(long)]
        medoid: Option<MedoidStrategy>,
    },

    /// Restrict the table to one instance and to populated subjects
    Select {
        /// Unified table (CSV)
        raw_data: PathBuf,

        /// CSV file to write the selected table
        out_file: PathBuf,

        /// Fields that must be populated
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Keep only the columns of this instance
        #[arg(long)]
        instance: Option<String>,

        /// Whether all or any of the fields' columns must have a value
        #[arg(long, value_enum, default_value_t = Require::All)]
        require: Require,
    },

    /// Per-field column inventory as JSON on stdout
    Describe {
        /// Unified table (CSV)
        raw_data: PathBuf,

        /// Data dictionary (tab-separated, FieldID and ValueType columns)
        #[arg(long)]
        dictionary: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Require {
    All,
    Any,
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
        "Starting bbx-cohort v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match args.command {
        Command::Ancestry {
            raw_data,
            out_file,
            threshold,
            components,
            target_category,
            medoid,
        } => {
            let mut settings = AncestryConfig::from_settings(&config.cohort)?;
            if let Some(v) = threshold {
                settings.threshold = v;
            }
            if let Some(v) = components {
                settings.components = v;
            }
            if let Some(v) = target_category {
                settings.target_category = v;
            }
            if let Some(v) = medoid {
                settings.strategy = v;
            }

            info!("Loading raw data from {}", raw_data.display());
            let fields = [
                settings.ethnicity_field.as_str(),
                settings.feature_field.as_str(),
            ];
            let table = UnifiedTable::read_csv(&raw_data, Some(fields.as_slice()))
                .with_context(|| format!("Failed to load {}", raw_data.display()))?;
            info!("Loaded {} subjects", table.len());

            let outcome = AncestryFilter::new(settings).run(&table)?;
            report(&outcome.warnings);
            let outcome = outcome.value;
            info!(
                "Reference group of {} subjects, medoid subject {}",
                outcome.reference_size, outcome.medoid_subject
            );

            info!("Saving {} subject ids to {}", outcome.cohort.len(), out_file.display());
            write_subject_list(&out_file, &outcome.cohort)
                .with_context(|| format!("Failed to write {}", out_file.display()))?;
        }
        Command::Select {
            raw_data,
            out_file,
            fields,
            instance,
            require,
        } => {
            let mut table = UnifiedTable::read_csv(&raw_data, None)
                .with_context(|| format!("Failed to load {}", raw_data.display()))?;
            if let Some(instance) = instance {
                let filtered = filter_instance(&table, &instance);
                report(&filtered.warnings);
                table = filtered.value;
            }

            let field_ids: Vec<&str> = fields.iter().map(String::as_str).collect();
            let subjects = match require {
                Require::All => fully_populated(&table, &field_ids),
                Require::Any => partially_populated(&table, &field_ids),
            };
            info!("{} of {} subjects selected", subjects.len(), table.len());

            table
                .retain_subjects(&subjects)
                .write_csv(&out_file)
                .with_context(|| format!("Failed to write {}", out_file.display()))?;
        }
        Command::Describe {
            raw_data,
            dictionary,
        } => {
            let dictionary = dictionary
                .map(|path| {
                    FieldDictionary::load(&path)
                        .with_context(|| format!("Failed to load dictionary {}", path.display()))
                })
                .transpose()?;
            let table = UnifiedTable::read_csv(&raw_data, None)
                .with_context(|| format!("Failed to load {}", raw_data.display()))?;

            let described = describe(&table, dictionary.as_ref());
            report(&described.warnings);
            println!("{}", serde_json::to_string_pretty(&described.value)?);
        }
    }

    Ok(())
}
