//! Surrogate data preparation CLI
//!
//! Command-line interface for preparing, clustering and inspecting
//! simulation tables.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::export::ArtifactWriter;
use crate::pipeline::{PipelineConfig, PrepPipeline};
use crate::training::{evaluate, ClusterSelection, Clusterer, ClusteringConfig, MeanBaseline, NOISE};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn field(key: &str, val: impl std::fmt::Display) {
    println!("  {:<14} {}", muted(key), val.to_string().white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "surrogate-prep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Data preparation for equation surrogate models")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load, cluster, split and scale one equation's table and write artifacts
    Prepare(PrepareArgs),

    /// Cluster a table's outputs and print the per-label sizes
    Cluster {
        /// Source CSV file
        #[arg(short, long)]
        source: PathBuf,

        /// Number of leading input columns
        #[arg(short, long)]
        inputs: usize,

        /// Number of output columns (default: all remaining)
        #[arg(short, long)]
        outputs: Option<usize>,

        /// Neighbourhood radius in standardized output space
        #[arg(long, default_value = "5.0")]
        eps: f64,

        /// Neighbours (self included) needed for a core point
        #[arg(long, default_value = "5")]
        min_samples: usize,
    },

    /// Show size and header of a CSV file
    Info {
        /// Source CSV file
        #[arg(short, long)]
        source: PathBuf,
    },
}

/// Flags of the `prepare` subcommand. Flags override values from `--config`.
#[derive(clap::Args, Debug, Default)]
pub struct PrepareArgs {
    /// Pipeline configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Equation identifier, used to name artifacts
    #[arg(short, long)]
    pub equation: Option<String>,

    /// Directory that receives artifacts
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,

    /// Number of leading input columns
    #[arg(short, long)]
    pub inputs: Option<usize>,

    /// Number of output columns (default: all remaining)
    #[arg(short, long)]
    pub outputs: Option<usize>,

    /// Source CSV file
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    #[arg(long)]
    pub eps: Option<f64>,

    #[arg(long)]
    pub min_samples: Option<usize>,

    /// Cluster label to keep
    #[arg(long, conflicts_with = "largest_cluster")]
    pub cluster: Option<i64>,

    /// Keep the largest non-noise cluster
    #[arg(long)]
    pub largest_cluster: bool,

    /// Keep every row
    #[arg(long, conflicts_with_all = ["cluster", "largest_cluster", "eps", "min_samples"])]
    pub no_cluster: bool,

    #[arg(long)]
    pub test_fraction: Option<f64>,

    /// Seed for the row shuffle (default: entropy)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep file order when splitting
    #[arg(long)]
    pub no_shuffle: bool,

    /// Fit and score the mean baseline on the prepared split
    #[arg(long)]
    pub baseline: bool,
}

impl PrepareArgs {
    /// Build the pipeline configuration from the config file and flags
    pub fn to_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => {
                let (Some(equation), Some(workdir), Some(inputs), Some(source)) =
                    (&self.equation, &self.workdir, self.inputs, &self.source)
                else {
                    anyhow::bail!(
                        "--equation, --workdir, --inputs and --source are required without --config"
                    );
                };
                PipelineConfig::new(equation.clone(), workdir.clone(), inputs, source.clone())
            }
        };

        if let Some(equation) = &self.equation {
            config.equation = equation.clone();
        }
        if let Some(workdir) = &self.workdir {
            config.workdir = workdir.clone();
        }
        if let Some(inputs) = self.inputs {
            config.n_inputs = inputs;
        }
        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        if self.outputs.is_some() {
            config.n_outputs = self.outputs;
        }

        if self.no_cluster {
            config.clustering = None;
        } else if self.eps.is_some()
            || self.min_samples.is_some()
            || self.cluster.is_some()
            || self.largest_cluster
        {
            let mut clustering = config.clustering.take().unwrap_or_default();
            if let Some(eps) = self.eps {
                clustering.eps = eps;
            }
            if let Some(min_samples) = self.min_samples {
                clustering.min_samples = min_samples;
            }
            if let Some(label) = self.cluster {
                clustering.selection = ClusterSelection::Label(label);
            }
            if self.largest_cluster {
                clustering.selection = ClusterSelection::Largest;
            }
            config.clustering = Some(clustering);
        }

        if let Some(test_fraction) = self.test_fraction {
            config.split.test_fraction = test_fraction;
        }
        if let Some(seed) = self.seed {
            config.split.seed = Some(seed);
        }
        if self.no_shuffle {
            config.split.shuffle = false;
        }

        config.validate()?;
        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_prepare(args: &PrepareArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;
    section(&format!("Prepare · equation {}", config.equation));

    step_run("Running pipeline");
    let start = Instant::now();
    let prepared = PrepPipeline::new(config.clone()).run()?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    field("Source", config.source.display());
    field(
        "Table",
        format!(
            "{} rows · {} inputs · {} outputs",
            prepared.table.n_rows(),
            prepared.table.n_inputs(),
            prepared.table.n_outputs()
        ),
    );
    match (&prepared.assignment, prepared.selected_label) {
        (Some(assignment), Some(label)) => {
            field("Clusters", assignment.n_clusters());
            field("Noise", assignment.noise().len());
            field("Selected", format!("label {} · {} rows", label, prepared.selected_rows.len()));
        }
        _ => field("Selected", format!("all {} rows", prepared.selected_rows.len())),
    }
    field(
        "Split",
        format!("{} train · {} test", prepared.split.n_train(), prepared.split.n_test()),
    );
    println!();

    step_run(&format!("Writing artifacts → {}", config.workdir.display()));
    let writer = ArtifactWriter::from_config(&config);
    let paths = writer.write(&prepared, &config)?;
    step_done(&format!("{}", file_name(&paths.manifest)));

    if args.baseline {
        step_run("Scoring mean baseline");
        let mut model = MeanBaseline::new();
        let report = evaluate(&mut model, &prepared.split)?;
        step_done(&format!("{:.3}s", report.training_time_secs));
        let report_path = writer.write_report(&report)?;

        println!();
        println!("  {:<16} {}", muted("MAE (scaled)"), format!("{:.6}", report.scaled.mae).white().bold());
        println!("  {:<16} {}", muted("RMSE (scaled)"), format!("{:.6}", report.scaled.rmse).white());
        println!("  {:<16} {}", muted("MAE"), format!("{:.6}", report.original.mae).white());
        println!("  {:<16} {}", muted("R²"), format!("{:.4}", report.original.r2).white());
        println!("  {:<16} {}", muted("Report"), file_name(&report_path).white());
    }

    println!();
    Ok(())
}

pub fn cmd_cluster(
    source: &Path,
    inputs: usize,
    outputs: Option<usize>,
    eps: f64,
    min_samples: usize,
) -> anyhow::Result<()> {
    section("Cluster");

    step_run("Loading data");
    let table = DataLoader::new().load_table(source, inputs, outputs)?;
    step_done(&format!("{} rows × {} outputs", table.n_rows(), table.n_outputs()));

    let config = ClusteringConfig::new().with_eps(eps).with_min_samples(min_samples);
    step_run(&format!("DBSCAN eps={} min_samples={}", eps, min_samples));
    let start = Instant::now();
    let assignment = Clusterer::new(config).cluster(&table.outputs())?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!("  {:<10} {:>8} {:>8}", muted("Label"), muted("Rows"), muted("Share"));
    println!("  {}", dim(&"─".repeat(28)));
    let n = assignment.n_rows().max(1) as f64;
    for (label, size) in assignment.sizes() {
        let name = if label == NOISE { "noise".to_string() } else { label.to_string() };
        println!("  {:<10} {:>8} {:>7.1}%", name, size, 100.0 * size as f64 / n);
    }
    if let Some(label) = assignment.largest() {
        println!();
        field("Largest", label);
    }

    println!();
    Ok(())
}

pub fn cmd_info(source: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let info = DataLoader::new().get_file_info(source)?;

    field("File", info.path.display());
    field("Size", format!("{:.2} MB", info.file_size as f64 / 1024.0 / 1024.0));
    field("Rows", info.n_rows);
    field("Columns", info.n_cols);
    println!();

    println!("  {:<6} {}", muted("#"), muted("Column"));
    println!("  {}", dim(&"─".repeat(30)));
    for (i, name) in info.columns.iter().enumerate() {
        println!("  {:<6} {}", i, name);
    }

    println!();
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_without_config() {
        let cli = Cli::try_parse_from([
            "surrogate-prep", "prepare", "--equation", "1403", "--workdir", "/tmp/w",
            "--inputs", "16", "--source", "/tmp/eq.csv", "--largest-cluster", "--seed", "4",
        ])
        .unwrap();
        let Commands::Prepare(args) = cli.command else { panic!("expected prepare") };

        let config = args.to_config().unwrap();
        assert_eq!(config.equation, "1403");
        assert_eq!(config.n_inputs, 16);
        assert_eq!(config.split.seed, Some(4));
        assert_eq!(config.clustering.unwrap().selection, ClusterSelection::Largest);
    }

    #[test]
    fn test_missing_required_flags() {
        let args = PrepareArgs {
            equation: Some("1".to_string()),
            ..Default::default()
        };
        assert!(args.to_config().is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"equation": "9", "workdir": "w", "source": "s.csv", "n_inputs": 3,
                "split": {{"test_fraction": 0.25}}}}"#
        )
        .unwrap();

        let args = PrepareArgs {
            config: Some(path),
            inputs: Some(4),
            no_cluster: true,
            no_shuffle: true,
            ..Default::default()
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.equation, "9");
        assert_eq!(config.n_inputs, 4);
        assert_eq!(config.split.test_fraction, 0.25);
        assert!(!config.split.shuffle);
        assert!(config.clustering.is_none());
    }

    #[test]
    fn test_conflicting_selection_flags() {
        let parsed = Cli::try_parse_from([
            "surrogate-prep", "prepare", "--config", "c.json", "--cluster", "1", "--largest-cluster",
        ]);
        assert!(parsed.is_err());
    }
}
