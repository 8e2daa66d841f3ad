use core::fmt;
use std::{fs, path::PathBuf, str::FromStr};

use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{csv_parser::Timestamp, error::ModelError};

/// The three interchangeable objectives of the split-ratio problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OptimizationVariant {
    /// Minimize the sum of per-link utilization divided by capacity.
    AverageUtilization,
    /// Minimize the utilization of the most loaded link.
    MaxUtilization,
    /// Minimize the sum of squared per-link utilization.
    SquaredUtilization,
}

impl OptimizationVariant {
    /// All variants, in declaration order.
    pub const ALL: [OptimizationVariant; 3] = [
        OptimizationVariant::AverageUtilization,
        OptimizationVariant::MaxUtilization,
        OptimizationVariant::SquaredUtilization,
    ];

    /// The name used in configuration files and LP file names.
    pub fn name(&self) -> &'static str {
        match self {
            OptimizationVariant::AverageUtilization => "averageUtilization",
            OptimizationVariant::MaxUtilization => "maxUtilization",
            OptimizationVariant::SquaredUtilization => "squaredUtilization",
        }
    }
}

impl FromStr for OptimizationVariant {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptimizationVariant::ALL
            .into_iter()
            .find(|variant| variant.name() == s)
            .ok_or_else(|| ModelError::UnknownVariant(s.to_string()))
    }
}

impl TryFrom<String> for OptimizationVariant {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptimizationVariant> for String {
    fn from(variant: OptimizationVariant) -> Self {
        variant.name().to_string()
    }
}

impl fmt::Display for OptimizationVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which optimization engine solves the formulated problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pure Rust interior point solver, always available.
    #[default]
    Clarabel,
    /// Gurobi through `grb`, requires the `gurobi` feature and a license.
    Gurobi,
}

impl FromStr for BackendKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clarabel" => Ok(BackendKind::Clarabel),
            "gurobi" => Ok(BackendKind::Gurobi),
            _ => Err(ModelError::UnknownBackend(s.to_string())),
        }
    }
}

/// Links at or above this utilization, in percent, are reported.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 10.0;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub dataset_path: PathBuf,
    pub day: u32,
    #[serde(default = "default_links_file")]
    pub links_file: String,
    /// Only optimize these timestamps, all of them if empty
    #[serde(default)]
    pub timestamps: Vec<Timestamp>,
    pub out_dir: PathBuf,
    pub model: OptimizationVariant,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_significance_threshold")]
    pub significance_threshold: f64,
    #[serde(default = "default_write_lp")]
    pub write_lp: bool,
    #[serde(default = "default_gurobi_log_file")]
    pub gurobi_log_file: PathBuf,
}

impl Config {
    pub fn from_cli(args: &Args) -> Result<Config> {
        let config_str = fs::read_to_string(&args.config)?;
        let mut config: Config = serde_json::from_str(&config_str)?;
        if let Some(dataset_path) = &args.dataset_path {
            config.dataset_path = dataset_path.to_path_buf();
        }
        if let Some(day) = args.day {
            config.day = day;
        }
        if let Some(timestamps) = &args.timestamps {
            config.timestamps = timestamps.to_vec();
        }
        if let Some(out_dir) = &args.out_dir {
            config.out_dir = out_dir.to_path_buf();
        }
        if let Some(model) = &args.model {
            config.model = model.parse()?;
        }
        if let Some(backend) = &args.backend {
            config.backend = backend.parse()?;
        }
        if let Some(threshold) = args.significance_threshold {
            config.significance_threshold = threshold;
        }
        if args.no_lp {
            config.write_lp = false;
        }
        Ok(config)
    }

    pub fn flow_paths_file(&self) -> PathBuf {
        self.dataset_path
            .join(format!("flow-path-day{}.csv", self.day))
    }

    pub fn flow_traffic_file(&self) -> PathBuf {
        self.dataset_path
            .join(format!("flow-traffic-day{}.csv", self.day))
    }

    pub fn links_path(&self) -> PathBuf {
        self.dataset_path.join(&self.links_file)
    }
}

fn default_links_file() -> String {
    "links.csv.gz".to_string()
}

fn default_significance_threshold() -> f64 {
    DEFAULT_SIGNIFICANCE_THRESHOLD
}

fn default_write_lp() -> bool {
    true
}

fn default_gurobi_log_file() -> PathBuf {
    PathBuf::from("gurobi.log")
}

#[derive(Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Path to the json config
    #[arg(short, long)]
    pub config: PathBuf,
    /// Directory containing the flow, traffic and link csv files
    #[arg(short = 'p', long, value_name = "DIR")]
    pub dataset_path: Option<PathBuf>,
    /// Day of the dataset to read
    #[arg(short, long)]
    pub day: Option<u32>,
    /// Only optimize the given timestamps
    #[arg(short, long, value_delimiter = ' ', num_args = 0..)]
    pub timestamps: Option<Vec<Timestamp>>,
    /// Path to the output directory
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
    /// Optimization model: averageUtilization, maxUtilization or squaredUtilization
    #[arg(short, long)]
    pub model: Option<String>,
    /// Solver backend: clarabel or gurobi
    #[arg(short, long)]
    pub backend: Option<String>,
    /// Log links whose utilization (in percent) reaches this value
    #[arg(short, long)]
    pub significance_threshold: Option<f64>,
    /// Do not write the formulated problem to an LP file
    #[arg(long)]
    pub no_lp: bool,
    #[command(flatten)]
    pub verbosity: Verbosity,
}

/// Realized utilization of one link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkUtilization {
    pub link: String,
    pub traffic: f64,
    pub capacity: f64,
    /// Traffic over capacity, in percent
    pub utilization: f64,
}

/// Solved split of one flow over its candidate paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRatios {
    pub flow: String,
    /// Fraction of the flow routed over each path, in path order
    pub ratios: Vec<f64>,
}

/// Everything extracted from an optimal solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub variant: OptimizationVariant,
    pub objective_value: f64,
    /// Utilization summary derived from the objective, where it has one
    pub objective_utilization: Option<f64>,
    /// Solved value of the max utilization variable (fraction, not percent)
    pub max_utilization: Option<f64>,
    /// Mean of the recomputed per-link utilization, in percent
    pub average_utilization: f64,
    pub link_utilization: Vec<LinkUtilization>,
    pub flow_ratios: Vec<FlowRatios>,
}

impl OptimizationReport {
    /// Links whose utilization reaches `threshold` percent.
    pub fn significant_links(
        &self,
        threshold: f64,
    ) -> impl Iterator<Item = &LinkUtilization> {
        self.link_utilization
            .iter()
            .filter(move |l| l.utilization >= threshold)
    }

    /// The link with the highest recomputed utilization.
    pub fn most_utilized_link(&self) -> Option<&LinkUtilization> {
        self.link_utilization
            .iter()
            .max_by(|a, b| a.utilization.total_cmp(&b.utilization))
    }
}

impl fmt::Display for OptimizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for FlowRatios { flow, ratios } in &self.flow_ratios {
            writeln!(
                f,
                "{}: {}",
                flow,
                ratios.iter().map(|r| format!("{:.2}%", r * 100.0)).join(" ")
            )?;
        }
        write!(
            f,
            "Average link utilization: {}% for model {}",
            self.average_utilization, self.variant
        )
    }
}

/// Terminal outcome of one formulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptimizationOutcome {
    Optimal(OptimizationReport),
    /// Names of an irreducible set of constraints that cannot hold together
    Infeasible { conflicting_constraints: Vec<String> },
    /// The solver stopped with a status other than optimal or infeasible
    Failed { status_code: i32, status: String },
}

impl OptimizationOutcome {
    pub fn report(&self) -> Option<&OptimizationReport> {
        match self {
            OptimizationOutcome::Optimal(report) => Some(report),
            _ => None,
        }
    }
}
