use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::fs;

use split_ratio_optimizer::csv_parser::{self, Dataset};
use split_ratio_optimizer::datastructures::*;
use split_ratio_optimizer::diagnostics;
use split_ratio_optimizer::solver;

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbosity.log_level_filter())
        .init();
    let config = match Config::from_cli(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {err:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    let mut backend = match solver::backend_from_config(&config) {
        Ok(backend) => backend,
        Err(err) => {
            error!("{err:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    fs::create_dir_all(&config.out_dir)?;
    info!("Started");

    let dataset = Dataset::load(&config)?;
    let mut outcomes = Vec::new();
    let mut utilization = Vec::new();
    for timestamp in dataset.timestamps(&config.timestamps) {
        info!("Optimizing timestamp {timestamp}");
        let network = dataset.network(timestamp)?;
        let lp_dir = config.write_lp.then_some(config.out_dir.as_path());
        let outcome =
            solver::optimize(&network, config.model, backend.as_mut(), lp_dir)?;
        diagnostics::log_outcome(&outcome, config.significance_threshold);
        if let Some(report) = outcome.report() {
            utilization.push((timestamp, report.link_utilization.clone()));
        }
        outcomes.push((timestamp, outcome));
    }

    csv_parser::utilization_to_csv(
        &utilization,
        config.out_dir.join("utilization.csv"),
    )?;
    serde_json::to_writer_pretty(
        fs::File::create(config.out_dir.join("summary.json"))?,
        &outcomes,
    )?;
    info!("Finished {} timestamps", outcomes.len());
    Ok(())
}
