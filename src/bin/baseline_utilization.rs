use anyhow::{Context, Result};
use log::info;
use split_ratio_optimizer::csv_parser::{self, Dataset};
use split_ratio_optimizer::datastructures::*;
use split_ratio_optimizer::diagnostics;
use std::env;
use std::fs;

/// Link utilization without optimization, every flow split evenly over its
/// candidate paths. Takes the same json config as the optimizer.
fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();
    let config_path = env::args().nth(1).context("No json config provided!")?;
    let config_str = fs::read_to_string(&config_path)
        .with_context(|| format!("Provided config file {config_path} does not exist"))?;
    let config: Config = serde_json::from_str(&config_str)
        .context("Error while reading config file")?;

    let dataset = Dataset::load(&config)?;
    let records = dataset
        .timestamps(&config.timestamps)
        .map(|timestamp| -> Result<_> {
            let network = dataset.network(timestamp)?;
            let links = diagnostics::baseline_utilization(&network);
            info!(
                "{timestamp}: average baseline link utilization {}%",
                diagnostics::average_utilization(&links)
            );
            for link in links
                .iter()
                .filter(|l| l.utilization >= config.significance_threshold)
            {
                info!("{timestamp} Link {} - {}%", link.link, link.utilization);
            }
            Ok((timestamp, links))
        })
        .collect::<Result<Vec<_>>>()?;
    csv_parser::utilization_to_csv(&records, config.out_dir.join("baseline.csv"))?;
    Ok(())
}
