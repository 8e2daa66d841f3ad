use clap::Parser;
use itertools::Itertools;
use polars::prelude::*;
use std::{fs, path::Path, path::PathBuf};

use anyhow::Result;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use split_ratio_optimizer::datastructures::{
    BackendKind, Config, OptimizationVariant, DEFAULT_SIGNIFICANCE_THRESHOLD,
};

#[derive(Serialize, Deserialize, Debug, Clone)]
struct DistributionConfig {
    mean: f64,
    /// Relative to the mean
    std: f64,
}

/// Sources reach destinations through a layer of hubs, so every
/// source-destination pair has one two-hop candidate path per hub.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct DataGeneratorConfig {
    num_sources: usize,
    num_hubs: usize,
    num_destinations: usize,
    paths_per_flow: usize,
    capacity: DistributionConfig,
    traffic: DistributionConfig,
    num_timestamps: usize,
    start_timestamp: u64,
    interval: u64,
    day: u32,
    seed: u64,
    out_path: PathBuf,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the json config
    #[arg(short, long)]
    pub config: PathBuf,
}

struct GeneratedData {
    links: DataFrame,
    flow_paths: DataFrame,
    flow_traffic: DataFrame,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config: DataGeneratorConfig =
        serde_json::from_str(&fs::read_to_string(args.config)?)?;
    let out_path = config.out_path.clone();
    let day = config.day;
    let data = generate_data(&config)?;
    write_data(data, &out_path, day)?;
    Ok(())
}

fn node_name(prefix: char, i: usize) -> String {
    format!("{prefix}{i:04}")
}

fn sample(
    rng: &mut ChaCha8Rng,
    DistributionConfig { mean, std }: &DistributionConfig,
    n: usize,
) -> Result<Vec<f64>> {
    let distrib = Normal::new(*mean, (*mean * *std).abs())?;
    Ok(distrib
        .sample_iter(rng)
        .map(|v: f64| v.abs().max(f64::EPSILON))
        .take(n)
        .collect())
}

fn generate_data(config: &DataGeneratorConfig) -> Result<GeneratedData> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let sources = (0..config.num_sources).map(|i| node_name('S', i)).collect_vec();
    let hubs = (0..config.num_hubs).map(|i| node_name('H', i)).collect_vec();
    let destinations = (0..config.num_destinations)
        .map(|i| node_name('D', i))
        .collect_vec();

    let link_pairs = sources
        .iter()
        .cartesian_product(&hubs)
        .chain(hubs.iter().cartesian_product(&destinations))
        .collect_vec();
    let capacities = sample(&mut rng, &config.capacity, link_pairs.len())?;
    let links = df! {
        "linkStart" => link_pairs.iter().map(|(a, _)| a.to_string()).collect_vec(),
        "linkEnd" => link_pairs.iter().map(|(_, b)| b.to_string()).collect_vec(),
        "capacity" => capacities,
    }?;

    let paths_per_flow = config.paths_per_flow.min(config.num_hubs);
    let flows = sources
        .iter()
        .cartesian_product(&destinations)
        .map(|(s, d)| {
            let paths = hubs
                .choose_multiple(&mut rng, paths_per_flow)
                .map(|h| format!("[{s};{h};{d}]"))
                .collect_vec();
            (s, d, paths)
        })
        .collect_vec();
    let timestamps = (0..config.num_timestamps as u64)
        .map(|t| config.start_timestamp + t * config.interval)
        .collect_vec();

    let path_rows = timestamps
        .iter()
        .flat_map(|&t| {
            flows.iter().flat_map(move |(s, d, paths)| {
                paths.iter().map(move |p| (t, *s, *d, p))
            })
        })
        .collect_vec();
    let flow_paths = df! {
        "timestamp" => path_rows.iter().map(|r| r.0).collect_vec(),
        "pathStart" => path_rows.iter().map(|r| r.1.to_string()).collect_vec(),
        "pathEnd" => path_rows.iter().map(|r| r.2.to_string()).collect_vec(),
        "path" => path_rows.iter().map(|r| r.3.to_string()).collect_vec(),
    }?;

    let traffic_rows = timestamps
        .iter()
        .cartesian_product(&flows)
        .map(|(&t, (s, d, _))| (t, *s, *d))
        .collect_vec();
    let volumes = sample(&mut rng, &config.traffic, traffic_rows.len())?;
    let flow_traffic = df! {
        "timestamp" => traffic_rows.iter().map(|r| r.0).collect_vec(),
        "flowStart" => traffic_rows.iter().map(|r| r.1.to_string()).collect_vec(),
        "flowEnd" => traffic_rows.iter().map(|r| r.2.to_string()).collect_vec(),
        "traffic" => volumes,
    }?;

    Ok(GeneratedData {
        links,
        flow_paths,
        flow_traffic,
    })
}

fn write_csv(df: &mut DataFrame, path: PathBuf, header: bool) -> Result<()> {
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file).has_header(header).finish(df)?;
    Ok(())
}

fn write_data(data: GeneratedData, out_path: &Path, day: u32) -> Result<()> {
    let GeneratedData {
        mut links,
        mut flow_paths,
        mut flow_traffic,
    } = data;
    fs::create_dir_all(out_path)?;
    write_csv(&mut links, out_path.join("links.csv"), true)?;
    write_csv(
        &mut flow_paths,
        out_path.join(format!("flow-path-day{day}.csv")),
        false,
    )?;
    write_csv(
        &mut flow_traffic,
        out_path.join(format!("flow-traffic-day{day}.csv")),
        false,
    )?;
    serde_json::to_writer_pretty(
        fs::File::create(out_path.join("config.json"))?,
        &optimizer_config(out_path, day),
    )?;
    Ok(())
}

/// Optimizer config for the generated dataset. Links are written as plain
/// csv, so the compressed default of `links_file` is overridden.
fn optimizer_config(out_path: &Path, day: u32) -> Config {
    Config {
        dataset_path: out_path.to_path_buf(),
        day,
        links_file: "links.csv".to_string(),
        timestamps: vec![],
        out_dir: out_path.join("results"),
        model: OptimizationVariant::MaxUtilization,
        backend: BackendKind::default(),
        significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
        write_lp: true,
        gurobi_log_file: PathBuf::from("gurobi.log"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::{generate_data, write_data, DataGeneratorConfig, DistributionConfig};
    use split_ratio_optimizer::{
        csv_parser::{self, Dataset},
        datastructures::Config,
    };

    fn config(out_path: PathBuf) -> DataGeneratorConfig {
        DataGeneratorConfig {
            num_sources: 3,
            num_hubs: 4,
            num_destinations: 2,
            paths_per_flow: 2,
            capacity: DistributionConfig {
                mean: 1000.0,
                std: 0.1,
            },
            traffic: DistributionConfig {
                mean: 50.0,
                std: 0.2,
            },
            num_timestamps: 2,
            start_timestamp: 1000,
            interval: 300,
            day: 3,
            seed: 42,
            out_path,
        }
    }

    #[test]
    fn test_generate_data() {
        let data = generate_data(&config(PathBuf::new())).unwrap();
        // 3 * 4 + 4 * 2 links, 3 * 2 flows with 2 paths for 2 timestamps
        assert_eq!(data.links.height(), 20);
        assert_eq!(data.flow_paths.height(), 24);
        assert_eq!(data.flow_traffic.height(), 12);
    }

    #[test]
    fn test_generated_data_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().to_path_buf());
        write_data(generate_data(&config).unwrap(), dir.path(), config.day).unwrap();
        let links = csv_parser::read_links(dir.path().join("links.csv")).unwrap();
        let flows = csv_parser::read_flows(dir.path().join("flow-path-day3.csv")).unwrap();
        let traffic =
            csv_parser::read_traffic(dir.path().join("flow-traffic-day3.csv")).unwrap();
        assert_eq!(links.len(), 20);
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[&1300].len(), 6);
        assert!(flows[&1000].values().all(|paths| paths.len() == 2));
        assert_eq!(traffic[&1000].len(), 6);
    }

    #[test]
    fn test_generated_config_loads_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().to_path_buf());
        write_data(generate_data(&config).unwrap(), dir.path(), config.day).unwrap();
        let optimizer_config: Config = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("config.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(optimizer_config.links_path(), dir.path().join("links.csv"));
        let dataset = Dataset::load(&optimizer_config).unwrap();
        let network = dataset.network(1000).unwrap();
        assert_eq!(network.num_links(), 20);
        assert_eq!(network.num_flows(), 6);
    }
}
