use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use itertools::{izip, Itertools};
use log::{debug, info};
use polars::prelude::*;

use crate::{
    datastructures::{Config, LinkUtilization},
    network::{Flow, Link, Network},
};

/// Measurement time of a traffic snapshot. Integer keys keep runs in
/// chronological order.
pub type Timestamp = i64;

/// Candidate paths per flow name.
pub type FlowPaths = BTreeMap<String, Vec<Vec<String>>>;

/// All links plus flows and traffic of one day, grouped by timestamp.
#[derive(Debug, Default)]
pub struct Dataset {
    pub links: Vec<Link>,
    pub flows: BTreeMap<Timestamp, FlowPaths>,
    pub traffic: BTreeMap<Timestamp, BTreeMap<String, f64>>,
}

impl Dataset {
    pub fn load(config: &Config) -> Result<Self> {
        Ok(Self {
            links: read_links(config.links_path())?,
            flows: read_flows(config.flow_paths_file())?,
            traffic: read_traffic(config.flow_traffic_file())?,
        })
    }

    /// Timestamps that have multi-path flows, restricted to `selection`
    /// unless it is empty.
    pub fn timestamps<'a>(
        &'a self,
        selection: &'a [Timestamp],
    ) -> impl Iterator<Item = Timestamp> + 'a {
        self.flows
            .keys()
            .copied()
            .filter(move |t| selection.is_empty() || selection.contains(t))
    }

    /// The network model of one timestamp.
    pub fn network(&self, timestamp: Timestamp) -> Result<Network> {
        let flows = self
            .flows
            .get(&timestamp)
            .with_context(|| format!("No flows for timestamp {timestamp}"))?
            .iter()
            .map(|(name, paths)| Flow::new(name.clone(), paths.clone()))
            .collect_vec();
        let empty = BTreeMap::new();
        let demand = self.traffic.get(&timestamp).unwrap_or(&empty);
        Network::new(self.links.clone(), flows, demand)
            .with_context(|| format!("Invalid network for timestamp {timestamp}"))
    }
}

fn read_headerless_csv(path: &Path, columns: &[&str]) -> Result<DataFrame> {
    let mut df = CsvReader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .has_header(false)
        .finish()?;
    df.set_column_names(columns)?;
    Ok(df)
}

/// `[A;B;C]` -> `["A", "B", "C"]`
pub fn parse_path(path: &str) -> Vec<String> {
    path.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(';')
        .map(str::to_string)
        .collect()
}

fn flow_name_expr(start: &str, end: &str) -> Expr {
    concat_str(
        [
            col(start).cast(DataType::Utf8),
            col(end).cast(DataType::Utf8),
        ],
        "",
    )
    .alias("flow")
}

/// Reads a link file with a header row followed by
/// `linkStart,linkEnd,capacity` records. Gzip compressed files are supported.
pub fn read_links(path: impl AsRef<Path>) -> Result<Vec<Link>> {
    let path = path.as_ref();
    info!("Started reading links...");
    let mut df = CsvReader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .has_header(true)
        .finish()?;
    df.set_column_names(&["linkStart", "linkEnd", "capacity"])?;
    let starts = df.column("linkStart")?.cast(&DataType::Utf8)?;
    let ends = df.column("linkEnd")?.cast(&DataType::Utf8)?;
    let capacities = df.column("capacity")?.cast(&DataType::Float64)?;
    let links = izip!(
        starts.utf8()?.into_no_null_iter(),
        ends.utf8()?.into_no_null_iter(),
        capacities.f64()?.into_no_null_iter()
    )
    .map(|(start, end, capacity)| Link::new(start, end, capacity))
    .collect_vec();
    info!("Finished reading links, number of links: {}", links.len());
    Ok(links)
}

/// Reads `timestamp,pathStart,pathEnd,path` records and groups the paths by
/// timestamp and flow. Flows with a single candidate path have no split to
/// optimize and are dropped.
pub fn read_flows(path: impl AsRef<Path>) -> Result<BTreeMap<Timestamp, FlowPaths>> {
    info!("Started reading paths...");
    let df = read_headerless_csv(
        path.as_ref(),
        &["timestamp", "pathStart", "pathEnd", "path"],
    )?;
    info!("Finished reading paths, number of paths: {}", df.height());
    let grouped = df
        .lazy()
        .select([
            col("timestamp").cast(DataType::Int64),
            flow_name_expr("pathStart", "pathEnd"),
            col("path"),
        ])
        .groupby_stable([col("timestamp"), col("flow")])
        .agg([col("path")])
        .collect()?;

    let mut flows: BTreeMap<Timestamp, FlowPaths> = BTreeMap::new();
    let mut single_path_flows = 0;
    for (timestamp, flow, paths) in izip!(
        grouped.column("timestamp")?.i64()?.into_no_null_iter(),
        grouped.column("flow")?.utf8()?.into_no_null_iter(),
        grouped.column("path")?.list()?.into_iter()
    ) {
        let paths = match paths {
            Some(paths) => paths
                .utf8()?
                .into_no_null_iter()
                .map(parse_path)
                .collect_vec(),
            None => continue,
        };
        if paths.len() > 1 {
            flows
                .entry(timestamp)
                .or_default()
                .insert(flow.to_string(), paths);
        } else {
            single_path_flows += 1;
        }
    }
    debug!("Dropped {single_path_flows} single path flows");
    info!(
        "Finished grouping paths, number of timestamps: {}, number of flows: {}",
        flows.len(),
        flows.values().map(BTreeMap::len).sum::<usize>()
    );
    Ok(flows)
}

/// Reads `timestamp,flowStart,flowEnd,traffic` records. If a flow appears
/// more than once per timestamp, its first record wins.
pub fn read_traffic(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<Timestamp, BTreeMap<String, f64>>> {
    info!("Started reading traffic...");
    let df = read_headerless_csv(
        path.as_ref(),
        &["timestamp", "flowStart", "flowEnd", "traffic"],
    )?;
    info!("Finished reading traffic, number of records: {}", df.height());
    let grouped = df
        .lazy()
        .select([
            col("timestamp").cast(DataType::Int64),
            flow_name_expr("flowStart", "flowEnd"),
            col("traffic").cast(DataType::Float64),
        ])
        .groupby_stable([col("timestamp"), col("flow")])
        .agg([col("traffic").first()])
        .collect()?;

    let mut traffic: BTreeMap<Timestamp, BTreeMap<String, f64>> = BTreeMap::new();
    for (timestamp, flow, volume) in izip!(
        grouped.column("timestamp")?.i64()?.into_no_null_iter(),
        grouped.column("flow")?.utf8()?.into_no_null_iter(),
        grouped.column("traffic")?.f64()?.into_iter()
    ) {
        if let Some(volume) = volume {
            traffic
                .entry(timestamp)
                .or_default()
                .insert(flow.to_string(), volume);
        }
    }
    info!("Finished grouping traffic, number of timestamps: {}", traffic.len());
    Ok(traffic)
}

/// Writes per-link utilization of several timestamps to a single csv file.
pub fn utilization_to_csv(
    records: &[(Timestamp, Vec<LinkUtilization>)],
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let rows = records
        .iter()
        .flat_map(|(timestamp, links)| links.iter().map(move |l| (timestamp, l)))
        .collect_vec();
    let mut df = df! {
        "timestamp" => rows.iter().map(|(t, _)| **t).collect_vec(),
        "link" => rows.iter().map(|(_, l)| l.link.clone()).collect_vec(),
        "traffic" => rows.iter().map(|(_, l)| l.traffic).collect_vec(),
        "capacity" => rows.iter().map(|(_, l)| l.capacity).collect_vec(),
        "utilization" => rows.iter().map(|(_, l)| l.utilization).collect_vec(),
    }?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    info!("Writing data to file {}...", path.display());
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
    info!("Finished writing data to file");
    Ok(())
}

#[cfg(test)]
mod tests;
