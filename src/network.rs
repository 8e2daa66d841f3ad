use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;
use log::{debug, warn};
use ndarray::Array1;

use crate::error::ModelError;

/// Index of a link in [`Network::links`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub usize);

/// Index of a flow in [`Network::flows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId(pub usize);

/// One candidate path of one flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathRef {
    pub flow: FlowId,
    /// Position in [`Flow::paths`]
    pub path: usize,
}

/// A directed link between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub start: String,
    pub end: String,
    /// Traffic volume the link carries at 100% utilization
    pub capacity: f64,
}

impl Link {
    pub fn new(start: impl Into<String>, end: impl Into<String>, capacity: f64) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            capacity,
        }
    }

    /// Endpoint names concatenated, the key used in the dataset and in
    /// constraint names.
    pub fn name(&self) -> String {
        format!("{}{}", self.start, self.end)
    }
}

/// Traffic between one source and one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    /// Source and destination names concatenated
    pub name: String,
    /// Candidate paths as node sequences, each from source to destination
    pub paths: Vec<Vec<String>>,
}

impl Flow {
    pub fn new(name: impl Into<String>, paths: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            paths,
        }
    }
}

/// Immutable view of one time slice of the network: links, multi-path flows,
/// their demand and the path/link incidence used to formulate link traffic.
#[derive(Debug)]
pub struct Network {
    links: Vec<Link>,
    flows: Vec<Flow>,
    demands: Vec<f64>,
    /// For every flow and path, the links the path traverses
    path_links: Vec<Vec<Vec<LinkId>>>,
    /// For every link, the paths traversing it
    link_paths: Vec<Vec<PathRef>>,
}

impl Network {
    /// Builds the network and its incidence index. Returns an error if the
    /// inputs do not describe a network that can be optimized.
    ///
    /// Correctness properties:
    ///
    /// - There is at least one link and at least one flow.
    /// - Every link has a positive capacity and is defined once.
    /// - Every flow has at least one path, every path has at least two nodes
    ///   and does not end where it starts.
    /// - Every flow has a non-negative demand.
    pub fn new(
        links: Vec<Link>,
        flows: Vec<Flow>,
        demand: &BTreeMap<String, f64>,
    ) -> Result<Self, ModelError> {
        if links.is_empty() || flows.is_empty() {
            return Err(ModelError::EmptyNetwork {
                links: links.len(),
                flows: flows.len(),
            });
        }

        let mut link_index: HashMap<(&str, &str), LinkId> = HashMap::new();
        for (i, link) in links.iter().enumerate() {
            if !(link.capacity > 0.0) {
                return Err(ModelError::NonPositiveCapacity(
                    link.name(),
                    link.capacity,
                ));
            }
            if link_index
                .insert((link.start.as_str(), link.end.as_str()), LinkId(i))
                .is_some()
            {
                return Err(ModelError::DuplicateLink(link.name()));
            }
        }

        let mut demands = Vec::with_capacity(flows.len());
        for flow in &flows {
            if flow.paths.is_empty() {
                return Err(ModelError::FlowWithoutPaths(flow.name.clone()));
            }
            if let Some(path) = flow
                .paths
                .iter()
                .find(|p| p.len() < 2 || p.first() == p.last())
            {
                return Err(ModelError::InvalidPath {
                    flow: flow.name.clone(),
                    path: path.clone(),
                });
            }
            match demand.get(&flow.name) {
                Some(&d) if d < 0.0 => {
                    return Err(ModelError::NegativeDemand(flow.name.clone(), d))
                }
                Some(&d) => demands.push(d),
                None => return Err(ModelError::MissingDemand(flow.name.clone())),
            }
        }
        let flow_names: HashSet<&str> =
            flows.iter().map(|f| f.name.as_str()).collect();
        let unknown = demand
            .keys()
            .filter(|name| !flow_names.contains(name.as_str()))
            .count();
        if unknown > 0 {
            warn!("Ignoring traffic demand of {unknown} flows without candidate paths");
        }

        let mut unknown_hops = 0;
        let path_links = flows
            .iter()
            .map(|flow| {
                flow.paths
                    .iter()
                    .map(|path| {
                        path.iter()
                            .tuple_windows()
                            .filter_map(|(a, b)| {
                                let id = link_index.get(&(a.as_str(), b.as_str()));
                                if id.is_none() {
                                    unknown_hops += 1;
                                }
                                id.copied()
                            })
                            .unique()
                            .collect_vec()
                    })
                    .collect_vec()
            })
            .collect_vec();
        if unknown_hops > 0 {
            debug!("{unknown_hops} path hops are not links of the topology");
        }

        let mut link_paths = vec![Vec::new(); links.len()];
        for (f, paths) in path_links.iter().enumerate() {
            for (p, traversed) in paths.iter().enumerate() {
                for &LinkId(l) in traversed {
                    link_paths[l].push(PathRef {
                        flow: FlowId(f),
                        path: p,
                    });
                }
            }
        }

        Ok(Self {
            links,
            flows,
            demands,
            path_links,
            link_paths,
        })
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn num_flows(&self) -> usize {
        self.flows.len()
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn flow(&self, id: FlowId) -> &Flow {
        &self.flows[id.0]
    }

    /// Traffic volume of `id`, to be split over its paths.
    pub fn demand(&self, id: FlowId) -> f64 {
        self.demands[id.0]
    }

    pub fn link_ids(&self) -> impl Iterator<Item = LinkId> {
        (0..self.links.len()).map(LinkId)
    }

    pub fn flow_ids(&self) -> impl Iterator<Item = FlowId> {
        (0..self.flows.len()).map(FlowId)
    }

    /// Paths traversing `link`, ordered by flow and path index.
    pub fn link_paths(&self, link: LinkId) -> &[PathRef] {
        &self.link_paths[link.0]
    }

    /// Links traversed by one path, each once, in order of first traversal.
    pub fn path_links(&self, path: PathRef) -> &[LinkId] {
        &self.path_links[path.flow.0][path.path]
    }

    /// Traffic on every link when each flow is split according to `ratios`
    /// (indexed by flow, then path).
    pub fn link_traffic<R: AsRef<[f64]>>(&self, ratios: &[R]) -> Array1<f64> {
        Array1::from_iter(self.link_ids().map(|link| {
            self.link_paths(link)
                .iter()
                .map(|&PathRef { flow, path }| {
                    ratios[flow.0].as_ref()[path] * self.demand(flow)
                })
                .sum::<f64>()
        }))
    }

    /// Split ratios that spread every flow evenly over its candidate paths.
    pub fn even_split(&self) -> Vec<Vec<f64>> {
        self.flows
            .iter()
            .map(|flow| {
                let n = flow.paths.len();
                vec![1.0 / n as f64; n]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
