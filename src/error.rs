use thiserror::Error;

/// Errors raised while configuring a run or assembling the network model.
///
/// Infeasibility and non-optimal solver statuses are not errors, they are
/// reported through [`crate::datastructures::OptimizationOutcome`].
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("unknown optimization model `{0}` (expected averageUtilization, maxUtilization or squaredUtilization)")]
    UnknownVariant(String),
    #[error("unknown solver backend `{0}` (expected clarabel or gurobi)")]
    UnknownBackend(String),
    #[error("solver backend `{0}` is not available in this build")]
    BackendUnavailable(String),
    #[error("network has {links} links and {flows} flows, at least one of each is required")]
    EmptyNetwork { links: usize, flows: usize },
    #[error("link {0} has non-positive capacity {1}")]
    NonPositiveCapacity(String, f64),
    #[error("link {0} is defined twice")]
    DuplicateLink(String),
    #[error("flow {flow} has an invalid path {path:?}")]
    InvalidPath { flow: String, path: Vec<String> },
    #[error("flow {0} has no candidate paths")]
    FlowWithoutPaths(String),
    #[error("no traffic demand for flow {0}")]
    MissingDemand(String),
    #[error("flow {0} has negative traffic demand {1}")]
    NegativeDemand(String, f64),
}
