//! Optimize how multi-path flows are split across their candidate paths.
//!
//! For a network whose traffic between each source-destination pair may use several
//! precomputed paths, find the split ratios that minimize link utilization under link
//! capacity and flow conservation constraints. Three objectives are available, see
//! [`datastructures::OptimizationVariant`].
//!
//! The problem is formulated backend-neutrally ([`solver::problem::Problem`]) and solved by
//! any [`solver::backend::SolverBackend`]. Clarabel is always available; Gurobi is used with
//! the `gurobi` feature, which requires a Gurobi installation (9.0 or higher) and
//! [license](http://www.gurobi.com/downloads/licenses/license-center).
//! Don't forget to set the environment variable `GUROBI_HOME` to the installation path of Gurobi.
//!
//! The crate also contains executables to optimize a measured dataset, to compute the
//! non-optimized baseline utilization and to generate synthetic datasets.
//!
//! Example
//! ```rust
//! use std::collections::BTreeMap;
//! use split_ratio_optimizer::datastructures::{OptimizationOutcome, OptimizationVariant};
//! use split_ratio_optimizer::network::{Flow, Link, Network};
//! use split_ratio_optimizer::solver::{self, clarabel_backend::ClarabelBackend};
//! # use anyhow::Result;
//!
//! fn example() -> Result<()> {
//!     let links = vec![Link::new("A", "B", 600.0), Link::new("A", "C", 500.0)];
//!     let flows = vec![Flow::new(
//!         "AX",
//!         vec![vec!["A".into(), "B".into()], vec!["A".into(), "C".into()]],
//!     )];
//!     let demand = BTreeMap::from([("AX".to_string(), 100.0)]);
//!     let network = Network::new(links, flows, &demand)?;
//!
//!     let mut backend = ClarabelBackend::new()?;
//!     let outcome = solver::optimize(
//!         &network,
//!         OptimizationVariant::MaxUtilization,
//!         &mut backend,
//!         None, // optionally write the formulation to an LP file in this directory
//!     )?;
//!     if let OptimizationOutcome::Optimal(report) = outcome {
//!         println!("{report}");
//!     }
//!     Ok(())
//! }
//! ```

/// Polars based reading of the measured dataset and writing of results.
pub mod csv_parser;

/// Configuration and result types.
pub mod datastructures;

/// Result extraction and reporting.
pub mod diagnostics;

/// Typed errors of the model layer.
pub mod error;

/// The immutable network model with its path/link incidence index.
pub mod network;

/// Model builder, problem representation and solver backends.
pub mod solver;

#[cfg(test)]
mod test_utils;
