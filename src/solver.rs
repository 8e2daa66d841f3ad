use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{error, info};

use crate::{
    datastructures::{BackendKind, Config, OptimizationOutcome, OptimizationVariant},
    diagnostics,
    error::ModelError,
    network::{FlowId, LinkId, Network, PathRef},
};

pub mod backend;
pub mod clarabel_backend;
#[cfg(feature = "gurobi")]
pub mod gurobi_backend;
pub mod problem;

use backend::{SolveStatus, SolverBackend};
use problem::{ConstrId, LinExpr, Objective, Problem, QuadExpr, Sense, VarId};

/// Variables that measure utilization, depending on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum UtilizationVars {
    /// One utilization variable per link, in link order
    PerLink(Vec<VarId>),
    /// A single bound on the utilization of every link
    Max(VarId),
}

/// Handles to everything registered for one formulation.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub variant: OptimizationVariant,
    /// Split ratio variables, indexed by flow then path
    pub path_ratios: Vec<Vec<VarId>>,
    pub utilization: UtilizationVars,
    /// `cap_*` constraints in link order
    pub capacity_constrs: Vec<ConstrId>,
    /// `util_*` constraints in link order
    pub utilization_constrs: Vec<ConstrId>,
    /// `traffic_split_*` constraints in flow order
    pub split_constrs: Vec<ConstrId>,
}

/// Traffic crossing `link` as a function of the split ratios:
/// `Σ ratio[f, p] * demand[f]` over the paths traversing it.
fn link_flow(network: &Network, path_ratios: &[Vec<VarId>], link: LinkId) -> LinExpr {
    network
        .link_paths(link)
        .iter()
        .map(|&PathRef { flow, path }| (path_ratios[flow.0][path], network.demand(flow)))
        .collect()
}

/// Registers the split-ratio problem for `variant` with `problem`.
pub fn formulate(
    problem: &mut Problem,
    variant: OptimizationVariant,
    network: &Network,
) -> Formulation {
    let path_ratios = network
        .flow_ids()
        .map(|f| {
            let flow = network.flow(f);
            (0..flow.paths.len())
                .map(|p| problem.add_var(format!("PathRatio_{}_{p}", flow.name)))
                .collect_vec()
        })
        .collect_vec();

    let utilization = match variant {
        OptimizationVariant::AverageUtilization
        | OptimizationVariant::SquaredUtilization => UtilizationVars::PerLink(
            network
                .links()
                .iter()
                .map(|link| problem.add_var(format!("Utilization_{}", link.name())))
                .collect(),
        ),
        OptimizationVariant::MaxUtilization => {
            UtilizationVars::Max(problem.add_var("MaxUtilization"))
        }
    };

    let objective = match (&utilization, variant) {
        (UtilizationVars::PerLink(util), OptimizationVariant::SquaredUtilization) => {
            let mut squares = QuadExpr::new();
            for &u in util {
                squares.add_qterm(u, u, 1.0);
            }
            Objective::Quadratic(squares)
        }
        (UtilizationVars::PerLink(util), _) => Objective::Linear(
            util.iter()
                .zip(network.links())
                .map(|(&u, link)| (u, 1.0 / link.capacity))
                .collect(),
        ),
        (UtilizationVars::Max(max_util), _) => {
            Objective::Linear(LinExpr::from_iter([(*max_util, 1.0)]))
        }
    };
    problem.set_objective(objective);

    let mut capacity_constrs = Vec::with_capacity(network.num_links());
    let mut utilization_constrs = Vec::with_capacity(network.num_links());
    for link_id in network.link_ids() {
        let link = network.link(link_id);
        let name = link.name();
        let capacity = link.capacity;
        let flow = link_flow(network, &path_ratios, link_id);

        capacity_constrs.push(problem.add_constr(
            format!("cap_{name}"),
            flow.clone(),
            Sense::Le,
            capacity,
        ));

        let mut definition = flow;
        let sense = match &utilization {
            // linkFlow - capacity * util = 0
            UtilizationVars::PerLink(util) => {
                definition.add_term(util[link_id.0], -capacity);
                Sense::Eq
            }
            // linkFlow / capacity - maxUtil <= 0
            UtilizationVars::Max(max_util) => {
                definition = definition
                    .terms()
                    .iter()
                    .map(|&(v, c)| (v, c / capacity))
                    .chain([(*max_util, -1.0)])
                    .collect();
                Sense::Le
            }
        };
        utilization_constrs.push(problem.add_constr(
            format!("util_{name}"),
            definition,
            sense,
            0.0,
        ));
    }

    let split_constrs = network
        .flow_ids()
        .map(|FlowId(f)| {
            problem.add_constr(
                format!("traffic_split_{}", network.flows()[f].name),
                path_ratios[f].iter().map(|&v| (v, 1.0)).collect(),
                Sense::Eq,
                1.0,
            )
        })
        .collect_vec();

    Formulation {
        variant,
        path_ratios,
        utilization,
        capacity_constrs,
        utilization_constrs,
        split_constrs,
    }
}

/// Same as [`formulate`], with the variant given by name. An unknown name is
/// rejected before anything is registered.
pub fn formulate_by_name(
    problem: &mut Problem,
    variant: &str,
    network: &Network,
) -> Result<Formulation, ModelError> {
    let variant = variant.parse::<OptimizationVariant>()?;
    Ok(formulate(problem, variant, network))
}

/// Creates the backend selected in the configuration.
pub fn backend_from_config(config: &Config) -> Result<Box<dyn SolverBackend>> {
    match config.backend {
        BackendKind::Clarabel => Ok(Box::new(clarabel_backend::ClarabelBackend::new()?)),
        #[cfg(feature = "gurobi")]
        BackendKind::Gurobi => Ok(Box::new(gurobi_backend::GurobiBackend::new(
            config.gurobi_log_file.clone(),
        ))),
        #[cfg(not(feature = "gurobi"))]
        BackendKind::Gurobi => Err(ModelError::BackendUnavailable("gurobi".into()).into()),
    }
}

/// Formulates, solves and interprets one optimization run.
///
/// If `lp_dir` is given, the formulation is written to `{variant}.lp` in it
/// before solving.
pub fn optimize(
    network: &Network,
    variant: OptimizationVariant,
    backend: &mut dyn SolverBackend,
    lp_dir: Option<&Path>,
) -> Result<OptimizationOutcome> {
    info!("Started running linear optimization model {variant}...");
    let mut problem = Problem::new("network_optimization");
    let formulation = formulate(&mut problem, variant, network);
    info!(
        "Formulated {} variables and {} constraints",
        problem.num_variables(),
        problem.num_constraints()
    );
    if let Some(dir) = lp_dir {
        let lp_path = dir.join(format!("{variant}.lp"));
        problem
            .write_lp(&lp_path)
            .with_context(|| format!("Failed to write {}", lp_path.display()))?;
    }

    info!("Started optimization with {}...", backend.name());
    let solution = backend.solve(&problem)?;
    info!("Finished optimization");

    match solution.status {
        SolveStatus::Optimal => Ok(OptimizationOutcome::Optimal(diagnostics::extract_report(
            network,
            &formulation,
            &solution,
        ))),
        SolveStatus::Infeasible => {
            error!("Model is infeasible");
            let iis = backend.compute_iis(&problem)?;
            let conflicting_constraints = iis
                .into_iter()
                .map(|id| problem.constraint(id).name.clone())
                .collect_vec();
            Ok(OptimizationOutcome::Infeasible {
                conflicting_constraints,
            })
        }
        SolveStatus::Other { code, name } => {
            error!("Optimization ended with status {name} ({code})");
            Ok(OptimizationOutcome::Failed {
                status_code: code,
                status: name,
            })
        }
    }
}

/// [`optimize`] with the variant, backend and output directory taken from
/// the configuration.
pub fn optimize_with_config(network: &Network, config: &Config) -> Result<OptimizationOutcome> {
    let mut backend = backend_from_config(config)?;
    let lp_dir = config.write_lp.then_some(config.out_dir.as_path());
    optimize(network, config.model, backend.as_mut(), lp_dir)
}
