use itertools::Itertools;
use log::{error, info};

use crate::{
    datastructures::{
        FlowRatios, LinkUtilization, OptimizationOutcome, OptimizationReport,
        OptimizationVariant,
    },
    network::Network,
    solver::{backend::Solution, Formulation, UtilizationVars},
};

/// Per-link traffic and utilization for the given split ratios.
pub fn link_utilization<R: AsRef<[f64]>>(network: &Network, ratios: &[R]) -> Vec<LinkUtilization> {
    network
        .link_traffic(ratios)
        .iter()
        .zip(network.links())
        .map(|(&traffic, link)| LinkUtilization {
            link: link.name(),
            traffic,
            capacity: link.capacity,
            utilization: traffic / link.capacity * 100.0,
        })
        .collect()
}

/// Mean utilization over all links, in percent.
pub fn average_utilization(links: &[LinkUtilization]) -> f64 {
    links.iter().map(|l| l.utilization).sum::<f64>() / links.len() as f64
}

/// Utilization without optimization: every flow is spread evenly over its
/// candidate paths.
pub fn baseline_utilization(network: &Network) -> Vec<LinkUtilization> {
    link_utilization(network, &network.even_split())
}

/// Reads the solved ratios and recomputes every link's utilization from them.
///
/// The recomputed utilization is authoritative; the objective only yields a
/// utilization summary for the average and max variants.
pub fn extract_report(
    network: &Network,
    formulation: &Formulation,
    solution: &Solution,
) -> OptimizationReport {
    let values = &solution.values;
    let ratios = formulation
        .path_ratios
        .iter()
        .map(|vars| vars.iter().map(|v| values[v.0]).collect_vec())
        .collect_vec();
    let flow_ratios = network
        .flows()
        .iter()
        .zip(&ratios)
        .map(|(flow, ratios)| FlowRatios {
            flow: flow.name.clone(),
            ratios: ratios.clone(),
        })
        .collect_vec();

    let max_utilization = match formulation.utilization {
        UtilizationVars::Max(var) => Some(values[var.0]),
        UtilizationVars::PerLink(_) => None,
    };
    let objective_utilization = match formulation.variant {
        OptimizationVariant::AverageUtilization => {
            Some(solution.objective_value / network.num_links() as f64 * 100.0)
        }
        OptimizationVariant::MaxUtilization => max_utilization.map(|u| u * 100.0),
        OptimizationVariant::SquaredUtilization => None,
    };

    let link_utilization = link_utilization(network, &ratios);
    OptimizationReport {
        variant: formulation.variant,
        objective_value: solution.objective_value,
        objective_utilization,
        max_utilization,
        average_utilization: average_utilization(&link_utilization),
        link_utilization,
        flow_ratios,
    }
}

/// Logs an outcome the way an operator reads it: ratios per flow, links at
/// or above `significance_threshold` percent, and the average utilization;
/// or the conflicting constraints; or the raw status.
pub fn log_outcome(outcome: &OptimizationOutcome, significance_threshold: f64) {
    match outcome {
        OptimizationOutcome::Optimal(report) => {
            for FlowRatios { flow, ratios } in &report.flow_ratios {
                info!("Optimal path ratios for {flow}:");
                for (p, ratio) in ratios.iter().enumerate() {
                    info!("   Path {p}: {} %", ratio * 100.0);
                }
            }
            if let Some(summary) = report.objective_utilization {
                info!("Objective utilization summary: {summary}%");
            }
            for link in report.significant_links(significance_threshold) {
                info!("Link {} has utilization: {}%", link.link, link.utilization);
            }
            info!(
                "Average link utilization: {}% for model {}",
                report.average_utilization, report.variant
            );
        }
        OptimizationOutcome::Infeasible {
            conflicting_constraints,
        } => {
            error!("The following constraints cannot be satisfied:");
            for name in conflicting_constraints {
                error!("{name}");
            }
        }
        OptimizationOutcome::Failed { status_code, status } => {
            error!("Optimization ended with status {status_code} ({status})");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        datastructures::DEFAULT_SIGNIFICANCE_THRESHOLD,
        solver::{self, clarabel_backend::ClarabelBackend},
        test_utils::*,
    };

    fn link(name: &str, utilization: f64) -> LinkUtilization {
        LinkUtilization {
            link: name.to_string(),
            traffic: utilization,
            capacity: 100.0,
            utilization,
        }
    }

    #[test]
    fn test_baseline_utilization() {
        let network = toy_network();
        let baseline = baseline_utilization(&network);
        let expected = [600.0, 500.0, 1500.0]
            .iter()
            .map(|c| 100.0 / 3.0 / c * 100.0)
            .collect_vec();
        for (link, expected) in baseline.iter().zip(expected) {
            assert!((link.utilization - expected).abs() < 1e-9);
        }
        assert_eq!(baseline[0].link, "AB");
    }

    #[test]
    fn test_average_utilization() {
        let links = [10.0, 20.0, 60.0]
            .iter()
            .map(|&u| link("", u))
            .collect_vec();
        assert_eq!(average_utilization(&links), 30.0);
    }

    #[test]
    fn test_significant_links_of_solved_report() {
        let network = shared_link_network();
        let mut backend = ClarabelBackend::new().unwrap();
        let outcome = solver::optimize(
            &network,
            OptimizationVariant::MaxUtilization,
            &mut backend,
            None,
        )
        .unwrap();
        let report = outcome.report().unwrap();
        // the optimum loads AB, AC, CD and AE to 2/3, BD to 7/15 and BE to 2/5
        assert_eq!(
            report
                .significant_links(DEFAULT_SIGNIFICANCE_THRESHOLD)
                .map(|l| l.link.as_str())
                .collect_vec(),
            vec!["AB", "BD", "AC", "CD", "BE", "AE"]
        );
        assert_eq!(
            report
                .significant_links(50.0)
                .map(|l| l.link.as_str())
                .collect_vec(),
            vec!["AB", "AC", "CD", "AE"]
        );
        log_outcome(&outcome, DEFAULT_SIGNIFICANCE_THRESHOLD);
    }

    #[test]
    fn test_significance_threshold_is_inclusive() {
        let report = OptimizationReport {
            variant: OptimizationVariant::AverageUtilization,
            objective_value: 0.0,
            objective_utilization: None,
            max_utilization: None,
            average_utilization: 0.0,
            link_utilization: vec![link("AB", 10.0), link("AC", 9.99), link("AD", 55.0)],
            flow_ratios: vec![],
        };
        assert_eq!(
            report
                .significant_links(DEFAULT_SIGNIFICANCE_THRESHOLD)
                .map(|l| l.link.as_str())
                .collect_vec(),
            vec!["AB", "AD"]
        );
    }
}
