use core::fmt;

use anyhow::Result;
use log::warn;
use ndarray::Array1;

use super::problem::{ConstrId, Problem};

/// Terminal status reported by a backend after a solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    /// Any other terminal status, with the backend's raw code and name
    Other { code: i32, name: String },
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Other { code, name } => write!(f, "{name} ({code})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: SolveStatus,
    /// Only meaningful if the status is optimal
    pub objective_value: f64,
    /// Value of every variable in registration order, empty unless optimal
    pub values: Array1<f64>,
}

impl Solution {
    pub fn without_values(status: SolveStatus) -> Self {
        Self {
            status,
            objective_value: f64::NAN,
            values: Array1::zeros(0),
        }
    }
}

/// An optimization engine able to minimize a [`Problem`].
///
/// Backends treat `solve` as blocking and must leave the problem untouched,
/// so the same formulation can be solved again or diagnosed afterwards.
pub trait SolverBackend {
    /// Backend name for logging
    fn name(&self) -> &str;

    fn solve(&mut self, problem: &Problem) -> Result<Solution>;

    /// Computes an irreducible inconsistent subsystem of an infeasible
    /// problem: a set of constraints that cannot hold together, but does so
    /// as soon as any one of them is removed.
    fn compute_iis(&mut self, problem: &Problem) -> Result<Vec<ConstrId>>;
}

/// Deletion filter over the constraints of `problem`, usable by any backend
/// that can detect infeasibility but has no native IIS support.
///
/// Constraints are tried in registration order. A constraint whose removal
/// keeps the remainder infeasible is dropped for good; the constraints left
/// at the end form an irreducible subsystem. A solve that ends neither
/// optimal nor infeasible keeps its constraint, in which case the result is
/// only guaranteed to be inconsistent.
pub fn deletion_filter<S: SolverBackend + ?Sized>(
    backend: &mut S,
    problem: &Problem,
) -> Result<Vec<ConstrId>> {
    let mut kept: Vec<ConstrId> = (0..problem.num_constraints()).map(ConstrId).collect();
    let full = backend.solve(&problem.feasibility_subproblem(&kept))?;
    if full.status != SolveStatus::Infeasible {
        anyhow::bail!(
            "Cannot compute an IIS, the constraints are not infeasible (status {})",
            full.status
        );
    }
    let mut i = 0;
    while i < kept.len() {
        let candidate = kept.iter().copied().filter(|&c| c != kept[i]).collect::<Vec<_>>();
        let reduced = backend.solve(&problem.feasibility_subproblem(&candidate))?;
        match reduced.status {
            SolveStatus::Infeasible => kept = candidate,
            SolveStatus::Optimal => i += 1,
            status @ SolveStatus::Other { .. } => {
                warn!(
                    "Keeping constraint {} after an inconclusive solve ({status}), \
                     the conflict set may not be irreducible",
                    problem.constraint(kept[i]).name
                );
                i += 1;
            }
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::problem::{LinExpr, Sense};

    /// Infeasible while `c1` and `c2` are both present; reports a numerical
    /// failure whenever `c0` is missing.
    struct ScriptedBackend;

    impl SolverBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn solve(&mut self, problem: &Problem) -> Result<Solution> {
            let has = |name: &str| problem.constraints().iter().any(|c| c.name == name);
            let status = if !has("c0") {
                SolveStatus::Other {
                    code: 7,
                    name: "NumericalError".into(),
                }
            } else if has("c1") && has("c2") {
                SolveStatus::Infeasible
            } else {
                SolveStatus::Optimal
            };
            Ok(Solution::without_values(status))
        }

        fn compute_iis(&mut self, problem: &Problem) -> Result<Vec<ConstrId>> {
            deletion_filter(self, problem)
        }
    }

    fn three_constraints() -> Problem {
        let mut problem = Problem::new("scripted");
        let x = problem.add_var("x");
        for name in ["c0", "c1", "c2"] {
            problem.add_constr(name, LinExpr::from_iter([(x, 1.0)]), Sense::Le, 1.0);
        }
        problem
    }

    #[test]
    fn test_inconclusive_solve_keeps_constraint() {
        let problem = three_constraints();
        let iis = ScriptedBackend.compute_iis(&problem).unwrap();
        assert_eq!(iis, vec![ConstrId(0), ConstrId(1), ConstrId(2)]);
    }

    #[test]
    fn test_feasible_problem_has_no_iis() {
        let feasible = three_constraints().feasibility_subproblem(&[ConstrId(0), ConstrId(1)]);
        let mut backend = ScriptedBackend;
        assert!(deletion_filter(&mut backend, &feasible).is_err());
    }
}
