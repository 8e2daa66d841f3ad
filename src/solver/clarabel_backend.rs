use anyhow::{anyhow, Result};
use clarabel::{
    algebra::CscMatrix,
    solver::{
        DefaultSettings, DefaultSettingsBuilder, DefaultSolver, IPSolver,
        SolverStatus, SupportedConeT,
    },
};
use log::debug;
use ndarray::Array1;

use super::{
    backend::{deletion_filter, Solution, SolveStatus, SolverBackend},
    problem::{ConstrId, Objective, Problem, Sense, VarId},
};

/// Interior point backend built on Clarabel.
///
/// Clarabel solves `min ½xᵀPx + qᵀx  s.t.  Ax + s = b, s ∈ K`. Equalities go
/// to the zero cone, inequalities and the variable lower bounds to the
/// nonnegative orthant.
pub struct ClarabelBackend {
    settings: DefaultSettings<f64>,
}

impl ClarabelBackend {
    pub fn new() -> Result<Self> {
        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .build()
            .map_err(|e| anyhow!("Clarabel settings error: {e:?}"))?;
        Ok(Self { settings })
    }

    pub fn with_settings(settings: DefaultSettings<f64>) -> Self {
        Self { settings }
    }
}

/// Column-compressed matrix from (row, col, value) triplets, summing
/// duplicates.
fn csc_from_triplets(
    m: usize,
    n: usize,
    mut triplets: Vec<(usize, usize, f64)>,
) -> CscMatrix<f64> {
    triplets.sort_by_key(|&(r, c, _)| (c, r));
    let mut colptr = Vec::with_capacity(n + 1);
    let mut rowval = Vec::with_capacity(triplets.len());
    let mut nzval: Vec<f64> = Vec::with_capacity(triplets.len());
    let mut entries = triplets.into_iter().peekable();
    colptr.push(0);
    for col in 0..n {
        let mut last_row = None;
        while let Some(&(r, _, v)) = entries.peek().filter(|&&(_, c, _)| c == col) {
            entries.next();
            if last_row == Some(r) {
                if let Some(last) = nzval.last_mut() {
                    *last += v;
                }
            } else {
                rowval.push(r);
                nzval.push(v);
                last_row = Some(r);
            }
        }
        colptr.push(rowval.len());
    }
    CscMatrix::new(m, n, colptr, rowval, nzval)
}

struct ConicForm {
    p: CscMatrix<f64>,
    q: Vec<f64>,
    a: CscMatrix<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
    objective_constant: f64,
}

fn conic_form(problem: &Problem) -> ConicForm {
    let n = problem.num_variables();

    let mut q = vec![0.0; n];
    let mut p_triplets = Vec::new();
    let linear = match problem.objective() {
        Objective::Linear(expr) => expr,
        Objective::Quadratic(expr) => {
            // ½xᵀPx with P upper triangular: c·x² needs P_ii = 2c, c·xy needs P_ij = c
            for &(VarId(a), VarId(b), c) in expr.qterms() {
                let coeff = if a == b { 2.0 * c } else { c };
                p_triplets.push((a, b, coeff));
            }
            expr.linear()
        }
    };
    for &(VarId(v), c) in linear.terms() {
        q[v] += c;
    }

    let (equalities, inequalities): (Vec<_>, Vec<_>) = problem
        .constraints()
        .iter()
        .partition(|c| c.sense == Sense::Eq);
    let mut a_triplets = Vec::new();
    let mut b = Vec::with_capacity(problem.num_constraints() + n);
    for constraint in equalities.iter().chain(inequalities.iter()) {
        let row = b.len();
        let sign = if constraint.sense == Sense::Ge { -1.0 } else { 1.0 };
        for &(VarId(v), c) in constraint.expr.terms() {
            a_triplets.push((row, v, sign * c));
        }
        b.push(sign * constraint.rhs);
    }
    for v in 0..n {
        a_triplets.push((b.len(), v, -1.0));
        b.push(0.0);
    }

    let mut cones = Vec::new();
    if !equalities.is_empty() {
        cones.push(SupportedConeT::ZeroConeT(equalities.len()));
    }
    cones.push(SupportedConeT::NonnegativeConeT(inequalities.len() + n));

    ConicForm {
        p: csc_from_triplets(n, n, p_triplets),
        q,
        a: csc_from_triplets(b.len(), n, a_triplets),
        b,
        cones,
        objective_constant: linear.constant(),
    }
}

impl SolverBackend for ClarabelBackend {
    fn name(&self) -> &str {
        "clarabel"
    }

    fn solve(&mut self, problem: &Problem) -> Result<Solution> {
        let ConicForm {
            p,
            q,
            a,
            b,
            cones,
            objective_constant,
        } = conic_form(problem);
        debug!(
            "Clarabel: {} variables, {} rows, {} nonzeros",
            q.len(),
            b.len(),
            a.nzval.len()
        );
        let mut solver =
            DefaultSolver::new(&p, &q, &a, &b, &cones, self.settings.clone())
                .map_err(|e| anyhow!("Clarabel initialization failed: {e:?}"))?;
        solver.solve();
        let solution = solver.solution;
        debug!(
            "Clarabel finished with {:?} after {} iterations",
            solution.status, solution.iterations
        );
        let status = match solution.status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::PrimalInfeasible
            | SolverStatus::AlmostPrimalInfeasible => SolveStatus::Infeasible,
            other => SolveStatus::Other {
                name: format!("{other:?}"),
                code: other as i32,
            },
        };
        if status != SolveStatus::Optimal {
            return Ok(Solution::without_values(status));
        }
        Ok(Solution {
            status,
            objective_value: solution.obj_val + objective_constant,
            values: Array1::from_vec(solution.x),
        })
    }

    fn compute_iis(&mut self, problem: &Problem) -> Result<Vec<ConstrId>> {
        deletion_filter(self, problem)
    }
}
