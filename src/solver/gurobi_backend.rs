use std::path::PathBuf;

use anyhow::Result;
use grb::{
    expr::{LinExpr as GrbLinExpr, QuadExpr as GrbQuadExpr},
    prelude::*,
};
use itertools::Itertools;
use log::{debug, info};
use ndarray::Array1;

use super::{
    backend::{Solution, SolveStatus, SolverBackend},
    problem::{ConstrId, LinExpr, Objective, Problem, Sense, VarId},
};

/// Backend delegating to Gurobi. Requires a Gurobi installation and license.
pub struct GurobiBackend {
    log_file: PathBuf,
}

impl GurobiBackend {
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        Self {
            log_file: log_file.into(),
        }
    }

    fn build(&self, problem: &Problem) -> Result<(Model, Vec<Var>, Vec<Constr>)> {
        let env = Env::new(self.log_file.to_string_lossy().as_ref())?;
        let mut model = Model::with_env(problem.name(), &env)?;
        model.set_param(param::OutputFlag, 0)?;

        let vars = problem
            .variables()
            .iter()
            .map(|name| add_ctsvar!(model, name: name.as_str(), bounds: 0.0..))
            .collect::<grb::Result<Vec<_>>>()?;
        let to_grb = |expr: &LinExpr| {
            let mut grb_expr = GrbLinExpr::new();
            for &(VarId(v), c) in expr.terms() {
                grb_expr.add_term(c, vars[v]);
            }
            grb_expr.add_constant(expr.constant());
            grb_expr
        };

        let constrs = problem
            .constraints()
            .iter()
            .map(|constraint| {
                let lhs = to_grb(&constraint.expr);
                let rhs = constraint.rhs;
                let con = match constraint.sense {
                    Sense::Le => c!(lhs <= rhs),
                    Sense::Eq => c!(lhs == rhs),
                    Sense::Ge => c!(lhs >= rhs),
                };
                model.add_constr(&constraint.name, con)
            })
            .collect::<grb::Result<Vec<_>>>()?;

        match problem.objective() {
            Objective::Linear(expr) => {
                model.set_objective(to_grb(expr), ModelSense::Minimize)?
            }
            Objective::Quadratic(expr) => {
                let mut objective = GrbQuadExpr::new();
                for &(VarId(a), VarId(b), c) in expr.qterms() {
                    objective.add_qterm(c, vars[a], vars[b]);
                }
                for &(VarId(v), c) in expr.linear().terms() {
                    objective.add_term(c, vars[v]);
                }
                objective.add_constant(expr.linear().constant());
                model.set_objective(objective, ModelSense::Minimize)?
            }
        }
        Ok((model, vars, constrs))
    }

    fn optimize(model: &mut Model) -> Result<Status> {
        model.optimize()?;
        let mut status = model.status()?;
        if status == Status::InfOrUnbd {
            debug!("Gurobi reported infeasible or unbounded, resolving without dual reductions");
            model.set_param(param::DualReductions, 0)?;
            model.optimize()?;
            status = model.status()?;
        }
        Ok(status)
    }
}

impl SolverBackend for GurobiBackend {
    fn name(&self) -> &str {
        "gurobi"
    }

    fn solve(&mut self, problem: &Problem) -> Result<Solution> {
        let (mut model, vars, _) = self.build(problem)?;
        let status = Self::optimize(&mut model)?;
        match status {
            Status::Optimal => Ok(Solution {
                status: SolveStatus::Optimal,
                objective_value: model.get_attr(attr::ObjVal)?,
                values: Array1::from_vec(model.get_obj_attr_batch(attr::X, vars)?),
            }),
            Status::Infeasible => Ok(Solution::without_values(SolveStatus::Infeasible)),
            other => Ok(Solution::without_values(SolveStatus::Other {
                code: other as i32,
                name: format!("{other:?}"),
            })),
        }
    }

    fn compute_iis(&mut self, problem: &Problem) -> Result<Vec<ConstrId>> {
        let (mut model, _, constrs) = self.build(problem)?;
        Self::optimize(&mut model)?;
        model.compute_iis()?;
        let membership = model.get_obj_attr_batch(attr::IISConstr, constrs)?;
        let iis = membership
            .into_iter()
            .enumerate()
            .filter(|&(_, in_iis)| in_iis != 0)
            .map(|(i, _)| ConstrId(i))
            .collect_vec();
        info!("Gurobi IIS contains {} constraints", iis.len());
        Ok(iis)
    }
}
