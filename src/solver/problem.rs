use std::{
    collections::BTreeMap,
    fmt, fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use itertools::Itertools;

/// Index of a variable registered with a [`Problem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

/// Index of a constraint registered with a [`Problem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstrId(pub usize);

/// A linear expression `Σ coeff * var + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, var: VarId, coeff: f64) -> &mut Self {
        self.terms.push((var, coeff));
        self
    }

    pub fn add_constant(&mut self, constant: f64) -> &mut Self {
        self.constant += constant;
        self
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Merges repeated variables and drops zero coefficients, keeping the
    /// variables in index order.
    pub fn compact(self) -> Self {
        let mut merged: BTreeMap<VarId, f64> = BTreeMap::new();
        for (var, coeff) in self.terms {
            *merged.entry(var).or_default() += coeff;
        }
        Self {
            terms: merged.into_iter().filter(|(_, c)| *c != 0.0).collect(),
            constant: self.constant,
        }
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(VarId(v), c)| c * values[v])
            .sum::<f64>()
            + self.constant
    }
}

impl FromIterator<(VarId, f64)> for LinExpr {
    fn from_iter<T: IntoIterator<Item = (VarId, f64)>>(iter: T) -> Self {
        Self {
            terms: iter.into_iter().collect(),
            constant: 0.0,
        }
    }
}

/// A quadratic expression `Σ coeff * a * b + linear`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadExpr {
    qterms: Vec<(VarId, VarId, f64)>,
    linear: LinExpr,
}

impl QuadExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_qterm(&mut self, a: VarId, b: VarId, coeff: f64) -> &mut Self {
        self.qterms.push((a.min(b), a.max(b), coeff));
        self
    }

    pub fn add_term(&mut self, var: VarId, coeff: f64) -> &mut Self {
        self.linear.add_term(var, coeff);
        self
    }

    /// Quadratic terms with the smaller variable index first.
    pub fn qterms(&self) -> &[(VarId, VarId, f64)] {
        &self.qterms
    }

    pub fn linear(&self) -> &LinExpr {
        &self.linear
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.qterms
            .iter()
            .map(|&(VarId(a), VarId(b), c)| c * values[a] * values[b])
            .sum::<f64>()
            + self.linear.evaluate(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Eq,
    Ge,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Le => write!(f, "<="),
            Sense::Eq => write!(f, "="),
            Sense::Ge => write!(f, ">="),
        }
    }
}

/// `expr sense rhs`, with every variable on the left hand side and the
/// expression constant folded into `rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub expr: LinExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs + tolerance,
            Sense::Eq => (lhs - self.rhs).abs() <= tolerance,
            Sense::Ge => lhs >= self.rhs - tolerance,
        }
    }
}

/// Minimization objective.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    Linear(LinExpr),
    Quadratic(QuadExpr),
}

impl Default for Objective {
    fn default() -> Self {
        Objective::Linear(LinExpr::new())
    }
}

impl Objective {
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        match self {
            Objective::Linear(expr) => expr.evaluate(values),
            Objective::Quadratic(expr) => expr.evaluate(values),
        }
    }

    pub fn is_quadratic(&self) -> bool {
        matches!(self, Objective::Quadratic(q) if !q.qterms().is_empty())
    }
}

/// A continuous minimization problem under construction. Every variable has
/// bounds `[0, +inf)`; anything tighter is expressed through constraints.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    name: String,
    variables: Vec<String>,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl Problem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a continuous variable with lower bound 0.
    pub fn add_var(&mut self, name: impl Into<String>) -> VarId {
        self.variables.push(name.into());
        VarId(self.variables.len() - 1)
    }

    /// Registers `expr sense rhs`. Constant terms of `expr` are moved to the
    /// right hand side.
    pub fn add_constr(
        &mut self,
        name: impl Into<String>,
        expr: LinExpr,
        sense: Sense,
        rhs: f64,
    ) -> ConstrId {
        let expr = expr.compact();
        let rhs = rhs - expr.constant();
        self.constraints.push(Constraint {
            name: name.into(),
            expr: LinExpr {
                constant: 0.0,
                ..expr
            },
            sense,
            rhs,
        });
        ConstrId(self.constraints.len() - 1)
    }

    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = match objective {
            Objective::Linear(expr) => Objective::Linear(expr.compact()),
            Objective::Quadratic(QuadExpr { qterms, linear }) => {
                Objective::Quadratic(QuadExpr {
                    qterms,
                    linear: linear.compact(),
                })
            }
        };
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn var_name(&self, var: VarId) -> &str {
        &self.variables[var.0]
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn constraint(&self, id: ConstrId) -> &Constraint {
        &self.constraints[id.0]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// A copy keeping only the constraints in `keep` and a zero objective,
    /// used to check feasibility of a constraint subset.
    pub fn feasibility_subproblem(&self, keep: &[ConstrId]) -> Problem {
        Problem {
            name: format!("{}_feasibility", self.name),
            variables: self.variables.clone(),
            constraints: keep
                .iter()
                .map(|&id| self.constraint(id).clone())
                .collect(),
            objective: Objective::default(),
        }
    }

    /// Writes the problem in CPLEX LP format.
    pub fn write_lp(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        self.write_lp_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn write_lp_to(&self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "\\ Problem: {}", self.name)?;
        writeln!(out, "Minimize")?;
        let (linear, qterms) = match &self.objective {
            Objective::Linear(expr) => (expr, &[][..]),
            Objective::Quadratic(expr) => (expr.linear(), expr.qterms()),
        };
        let mut objective = format!(" obj: {}", self.format_terms(linear.terms()));
        if !qterms.is_empty() {
            let quadratic = qterms
                .iter()
                .map(|&(a, b, c)| {
                    if a == b {
                        format!("{} {} ^2", 2.0 * c, self.var_name(a))
                    } else {
                        format!(
                            "{} {} * {}",
                            2.0 * c,
                            self.var_name(a),
                            self.var_name(b)
                        )
                    }
                })
                .join(" + ");
            if !linear.terms().is_empty() {
                objective.push_str(" +");
            }
            objective.push_str(&format!(" [ {quadratic} ] / 2"));
        }
        if linear.constant() != 0.0 {
            objective.push_str(&format!(" + {}", linear.constant()));
        }
        writeln!(out, "{}", objective.replace("+ -", "- "))?;
        writeln!(out, "Subject To")?;
        for Constraint {
            name,
            expr,
            sense,
            rhs,
        } in &self.constraints
        {
            let lhs = match expr.terms() {
                [] => "0 ".to_string() + self.var_name(VarId(0)),
                terms => self.format_terms(terms),
            };
            writeln!(out, " {name}: {} {sense} {rhs}", lhs.replace("+ -", "- "))?;
        }
        writeln!(out, "Bounds")?;
        for name in &self.variables {
            writeln!(out, " {name} >= 0")?;
        }
        writeln!(out, "End")?;
        Ok(())
    }

    fn format_terms(&self, terms: &[(VarId, f64)]) -> String {
        terms
            .iter()
            .map(|&(var, coeff)| format!("{} {}", coeff, self.var_name(var)))
            .join(" + ")
    }
}
