//! Solver-independent mixed-integer linear models and the bundled `microlp` backend.

use good_lp::solvers::microlp::microlp;
use good_lp::{constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Handle of a variable inside a [`MilpModel`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VarId(usize);

impl VarId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Domain {
    Integer,
    Continuous,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub domain: Domain,
    pub lower: f64,
    /// Absent means unbounded above.
    pub upper: Option<f64>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sense {
    LessEq,
    GreaterEq,
    Equal,
}

/// `Σ coefficient · variable  (<= | >= | ==)  rhs`
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

/// Minimization problem over bounded variables and linear constraints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MilpModel {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Vec<(VarId, f64)>,
}

impl MilpModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, domain: Domain, lower: f64, upper: Option<f64>) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            domain,
            lower,
            upper,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, terms: Vec<(VarId, f64)>, sense: Sense, rhs: f64) {
        self.constraints.push(Constraint { terms, sense, rhs });
    }

    /// Adds `coefficient · variable` to the minimized objective.
    pub fn minimize(&mut self, variable: VarId, coefficient: f64) {
        self.objective.push((variable, coefficient));
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    /// Evaluates the objective for the given variable values.
    #[must_use]
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|&(var, coefficient)| coefficient * values.get(var.0).copied().unwrap_or_default())
            .sum()
    }
}

/// Result of one solve. Values are indexed by [`VarId::index`].
#[derive(Clone, Debug, PartialEq)]
pub enum SolveOutcome {
    Optimal(Vec<f64>),
    /// A feasible but not proven optimal point, found before the time limit.
    Feasible(Vec<f64>),
    Infeasible,
    Unbounded,
    TimedOut,
    Failed(String),
}

/// External MILP solver.
pub trait MilpSolver: Send + Sync {
    /// Solves the model, giving up after `timeout` of wall-clock time.
    fn solve(&self, model: &MilpModel, timeout: Duration) -> SolveOutcome;

    fn name(&self) -> &str;
}

/// Pure Rust branch and bound solver, run on its own thread.
///
/// A solve that exceeds the time limit is abandoned: its thread finishes in the
/// background and its result is dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct Microlp;

impl MilpSolver for Microlp {
    fn solve(&self, model: &MilpModel, timeout: Duration) -> SolveOutcome {
        let (sender, receiver) = mpsc::channel();
        let model = model.clone();
        let spawned = thread::Builder::new()
            .name("microlp".into())
            .spawn(move || sender.send(solve_microlp(&model)));

        if let Err(error) = spawned {
            return SolveOutcome::Failed(error.to_string());
        }

        match receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => SolveOutcome::TimedOut,
            Err(RecvTimeoutError::Disconnected) => SolveOutcome::Failed("solver thread stopped without a result".into()),
        }
    }

    fn name(&self) -> &'static str {
        "microlp"
    }
}

fn solve_microlp(model: &MilpModel) -> SolveOutcome {
    let mut problem_variables = ProblemVariables::new();
    let vars: Vec<good_lp::Variable> = model
        .variables
        .iter()
        .map(|v| {
            let mut definition = variable().name(v.name.clone()).min(v.lower);
            if let Some(upper) = v.upper {
                definition = definition.max(upper);
            }
            if v.domain == Domain::Integer {
                definition = definition.integer();
            }
            problem_variables.add(definition)
        })
        .collect();

    let expression = |terms: &[(VarId, f64)]| {
        terms
            .iter()
            .fold(Expression::from(0.0), |sum, &(var, coefficient)| sum + coefficient * vars[var.0])
    };

    let mut problem = problem_variables
        .minimise(expression(&model.objective))
        .using(microlp);
    for c in &model.constraints {
        let lhs = expression(&c.terms);
        problem = problem.with(match c.sense {
            Sense::LessEq => constraint::leq(lhs, Expression::from(c.rhs)),
            Sense::GreaterEq => constraint::geq(lhs, Expression::from(c.rhs)),
            Sense::Equal => constraint::eq(lhs, Expression::from(c.rhs)),
        });
    }

    match problem.solve() {
        Ok(solution) => SolveOutcome::Optimal(vars.iter().map(|&var| solution.value(var)).collect()),
        Err(ResolutionError::Infeasible) => SolveOutcome::Infeasible,
        Err(ResolutionError::Unbounded) => SolveOutcome::Unbounded,
        Err(error) => SolveOutcome::Failed(error.to_string()),
    }
}
