use super::milp::{Domain, MilpModel, MilpSolver, Sense, SolveOutcome};
use anyhow::Result;
use grb::prelude::*;
use std::time::Duration;

fn create_model(name: &str, timeout: Duration) -> Result<Model> {
    let mut env = Env::new("")?;
    env.set(param::OutputFlag, 0)?;
    env.set(param::LogToConsole, 0)?;
    env.set(param::TimeLimit, timeout.as_secs_f64())?;
    Ok(Model::with_env(name, env)?)
}

fn solve(milp: &MilpModel, timeout: Duration) -> Result<SolveOutcome> {
    let mut model = create_model("schedule", timeout)?;

    let mut vars = Vec::with_capacity(milp.variables().len());
    for v in milp.variables() {
        let vtype = match v.domain {
            Domain::Integer => grb::VarType::Integer,
            Domain::Continuous => grb::VarType::Continuous,
        };
        let upper = v.upper.unwrap_or(grb::INFINITY);
        vars.push(model.add_var(&v.name, vtype, 0.0, v.lower, upper, [])?);
    }

    for (i, constraint) in milp.constraints().iter().enumerate() {
        let lhs = constraint
            .terms
            .iter()
            .map(|&(var, coefficient)| coefficient * vars[var.index()])
            .grb_sum();
        let rhs = constraint.rhs;
        match constraint.sense {
            Sense::LessEq => model.add_constr(&format!("c_{i}"), c!(lhs <= rhs))?,
            Sense::GreaterEq => model.add_constr(&format!("c_{i}"), c!(lhs >= rhs))?,
            Sense::Equal => model.add_constr(&format!("c_{i}"), c!(lhs == rhs))?,
        };
    }

    let objective = milp
        .objective()
        .iter()
        .map(|&(var, coefficient)| coefficient * vars[var.index()]);
    model.set_objective(objective.grb_sum(), Minimize)?;
    model.optimize()?;

    let solutions: i32 = model.get_attr(attr::SolCount)?;
    let values = |model: &Model| -> Result<Vec<f64>> {
        vars.iter()
            .map(|var| Ok(model.get_obj_attr(attr::X, var)?))
            .collect()
    };

    Ok(match model.status()? {
        Status::Optimal => SolveOutcome::Optimal(values(&model)?),
        Status::TimeLimit if solutions > 0 => SolveOutcome::Feasible(values(&model)?),
        Status::TimeLimit => SolveOutcome::TimedOut,
        Status::Infeasible | Status::InfOrUnbd => SolveOutcome::Infeasible,
        Status::Unbounded => SolveOutcome::Unbounded,
        status => SolveOutcome::Failed(format!("Gurobi stopped with status {status:?}")),
    })
}

/// Gurobi backend, available with the `gurobi` feature.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gurobi;

impl MilpSolver for Gurobi {
    fn solve(&self, model: &MilpModel, timeout: Duration) -> SolveOutcome {
        solve(model, timeout).unwrap_or_else(|err| SolveOutcome::Failed(err.to_string()))
    }

    fn name(&self) -> &'static str {
        "gurobi"
    }
}
