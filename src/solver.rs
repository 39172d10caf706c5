use crate::config::{ModelOptions, RoomRule};
use crate::data::{Assignment, SchedulingInput, SchedulingOutput, Status};
use crate::error::{InvigilationError, Result};
use crate::instance::Instance;
use crate::model::{self, AssignmentVars, Formulation, SessionVars};
use crate::report;
use good_lp::{ResolutionError, Solution, SolverModel, default_solver};
use itertools::iproduct;
use log::{info, warn};
use std::time::Instant;

/// Result of one solve before it is shaped into reports.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: Status,
    pub sessions_worked: u32,
    pub assignments: Vec<Assignment>,
}

impl SolveOutcome {
    fn optimal(sessions_worked: u32, assignments: Vec<Assignment>) -> Self {
        SolveOutcome {
            status: Status::Optimal,
            sessions_worked,
            assignments,
        }
    }

    fn infeasible() -> Self {
        SolveOutcome {
            status: Status::Infeasible,
            sessions_worked: 0,
            assignments: Vec::new(),
        }
    }
}

/// Truth values read back from the solver, in the layout of the variable arenas.
#[derive(Debug, Clone, PartialEq)]
pub struct Truth {
    pub(crate) assigned: Vec<bool>,
    pub(crate) worked: Vec<bool>,
}

impl Truth {
    pub fn read(assign: &AssignmentVars, worked: &SessionVars, solution: &impl Solution) -> Self {
        Truth {
            assigned: assign.iter().map(|v| solution.value(v) > 0.5).collect(),
            worked: worked.iter().map(|v| solution.value(v) > 0.5).collect(),
        }
    }

    pub fn sessions_worked(&self) -> u32 {
        self.worked.iter().filter(|&&w| w).count() as u32
    }
}

/// Parses, validates, solves and shapes one request.
pub fn run(input: &SchedulingInput, defaults: ModelOptions) -> Result<SchedulingOutput> {
    let options = input.options.unwrap_or(defaults);
    let instance = Instance::new(input.entities()?)?;
    let outcome = solve(&instance, &options)?;
    Ok(report::output(&instance, outcome))
}

/// Solves the invigilation problem using the HiGHS ILP solver.
pub fn solve(instance: &Instance, options: &ModelOptions) -> Result<SolveOutcome> {
    let start_time = Instant::now();
    let Formulation {
        problem,
        assign,
        worked,
        constraints,
        objective,
    } = model::build(instance, options);

    if assign.is_empty() {
        return Ok(without_decisions(instance, options));
    }

    let mut model = problem
        .minimise(objective)
        .using(default_solver)
        .set_option("threads", 1) // one blocking solve, single threaded
        .set_option("random_seed", 1234)
        .set_option("log_to_console", if options.solver_log { "true" } else { "false" });
    for c in constraints {
        model.add_constraint(c);
    }

    info!("Starting ILP solver...");
    let solution = match model.solve() {
        Ok(s) => s,
        Err(ResolutionError::Infeasible) => {
            warn!("No solution: the constraints cannot all be met.");
            return Ok(SolveOutcome::infeasible());
        }
        Err(e) => return Err(InvigilationError::Solver(e.to_string())),
    };
    info!("Solution found in {:.2?}", start_time.elapsed());

    let truth = Truth::read(&assign, &worked, &solution);
    let assignments = project(instance, &assign, &truth);
    info!(
        "{} invigilations over {} sessions worked.",
        assignments.len(),
        truth.sessions_worked()
    );
    Ok(SolveOutcome::optimal(truth.sessions_worked(), assignments))
}

/// Subject, then room, then teacher order; one triple per true assignment.
pub fn project(instance: &Instance, assign: &AssignmentVars, truth: &Truth) -> Vec<Assignment> {
    iproduct!(instance.subject_ids(), instance.room_ids(), instance.teacher_ids())
        .filter(|&(s, r, t)| truth.assigned[assign.index(s, r, t)])
        .map(|(s, r, t)| Assignment {
            subject: instance.subjects[s].name.clone(),
            room: instance.rooms[r].name.clone(),
            teacher: instance.teachers[t].name.clone(),
        })
        .collect()
}

// no subject, room or teacher: every constraint is a constant
fn without_decisions(instance: &Instance, options: &ModelOptions) -> SolveOutcome {
    let needs_someone = instance.total_required() > 0
        || instance.teacher_ids().any(|t| {
            let rules = instance.eligibility(t);
            !rules.must_subjects.is_empty()
                || (options.room_rule == RoomRule::AtLeastOnce && !rules.must_rooms.is_empty())
        });
    if needs_someone {
        warn!("No solution: invigilators are required but nothing can be assigned.");
        SolveOutcome::infeasible()
    } else {
        SolveOutcome::optimal(0, Vec::new())
    }
}
