//! ILP formulation of the invigilation problem.
//!
//! x_srt = 1 if teacher t invigilates subject s in room r
//! w_tk  = 1 if teacher t works at least once in session k
//!
//! The objective minimises the number of sessions worked over all teachers.

use crate::config::{ModelOptions, RoomRule, SessionLinkage};
use crate::instance::{Instance, RoomId, SessionId, SubjectId, TeacherId};
use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint, variable};
use itertools::iproduct;
use log::{info, trace};

/// Assignment variables laid out subject-major, then room, then teacher.
#[derive(Debug, Clone)]
pub struct AssignmentVars {
    vars: Vec<Variable>,
    rooms: usize,
    teachers: usize,
}

impl AssignmentVars {
    fn new(problem: &mut ProblemVariables, instance: &Instance) -> Self {
        let n = instance.subjects.len() * instance.rooms.len() * instance.teachers.len();
        AssignmentVars {
            vars: problem.add_vector(variable().binary(), n),
            rooms: instance.rooms.len(),
            teachers: instance.teachers.len(),
        }
    }

    pub fn index(&self, subject: SubjectId, room: RoomId, teacher: TeacherId) -> usize {
        (subject * self.rooms + room) * self.teachers + teacher
    }

    pub fn get(&self, subject: SubjectId, room: RoomId, teacher: TeacherId) -> Variable {
        self.vars[self.index(subject, room, teacher)]
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Variable> + '_ {
        self.vars.iter().copied()
    }
}

/// Session-worked variables laid out teacher-major, then session.
#[derive(Debug, Clone)]
pub struct SessionVars {
    vars: Vec<Variable>,
    sessions: usize,
}

impl SessionVars {
    fn new(problem: &mut ProblemVariables, instance: &Instance) -> Self {
        let n = instance.teachers.len() * instance.sessions.len();
        SessionVars {
            vars: problem.add_vector(variable().binary(), n),
            sessions: instance.sessions.len(),
        }
    }

    pub fn index(&self, teacher: TeacherId, session: SessionId) -> usize {
        teacher * self.sessions + session
    }

    pub fn get(&self, teacher: TeacherId, session: SessionId) -> Variable {
        self.vars[self.index(teacher, session)]
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Variable> + '_ {
        self.vars.iter().copied()
    }
}

/// Everything the solver needs, owned by nobody else.
pub struct Formulation {
    pub problem: ProblemVariables,
    pub assign: AssignmentVars,
    pub worked: SessionVars,
    pub constraints: Vec<Constraint>,
    pub objective: Expression,
}

pub fn build(instance: &Instance, options: &ModelOptions) -> Formulation {
    info!(
        "Setting up ILP model with {} subjects, {} rooms, {} teachers and {} sessions...",
        instance.subjects.len(),
        instance.rooms.len(),
        instance.teachers.len(),
        instance.sessions.len()
    );
    let mut problem = ProblemVariables::new();
    let assign = AssignmentVars::new(&mut problem, instance);
    let worked = SessionVars::new(&mut problem, instance);
    trace!(
        "Generated {} assignment and {} session-worked variables.",
        assign.len(),
        worked.len()
    );

    let mut constraints = Vec::new();
    add_one_room_per_subject(instance, &assign, &mut constraints);
    add_room_capacity(instance, &assign, &mut constraints);
    add_times_limit(instance, &assign, &mut constraints);
    add_subject_rules(instance, &assign, &mut constraints);
    add_room_rules(instance, &assign, options.room_rule, &mut constraints);
    match options.session_linkage {
        SessionLinkage::PerSubject => link_sessions_per_subject(instance, &assign, &worked, &mut constraints),
        SessionLinkage::PerSession => link_sessions_per_session(instance, &assign, &worked, &mut constraints),
    }
    info!("Model has {} constraints.", constraints.len());

    let objective = objective(&worked);
    info!("Objective defined: minimise sessions worked.");

    Formulation {
        problem,
        assign,
        worked,
        constraints,
        objective,
    }
}

/// Flat unweighted count of sessions worked across all teachers.
pub fn objective(worked: &SessionVars) -> Expression {
    worked.iter().sum()
}

fn rooms_of(instance: &Instance, assign: &AssignmentVars, s: SubjectId, t: TeacherId) -> Expression {
    instance.room_ids().map(|r| assign.get(s, r, t)).sum()
}

fn subjects_of(instance: &Instance, assign: &AssignmentVars, r: RoomId, t: TeacherId) -> Expression {
    instance.subject_ids().map(|s| assign.get(s, r, t)).sum()
}

// a teacher cannot sit the same subject in two rooms
fn add_one_room_per_subject(instance: &Instance, assign: &AssignmentVars, out: &mut Vec<Constraint>) {
    info!("Adding 'one room per subject and teacher' constraints...");
    for (s, t) in iproduct!(instance.subject_ids(), instance.teacher_ids()) {
        let rooms = rooms_of(instance, assign, s, t);
        out.push(constraint!(rooms <= 1));
    }
}

fn add_room_capacity(instance: &Instance, assign: &AssignmentVars, out: &mut Vec<Constraint>) {
    info!("Adding 'exact room capacity' constraints...");
    for (s, r) in iproduct!(instance.subject_ids(), instance.room_ids()) {
        let staffed: Expression = instance.teacher_ids().map(|t| assign.get(s, r, t)).sum();
        let required = f64::from(instance.required(s, r));
        out.push(constraint!(staffed == required));
    }
}

fn add_times_limit(instance: &Instance, assign: &AssignmentVars, out: &mut Vec<Constraint>) {
    info!("Adding 'times limit' constraints...");
    for (t, teacher) in instance.teachers.iter().enumerate() {
        let total: Expression = iproduct!(instance.subject_ids(), instance.room_ids())
            .map(|(s, r)| assign.get(s, r, t))
            .sum();
        let limit = f64::from(teacher.times_limit);
        out.push(constraint!(total <= limit));
    }
}

fn add_subject_rules(instance: &Instance, assign: &AssignmentVars, out: &mut Vec<Constraint>) {
    info!("Adding 'must / forbidden subject' constraints...");
    for t in instance.teacher_ids() {
        let rules = instance.eligibility(t);
        for &s in &rules.must_subjects {
            let rooms = rooms_of(instance, assign, s, t);
            out.push(constraint!(rooms >= 1));
        }
        for &s in &rules.forbidden_subjects {
            let rooms = rooms_of(instance, assign, s, t);
            out.push(constraint!(rooms == 0));
        }
    }
}

fn add_room_rules(instance: &Instance, assign: &AssignmentVars, rule: RoomRule, out: &mut Vec<Constraint>) {
    info!("Adding 'must / forbidden room' constraints ({rule:?})...");
    for t in instance.teacher_ids() {
        let rules = instance.eligibility(t);
        if !rules.must_rooms.is_empty() {
            match rule {
                RoomRule::Exclusive => {
                    let outside: Vec<Variable> = iproduct!(instance.subject_ids(), instance.room_ids())
                        .filter(|(_, r)| !rules.must_rooms.contains(r))
                        .map(|(s, r)| assign.get(s, r, t))
                        .collect();
                    if !outside.is_empty() {
                        let outside: Expression = outside.into_iter().sum();
                        out.push(constraint!(outside == 0));
                    }
                }
                RoomRule::AtLeastOnce => {
                    for &r in &rules.must_rooms {
                        let subjects = subjects_of(instance, assign, r, t);
                        out.push(constraint!(subjects >= 1));
                    }
                }
            }
        }
        for &r in &rules.forbidden_rooms {
            let subjects = subjects_of(instance, assign, r, t);
            out.push(constraint!(subjects == 0));
        }
    }
}

// w_tk = 0 => no room for s; w_tk = 1 => some room for s, for every s in k
fn link_sessions_per_subject(
    instance: &Instance,
    assign: &AssignmentVars,
    worked: &SessionVars,
    out: &mut Vec<Constraint>,
) {
    info!("Linking session-worked variables per subject...");
    for (t, s) in iproduct!(instance.teacher_ids(), instance.subject_ids()) {
        let w = worked.get(t, instance.session_of(s));
        for r in instance.room_ids() {
            let x = assign.get(s, r, t);
            out.push(constraint!(x <= w));
        }
        let rooms = rooms_of(instance, assign, s, t);
        out.push(constraint!(rooms >= w));
    }
}

// w_tk = 0 => nothing in k; w_tk = 1 => something in k
fn link_sessions_per_session(
    instance: &Instance,
    assign: &AssignmentVars,
    worked: &SessionVars,
    out: &mut Vec<Constraint>,
) {
    info!("Linking session-worked variables per session...");
    for (t, k) in iproduct!(instance.teacher_ids(), instance.session_ids()) {
        let w = worked.get(t, k);
        let cover: Vec<Variable> = iproduct!(instance.subjects_in(k), instance.room_ids())
            .map(|(s, r)| assign.get(s, r, t))
            .collect();
        for &x in &cover {
            out.push(constraint!(x <= w));
        }
        let any: Expression = cover.into_iter().sum();
        out.push(constraint!(any >= w));
    }
}
