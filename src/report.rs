use crate::data::{Assignment, SchedulingOutput, Status};
use crate::error::Result;
use crate::instance::Instance;
use crate::solver::SolveOutcome;
use chrono::Local;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A sheet: one header row, then rows of optional cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

pub fn output(instance: &Instance, outcome: SolveOutcome) -> SchedulingOutput {
    let (room_view, teacher_view) = match outcome.status {
        Status::Optimal => (
            Some(room_view(instance, &outcome.assignments)),
            Some(teacher_view(instance, &outcome.assignments)),
        ),
        Status::Infeasible => (None, None),
    };
    SchedulingOutput {
        status: outcome.status,
        sessions_worked: outcome.sessions_worked,
        assignments: outcome.assignments,
        room_view,
        teacher_view,
    }
}

fn header(first: &str, instance: &Instance) -> Vec<String> {
    std::iter::once(first.to_string())
        .chain(instance.subjects.iter().map(|s| s.name.clone()))
        .collect()
}

/// Rooms by subjects; each cell lists the room's invigilators.
pub fn room_view(instance: &Instance, assignments: &[Assignment]) -> ReportTable {
    let by_cell: HashMap<(&str, &str), Vec<&str>> = assignments
        .iter()
        .map(|a| ((a.room.as_str(), a.subject.as_str()), a.teacher.as_str()))
        .into_group_map();

    let rows: Vec<Vec<Option<String>>> = instance
        .rooms
        .iter()
        .map(|room| {
            std::iter::once(Some(room.name.clone()))
                .chain(instance.subjects.iter().map(|subject| {
                    let teachers = by_cell
                        .get(&(room.name.as_str(), subject.name.as_str()))
                        .map(|ts| ts.iter().join(", "))
                        .unwrap_or_default();
                    Some(teachers)
                }))
                .collect::<Vec<_>>()
        })
        .collect();

    ReportTable {
        header: header("room", instance),
        rows,
    }
}

/// Teachers by subjects; each cell is the room, if any.
pub fn teacher_view(instance: &Instance, assignments: &[Assignment]) -> ReportTable {
    let by_cell: HashMap<(&str, &str), &str> = assignments
        .iter()
        .map(|a| ((a.teacher.as_str(), a.subject.as_str()), a.room.as_str()))
        .collect();

    let rows: Vec<Vec<Option<String>>> = instance
        .teachers
        .iter()
        .map(|teacher| {
            std::iter::once(Some(teacher.name.clone()))
                .chain(instance.subjects.iter().map(|subject| {
                    by_cell
                        .get(&(teacher.name.as_str(), subject.name.as_str()))
                        .map(|room| room.to_string())
                }))
                .collect::<Vec<_>>()
        })
        .collect();

    ReportTable {
        header: header("teacher", instance),
        rows,
    }
}

#[derive(Serialize)]
struct ReportFile<'a> {
    room_view: &'a ReportTable,
    teacher_view: &'a ReportTable,
}

/// Writes `invigilation_<timestamp>.json` into `dir`. Nothing is written
/// for an infeasible outcome or one without any assignment.
pub fn write_report(dir: &Path, output: &SchedulingOutput) -> Result<Option<PathBuf>> {
    let (Some(room_view), Some(teacher_view)) = (&output.room_view, &output.teacher_view) else {
        return Ok(None);
    };
    if output.assignments.is_empty() {
        return Ok(None);
    }
    fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("invigilation_{stamp}.json"));
    let file = ReportFile {
        room_view,
        teacher_view,
    };
    fs::write(&path, serde_json::to_vec_pretty(&file)?)?;
    Ok(Some(path))
}
