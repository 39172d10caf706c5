use crate::config::ModelOptions;
use crate::error::{InvigilationError, Result};
use crate::report::ReportTable;
use chrono::{NaiveDate, NaiveDateTime};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// One spreadsheet row; cells are whatever scalar the sheet held.
pub type Record = Vec<Value>;

pub const TEACHER_ARITY: usize = 7;
pub const SUBJECT_ARITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HalfDay {
    Am,
    Pm,
}

impl fmt::Display for HalfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalfDay::Am => f.write_str("AM"),
            HalfDay::Pm => f.write_str("PM"),
        }
    }
}

/// A (date, half-day) work period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Session {
    pub date: String,
    pub half_day: HalfDay,
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.half_day)
    }
}

/// An invigilator and the rules restricting where they may be placed.
#[derive(Debug, Clone, PartialEq)]
pub struct Teacher {
    pub no: String,
    pub name: String,
    pub must_subjects: Option<Vec<String>>,
    pub forbidden_subjects: Option<Vec<String>>,
    pub must_rooms: Option<Vec<String>>,
    pub forbidden_rooms: Option<Vec<String>>,
    pub times_limit: u32,
}

impl Teacher {
    /// Builds a teacher from `(no, name, s_y, s_n, r_y, r_n, times_limit)`.
    ///
    /// Rows whose name cell is not a non-empty string yield `Ok(None)` and
    /// are left out of the model.
    pub fn from_record(row: usize, record: &[Value]) -> Result<Option<Teacher>> {
        let Some(name) = record.get(1).and_then(cell_name) else {
            return Ok(None);
        };
        check_arity("teacher", row, record, TEACHER_ARITY)?;
        let times_limit = cell_count(&record[6]).map_err(|reason| InvigilationError::MalformedRecord {
            kind: "teacher",
            row,
            reason: format!("times limit: {reason}"),
        })?;

        Ok(Some(Teacher {
            no: cell_text(&record[0]),
            name,
            must_subjects: cell_list(&record[2]),
            forbidden_subjects: cell_list(&record[3]),
            must_rooms: cell_list(&record[4]),
            forbidden_rooms: cell_list(&record[5]),
            times_limit,
        }))
    }
}

impl fmt::Display for Teacher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T({} {} {})", self.no, self.name, self.times_limit)
    }
}

/// An exam sitting. `date` is always `YYYYMMDD`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub code: String,
    pub name: String,
    pub date: String,
    pub time: String,
}

impl Subject {
    /// Builds a subject from `(code, name, date, time_range)`.
    pub fn from_record(row: usize, record: &[Value]) -> Result<Subject> {
        check_arity("subject", row, record, SUBJECT_ARITY)?;
        let malformed = |reason: &str| InvigilationError::MalformedRecord {
            kind: "subject",
            row,
            reason: reason.to_string(),
        };
        let name = cell_name(&record[1]).ok_or_else(|| malformed("missing name"))?;
        let date = normalize_date(&record[2]).ok_or_else(|| InvigilationError::InvalidDate {
            subject: name.clone(),
            value: cell_text(&record[2]),
        })?;
        let time = record[3]
            .as_str()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| malformed("time range is not text"))?;

        Ok(Subject {
            code: cell_text(&record[0]),
            name,
            date,
            time,
        })
    }

    /// AM if the exam ends before 13:00, PM if it starts after 13:xx.
    pub fn half_day(&self) -> Result<HalfDay> {
        classify_time_range(&self.time).ok_or_else(|| InvigilationError::TimeRange {
            subject: self.name.clone(),
            time: self.time.clone(),
        })
    }

    pub fn session(&self) -> Result<Session> {
        Ok(Session {
            date: self.date.clone(),
            half_day: self.half_day()?,
        })
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S({} {} {} {})", self.code, self.name, self.date, self.time)
    }
}

fn classify_time_range(time: &str) -> Option<HalfDay> {
    let sep = if time.contains('-') { '-' } else { '—' };
    let mut parts = time.split(sep);
    let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    let hour = |t: &str| t.trim().split(':').next()?.trim().parse::<u32>().ok();
    let (start, end) = (hour(start)?, hour(end)?);

    if end < 13 {
        Some(HalfDay::Am)
    } else if start > 13 {
        Some(HalfDay::Pm)
    } else {
        None
    }
}

/// Subject columns of the room sheet, shared read-only by every room row.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomLayout {
    pub subjects: Vec<String>,
}

impl RoomLayout {
    /// The first header cell labels the room-name column and is ignored.
    pub fn from_header(header: &[Value]) -> Result<RoomLayout> {
        let subjects = header
            .iter()
            .skip(1)
            .enumerate()
            .map(|(col, cell)| {
                cell_name(cell).ok_or_else(|| InvigilationError::MalformedRecord {
                    kind: "room header",
                    row: 0,
                    reason: format!("column {} has no subject name", col + 1),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        // a repeated column would silently overwrite the earlier count
        if let Some(name) = subjects.iter().duplicates().next() {
            return Err(InvigilationError::DuplicateName {
                kind: "room column",
                name: name.clone(),
            });
        }
        Ok(RoomLayout { subjects })
    }
}

/// An exam room and how many invigilators each subject needs in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub name: String,
    pub required: HashMap<String, u32>,
}

impl Room {
    pub fn from_record(row: usize, record: &[Value], layout: &RoomLayout) -> Result<Room> {
        check_arity("room", row, record, layout.subjects.len() + 1)?;
        let malformed = |reason: String| InvigilationError::MalformedRecord { kind: "room", row, reason };
        let name = cell_name(&record[0]).ok_or_else(|| malformed("missing name".to_string()))?;

        let mut required = HashMap::with_capacity(layout.subjects.len());
        for (subject, cell) in layout.subjects.iter().zip(&record[1..]) {
            let count = match cell {
                Value::Null => 0,
                Value::String(s) if s.trim().is_empty() => 0,
                other => cell_count(other).map_err(|reason| malformed(format!("{subject}: {reason}")))?,
            };
            required.insert(subject.clone(), count);
        }
        Ok(Room { name, required })
    }

    pub fn required_for(&self, subject: &str) -> Option<u32> {
        self.required.get(subject).copied()
    }
}

/// The three entity sets of one solve, in sheet order.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    pub teachers: Vec<Teacher>,
    pub subjects: Vec<Subject>,
    pub rooms: Vec<Room>,
}

/// The room sheet: a header naming the subject columns plus one row per room.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoomTable {
    pub header: Vec<Value>,
    pub rows: Vec<Record>,
}

/// The complete input of one solve.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulingInput {
    pub teachers: Vec<Record>,
    pub subjects: Vec<Record>,
    pub rooms: RoomTable,
    #[serde(default)]
    pub options: Option<ModelOptions>,
}

impl SchedulingInput {
    pub fn entities(&self) -> Result<Entities> {
        let mut teachers = Vec::with_capacity(self.teachers.len());
        for (row, record) in self.teachers.iter().enumerate() {
            match Teacher::from_record(row + 1, record)? {
                Some(teacher) => teachers.push(teacher),
                None => debug!("skipping teacher row {} without a name", row + 1),
            }
        }
        let subjects = self
            .subjects
            .iter()
            .enumerate()
            .map(|(row, record)| Subject::from_record(row + 1, record))
            .collect::<Result<Vec<_>>>()?;
        let layout = RoomLayout::from_header(&self.rooms.header)?;
        let rooms = self
            .rooms
            .rows
            .iter()
            .enumerate()
            .map(|(row, record)| Room::from_record(row + 1, record, &layout))
            .collect::<Result<Vec<_>>>()?;

        Ok(Entities {
            teachers,
            subjects,
            rooms,
        })
    }
}

/// One teacher invigilating one subject in one room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Assignment {
    pub subject: String,
    pub room: String,
    pub teacher: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Optimal,
    Infeasible,
}

/// The final output of the solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingOutput {
    pub status: Status,
    pub sessions_worked: u32,
    pub assignments: Vec<Assignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_view: Option<ReportTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_view: Option<ReportTable>,
}

fn check_arity(kind: &'static str, row: usize, record: &[Value], arity: usize) -> Result<()> {
    if record.len() == arity {
        return Ok(());
    }
    Err(InvigilationError::MalformedRecord {
        kind,
        row,
        reason: format!("expected {arity} cells, found {}", record.len()),
    })
}

fn cell_name(cell: &Value) -> Option<String> {
    cell.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Slash separated list; anything but text means the list is absent.
fn cell_list(cell: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = cell
        .as_str()?
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

fn cell_count(cell: &Value) -> std::result::Result<u32, String> {
    let value = match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(v as u32),
        _ => Err(format!("expected a non-negative integer, found {cell}")),
    }
}

fn normalize_date(cell: &Value) -> Option<String> {
    let text = match cell {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if n.is_u64() => n.to_string(),
        _ => return None,
    };
    let date = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
                .map(|dt| dt.date())
        })?;
    Some(date.format("%Y%m%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subject(time: &str) -> Subject {
        Subject {
            code: "M1".into(),
            name: "Math".into(),
            date: "20240607".into(),
            time: time.into(),
        }
    }

    #[test]
    fn test_half_day_classification() {
        assert_eq!(subject("08:30-10:30").half_day().unwrap(), HalfDay::Am);
        assert_eq!(subject("14:00-16:00").half_day().unwrap(), HalfDay::Pm);
        assert_eq!(subject("15:00—17:00").half_day().unwrap(), HalfDay::Pm);
        assert_eq!(subject("09:00 — 11:30").half_day().unwrap(), HalfDay::Am);
    }

    #[test]
    fn test_straddling_time_range_is_an_error() {
        let err = subject("11:00-14:00").half_day().unwrap_err();
        assert!(matches!(err, InvigilationError::TimeRange { ref time, .. } if time == "11:00-14:00"));
        // starting at 13:xx is neither clearly AM nor PM
        assert!(subject("13:30-15:00").half_day().is_err());
        assert!(subject("morning").half_day().is_err());
        assert!(subject("08:00-09:00-10:00").half_day().is_err());
    }

    #[test]
    fn test_subject_date_is_normalized() {
        for raw in [json!("2024-06-07"), json!("2024/06/07"), json!("2024-06-07 00:00:00"), json!(20240607)] {
            let s = Subject::from_record(1, &[json!("M1"), json!("Math"), raw, json!("08:30-10:30")]).unwrap();
            assert_eq!(s.date, "20240607");
        }
        let err = Subject::from_record(1, &[json!("M1"), json!("Math"), json!("June 7th"), json!("08:30-10:30")])
            .unwrap_err();
        assert!(matches!(err, InvigilationError::InvalidDate { .. }));
    }

    #[test]
    fn test_subject_arity_is_enforced() {
        let err = Subject::from_record(3, &[json!("M1"), json!("Math")]).unwrap_err();
        assert!(matches!(err, InvigilationError::MalformedRecord { kind: "subject", row: 3, .. }));
    }

    #[test]
    fn test_teacher_record_coercion() {
        let t = Teacher::from_record(
            1,
            &[json!(7), json!("Alice"), json!("Math / Physics"), Value::Null, json!(""), json!(101), json!("3")],
        )
        .unwrap()
        .unwrap();
        assert_eq!(t.no, "7");
        assert_eq!(t.must_subjects, Some(vec!["Math".to_string(), "Physics".to_string()]));
        assert_eq!(t.forbidden_subjects, None);
        assert_eq!(t.must_rooms, None);
        assert_eq!(t.forbidden_rooms, None);
        assert_eq!(t.times_limit, 3);
    }

    #[test]
    fn test_teacher_without_name_is_skipped() {
        let row = [json!(1), Value::Null, Value::Null, Value::Null, Value::Null, Value::Null, json!(2)];
        assert_eq!(Teacher::from_record(1, &row).unwrap(), None);
        assert_eq!(Teacher::from_record(2, &[json!(2), json!(42)]).unwrap(), None);
    }

    #[test]
    fn test_teacher_bad_times_limit_is_fatal() {
        let row = [json!(1), json!("Bob"), Value::Null, Value::Null, Value::Null, Value::Null, json!(1.5)];
        assert!(matches!(
            Teacher::from_record(4, &row),
            Err(InvigilationError::MalformedRecord { kind: "teacher", row: 4, .. })
        ));
    }

    #[test]
    fn test_room_uses_layout_columns() {
        let layout = RoomLayout::from_header(&[json!("room"), json!("Math"), json!("Physics")]).unwrap();
        let room = Room::from_record(1, &[json!("R101"), json!(2), Value::Null], &layout).unwrap();
        assert_eq!(room.required_for("Math"), Some(2));
        assert_eq!(room.required_for("Physics"), Some(0));
        assert_eq!(room.required_for("Chemistry"), None);

        assert!(Room::from_record(2, &[json!("R102"), json!(-1), json!(0)], &layout).is_err());
        assert!(Room::from_record(3, &[json!("R103"), json!(1)], &layout).is_err());
    }

    #[test]
    fn test_repeated_room_column_is_rejected() {
        let err = RoomLayout::from_header(&[json!("room"), json!("Math"), json!(" Math ")]).unwrap_err();
        assert!(matches!(
            err,
            InvigilationError::DuplicateName { kind: "room column", ref name } if name == "Math"
        ));

        let input: SchedulingInput = serde_json::from_value(json!({
            "teachers": [],
            "subjects": [["M1", "Math", "2024-06-07", "08:30-10:30"]],
            "rooms": { "header": ["room", "Math", "Math"], "rows": [["R101", 2, 0]] }
        }))
        .unwrap();
        assert!(matches!(input.entities(), Err(InvigilationError::DuplicateName { .. })));
    }

    #[test]
    fn test_input_entities_skip_nameless_teachers() {
        let input: SchedulingInput = serde_json::from_value(json!({
            "teachers": [
                [1, "Alice", null, null, null, null, 2],
                [2, null, null, null, null, null, null]
            ],
            "subjects": [["M1", "Math", "2024-06-07", "08:30-10:30"]],
            "rooms": { "header": ["room", "Math"], "rows": [["R101", 1]] }
        }))
        .unwrap();
        let entities = input.entities().unwrap();
        assert_eq!(entities.teachers.len(), 1);
        assert_eq!(entities.subjects.len(), 1);
        assert_eq!(entities.rooms[0].required_for("Math"), Some(1));
        assert!(input.options.is_none());
    }
}
