//! Validated problem instance with every entity addressed by a dense index.
//!
//! Names are resolved exactly once here; the model builder and the
//! projector only ever see indices.

use crate::data::{Entities, Room, Session, Subject, Teacher};
use crate::error::{InvigilationError, Result};
use itertools::Itertools;
use log::{debug, trace};
use std::collections::HashMap;
use std::ops::Range;

// Type aliases for clarity
pub type SubjectId = usize;
pub type RoomId = usize;
pub type TeacherId = usize;
pub type SessionId = usize;

/// A teacher's lists resolved to indices. An empty list means no rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Eligibility {
    pub must_subjects: Vec<SubjectId>,
    pub forbidden_subjects: Vec<SubjectId>,
    pub must_rooms: Vec<RoomId>,
    pub forbidden_rooms: Vec<RoomId>,
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub teachers: Vec<Teacher>,
    pub subjects: Vec<Subject>,
    pub rooms: Vec<Room>,
    pub sessions: Vec<Session>,
    subject_session: Vec<SessionId>,
    /// subject-major: `required[s * rooms + r]`
    required: Vec<u32>,
    eligibility: Vec<Eligibility>,
}

impl Instance {
    pub fn new(entities: Entities) -> Result<Self> {
        let Entities {
            teachers,
            subjects,
            rooms,
        } = entities;

        let subject_idx = index_names("subject", subjects.iter().map(|s| s.name.as_str()))?;
        let room_idx = index_names("room", rooms.iter().map(|r| r.name.as_str()))?;
        index_names("teacher", teachers.iter().map(|t| t.name.as_str()))?;

        // half-day classification must succeed before anything is modelled
        let mut sessions: Vec<Session> = Vec::new();
        let mut session_idx: HashMap<Session, SessionId> = HashMap::new();
        let mut subject_session = Vec::with_capacity(subjects.len());
        for subject in &subjects {
            trace!("{subject}");
            let session = subject.session()?;
            let id = *session_idx.entry(session.clone()).or_insert_with(|| {
                sessions.push(session);
                sessions.len() - 1
            });
            subject_session.push(id);
        }

        for room in &rooms {
            if let Some(unknown) = room.required.keys().find(|s| !subject_idx.contains_key(s.as_str())) {
                return Err(InvigilationError::UnknownSubject {
                    context: format!("room sheet column for {}", room.name),
                    name: unknown.clone(),
                });
            }
        }
        let mut required = Vec::with_capacity(subjects.len() * rooms.len());
        for subject in &subjects {
            for room in &rooms {
                let count = room
                    .required_for(&subject.name)
                    .ok_or_else(|| InvigilationError::MissingRequirement {
                        room: room.name.clone(),
                        subject: subject.name.clone(),
                    })?;
                required.push(count);
            }
        }

        let eligibility = teachers
            .iter()
            .inspect(|t| trace!("{t}"))
            .map(|t| resolve_eligibility(t, &subject_idx, &room_idx))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "instance: {} teachers, {} subjects, {} rooms, {} sessions",
            teachers.len(),
            subjects.len(),
            rooms.len(),
            sessions.len()
        );

        Ok(Instance {
            teachers,
            subjects,
            rooms,
            sessions,
            subject_session,
            required,
            eligibility,
        })
    }

    pub fn subject_ids(&self) -> Range<SubjectId> {
        0..self.subjects.len()
    }

    pub fn room_ids(&self) -> Range<RoomId> {
        0..self.rooms.len()
    }

    pub fn teacher_ids(&self) -> Range<TeacherId> {
        0..self.teachers.len()
    }

    pub fn session_ids(&self) -> Range<SessionId> {
        0..self.sessions.len()
    }

    pub fn session_of(&self, subject: SubjectId) -> SessionId {
        self.subject_session[subject]
    }

    pub fn subjects_in(&self, session: SessionId) -> impl Iterator<Item = SubjectId> + '_ {
        self.subject_ids().filter(move |&s| self.subject_session[s] == session)
    }

    /// Invigilators room `r` needs for subject `s`.
    pub fn required(&self, subject: SubjectId, room: RoomId) -> u32 {
        self.required[subject * self.rooms.len() + room]
    }

    pub fn total_required(&self) -> u64 {
        self.required.iter().map(|&n| u64::from(n)).sum()
    }

    pub fn eligibility(&self, teacher: TeacherId) -> &Eligibility {
        &self.eligibility[teacher]
    }
}

fn index_names<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>) -> Result<HashMap<String, usize>> {
    let mut idx = HashMap::new();
    for (i, name) in names.enumerate() {
        if idx.insert(name.to_string(), i).is_some() {
            return Err(InvigilationError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(idx)
}

fn resolve_eligibility(
    teacher: &Teacher,
    subject_idx: &HashMap<String, SubjectId>,
    room_idx: &HashMap<String, RoomId>,
) -> Result<Eligibility> {
    let subjects = |list: &Option<Vec<String>>| -> Result<Vec<SubjectId>> {
        list.iter()
            .flatten()
            .map(|name| {
                subject_idx
                    .get(name)
                    .copied()
                    .ok_or_else(|| InvigilationError::UnknownSubject {
                        context: format!("teacher {}", teacher.name),
                        name: name.clone(),
                    })
            })
            .process_results(|ids| ids.unique().collect())
    };
    let rooms = |list: &Option<Vec<String>>| -> Result<Vec<RoomId>> {
        list.iter()
            .flatten()
            .map(|name| {
                room_idx.get(name).copied().ok_or_else(|| InvigilationError::UnknownRoom {
                    context: format!("teacher {}", teacher.name),
                    name: name.clone(),
                })
            })
            .process_results(|ids| ids.unique().collect())
    };

    Ok(Eligibility {
        must_subjects: subjects(&teacher.must_subjects)?,
        forbidden_subjects: subjects(&teacher.forbidden_subjects)?,
        must_rooms: rooms(&teacher.must_rooms)?,
        forbidden_rooms: rooms(&teacher.forbidden_rooms)?,
    })
}
