//! The ordered course list and every sanctioned way of changing it.

use chrono::Utc;
use shared::{
    domain::{Course, CourseId, Grade},
    error::UnknownGrade,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    UnknownGrade(#[from] UnknownGrade),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

/// Hands out course ids derived from the wall clock.
///
/// Ids are strictly increasing within a session even when several are
/// requested in the same millisecond, and never fall at or below an id that
/// was observed from saved data.
/// Largest id accepted from outside the allocator. Leaves room above it so
/// fresh ids can always be issued past any observed one.
pub const MAX_COURSE_ID: i64 = i64::MAX / 2;

#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    last: i64,
}

impl IdAllocator {
    pub fn next_id(&mut self) -> CourseId {
        let now = Utc::now().timestamp_millis();
        let id = now.max(self.last.saturating_add(1));
        self.last = id;
        CourseId(id)
    }

    pub fn observe(&mut self, id: CourseId) {
        self.last = self.last.max(id.0.min(MAX_COURSE_ID));
    }
}

/// Side effects the caller owes after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Effects {
    pub render: bool,
    pub persist: bool,
    pub recalculate: bool,
}

impl Effects {
    pub const NONE: Effects = Effects {
        render: false,
        persist: false,
        recalculate: false,
    };
    pub const ALL: Effects = Effects {
        render: true,
        persist: true,
        recalculate: true,
    };
    const PERSIST: Effects = Effects {
        render: false,
        persist: true,
        recalculate: false,
    };
    const PERSIST_AND_RECALCULATE: Effects = Effects {
        render: false,
        persist: true,
        recalculate: true,
    };
    const REORDERED: Effects = Effects {
        render: true,
        persist: true,
        recalculate: false,
    };

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseCommand {
    Add,
    Remove(CourseId),
    ToggleActive(CourseId),
    SetCode(CourseId, String),
    SetUnits(CourseId, i64),
    AdjustUnits(CourseId, i64),
    SetGrade(CourseId, String),
    Reorder(CourseId, usize),
    /// Drop `id` in front of the anchor, or at the end when there is none.
    ReorderBefore(CourseId, Option<CourseId>),
}

impl CourseCommand {
    /// Parses the terminal form of a command, e.g. `grade 1700000000000 B`.
    pub fn parse_line(line: &str) -> Result<Self, StoreError> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| StoreError::InvalidCommand("empty command".into()))?;

        let command = match verb {
            "add" => CourseCommand::Add,
            "rm" | "remove" => CourseCommand::Remove(parse_id(words.next())?),
            "toggle" => CourseCommand::ToggleActive(parse_id(words.next())?),
            "code" => {
                let id = parse_id(words.next())?;
                // Everything after the id, inner spacing preserved.
                let text = after_word(after_word(line));
                return Ok(CourseCommand::SetCode(id, text.to_string()));
            }
            "units" => {
                let id = parse_id(words.next())?;
                CourseCommand::SetUnits(id, parse_number(words.next())?)
            }
            "inc" => CourseCommand::AdjustUnits(parse_id(words.next())?, 1),
            "dec" => CourseCommand::AdjustUnits(parse_id(words.next())?, -1),
            "grade" => {
                let id = parse_id(words.next())?;
                let letter = words
                    .next()
                    .ok_or_else(|| StoreError::InvalidCommand("missing grade letter".into()))?;
                CourseCommand::SetGrade(id, letter.to_string())
            }
            "move" => {
                let id = parse_id(words.next())?;
                match words.next() {
                    Some("before") => {
                        CourseCommand::ReorderBefore(id, Some(parse_id(words.next())?))
                    }
                    Some("end") => CourseCommand::ReorderBefore(id, None),
                    raw => {
                        let index = usize::try_from(parse_number(raw)?.max(0)).unwrap_or(usize::MAX);
                        CourseCommand::Reorder(id, index)
                    }
                }
            }
            other => {
                return Err(StoreError::InvalidCommand(format!(
                    "unknown command '{other}'"
                )))
            }
        };

        if let Some(extra) = words.next() {
            return Err(StoreError::InvalidCommand(format!(
                "unexpected argument '{extra}'"
            )));
        }
        Ok(command)
    }
}

fn after_word(text: &str) -> &str {
    text.trim_start()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim_start())
        .unwrap_or_default()
}

fn parse_id(raw: Option<&str>) -> Result<CourseId, StoreError> {
    let raw = raw.ok_or_else(|| StoreError::InvalidCommand("missing course id".into()))?;
    raw.parse::<i64>()
        .map(CourseId)
        .map_err(|_| StoreError::InvalidCommand(format!("'{raw}' is not a course id")))
}

fn parse_number(raw: Option<&str>) -> Result<i64, StoreError> {
    let raw = raw.ok_or_else(|| StoreError::InvalidCommand("missing number".into()))?;
    raw.parse::<i64>()
        .map_err(|_| StoreError::InvalidCommand(format!("'{raw}' is not a number")))
}

fn clamp_units(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Owner of the course list.
///
/// Order only changes through [`CourseStore::reorder`] and
/// [`CourseStore::reorder_before`]; ids stay unique.
#[derive(Debug, Default)]
pub struct CourseStore {
    courses: Vec<Course>,
    ids: IdAllocator,
}

impl CourseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from an already de-duplicated list and the allocator
    /// that observed its ids.
    pub fn from_parts(courses: Vec<Course>, mut ids: IdAllocator) -> Self {
        for course in &courses {
            ids.observe(course.id);
        }
        debug_assert!(
            {
                let mut seen = std::collections::HashSet::new();
                courses.iter().all(|course| seen.insert(course.id))
            },
            "course ids must be unique"
        );
        Self { courses, ids }
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn get(&self, id: CourseId) -> Option<&Course> {
        self.courses.iter().find(|course| course.id == id)
    }

    pub fn position(&self, id: CourseId) -> Option<usize> {
        self.courses.iter().position(|course| course.id == id)
    }

    pub fn active_courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.iter().filter(|course| course.active)
    }

    fn get_mut(&mut self, id: CourseId) -> Option<&mut Course> {
        self.courses.iter_mut().find(|course| course.id == id)
    }

    pub fn apply(&mut self, command: CourseCommand) -> Result<Effects, StoreError> {
        let effects = match command {
            CourseCommand::Add => {
                self.add();
                Effects::ALL
            }
            CourseCommand::Remove(id) => self.remove(id),
            CourseCommand::ToggleActive(id) => self.toggle_active(id),
            CourseCommand::SetCode(id, text) => self.set_code(id, text),
            CourseCommand::SetUnits(id, value) => self.set_units(id, value),
            CourseCommand::AdjustUnits(id, delta) => self.adjust_units(id, delta),
            CourseCommand::SetGrade(id, letter) => self.set_grade(id, &letter)?,
            CourseCommand::Reorder(id, index) => self.reorder(id, index),
            CourseCommand::ReorderBefore(id, anchor) => self.reorder_before(id, anchor),
        };
        Ok(effects)
    }

    pub fn add(&mut self) -> CourseId {
        let id = self.ids.next_id();
        self.courses.push(Course::new(id, ""));
        id
    }

    pub fn remove(&mut self, id: CourseId) -> Effects {
        let Some(index) = self.position(id) else {
            return Effects::NONE;
        };
        self.courses.remove(index);
        Effects::ALL
    }

    pub fn toggle_active(&mut self, id: CourseId) -> Effects {
        let Some(course) = self.get_mut(id) else {
            return Effects::NONE;
        };
        course.active = !course.active;
        Effects::ALL
    }

    pub fn set_code(&mut self, id: CourseId, text: impl Into<String>) -> Effects {
        let Some(course) = self.get_mut(id) else {
            return Effects::NONE;
        };
        course.code = text.into();
        Effects::PERSIST
    }

    pub fn set_units(&mut self, id: CourseId, value: i64) -> Effects {
        let Some(course) = self.get_mut(id) else {
            return Effects::NONE;
        };
        course.units = clamp_units(value);
        Effects::ALL
    }

    /// Applies `delta` to the stored unit count, not to whatever a view shows.
    pub fn adjust_units(&mut self, id: CourseId, delta: i64) -> Effects {
        let Some(course) = self.get_mut(id) else {
            return Effects::NONE;
        };
        course.units = clamp_units(i64::from(course.units).saturating_add(delta));
        Effects::ALL
    }

    pub fn set_grade(&mut self, id: CourseId, letter: &str) -> Result<Effects, StoreError> {
        let grade: Grade = letter.parse()?;
        let Some(course) = self.get_mut(id) else {
            return Ok(Effects::NONE);
        };
        course.grade = grade;
        Ok(Effects::PERSIST_AND_RECALCULATE)
    }

    /// Takes the course out, then inserts it at `new_index` of the shortened
    /// list. Indices past the end append.
    pub fn reorder(&mut self, id: CourseId, new_index: usize) -> Effects {
        let Some(from) = self.position(id) else {
            return Effects::NONE;
        };
        let course = self.courses.remove(from);
        let index = new_index.min(self.courses.len());
        self.courses.insert(index, course);
        Effects::REORDERED
    }

    pub fn reorder_before(&mut self, id: CourseId, anchor: Option<CourseId>) -> Effects {
        if anchor == Some(id) {
            return Effects::NONE;
        }
        let Some(from) = self.position(id) else {
            return Effects::NONE;
        };
        let course = self.courses.remove(from);
        let index = anchor
            .and_then(|anchor| self.position(anchor))
            .unwrap_or(self.courses.len());
        self.courses.insert(index, course);
        Effects::REORDERED
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
