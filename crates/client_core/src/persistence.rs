use std::{collections::HashSet, sync::Arc};

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use shared::domain::{Course, CourseId, Grade, DEFAULT_UNITS};
use storage::SlotStore;
use tracing::{info, warn};

use crate::store::{IdAllocator, MAX_COURSE_ID};

pub const DEFAULT_SLOT_KEY: &str = "cmuQpaCourses";

/// Keeps the course list in one slot of a [`SlotStore`].
#[derive(Clone)]
pub struct CourseArchive {
    store: Arc<dyn SlotStore>,
    key: String,
}

impl CourseArchive {
    pub fn new(store: Arc<dyn SlotStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn with_default_key(store: Arc<dyn SlotStore>) -> Self {
        Self::new(store, DEFAULT_SLOT_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Overwrites the slot with the whole list.
    pub async fn save(&self, courses: &[Course]) -> Result<()> {
        let encoded = serde_json::to_string(courses).context("failed to encode courses")?;
        self.store.write_slot(&self.key, &encoded).await
    }

    /// Restores the list, falling back to [`default_seed`] when the slot is
    /// empty or unusable. Every returned id has been observed by `ids`.
    pub async fn load(&self, ids: &mut IdAllocator) -> Vec<Course> {
        let raw = match self.store.read_slot(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!(slot = %self.key, "no saved courses; starting from defaults");
                return default_seed(ids);
            }
            Err(error) => {
                warn!(slot = %self.key, error = %format!("{error:#}"), "failed to read saved courses");
                return default_seed(ids);
            }
        };

        match decode_courses(&raw, ids) {
            Ok(courses) => {
                info!(slot = %self.key, count = courses.len(), "restored saved courses");
                courses
            }
            Err(error) => {
                warn!(slot = %self.key, error = %format!("{error:#}"), "saved courses are malformed");
                default_seed(ids)
            }
        }
    }
}

pub fn default_seed(ids: &mut IdAllocator) -> Vec<Course> {
    vec![
        Course::new(ids.next_id(), "Code"),
        Course::new(ids.next_id(), "21-127"),
    ]
}

/// Parses a saved list, repairing records field by field.
///
/// Only a payload that is not a JSON array is an error. Missing or invalid
/// ids, and ids seen earlier in the list, are replaced with fresh ones.
pub fn decode_courses(raw: &str, ids: &mut IdAllocator) -> Result<Vec<Course>> {
    let value: Value = serde_json::from_str(raw).context("saved courses are not valid JSON")?;
    let Value::Array(entries) = value else {
        bail!("saved courses are not a JSON array");
    };

    let empty = Map::new();
    let records: Vec<&Map<String, Value>> = entries
        .iter()
        .map(|entry| entry.as_object().unwrap_or(&empty))
        .collect();

    // Fresh ids must not collide with explicit ones further down the list.
    for record in &records {
        if let Some(id) = record.get("id").and_then(saved_id) {
            ids.observe(id);
        }
    }

    let mut seen = HashSet::with_capacity(records.len());
    let courses = records
        .into_iter()
        .map(|record| {
            let id = match record.get("id").and_then(saved_id) {
                Some(id) if seen.insert(id) => id,
                _ => {
                    let fresh = ids.next_id();
                    seen.insert(fresh);
                    fresh
                }
            };
            Course {
                id,
                code: record
                    .get("code")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                units: record
                    .get("units")
                    .and_then(saved_units)
                    .unwrap_or(DEFAULT_UNITS),
                grade: record
                    .get("grade")
                    .and_then(Value::as_str)
                    .and_then(|letter| letter.parse::<Grade>().ok())
                    .unwrap_or_default(),
                active: record
                    .get("active")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
            }
        })
        .collect();

    Ok(courses)
}

fn saved_id(value: &Value) -> Option<CourseId> {
    let id = match value.as_i64() {
        Some(id) => id,
        None => {
            let float = value.as_f64()?;
            if float.fract() != 0.0 || float < 1.0 || float >= i64::MAX as f64 {
                return None;
            }
            float as i64
        }
    };
    (1..=MAX_COURSE_ID).contains(&id).then_some(CourseId(id))
}

fn saved_units(value: &Value) -> Option<u32> {
    if let Some(units) = value.as_u64() {
        return Some(u32::try_from(units).unwrap_or(u32::MAX));
    }
    let units = value.as_f64()?;
    if !units.is_finite() {
        return None;
    }
    Some(units.clamp(0.0, f64::from(u32::MAX)) as u32)
}

#[cfg(test)]
#[path = "tests/persistence_tests.rs"]
mod tests;
