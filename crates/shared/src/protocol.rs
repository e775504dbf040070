use serde::{Deserialize, Serialize};

use crate::{
    domain::{Course, Grade},
    qpa::{QpaBreakdown, QpaSummary},
};

pub fn calculate_qpa_route() -> &'static str {
    "/calculate-qpa"
}

/// One `[units, letter]` pair on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeEntry(pub u32, pub String);

impl GradeEntry {
    pub fn new(units: u32, grade: Grade) -> Self {
        Self(units, grade.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculateQpaRequest {
    pub grades: Vec<GradeEntry>,
}

impl CalculateQpaRequest {
    pub fn from_courses<'a>(courses: impl IntoIterator<Item = &'a Course>) -> Self {
        Self {
            grades: courses
                .into_iter()
                .map(|course| GradeEntry::new(course.units, course.grade))
                .collect(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (u32, &str)> {
        self.grades
            .iter()
            .map(|GradeEntry(units, letter)| (*units, letter.as_str()))
    }
}

/// What the calculation service answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateQpaResponse {
    #[serde(rename = "QPA")]
    pub qpa: f64,
    #[serde(rename = "GPA")]
    pub gpa: f64,
    #[serde(rename = "totalUnits")]
    pub total_units: u64,
    #[serde(rename = "totalQualityPoints")]
    pub total_quality_points: f64,
}

impl From<QpaBreakdown> for CalculateQpaResponse {
    fn from(value: QpaBreakdown) -> Self {
        Self {
            qpa: value.summary.qpa,
            gpa: value.summary.gpa,
            total_units: value.summary.total_units,
            total_quality_points: value.total_quality_points,
        }
    }
}

/// Lenient reading of a calculation response.
///
/// Each value may arrive under either spelling; the upper-case/camel-case one
/// wins when both are present and a missing value reads as zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LenientQpaResponse {
    #[serde(rename = "QPA")]
    qpa_upper: Option<f64>,
    #[serde(rename = "qpa")]
    qpa_lower: Option<f64>,
    #[serde(rename = "GPA")]
    gpa_upper: Option<f64>,
    #[serde(rename = "gpa")]
    gpa_lower: Option<f64>,
    #[serde(rename = "totalUnits")]
    total_units_camel: Option<f64>,
    #[serde(rename = "total_units")]
    total_units_snake: Option<f64>,
}

impl LenientQpaResponse {
    pub fn into_summary(self) -> QpaSummary {
        let total_units = self
            .total_units_camel
            .or(self.total_units_snake)
            .filter(|units| units.is_finite() && *units > 0.0)
            .map(|units| units as u64)
            .unwrap_or(0);

        QpaSummary {
            qpa: self.qpa_upper.or(self.qpa_lower).unwrap_or(0.0),
            gpa: self.gpa_upper.or(self.gpa_lower).unwrap_or(0.0),
            total_units,
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
