//! Credit-weighted grade average.
//!
//! This is the one definition of the calculation. The HTTP service answers
//! with it and clients fall back to it, so both paths agree to the digit.

use std::fmt;

use crate::domain::Grade;

/// Quality points for a letter grade. Letters outside A-D are worth nothing.
pub fn quality_points(letter: &str) -> f64 {
    letter
        .parse::<Grade>()
        .map(Grade::quality_points)
        .unwrap_or(0.0)
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QpaSummary {
    pub qpa: f64,
    pub gpa: f64,
    pub total_units: u64,
}

impl QpaSummary {
    pub fn zero() -> Self {
        Self::default()
    }
}

impl fmt::Display for QpaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QPA {:.2} | GPA {:.2} | Units {}",
            self.qpa, self.gpa, self.total_units
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QpaBreakdown {
    pub summary: QpaSummary,
    pub total_quality_points: f64,
}

/// Computes the weighted average over `(units, letter)` pairs.
///
/// GPA and QPA are the same metric; an empty or zero-unit input yields zero.
pub fn calculate<'a, I>(entries: I) -> QpaBreakdown
where
    I: IntoIterator<Item = (u32, &'a str)>,
{
    let mut total_units: u64 = 0;
    let mut total_quality_points = 0.0;

    for (units, letter) in entries {
        total_quality_points += quality_points(letter) * f64::from(units);
        total_units += u64::from(units);
    }

    let qpa = if total_units > 0 {
        round2(total_quality_points / total_units as f64)
    } else {
        0.0
    };

    QpaBreakdown {
        summary: QpaSummary {
            qpa,
            gpa: qpa,
            total_units,
        },
        total_quality_points,
    }
}

#[cfg(test)]
#[path = "tests/qpa_tests.rs"]
mod tests;
