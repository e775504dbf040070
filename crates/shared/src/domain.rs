use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownGrade;

/// Unit count given to freshly added and repaired courses.
pub const DEFAULT_UNITS: u32 = 12;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CourseId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Grade {
    #[default]
    A,
    B,
    C,
    D,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::A, Grade::B, Grade::C, Grade::D];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }

    pub fn quality_points(self) -> f64 {
        match self {
            Grade::A => 4.0,
            Grade::B => 3.0,
            Grade::C => 2.0,
            Grade::D => 1.0,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = UnknownGrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            other => Err(UnknownGrade(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub units: u32,
    pub grade: Grade,
    pub active: bool,
}

impl Course {
    pub fn new(id: CourseId, code: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            units: DEFAULT_UNITS,
            grade: Grade::default(),
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_letters_round_trip_through_strings() {
        for grade in Grade::ALL {
            assert_eq!(grade.as_str().parse::<Grade>(), Ok(grade));
        }
    }

    #[test]
    fn unknown_grade_letters_are_rejected() {
        assert_eq!(
            "a".parse::<Grade>(),
            Err(UnknownGrade("a".to_string()))
        );
        assert!("B+".parse::<Grade>().is_err());
        assert!("".parse::<Grade>().is_err());
    }

    #[test]
    fn course_ids_serialize_as_plain_numbers() {
        let course = Course::new(CourseId(1_700_000_000_000), "21-127");
        let json = serde_json::to_value(&course).expect("json");
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1_700_000_000_000_i64,
                "code": "21-127",
                "units": 12,
                "grade": "A",
                "active": true
            })
        );
    }
}
