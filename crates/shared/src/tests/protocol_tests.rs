use super::*;
use crate::domain::CourseId;

#[test]
fn request_serializes_grades_as_pairs() {
    let mut second = Course::new(CourseId(3), "21-127");
    second.units = 9;
    second.grade = Grade::C;

    let request = CalculateQpaRequest::from_courses([&Course::new(CourseId(1), ""), &second]);
    let json = serde_json::to_value(&request).expect("json");
    assert_eq!(json, serde_json::json!({ "grades": [[12, "A"], [9, "C"]] }));
}

#[test]
fn request_parses_wire_pairs() {
    let request: CalculateQpaRequest =
        serde_json::from_str(r#"{"grades":[[12,"A"],[9,"B"]]}"#).expect("parse");
    let entries: Vec<_> = request.entries().collect();
    assert_eq!(entries, vec![(12, "A"), (9, "B")]);
}

#[test]
fn response_uses_service_field_names() {
    let response = CalculateQpaResponse {
        qpa: 3.5,
        gpa: 3.5,
        total_units: 24,
        total_quality_points: 84.0,
    };
    let json = serde_json::to_value(&response).expect("json");
    assert_eq!(
        json,
        serde_json::json!({
            "QPA": 3.5,
            "GPA": 3.5,
            "totalUnits": 24,
            "totalQualityPoints": 84.0
        })
    );
}

#[test]
fn lenient_response_accepts_either_spelling() {
    let upper: LenientQpaResponse =
        serde_json::from_str(r#"{"QPA":3.5,"GPA":3.5,"totalUnits":24}"#).expect("parse");
    let lower: LenientQpaResponse =
        serde_json::from_str(r#"{"qpa":2.0,"gpa":2.0,"total_units":9}"#).expect("parse");

    assert_eq!(
        upper.into_summary(),
        QpaSummary {
            qpa: 3.5,
            gpa: 3.5,
            total_units: 24
        }
    );
    assert_eq!(
        lower.into_summary(),
        QpaSummary {
            qpa: 2.0,
            gpa: 2.0,
            total_units: 9
        }
    );
}

#[test]
fn lenient_response_prefers_upper_case_and_defaults_missing() {
    let parsed: LenientQpaResponse =
        serde_json::from_str(r#"{"QPA":3.0,"qpa":1.0,"extra":true}"#).expect("parse");
    assert_eq!(
        parsed.into_summary(),
        QpaSummary {
            qpa: 3.0,
            gpa: 0.0,
            total_units: 0
        }
    );
}

#[test]
fn lenient_response_rejects_wrong_types() {
    assert!(serde_json::from_str::<LenientQpaResponse>(r#"{"QPA":"3.5"}"#).is_err());
}
