use shared::{
    error::ApiError,
    protocol::{CalculateQpaRequest, CalculateQpaResponse},
    qpa,
};

/// Validates a calculation request and computes its totals.
///
/// The request must carry at least one pair, every unit count must be
/// positive and every letter non-empty. Letters outside A-D are accepted and
/// earn no quality points.
pub fn calculate(request: &CalculateQpaRequest) -> Result<CalculateQpaResponse, ApiError> {
    if request.grades.is_empty() {
        return Err(ApiError::validation("grades list cannot be empty"));
    }

    for (index, (units, letter)) in request.entries().enumerate() {
        if units == 0 {
            return Err(ApiError::validation(format!(
                "grades[{index}]: units must be greater than zero"
            )));
        }
        if letter.trim().is_empty() {
            return Err(ApiError::validation(format!(
                "grades[{index}]: letter grade cannot be empty"
            )));
        }
    }

    Ok(qpa::calculate(request.entries()).into())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
