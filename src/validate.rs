use crate::error::{ClientError, ClientResult};
use chrono::NaiveDate;

pub const GRADE_MAX: f64 = 10.0;

/// Grade typed into a form. Lower bound exclusive, upper bound inclusive.
pub fn parse_grade(raw: &str) -> ClientResult<f64> {
    let out_of_range = || ClientError::validation("grade", "out_of_range");
    let value: f64 = raw.trim().parse().map_err(|_| out_of_range())?;
    if !value.is_finite() || value <= 0.0 || value > GRADE_MAX {
        return Err(out_of_range());
    }
    Ok(value)
}

pub fn required(field: &'static str, value: &str) -> ClientResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ClientError::validation(field, "required"));
    }
    Ok(v.to_string())
}

pub fn required_date(field: &'static str, value: &str) -> ClientResult<String> {
    let v = required(field, value)?;
    NaiveDate::parse_from_str(&v, "%Y-%m-%d")
        .map_err(|_| ClientError::validation(field, "invalid_date"))?;
    Ok(v)
}
