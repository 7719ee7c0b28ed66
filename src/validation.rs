use chrono::{NaiveTime, Weekday};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("class name must not be empty")]
    EmptyName,
    #[error("unknown weekday label: {0}")]
    UnknownWeekday(String),
    #[error("time must be in HH:MM format, got: {0}")]
    InvalidTime(String),
}

pub fn validate_name(name: &str) -> Result<&str, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyName)
    } else {
        Ok(trimmed)
    }
}

/// Accepts short and full English labels plus the single-syllable Korean
/// labels the original bot commands used.
pub fn parse_weekday(label: &str) -> Result<Weekday, ValidationError> {
    let trimmed = label.trim();
    match trimmed.to_lowercase().as_str() {
        "mon" | "monday" | "월" => Ok(Weekday::Mon),
        "tue" | "tuesday" | "화" => Ok(Weekday::Tue),
        "wed" | "wednesday" | "수" => Ok(Weekday::Wed),
        "thu" | "thursday" | "목" => Ok(Weekday::Thu),
        "fri" | "friday" | "금" => Ok(Weekday::Fri),
        "sat" | "saturday" | "토" => Ok(Weekday::Sat),
        "sun" | "sunday" | "일" => Ok(Weekday::Sun),
        _ => Err(ValidationError::UnknownWeekday(trimmed.to_string())),
    }
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map_err(|_| ValidationError::InvalidTime(trimmed.to_string()))
}
