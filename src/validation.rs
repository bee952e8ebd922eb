//! Validation of location names and weather payloads.
//!
//! Every check returns the first failing rule as a [`ValidationError`] whose
//! `Display` text is the reason shown to API clients.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::storage::{RecordPatch, WeatherRecord};

pub const MIN_LOCATION_LEN: usize = 2;
pub const MAX_LOCATION_LEN: usize = 50;

/// Required payload keys, in the order missing ones are reported.
pub const REQUIRED_FIELDS: [&str; 3] = ["temperature", "conditions", "humidity"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Location name contains invalid characters")]
    InvalidCharacters,

    #[error("Location name must be between 2 and 50 characters")]
    InvalidLength,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Temperature must be a number")]
    TemperatureNotNumber,

    #[error("Humidity must be a number")]
    HumidityNotNumber,

    #[error("Conditions must be a string")]
    ConditionsNotString,

    #[error("Humidity must be between 0 and 100")]
    HumidityOutOfRange,
}

fn is_location_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-'
}

/// Check a location name: charset first, then length after case-folding.
pub fn validate_location_name(location: &str) -> Result<(), ValidationError> {
    let normalized = location.to_lowercase();
    if normalized.is_empty() || !normalized.chars().all(is_location_char) {
        return Err(ValidationError::InvalidCharacters);
    }

    let len = normalized.chars().count();
    if !(MIN_LOCATION_LEN..=MAX_LOCATION_LEN).contains(&len) {
        return Err(ValidationError::InvalidLength);
    }

    Ok(())
}

/// Check a full weather payload. Keys outside [`REQUIRED_FIELDS`] are ignored.
pub fn validate_weather_data(payload: &Map<String, Value>) -> Result<(), ValidationError> {
    parse_weather_data(payload).map(|_| ())
}

/// Validate `payload` and build the record it describes, extra keys included.
pub fn weather_record_from_payload(mut payload: Map<String, Value>) -> Result<WeatherRecord, ValidationError> {
    let (temperature, conditions, humidity) = parse_weather_data(&payload)?;
    let conditions = conditions.to_owned();
    for field in REQUIRED_FIELDS {
        payload.remove(field);
    }
    Ok(WeatherRecord {
        temperature,
        conditions,
        humidity,
        extra: payload,
    })
}

/// Validate a partial update. Only fields that are present are checked, using
/// the same type and range rules as a full payload.
pub fn validate_weather_update(mut payload: Map<String, Value>) -> Result<RecordPatch, ValidationError> {
    let temperature = payload.get("temperature").map(temperature_of).transpose()?;
    let humidity = payload.get("humidity").map(humidity_of).transpose()?;
    let conditions = payload
        .get("conditions")
        .map(|v| conditions_of(v).map(str::to_owned))
        .transpose()?;
    if let Some(h) = &humidity {
        check_humidity_range(h)?;
    }

    for field in REQUIRED_FIELDS {
        payload.remove(field);
    }
    Ok(RecordPatch {
        temperature,
        conditions,
        humidity,
        extra: payload,
    })
}

fn parse_weather_data(payload: &Map<String, Value>) -> Result<(Number, &str, Number), ValidationError> {
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| !payload.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let temperature = temperature_of(&payload["temperature"])?;
    let humidity = humidity_of(&payload["humidity"])?;
    let conditions = conditions_of(&payload["conditions"])?;
    check_humidity_range(&humidity)?;

    Ok((temperature, conditions, humidity))
}

// Only `Value::Number` qualifies; booleans and numeric strings do not.
fn temperature_of(value: &Value) -> Result<Number, ValidationError> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        _ => Err(ValidationError::TemperatureNotNumber),
    }
}

fn humidity_of(value: &Value) -> Result<Number, ValidationError> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        _ => Err(ValidationError::HumidityNotNumber),
    }
}

fn conditions_of(value: &Value) -> Result<&str, ValidationError> {
    value.as_str().ok_or(ValidationError::ConditionsNotString)
}

fn check_humidity_range(humidity: &Number) -> Result<(), ValidationError> {
    match humidity.as_f64() {
        Some(h) if (0.0..=100.0).contains(&h) => Ok(()),
        _ => Err(ValidationError::HumidityOutOfRange),
    }
}
