//! Meal record types and the portable export document.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Version tag written into every export document.
pub const EXPORT_VERSION: &str = "1.0";

/// Meal category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
  Breakfast,
  Lunch,
  Dinner,
  Snack,
}

impl MealType {
  /// Human-readable label for list output.
  pub fn label(&self) -> &'static str {
    match self {
      MealType::Breakfast => "Breakfast",
      MealType::Lunch => "Lunch",
      MealType::Dinner => "Dinner",
      MealType::Snack => "Snack",
    }
  }
}

/// One logged eating event.
///
/// `id` is unique within the store for its lifetime. Records are replaced
/// wholesale on update; the id never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub meal_type: MealType,
  #[serde(with = "meal_time")]
  pub time: NaiveDateTime,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// Payload for creating a record. The store assigns the id.
#[derive(Debug, Clone)]
pub struct MealInput {
  pub name: String,
  pub meal_type: MealType,
  pub time: NaiveDateTime,
  pub description: Option<String>,
}

/// Partial update for an existing record. `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct MealPatch {
  pub name: Option<String>,
  pub meal_type: Option<MealType>,
  pub time: Option<NaiveDateTime>,
  pub description: Option<String>,
}

/// Derived weekly view: records from the trailing 7 days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeeklyStats {
  pub total_meals: usize,
  /// `total_meals / 7`, rounded to one decimal.
  pub average_per_day: f64,
}

/// Snapshot wrapper for backup and restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
  pub meals: Vec<MealRecord>,
  pub export_date: DateTime<Utc>,
  pub version: String,
}

impl ExportDocument {
  /// Decode a backup file.
  ///
  /// Only the `meals` field is required; `exportDate` and `version` are
  /// tolerated missing so older hand-edited backups still import.
  pub fn from_json(data: &[u8]) -> Result<Self, ImportError> {
    let value: Value = serde_json::from_slice(data).map_err(|_| ImportError::InvalidFormat)?;

    let meals = value
      .get("meals")
      .and_then(Value::as_array)
      .ok_or(ImportError::InvalidFormat)?;
    let meals: Vec<MealRecord> = meals
      .iter()
      .cloned()
      .map(serde_json::from_value)
      .collect::<Result<_, _>>()
      .map_err(|_| ImportError::InvalidFormat)?;

    let export_date = value
      .get("exportDate")
      .and_then(Value::as_str)
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|d| d.with_timezone(&Utc))
      .unwrap_or_else(Utc::now);
    let version = value
      .get("version")
      .and_then(Value::as_str)
      .unwrap_or(EXPORT_VERSION)
      .to_string();

    Ok(Self {
      meals,
      export_date,
      version,
    })
  }
}

/// Import failure surfaced to the user. The store is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportError {
  InvalidFormat,
}

impl fmt::Display for ImportError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ImportError::InvalidFormat => {
        write!(f, "invalid backup format: expected a document with a `meals` array")
      }
    }
  }
}

impl std::error::Error for ImportError {}

/// Serde codec for meal times.
///
/// Times come from a datetime-local style input and may omit seconds;
/// we always write them back with full seconds.
pub mod meal_time {
  use chrono::NaiveDateTime;
  use serde::{Deserialize, Deserializer, Serializer};

  const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
  const READ_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

  /// Parse a meal timestamp, with or without seconds.
  pub fn parse(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    READ_FORMATS
      .iter()
      .map(|fmt| NaiveDateTime::parse_from_str(s, fmt))
      .find(Result::is_ok)
      .unwrap_or_else(|| NaiveDateTime::parse_from_str(s, WRITE_FORMAT))
  }

  pub fn serialize<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.format(WRITE_FORMAT).to_string())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse(&s).map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn record_wire_format() {
    let record = MealRecord {
      id: "1700000000000".to_string(),
      name: "Oatmeal".to_string(),
      meal_type: MealType::Breakfast,
      time: meal_time::parse("2026-08-28T08:30").unwrap(),
      description: None,
    };

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["type"], "breakfast");
    assert_eq!(json["time"], "2026-08-28T08:30:00");
    // Optional note is omitted entirely, not serialized as null.
    assert!(json.get("description").is_none());
  }

  #[test]
  fn meal_time_accepts_minute_precision() {
    let a = meal_time::parse("2026-08-28T08:30").unwrap();
    let b = meal_time::parse("2026-08-28T08:30:00").unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn export_document_requires_meals_array() {
    assert_eq!(
      ExportDocument::from_json(br#"{"notMeals": []}"#).unwrap_err(),
      ImportError::InvalidFormat
    );
    assert_eq!(
      ExportDocument::from_json(br#"{"meals": 42}"#).unwrap_err(),
      ImportError::InvalidFormat
    );
    assert_eq!(
      ExportDocument::from_json(b"not json").unwrap_err(),
      ImportError::InvalidFormat
    );
  }

  #[test]
  fn export_document_tolerates_missing_envelope_fields() {
    let doc = ExportDocument::from_json(br#"{"meals": []}"#).unwrap();
    assert!(doc.meals.is_empty());
    assert_eq!(doc.version, EXPORT_VERSION);
  }
}
