//! Meal store: owns the record list, persists after every mutation, and
//! derives today/weekly views.
//!
//! Persistence is at-least-once, not atomic: a failed write is logged and the
//! in-memory list stays authoritative for the session. Data may not survive a
//! restart after a write failure; that trade-off is deliberate.

pub mod storage;
pub mod types;

pub use storage::{JsonFileStore, MemoryStore, PersistedDocumentStore};
pub use types::{
  ExportDocument, ImportError, MealInput, MealPatch, MealRecord, MealType, WeeklyStats,
  EXPORT_VERSION,
};

use chrono::{Duration, Local, Utc};
use tracing::warn;

/// The record list plus its persistence backend.
///
/// Not safe for overlapping mutation from multiple callers; a single driver
/// issuing sequential calls is assumed. Wrap in a mutex before sharing.
pub struct MealStore<S: PersistedDocumentStore> {
  meals: Vec<MealRecord>,
  storage: S,
}

impl<S: PersistedDocumentStore> MealStore<S> {
  /// Load the store from persisted state.
  ///
  /// Missing or unreadable state yields an empty store - this is the only
  /// recovery path for corrupt persisted data, and it never fails.
  pub fn load(storage: S) -> Self {
    let meals = match storage.read() {
      Ok(Some(document)) => match serde_json::from_str(&document) {
        Ok(meals) => meals,
        Err(e) => {
          warn!("discarding unreadable meal list, starting empty: {}", e);
          Vec::new()
        }
      },
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!("failed to read persisted meals, starting empty: {}", e);
        Vec::new()
      }
    };

    Self { meals, storage }
  }

  /// All records in insertion order.
  pub fn meals(&self) -> &[MealRecord] {
    &self.meals
  }

  /// Records for display: most recent first, ties keep insertion order.
  pub fn sorted_for_display(&self) -> Vec<MealRecord> {
    let mut sorted = self.meals.clone();
    sorted.sort_by(|a, b| b.time.cmp(&a.time));
    sorted
  }

  /// Create a record with a fresh id, append it, and persist.
  pub fn add(&mut self, input: MealInput) -> MealRecord {
    let record = MealRecord {
      id: self.next_id(),
      name: input.name,
      meal_type: input.meal_type,
      time: input.time,
      description: input.description,
    };

    self.meals.push(record.clone());
    self.persist();
    record
  }

  /// Merge patch fields over the record with this id, keeping the id.
  ///
  /// An absent id is a silent no-op: nothing changes and nothing is reported.
  pub fn update(&mut self, id: &str, patch: MealPatch) {
    let Some(record) = self.meals.iter_mut().find(|m| m.id == id) else {
      return;
    };

    if let Some(name) = patch.name {
      record.name = name;
    }
    if let Some(meal_type) = patch.meal_type {
      record.meal_type = meal_type;
    }
    if let Some(time) = patch.time {
      record.time = time;
    }
    if let Some(description) = patch.description {
      record.description = Some(description);
    }

    self.persist();
  }

  /// Remove the record with this id, if any. Persists either way.
  pub fn delete(&mut self, id: &str) {
    self.meals.retain(|m| m.id != id);
    self.persist();
  }

  /// Drop every record and persist the empty list.
  pub fn clear(&mut self) {
    self.meals.clear();
    self.persist();
  }

  /// Wrap the current list for backup.
  pub fn export_snapshot(&self) -> ExportDocument {
    ExportDocument {
      meals: self.meals.clone(),
      export_date: Utc::now(),
      version: EXPORT_VERSION.to_string(),
    }
  }

  /// Replace the whole list from a backup file's content.
  ///
  /// A document without a well-formed `meals` array is rejected and the
  /// existing records are left untouched.
  pub fn import_snapshot(&mut self, data: &[u8]) -> Result<(), ImportError> {
    let document = ExportDocument::from_json(data)?;
    self.meals = document.meals;
    self.persist();
    Ok(())
  }

  /// Records whose time falls on the current calendar date, local time.
  pub fn today_meals(&self) -> Vec<MealRecord> {
    let today = Local::now().date_naive();
    self
      .meals
      .iter()
      .filter(|m| m.time.date() == today)
      .cloned()
      .collect()
  }

  /// Count and daily average over the trailing 7 days.
  pub fn weekly_stats(&self) -> WeeklyStats {
    let week_ago = Local::now().naive_local() - Duration::days(7);
    let total_meals = self.meals.iter().filter(|m| m.time >= week_ago).count();

    WeeklyStats {
      total_meals,
      average_per_day: (total_meals as f64 / 7.0 * 10.0).round() / 10.0,
    }
  }

  /// Epoch-millisecond id, bumped past any collision with a live record.
  fn next_id(&self) -> String {
    let mut candidate = Utc::now().timestamp_millis();
    while self.meals.iter().any(|m| m.id == candidate.to_string()) {
      candidate += 1;
    }
    candidate.to_string()
  }

  /// Serialize the full list and hand it to the backend.
  ///
  /// Failures are logged, not propagated: the in-memory list stays
  /// authoritative and the caller proceeds.
  fn persist(&self) {
    let document = match serde_json::to_string(&self.meals) {
      Ok(document) => document,
      Err(e) => {
        warn!("failed to serialize meal list, skipping persist: {}", e);
        return;
      }
    };

    if let Err(e) = self.storage.write(&document) {
      warn!("failed to persist meal list, in-memory state kept: {}", e);
    }
  }
}
