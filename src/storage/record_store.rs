use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Case-folded location name used as the store key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One location's weather. Numbers keep the JSON form they were submitted in,
/// so `20` is echoed as `20` and large integers stay exact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRecord {
    pub temperature: Number,
    pub conditions: String,
    pub humidity: Number,
    /// Keys beyond the three known fields, kept as submitted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WeatherRecord {
    pub fn new(
        temperature: impl Into<Number>,
        conditions: impl Into<String>,
        humidity: impl Into<Number>,
    ) -> Self {
        Self {
            temperature: temperature.into(),
            conditions: conditions.into(),
            humidity: humidity.into(),
            extra: Map::new(),
        }
    }

    pub fn temperature_value(&self) -> f64 {
        as_float(&self.temperature)
    }

    pub fn humidity_value(&self) -> f64 {
        as_float(&self.humidity)
    }

    /// Merge the fields present in `patch`; absent fields keep their value.
    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(t) = patch.temperature {
            self.temperature = t;
        }
        if let Some(c) = patch.conditions {
            self.conditions = c;
        }
        if let Some(h) = patch.humidity {
            self.humidity = h;
        }
        self.extra.extend(patch.extra);
    }
}

// Every `Number` is representable as f64 unless serde_json's
// `arbitrary_precision` feature is on, which this crate does not enable.
fn as_float(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

/// Partial record produced by a validated update payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub temperature: Option<Number>,
    pub conditions: Option<String>,
    pub humidity: Option<Number>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("location not found: {0}")]
    NotFound(LocationKey),

    #[error("location already exists: {0}")]
    AlreadyExists(LocationKey),
}

/// In-memory weather records keyed by normalized location.
///
/// The store performs no validation; callers run the validators before
/// `create` and `update`.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: BTreeMap<LocationKey, WeatherRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self { records: BTreeMap::new() }
    }

    /// Store holding the three demonstration cities.
    pub fn with_seed_data() -> Self {
        let mut store = Self::new();
        for (name, record) in [
            ("new_york", WeatherRecord::new(20, "Partly Cloudy", 68)),
            ("london", WeatherRecord::new(15, "Rainy", 80)),
            ("tokyo", WeatherRecord::new(25, "Sunny", 50)),
        ] {
            store.records.insert(LocationKey::new(name), record);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, location: &str) -> bool {
        self.records.contains_key(&LocationKey::new(location))
    }

    pub fn get_all(&self) -> &BTreeMap<LocationKey, WeatherRecord> {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LocationKey, &WeatherRecord)> {
        self.records.iter()
    }

    pub fn get(&self, location: &str) -> Result<&WeatherRecord, StoreError> {
        let key = LocationKey::new(location);
        self.records.get(&key).ok_or(StoreError::NotFound(key))
    }

    pub fn create(&mut self, location: &str, record: WeatherRecord) -> Result<&WeatherRecord, StoreError> {
        let key = LocationKey::new(location);
        if self.records.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        Ok(self.records.entry(key).or_insert(record))
    }

    pub fn update(&mut self, location: &str, patch: RecordPatch) -> Result<&WeatherRecord, StoreError> {
        let key = LocationKey::new(location);
        match self.records.get_mut(&key) {
            Some(record) => {
                record.apply(patch);
                Ok(record)
            }
            None => Err(StoreError::NotFound(key)),
        }
    }

    pub fn delete(&mut self, location: &str) -> Result<WeatherRecord, StoreError> {
        let key = LocationKey::new(location);
        self.records.remove(&key).ok_or(StoreError::NotFound(key))
    }
}
