//! Search and aggregate statistics over the record store.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Number;

use crate::storage::{LocationKey, RecordStore, WeatherRecord};

/// Search criteria. `None` places no constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub conditions: Option<String>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
}

impl SearchFilter {
    pub fn matches(&self, record: &WeatherRecord) -> bool {
        if let Some(needle) = &self.conditions {
            if !record.conditions.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if self.min_temp.is_some_and(|min| record.temperature_value() < min) {
            return false;
        }
        if self.max_temp.is_some_and(|max| record.temperature_value() > max) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherStats {
    pub count: usize,
    pub avg_temperature: Option<f64>,
    /// Extremes are echoed in the form they were stored.
    pub min_temperature: Option<Number>,
    pub max_temperature: Option<Number>,
    pub avg_humidity: Option<f64>,
}

pub fn search(store: &RecordStore, filter: &SearchFilter) -> BTreeMap<LocationKey, WeatherRecord> {
    store
        .iter()
        .filter(|(_, record)| filter.matches(record))
        .map(|(key, record)| (key.clone(), record.clone()))
        .collect()
}

/// Aggregates over every record; all averages and extremes are `None` when
/// the store is empty.
pub fn statistics(store: &RecordStore) -> WeatherStats {
    let count = store.len();
    if count == 0 {
        return WeatherStats {
            count,
            avg_temperature: None,
            min_temperature: None,
            max_temperature: None,
            avg_humidity: None,
        };
    }

    let mut temp_sum = 0.0;
    let mut humidity_sum = 0.0;
    let mut min_temp: Option<&WeatherRecord> = None;
    let mut max_temp: Option<&WeatherRecord> = None;
    for (_, record) in store.iter() {
        let t = record.temperature_value();
        temp_sum += t;
        humidity_sum += record.humidity_value();
        if min_temp.map_or(true, |m| t < m.temperature_value()) {
            min_temp = Some(record);
        }
        if max_temp.map_or(true, |m| t > m.temperature_value()) {
            max_temp = Some(record);
        }
    }

    let n = count as f64;
    WeatherStats {
        count,
        avg_temperature: Some(temp_sum / n),
        min_temperature: min_temp.map(|r| r.temperature.clone()),
        max_temperature: max_temp.map(|r| r.temperature.clone()),
        avg_humidity: Some(humidity_sum / n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(records: &[(&str, i64, &str, i64)]) -> RecordStore {
        let mut store = RecordStore::new();
        for &(name, temperature, conditions, humidity) in records {
            store
                .create(name, WeatherRecord::new(temperature, conditions, humidity))
                .unwrap();
        }
        store
    }

    fn keys(results: &BTreeMap<LocationKey, WeatherRecord>) -> Vec<&str> {
        results.keys().map(LocationKey::as_str).collect()
    }

    #[test]
    fn search_without_filters_returns_everything() {
        let store = RecordStore::with_seed_data();
        let results = search(&store, &SearchFilter::default());
        assert_eq!(&results, store.get_all());
    }

    #[test]
    fn search_by_conditions_is_case_insensitive_substring() {
        let store = store_of(&[
            ("sunnycity", 30, "Sunny", 55),
            ("cloudycity", 18, "Partly Cloudy", 70),
            ("rainycity", 12, "Rainy", 85),
        ]);
        let filter = SearchFilter {
            conditions: Some("CLOUD".into()),
            ..SearchFilter::default()
        };
        assert_eq!(keys(&search(&store, &filter)), vec!["cloudycity"]);
    }

    #[test]
    fn search_by_temperature_bounds_is_inclusive() {
        let store = store_of(&[
            ("sunnycity", 30, "Sunny", 55),
            ("mildcity", 20, "Clear", 60),
            ("rainycity", 12, "Rainy", 85),
        ]);

        let min = SearchFilter {
            min_temp: Some(20.0),
            ..SearchFilter::default()
        };
        assert_eq!(keys(&search(&store, &min)), vec!["mildcity", "sunnycity"]);

        let max = SearchFilter {
            max_temp: Some(15.0),
            ..SearchFilter::default()
        };
        assert_eq!(keys(&search(&store, &max)), vec!["rainycity"]);

        let both = SearchFilter {
            min_temp: Some(12.0),
            max_temp: Some(20.0),
            ..SearchFilter::default()
        };
        assert_eq!(keys(&search(&store, &both)), vec!["mildcity", "rainycity"]);
    }

    #[test]
    fn zero_bound_is_a_real_constraint() {
        let store = store_of(&[("oslo", -5, "Snow", 90), ("cairo", 35, "Sunny", 20)]);
        let filter = SearchFilter {
            min_temp: Some(0.0),
            ..SearchFilter::default()
        };
        assert_eq!(keys(&search(&store, &filter)), vec!["cairo"]);
    }

    #[test]
    fn statistics_on_empty_store_are_absent() {
        let stats = statistics(&RecordStore::new());
        assert_eq!(
            stats,
            WeatherStats {
                count: 0,
                avg_temperature: None,
                min_temperature: None,
                max_temperature: None,
                avg_humidity: None,
            }
        );
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["avg_temperature"].is_null());
        assert_eq!(json["count"], 0);
    }

    #[test]
    fn statistics_over_all_records() {
        let store = store_of(&[
            ("alpha", 10, "Cold", 60),
            ("beta", 20, "Mild", 70),
            ("gamma", 30, "Hot", 80),
        ]);
        let stats = statistics(&store);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.avg_temperature, Some(20.0));
        assert_eq!(stats.min_temperature, Some(Number::from(10)));
        assert_eq!(stats.max_temperature, Some(Number::from(30)));
        assert_eq!(stats.avg_humidity, Some(70.0));
    }
}
