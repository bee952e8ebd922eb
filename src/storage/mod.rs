pub mod record_store;

pub use record_store::{LocationKey, RecordPatch, RecordStore, StoreError, WeatherRecord};
