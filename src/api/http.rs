use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::sync::broadcast::Receiver as BroadcastReceiver;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::query::{self, SearchFilter, WeatherStats};
use crate::storage::{LocationKey, WeatherRecord};
use crate::validation::{validate_location_name, validate_weather_update, weather_record_from_payload};
use crate::AppState;

type JsonBody = Result<Json<Map<String, Value>>, JsonRejection>;
type LocationPath = Result<Path<String>, PathRejection>;
type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

#[derive(Debug, Default)]
pub struct SearchParams {
    pub conditions: Option<String>,
    pub min_temp: Option<String>,
    pub max_temp: Option<String>,
}

impl SearchParams {
    /// The first occurrence of a repeated key wins; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "conditions" => &mut params.conditions,
                "min_temp" => &mut params.min_temp,
                "max_temp" => &mut params.max_temp,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }

    /// Empty values count as absent; anything else must parse as a number.
    pub fn into_filter(self) -> Result<SearchFilter, ApiError> {
        Ok(SearchFilter {
            conditions: self.conditions.filter(|c| !c.is_empty()),
            min_temp: parse_bound(self.min_temp, "min_temp must be a number")?,
            max_temp: parse_bound(self.max_temp, "max_temp must be a number")?,
        })
    }
}

fn parse_bound(raw: Option<String>, reason: &'static str) -> Result<Option<f64>, ApiError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<f64>().map(Some).map_err(|_| ApiError::BadRequest(reason)),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/weather", get(list_weather).post(create_weather))
        .route("/weather/search", get(search_weather))
        .route("/weather/stats", get(weather_stats))
        .route(
            "/weather/:location",
            get(get_weather).put(update_weather).delete(delete_weather),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .fallback(not_found)
        .with_state(state)
}

pub async fn run(
    state: Arc<AppState>,
    addr: SocketAddr,
    mut shutdown: BroadcastReceiver<()>,
) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .context("server error")?;
    Ok(())
}

fn json_payload(body: JsonBody) -> Result<Map<String, Value>, ApiError> {
    body.map(|Json(map)| map).map_err(|rejection| {
        debug!(%rejection, "unreadable request body");
        ApiError::MalformedRequest
    })
}

fn location_param(path: LocationPath) -> Result<String, ApiError> {
    path.map(|Path(location)| location).map_err(|rejection| {
        debug!(%rejection, "unreadable location segment");
        ApiError::BadRequest("Invalid location in URL")
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

async fn list_weather(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<LocationKey, WeatherRecord>>, ApiError> {
    let store = state.store()?;
    Ok(Json(store.get_all().clone()))
}

async fn get_weather(
    State(state): State<Arc<AppState>>,
    location: LocationPath,
) -> Result<Json<WeatherRecord>, ApiError> {
    let location = location_param(location)?;
    let store = state.store()?;
    Ok(Json(store.get(&location)?.clone()))
}

async fn create_weather(
    State(state): State<Arc<AppState>>,
    body: JsonBody,
) -> Result<(StatusCode, Json<WeatherRecord>), ApiError> {
    let mut payload = json_payload(body)?;
    let location = match payload.remove("location") {
        Some(Value::String(name)) => LocationKey::new(&name),
        Some(_) => return Err(ApiError::BadRequest("Location must be a string")),
        None => return Err(ApiError::BadRequest("Location is required")),
    };
    validate_location_name(location.as_str())?;

    let mut store = state.store()?;
    if store.contains(location.as_str()) {
        return Err(ApiError::AlreadyExists);
    }
    let record = weather_record_from_payload(payload)?;
    let created = store.create(location.as_str(), record)?.clone();

    info!(%location, "weather record created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_weather(
    State(state): State<Arc<AppState>>,
    location: LocationPath,
    body: JsonBody,
) -> Result<Json<WeatherRecord>, ApiError> {
    let location = location_param(location)?;
    let payload = json_payload(body)?;

    let mut store = state.store()?;
    if !store.contains(&location) {
        return Err(ApiError::NotFound);
    }
    let patch = validate_weather_update(payload)?;
    let updated = store.update(&location, patch)?.clone();

    info!(location = %LocationKey::new(&location), "weather record updated");
    Ok(Json(updated))
}

async fn delete_weather(
    State(state): State<Arc<AppState>>,
    location: LocationPath,
) -> Result<StatusCode, ApiError> {
    let location = location_param(location)?;
    state.store()?.delete(&location)?;
    info!(location = %LocationKey::new(&location), "weather record deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn search_weather(
    State(state): State<Arc<AppState>>,
    params: QueryPairs,
) -> Result<Json<BTreeMap<LocationKey, WeatherRecord>>, ApiError> {
    let Query(pairs) = params.map_err(|rejection| {
        debug!(%rejection, "unreadable query string");
        ApiError::BadRequest("Invalid query string")
    })?;
    let filter = SearchParams::from_pairs(pairs).into_filter()?;
    let store = state.store()?;
    let results = query::search(&store, &filter);
    debug!(?filter, matched = results.len(), "search");
    Ok(Json(results))
}

async fn weather_stats(State(state): State<Arc<AppState>>) -> Result<Json<WeatherStats>, ApiError> {
    let store = state.store()?;
    Ok(Json(query::statistics(&store)))
}
