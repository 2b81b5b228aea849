//! Read-only JSON API over the published snapshot
//!
//! Every handler takes the current snapshot once and answers from it, so a
//! concurrent refresh never mixes two snapshots into one response.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::charts::{self, DisplayClock, GroupInfo, LineChart, NewsTable, TimeSlider, WordCloud};
use crate::config::DisplayConfig;
use crate::error::DashboardError;
use crate::models::{EntityType, Group, Metric};
use crate::snapshot::{Snapshot, SnapshotReader};
use crate::validation::InputValidator;

/// Shared handler state
pub struct ApiState {
    /// Latest published snapshot
    pub snapshots: SnapshotReader,
    /// Time shift, row limits and stop words
    pub display: DisplayConfig,
}

impl ApiState {
    #[must_use]
    pub const fn new(snapshots: SnapshotReader, display: DisplayConfig) -> Self {
        Self { snapshots, display }
    }

    fn clock(&self) -> DisplayClock {
        DisplayClock::new(self.display.timezone_offset_hours)
    }
}

/// Build the router with tracing and CORS layers
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/status", get(api_status))
        .route("/api/news", get(api_news))
        .route("/api/groups", get(api_groups))
        .route("/api/groups/{name}", get(api_group_info))
        .route("/api/groups/{name}/series/{metric}", get(api_group_series))
        .route("/api/groups/{name}/slider", get(api_group_slider))
        .route("/api/groups/{name}/entities", get(api_group_entities))
        .with_state(Arc::new(state))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

// --- Errors ---

/// Handler failure mapped to a status code and a JSON body
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or out-of-range input (400)
    BadRequest(String),
    /// Unknown group (404)
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };
        warn!(status = status.as_u16(), error = %error, "Rejected API request");
        (status, Json(ErrorBody { error })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn find_group<'a>(snapshot: &'a Snapshot, name: &str) -> Result<&'a Group, ApiError> {
    InputValidator::validate_group_name(name)?;
    charts::group_by_name(snapshot, name)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown group: {name}")))
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

// --- Query structs ---

#[derive(Debug, Deserialize)]
struct EntitiesQuery {
    #[serde(rename = "type")]
    entity_type: Option<String>,
    /// Epoch seconds of the displayed range start
    start: Option<i64>,
    /// Epoch seconds of the displayed range end
    end: Option<i64>,
}

// --- Responses ---

/// Body of `/api/status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// When the current snapshot was loaded
    pub loaded_at: DateTime<Utc>,
    /// Posts in the snapshot
    pub posts: usize,
    /// Groups in the snapshot
    pub groups: usize,
    /// Entities in the snapshot
    pub entities: usize,
}

/// Body of `/api/groups/{name}/entities`
#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    /// Display name of the group
    pub group: String,
    /// Type filter, `None` for all
    #[serde(rename = "type")]
    pub entity_type: Option<EntityType>,
    /// Entities matching the filter and range
    pub entity_count: usize,
    /// Word cloud with bar chart and treemap
    pub cloud: WordCloud,
}

// --- Handlers ---

async fn api_status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let snapshot = state.snapshots.current();
    let (posts, groups, entities) = snapshot.counts();
    Json(StatusResponse {
        loaded_at: snapshot.loaded_at,
        posts,
        groups,
        entities,
    })
}

async fn api_news(State(state): State<Arc<ApiState>>) -> Json<NewsTable> {
    let snapshot = state.snapshots.current();
    Json(charts::news_table(
        &snapshot,
        now(),
        state.display.news_rows,
        state.clock(),
    ))
}

async fn api_groups(State(state): State<Arc<ApiState>>) -> Json<Vec<Group>> {
    Json(state.snapshots.current().groups.clone())
}

async fn api_group_info(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> ApiResult<GroupInfo> {
    let snapshot = state.snapshots.current();
    let group = find_group(&snapshot, &name)?;
    Ok(Json(charts::group_info(&snapshot, group)))
}

async fn api_group_series(
    State(state): State<Arc<ApiState>>,
    Path((name, metric)): Path<(String, String)>,
) -> ApiResult<LineChart> {
    let metric: Metric = metric.parse()?;
    let snapshot = state.snapshots.current();
    let group = find_group(&snapshot, &name)?;
    let posts = charts::group_posts(&snapshot, group);
    Ok(Json(charts::line_chart(&posts, metric, now(), state.clock())))
}

async fn api_group_slider(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> ApiResult<Option<TimeSlider>> {
    let snapshot = state.snapshots.current();
    let group = find_group(&snapshot, &name)?;
    let posts = charts::group_posts(&snapshot, group);
    Ok(Json(charts::time_slider(&posts, state.clock())))
}

async fn api_group_entities(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
    Query(params): Query<EntitiesQuery>,
) -> ApiResult<EntitiesResponse> {
    let type_filter = InputValidator::parse_entity_filter(params.entity_type.as_deref())?;
    let clock = state.clock();
    let start = parse_epoch(params.start, "start")?;
    let end = parse_epoch(params.end, "end")?;
    if let (Some(start), Some(end)) = (start, end) {
        InputValidator::validate_date_range(start, end)?;
    }

    let snapshot = state.snapshots.current();
    let group = find_group(&snapshot, &name)?;
    let entities = charts::filter_entities(
        &snapshot,
        group,
        type_filter,
        start.map_or(NaiveDateTime::MIN, |t| clock.to_stored(t)),
        end.map_or(NaiveDateTime::MAX, |t| clock.to_stored(t)),
    );
    let cloud = charts::word_cloud(&entities, &state.display.stopwords, state.display.max_words);

    Ok(Json(EntitiesResponse {
        group: group.name.clone(),
        entity_type: type_filter,
        entity_count: entities.len(),
        cloud,
    }))
}

fn parse_epoch(secs: Option<i64>, field: &str) -> Result<Option<NaiveDateTime>, ApiError> {
    secs.map(|secs| {
        DisplayClock::from_epoch(secs)
            .ok_or_else(|| ApiError::BadRequest(format!("{field} is out of range: {secs}")))
    })
    .transpose()
}
