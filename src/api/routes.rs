use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::error::AppError;
use crate::monitor::PerformanceStats;
use crate::query::{QueryEngine, QueryOptions, QueryResult};
use crate::types::MarketStats;

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<QueryEngine>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/query", post(post_query))
        .route("/stats/:location", get(get_location_stats))
        .route("/performance", get(get_performance).delete(clear_performance))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn post_query(
    State(state): State<ApiState>,
    Json(options): Json<QueryOptions>,
) -> Result<Json<QueryResult>, AppError> {
    Ok(Json(state.engine.execute_query(&options).await?))
}

async fn get_location_stats(
    State(state): State<ApiState>,
    Path(location): Path<String>,
) -> Result<Json<MarketStats>, AppError> {
    Ok(Json(state.engine.location_stats(&location).await?))
}

async fn get_performance(State(state): State<ApiState>) -> Json<PerformanceStats> {
    Json(state.engine.monitor().performance_stats())
}

async fn clear_performance(State(state): State<ApiState>) -> StatusCode {
    state.engine.monitor().reset();
    StatusCode::NO_CONTENT
}
