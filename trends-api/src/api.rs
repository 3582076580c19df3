use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Duration;
use common_store::EventStore;
use tracing::error;

use crate::aggregation::{self, DistributionCounts, RollingPoint};

pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub rolling_window: Duration,
}

pub fn apply_routes(parent: Router, state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/sentiment/distribution", get(sentiment_distribution_handler))
        .route("/topics/:topic/rolling_mean", get(rolling_mean_handler))
        .with_state(state);

    parent.nest("/api/v1", api_router)
}

async fn sentiment_distribution_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HashMap<i32, DistributionCounts>>, StatusCode> {
    match aggregation::sentiment_distribution(state.store.as_ref()).await {
        Ok(distribution) => Ok(Json(distribution)),
        Err(e) => {
            error!("distribution query failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn rolling_mean_handler(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<i32>,
) -> Result<Json<Vec<RollingPoint>>, StatusCode> {
    match aggregation::rolling_mean(state.store.as_ref(), topic, state.rolling_window).await {
        Ok(means) => Ok(Json(means)),
        Err(e) => {
            error!("rolling mean query failed for topic {}: {}", topic, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
