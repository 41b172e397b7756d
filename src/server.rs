use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::RecError;
use crate::recommenders::{KnnRecommender, RecommendOptions, Recommender};
use crate::types::{InputRatings, ItemSummary, Neighbor, Recommendation};

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<KnnRecommender>,
}

impl AppState {
    pub fn new(recommender: KnnRecommender) -> Self {
        Self {
            recommender: Arc::new(recommender),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RatingsPayload {
    #[serde(default)]
    pub ratings: InputRatings,
    pub k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SongsQuery {
    pub n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub users: usize,
    pub songs: usize,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<RecError> for AppError {
    fn from(err: RecError) -> Self {
        match err {
            RecError::InvalidInput(msg) | RecError::InvalidConfig(msg) => AppError::BadRequest(msg),
            other => AppError::Unexpected(other.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unexpected(err) => {
                tracing::error!("Internal Server Error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/songs", get(songs))
        .route("/recommend", post(recommend))
        .route("/neighbors", post(neighbors))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({ "message": "Song recommendation API", "status": "active" }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let index = state.recommender.index();
    Json(HealthResponse {
        status: "healthy",
        users: index.user_count(),
        songs: index.item_count(),
    })
}

async fn songs(State(state): State<AppState>, Query(query): Query<SongsQuery>) -> Json<Vec<ItemSummary>> {
    let n = query.n.unwrap_or(state.recommender.config().sample_size);
    Json(state.recommender.list_random_items(n))
}

async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<RatingsPayload>, JsonRejection>,
) -> Result<Json<Vec<Recommendation>>, AppError> {
    let Json(payload) = payload?;
    let options = RecommendOptions { k: payload.k };
    let recs = state.recommender.recommend(&payload.ratings, &options)?;
    tracing::debug!("Returning {} recommendations", recs.len());
    Ok(Json(recs))
}

async fn neighbors(
    State(state): State<AppState>,
    payload: Result<Json<RatingsPayload>, JsonRejection>,
) -> Result<Json<Vec<Neighbor>>, AppError> {
    let Json(payload) = payload?;
    if payload.ratings.is_empty() {
        return Err(AppError::BadRequest("no ratings were sent".to_string()));
    }
    let options = RecommendOptions { k: payload.k };
    Ok(Json(state.recommender.neighbors(&payload.ratings, &options)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::index::tests::record;
    use crate::index::RatingIndex;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let index: RatingIndex = vec![
            record(1, 1, 5.0, "Cumbia"),
            record(1, 2, 1.0, "Cumbia"),
            record(2, 1, 5.0, "Cumbia"),
            record(2, 3, 4.0, "Cumbia"),
            record(3, 4, 5.0, "Salsa"),
        ]
        .into_iter()
        .collect();
        let recommender = KnnRecommender::new(Arc::new(index), EngineConfig::default()).unwrap();
        router(AppState::new(recommender))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_recommend_endpoint() {
        let (status, body) = send(app(), post_json("/recommend", r#"{"ratings": {"1": 5, "2": 1}}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], 3);
        assert_eq!(body[0]["title"], "Song 3");
    }

    #[tokio::test]
    async fn test_recommend_without_ratings_is_bad_request() {
        let (status, body) = send(app(), post_json("/recommend", r#"{"ratings": {}}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_bad_request() {
        let (status, _) = send(app(), post_json("/recommend", r#"{"ratings": {"abc": "x"}}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_songs_endpoint() {
        let request = Request::get("/songs?n=2").body(Body::empty()).unwrap();
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (_, body) = send(app(), request).await;
        assert_eq!(body["users"], 3);
        assert_eq!(body["songs"], 4);
    }

    #[tokio::test]
    async fn test_neighbors_endpoint() {
        let (status, body) = send(app(), post_json("/neighbors", r#"{"ratings": {"1": 5}, "k": 2}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<u64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["user_id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
