//! HTTP server exposing the recommendation proxy.
//!
//! Routes:
//! - `GET /health`
//! - `POST /api/generate`
//! - `POST /api/generate-filtered`

use crate::error::ShopFilterError;
use crate::recommend::{
    FilteredRecommendationRequest, FilteredRecommendationResponse, GenerateRequest,
    GenerateResponse, RecommendationService,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared handler state
pub struct AppState {
    pub service: RecommendationService,
}

/// Build the application router.
pub fn router(service: RecommendationService) -> Router {
    let state = Arc::new(AppState { service });

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/generate-filtered", post(generate_filtered_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, service: RecommendationService) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, model = %service.default_model(), "Listening");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Health check endpoint
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn generate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.service.generate(request).await?;
    Ok(Json(response))
}

async fn generate_filtered_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FilteredRecommendationRequest>, JsonRejection>,
) -> Result<Json<FilteredRecommendationResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.service.generate_filtered(request).await?;
    Ok(Json(response))
}

/// Error response: 400 `{error}` for bad input, 500 `{error, details}` otherwise.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Upstream(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<ShopFilterError> for ApiError {
    fn from(err: ShopFilterError) -> Self {
        match err {
            ShopFilterError::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                warn!(error = %msg, "Rejected request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorBody {
                        error: msg,
                        details: None,
                    },
                )
            }
            ApiError::Upstream(details) => {
                error!(error = %details, "Generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Failed to generate response".to_string(),
                        details: Some(details),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmClient, LlmConfig};
    use serde_json::{json, Value};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serve the router on an ephemeral port backed by a mocked provider.
    async fn spawn_app(provider: &MockServer) -> String {
        let config = LlmConfig {
            base_url: provider.uri(),
            ..LlmConfig::new("test-key")
        };
        let service = RecommendationService::new(LlmClient::new(config).expect("client"));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router(service)).await;
        });
        format!("http://{}", addr)
    }

    async fn provider_replying(status: u16, body: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_health() {
        let provider = MockServer::start().await;
        let base = spawn_app(&provider).await;

        let response = reqwest::get(format!("{}/health", base)).await.expect("request");
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("json");
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_generate_ok() {
        let provider =
            provider_replying(200, json!({"choices": [{"message": {"content": "hello back"}}]})).await;
        let base = spawn_app(&provider).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/generate", base))
            .json(&json!({"prompt": "hello", "model": "my-model"}))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("json");
        assert_eq!(body["text"], "hello back");
        assert_eq!(body["model"], "my-model");
        assert_eq!(body["prompt"], "hello");
    }

    #[tokio::test]
    async fn test_generate_missing_prompt_is_400() {
        let provider = MockServer::start().await;
        let base = spawn_app(&provider).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/generate", base))
            .json(&json!({"model": "my-model"}))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.expect("json");
        assert_eq!(body["error"], "Prompt is required");
    }

    #[tokio::test]
    async fn test_generate_filtered_ok() {
        let provider =
            provider_replying(200, json!({"choices": [{"message": {"content": "{}"}}]})).await;
        let base = spawn_app(&provider).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/generate-filtered", base))
            .json(&json!({
                "current_query": "running shoes",
                "past_queries": ["trail shoes"],
                "filters_applied": {"brands": [{"id": "310579", "name": "Nike", "selected": true}]}
            }))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("json");
        assert_eq!(body["text"], "{}");
        assert_eq!(body["current_query"], "running shoes");
        assert_eq!(body["past_queries"], json!(["trail shoes"]));
        assert_eq!(body["filters_applied"]["brands"][0]["id"], "310579");
        assert!(body["prompt"]
            .as_str()
            .expect("prompt string")
            .contains("1. trail shoes"));
    }

    #[tokio::test]
    async fn test_generate_filtered_missing_query_is_400() {
        let provider = MockServer::start().await;
        let base = spawn_app(&provider).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/generate-filtered", base))
            .json(&json!({"past_queries": []}))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let provider = MockServer::start().await;
        let base = spawn_app(&provider).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/generate-filtered", base))
            .header("content-type", "application/json")
            .body(r#"{"current_query": "x", "filters_applied": {"customerReviews": [{"stars": 11}]}}"#)
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.expect("json");
        assert!(body["error"]
            .as_str()
            .expect("error string")
            .starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500() {
        let provider =
            provider_replying(503, json!({"error": {"message": "model overloaded"}})).await;
        let base = spawn_app(&provider).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/generate-filtered", base))
            .json(&json!({"current_query": "jeans"}))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 500);
        let body: Value = response.json().await.expect("json");
        assert_eq!(body["error"], "Failed to generate response");
        assert!(body["details"]
            .as_str()
            .expect("details string")
            .contains("model overloaded"));
    }
}
