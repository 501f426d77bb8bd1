//! Search route handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use visim_search::{QueryService, SearchHit, VectorQuery};

use crate::error::{ErrorKind, Result};
use crate::state::{AppState, QueryOptions};

/// Tracing target for search handlers.
const TRACING_TARGET: &str = "visim_server::handler";

/// Body of `POST /search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchImageRequest {
    /// Base64-encoded image bytes.
    pub image: String,
    /// Nearest neighbors per query; defaults to the configured count.
    #[serde(default)]
    pub k: Option<u32>,
    /// Result-set bound; defaults to the configured bound.
    #[serde(default)]
    pub top: Option<u32>,
}

/// Liveness response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Searches with the configured default image.
async fn search_default(
    State(query): State<QueryService>,
    State(options): State<Arc<QueryOptions>>,
) -> Result<Json<Vec<SearchHit>>> {
    tracing::debug!(
        target: TRACING_TARGET,
        image = %options.default_image.display(),
        "Default image search requested"
    );

    let vector_query = query
        .embed_image(&options.default_image, options.neighbors)
        .await?;
    let hits = query.search(&[vector_query], options.top).await?;

    Ok(Json(hits))
}

/// Searches with a caller-supplied image.
async fn search_image(
    State(query): State<QueryService>,
    State(options): State<Arc<QueryOptions>>,
    Json(request): Json<SearchImageRequest>,
) -> Result<Json<Vec<SearchHit>>> {
    // Reject payloads the service could not decode either.
    if BASE64.decode(&request.image).is_err() {
        return Err(ErrorKind::BadRequest
            .with_message("`image` is not valid base64"));
    }

    let k = request.k.unwrap_or(options.neighbors);
    let top = request.top.unwrap_or(options.top);

    tracing::debug!(
        target: TRACING_TARGET,
        payload_len = request.image.len(),
        k,
        top,
        "Image search requested"
    );

    let vector_query = VectorQuery::from_base64(request.image, k);
    let hits = query.search(&[vector_query], top).await?;

    Ok(Json(hits))
}

/// Liveness probe.
async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_owned(),
        }),
    )
}

/// Returns a [`Router`] with all search routes bound to the given state.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(search_default))
        .route("/search", post(search_image))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use axum_test::TestServer;
    use url::Url;
    use visim_search::{SearchClient, SearchClientConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::ErrorResponse;

    async fn stub_search(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/indexes/demo-index/docs/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    {
                        "@search.score": 0.9,
                        "document_id": "a1",
                        "metadata_storage_path": "https://blobs.example.net/a1.png",
                    },
                ],
            })))
            .mount(server)
            .await;
    }

    fn test_server(backend: &MockServer, options: QueryOptions) -> TestServer {
        let endpoint = Url::parse(&backend.uri()).unwrap();
        let client = SearchClient::new(SearchClientConfig::new(endpoint, "query-key")).unwrap();
        let state = AppState::new(QueryService::new(client, "demo-index"), options);
        TestServer::new(routes(state)).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let backend = MockServer::start().await;
        let server = test_server(&backend, QueryOptions::new("testimg.png"));

        let response = server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<HealthResponse>().status, "ok");
    }

    #[tokio::test]
    async fn search_accepts_uploaded_image() {
        let backend = MockServer::start().await;
        stub_search(&backend).await;
        let server = test_server(&backend, QueryOptions::new("testimg.png"));

        let response = server
            .post("/search")
            .json(&serde_json::json!({ "image": BASE64.encode(b"png bytes"), "k": 2 }))
            .await;

        response.assert_status_ok();
        let hits = response.json::<Vec<SearchHit>>();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn invalid_base64_is_rejected() {
        let backend = MockServer::start().await;
        let server = test_server(&backend, QueryOptions::new("testimg.png"));

        let response = server
            .post("/search")
            .json(&serde_json::json!({ "image": "not base64!!!" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().error, "bad_request");
    }

    #[tokio::test]
    async fn default_search_reads_configured_image() {
        let backend = MockServer::start().await;
        stub_search(&backend).await;

        let mut fixture = tempfile::NamedTempFile::new().unwrap();
        fixture.write_all(b"fixture png bytes").unwrap();

        let server = test_server(&backend, QueryOptions::new(fixture.path()));

        let response = server.get("/").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Vec<SearchHit>>().len(), 1);
    }

    #[tokio::test]
    async fn missing_default_image_is_not_found() {
        let backend = MockServer::start().await;
        let server = test_server(&backend, QueryOptions::new("/nonexistent/fixture.png"));

        let response = server.get("/").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
