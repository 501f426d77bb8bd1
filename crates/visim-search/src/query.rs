//! Vectorizable image queries and top-k search.

use std::collections::HashMap;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::client::SearchClient;
use crate::error::Result;
use crate::schema::VECTOR_FIELD;
use crate::TRACING_TARGET;

/// Default number of nearest neighbors per vector query.
pub const DEFAULT_NEIGHBORS: u32 = 2;

/// Default result-set bound forwarded to the service.
pub const DEFAULT_TOP: u32 = 10;

/// A single vectorizable image query.
///
/// Carries the raw image as base64; the service vectorizes it with the
/// index's configured vectorizer before running the nearest-neighbor search.
/// Constructed fresh per search call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorQuery {
    kind: String,
    base64_image: String,
    fields: String,
    k: u32,
}

impl VectorQuery {
    /// Wraps already base64-encoded image bytes into a query against the
    /// image vector field.
    pub fn from_base64(base64_image: impl Into<String>, k: u32) -> Self {
        Self {
            kind: "imageBinary".to_owned(),
            base64_image: base64_image.into(),
            fields: VECTOR_FIELD.to_owned(),
            k,
        }
    }

    /// Wraps raw image bytes, encoding them as base64.
    pub fn from_bytes(image: &[u8], k: u32) -> Self {
        Self::from_base64(BASE64.encode(image), k)
    }

    /// Returns the base64 payload.
    pub fn base64_image(&self) -> &str {
        &self.base64_image
    }

    /// Returns the requested neighbor count.
    pub fn k(&self) -> u32 {
        self.k
    }
}

/// One ranked document returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Relevance score assigned by the service.
    #[serde(rename = "@search.score")]
    pub score: f64,
    /// Key of the matched document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Source blob URI of the matched image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_storage_path: Option<String>,
    /// Any further retrievable fields of the index schema.
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    vector_queries: &'a [VectorQuery],
    top: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<SearchHit>,
}

/// Issues vector searches against one index.
#[derive(Debug, Clone)]
pub struct QueryService {
    client: SearchClient,
    index_name: String,
}

impl QueryService {
    /// Creates a query service bound to the given index.
    pub fn new(client: SearchClient, index_name: impl Into<String>) -> Self {
        Self {
            client,
            index_name: index_name.into(),
        }
    }

    /// Reads the image at `path` and wraps it into a vector query requesting
    /// `k` nearest neighbors.
    ///
    /// The file is read fully into memory and base64-encoded; decoding the
    /// payload reproduces the original bytes exactly. Fails with an I/O
    /// error when the path is missing or unreadable.
    pub async fn embed_image(&self, path: impl AsRef<Path>, k: u32) -> Result<VectorQuery> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path.display(),
            bytes = bytes.len(),
            k,
            "Image loaded for vector query"
        );

        Ok(VectorQuery::from_bytes(&bytes, k))
    }

    /// Sends the vector queries to the index and returns the matched
    /// documents in the service's relevance order.
    ///
    /// `top` bounds the result set; it is forwarded to and enforced by the
    /// service. No local re-ranking, filtering, or pagination happens here.
    pub async fn search(&self, queries: &[VectorQuery], top: u32) -> Result<Vec<SearchHit>> {
        let request = SearchRequest {
            vector_queries: queries,
            top,
        };

        let response: SearchResponse = self
            .client
            .post_json(
                &["indexes", &self.index_name, "docs", "search"],
                &request,
            )
            .await?;

        tracing::debug!(
            target: TRACING_TARGET,
            index = %self.index_name,
            queries = queries.len(),
            hits = response.value.len(),
            "Search completed"
        );

        Ok(response.value)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use url::Url;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::SearchClientConfig;
    use crate::error::SearchError;

    fn service_for(server: &MockServer) -> QueryService {
        let endpoint = Url::parse(&server.uri()).unwrap();
        let client = SearchClient::new(SearchClientConfig::new(endpoint, "query-key")).unwrap();
        QueryService::new(client, "demo-index")
    }

    #[tokio::test]
    async fn embed_image_round_trips_through_base64() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(10 * 1024).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let server = MockServer::start().await;
        let service = service_for(&server);

        let query = service.embed_image(file.path(), 2).await.unwrap();
        let decoded = BASE64.decode(query.base64_image()).unwrap();

        assert_eq!(decoded, bytes);
        assert_eq!(query.k(), 2);
    }

    #[tokio::test]
    async fn embed_image_missing_path_is_io_error() {
        let server = MockServer::start().await;
        let service = service_for(&server);

        let error = service
            .embed_image("/nonexistent/fixture.png", 2)
            .await
            .unwrap_err();
        assert!(matches!(error, SearchError::Io(_)));
    }

    #[tokio::test]
    async fn search_preserves_service_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/demo-index/docs/search"))
            .and(body_partial_json(serde_json::json!({ "top": 10 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    {
                        "@search.score": 0.92,
                        "document_id": "a1",
                        "metadata_storage_path": "https://blobs.example.net/screens/a1.png",
                    },
                    {
                        "@search.score": 0.87,
                        "document_id": "b2",
                        "metadata_storage_path": "https://blobs.example.net/screens/b2.png",
                    },
                ],
            })))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let queries = vec![VectorQuery::from_bytes(b"png bytes", 2)];
        let hits = service.search(&queries, 10).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert!(hits.len() <= 2, "no more hits than the neighbor count");
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].document_id.as_deref(), Some("a1"));
    }

    #[test]
    fn query_wire_shape() {
        let query = VectorQuery::from_bytes(b"abc", 3);
        let json = serde_json::to_value(&query).unwrap();

        assert_eq!(json["kind"], "imageBinary");
        assert_eq!(json["fields"], "image_vector");
        assert_eq!(json["k"], 3);
        assert_eq!(json["base64Image"], BASE64.encode(b"abc"));
    }
}
