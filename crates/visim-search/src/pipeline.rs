//! Ingestion pipeline provisioning: data source, skillset, indexer.
//!
//! The required order is index, data source, skillset, indexer. Every create
//! is a PUT by name, so re-running provisioning updates resources in place.
//! Ordering violations fail with [`SearchError::Precondition`] instead of a
//! raw service error.

use serde::Serialize;
use serde_json::json;

use crate::client::SearchClient;
use crate::error::{Result, SearchError};
use crate::schema::{IndexSchema, VisionSettings, VISION_MODEL_VERSION};
use crate::TRACING_TARGET;

/// Derived names for all provisioned resources, from one base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    base: String,
}

impl ResourceNames {
    /// Creates resource names from a base name such as `design-helper`.
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Name of the search index.
    pub fn index(&self) -> String {
        format!("{}-index", self.base)
    }

    /// Name of the enrichment skillset.
    pub fn skillset(&self) -> String {
        format!("{}-skillset", self.base)
    }

    /// Name of the blob data source connection.
    pub fn data_source(&self) -> String {
        format!("{}-blob", self.index())
    }

    /// Name of the indexer.
    pub fn indexer(&self) -> String {
        format!("{}-indexer", self.index())
    }
}

/// Reference to a created data source connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceRef {
    /// Name the connection was registered under.
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldMapping {
    name: String,
    source: String,
}

impl FieldMapping {
    fn new(name: &str, source: &str) -> Self {
        Self {
            name: name.to_owned(),
            source: source.to_owned(),
        }
    }
}

/// Provisions the index and ingestion pipeline on the managed service.
///
/// Holds the reference to the data source it created, which is the
/// precondition for registering the indexer in the same process instance.
#[derive(Debug)]
pub struct Provisioner {
    client: SearchClient,
    names: ResourceNames,
    vision: VisionSettings,
    blob_connection_string: String,
    data_source: Option<DataSourceRef>,
}

impl Provisioner {
    /// Creates a provisioner for the given base name.
    pub fn new(
        client: SearchClient,
        names: ResourceNames,
        vision: VisionSettings,
        blob_connection_string: impl Into<String>,
    ) -> Self {
        Self {
            client,
            names,
            vision,
            blob_connection_string: blob_connection_string.into(),
            data_source: None,
        }
    }

    /// Returns the resource names this provisioner manages.
    pub fn names(&self) -> &ResourceNames {
        &self.names
    }

    /// Builds, validates, and registers the index definition.
    ///
    /// Create-or-update by name: re-invoking with an unchanged schema is a
    /// no-op on the service side.
    pub async fn create_index(&self) -> Result<IndexSchema> {
        let schema = IndexSchema::design(&self.names.index(), &self.vision);
        schema.validate()?;

        self.client
            .put_json(&["indexes", &schema.name], &schema)
            .await?;

        tracing::info!(
            target: TRACING_TARGET,
            index = %schema.name,
            "Index created"
        );

        Ok(schema)
    }

    /// Registers the blob data source connection.
    ///
    /// `folder` narrows ingestion to a virtual folder within the container.
    pub async fn create_data_source(
        &mut self,
        container: &str,
        folder: Option<&str>,
    ) -> Result<DataSourceRef> {
        let name = self.names.data_source();
        let body = json!({
            "name": name,
            "type": "azureblob",
            "credentials": { "connectionString": self.blob_connection_string },
            "container": { "name": container, "query": folder },
        });

        self.client.put_json(&["datasources", &name], &body).await?;

        tracing::info!(
            target: TRACING_TARGET,
            data_source = %name,
            container = %container,
            "Data source created"
        );

        let data_source = DataSourceRef { name };
        self.data_source = Some(data_source.clone());
        Ok(data_source)
    }

    /// Registers the enrichment skillset.
    ///
    /// One vision-vectorization skill turning each source image into its
    /// embedding, plus an index projection writing `metadata_storage_path`
    /// and `image_vector` into the target index while skipping the parent
    /// documents themselves.
    pub async fn create_skillset(&self) -> Result<()> {
        let name = self.names.skillset();
        let body = json!({
            "name": name,
            "description": "Skillset to generate metadata and embeddings",
            "skills": [{
                "@odata.type": "#Microsoft.Skills.Vision.VectorizeSkill",
                "context": "/document",
                "modelVersion": VISION_MODEL_VERSION,
                "inputs": [
                    FieldMapping::new("url", "/document/metadata_storage_path"),
                    FieldMapping::new("queryString", "/document/metadata_storage_sas_token"),
                ],
                "outputs": [{ "name": "vector", "targetName": "image_vector" }],
            }],
            "indexProjections": {
                "selectors": [{
                    "targetIndexName": self.names.index(),
                    "parentKeyFieldName": "parent_id",
                    "sourceContext": "/document",
                    "mappings": [
                        FieldMapping::new("metadata_storage_path", "/document/metadata_storage_path"),
                        FieldMapping::new("image_vector", "/document/image_vector"),
                    ],
                }],
                "parameters": { "projectionMode": "skipIndexingParentDocuments" },
            },
            "cognitiveServices": {
                "@odata.type": "#Microsoft.CognitiveServices.CognitiveServicesByKey",
                "key": self.vision.api_key,
            },
        });

        self.client.put_json(&["skillsets", &name], &body).await?;

        tracing::info!(
            target: TRACING_TARGET,
            skillset = %name,
            "Skillset created"
        );

        Ok(())
    }

    /// Registers the indexer binding data source, skillset, and index.
    ///
    /// Preconditions are checked before anything goes on the wire: this
    /// provisioner must hold a data source reference, and the skillset must
    /// already exist on the service. The service picks the indexer up and
    /// runs ingestion asynchronously; completion is not polled here.
    pub async fn create_indexer(&self) -> Result<()> {
        let Some(data_source) = &self.data_source else {
            return Err(SearchError::precondition(
                "data source not defined; create a data source before creating an indexer",
            ));
        };

        let skillset = self.names.skillset();
        match self.client.get_json(&["skillsets", &skillset]).await {
            Ok(_) => {}
            Err(SearchError::NotFound(_)) => {
                return Err(SearchError::precondition(
                    "skillset not defined; create a skillset before creating an indexer",
                ));
            }
            Err(other) => return Err(other),
        }

        let name = self.names.indexer();
        let body = json!({
            "name": name,
            "description": "Indexer to index documents and generate embeddings",
            "dataSourceName": data_source.name,
            "skillsetName": skillset,
            "targetIndexName": self.names.index(),
            "parameters": {
                "configuration": {
                    "parsingMode": "default",
                    "queryTimeout": null,
                    "allowSkillsetToReadFileData": true,
                    "imageAction": "generateNormalizedImages",
                },
            },
        });

        self.client.put_json(&["indexers", &name], &body).await?;

        tracing::info!(
            target: TRACING_TARGET,
            indexer = %name,
            "Indexer created"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::SearchClientConfig;

    fn provisioner_for(server: &MockServer) -> Provisioner {
        let endpoint = Url::parse(&server.uri()).unwrap();
        let client = SearchClient::new(SearchClientConfig::new(endpoint, "admin-key")).unwrap();

        Provisioner::new(
            client,
            ResourceNames::new("demo"),
            VisionSettings::new("https://vision.example.net/", "vision-key"),
            "DefaultEndpointsProtocol=https;AccountName=demo",
        )
    }

    #[test]
    fn names_derive_from_base() {
        let names = ResourceNames::new("demo");
        assert_eq!(names.index(), "demo-index");
        assert_eq!(names.skillset(), "demo-skillset");
        assert_eq!(names.data_source(), "demo-index-blob");
        assert_eq!(names.indexer(), "demo-index-indexer");
    }

    #[tokio::test]
    async fn indexer_without_data_source_fails_with_precondition() {
        let server = MockServer::start().await;
        let provisioner = provisioner_for(&server);

        let error = provisioner.create_indexer().await.unwrap_err();
        assert!(matches!(error, SearchError::Precondition(_)));
        assert!(error.to_string().contains("data source"));
    }

    #[tokio::test]
    async fn indexer_before_skillset_fails_with_precondition() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/datasources/demo-index-blob"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        // Skillset was never created: the existence check sees a 404.
        Mock::given(method("GET"))
            .and(path("/skillsets/demo-skillset"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut provisioner = provisioner_for(&server);
        provisioner
            .create_data_source("website-screens-test", None)
            .await
            .unwrap();

        let error = provisioner.create_indexer().await.unwrap_err();
        assert!(matches!(error, SearchError::Precondition(_)));
        assert!(error.to_string().contains("skillset"));
    }

    #[tokio::test]
    async fn full_provisioning_runs_in_order() {
        let server = MockServer::start().await;
        let ok = || ResponseTemplate::new(201).set_body_json(serde_json::json!({}));

        Mock::given(method("PUT"))
            .and(path("/indexes/demo-index"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/datasources/demo-index-blob"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/skillsets/demo-skillset"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/skillsets/demo-skillset"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/indexers/demo-index-indexer"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let mut provisioner = provisioner_for(&server);
        provisioner.create_index().await.unwrap();
        provisioner
            .create_data_source("website-screens-test", Some("screens"))
            .await
            .unwrap();
        provisioner.create_skillset().await.unwrap();
        provisioner.create_indexer().await.unwrap();
    }

    #[tokio::test]
    async fn service_errors_are_propagated_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden: bad api key"))
            .mount(&server)
            .await;

        let provisioner = provisioner_for(&server);
        let error = provisioner.create_index().await.unwrap_err();

        match error {
            SearchError::Service { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("forbidden"));
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }
}
