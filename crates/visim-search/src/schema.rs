//! Declarative index schema for the managed search service.
//!
//! The wire shapes mirror the service's REST API exactly (camelCase names,
//! `Edm.*` field types); anything the service would reject for referential
//! reasons is caught locally before the request is sent.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Name of the vector field holding image embeddings.
pub const VECTOR_FIELD: &str = "image_vector";

/// Model version of the hosted vision vectorizer.
pub const VISION_MODEL_VERSION: &str = "2023-04-15";

/// Output dimensionality of the vision vectorizer.
///
/// The vector field must declare the same number or indexing fails.
pub const VISION_EMBEDDING_DIMENSIONS: u32 = 1024;

const HNSW_ALGORITHM: &str = "Hnsw";
const EXHAUSTIVE_KNN_ALGORITHM: &str = "ExhaustiveKnn";
const HNSW_PROFILE: &str = "HnswProfile";
const EXHAUSTIVE_KNN_PROFILE: &str = "ExhaustiveKnnProfile";
const VISION_PROFILE: &str = "VisionEmbeddingProfile";
const VISION_VECTORIZER: &str = "aiServicesVision";

/// Settings for the server-side vision vectorizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionSettings {
    /// Resource URI of the hosted vision service.
    pub resource_uri: String,
    /// API key for the hosted vision service.
    pub api_key: String,
}

impl VisionSettings {
    /// Creates new vision vectorizer settings.
    pub fn new(resource_uri: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            resource_uri: resource_uri.into(),
            api_key: api_key.into(),
        }
    }
}

/// A field in the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchField {
    /// Field name.
    pub name: String,
    /// Field data type, e.g. `Edm.String` or `Collection(Edm.Single)`.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Whether this field is the document key.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub key: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub searchable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub filterable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sortable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub facetable: bool,
    /// Analyzer applied to the field, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    /// Vector dimensionality, for vector fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    /// Similarity profile the field searches with, for vector fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_search_profile: Option<String>,
}

impl SearchField {
    fn string(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            field_type: "Edm.String".to_owned(),
            key: false,
            searchable: false,
            filterable: false,
            sortable: false,
            facetable: false,
            analyzer: None,
            dimensions: None,
            vector_search_profile: None,
        }
    }

    fn faceted(name: &str) -> Self {
        Self {
            filterable: true,
            sortable: true,
            facetable: true,
            ..Self::string(name)
        }
    }
}

/// HNSW algorithm parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HnswParameters {
    pub m: u32,
    pub ef_construction: u32,
    pub ef_search: u32,
    pub metric: String,
}

/// Exhaustive k-NN algorithm parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhaustiveKnnParameters {
    pub metric: String,
}

/// A named vector-similarity algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorAlgorithm {
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hnsw_parameters: Option<HnswParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhaustive_knn_parameters: Option<ExhaustiveKnnParameters>,
}

/// A named profile binding a field to an algorithm and optional vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorProfile {
    pub name: String,
    pub algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vectorizer: Option<String>,
}

/// Parameters of the hosted vision vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionVectorizerParameters {
    pub model_version: String,
    pub resource_uri: String,
    pub api_key: String,
}

/// A named vectorizer converting raw input into vectors server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vectorizer {
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_services_vision_parameters: Option<VisionVectorizerParameters>,
}

/// Vector search configuration: algorithms, profiles, and vectorizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearch {
    pub algorithms: Vec<VectorAlgorithm>,
    pub profiles: Vec<VectorProfile>,
    pub vectorizers: Vec<Vectorizer>,
}

/// A complete index definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSchema {
    pub name: String,
    pub fields: Vec<SearchField>,
    pub vector_search: VectorSearch,
}

impl IndexSchema {
    /// Builds the image-similarity index definition for the given name.
    ///
    /// Produces the fixed field set (`parent_id`, `document_id` key,
    /// `metadata_storage_path`, `image_vector`), both similarity algorithms,
    /// the three profiles, and the vision vectorizer. Building is pure;
    /// calling it twice with the same inputs yields an identical definition.
    pub fn design(index_name: &str, vision: &VisionSettings) -> Self {
        let fields = vec![
            SearchField::faceted("parent_id"),
            SearchField {
                key: true,
                analyzer: Some("keyword".to_owned()),
                ..SearchField::faceted("document_id")
            },
            SearchField::faceted("metadata_storage_path"),
            SearchField {
                field_type: "Collection(Edm.Single)".to_owned(),
                searchable: true,
                dimensions: Some(VISION_EMBEDDING_DIMENSIONS),
                vector_search_profile: Some(VISION_PROFILE.to_owned()),
                ..SearchField::string(VECTOR_FIELD)
            },
        ];

        // Hnsw is fast on large datasets but approximate; the vision profile
        // uses exhaustive k-NN for exact scoring.
        let vector_search = VectorSearch {
            algorithms: vec![
                VectorAlgorithm {
                    name: HNSW_ALGORITHM.to_owned(),
                    kind: "hnsw".to_owned(),
                    hnsw_parameters: Some(HnswParameters {
                        m: 4,
                        ef_construction: 400,
                        ef_search: 500,
                        metric: "cosine".to_owned(),
                    }),
                    exhaustive_knn_parameters: None,
                },
                VectorAlgorithm {
                    name: EXHAUSTIVE_KNN_ALGORITHM.to_owned(),
                    kind: "exhaustiveKnn".to_owned(),
                    hnsw_parameters: None,
                    exhaustive_knn_parameters: Some(ExhaustiveKnnParameters {
                        metric: "cosine".to_owned(),
                    }),
                },
            ],
            profiles: vec![
                VectorProfile {
                    name: HNSW_PROFILE.to_owned(),
                    algorithm: HNSW_ALGORITHM.to_owned(),
                    vectorizer: None,
                },
                VectorProfile {
                    name: EXHAUSTIVE_KNN_PROFILE.to_owned(),
                    algorithm: EXHAUSTIVE_KNN_ALGORITHM.to_owned(),
                    vectorizer: None,
                },
                VectorProfile {
                    name: VISION_PROFILE.to_owned(),
                    algorithm: EXHAUSTIVE_KNN_ALGORITHM.to_owned(),
                    vectorizer: Some(VISION_VECTORIZER.to_owned()),
                },
            ],
            vectorizers: vec![Vectorizer {
                name: VISION_VECTORIZER.to_owned(),
                kind: "aiServicesVision".to_owned(),
                ai_services_vision_parameters: Some(VisionVectorizerParameters {
                    model_version: VISION_MODEL_VERSION.to_owned(),
                    resource_uri: vision.resource_uri.clone(),
                    api_key: vision.api_key.clone(),
                }),
            }],
        };

        Self {
            name: index_name.to_owned(),
            fields,
            vector_search,
        }
    }

    /// Validates referential consistency before the schema goes on the wire.
    ///
    /// Checks that exactly one field is the key, that every profile a field
    /// references exists, that every vectorizer a profile references exists,
    /// and that vector fields bound to the vision vectorizer declare its
    /// output dimensionality.
    pub fn validate(&self) -> Result<()> {
        let keys = self.fields.iter().filter(|f| f.key).count();
        if keys != 1 {
            return Err(SearchError::schema(format!(
                "index `{}` must have exactly one key field, found {keys}",
                self.name
            )));
        }

        for field in &self.fields {
            let Some(profile_name) = &field.vector_search_profile else {
                continue;
            };

            let profile = self
                .vector_search
                .profiles
                .iter()
                .find(|p| &p.name == profile_name)
                .ok_or_else(|| {
                    SearchError::schema(format!(
                        "field `{}` references unknown profile `{profile_name}`",
                        field.name
                    ))
                })?;

            if !self
                .vector_search
                .algorithms
                .iter()
                .any(|a| a.name == profile.algorithm)
            {
                return Err(SearchError::schema(format!(
                    "profile `{}` references unknown algorithm `{}`",
                    profile.name, profile.algorithm
                )));
            }

            if let Some(vectorizer_name) = &profile.vectorizer {
                if !self
                    .vector_search
                    .vectorizers
                    .iter()
                    .any(|v| &v.name == vectorizer_name)
                {
                    return Err(SearchError::schema(format!(
                        "profile `{}` references unknown vectorizer `{vectorizer_name}`",
                        profile.name
                    )));
                }

                let declared = field.dimensions.unwrap_or(0);
                if declared != VISION_EMBEDDING_DIMENSIONS {
                    return Err(SearchError::dimension_mismatch(
                        declared,
                        VISION_EMBEDDING_DIMENSIONS,
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vision() -> VisionSettings {
        VisionSettings::new("https://vision.example.net/", "vision-key")
    }

    #[test]
    fn designed_schema_is_valid() {
        let schema = IndexSchema::design("demo-index", &vision());
        schema.validate().unwrap();
    }

    #[test]
    fn design_is_deterministic() {
        let a = IndexSchema::design("demo-index", &vision());
        let b = IndexSchema::design("demo-index", &vision());

        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
    }

    #[test]
    fn exactly_one_key_field() {
        let schema = IndexSchema::design("demo-index", &vision());
        let keys: Vec<_> = schema.fields.iter().filter(|f| f.key).collect();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "document_id");
    }

    #[test]
    fn mismatched_dimensions_are_rejected_locally() {
        let mut schema = IndexSchema::design("demo-index", &vision());
        let vector_field = schema
            .fields
            .iter_mut()
            .find(|f| f.name == VECTOR_FIELD)
            .unwrap();
        vector_field.dimensions = Some(512);

        let error = schema.validate().unwrap_err();
        assert!(matches!(
            error,
            SearchError::DimensionMismatch {
                field: 512,
                vectorizer: VISION_EMBEDDING_DIMENSIONS,
            }
        ));
    }

    #[test]
    fn unknown_profile_reference_is_rejected() {
        let mut schema = IndexSchema::design("demo-index", &vision());
        schema.vector_search.profiles.clear();

        let error = schema.validate().unwrap_err();
        assert!(matches!(error, SearchError::Schema(_)));
    }

    #[test]
    fn wire_shape_uses_service_names() {
        let schema = IndexSchema::design("demo-index", &vision());
        let json = serde_json::to_value(&schema).unwrap();

        assert_eq!(json["fields"][1]["type"], "Edm.String");
        assert_eq!(json["fields"][1]["analyzer"], "keyword");
        assert_eq!(json["fields"][3]["dimensions"], 1024);
        assert_eq!(json["fields"][3]["vectorSearchProfile"], "VisionEmbeddingProfile");
        assert_eq!(json["vectorSearch"]["algorithms"][0]["hnswParameters"]["efConstruction"], 400);
        assert_eq!(
            json["vectorSearch"]["vectorizers"][0]["aiServicesVisionParameters"]["modelVersion"],
            "2023-04-15"
        );
    }
}
