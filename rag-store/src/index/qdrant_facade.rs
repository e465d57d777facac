//! Thin adapter around `qdrant-client` implementing [`VectorIndexClient`].
//!
//! An index maps to a collection. Qdrant has no namespaces and only accepts
//! UUID/integer point ids, so every point carries two reserved payload keys:
//! - `_id`: the caller's vector id (the point id is `stable_uuid("<namespace>/<_id>")`)
//! - `_namespace`: the namespace; queries filter on it

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    self, Condition, CreateCollectionBuilder, Distance, Filter, ListValue, PointId, PointStruct,
    ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value as QValue, VectorParamsBuilder, value,
};
use services::uuid::stable_uuid;
use tracing::{debug, info};

use crate::config::QdrantConfig;
use crate::errors::{IndexError, RagError};
use crate::index::{IndexStatus, IndexSummary, QueryRequest, UpsertVector, VectorIndexClient};
use crate::record::{IndexDescriptor, Metadata, MetadataValue, Metric, QueryMatch};

const ID_KEY: &str = "_id";
const NAMESPACE_KEY: &str = "_namespace";

/// Qdrant backend. Collections play the role of indexes.
pub struct QdrantFacade {
    client: Qdrant,
}

impl QdrantFacade {
    /// Builds the gRPC client with an optional API key.
    pub fn new(cfg: &QdrantConfig, timeout: Duration) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&cfg.url);
        if let Some(key) = &cfg.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        info!(url = %cfg.url, "QdrantFacade initialized");
        Ok(Self { client })
    }

    async fn exists(&self, name: &str) -> Result<bool, IndexError> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))
    }
}

#[async_trait]
impl VectorIndexClient for QdrantFacade {
    async fn list_indexes(&self) -> Result<Vec<IndexSummary>, IndexError> {
        let res = self
            .client
            .list_collections()
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        Ok(res
            .collections
            .into_iter()
            .map(|c| IndexSummary {
                name: c.name,
                dimension: None,
                metric: None,
            })
            .collect())
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexStatus>, IndexError> {
        if !self.exists(name).await? {
            return Ok(None);
        }
        let info = self
            .client
            .collection_info(name)
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        let Some(result) = info.result else {
            return Ok(Some(IndexStatus {
                ready: false,
                dimension: None,
                host: None,
            }));
        };

        let dimension = result
            .config
            .as_ref()
            .and_then(|c| c.params.as_ref())
            .and_then(|p| p.vectors_config.as_ref())
            .and_then(|vc| match &vc.config {
                Some(qdrant::vectors_config::Config::Params(p)) => Some(p.size as usize),
                _ => None,
            });

        Ok(Some(IndexStatus {
            ready: result.status() == qdrant::CollectionStatus::Green,
            dimension,
            host: None,
        }))
    }

    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<(), IndexError> {
        if self.exists(&descriptor.name).await? {
            return Err(IndexError::AlreadyExists(descriptor.name.clone()));
        }

        let distance = match descriptor.metric {
            Metric::Cosine => Distance::Cosine,
            Metric::DotProduct => Distance::Dot,
            Metric::Euclidean => Distance::Euclid,
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&descriptor.name).vectors_config(
                    VectorParamsBuilder::new(descriptor.dimension as u64, distance),
                ),
            )
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        info!(collection = %descriptor.name, dimension = descriptor.dimension, "collection created");
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), IndexError> {
        if !self.exists(name).await? {
            return Err(IndexError::NotFound(name.to_string()));
        }
        self.client
            .delete_collection(name)
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;
        Ok(())
    }

    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        vectors: Vec<UpsertVector>,
    ) -> Result<u64, IndexError> {
        if vectors.is_empty() {
            return Ok(0);
        }
        let count = vectors.len() as u64;
        let points: Vec<PointStruct> = vectors
            .into_iter()
            .map(|v| to_point(namespace, v))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(index, points).wait(true))
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        debug!(collection = index, namespace, count, "upsert completed");
        Ok(count)
    }

    async fn query(
        &self,
        index: &str,
        namespace: &str,
        request: QueryRequest,
    ) -> Result<Vec<QueryMatch>, IndexError> {
        let include_values = request.include_values;
        let include_metadata = request.include_metadata;
        let builder = SearchPointsBuilder::new(index, request.vector, request.top_k)
            .filter(namespace_filter(namespace))
            .with_payload(true)
            .with_vectors(include_values);

        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        Ok(res
            .result
            .into_iter()
            .map(|point| to_match(point, include_values, include_metadata))
            .collect())
    }
}

/// Point id for a caller id. Namespaces share one collection, so the id is
/// scoped by namespace to keep partitions from overwriting each other.
fn point_id(namespace: &str, id: &str) -> PointId {
    stable_uuid(&format!("{namespace}/{id}")).to_string().into()
}

fn to_point(namespace: &str, v: UpsertVector) -> PointStruct {
    let mut payload = metadata_to_payload(&v.metadata);
    payload.insert(ID_KEY.into(), qstring(&v.id));
    payload.insert(NAMESPACE_KEY.into(), qstring(namespace));
    PointStruct::new(point_id(namespace, &v.id), v.values, payload)
}

fn namespace_filter(namespace: &str) -> Filter {
    Filter::must([Condition::matches(NAMESPACE_KEY, namespace.to_string())])
}

/// Maps a search hit back to the caller's id and metadata, stripping the
/// reserved payload keys.
fn to_match(point: ScoredPoint, include_values: bool, include_metadata: bool) -> QueryMatch {
    let mut metadata = payload_to_metadata(point.payload);
    let id = match metadata.remove(ID_KEY) {
        Some(MetadataValue::Text(id)) => id,
        _ => point_id_string(point.id.as_ref()),
    };
    metadata.remove(NAMESPACE_KEY);
    QueryMatch {
        id,
        score: point.score,
        values: if include_values {
            extract_vector(&point.vectors)
        } else {
            None
        },
        metadata: include_metadata.then_some(metadata),
    }
}

/// Wraps a string into Qdrant `Value`.
fn qstring(s: &str) -> QValue {
    QValue {
        kind: Some(value::Kind::StringValue(s.to_string())),
    }
}

fn metadata_to_payload(metadata: &Metadata) -> HashMap<String, QValue> {
    metadata
        .iter()
        .map(|(k, v)| {
            let q = match v {
                MetadataValue::Text(s) => qstring(s),
                MetadataValue::List(items) => QValue {
                    kind: Some(value::Kind::ListValue(ListValue {
                        values: items.iter().map(|s| qstring(s)).collect(),
                    })),
                },
            };
            (k.clone(), q)
        })
        .collect()
}

/// Converts a Qdrant payload back into [`Metadata`]. Non-string scalars keep
/// their text form; nested structs are dropped.
fn payload_to_metadata(payload: HashMap<String, QValue>) -> Metadata {
    let mut out = Metadata::new();
    for (k, v) in payload {
        let mapped = match v.kind {
            Some(value::Kind::ListValue(list)) => MetadataValue::List(
                list.values
                    .into_iter()
                    .filter_map(|x| scalar_text(x.kind))
                    .collect(),
            ),
            other => match scalar_text(other) {
                Some(s) => MetadataValue::Text(s),
                None => continue,
            },
        };
        out.insert(k, mapped);
    }
    out
}

fn scalar_text(kind: Option<value::Kind>) -> Option<String> {
    match kind {
        Some(value::Kind::StringValue(s)) => Some(s),
        Some(value::Kind::IntegerValue(i)) => Some(i.to_string()),
        Some(value::Kind::DoubleValue(f)) => Some(f.to_string()),
        Some(value::Kind::BoolValue(b)) => Some(b.to_string()),
        _ => None,
    }
}

fn point_id_string(id: Option<&PointId>) -> String {
    match id.and_then(|p| p.point_id_options.as_ref()) {
        Some(qdrant::point_id::PointIdOptions::Uuid(u)) => u.clone(),
        Some(qdrant::point_id::PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

#[allow(deprecated)]
fn extract_vector(vectors: &Option<qdrant::VectorsOutput>) -> Option<Vec<f32>> {
    match vectors {
        Some(qdrant::VectorsOutput {
            vectors_options: Some(qdrant::vectors_output::VectorsOptions::Vector(v)),
        }) => Some(v.data.clone()),
        _ => None,
    }
}
