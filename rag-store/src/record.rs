//! Core data models used by the library.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::RagError;

/// A single metadata value: a string or a list of strings.
///
/// Numbers and booleans are accepted on input and kept in their JSON text
/// form, so `"born": 2019` reads as `Text("2019")`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    List(Vec<String>),
}

impl MetadataValue {
    /// Maps a JSON value; `None` for nulls and objects. Nulls and objects
    /// inside a list are skipped.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(MetadataValue::Text(s)),
            Value::Array(items) => Some(MetadataValue::List(
                items.into_iter().filter_map(scalar_text).collect(),
            )),
            Value::Null | Value::Object(_) => None,
            other => scalar_text(other).map(MetadataValue::Text),
        }
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Null | Value::Object(_) | Value::Array(_) => None,
        other => Some(other.to_string()),
    }
}

impl<'de> Deserialize<'de> for MetadataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let kind = match &raw {
            Value::Null => "null",
            Value::Object(_) => "an object",
            _ => "",
        };
        MetadataValue::from_json(raw).ok_or_else(|| {
            D::Error::custom(format!(
                "metadata value must be a string, number, boolean or list, got {kind}"
            ))
        })
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<Vec<&str>> for MetadataValue {
    fn from(items: Vec<&str>) -> Self {
        MetadataValue::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Metadata stored next to a vector. Ordered so payloads serialize stably.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Input record: text to embed plus the metadata stored with its vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Embedding vector produced from a record's text.
#[derive(Clone, Debug, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
}

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// A vector as stored in the index.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedVector {
    /// `<prefix>-<position + 1>`, unique within the namespace for one batch.
    pub id: String,
    /// 0-based position of the source record in its batch.
    pub position: usize,
    pub embedding: Embedding,
    pub metadata: Metadata,
}

/// Similarity metric of an index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Euclidean,
    DotProduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::DotProduct => "dotproduct",
        }
    }

    /// Ranking direction of scores under this metric.
    ///
    /// Cosine and dot product are similarities (higher = closer);
    /// euclidean is a distance (lower = closer).
    pub fn higher_is_closer(&self) -> bool {
        !matches!(self, Metric::Euclidean)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "euclidean" | "euclid" | "l2" => Ok(Metric::Euclidean),
            "dotproduct" | "dot" => Ok(Metric::DotProduct),
            other => Err(RagError::Config(format!(
                "unknown metric '{other}' (expected cosine | euclidean | dotproduct)"
            ))),
        }
    }
}

/// Provider placement for serverless indexes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub cloud: String,
    pub region: String,
}

/// Shape and placement of an index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub placement: Placement,
}

/// Options of a similarity query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimilarityQuery {
    pub top_k: u64,
    pub include_values: bool,
    pub include_metadata: bool,
}

impl Default for SimilarityQuery {
    fn default() -> Self {
        Self {
            top_k: 1,
            include_values: false,
            include_metadata: true,
        }
    }
}

/// One nearest neighbour returned by the index.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    pub values: Option<Vec<f32>>,
    pub metadata: Option<Metadata>,
}

/// Matches for one query, in the rank order reported by the index.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    pub query: String,
    pub namespace: String,
    pub metric: Metric,
    pub matches: Vec<QueryMatch>,
}

impl QueryResult {
    /// Best match, if any.
    pub fn top(&self) -> Option<&QueryMatch> {
        self.matches.first()
    }
}
