//! Test doubles: a scripted embedder and an in-memory vector index.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rag_store::index::{IndexStatus, IndexSummary, QueryRequest, UpsertVector};
use rag_store::{
    EmbedError, Embedding, EmbeddingClient, IndexDescriptor, IndexError, Metadata, Metric,
    Placement, QdrantConfig, QueryMatch, RagConfig, RetryPolicy, VectorBackend,
    VectorIndexClient,
};

/// Embeds from a fixed table. Texts listed in `failing` are rejected;
/// `delays` hold each text back to shuffle completion order.
#[derive(Default)]
pub struct ScriptedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    failing: Vec<String>,
    delays: HashMap<String, Duration>,
    pub calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vector(mut self, text: &str, v: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), v);
        self
    }

    pub fn failing(mut self, text: &str) -> Self {
        self.failing.push(text.to_string());
        self
    }

    pub fn delayed(mut self, text: &str, d: Duration) -> Self {
        self.delays.insert(text.to_string(), d);
        self
    }

    /// Dog, cat and the dog question, in two dimensions.
    pub fn pets() -> Self {
        Self::new()
            .vector("My dog's name is Steve.", vec![1.0, 0.0])
            .vector("My cat's name is Sandy.", vec![0.0, 1.0])
            .vector("What is my dog's name?", vec![0.9, 0.1])
    }
}

#[async_trait]
impl EmbeddingClient for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delays.get(text) {
            tokio::time::sleep(*d).await;
        }
        if self.failing.iter().any(|t| t == text) {
            return Err(EmbedError::Rejected(format!("scripted failure for '{text}'")));
        }
        self.vectors
            .get(text)
            .cloned()
            .map(Embedding::new)
            .ok_or_else(|| EmbedError::Rejected(format!("no vector scripted for '{text}'")))
    }
}

type Namespace = BTreeMap<String, (Vec<f32>, Metadata)>;

struct StoredIndex {
    descriptor: IndexDescriptor,
    namespaces: HashMap<String, Namespace>,
}

/// In-memory [`VectorIndexClient`] with call counters.
#[derive(Default)]
pub struct InMemoryIndex {
    indexes: Mutex<HashMap<String, StoredIndex>>,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.indexes.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Stored ids of one namespace, sorted.
    pub fn ids(&self, index: &str, namespace: &str) -> Vec<String> {
        self.indexes
            .lock()
            .unwrap()
            .get(index)
            .and_then(|i| i.namespaces.get(namespace))
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stored(&self, index: &str, namespace: &str, id: &str) -> Option<(Vec<f32>, Metadata)> {
        self.indexes
            .lock()
            .unwrap()
            .get(index)
            .and_then(|i| i.namespaces.get(namespace))
            .and_then(|ns| ns.get(id).cloned())
    }
}

fn score(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match metric {
        Metric::DotProduct => dot,
        Metric::Cosine => {
            let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
        }
        Metric::Euclidean => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

#[async_trait]
impl VectorIndexClient for InMemoryIndex {
    async fn list_indexes(&self) -> Result<Vec<IndexSummary>, IndexError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .indexes
            .lock()
            .unwrap()
            .values()
            .map(|i| IndexSummary {
                name: i.descriptor.name.clone(),
                dimension: Some(i.descriptor.dimension),
                metric: Some(i.descriptor.metric),
            })
            .collect())
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexStatus>, IndexError> {
        Ok(self.indexes.lock().unwrap().get(name).map(|i| IndexStatus {
            ready: true,
            dimension: Some(i.descriptor.dimension),
            host: None,
        }))
    }

    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<(), IndexError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut indexes = self.indexes.lock().unwrap();
        if indexes.contains_key(&descriptor.name) {
            return Err(IndexError::AlreadyExists(descriptor.name.clone()));
        }
        indexes.insert(
            descriptor.name.clone(),
            StoredIndex {
                descriptor: descriptor.clone(),
                namespaces: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), IndexError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        match self.indexes.lock().unwrap().remove(name) {
            Some(_) => Ok(()),
            None => Err(IndexError::NotFound(name.to_string())),
        }
    }

    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        vectors: Vec<UpsertVector>,
    ) -> Result<u64, IndexError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut indexes = self.indexes.lock().unwrap();
        let stored = indexes
            .get_mut(index)
            .ok_or_else(|| IndexError::NotFound(index.to_string()))?;
        let ns = stored.namespaces.entry(namespace.to_string()).or_default();
        let n = vectors.len() as u64;
        for v in vectors {
            ns.insert(v.id, (v.values, v.metadata));
        }
        Ok(n)
    }

    async fn query(
        &self,
        index: &str,
        namespace: &str,
        request: QueryRequest,
    ) -> Result<Vec<QueryMatch>, IndexError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let indexes = self.indexes.lock().unwrap();
        let stored = indexes
            .get(index)
            .ok_or_else(|| IndexError::NotFound(index.to_string()))?;
        let metric = stored.descriptor.metric;

        let mut matches: Vec<QueryMatch> = stored
            .namespaces
            .get(namespace)
            .map(|ns| {
                ns.iter()
                    .map(|(id, (values, metadata))| QueryMatch {
                        id: id.clone(),
                        score: score(metric, &request.vector, values),
                        values: request.include_values.then(|| values.clone()),
                        metadata: request.include_metadata.then(|| metadata.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        matches.sort_by(|a, b| {
            let ord = a.score.total_cmp(&b.score);
            if metric.higher_is_closer() { ord.reverse() } else { ord }
        });
        matches.truncate(request.top_k as usize);
        Ok(matches)
    }
}

pub fn descriptor(dimension: usize, metric: Metric) -> IndexDescriptor {
    IndexDescriptor {
        name: "your-index-name".into(),
        dimension,
        metric,
        placement: Placement {
            cloud: "aws".into(),
            region: "us-west-2".into(),
        },
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 0,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        backoff_multiplier: 2.0,
        timeout: Duration::from_secs(2),
    }
}

/// Demo configuration shrunk to two dimensions.
pub fn config() -> RagConfig {
    let mut cfg = RagConfig::new_default(VectorBackend::Qdrant(QdrantConfig {
        url: "http://localhost:6334".into(),
        api_key: None,
    }));
    cfg.index = descriptor(2, Metric::Cosine);
    cfg.retry = fast_retry();
    cfg.ready_timeout = Duration::from_millis(50);
    cfg.ready_poll = Duration::from_millis(1);
    cfg
}
