mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{InMemoryIndex, ScriptedEmbedder, config, descriptor, fast_retry};
use rag_store::io_jsonl::default_records;
use rag_store::{
    IndexAction, IndexLifecycleManager, IngestStage, IngestionPipeline, LifecycleOutcome,
    MetadataValue, Metric, QueryPipeline, RagStore, Record, SimilarityQuery,
};

fn record(text: &str, tag: &str) -> Record {
    let mut r = Record {
        text: text.into(),
        metadata: Default::default(),
    };
    r.metadata.insert("tag".into(), MetadataValue::from(tag));
    r
}

#[tokio::test]
async fn ids_follow_input_order_regardless_of_completion() {
    let embedder = Arc::new(
        ScriptedEmbedder::new()
            .vector("first", vec![1.0, 0.0])
            .vector("second", vec![0.0, 1.0])
            .vector("third", vec![1.0, 1.0])
            .delayed("first", Duration::from_millis(60))
            .delayed("second", Duration::from_millis(30)),
    );
    let index = Arc::new(InMemoryIndex::new());
    let d = descriptor(2, Metric::Cosine);
    IndexLifecycleManager::new(index.clone(), fast_retry())
        .ensure(IndexAction::Create, &d)
        .await
        .unwrap();

    let records = vec![
        record("first", "a"),
        record("second", "b"),
        record("third", "c"),
    ];
    let out = IngestionPipeline::new(embedder, index.clone(), fast_retry(), "doc")
        .ingest(&records, &d, "ns")
        .await;

    let ids: Vec<_> = out.iter().map(|r| r.as_ref().unwrap().id.clone()).collect();
    assert_eq!(ids, ["doc-1", "doc-2", "doc-3"]);

    let (values, meta) = index.stored("your-index-name", "ns", "doc-1").unwrap();
    assert_eq!(values, vec![1.0, 0.0]);
    assert_eq!(meta["tag"], MetadataValue::from("a"));
    let (_, meta) = index.stored("your-index-name", "ns", "doc-3").unwrap();
    assert_eq!(meta["tag"], MetadataValue::from("c"));
}

#[tokio::test]
async fn create_twice_leaves_one_index() {
    let index = Arc::new(InMemoryIndex::new());
    let manager = IndexLifecycleManager::new(index.clone(), fast_retry());
    let d = descriptor(1536, Metric::Cosine);

    let first = manager.ensure(IndexAction::Create, &d).await.unwrap();
    let second = manager.ensure(IndexAction::Create, &d).await.unwrap();

    assert_eq!(first, LifecycleOutcome::Created);
    assert_eq!(second, LifecycleOutcome::AlreadyExists);
    assert_eq!(index.index_names(), ["your-index-name"]);
    assert_eq!(InMemoryIndex::count(&index.create_calls), 1);
}

#[tokio::test]
async fn deleting_absent_index_makes_no_delete_call() {
    let index = Arc::new(InMemoryIndex::new());
    let manager = IndexLifecycleManager::new(index.clone(), fast_retry());

    let outcome = manager
        .ensure(IndexAction::Delete, &descriptor(2, Metric::Cosine))
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::DoesNotExist);
    assert_eq!(InMemoryIndex::count(&index.delete_calls), 0);
}

#[tokio::test]
async fn invalid_action_string_touches_nothing() {
    let index = Arc::new(InMemoryIndex::new());
    let manager = IndexLifecycleManager::new(index.clone(), fast_retry());

    assert!(
        manager
            .ensure_str("recreate", &descriptor(2, Metric::Cosine))
            .await
            .is_err()
    );
    assert_eq!(InMemoryIndex::count(&index.list_calls), 0);
    assert_eq!(InMemoryIndex::count(&index.create_calls), 0);
}

#[tokio::test]
async fn metadata_round_trips_through_query() {
    let embedder = Arc::new(ScriptedEmbedder::pets());
    let index = Arc::new(InMemoryIndex::new());
    let d = descriptor(2, Metric::Cosine);
    IndexLifecycleManager::new(index.clone(), fast_retry())
        .ensure(IndexAction::Create, &d)
        .await
        .unwrap();

    let records = default_records();
    let out = IngestionPipeline::new(embedder.clone(), index.clone(), fast_retry(), "pet")
        .ingest(&records, &d, "your-namespace")
        .await;
    assert!(out.iter().all(|r| r.is_ok()));

    let res = QueryPipeline::new(embedder, index, fast_retry())
        .query(
            "What is my dog's name?",
            &d,
            "your-namespace",
            &SimilarityQuery {
                top_k: 2,
                include_values: true,
                include_metadata: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(res.matches.len(), 2);
    let dog = &res.matches[0];
    assert_eq!(dog.id, "pet-1");
    assert_eq!(dog.metadata.as_ref().unwrap(), &records[0].metadata);
    assert_eq!(dog.values.as_deref(), Some(&[1.0, 0.0][..]));
    assert_eq!(res.matches[1].metadata.as_ref().unwrap(), &records[1].metadata);
}

#[tokio::test]
async fn demo_run_ranks_steve_first() {
    let index = Arc::new(InMemoryIndex::new());
    let store = RagStore::with_clients(config(), Arc::new(ScriptedEmbedder::pets()), index.clone());

    let records = store.load_records().unwrap();
    let report = store.run(&records).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.lifecycle, LifecycleOutcome::Created);
    assert_eq!(report.stored.len(), 2);
    assert_eq!(report.query.matches.len(), 1);

    let top = report.query.top().unwrap();
    assert_eq!(top.id, "your-embedding-id-1");
    assert_eq!(
        top.metadata.as_ref().unwrap()["textToEmbed"],
        MetadataValue::from("My dog's name is Steve.")
    );
    assert!(report.query.metric.higher_is_closer());
    assert!(report.deleted.is_none());
}

#[tokio::test]
async fn second_embed_failing_yields_two_stored_one_failed() {
    let embedder = ScriptedEmbedder::new()
        .vector("one", vec![1.0, 0.0])
        .vector("three", vec![0.0, 1.0])
        .vector("What is my dog's name?", vec![1.0, 0.0])
        .failing("two");
    let index = Arc::new(InMemoryIndex::new());
    let store = RagStore::with_clients(config(), Arc::new(embedder), index.clone());

    let records = vec![record("one", "1"), record("two", "2"), record("three", "3")];
    let report = store.run(&records).await.unwrap();

    assert_eq!(report.stored.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert!(!report.is_success());

    let failed = &report.failures[0];
    assert_eq!(failed.position, 1);
    assert_eq!(failed.id, "your-embedding-id-2");
    assert_eq!(failed.stage, IngestStage::Embed);
    assert_eq!(
        index.ids("your-index-name", "your-namespace"),
        ["your-embedding-id-1", "your-embedding-id-3"]
    );
}

#[tokio::test]
async fn euclidean_ranks_smallest_distance_first() {
    let embedder = Arc::new(
        ScriptedEmbedder::new()
            .vector("near", vec![1.0, 1.0])
            .vector("far", vec![5.0, 5.0])
            .vector("probe", vec![1.2, 1.0]),
    );
    let index = Arc::new(InMemoryIndex::new());
    let d = descriptor(2, Metric::Euclidean);
    IndexLifecycleManager::new(index.clone(), fast_retry())
        .ensure(IndexAction::Create, &d)
        .await
        .unwrap();

    IngestionPipeline::new(embedder.clone(), index.clone(), fast_retry(), "p")
        .ingest(&[record("far", "f"), record("near", "n")], &d, "ns")
        .await;

    let res = QueryPipeline::new(embedder, index, fast_retry())
        .query(
            "probe",
            &d,
            "ns",
            &SimilarityQuery {
                top_k: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(res.matches[0].id, "p-2");
    assert!(res.matches[0].score < res.matches[1].score);
    assert!(!res.metric.higher_is_closer());
}

#[tokio::test]
async fn rerun_overwrites_same_ids() {
    let index = Arc::new(InMemoryIndex::new());
    let store = RagStore::with_clients(config(), Arc::new(ScriptedEmbedder::pets()), index.clone());
    let records = default_records();

    store.run(&records).await.unwrap();
    let second = store.run(&records).await.unwrap();

    assert_eq!(second.lifecycle, LifecycleOutcome::AlreadyExists);
    assert_eq!(
        index.ids("your-index-name", "your-namespace"),
        ["your-embedding-id-1", "your-embedding-id-2"]
    );
}

#[tokio::test]
async fn delete_after_run_removes_index() {
    let index = Arc::new(InMemoryIndex::new());
    let mut cfg = config();
    cfg.delete_after_run = true;
    let store = RagStore::with_clients(cfg, Arc::new(ScriptedEmbedder::pets()), index.clone());

    let report = store.run(&default_records()).await.unwrap();

    assert_eq!(report.deleted, Some(LifecycleOutcome::Deleted));
    assert!(index.index_names().is_empty());
}

#[tokio::test]
async fn query_failure_aborts_run() {
    let embedder = ScriptedEmbedder::pets().failing("What is my dog's name?");
    let store = RagStore::with_clients(config(), Arc::new(embedder), Arc::new(InMemoryIndex::new()));

    let err = store.run(&default_records()).await.unwrap_err();
    assert!(err.to_string().contains("query embedding failed"));
}
