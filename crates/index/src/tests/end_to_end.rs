//! Ingest-then-converse scenarios through the retrieval facade.

use super::support::{KeywordEmbedder, ScriptedClassifier};
use crate::blob::{MemoryBlobStore, SqliteBlobStore};
use crate::classifier::RuleClassifier;
use crate::config::RetrievalConfig;
use crate::retrieval::Retrieval;
use crate::router::RouterState;
use crate::summarizer::TruncatingSummarizer;
use crate::types::{CollectionKind, Metadata};
use std::sync::Arc;
use tempfile::TempDir;

fn retrieval() -> Retrieval {
    Retrieval::new(
        &RetrievalConfig::default(),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(KeywordEmbedder::default()),
        Arc::new(TruncatingSummarizer::default()),
        Arc::new(RuleClassifier::new()),
    )
}

async fn ingest_three_documents(retrieval: &Retrieval) -> Vec<String> {
    let mut refs = Vec::new();
    for (name, text) in [
        ("fruit.txt", "apple banana apple"),
        ("billing.txt", "invoice contract invoice"),
        ("travel.txt", "mountain sunset ocean"),
    ] {
        refs.push(
            retrieval
                .ingest(
                    CollectionKind::Documents,
                    text.as_bytes(),
                    name,
                    Metadata::new(),
                )
                .await
                .unwrap(),
        );
    }
    refs
}

#[tokio::test]
async fn test_search_then_select_second() {
    let retrieval = retrieval();
    let refs = ingest_three_documents(&retrieval).await;

    let first = retrieval
        .query("chat-1", CollectionKind::Documents, "the invoice and contract", Some(3))
        .await;
    assert_eq!(first.intent.as_deref(), Some("NEW_SEARCH"));
    assert_eq!(first.state, RouterState::AwaitingSelection);
    assert_eq!(first.results[0].external_ref, refs[1]);
    assert_eq!(first.results.len(), 3);

    let second = retrieval
        .query("chat-1", CollectionKind::Documents, "the second one", Some(3))
        .await;
    assert_eq!(second.intent.as_deref(), Some("SELECT(1)"));
    assert_eq!(second.state, RouterState::Idle);
    assert_eq!(second.results, vec![first.results[1].clone()]);
}

#[tokio::test]
async fn test_selection_does_not_search_again() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let classifier = Arc::new(ScriptedClassifier::new(&["NEW_SEARCH", "SELECT(1)"]));
    let retrieval = Retrieval::new(
        &RetrievalConfig::default(),
        blobs.clone(),
        Arc::new(KeywordEmbedder::default()),
        Arc::new(TruncatingSummarizer::default()),
        classifier.clone(),
    );
    ingest_three_documents(&retrieval).await;

    let first = retrieval
        .query("s", CollectionKind::Documents, "sunset", None)
        .await;

    // A new document lands between the search and the selection; the
    // selection still answers from the results the user saw.
    retrieval
        .ingest(
            CollectionKind::Documents,
            b"sunset sunset sunset",
            "late.txt",
            Metadata::new(),
        )
        .await
        .unwrap();

    let picked = retrieval
        .query("s", CollectionKind::Documents, "the second one", None)
        .await;
    assert_eq!(picked.results, vec![first.results[1].clone()]);

    let seen = classifier.seen.lock().unwrap();
    assert!(!seen[0].1);
    assert!(seen[1].1);
}

#[tokio::test]
async fn test_empty_collection_search() {
    let retrieval = retrieval();
    let response = retrieval
        .query("s", CollectionKind::Documents, "anything", Some(5))
        .await;

    assert!(response.results.is_empty());
    assert!(response.error.is_none());
    assert_eq!(response.state, RouterState::AwaitingSelection);
}

#[tokio::test]
async fn test_select_out_of_range_then_new_search() {
    let retrieval = retrieval();
    ingest_three_documents(&retrieval).await;

    retrieval
        .query("s", CollectionKind::Documents, "apple", Some(3))
        .await;
    let missed = retrieval
        .query("s", CollectionKind::Documents, "the fifth", Some(3))
        .await;
    assert!(missed.results.is_empty());
    assert_eq!(missed.state, RouterState::Idle);
    assert!(missed.error.is_none());

    // Nothing pending any more, so "the first" searches.
    let next = retrieval
        .query("s", CollectionKind::Documents, "the first", Some(3))
        .await;
    assert_eq!(next.intent.as_deref(), Some("NEW_SEARCH"));
}

#[tokio::test]
async fn test_image_search_and_asset_fetch() {
    let retrieval = retrieval();
    for (name, pixels) in [
        ("beach.png", "ocean sunset"),
        ("peak.png", "mountain mountain"),
    ] {
        retrieval
            .ingest(
                CollectionKind::Images,
                pixels.as_bytes(),
                name,
                Metadata::new(),
            )
            .await
            .unwrap();
    }

    let response = retrieval
        .query("s", CollectionKind::Images, "mountain", Some(1))
        .await;
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].content, "peak.png");

    let bytes = retrieval
        .store(CollectionKind::Images)
        .fetch_asset(&response.results[0].external_ref)
        .await
        .unwrap();
    assert_eq!(bytes, b"mountain mountain");
}

#[tokio::test]
async fn test_bundle_survives_restart() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("blobs.sqlite");

    let config = RetrievalConfig::default();
    let open = || {
        Retrieval::new(
            &config,
            Arc::new(SqliteBlobStore::open(&path, "drive").unwrap()),
            Arc::new(KeywordEmbedder::default()),
            Arc::new(TruncatingSummarizer::default()),
            Arc::new(RuleClassifier::new()),
        )
    };

    let refs = ingest_three_documents(&open()).await;

    let reopened = open();
    let response = reopened
        .query("s", CollectionKind::Documents, "ocean", None)
        .await;
    assert_eq!(response.results[0].external_ref, refs[2]);
    assert_eq!(reopened.stats().await.unwrap().documents, 3);
}
