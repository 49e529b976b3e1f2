use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use quran_lexicon_client::{
    BundleLimits, Endpoint, JsonTransport, LexiconBundleClient, LexiconError, TransportFuture,
};
use serde_json::{Value, json};

type Respond = Box<dyn Fn(&Endpoint) -> Result<Value, LexiconError> + Send + Sync>;

/// In-memory backend that records every request it serves.
struct FakeBackend {
    calls: Mutex<Vec<Endpoint>>,
    respond: Respond,
}

impl FakeBackend {
    fn new(
        respond: impl Fn(&Endpoint) -> Result<Value, LexiconError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    fn count(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.path() == path)
            .count()
    }

    fn total(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl JsonTransport for FakeBackend {
    fn get_json(&self, endpoint: Endpoint) -> TransportFuture<'_> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(endpoint.clone());
            // Let other callers observe the in-flight fetch.
            tokio::task::yield_now().await;
            (self.respond)(&endpoint)
        })
    }
}

fn page(rows: Vec<Value>) -> Value {
    json!({ "ok": true, "results": rows, "total": rows.len() })
}

fn ktb_backend(endpoint: &Endpoint) -> Result<Value, LexiconError> {
    Ok(match endpoint {
        Endpoint::MorphologyLinks { offset: 0, .. } => page(vec![
            json!({ "ar_u_lexicon": "LX-ktb", "ar_u_morphology": "M1", "surface_ar": "كَتَبَ" }),
            json!({ "ar_u_lexicon": "LX-ktb", "ar_u_morphology": "M2", "surface_ar": "كُتِبَ" }),
            json!({ "ar_u_lexicon": "LX-ktb", "ar_u_morphology": "M1", "surface_ar": "كَتَبَ" }),
        ]),
        Endpoint::Evidence { offset: 0, .. } => page(vec![
            json!({ "source_code": "lane", "page_no": "2590", "extract_text": "كتب" }),
            "not a row".into(),
        ]),
        Endpoint::MorphologyLinks { .. } | Endpoint::Evidence { .. } => page(vec![]),
        Endpoint::Synonyms { .. } => json!({
            "ok": true,
            "topic_ids": ["t1"],
            "topics": [{ "topic_id": "t1", "topic_en": "Writing" }],
            "entries": [{ "topic_id": "t1", "word_ar": "سَطَرَ", "word_en": "inscribe" }],
            "lexicon": { "ar_u_lexicon": "LX-ktb", "lemma_ar": "كَتَبَ", "morph_features": "{\"form\": \"I\"}" }
        }),
        Endpoint::Morphology { id } => json!({
            "ok": true,
            "result": { "ar_u_morphology": id, "root_norm": "كتب", "pos": "V" }
        }),
    })
}

#[tokio::test]
async fn blank_id_returns_empty_bundle_without_requests() {
    let backend = FakeBackend::new(ktb_backend);
    let client = LexiconBundleClient::new(backend.clone());

    let bundle = client.get_lexicon_bundle("   ", false).await.unwrap();
    assert!(bundle.is_empty());
    assert_eq!(backend.total(), 0);
    assert_eq!(client.cached_len(), 0);
}

#[tokio::test]
async fn assembles_bundle_from_all_endpoints() {
    let backend = FakeBackend::new(ktb_backend);
    let client = LexiconBundleClient::new(backend.clone());

    let bundle = client.get_lexicon_bundle(" LX-ktb ", false).await.unwrap();
    assert_eq!(bundle.lexicon_id, "LX-ktb");
    assert_eq!(bundle.morphology_links.len(), 3);
    assert_eq!(bundle.evidence_rows.len(), 1);
    assert_eq!(bundle.evidence_rows[0].page_no, Some(2590));
    assert_eq!(
        bundle.morphology_by_id.keys().collect::<Vec<_>>(),
        vec!["M1", "M2"]
    );
    assert_eq!(bundle.synonym_topic_ids, vec!["t1"]);
    assert_eq!(bundle.synonym_words[0].word_en.as_deref(), Some("inscribe"));
    let lexicon = bundle.lexicon_morphology.as_ref().unwrap();
    assert_eq!(lexicon.lemma(), Some("كَتَبَ"));
    assert_eq!(lexicon.features()["form"], "I");

    // One lookup per distinct morphology id.
    assert_eq!(backend.count("/ar/morphology"), 2);
}

#[tokio::test]
async fn concurrent_requests_share_one_fetch() {
    let backend = FakeBackend::new(ktb_backend);
    let client = LexiconBundleClient::new(backend.clone());

    let (a, b) = tokio::join!(
        client.get_lexicon_bundle("LX-ktb", false),
        client.get_lexicon_bundle("LX-ktb", false)
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(backend.count("/ar/lexicon-morphology"), 1);
    assert_eq!(backend.count("/ar/book-search"), 1);
    assert_eq!(backend.count("/ar/lexicon-synonyms"), 1);
    assert_eq!(backend.count("/ar/morphology"), 2);

    let before = backend.total();
    let again = client.get_lexicon_bundle("LX-ktb", false).await.unwrap();
    assert!(Arc::ptr_eq(&a, &again));
    assert_eq!(backend.total(), before);
    assert!(client.cached("LX-ktb").is_some());

    let refreshed = client.get_lexicon_bundle("LX-ktb", true).await.unwrap();
    assert!(!Arc::ptr_eq(&a, &refreshed));
    assert_eq!(backend.total(), before * 2);
}

#[tokio::test]
async fn pagination_stops_on_short_page_and_ignores_total() {
    let backend = FakeBackend::new(|endpoint| {
        Ok(match endpoint {
            Endpoint::MorphologyLinks { limit, offset, .. } => {
                let rows = if *offset == 0 { *limit } else { 50 };
                let rows = (0..rows)
                    .map(|i| json!({ "ar_u_lexicon": "LX-big", "surface_ar": format!("w{}", offset + i) }))
                    .collect();
                json!({ "ok": true, "results": Value::Array(rows), "total": 5000 })
            }
            _ => page(vec![]),
        })
    });
    let client = LexiconBundleClient::new(backend.clone());

    let bundle = client.get_lexicon_bundle("LX-big", false).await.unwrap();
    assert_eq!(bundle.morphology_links.len(), 250);
    assert_eq!(bundle.morphology_links[249].surface_ar.as_deref(), Some("w249"));

    let offsets: Vec<usize> = backend
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Endpoint::MorphologyLinks { limit, offset, .. } => {
                assert_eq!(*limit, 200);
                Some(*offset)
            }
            _ => None,
        })
        .collect();
    assert_eq!(offsets, vec![0, 200]);
}

#[tokio::test]
async fn rows_are_truncated_at_the_cap() {
    let backend = FakeBackend::new(|endpoint| {
        Ok(match endpoint {
            Endpoint::Evidence { limit, offset, .. } => page(
                (0..*limit)
                    .map(|i| json!({ "source_code": "lane", "chunk_id": format!("c{}", offset + i) }))
                    .collect(),
            ),
            _ => page(vec![]),
        })
    });
    let client = LexiconBundleClient::new(backend.clone()).with_limits(BundleLimits::new(3, 5));

    let bundle = client.get_lexicon_bundle("LX-big", false).await.unwrap();
    assert_eq!(bundle.evidence_rows.len(), 5);
    assert_eq!(bundle.evidence_rows[4].chunk_id.as_deref(), Some("c4"));
    assert_eq!(backend.count("/ar/book-search"), 2);
}

#[tokio::test]
async fn failures_are_shared_then_evicted() {
    let evidence_calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&evidence_calls);
    let backend = FakeBackend::new(move |endpoint| match endpoint {
        Endpoint::Evidence { .. } if seen.fetch_add(1, Ordering::SeqCst) == 0 => {
            Err(LexiconError::from_response(500, &json!({ "error": "db down" })))
        }
        other => ktb_backend(other),
    });
    let client = LexiconBundleClient::new(backend.clone());

    let (a, b) = tokio::join!(
        client.get_lexicon_bundle("LX-ktb", false),
        client.get_lexicon_bundle("LX-ktb", false)
    );
    let err = a.unwrap_err();
    assert_eq!(err.to_string(), "db down");
    assert_eq!(err.status(), Some(500));
    assert_eq!(b.unwrap_err(), err);
    assert_eq!(evidence_calls.load(Ordering::SeqCst), 1);
    assert!(client.cached("LX-ktb").is_none());
    assert_eq!(client.cached_len(), 0);

    let retried = client.get_lexicon_bundle("LX-ktb", false).await.unwrap();
    assert_eq!(retried.evidence_rows.len(), 1);
}

#[tokio::test]
async fn api_failure_in_a_page_fails_the_bundle() {
    let backend = FakeBackend::new(|endpoint| match endpoint {
        Endpoint::MorphologyLinks { .. } => Ok(json!({ "ok": false, "error": "Lexicon not found" })),
        other => ktb_backend(other),
    });
    let client = LexiconBundleClient::new(backend);

    let err = client.get_lexicon_bundle("LX-none", false).await.unwrap_err();
    assert_eq!(err, LexiconError::Api { message: "Lexicon not found".into() });
}

#[tokio::test]
async fn morphology_lookup_failures_are_skipped() {
    let backend = FakeBackend::new(|endpoint| match endpoint {
        Endpoint::MorphologyLinks { offset: 0, .. } => Ok(page(vec![
            json!({ "ar_u_morphology": "M1" }),
            json!({ "ar_u_morphology": "M2" }),
            json!({ "ar_u_morphology": "M3" }),
            json!({ "ar_u_morphology": "M4" }),
        ])),
        Endpoint::Morphology { id } => match id.as_str() {
            "M2" => Err(LexiconError::Transport("connection reset".into())),
            "M3" => Ok(json!({ "ok": false, "error": "missing" })),
            "M4" => Ok(json!({ "ok": true, "result": null })),
            _ => ktb_backend(endpoint),
        },
        other => ktb_backend(other),
    });
    let client = LexiconBundleClient::new(backend);

    let bundle = client.get_lexicon_bundle("LX-ktb", false).await.unwrap();
    assert_eq!(bundle.morphology_links.len(), 4);
    assert_eq!(
        bundle.morphology_by_id.keys().collect::<Vec<_>>(),
        vec!["M1"]
    );
}

#[tokio::test]
async fn synonym_failures_degrade_to_empty() {
    let backend = FakeBackend::new(|endpoint| match endpoint {
        Endpoint::Synonyms { .. } => Err(LexiconError::from_response(503, &json!({}))),
        other => ktb_backend(other),
    });
    let client = LexiconBundleClient::new(backend);

    let bundle = client.get_lexicon_bundle("LX-ktb", false).await.unwrap();
    assert!(bundle.synonym_words.is_empty());
    assert!(bundle.synonym_topics.is_empty());
    assert!(bundle.lexicon_morphology.is_none());
    assert_eq!(bundle.morphology_links.len(), 3);
}
