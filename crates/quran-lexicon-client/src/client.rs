use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use quran_lexicon_types::loose;
use quran_lexicon_types::{
    EvidenceRow, LexiconBundle, LexiconLinkRecord, LexiconMorphology, MorphologyRecord,
    SynonymTopic, SynonymWord, merge_synonym_words, parse_synonym_words,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{LexiconError, reports_failure};
use crate::transport::{Endpoint, JsonTransport};

pub const DEFAULT_PAGE_SIZE: usize = 200;
pub const DEFAULT_MAX_ROWS: usize = 2500;

/// Pagination bounds for the link and evidence listings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BundleLimits {
    pub page_size: usize,
    pub max_rows: usize,
}

impl BundleLimits {
    pub fn new(page_size: usize, max_rows: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            max_rows,
        }
    }
}

impl Default for BundleLimits {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_MAX_ROWS)
    }
}

pub type BundleResult = Result<Arc<LexiconBundle>, LexiconError>;

/// One in-flight or settled fetch, shared by every caller for the same id.
type BundleCell = Arc<OnceCell<BundleResult>>;

/// Decoded `GET /ar/lexicon-synonyms` body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SynonymPayload {
    pub topic_ids: Vec<String>,
    pub topics: Vec<SynonymTopic>,
    pub words: Vec<SynonymWord>,
    pub lexicon: Option<LexiconMorphology>,
}

/// Decode a synonyms body. `entries` and `synonyms_json` may overlap and are
/// merged on the composite word key; unknown shapes are skipped.
pub fn parse_synonym_payload(body: &Value) -> SynonymPayload {
    let topic_ids = match body.get("topic_ids") {
        Some(Value::Array(items)) => items.iter().filter_map(loose::text_value).collect(),
        _ => Vec::new(),
    };
    let topics = match body.get("topics") {
        Some(Value::Array(items)) => items.iter().filter_map(SynonymTopic::from_value).collect(),
        _ => Vec::new(),
    };
    let entries = parse_synonym_words(body.get("entries"));
    let embedded = body
        .get("synonyms_json")
        .and_then(loose::parse_if_string::<Value>);
    let words = merge_synonym_words(entries, parse_synonym_words(embedded.as_ref()));
    SynonymPayload {
        topic_ids,
        topics,
        words,
        lexicon: body.get("lexicon").and_then(LexiconMorphology::from_value),
    }
}

/// Fetches and caches [`LexiconBundle`]s by lexicon id.
///
/// Concurrent requests for one id share a single fetch. A failed fetch is
/// evicted so the next request retries; `refresh` forces a new fetch.
pub struct LexiconBundleClient {
    transport: Arc<dyn JsonTransport>,
    limits: BundleLimits,
    cache: DashMap<String, BundleCell>,
}

impl LexiconBundleClient {
    pub fn new(transport: Arc<dyn JsonTransport>) -> Self {
        Self {
            transport,
            limits: BundleLimits::default(),
            cache: DashMap::new(),
        }
    }

    pub fn with_limits(mut self, limits: BundleLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> BundleLimits {
        self.limits
    }

    /// Bundle for `lexicon_id`, from cache or fetched.
    ///
    /// A blank id yields the empty bundle without touching the network.
    pub async fn get_lexicon_bundle(&self, lexicon_id: &str, refresh: bool) -> BundleResult {
        let id = lexicon_id.trim();
        if id.is_empty() {
            return Ok(Arc::new(LexiconBundle::empty()));
        }
        if refresh && self.cache.remove(id).is_some() {
            debug!(lexicon_id = id, "bundle cache entry dropped for refresh");
        }

        let cell: BundleCell = Arc::clone(
            self.cache
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );
        if cell.initialized() {
            debug!(lexicon_id = id, "bundle cache hit");
        } else {
            debug!(lexicon_id = id, "bundle cache miss");
        }

        let result = cell.get_or_init(|| self.load_bundle(id)).await.clone();
        if let Err(err) = &result {
            // Only evict our own entry; a refresh may already have replaced it.
            let evicted = self
                .cache
                .remove_if(id, |_, current| Arc::ptr_eq(current, &cell))
                .is_some();
            warn!(lexicon_id = id, evicted, error = %err, "bundle fetch failed");
        }
        result
    }

    /// A settled, successful bundle if one is cached. Never waits.
    pub fn cached(&self, lexicon_id: &str) -> Option<Arc<LexiconBundle>> {
        let entry = self.cache.get(lexicon_id.trim())?;
        let bundle = entry.value().get()?.as_ref().ok().cloned();
        bundle
    }

    pub fn invalidate(&self, lexicon_id: &str) -> bool {
        self.cache.remove(lexicon_id.trim()).is_some()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    async fn load_bundle(&self, lexicon_id: &str) -> BundleResult {
        let (links, evidence, synonyms) = tokio::join!(
            self.fetch_pages::<LexiconLinkRecord, _>(|limit, offset| {
                Endpoint::MorphologyLinks {
                    lexicon_id: lexicon_id.to_string(),
                    limit,
                    offset,
                }
            }),
            self.fetch_pages::<EvidenceRow, _>(|limit, offset| Endpoint::Evidence {
                lexicon_id: lexicon_id.to_string(),
                limit,
                offset,
            }),
            self.fetch_synonyms(lexicon_id),
        );
        let links = links?;
        let evidence = evidence?;

        let mut seen = HashSet::new();
        let morphology_ids: Vec<String> = links
            .iter()
            .filter_map(LexiconLinkRecord::morphology_id)
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect();
        let morphology_by_id = self.fetch_morphology_by_ids(morphology_ids).await;

        info!(
            lexicon_id,
            links = links.len(),
            evidence = evidence.len(),
            morphology = morphology_by_id.len(),
            synonyms = synonyms.words.len(),
            "bundle loaded"
        );

        Ok(Arc::new(LexiconBundle {
            lexicon_id: lexicon_id.to_string(),
            morphology_links: links,
            evidence_rows: evidence,
            morphology_by_id,
            synonym_topic_ids: synonyms.topic_ids,
            synonym_topics: synonyms.topics,
            synonym_words: synonyms.words,
            lexicon_morphology: synonyms.lexicon,
        }))
    }

    /// Walk `(limit, offset)` pages until an empty or short page, or the row cap.
    ///
    /// A reported `total` is ignored; it may be stale or missing.
    async fn fetch_pages<T, F>(&self, endpoint: F) -> Result<Vec<T>, LexiconError>
    where
        T: DeserializeOwned,
        F: Fn(usize, usize) -> Endpoint,
    {
        let BundleLimits {
            page_size,
            max_rows,
        } = self.limits;
        let mut rows: Vec<T> = Vec::new();
        let mut offset = 0;

        while rows.len() < max_rows {
            let request = endpoint(page_size, offset);
            let path = request.path();
            let page = self.transport.get_json(request).await?;
            if reports_failure(&page) {
                return Err(LexiconError::from_api_body(&page));
            }
            let results = page
                .get("results")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            debug!(path, offset, rows = results.len(), "fetched page");
            if results.is_empty() {
                break;
            }
            rows.extend(loose::records_from_values::<T>(results));
            offset += results.len();
            if results.len() < page_size {
                break;
            }
        }

        if rows.len() > max_rows {
            info!(max_rows, fetched = rows.len(), "truncating paginated rows at cap");
            rows.truncate(max_rows);
        }
        Ok(rows)
    }

    /// Synonym data never fails the bundle; errors degrade to empty.
    async fn fetch_synonyms(&self, lexicon_id: &str) -> SynonymPayload {
        let endpoint = Endpoint::Synonyms {
            lexicon_id: lexicon_id.to_string(),
        };
        match self.transport.get_json(endpoint).await {
            Ok(body) if reports_failure(&body) => {
                warn!(lexicon_id, error = %LexiconError::from_api_body(&body), "synonyms unavailable");
                SynonymPayload::default()
            }
            Ok(body) => parse_synonym_payload(&body),
            Err(err) => {
                warn!(lexicon_id, error = %err, "synonyms unavailable");
                SynonymPayload::default()
            }
        }
    }

    /// One concurrent lookup per id; a failed lookup only leaves its entry out.
    async fn fetch_morphology_by_ids(&self, ids: Vec<String>) -> BTreeMap<String, MorphologyRecord> {
        let mut tasks = JoinSet::new();
        for id in ids {
            let transport = Arc::clone(&self.transport);
            tasks.spawn(async move {
                let result = transport
                    .get_json(Endpoint::Morphology { id: id.clone() })
                    .await;
                (id, result)
            });
        }

        let mut by_id = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(body))) => {
                    if reports_failure(&body) {
                        debug!(morphology_id = %id, "morphology lookup reported failure");
                        continue;
                    }
                    match body.get("result").filter(|r| r.is_object()) {
                        Some(result) => match MorphologyRecord::deserialize(result) {
                            Ok(record) => {
                                by_id.insert(id, record);
                            }
                            Err(err) => warn!(morphology_id = %id, error = %err, "undecodable morphology"),
                        },
                        None => debug!(morphology_id = %id, "morphology lookup returned no record"),
                    }
                }
                Ok((id, Err(err))) => {
                    warn!(morphology_id = %id, error = %err, "morphology lookup failed");
                }
                Err(err) => warn!(error = %err, "morphology lookup task aborted"),
            }
        }
        by_id
    }
}
