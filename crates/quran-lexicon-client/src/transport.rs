//! The JSON-over-HTTP seam between the bundle client and the backend.

use std::future::Future;
use std::pin::Pin;

use reqwest::header;
use serde_json::{Map, Value};

use crate::error::LexiconError;

/// Backend resources a bundle is assembled from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    MorphologyLinks {
        lexicon_id: String,
        limit: usize,
        offset: usize,
    },
    Evidence {
        lexicon_id: String,
        limit: usize,
        offset: usize,
    },
    Synonyms {
        lexicon_id: String,
    },
    Morphology {
        id: String,
    },
}

impl Endpoint {
    /// Path under the API base.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::MorphologyLinks { .. } => "/ar/lexicon-morphology",
            Endpoint::Evidence { .. } => "/ar/book-search",
            Endpoint::Synonyms { .. } => "/ar/lexicon-synonyms",
            Endpoint::Morphology { .. } => "/ar/morphology",
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::MorphologyLinks {
                lexicon_id,
                limit,
                offset,
            } => vec![
                ("ar_u_lexicon", lexicon_id.clone()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ],
            Endpoint::Evidence {
                lexicon_id,
                limit,
                offset,
            } => vec![
                ("mode", "lexicon".to_string()),
                ("ar_u_lexicon", lexicon_id.clone()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ],
            Endpoint::Synonyms { lexicon_id } => vec![("ar_u_lexicon", lexicon_id.clone())],
            Endpoint::Morphology { id } => vec![("id", id.clone())],
        }
    }
}

pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, LexiconError>> + Send + 'a>>;

/// Fetches one endpoint and returns its decoded JSON body.
///
/// Implementations turn non-2xx responses into [`LexiconError::Request`]; a
/// 2xx body carrying `ok: false` is returned as is for the caller to judge.
pub trait JsonTransport: Send + Sync {
    fn get_json(&self, endpoint: Endpoint) -> TransportFuture<'_>;
}

/// `reqwest` transport rooted at a configured API base.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_base: String,
}

impl HttpTransport {
    pub fn new(api_base: &str) -> Result<Self, LexiconError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LexiconError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, api_base))
    }

    pub fn with_client(client: reqwest::Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.api_base, endpoint.path())
    }
}

impl JsonTransport for HttpTransport {
    fn get_json(&self, endpoint: Endpoint) -> TransportFuture<'_> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url(&endpoint))
                .query(&endpoint.query())
                .header(header::CONTENT_TYPE, "application/json")
                .send()
                .await
                .map_err(|e| LexiconError::Transport(e.to_string()))?;

            let status = response.status();
            // Unparseable bodies read as `{}` so the status still produces a message.
            let body = response
                .json::<Value>()
                .await
                .unwrap_or_else(|_| Value::Object(Map::new()));
            if !status.is_success() {
                return Err(LexiconError::from_response(status.as_u16(), &body));
            }
            Ok(body)
        })
    }
}
