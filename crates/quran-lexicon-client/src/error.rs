use serde_json::Value;
use thiserror::Error;

/// Failure fetching a lexicon bundle.
///
/// Cloneable so a single failed fetch can be handed to every caller that was
/// waiting on it. `Display` is the human-readable message shown to users.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LexiconError {
    /// Non-2xx response.
    #[error("{message}")]
    Request { status: u16, message: String },
    /// 2xx response whose body reported `ok: false`.
    #[error("{message}")]
    Api { message: String },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Decode(String),
}

fn body_text<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl LexiconError {
    /// Message from `body.error`, then `body.message`, then the status code.
    pub fn from_response(status: u16, body: &Value) -> Self {
        let message = body_text(body, "error")
            .or_else(|| body_text(body, "message"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed ({status})"));
        LexiconError::Request { status, message }
    }

    /// Error for a body that reported `ok: false`.
    pub fn from_api_body(body: &Value) -> Self {
        LexiconError::Api {
            message: body_text(body, "error")
                .unwrap_or("Request failed.")
                .to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            LexiconError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// True when a response body explicitly reports failure.
pub(crate) fn reports_failure(body: &Value) -> bool {
    body.get("ok") == Some(&Value::Bool(false))
}
