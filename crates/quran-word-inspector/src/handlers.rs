use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use quran_lexicon_client::{LexiconBundleClient, LexiconError};
use quran_lexicon_types::MorphologySelection;
use quran_morphology::{InspectorField, LocalCollections, ResolvedProfile, Resolver};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::inspector::{Inspector, Phase};

#[derive(Clone)]
pub struct AppState {
    pub resolver: Resolver,
    pub client: Arc<LexiconBundleClient>,
    pub disable_cache: bool,
}

#[derive(Deserialize)]
pub struct InspectRequest {
    pub selection: MorphologySelection,
    #[serde(flatten)]
    pub collections: LocalCollections,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Deserialize)]
pub struct BundleQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Serialize)]
pub struct InspectResponse {
    phase: Phase,
    #[serde(flatten)]
    profile: ResolvedProfile,
    lexicon_fields: Vec<InspectorField>,
    morphology_fields: Vec<InspectorField>,
    has_lexicon_data: bool,
    has_morphology_data: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/inspect", post(inspect))
        .route("/v1/lexicon/{id}/bundle", get(lexicon_bundle))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

/// Run the full pipeline for one selection, waiting for the remote bundle.
async fn inspect(
    State(state): State<AppState>,
    payload: Result<Json<InspectRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let inspector = Inspector::new(state.resolver.clone(), Arc::clone(&state.client));
    inspector.set_collections(request.collections, false).await;
    let profile = inspector.select(request.selection, request.refresh).await;

    let response = InspectResponse {
        phase: inspector.phase(),
        lexicon_fields: profile.lexicon_fields(),
        morphology_fields: profile.morphology_fields(),
        has_lexicon_data: profile.has_lexicon_data(),
        has_morphology_data: profile.has_morphology_data(),
        profile,
    };
    Ok(Json(response).into_response())
}

async fn lexicon_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<BundleQuery>,
) -> Result<Response, ApiError> {
    let bundle = state.client.get_lexicon_bundle(&id, params.refresh).await?;

    if state.disable_cache || params.refresh {
        Ok(Json(&*bundle).into_response())
    } else {
        Ok((
            [(
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=300"),
            )],
            Json(&*bundle),
        )
            .into_response())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Upstream(#[from] LexiconError),
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(err) => {
                warn!(error = %err, upstream_status = ?err.status(), "upstream lexicon request failed");
                StatusCode::BAD_GATEWAY
            }
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
