//! Axum route handlers for the soulkeeper HTTP server.
//!
//! # Routes
//!
//! - `GET    /health`                  — Liveness probe
//! - `GET    /profiles`                — List profile summaries
//! - `POST   /profiles`                — Create a profile (optionally seeded)
//! - `POST   /profiles/update`         — Merge observations into a profile
//! - `GET    /profiles/:id`            — Fetch a profile record
//! - `DELETE /profiles/:id`            — Delete a profile
//! - `GET    /profiles/:id/soul`       — Rendered narrative document
//! - `GET    /profiles/:id/identity`   — Rendered structured document
//!
//! Every handler resolves to either its payload or a structured failure body
//! `{ "error": ..., "details": [...] }`; version conflicts come back as 409
//! with `"retryable": true` so callers know to reload and retry.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::Catalog;
use crate::profile::merge::{merge_observations, merge_with_drift};
use crate::profile::types::{
    ChangeRecord, Demographics, DriftWarning, Profile, DEFAULT_SOURCE,
};
use crate::render::{render_documents, render_identity, render_soul};
use crate::storage::{validate_id, FileProfileStore, ProfileStore};
use crate::utilities::errors::ProfileError;
use crate::validation::{
    validate_demographics, validate_locale, validate_observations, ValidationErrors,
};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Profile repository.
    pub store: Arc<dyn ProfileStore>,
    /// Read-only facet catalog, constructed once at startup.
    pub catalog: &'static Catalog,
}

impl AppState {
    /// State backed by the default file store location.
    pub fn open_default() -> Result<Self, ProfileError> {
        Ok(Self::with_store(Arc::new(FileProfileStore::open_default()?)))
    }

    pub fn with_store(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            catalog: Catalog::get(),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/profiles",
            get(list_profiles_handler).post(create_profile_handler),
        )
        .route("/profiles/update", post(update_profile_handler))
        .route(
            "/profiles/:id",
            get(get_profile_handler).delete(delete_profile_handler),
        )
        .route("/profiles/:id/soul", get(get_soul_handler))
        .route("/profiles/:id/identity", get(get_identity_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub name: String,
    /// Explicit id; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub demographics: Option<Demographics>,
    /// Seed observations, merged at version 1 with source `"onboarding"`.
    #[serde(default)]
    pub facets: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub facets: BTreeMap<String, Value>,
    #[serde(default)]
    pub source: Option<String>,
    /// Caller-rendered documents; regenerated when absent.
    #[serde(default)]
    pub soul_doc: Option<String>,
    #[serde(default)]
    pub identity_doc: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub profile: Profile,
    pub changes: Vec<ChangeRecord>,
    pub drift_warnings: Vec<DriftWarning>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    #[serde(default)]
    pub locale: Option<String>,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

type ApiError = (StatusCode, Json<Value>);

fn profile_error(err: ProfileError) -> ApiError {
    let status = match &err {
        ProfileError::NotFound { .. } => StatusCode::NOT_FOUND,
        ProfileError::MissingIdentifier | ProfileError::InvalidIdentifier { .. } => {
            StatusCode::BAD_REQUEST
        }
        ProfileError::AlreadyExists { .. } | ProfileError::VersionConflict { .. } => {
            StatusCode::CONFLICT
        }
        ProfileError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({
        "error": err.to_string(),
        "retryable": err.is_retryable(),
    });
    (status, Json(body))
}

fn validation_error(err: ValidationErrors) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "validation failed",
            "details": err.errors,
        })),
    )
}

fn internal_error(err: anyhow::Error) -> ApiError {
    tracing::error!("internal error: {err:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": err.to_string()})),
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "soulkeeper",
    }))
}

/// GET /profiles — list stored profile summaries.
async fn list_profiles_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.store.alist().await.map_err(profile_error)?;
    Ok(Json(json!({ "profiles": summaries })))
}

/// POST /profiles — create a profile, optionally seeded with observations.
async fn create_profile_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let locale =
        validate_locale(request.locale.as_deref(), state.catalog).map_err(validation_error)?;
    let seed =
        validate_observations(&request.facets, state.catalog).map_err(validation_error)?;
    if let Some(demographics) = &request.demographics {
        validate_demographics(demographics).map_err(validation_error)?;
    }

    let mut profile = Profile::new(request.name, locale);
    if let Some(id) = request.id {
        validate_id(&id).map_err(profile_error)?;
        profile.id = id;
    }
    profile.correlation_id = request.correlation_id;
    if let Some(demographics) = request.demographics {
        profile.demographics = demographics;
    }
    if !seed.is_empty() {
        // Seeding happens before the first save, so the profile still
        // debuts at version 1.
        let outcome = merge_observations(&profile.facets, &seed, "onboarding", Utc::now());
        profile.facets = outcome.merged;
    }

    if state
        .store
        .aload(&profile.id)
        .await
        .map_err(profile_error)?
        .is_some()
    {
        return Err(profile_error(ProfileError::AlreadyExists {
            id: profile.id.clone(),
        }));
    }

    let docs = render_documents(&profile, state.catalog).map_err(internal_error)?;
    state
        .store
        .asave(&profile, &docs.soul, &docs.identity, None)
        .await
        .map_err(profile_error)?;

    tracing::info!("created profile {} ({} seed facets)", profile.id, profile.facets.len());
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /profiles/:id — fetch one profile record.
async fn get_profile_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .store
        .aload(&id)
        .await
        .map_err(profile_error)?
        .ok_or_else(|| profile_error(ProfileError::NotFound { id }))?;
    Ok(Json(profile))
}

/// DELETE /profiles/:id — delete a profile and its documents.
async fn delete_profile_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.adelete(&id).await.map_err(profile_error)? {
        Ok(Json(json!({"deleted": true})))
    } else {
        Err(profile_error(ProfileError::NotFound { id }))
    }
}

/// POST /profiles/update — the composed operation: resolve, merge, detect
/// drift, bump version, re-render, save with the pre-merge version.
async fn update_profile_handler(
    State(state): State<AppState>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut profile = resolve_profile(&state, &request).await.map_err(profile_error)?;
    let observations =
        validate_observations(&request.facets, state.catalog).map_err(validation_error)?;

    let expected_version = profile.version;
    let now = Utc::now();
    let source = request.source.as_deref().unwrap_or(DEFAULT_SOURCE);
    let report = merge_with_drift(&profile.facets, &observations, source, now);
    profile.apply_merge(report.merged, now);

    let soul = match request.soul_doc {
        Some(doc) => doc,
        None => render_soul(&profile, state.catalog).map_err(internal_error)?,
    };
    let identity = match request.identity_doc {
        Some(doc) => doc,
        None => render_identity(&profile, state.catalog).map_err(internal_error)?,
    };

    state
        .store
        .asave(&profile, &soul, &identity, Some(expected_version))
        .await
        .map_err(profile_error)?;

    tracing::info!(
        "updated profile {} to version {}: {} change(s), {} drift warning(s)",
        profile.id,
        profile.version,
        report.changes.len(),
        report.drift_warnings.len()
    );
    Ok(Json(UpdateProfileResponse {
        profile,
        changes: report.changes,
        drift_warnings: report.drift_warnings,
    }))
}

/// Resolve the target profile by id or correlation id.
async fn resolve_profile(
    state: &AppState,
    request: &UpdateProfileRequest,
) -> Result<Profile, ProfileError> {
    if let Some(id) = &request.profile_id {
        state
            .store
            .aload(id)
            .await?
            .ok_or_else(|| ProfileError::NotFound { id: id.clone() })
    } else if let Some(correlation_id) = &request.correlation_id {
        state
            .store
            .aload_by_correlation(correlation_id)
            .await?
            .ok_or_else(|| ProfileError::NotFound {
                id: correlation_id.clone(),
            })
    } else {
        Err(ProfileError::MissingIdentifier)
    }
}

/// GET /profiles/:id/soul — rendered narrative document.
async fn get_soul_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DocumentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    render_document(&state, &id, &query, render_soul).await
}

/// GET /profiles/:id/identity — rendered structured document.
async fn get_identity_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DocumentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    render_document(&state, &id, &query, render_identity).await
}

async fn render_document(
    state: &AppState,
    id: &str,
    query: &DocumentQuery,
    render: fn(&Profile, &Catalog) -> Result<String, anyhow::Error>,
) -> Result<(StatusCode, [(header::HeaderName, &'static str); 1], String), ApiError> {
    let mut profile = state
        .store
        .aload(id)
        .await
        .map_err(profile_error)?
        .ok_or_else(|| profile_error(ProfileError::NotFound { id: id.to_string() }))?;
    if let Some(locale) = &query.locale {
        profile.locale =
            validate_locale(Some(locale), state.catalog).map_err(validation_error)?;
    }
    let doc = render(&profile, state.catalog).map_err(internal_error)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        doc,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn test_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let store = FileProfileStore::new(dir.path()).unwrap();
        let app = app_router(AppState::with_store(Arc::new(store)));
        (dir, app)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(body) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).to_string(),
            ))
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "soulkeeper");
    }

    #[tokio::test]
    async fn test_create_update_fetch_flow() {
        let (_dir, app) = test_app();

        let (status, created) = send(
            &app,
            "POST",
            "/profiles",
            Some(json!({
                "id": "ada",
                "name": "Ada",
                "correlation_id": "chat-1",
                "facets": {
                    "sociability": {"value": "introverted", "confidence": 0.6}
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["version"], 1);
        assert_eq!(created["facets"]["sociability"]["confidence"], 0.6);

        // Reinforce the seeded belief through the composed update operation.
        let (status, updated) = send(
            &app,
            "POST",
            "/profiles/update",
            Some(json!({
                "profile_id": "ada",
                "facets": {
                    "sociability": {"value": "introverted", "confidence": 0.5}
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["profile"]["version"], 2);
        assert_eq!(updated["changes"][0]["reason"], "confidence_boost");
        assert!(updated["drift_warnings"].as_array().unwrap().is_empty());

        let (status, fetched) = send(&app, "GET", "/profiles/ada", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["version"], 2);

        let (status, listed) = send(&app, "GET", "/profiles", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["profiles"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_resolves_by_correlation_id() {
        let (_dir, app) = test_app();
        send(
            &app,
            "POST",
            "/profiles",
            Some(json!({"id": "ada", "name": "Ada", "correlation_id": "chat-1"})),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/profiles/update",
            Some(json!({
                "correlation_id": "chat-1",
                "facets": {"outlook": {"value": "optimistic", "confidence": 0.8}}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile"]["id"], "ada");
        assert_eq!(body["changes"][0]["reason"], "new_facet");
    }

    #[tokio::test]
    async fn test_update_reports_drift() {
        let (_dir, app) = test_app();
        send(
            &app,
            "POST",
            "/profiles",
            Some(json!({
                "id": "ada",
                "name": "Ada",
                "facets": {"sociability": {"value": "introverted", "confidence": 0.6}}
            })),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/profiles/update",
            Some(json!({
                "profile_id": "ada",
                "facets": {"sociability": {"value": "extroverted", "confidence": 0.65}}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let warnings = body["drift_warnings"].as_array().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0]["facet"], "sociability");
    }

    #[tokio::test]
    async fn test_update_without_identifier_is_bad_request() {
        let (_dir, app) = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/profiles/update",
            Some(json!({"facets": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("correlation id"));
    }

    #[tokio::test]
    async fn test_update_unknown_profile_is_not_found() {
        let (_dir, app) = test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/profiles/update",
            Some(json!({"profile_id": "ghost", "facets": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_observation_is_field_error() {
        let (_dir, app) = test_app();
        send(&app, "POST", "/profiles", Some(json!({"id": "ada", "name": "Ada"}))).await;

        let (status, body) = send(
            &app,
            "POST",
            "/profiles/update",
            Some(json!({
                "profile_id": "ada",
                "facets": {"charisma": {"value": "high", "confidence": 0.9}}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "facets.charisma");
    }

    #[tokio::test]
    async fn test_create_collision_conflicts() {
        let (_dir, app) = test_app();
        let payload = json!({"id": "ada", "name": "Ada"});
        let (status, _) = send(&app, "POST", "/profiles", Some(payload.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&app, "POST", "/profiles", Some(payload)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn test_rendered_documents_served_as_markdown() {
        let (_dir, app) = test_app();
        send(
            &app,
            "POST",
            "/profiles",
            Some(json!({
                "id": "ada",
                "name": "Ada",
                "facets": {"outlook": {"value": "optimistic", "confidence": 0.8}}
            })),
        )
        .await;

        let (status, soul) = send(&app, "GET", "/profiles/ada/soul", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(soul.as_str().unwrap().contains("The Soul of Ada"));
        assert!(soul.as_str().unwrap().contains("Ada is optimistic."));

        let (status, identity) = send(&app, "GET", "/profiles/ada/identity", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(identity.as_str().unwrap().contains("Identity: Ada"));

        // Locale override renders the same profile in another language.
        let (status, soul_es) =
            send(&app, "GET", "/profiles/ada/soul?locale=es", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(soul_es.as_str().unwrap().contains("El alma de Ada"));
    }

    #[tokio::test]
    async fn test_delete_profile() {
        let (_dir, app) = test_app();
        send(&app, "POST", "/profiles", Some(json!({"id": "ada", "name": "Ada"}))).await;

        let (status, body) = send(&app, "DELETE", "/profiles/ada", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], true);

        let (status, _) = send(&app, "GET", "/profiles/ada", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", "/profiles/ada", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
