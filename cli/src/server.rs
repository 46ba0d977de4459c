use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use nextbite_core::error::{CatalogError, HistoryError, StoreError};
use nextbite_core::models::{
    Candidate, DEFAULT_MAX_SUGGESTIONS, DEFAULT_MIN_SUGGESTIONS, HistoryEntry, HistoryRange,
    HistoryView, Recipe, RecommendOptions,
};
use nextbite_core::service::NextBiteService;

use crate::commands::today;

const BODY_LIMIT: usize = 64 * 1024; // 64 KB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<NextBiteService>>,
    api_key: Option<String>,
}

impl AppState {
    fn svc(&self) -> MutexGuard<'_, NextBiteService> {
        self.svc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// First and last four characters of the key, for the startup banner.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateRecipeRequest {
    name: String,
    #[serde(default)]
    category: String,
}

#[derive(Deserialize)]
struct UpdateRecipeRequest {
    name: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
struct SuggestionQuery {
    min: Option<usize>,
    max: Option<usize>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    range: HistoryRange,
}

#[derive(Deserialize)]
struct SavePickRequest {
    recipe: String,
    #[serde(default)]
    replace: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<CatalogError>() {
            return match e {
                CatalogError::NotFound(_) => Self::NotFound(e.to_string()),
                CatalogError::EmptyName => Self::BadRequest(e.to_string()),
                CatalogError::Duplicate(_) => Self::Conflict(e.to_string()),
            };
        }
        if let Some(e) = err.downcast_ref::<HistoryError>() {
            return match e {
                HistoryError::NothingPicked(_) => Self::NotFound(e.to_string()),
                HistoryError::AlreadyPicked { .. } => Self::Conflict(e.to_string()),
            };
        }
        if let Some(e) = err.downcast_ref::<StoreError>() {
            return Self::Conflict(e.to_string());
        }
        Self::Internal(err)
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            tracing::warn!(path = %request.uri().path(), "rejected request without valid API key");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Recipe handlers ---

async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    Ok(Json(state.svc().list_recipes()?))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = state.svc().add_recipe(&req.name, &req.category)?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<UpdateRecipeRequest>,
) -> Result<Json<Recipe>, ApiError> {
    if req.name.is_none() && req.category.is_none() {
        return Err(ApiError::BadRequest(
            "at least one of name or category is required".to_string(),
        ));
    }
    let recipe = state
        .svc()
        .edit_recipe(&name, req.name.as_deref(), req.category.as_deref())?;
    Ok(Json(recipe))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.svc().delete_recipe(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Category handlers ---

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.svc().categories()?))
}

async fn browse_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Candidate>>, ApiError> {
    Ok(Json(state.svc().recipes_in_category(&category, today())?))
}

// --- Suggestions ---

async fn get_suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionQuery>,
) -> Result<Json<Vec<Candidate>>, ApiError> {
    let options = RecommendOptions::new(
        params.min.unwrap_or(DEFAULT_MIN_SUGGESTIONS),
        params.max.unwrap_or(DEFAULT_MAX_SUGGESTIONS),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(state.svc().suggestions(today(), options)?))
}

// --- Today's pick ---

async fn get_today(State(state): State<AppState>) -> Result<Json<HistoryEntry>, ApiError> {
    let today = today();
    state
        .svc()
        .todays_pick(today)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No pick saved for {today}")))
}

async fn save_today(
    State(state): State<AppState>,
    Json(req): Json<SavePickRequest>,
) -> Result<(StatusCode, Json<HistoryEntry>), ApiError> {
    let entry = state.svc().save_pick(&req.recipe, today(), req.replace)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn delete_today(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.svc().remove_todays_pick(today())?;
    Ok(StatusCode::NO_CONTENT)
}

// --- History ---

async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryView>>, ApiError> {
    Ok(Json(state.svc().history(params.range, today())?))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/recipes/{name}",
            put(update_recipe).delete(delete_recipe),
        )
        .route("/api/categories", get(list_categories))
        .route("/api/categories/{category}/recipes", get(browse_category))
        .route("/api/suggestions", get(get_suggestions))
        .route(
            "/api/today",
            get(get_today).post(save_today).delete(delete_today),
        )
        .route("/api/history", get(get_history))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    svc: NextBiteService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let data_dir = svc.store().dir().display().to_string();
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {} (see api_key file in data directory)",
            mask_key(key)
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    tracing::info!(%bind, port, %data_dir, "server started");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
