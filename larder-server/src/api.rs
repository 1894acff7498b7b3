//! JSON API over the recipe pipeline and the history.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use larder::basic_models::StoredRecipeSet;
use larder::preferences::{Language, TimeLimit};
use larder_client::generation::RecipeGenerator;
use larder_client::history::{export_file_name, HistoryStore, KeyValueStore};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::errors::{WebError, WebResult};

pub type History = HistoryStore<Box<dyn KeyValueStore>>;

#[derive(Clone)]
pub struct AppState {
    pub generator: RecipeGenerator,
    pub history: Arc<History>,
}

impl AppState {
    pub fn new(generator: RecipeGenerator, store: impl KeyValueStore + 'static) -> Self {
        Self {
            generator,
            history: Arc::new(HistoryStore::new(Box::new(store))),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // `GET /health` goes to `health`
        .route("/health", get(health))
        .route("/api/options", get(options))
        .route("/api/recipes", post(generate_recipes))
        .route("/api/analyze-image", post(analyze_image))
        .route("/api/history", get(list_history).delete(clear_history))
        .route("/api/history/export", get(export_history))
        .route("/api/history/:id", delete(delete_history_entry))
        .with_state(state)
}

// Just reply that everything is okay
async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    pub languages: Vec<String>,
    pub time_limits: Vec<String>,
}

/// The choices a client can offer for language and time limit.
async fn options() -> Json<Options> {
    Json(Options {
        languages: Language::iter().map(|l| l.to_string()).collect(),
        time_limits: TimeLimit::iter().map(|t| t.to_string()).collect(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub ingredients: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub time_limit: TimeLimit,
}

/// Generate recipes and keep them in the history.
async fn generate_recipes(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> WebResult<Json<StoredRecipeSet>> {
    let ingredients = request.ingredients.trim();
    if ingredients.is_empty() {
        return Err(WebError::BadRequest("No ingredients given".into()));
    }
    let recipe_set = state
        .generator
        .generate_recipe(ingredients, request.language, request.time_limit)
        .await?;
    Ok(Json(state.history.save(recipe_set)?))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    /// Base64, without a `data:` prefix
    pub image: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectedIngredients {
    pub ingredients: String,
}

async fn analyze_image(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeImageRequest>,
) -> WebResult<Json<DetectedIngredients>> {
    if request.image.is_empty() {
        return Err(WebError::BadRequest("No image given".into()));
    }
    if !request.mime_type.starts_with("image/") {
        return Err(WebError::BadRequest(format!(
            "Not an image type: {}",
            request.mime_type
        )));
    }
    let ingredients = state
        .generator
        .analyze_image(&request.image, &request.mime_type)
        .await?;
    Ok(Json(DetectedIngredients { ingredients }))
}

async fn list_history(State(state): State<AppState>) -> WebResult<Json<Vec<StoredRecipeSet>>> {
    Ok(Json(state.history.list_all()?))
}

async fn clear_history(State(state): State<AppState>) -> WebResult<StatusCode> {
    state.history.clear_all()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_history_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<StatusCode> {
    if state.history.delete_by_id(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(WebError::NotFound)
    }
}

/// Offer the whole history as a dated JSON download.
async fn export_history(State(state): State<AppState>) -> WebResult<impl IntoResponse> {
    let document = state.history.export()?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(chrono::Local::now().date_naive())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document,
    ))
}
