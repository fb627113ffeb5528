use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::export::{to_csv, TableResponse, CSV_FILENAME};
use crate::normalize::parse_keyword_input;
use crate::pipeline::KeywordPipeline;
use crate::types::ResultTable;

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: KeywordPipeline,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/download", post(download))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Form input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Merged,
    Naver,
    Google,
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    /// Comma or newline separated keywords.
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub source: Source,
    #[serde(default = "default_detail")]
    pub detail: bool,
}

fn default_detail() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> &'static str {
    "ok"
}

async fn search(
    State(state): State<ApiState>,
    Form(form): Form<SearchForm>,
) -> Result<Json<TableResponse>, AppError> {
    let table = run_lookup(&state.pipeline, &form).await?;
    Ok(Json(TableResponse::from(&table)))
}

async fn download(
    State(state): State<ApiState>,
    Form(form): Form<SearchForm>,
) -> Result<impl IntoResponse, AppError> {
    let table = run_lookup(&state.pipeline, &form).await?;
    let body = to_csv(&table)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILENAME}\""),
            ),
        ],
        body,
    ))
}

async fn run_lookup(pipeline: &KeywordPipeline, form: &SearchForm) -> Result<ResultTable, AppError> {
    let keywords = parse_keyword_input(&form.keywords)?;
    info!(source = ?form.source, keywords = keywords.len(), detail = form.detail, "keyword lookup requested");

    match form.source {
        Source::Naver => pipeline.fetch_primary(&keywords, form.detail).await,
        Source::Google => pipeline.fetch_secondary(&keywords).await,
        Source::Merged => {
            let cap = pipeline.config().lookup_limit;
            pipeline.fetch_merged(&keywords, form.detail, cap).await
        }
    }
}
