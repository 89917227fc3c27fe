use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use glossary_core::{GlossaryDocument, GlossaryFilter, GlossaryPage, Pagination};
use serde_json::{json, Value};
use tokio::task;
use tracing::error;

use crate::error::AppError;
use crate::{AppState, Catalog};

/// Query-string parameters of `GET /glossary`. Kept as raw strings so that
/// malformed paging values fall back to defaults instead of rejecting the
/// request.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GlossaryParams {
    pub domain: Option<String>,
    pub kind: Option<String>,
    pub q: Option<String>,
    pub course: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl GlossaryParams {
    /// The first occurrence of a repeated key wins; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "domain" => &mut params.domain,
                "kind" => &mut params.kind,
                "q" => &mut params.q,
                "course" => &mut params.course,
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    pub fn filter(&self) -> GlossaryFilter {
        GlossaryFilter {
            domain: self.domain.clone(),
            kind: self.kind.clone(),
            term_substring: self.q.clone(),
            course_title: self.course.clone(),
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page.as_deref(), self.limit.as_deref())
    }
}

pub async fn list_glossary(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<GlossaryPage>, AppError> {
    let params = GlossaryParams::from_pairs(pairs);
    let filter = params.filter();
    let pagination = params.pagination();
    let page = run_blocking(&state, move |catalog| catalog.list(&filter, pagination)).await?;
    Ok(Json(page))
}

pub async fn get_glossary_term(
    State(state): State<Arc<AppState>>,
    Path(term): Path<String>,
) -> Result<Json<GlossaryDocument>, AppError> {
    let found = run_blocking(&state, move |catalog| catalog.find_by_term(&term)).await?;
    found.map(Json).ok_or(AppError::NotFound)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn health_db(State(state): State<Arc<AppState>>) -> Response {
    match run_blocking(&state, |catalog| catalog.database_name()).await {
        Ok(database) => Json(json!({ "ok": true, "database": database })).into_response(),
        Err(err) => {
            error!(error = %err, "database health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": "DB check failed" })),
            )
                .into_response()
        }
    }
}

/// Runs store work on the blocking pool; the catalog's connection is
/// returned to the pool before this resolves.
pub(crate) async fn run_blocking<T, F>(state: &Arc<AppState>, work: F) -> Result<T, AppError>
where
    F: FnOnce(&Catalog) -> glossary_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    task::spawn_blocking(move || work(&state.catalog))
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::internal)
}
