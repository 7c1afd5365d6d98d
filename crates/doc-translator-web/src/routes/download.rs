//! Download routes for translated documents and fiche PDFs.

use axum::{
    extract::{Path, State},
    response::Response,
};
use std::sync::Arc;

use crate::helpers::{JsonError, RouteResult, attachment, checked_file_name};
use crate::state::AppState;

/// Download a translated document by name.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> RouteResult<Response> {
    let name = checked_file_name(&filename)?;
    attachment(&state.config.paths.download_dir.join(name), name).await
}

/// Download a generated fiche PDF.
pub async fn download_fiche(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, JsonError> {
    let name = checked_file_name(&filename)?;
    Ok(attachment(&state.config.paths.marketing_dir().join(name), name).await?)
}
