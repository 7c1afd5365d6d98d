//! Cost calculator route.

use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::Multipart;
use doc_translator_core::{CostEstimate, DocxDocument, Reviewer, util::extension_of};
use std::sync::Arc;
use tracing::info;

use crate::helpers::{OptionExt, ResultExt, RouteResult, UploadForm};
use crate::state::AppState;

/// Estimate time and cost of translating an uploaded `.docx`.
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> RouteResult<Json<CostEstimate>> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file("file").or_missing("No file uploaded")?;
    if extension_of(&file.file_name).as_deref() != Some("docx") {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Unsupported file type: {}", file.file_name),
        ));
    }

    let group_size = form
        .parse_field::<usize>("group_size")?
        .unwrap_or(state.config.post_edit.group_size);
    let reviewer: Reviewer = form
        .field("reviewer")
        .or_missing("Missing reviewer")?
        .parse()
        .or_bad_request()?;

    let data = file.data.to_vec();
    let document = tokio::task::spawn_blocking(move || DocxDocument::from_bytes(&data))
        .await
        .or_internal_error()?
        .or_bad_request()?;

    let estimate = CostEstimate::compute(&document.stats(), group_size, reviewer);
    info!(
        "Estimated {}: {} words, {} total",
        file.file_name, estimate.words, estimate.total_cost
    );
    Ok(Json(estimate))
}
