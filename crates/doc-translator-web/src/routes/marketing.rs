//! Marketing fiche route: analyse a `.docx`, write a sheet in French and
//! English, save both as PDFs.

use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::Multipart;
use doc_translator_core::{FicheGenerator, FicheKind, util::extension_of};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::helpers::{JsonError, OptionExt, ResultExt, UploadForm, checked_file_name};
use crate::state::AppState;

#[derive(Serialize)]
pub struct FicheLinks {
    pub french_pdf: String,
    pub english_pdf: String,
}

pub async fn generate_fiche(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<FicheLinks>, JsonError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file("file").or_missing("No file uploaded")?;
    if extension_of(&file.file_name).as_deref() != Some("docx") {
        return Err(JsonError(
            StatusCode::BAD_REQUEST,
            "Unsupported file type. Please provide a .docx file.".to_string(),
        ));
    }
    let action = form.field("action").or_missing("No action specified")?;
    let kind = FicheKind::from_action(action).or_bad_request()?;

    let upload_path = state
        .config
        .paths
        .upload_dir
        .join(checked_file_name(&file.file_name)?);
    tokio::fs::write(&upload_path, &file.data)
        .await
        .or_internal_with("Error saving upload")?;

    let generator = state.fiche_generator();
    let text = FicheGenerator::read_upload(&file.file_name, &file.data)
        .or_internal_with("Error analysing file")?;
    let analysis = generator.analyze_chunks(&text).await.map_err(|e| {
        error!("Analysis of {} failed: {}", file.file_name, e);
        JsonError(StatusCode::INTERNAL_SERVER_ERROR, format!("Error analysing file: {e}"))
    })?;

    let fiche = generator
        .generate(&analysis, kind)
        .await
        .or_internal_with("Error generating fiches")?;

    let dir = state.config.paths.marketing_dir();
    tokio::task::spawn_blocking(move || FicheGenerator::save_pdfs(&fiche, &dir))
        .await
        .or_internal_with("Error saving PDFs")?
        .or_internal_with("Error saving PDFs")?;

    info!("Generated {:?} fiche from {}", kind, file.file_name);
    Ok(Json(FicheLinks {
        french_pdf: "/marketing/download/french.pdf".to_string(),
        english_pdf: "/marketing/download/english.pdf".to_string(),
    }))
}
