//! Health, options, history and disk usage.

use axum::{Json, extract::State};
use doc_translator_core::{
    DEFAULT_OUTPUT_FILE_NAME, LanguageOption, TranslatedFile, language_levels, source_languages,
    supported_models, target_languages,
    util::{VolumeUsage, dir_size, format_gigabytes},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::helpers::{ResultExt, RouteResult};
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
pub struct Options {
    pub source_languages: Vec<LanguageOption>,
    pub target_languages: Vec<LanguageOption>,
    pub models: Vec<&'static str>,
    pub language_levels: Vec<&'static str>,
    pub default_model: String,
    pub default_output_file_name: &'static str,
}

/// Choices a client needs to build the translation form.
pub async fn options(State(state): State<Arc<AppState>>) -> Json<Options> {
    Json(Options {
        source_languages: source_languages(),
        target_languages: target_languages(),
        models: supported_models(),
        language_levels: language_levels(),
        default_model: state.config.llm.model.clone(),
        default_output_file_name: DEFAULT_OUTPUT_FILE_NAME,
    })
}

/// Translated files, newest first.
pub async fn history(State(state): State<Arc<AppState>>) -> Json<Vec<TranslatedFile>> {
    Json(state.history.list())
}

/// Volume figures formatted like `"120 GB"`, plus what this service stores.
#[derive(Debug, Serialize)]
pub struct DiskUsage {
    pub total: String,
    pub used: String,
    pub free: String,
    pub uploads_bytes: u64,
    pub downloads_bytes: u64,
    pub translated_files: usize,
}

pub async fn disk_usage(State(state): State<Arc<AppState>>) -> RouteResult<Json<DiskUsage>> {
    let uploads = state.config.paths.upload_dir.clone();
    let downloads = state.config.paths.download_dir.clone();

    let (volume, uploads_bytes, downloads_bytes) = tokio::task::spawn_blocking(move || {
        Ok::<_, std::io::Error>((
            VolumeUsage::of(&downloads)?,
            dir_size(&uploads)?,
            dir_size(&downloads)?,
        ))
    })
    .await
    .or_internal_error()?
    .or_internal_error()?;

    Ok(Json(DiskUsage {
        total: format_gigabytes(volume.total),
        used: format_gigabytes(volume.used),
        free: format_gigabytes(volume.free),
        uploads_bytes,
        downloads_bytes,
        translated_files: state.history.len(),
    }))
}
