//! HTTP route handlers for the document translator web service.
//!
//! Every route answers JSON, except downloads (attachments) and the job
//! stream (server-sent events).

mod calculator;
mod download;
mod marketing;
mod system;
mod translate;

#[cfg(test)]
pub mod tests;

pub use calculator::calculate;
pub use download::{download_file, download_fiche};
pub use marketing::generate_fiche;
pub use system::{disk_usage, health, history, options};
pub use translate::{check_status, job_status, job_stream, start_translation};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

/// All routes, without middleware.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/options", get(options))
        // Translation jobs
        .route("/api/translate", post(start_translation))
        .route("/api/jobs/{job_id}", get(job_status))
        .route("/api/jobs/{job_id}/stream", get(job_stream))
        .route("/check_status", get(check_status))
        .route("/downloads/{filename}", get(download_file))
        .route("/api/history", get(history))
        // Tools
        .route("/api/calculator", post(calculate))
        .route("/api/marketing", post(generate_fiche))
        .route("/marketing/download/{filename}", get(download_fiche))
        .route("/disk_usage", get(disk_usage))
        .with_state(state)
}
