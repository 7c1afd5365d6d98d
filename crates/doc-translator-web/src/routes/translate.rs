//! Translation job routes: start a job, poll it, or follow it over SSE.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use axum_extra::extract::Multipart;
use doc_translator_core::{
    DEFAULT_OUTPUT_FILE_NAME, Glossary, JobState, JobStatus, Lang, PipelineProgress, Progress,
    TranslationOptions, util::extension_of,
};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::helpers::{OptionExt, ResultExt, RouteResult, UploadForm, checked_file_name};
use crate::state::{AppState, Job};

/// Interval between two progress checks of the SSE stream.
const STREAM_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Serialize)]
pub struct JobCreated {
    pub job_id: String,
    pub status_url: String,
    pub stream_url: String,
}

/// A validated translation request.
struct TranslateRequest {
    file_name: String,
    document: Vec<u8>,
    output_file_name: String,
    options: TranslationOptions,
}

fn glossary_upload(form: &mut UploadForm, field: &str, extensions: &[&str]) -> RouteResult<Option<Glossary>> {
    let Some(file) = form.take_file(field) else {
        return Ok(None);
    };
    let ext = extension_of(&file.file_name).unwrap_or_default();
    if !extensions.contains(&ext.as_str()) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Unsupported glossary file for {field}: {}", file.file_name),
        ));
    }
    Glossary::from_upload(&file.file_name, &file.data)
        .map(Some)
        .or_bad_request()
}

fn parse_request(state: &AppState, mut form: UploadForm) -> RouteResult<TranslateRequest> {
    let input = form.take_file("input_file").or_missing("No file uploaded")?;
    let file_name = checked_file_name(&input.file_name)?.to_string();

    let source = form.field("source_language").or_missing("Missing source_language")?;
    let target = form.field("target_language").or_missing("Missing target_language")?;
    let mut options = TranslationOptions::new(&state.config, Lang::new(source), Lang::new(target));

    options.post_edit = form.flag("post_edit", true);
    if options.post_edit && extension_of(&file_name).as_deref() != Some("docx") {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Post-editing needs a .docx file, got {file_name}"),
        ));
    }
    if let Some(group_size) = form.parse_field::<usize>("group_size")? {
        if group_size == 0 {
            return Err((StatusCode::BAD_REQUEST, "group_size must be at least 1".to_string()));
        }
        options.group_size = group_size;
    }
    if let Some(level) = form.field("language_level") {
        options.language_level = level.to_string();
    }
    if let Some(model) = form.field("gpt_model") {
        options.model = model.to_string();
    }

    options.deepl_glossary = glossary_upload(&mut form, "glossary_csv", &["csv", "tsv", "xlsx"])?;
    if let Some(glossary) = glossary_upload(&mut form, "glossary_gpt", &["csv", "tsv", "xlsx", "docx", "txt"])? {
        options.prompt_glossary = glossary;
    }

    let output_file_name = checked_file_name(
        form.field("output_file_name").unwrap_or(DEFAULT_OUTPUT_FILE_NAME),
    )?
    .to_string();

    Ok(TranslateRequest {
        file_name,
        document: input.data.to_vec(),
        output_file_name,
        options,
    })
}

/// Start a translation job.
///
/// Returns 202 Accepted with the job id; progress is read from the status or
/// stream URL.
pub async fn start_translation(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> RouteResult<(StatusCode, Json<JobCreated>)> {
    let form = UploadForm::read(multipart).await?;
    let request = parse_request(&state, form)?;

    let upload_path = state.config.paths.upload_dir.join(&request.file_name);
    tokio::fs::write(&upload_path, &request.document)
        .await
        .or_internal_with("Failed to store upload")?;

    let (id, job) = state.create_job().await;
    info!(
        "Job {} started for {} ({} -> {})",
        id, request.file_name, request.options.source_lang, request.options.target_lang
    );

    let job_state = Arc::clone(&state);
    tokio::spawn(async move {
        run_job(&job_state, &job, request, &id.to_string()).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(JobCreated {
            job_id: id.to_string(),
            status_url: format!("/api/jobs/{id}"),
            stream_url: format!("/api/jobs/{id}/stream"),
        }),
    ))
}

async fn run_job(state: &AppState, job: &Job, request: TranslateRequest, job_id: &str) {
    let pipeline = state.pipeline();
    let on_progress = |event: PipelineProgress| {
        let status = match event {
            PipelineProgress::Stage(stage) => JobStatus::stage(stage, None),
            PipelineProgress::Paragraphs { done, total } => {
                let mut status = job.status();
                status.progress = Some(Progress { done, total });
                status
            }
        };
        job.set(status);
    };

    let output = match pipeline
        .run(request.document, &request.file_name, &request.options, &on_progress)
        .await
    {
        Ok(output) => output,
        Err(e) => {
            error!("Job {} failed: {}", job_id, e);
            job.set(JobStatus::failed(format!("An error occurred: {e}")));
            return;
        }
    };

    if output.improved.is_some() {
        let translated_path = state.config.paths.upload_dir.join(format!("{job_id}-translated.docx"));
        if let Err(e) = tokio::fs::write(&translated_path, &output.translated).await {
            warn!("Could not keep DeepL output for job {}: {}", job_id, e);
        }
    }
    if let Some(ref report) = output.report
        && !report.skipped_groups.is_empty()
    {
        warn!("Job {} kept DeepL text for groups {:?}", job_id, report.skipped_groups);
    }

    let output_path = state.config.paths.download_dir.join(&request.output_file_name);
    if let Err(e) = tokio::fs::write(&output_path, output.final_document()).await {
        error!("Job {} could not save {}: {}", job_id, output_path.display(), e);
        job.set(JobStatus::failed(format!("An error occurred: {e}")));
        return;
    }

    if let Err(e) = state
        .history
        .add(&request.output_file_name, output_path.to_string_lossy())
    {
        warn!("Could not record {} in history: {}", request.output_file_name, e);
    }

    info!("Job {} done: {}", job_id, request.output_file_name);
    job.set(JobStatus::done(request.output_file_name));
}

/// Current status of one job.
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> RouteResult<Json<JobStatus>> {
    let job = state.get_job(&job_id).await.or_not_found("Job not found")?;
    Ok(Json(job.status()))
}

/// Status of the most recent job, or idle.
pub async fn check_status(State(state): State<Arc<AppState>>) -> Json<JobStatus> {
    Json(state.latest_status().await)
}

/// SSE stream of job progress.
///
/// Sends a `progress` event whenever the status changes, then a final `done`
/// or `error` event.
#[allow(tail_expr_drop_order)] // Drop order change in async_stream macro is harmless here
pub async fn job_stream(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> RouteResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let job = state.get_job(&job_id).await.or_not_found("Job not found")?;

    let stream = async_stream::stream! {
        let mut last: Option<JobStatus> = None;

        loop {
            let status = job.status();
            if last.as_ref() != Some(&status) {
                let event = match status.status {
                    JobState::Done => "done",
                    JobState::Error => "error",
                    JobState::Idle | JobState::InProgress => "progress",
                };
                if let Ok(data) = serde_json::to_string(&status) {
                    yield Ok(Event::default().event(event).data(data));
                }
                if status.is_terminal() {
                    break;
                }
                last = Some(status);
            }

            tokio::time::sleep(STREAM_INTERVAL).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
