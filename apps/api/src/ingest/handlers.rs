use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::CorpusError;
use crate::errors::AppError;
use crate::ingest::extract::SourceKind;
use crate::ingest::normalize::normalize;
use crate::ingest::pipeline::{
    analyze_document, dataset_stats, document_id, DatasetStats, DocumentOutcome, Segmentation,
};
use crate::ingest::segmenter::{resolve_sections, Resolution};
use crate::llm_client::retry::RetryPolicy;
use crate::models::resume::{ResumeRecord, SectionName, Sections, SegmenterKind};
use crate::state::{run_blocking, AppState};

#[derive(Deserialize)]
pub struct SegmentRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct SegmentResponse {
    pub sections: Sections,
    /// Which strategy resolved each section.
    pub resolutions: BTreeMap<SectionName, Resolution>,
}

/// POST /api/v1/resumes/segment
pub async fn handle_segment(
    Json(req): Json<SegmentRequest>,
) -> Result<Json<SegmentResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::Validation("text must not be empty".to_string()));
    }
    let resolutions = resolve_sections(&normalize(&req.text));
    let text_map: BTreeMap<SectionName, String> = resolutions
        .iter()
        .filter_map(|(section, r)| r.content().map(|c| (*section, c.to_string())))
        .collect();
    Ok(Json(SegmentResponse {
        sections: Sections::from_text_map(&text_map),
        resolutions,
    }))
}

#[derive(Deserialize)]
pub struct AnalyzeParams {
    #[serde(default)]
    pub segmenter: SegmenterKind,
}

/// POST /api/v1/resumes/analyze?segmenter=rule_based|llm
///
/// Multipart body with a single `file` part (PDF or TXT).
pub async fn handle_analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentOutcome>), AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::Validation("missing 'file' part".to_string()))?;
    let kind = SourceKind::from_path(std::path::Path::new(&file_name))
        .ok_or_else(|| AppError::Validation(format!("{file_name}: only PDF and TXT are accepted")))?;
    let id = document_id(&file_name)
        .ok_or_else(|| AppError::Validation(format!("invalid file name '{file_name}'")))?;

    let stored_name = match kind {
        SourceKind::Pdf => format!("{id}.pdf"),
        SourceKind::Text => format!("{id}.txt"),
    };
    let uploads = &state.config.uploads_dir;
    tokio::fs::create_dir_all(uploads)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    tokio::fs::write(uploads.join(&stored_name), &bytes)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    info!(id = %id, file = %stored_name, segmenter = ?params.segmenter, "analyzing upload");

    let session = state.llm.session();
    let segmentation = match params.segmenter {
        SegmenterKind::RuleBased => Segmentation::rule_based(),
        SegmenterKind::Llm if state.llm.providers().is_empty() => Segmentation {
            mode: SegmenterKind::Llm,
            llm: None,
            retry: RetryPolicy::immediate(1),
        },
        SegmenterKind::Llm => Segmentation::llm(&session),
    };

    let outcome =
        analyze_document(&state.store, &id, &stored_name, bytes, kind, &segmentation).await;
    let status = match outcome {
        DocumentOutcome::Processed { .. } => StatusCode::OK,
        DocumentOutcome::Failed(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    Ok((status, Json(outcome)))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    let store = state.store.clone();
    let ids = run_blocking(move || match store.ids() {
        Err(CorpusError::MissingDirectory(_)) => Ok(Vec::new()),
        other => other,
    })
    .await?;
    Ok(Json(ids))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeRecord>, AppError> {
    let store = state.store.clone();
    let record = run_blocking(move || store.load(&id)).await?;
    Ok(Json(record))
}

/// GET /api/v1/stats
pub async fn handle_stats(
    State(state): State<AppState>,
) -> Result<Json<DatasetStats>, AppError> {
    let (raw_dir, text_dir) = (state.config.raw_dir.clone(), state.config.text_dir.clone());
    let store = state.store.clone();
    let stats =
        run_blocking(move || Ok::<_, AppError>(dataset_stats(&raw_dir, &text_dir, &store)))
            .await?;
    Ok(Json(stats))
}
