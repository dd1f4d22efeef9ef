// src/handlers.rs
use crate::AppState;
use crate::errors::AnalysisError;
use crate::models::{QuizAnswers, Strictness};
use crate::services::AnalysisRequest;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const RECENT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub strictness: Option<String>,
}

/// Photo bytes and quiz answers read from an analysis form.
#[derive(Debug)]
pub struct AnalysisForm {
    pub photo: Bytes,
    pub answers: QuizAnswers,
}

pub async fn read_analysis_form(
    payload: &mut Multipart,
    max_photo_bytes: usize,
) -> Result<AnalysisForm, AnalysisError> {
    let mut photo: Option<Bytes> = None;
    let mut answers = QuizAnswers::default();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AnalysisError::Validation(format!("Malformed form data: {}", e)))?
    {
        let name = field.content_disposition().get_name().unwrap_or("").to_string();

        let mut data = BytesMut::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AnalysisError::Validation(format!("Malformed form data: {}", e)))?
        {
            if data.len() + chunk.len() > max_photo_bytes {
                return Err(AnalysisError::Validation(format!(
                    "Field '{}' exceeds the {} byte limit",
                    name, max_photo_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "photo" => photo = Some(data.freeze()),
            "vibe" => answers.vibe = Some(field_text(&data)),
            "color" => answers.color_preference = Some(field_text(&data)),
            "budget" => answers.budget = Some(field_text(&data)),
            other => debug!("Ignoring unknown form field '{}'", other),
        }
    }

    let photo = photo.ok_or_else(|| AnalysisError::Validation("No photo provided".to_string()))?;
    Ok(AnalysisForm { photo, answers })
}

fn field_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim().to_string()
}

fn parse_strictness(query: &AnalyzeQuery) -> Result<Option<Strictness>, AnalysisError> {
    query
        .strictness
        .as_deref()
        .map(|s| s.parse().map_err(AnalysisError::Validation))
        .transpose()
}

pub async fn analyze_workspace(
    mut payload: Multipart,
    query: web::Query<AnalyzeQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, AnalysisError> {
    let strictness = parse_strictness(&query)?;
    let form = read_analysis_form(&mut payload, data.max_photo_bytes).await?;
    let photo = data.image_processor.inspect(form.photo)?;

    let request = AnalysisRequest {
        photo,
        answers: form.answers,
        strictness,
    };

    // Dropping this future (client went away) cancels the analysis.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let progress = |step: &str, percent: u8| debug!("[{:>3}%] {}", percent, step);
    let result = data
        .orchestrator
        .analyze(&request, Some(&progress), &cancel)
        .await?;

    if let Err(e) = data.redis_service.store_result(&result).await {
        error!("Failed to persist analysis {}: {}", result.id, e);
    }
    match data
        .redis_service
        .increment_usage(chrono::Utc::now().date_naive())
        .await
    {
        Ok(count) => info!("Analysis {} done, {} today", result.id, count),
        Err(e) => warn!("Failed to record usage: {}", e),
    }

    Ok(HttpResponse::Ok().json(&result))
}

pub async fn get_analysis(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, AnalysisError> {
    let analysis_id = path.into_inner();
    let result = data.redis_service.get_result(&analysis_id).await?;
    Ok(HttpResponse::Ok().json(&result))
}

pub async fn list_analyses(data: web::Data<AppState>) -> Result<HttpResponse, AnalysisError> {
    let ids = data.redis_service.recent_results(RECENT_LIMIT).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "analyses": ids,
        "count": ids.len()
    })))
}

pub async fn get_usage(data: web::Data<AppState>) -> Result<HttpResponse, AnalysisError> {
    let today = chrono::Utc::now().date_naive();
    let count = data.redis_service.usage(today).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "date": today.format("%Y-%m-%d").to_string(),
        "count": count
    })))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "deskscope",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
