// src/services/orchestrator.rs
//! Runs one workspace analysis end to end: validate the photo, call the
//! vision model with bounded retries, parse, then enrich.

use crate::context::build_context;
use crate::errors::AnalysisError;
use crate::models::{
    ColorPalette, NormalizedAnalysis, PhotoHandle, QuizAnswers, Strictness, StyleMatch,
    WorkspaceAnalysisResult,
};
use crate::services::color_clusterer::{self, PaletteOptions};
use crate::services::ergonomics::{self, EngineConfig};
use crate::services::image_processor::ImageProcessor;
use crate::services::prompt::build_analysis_prompt;
use crate::services::recommendations;
use crate::services::response_parser::{self, PLACEHOLDER};
use crate::services::vision_client::{VisionError, VisionModelClient};
use log::{debug, error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const GENERIC_SUMMARY: &str =
    "Your workspace analysis is ready. Review the ergonomic insights and product ideas below.";
const DEFAULT_STYLE_EXPLANATION: &str = "Style alignment could not be assessed from this photo.";

/// Receives `(step, percent)` at fixed milestones.
pub type ProgressFn = dyn Fn(&str, u8) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Idle,
    Initializing,
    ImageValidation,
    ModelCall,
    Retrying,
    Parsing,
    Enrichment,
    Done,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_attempts: u32,
    /// Delay before attempt `n + 1` is `n * base_delay`.
    pub base_delay: Duration,
    /// `None` waits on the model indefinitely.
    pub attempt_timeout: Option<Duration>,
    pub max_photo_bytes: usize,
    pub max_color_samples: usize,
    pub palette: PaletteOptions,
    pub ergonomics: EngineConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            attempt_timeout: Some(Duration::from_secs(30)),
            max_photo_bytes: 20 * 1024 * 1024,
            max_color_samples: 4096,
            palette: PaletteOptions::default(),
            ergonomics: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub photo: PhotoHandle,
    pub answers: QuizAnswers,
    /// Overrides the configured strictness for this request.
    pub strictness: Option<Strictness>,
}

struct Progress<'a> {
    sink: Option<&'a ProgressFn>,
    stage: AnalysisStage,
}

impl<'a> Progress<'a> {
    fn new(sink: Option<&'a ProgressFn>) -> Self {
        Self {
            sink,
            stage: AnalysisStage::Idle,
        }
    }

    fn advance(&mut self, stage: AnalysisStage, step: &str, percent: u8) {
        if stage != self.stage {
            debug!("Analysis stage {:?} -> {:?}", self.stage, stage);
            self.stage = stage;
        }
        self.report(step, percent);
    }

    fn report(&self, step: &str, percent: u8) {
        if let Some(sink) = self.sink {
            sink(step, percent);
        }
    }
}

pub struct AnalysisOrchestrator {
    client: Arc<dyn VisionModelClient>,
    image_processor: ImageProcessor,
    config: OrchestratorConfig,
}

impl AnalysisOrchestrator {
    pub fn new(client: Arc<dyn VisionModelClient>, config: OrchestratorConfig) -> Self {
        Self {
            client,
            image_processor: ImageProcessor::new(),
            config,
        }
    }

    /// Linear backoff applied after the given (1-based) failed attempt.
    pub fn backoff_delay(&self, failed_attempt: u32) -> Duration {
        self.config.base_delay * failed_attempt
    }

    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        on_progress: Option<&ProgressFn>,
        cancel: &CancellationToken,
    ) -> Result<WorkspaceAnalysisResult, AnalysisError> {
        let start = Instant::now();
        let mut progress = Progress::new(on_progress);

        progress.advance(AnalysisStage::Initializing, "Preparing analysis", 10);
        let context = build_context(&request.answers);
        let prompt = build_analysis_prompt(&context);

        progress.advance(AnalysisStage::ImageValidation, "Checking photo", 20);
        self.image_processor
            .validate(&request.photo, self.config.max_photo_bytes)?;
        let upload = self
            .image_processor
            .prepare_for_upload(&request.photo.bytes)
            .map_err(|e| AnalysisError::Validation(e.to_string()))?;

        progress.advance(AnalysisStage::ModelCall, "Analyzing workspace", 30);
        let raw = self
            .call_with_retry(&upload, &prompt, &mut progress, cancel)
            .await?;
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        progress.advance(AnalysisStage::Parsing, "Reading analysis", 50);
        let outcome = response_parser::parse(&raw);
        info!(
            "Model response parsed ({}, {} ergonomic findings)",
            outcome.kind(),
            outcome.analysis().ergonomic_evaluation.len()
        );
        let analysis = outcome.into_analysis();

        progress.advance(AnalysisStage::Enrichment, "Extracting color palette", 70);
        let color_palette = isolated("color palette", color_clusterer::fallback_palette, || {
            self.color_palette(&request.photo, &analysis)
        });

        progress.report("Evaluating ergonomics", 80);
        let engine = EngineConfig {
            strictness: request
                .strictness
                .unwrap_or(self.config.ergonomics.strictness),
            ..self.config.ergonomics
        };
        let ergonomic_insights = isolated("ergonomic insights", ergonomics::default_insights, || {
            ergonomics::build_insights(&analysis, &engine)
        });

        progress.report("Finding product recommendations", 85);
        let recommendations = isolated(
            "recommendations",
            recommendations::fallback_recommendations,
            || recommendations::generate(&analysis, &context),
        );

        progress.report("Assembling results", 90);
        let result = WorkspaceAnalysisResult {
            id: Uuid::new_v4(),
            summary: summary_for(&analysis),
            recommendations,
            color_palette: Some(color_palette),
            ergonomic_insights,
            style_match: style_match_for(&analysis, &context.vibe_description),
            created_at: chrono::Utc::now(),
            processing_time: start.elapsed().as_millis() as u64,
        };

        progress.advance(AnalysisStage::Done, "Analysis complete", 100);
        info!(
            "Analysis {} completed in {} ms",
            result.id, result.processing_time
        );
        Ok(result)
    }

    async fn call_with_retry(
        &self,
        image: &[u8],
        prompt: &str,
        progress: &mut Progress<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<VisionError> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }

            if attempt > 1 {
                let delay = self.backoff_delay(attempt - 1);
                progress.advance(
                    AnalysisStage::Retrying,
                    &format!("Retrying analysis ({}/{})", attempt, max_attempts),
                    30,
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                progress.advance(AnalysisStage::ModelCall, "Analyzing workspace", 30);
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
                result = self.call_once(image, prompt) => result,
            };

            match result {
                Ok(text) => {
                    debug!("Vision model answered on attempt {}", attempt);
                    return Ok(text);
                }
                Err(err) if err.is_retryable() => {
                    warn!(
                        "Vision model attempt {}/{} failed: {}",
                        attempt, max_attempts, err
                    );
                    last_error = Some(err);
                }
                Err(err) => {
                    error!("Vision model call failed permanently: {}", err);
                    return Err(err.into());
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt completed".to_string());
        error!("Analysis failed after {} attempts: {}", max_attempts, last);
        Err(AnalysisError::ExhaustedRetries {
            attempts: max_attempts,
            last,
        })
    }

    async fn call_once(&self, image: &[u8], prompt: &str) -> Result<String, VisionError> {
        match self.config.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.client.call(image, prompt))
                .await
                .unwrap_or(Err(VisionError::Timeout)),
            None => self.client.call(image, prompt).await,
        }
    }

    /// Palette from the photo's pixels, or from the model's hex codes when the
    /// photo cannot be decoded.
    fn color_palette(&self, photo: &PhotoHandle, analysis: &NormalizedAnalysis) -> ColorPalette {
        match self
            .image_processor
            .sample_pixels(&photo.bytes, self.config.max_color_samples)
        {
            Ok(samples) => color_clusterer::extract_palette(&samples, &self.config.palette),
            Err(err) => {
                warn!("Pixel sampling failed, using model-reported colors: {}", err);
                let reported: Vec<[u8; 3]> = analysis
                    .color_analysis
                    .iter()
                    .flat_map(|colors| colors.dominant_colors.iter())
                    .filter_map(|hex| color_clusterer::from_hex(hex))
                    .collect();
                color_clusterer::extract_palette(&reported, &self.config.palette)
            }
        }
    }
}

/// Runs one enrichment stage so that a panic inside it degrades to `fallback`
/// instead of failing the whole analysis.
fn isolated<T>(stage: &str, fallback: impl FnOnce() -> T, run: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(value) => value,
        Err(_) => {
            error!("Enrichment stage '{}' panicked, using fallback", stage);
            fallback()
        }
    }
}

fn summary_for(analysis: &NormalizedAnalysis) -> String {
    if analysis.workspace_description.is_empty() || analysis.workspace_description == PLACEHOLDER {
        GENERIC_SUMMARY.to_string()
    } else {
        analysis.workspace_description.clone()
    }
}

fn style_match_for(analysis: &NormalizedAnalysis, vibe: &str) -> StyleMatch {
    match &analysis.style_assessment {
        Some(style) => StyleMatch {
            vibe: vibe.to_string(),
            confidence: style.alignment_score.clamp(0.0, 1.0),
            explanation: if style.alignment_explanation.is_empty() {
                DEFAULT_STYLE_EXPLANATION.to_string()
            } else {
                style.alignment_explanation.clone()
            },
        },
        None => StyleMatch {
            vibe: vibe.to_string(),
            confidence: 0.5,
            explanation: DEFAULT_STYLE_EXPLANATION.to_string(),
        },
    }
}
