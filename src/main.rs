// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;

mod config;
mod context;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::{AppConfig, CredentialConfig};
use crate::handlers::{analyze_workspace, get_analysis, get_usage, health_check, list_analyses};
use crate::services::{
    AnalysisOrchestrator, CachingCredentialProvider, CredentialProvider, ImageProcessor,
    ProxyCredentialSource, ProxyVisionClient, RedisService, StaticCredentialProvider,
};

#[derive(Clone)]
pub struct AppState {
    redis_service: Arc<RedisService>,
    orchestrator: Arc<AnalysisOrchestrator>,
    image_processor: Arc<ImageProcessor>,
    max_photo_bytes: usize,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Deskscope service...");

    let config = AppConfig::from_env().context("failed to load configuration")?;

    let redis_service = Arc::new(
        RedisService::new(&config.redis_url)
            .await
            .with_context(|| format!("failed to connect to Redis at {}", config.redis_url))?,
    );

    let credentials: Arc<dyn CredentialProvider> = match &config.credentials {
        CredentialConfig::StaticKey(key) => Arc::new(StaticCredentialProvider::new(key.clone())),
        CredentialConfig::KeyEndpoint(endpoint) => {
            info!("Fetching vision credentials from {}", endpoint);
            Arc::new(CachingCredentialProvider::new(ProxyCredentialSource::new(
                endpoint.clone(),
            )))
        }
    };
    let vision_client = Arc::new(ProxyVisionClient::new(
        config.vision_base_url.clone(),
        config.vision_model.clone(),
        credentials,
        config.attempt_timeout,
    ));
    info!(
        "Vision model {} via {}",
        config.vision_model, config.vision_base_url
    );

    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        vision_client,
        config.orchestrator_config(),
    ));

    let app_state = AppState {
        redis_service,
        orchestrator,
        image_processor: Arc::new(ImageProcessor::new()),
        max_photo_bytes: config.max_photo_bytes,
    };

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api/v1")
                    .route("/analyze", web::post().to(analyze_workspace))
                    .route("/analysis/{analysis_id}", web::get().to(get_analysis))
                    .route("/analyses", web::get().to(list_analyses))
                    .route("/usage", web::get().to(get_usage)),
            )
            .route("/health", web::get().to(health_check))
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("failed to bind {}", config.bind_addr))?
    .run()
    .await?;

    Ok(())
}
