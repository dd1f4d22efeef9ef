// src/services/mod.rs
pub mod color_clusterer;
pub mod ergonomics;
pub mod image_processor;
pub mod orchestrator;
pub mod prompt;
pub mod recommendations;
pub mod redis_service;
pub mod response_parser;
pub mod vision_client;

pub use image_processor::ImageProcessor;
pub use orchestrator::{AnalysisOrchestrator, AnalysisRequest, OrchestratorConfig};
pub use redis_service::RedisService;
pub use vision_client::{
    CachingCredentialProvider, CredentialProvider, ProxyCredentialSource, ProxyVisionClient,
    StaticCredentialProvider,
};
