// src/services/redis_service.rs
use crate::errors::AnalysisError;
use crate::models::WorkspaceAnalysisResult;
use chrono::NaiveDate;
use log::debug;
use redis::aio::Connection;
use redis::{AsyncCommands, Client};
use uuid::Uuid;

const RESULT_TTL_SECS: usize = 30 * 24 * 60 * 60;
const USAGE_TTL_SECS: usize = 90 * 24 * 60 * 60;
const RECENT_KEY: &str = "analyses:recent";
pub const RECENT_CAP: usize = 200;

fn result_key(id: &Uuid) -> String {
    format!("analysis:{}", id)
}

fn usage_key(day: NaiveDate) -> String {
    format!("usage:{}", day.format("%Y-%m-%d"))
}

fn redis_err(e: redis::RedisError) -> AnalysisError {
    AnalysisError::Redis(e.to_string())
}

pub struct RedisService {
    client: Client,
}

impl RedisService {
    pub async fn new(redis_url: &str) -> Result<Self, AnalysisError> {
        let client = Client::open(redis_url).map_err(redis_err)?;

        let mut conn = client.get_async_connection().await.map_err(redis_err)?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(redis_err)?;

        Ok(Self { client })
    }

    async fn connection(&self) -> Result<Connection, AnalysisError> {
        self.client.get_async_connection().await.map_err(redis_err)
    }

    /// Persists a finished analysis and records it in the recent list.
    pub async fn store_result(&self, result: &WorkspaceAnalysisResult) -> Result<(), AnalysisError> {
        let mut conn = self.connection().await?;

        let value = serde_json::to_string(result)
            .map_err(|e| AnalysisError::Serialization(e.to_string()))?;
        conn.set_ex::<_, _, ()>(result_key(&result.id), value, RESULT_TTL_SECS)
            .await
            .map_err(redis_err)?;

        conn.lpush::<_, _, ()>(RECENT_KEY, result.id.to_string())
            .await
            .map_err(redis_err)?;
        conn.ltrim::<_, ()>(RECENT_KEY, 0, RECENT_CAP as isize - 1)
            .await
            .map_err(redis_err)?;

        debug!("Stored analysis {}", result.id);
        Ok(())
    }

    pub async fn get_result(&self, id: &Uuid) -> Result<WorkspaceAnalysisResult, AnalysisError> {
        let mut conn = self.connection().await?;

        let value: Option<String> = conn.get(result_key(id)).await.map_err(redis_err)?;
        let value = value.ok_or_else(|| AnalysisError::NotFound(format!("Analysis {}", id)))?;

        serde_json::from_str(&value).map_err(|e| AnalysisError::Serialization(e.to_string()))
    }

    /// Most recent analysis ids, newest first.
    pub async fn recent_results(&self, limit: usize) -> Result<Vec<Uuid>, AnalysisError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;

        let ids: Vec<String> = conn
            .lrange(RECENT_KEY, 0, limit as isize - 1)
            .await
            .map_err(redis_err)?;

        Ok(ids.iter().filter_map(|id| Uuid::parse_str(id).ok()).collect())
    }

    pub async fn increment_usage(&self, day: NaiveDate) -> Result<u64, AnalysisError> {
        let mut conn = self.connection().await?;
        let key = usage_key(day);

        let count: u64 = conn.incr(&key, 1u64).await.map_err(redis_err)?;
        if count == 1 {
            conn.expire::<_, ()>(&key, USAGE_TTL_SECS)
                .await
                .map_err(redis_err)?;
        }
        Ok(count)
    }

    pub async fn usage(&self, day: NaiveDate) -> Result<u64, AnalysisError> {
        let mut conn = self.connection().await?;
        let count: Option<u64> = conn.get(usage_key(day)).await.map_err(redis_err)?;
        Ok(count.unwrap_or(0))
    }
}
