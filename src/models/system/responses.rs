use serde::Serialize;
use ts_rs::TS;

// 健康检查响应
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/system.ts")]
pub struct HealthResponse {
    pub status: String,
    pub system_name: String,
    pub environment: String,
    pub time: chrono::DateTime<chrono::Utc>,
    pub uptime_seconds: i64,
}
