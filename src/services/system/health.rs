use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};

use super::SystemService;
use crate::models::{ApiResponse, AppStartTime, system::responses::HealthResponse};

/// 健康检查（无需认证）
pub async fn get_health(service: &SystemService, req: &HttpRequest) -> ActixResult<HttpResponse> {
    let config = service.get_config();
    let now = chrono::Utc::now();

    let uptime_seconds = req
        .app_data::<web::Data<AppStartTime>>()
        .map(|start| now.signed_duration_since(start.start_datetime).num_seconds())
        .unwrap_or(0);

    let response = HealthResponse {
        status: "ready".to_string(),
        system_name: config.app.system_name.clone(),
        environment: config.app.environment.clone(),
        time: now,
        uptime_seconds,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(response, "Service is healthy")))
}
