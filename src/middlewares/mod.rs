pub mod require_jwt;
pub mod require_role;

pub use require_jwt::RequireJWT;
pub use require_role::RequireRole;

use actix_web::{
    HttpResponse,
    http::{StatusCode, header::CONTENT_TYPE},
};

use crate::models::{ApiResponse, ErrorCode};

// 辅助函数：创建统一格式的错误响应
pub(crate) fn create_error_response(
    status: StatusCode,
    code: ErrorCode,
    message: &str,
) -> HttpResponse {
    match status {
        StatusCode::NO_CONTENT => HttpResponse::build(status)
            .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
            .finish(),
        _ => HttpResponse::build(status)
            .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
            .json(ApiResponse::<()>::error_empty(code, message)),
    }
}
