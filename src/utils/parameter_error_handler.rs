use actix_web::{
    HttpRequest, HttpResponse,
    error::{InternalError, JsonPayloadError, QueryPayloadError},
};
use tracing::debug;

use crate::models::{ApiResponse, ErrorCode};

/// JSON 请求体解析失败时返回统一格式的 400
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("JSON payload rejected for {}: {}", req.path(), err);
    let response = HttpResponse::BadRequest().json(ApiResponse::error_empty(
        ErrorCode::AssignmentInvalidInput,
        format!("请求体格式错误: {err}"),
    ));
    InternalError::from_response(err, response).into()
}

/// 查询参数解析失败时返回统一格式的 400
pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Query string rejected for {}: {}", req.path(), err);
    let response = HttpResponse::BadRequest().json(ApiResponse::error_empty(
        ErrorCode::BadRequest,
        format!("查询参数错误: {err}"),
    ));
    InternalError::from_response(err, response).into()
}
