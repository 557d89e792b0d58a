use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{AssignmentService, current_principal, error_response};
use crate::models::ApiResponse;

/// 学生查看自己的作业
pub async fn list_student_assignments(
    service: &AssignmentService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let principal = match current_principal(request) {
        Ok(principal) => principal,
        Err(resp) => return Ok(resp),
    };

    match service.get_lifecycle(request).list_for_student(&principal).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(items, "获取作业列表成功"))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// 教师查看分配给自己的作业
pub async fn list_teacher_assignments(
    service: &AssignmentService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let principal = match current_principal(request) {
        Ok(principal) => principal,
        Err(resp) => return Ok(resp),
    };

    match service.get_lifecycle(request).list_for_teacher(&principal).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(items, "获取作业列表成功"))),
        Err(e) => Ok(error_response(&e)),
    }
}
