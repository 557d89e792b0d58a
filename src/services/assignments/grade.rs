use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{AssignmentService, current_principal, error_response};
use crate::models::ApiResponse;
use crate::models::assignments::requests::GradeAssignmentRequest;

/// 首次评分
/// POST /{teacher|principal}/assignments/grade
pub async fn grade_assignment(
    service: &AssignmentService,
    request: &HttpRequest,
    req: GradeAssignmentRequest,
) -> ActixResult<HttpResponse> {
    let principal = match current_principal(request) {
        Ok(principal) => principal,
        Err(resp) => return Ok(resp),
    };

    match service
        .get_lifecycle(request)
        .grade(&principal, req.id, req.grade)
        .await
    {
        Ok(assignment) => Ok(HttpResponse::Ok().json(ApiResponse::success(assignment, "评分成功"))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// 重新评分
/// POST /{teacher|principal}/assignments/regrade
pub async fn regrade_assignment(
    service: &AssignmentService,
    request: &HttpRequest,
    req: GradeAssignmentRequest,
) -> ActixResult<HttpResponse> {
    let principal = match current_principal(request) {
        Ok(principal) => principal,
        Err(resp) => return Ok(resp),
    };

    match service
        .get_lifecycle(request)
        .regrade(&principal, req.id, req.grade)
        .await
    {
        Ok(assignment) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(assignment, "成绩已更新")))
        }
        Err(e) => Ok(error_response(&e)),
    }
}
