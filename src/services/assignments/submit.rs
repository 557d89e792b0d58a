use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{AssignmentService, current_principal, error_response};
use crate::models::ApiResponse;
use crate::models::assignments::requests::SubmitAssignmentRequest;

/// 提交作业并指定评分教师
/// POST /student/assignments/submit
pub async fn submit_assignment(
    service: &AssignmentService,
    request: &HttpRequest,
    req: SubmitAssignmentRequest,
) -> ActixResult<HttpResponse> {
    let principal = match current_principal(request) {
        Ok(principal) => principal,
        Err(resp) => return Ok(resp),
    };

    match service
        .get_lifecycle(request)
        .submit(&principal, req.id, req.teacher_id)
        .await
    {
        Ok(assignment) => Ok(HttpResponse::Ok().json(ApiResponse::success(assignment, "作业已提交"))),
        Err(e) => Ok(error_response(&e)),
    }
}
