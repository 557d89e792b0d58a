use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{AssignmentService, current_principal, error_response};
use crate::models::ApiResponse;
use crate::models::assignments::requests::UpsertAssignmentRequest;

/// 创建或编辑草稿
/// POST /student/assignments
pub async fn save_draft(
    service: &AssignmentService,
    request: &HttpRequest,
    req: UpsertAssignmentRequest,
) -> ActixResult<HttpResponse> {
    let principal = match current_principal(request) {
        Ok(principal) => principal,
        Err(resp) => return Ok(resp),
    };

    match service
        .get_lifecycle(request)
        .create_or_edit_draft(&principal, req.id, req.content)
        .await
    {
        Ok(assignment) => Ok(HttpResponse::Ok().json(ApiResponse::success(assignment, "草稿已保存"))),
        Err(e) => Ok(error_response(&e)),
    }
}
