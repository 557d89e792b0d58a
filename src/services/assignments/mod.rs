pub mod draft;
pub mod grade;
pub mod lifecycle;
pub mod list;
pub mod submit;

pub use lifecycle::AssignmentLifecycle;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::error;

use crate::errors::AssignFlowError;
use crate::middlewares::RequireJWT;
use crate::models::assignments::requests::{
    GradeAssignmentRequest, SubmitAssignmentRequest, UpsertAssignmentRequest,
};
use crate::models::principals::entities::Principal;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

pub struct AssignmentService {
    storage: Option<Arc<dyn Storage>>,
}

impl AssignmentService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub(crate) fn get_lifecycle(&self, request: &HttpRequest) -> AssignmentLifecycle {
        AssignmentLifecycle::new(self.get_storage(request))
    }

    pub async fn list_student_assignments(
        &self,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_student_assignments(self, request).await
    }

    pub async fn list_teacher_assignments(
        &self,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_teacher_assignments(self, request).await
    }

    pub async fn save_draft(
        &self,
        request: &HttpRequest,
        req: UpsertAssignmentRequest,
    ) -> ActixResult<HttpResponse> {
        draft::save_draft(self, request, req).await
    }

    pub async fn submit_assignment(
        &self,
        request: &HttpRequest,
        req: SubmitAssignmentRequest,
    ) -> ActixResult<HttpResponse> {
        submit::submit_assignment(self, request, req).await
    }

    pub async fn grade_assignment(
        &self,
        request: &HttpRequest,
        req: GradeAssignmentRequest,
    ) -> ActixResult<HttpResponse> {
        grade::grade_assignment(self, request, req).await
    }

    pub async fn regrade_assignment(
        &self,
        request: &HttpRequest,
        req: GradeAssignmentRequest,
    ) -> ActixResult<HttpResponse> {
        grade::regrade_assignment(self, request, req).await
    }
}

/// 从请求扩展中取出调用者；缺失时直接给出 401 响应
pub(crate) fn current_principal(request: &HttpRequest) -> Result<Principal, HttpResponse> {
    RequireJWT::extract_principal(request).ok_or_else(|| {
        HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "无法获取用户信息",
        ))
    })
}

/// 生命周期错误到 HTTP 响应的映射
pub(crate) fn error_response(err: &AssignFlowError) -> HttpResponse {
    let body = ApiResponse::from_error(err);
    match err {
        AssignFlowError::NotFound(_) => HttpResponse::NotFound().json(body),
        AssignFlowError::InvalidState(_) | AssignFlowError::InvalidInput(_) => {
            HttpResponse::BadRequest().json(body)
        }
        AssignFlowError::Forbidden(_) => HttpResponse::Forbidden().json(body),
        AssignFlowError::Authentication(_) => HttpResponse::Unauthorized().json(body),
        AssignFlowError::DatabaseConfig(_)
        | AssignFlowError::DatabaseConnection(_)
        | AssignFlowError::DatabaseOperation(_) => {
            error!("Assignment operation failed: {}", err.format_simple());
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                "服务器内部错误",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AssignFlowError::not_found("x"), StatusCode::NOT_FOUND),
            (AssignFlowError::invalid_state("x"), StatusCode::BAD_REQUEST),
            (AssignFlowError::invalid_input("x"), StatusCode::BAD_REQUEST),
            (AssignFlowError::forbidden("x"), StatusCode::FORBIDDEN),
            (AssignFlowError::authentication("x"), StatusCode::UNAUTHORIZED),
            (
                AssignFlowError::database_operation("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err).status(), status, "{err}");
        }
    }
}
