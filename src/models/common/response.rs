use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::AssignFlowError;
use crate::models::ErrorCode;

// 统一的API响应结构
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/api.ts")]
pub struct ApiResponse<T: TS> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T: TS> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: message.into(),
            data: Some(data),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error_empty(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// 由内部错误构造响应，业务码与错误种类一一对应
    pub fn from_error(err: &AssignFlowError) -> Self {
        Self::error_empty(ErrorCode::from(err), err.message())
    }
}

impl From<&AssignFlowError> for ErrorCode {
    fn from(err: &AssignFlowError) -> Self {
        match err {
            AssignFlowError::NotFound(_) => ErrorCode::AssignmentNotFound,
            AssignFlowError::InvalidState(_) => ErrorCode::AssignmentInvalidState,
            AssignFlowError::Forbidden(_) => ErrorCode::AssignmentForbidden,
            AssignFlowError::InvalidInput(_) => ErrorCode::AssignmentInvalidInput,
            AssignFlowError::Authentication(_) => ErrorCode::Unauthorized,
            AssignFlowError::DatabaseConfig(_)
            | AssignFlowError::DatabaseConnection(_)
            | AssignFlowError::DatabaseOperation(_) => ErrorCode::InternalServerError,
        }
    }
}
