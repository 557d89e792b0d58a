pub mod assignments;
pub mod common;
pub mod principals;
pub mod system;

pub use common::response::ApiResponse;

/// 程序启动时间（用于健康检查中的运行时长）
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// API 业务错误码
///
/// 数值一经发布不可更改，客户端依赖它区分错误种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    InternalServerError = 1005,

    // 作业生命周期错误
    AssignmentNotFound = 3000,
    AssignmentInvalidState = 3001,
    AssignmentForbidden = 3002,
    AssignmentInvalidInput = 3003,
}
