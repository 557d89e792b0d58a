use serde::Deserialize;
use ts_rs::TS;

use crate::models::assignments::entities::Grade;

/// 创建或编辑草稿请求
///
/// `content` 保持可空：空内容由生命周期服务以 InvalidInput 拒绝，
/// 而不是在反序列化阶段被吞掉。
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct UpsertAssignmentRequest {
    pub id: Option<i64>,
    pub content: Option<String>,
}

/// 提交作业请求
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct SubmitAssignmentRequest {
    pub id: i64,
    pub teacher_id: i64,
}

/// 评分 / 重新评分请求
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct GradeAssignmentRequest {
    pub id: i64,
    pub grade: Grade,
}

// 用于存储层的草稿写入参数
#[derive(Debug, Clone)]
pub struct AssignmentDraft {
    pub id: Option<i64>,
    pub student_id: i64,
    pub content: String,
}
