use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::errors::Result;
use crate::models::assignments::{
    entities::{Assignment, Grade},
    requests::AssignmentDraft,
};

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 作业列表读取（无需事务）
    // 列出学生的作业
    async fn list_assignments_by_student(&self, student_id: i64) -> Result<Vec<Assignment>>;
    // 列出分配给教师批改的作业
    async fn list_assignments_by_teacher(&self, teacher_id: i64) -> Result<Vec<Assignment>>;

    /// 开启一个工作单元，生命周期操作的读-校验-写都在其中完成
    async fn begin(&self) -> Result<Box<dyn StorageTransaction>>;
}

/// 事务内的作业操作
///
/// 带条件的写入方法返回 `Ok(None)` 表示没有行满足前置条件
/// （记录不存在、不属于调用者，或状态已被并发事务改变）。
/// 未提交即被丢弃的事务会回滚。
#[async_trait::async_trait]
pub trait StorageTransaction: Send + Sync {
    // 通过ID获取作业
    async fn get_assignment_by_id(&self, id: i64) -> Result<Option<Assignment>>;
    // 获取属于某学生的作业（所有者过滤）
    async fn get_student_assignment(&self, id: i64, student_id: i64)
    -> Result<Option<Assignment>>;
    // 创建草稿，或覆盖仍处于草稿状态的已有作业内容
    async fn upsert_assignment(&self, draft: AssignmentDraft) -> Result<Option<Assignment>>;
    // 草稿 -> 已提交
    async fn submit_assignment(
        &self,
        id: i64,
        student_id: i64,
        teacher_id: i64,
    ) -> Result<Option<Assignment>>;
    // 已提交 -> 已评分
    async fn grade_assignment(
        &self,
        id: i64,
        teacher_id: i64,
        grade: Grade,
    ) -> Result<Option<Assignment>>;
    // 已评分 -> 已评分（覆盖成绩）
    async fn regrade_assignment(
        &self,
        id: i64,
        teacher_id: i64,
        grade: Grade,
    ) -> Result<Option<Assignment>>;

    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

pub async fn create_storage(config: &DatabaseConfig) -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::connect(config).await?;
    Ok(Arc::new(storage))
}
