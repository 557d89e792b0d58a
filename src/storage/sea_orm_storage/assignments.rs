//! 作业存储操作
//!
//! 所有函数对 `ConnectionTrait` 泛型，连接池与事务共用同一套实现。
//! 状态迁移写入均为带条件的 UPDATE：只有当前行仍满足前置条件时才生效。

use crate::entity::assignments::{ActiveModel, Column, Entity as Assignments};
use crate::errors::{AssignFlowError, Result};
use crate::models::assignments::{
    entities::{Assignment, AssignmentState, Grade},
    requests::AssignmentDraft,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    UpdateMany,
};

/// 通过 ID 获取作业
pub(super) async fn find_by_id<C: ConnectionTrait>(conn: &C, id: i64) -> Result<Option<Assignment>> {
    let result = Assignments::find_by_id(id)
        .one(conn)
        .await
        .map_err(|e| AssignFlowError::database_operation(format!("查询作业失败: {e}")))?;

    result.map(|m| m.into_assignment()).transpose()
}

/// 获取属于某学生的作业
pub(super) async fn find_by_id_and_student<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    student_id: i64,
) -> Result<Option<Assignment>> {
    let result = Assignments::find_by_id(id)
        .filter(Column::StudentId.eq(student_id))
        .one(conn)
        .await
        .map_err(|e| AssignFlowError::database_operation(format!("查询作业失败: {e}")))?;

    result.map(|m| m.into_assignment()).transpose()
}

/// 列出学生的作业
pub(super) async fn list_by_student<C: ConnectionTrait>(
    conn: &C,
    student_id: i64,
) -> Result<Vec<Assignment>> {
    let results = Assignments::find()
        .filter(Column::StudentId.eq(student_id))
        .order_by_asc(Column::Id)
        .all(conn)
        .await
        .map_err(|e| AssignFlowError::database_operation(format!("查询学生作业失败: {e}")))?;

    results.into_iter().map(|m| m.into_assignment()).collect()
}

/// 列出分配给教师的作业（当前或曾经）
pub(super) async fn list_by_teacher<C: ConnectionTrait>(
    conn: &C,
    teacher_id: i64,
) -> Result<Vec<Assignment>> {
    let results = Assignments::find()
        .filter(Column::TeacherId.eq(teacher_id))
        .order_by_asc(Column::Id)
        .all(conn)
        .await
        .map_err(|e| AssignFlowError::database_operation(format!("查询教师作业失败: {e}")))?;

    results.into_iter().map(|m| m.into_assignment()).collect()
}

/// 创建草稿或覆盖草稿内容
pub(super) async fn upsert<C: ConnectionTrait>(
    conn: &C,
    draft: AssignmentDraft,
) -> Result<Option<Assignment>> {
    let now = chrono::Utc::now().timestamp();

    let Some(id) = draft.id else {
        let model = ActiveModel {
            student_id: Set(draft.student_id),
            teacher_id: Set(None),
            content: Set(Some(draft.content)),
            grade: Set(None),
            state: Set(AssignmentState::Draft.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(conn)
            .await
            .map_err(|e| AssignFlowError::database_operation(format!("创建作业失败: {e}")))?;

        return result.into_assignment().map(Some);
    };

    let update = Assignments::update_many()
        .col_expr(Column::Content, Expr::value(draft.content))
        .filter(Column::StudentId.eq(draft.student_id));

    guarded_update(conn, update, id, AssignmentState::Draft, now, "更新作业内容失败").await
}

/// 草稿 -> 已提交
pub(super) async fn mark_submitted<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    student_id: i64,
    teacher_id: i64,
) -> Result<Option<Assignment>> {
    let now = chrono::Utc::now().timestamp();

    let update = Assignments::update_many()
        .col_expr(Column::TeacherId, Expr::value(Some(teacher_id)))
        .col_expr(
            Column::State,
            Expr::value(AssignmentState::Submitted.to_string()),
        )
        .filter(Column::StudentId.eq(student_id))
        .filter(Column::Content.is_not_null());

    guarded_update(conn, update, id, AssignmentState::Draft, now, "提交作业失败").await
}

/// 写入成绩；`from` 为 Submitted 时是首次评分，为 Graded 时是重新评分
pub(super) async fn set_grade<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    teacher_id: i64,
    from: AssignmentState,
    grade: Grade,
) -> Result<Option<Assignment>> {
    let now = chrono::Utc::now().timestamp();

    let update = Assignments::update_many()
        .col_expr(Column::Grade, Expr::value(Some(grade.to_string())))
        .col_expr(Column::State, Expr::value(AssignmentState::Graded.to_string()))
        .filter(Column::TeacherId.eq(teacher_id));

    guarded_update(conn, update, id, from, now, "写入成绩失败").await
}

/// 以 id + 期望状态为条件执行更新；未命中返回 None
async fn guarded_update<C: ConnectionTrait>(
    conn: &C,
    update: UpdateMany<Assignments>,
    id: i64,
    expected: AssignmentState,
    now: i64,
    context: &str,
) -> Result<Option<Assignment>> {
    let result = update
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .filter(Column::State.eq(expected.to_string()))
        .exec(conn)
        .await
        .map_err(|e| AssignFlowError::database_operation(format!("{context}: {e}")))?;

    if result.rows_affected == 0 {
        return Ok(None);
    }

    find_by_id(conn, id).await
}
