//! 作业实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub teacher_id: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,
    pub grade: Option<String>,
    pub state: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 转换为业务实体
    ///
    /// 库中出现无法识别的状态或成绩属于数据缺陷，直接报错而不是回退默认值。
    pub fn into_assignment(
        self,
    ) -> crate::errors::Result<crate::models::assignments::entities::Assignment> {
        use crate::errors::AssignFlowError;
        use crate::models::assignments::entities::{Assignment, AssignmentState, Grade};
        use chrono::{DateTime, Utc};

        let state = self.state.parse::<AssignmentState>().map_err(|e| {
            AssignFlowError::database_operation(format!("作业 {} 状态异常: {e}", self.id))
        })?;
        let grade = self
            .grade
            .as_deref()
            .map(str::parse::<Grade>)
            .transpose()
            .map_err(|e| {
                AssignFlowError::database_operation(format!("作业 {} 成绩异常: {e}", self.id))
            })?;

        let id = self.id;
        let timestamp = |secs: i64, column: &str| {
            DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
                AssignFlowError::database_operation(format!("作业 {id} {column} 时间戳异常: {secs}"))
            })
        };
        let created_at = timestamp(self.created_at, "created_at")?;
        let updated_at = timestamp(self.updated_at, "updated_at")?;

        Ok(Assignment {
            id,
            student_id: self.student_id,
            teacher_id: self.teacher_id,
            content: self.content,
            grade,
            state,
            created_at,
            updated_at,
        })
    }
}
