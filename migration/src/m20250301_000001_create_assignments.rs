use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建作业表
        manager
            .create_table(
                Table::create()
                    .table(Assignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assignments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Assignments::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Assignments::TeacherId).big_integer().null())
                    .col(ColumnDef::new(Assignments::Content).text().null())
                    .col(ColumnDef::new(Assignments::Grade).string().null())
                    .col(ColumnDef::new(Assignments::State).string().not_null())
                    .col(
                        ColumnDef::new(Assignments::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assignments::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 学生 / 教师二级索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_assignments_student_id")
                    .table(Assignments::Table)
                    .col(Assignments::StudentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_assignments_teacher_id")
                    .table(Assignments::Table)
                    .col(Assignments::TeacherId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Assignments::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Assignments {
    #[sea_orm(iden = "assignments")]
    Table,
    Id,
    StudentId,
    TeacherId,
    Content,
    Grade,
    State,
    CreatedAt,
    UpdatedAt,
}
