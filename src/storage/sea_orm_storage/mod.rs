//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod assignments;

use crate::config::DatabaseConfig;
use crate::errors::{AssignFlowError, Result};
use crate::models::assignments::{
    entities::{Assignment, AssignmentState, Grade},
    requests::AssignmentDraft,
};
use crate::storage::{Storage, StorageTransaction};
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, TransactionTrait,
};
use std::time::Duration;
use tracing::{debug, info};

/// SQLite 的 BEGIN 是延迟事务：先读后写的两个事务会在写入时互相冲突
/// (SQLITE_BUSY_SNAPSHOT)。事务开始后立即执行一条不影响任何行的写语句，
/// 提前取得写锁，与 BEGIN IMMEDIATE 等价；并发写事务在 busy_timeout 内排队，
/// 拿到锁后读到的总是最新提交的状态。
const SQLITE_ACQUIRE_WRITE_LOCK: &str =
    "UPDATE assignments SET updated_at = updated_at WHERE 0";

/// 等待写锁的上限
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例并运行迁移
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db_url = Self::build_database_url(&config.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite:") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| AssignFlowError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化；内存库保持单连接常驻）
    async fn connect_sqlite(url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let in_memory = url.contains(":memory:");

        let mut opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| AssignFlowError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .busy_timeout(SQLITE_BUSY_TIMEOUT)
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory");

        if !in_memory {
            opt = opt
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .pragma("wal_autocheckpoint", "1000");
        }

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.pool_size.max(1))
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.timeout));

        pool_options = if in_memory {
            // 连接全部关闭时内存库即被销毁
            pool_options.idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.idle_timeout(Duration::from_secs(300))
        };

        let pool = pool_options.connect_with(opt).await.map_err(|e| {
            AssignFlowError::database_connection(format!("SQLite 连接失败: {e}"))
        })?;

        debug!("SQLite pool ready (in_memory: {})", in_memory);

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.pool_size)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.timeout))
            .acquire_timeout(Duration::from_secs(config.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| AssignFlowError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url == ":memory:" || url == "sqlite::memory:" {
            Ok("sqlite::memory:".to_string())
        } else if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(AssignFlowError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

/// SeaORM 事务，实现工作单元
pub struct SeaOrmTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl Storage for SeaOrmStorage {
    async fn list_assignments_by_student(&self, student_id: i64) -> Result<Vec<Assignment>> {
        assignments::list_by_student(&self.db, student_id).await
    }

    async fn list_assignments_by_teacher(&self, teacher_id: i64) -> Result<Vec<Assignment>> {
        assignments::list_by_teacher(&self.db, teacher_id).await
    }

    async fn begin(&self) -> Result<Box<dyn StorageTransaction>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AssignFlowError::database_operation(format!("开启事务失败: {e}")))?;

        if txn.get_database_backend() == DatabaseBackend::Sqlite {
            txn.execute_unprepared(SQLITE_ACQUIRE_WRITE_LOCK)
                .await
                .map_err(|e| AssignFlowError::database_operation(format!("获取写锁失败: {e}")))?;
        }

        Ok(Box::new(SeaOrmTransaction { txn }))
    }
}

#[async_trait]
impl StorageTransaction for SeaOrmTransaction {
    async fn get_assignment_by_id(&self, id: i64) -> Result<Option<Assignment>> {
        assignments::find_by_id(&self.txn, id).await
    }

    async fn get_student_assignment(
        &self,
        id: i64,
        student_id: i64,
    ) -> Result<Option<Assignment>> {
        assignments::find_by_id_and_student(&self.txn, id, student_id).await
    }

    async fn upsert_assignment(&self, draft: AssignmentDraft) -> Result<Option<Assignment>> {
        assignments::upsert(&self.txn, draft).await
    }

    async fn submit_assignment(
        &self,
        id: i64,
        student_id: i64,
        teacher_id: i64,
    ) -> Result<Option<Assignment>> {
        assignments::mark_submitted(&self.txn, id, student_id, teacher_id).await
    }

    async fn grade_assignment(
        &self,
        id: i64,
        teacher_id: i64,
        grade: Grade,
    ) -> Result<Option<Assignment>> {
        assignments::set_grade(&self.txn, id, teacher_id, AssignmentState::Submitted, grade).await
    }

    async fn regrade_assignment(
        &self,
        id: i64,
        teacher_id: i64,
        grade: Grade,
    ) -> Result<Option<Assignment>> {
        assignments::set_grade(&self.txn, id, teacher_id, AssignmentState::Graded, grade).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.txn
            .commit()
            .await
            .map_err(|e| AssignFlowError::database_operation(format!("提交事务失败: {e}")))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.txn
            .rollback()
            .await
            .map_err(|e| AssignFlowError::database_operation(format!("回滚事务失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_database_url() {
        assert_eq!(
            SeaOrmStorage::build_database_url(":memory:").unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url("data/app.db").unwrap(),
            "sqlite://data/app.db?mode=rwc"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url("postgres://u:p@localhost/db").unwrap(),
            "postgres://u:p@localhost/db"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url("redis://localhost")
                .unwrap_err()
                .code(),
            "E001"
        );
    }
}
