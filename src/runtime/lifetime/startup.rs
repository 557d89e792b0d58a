use crate::config::AppConfig;
use crate::errors::Result;
use crate::storage::{Storage, create_storage};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct StartupContext {
    pub storage: Arc<dyn Storage>,
}

/// 准备服务器启动的上下文
/// 连接数据库并完成迁移
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let config = AppConfig::get();

    debug!(
        "Connecting storage (pool_size: {}, timeout: {}s)",
        config.database.pool_size, config.database.timeout
    );

    let storage = create_storage(&config.database).await?;
    warn!("Storage backend initialized and migrations completed");

    Ok(StartupContext { storage })
}
