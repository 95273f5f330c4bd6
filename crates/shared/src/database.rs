//! 数据库连接管理模块
//!
//! 通知存储使用的 PostgreSQL 连接池。池参数全部来自配置，
//! 服务启动时建立一次，再克隆给各仓储共享。

use crate::config::DatabaseConfig;
use crate::error::{NotifyError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 按配置建立连接池
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Database connection pool created"
        );

        Ok(Self { pool })
    }

    /// 连接池引用，仓储构造时克隆
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 启动时的连通性探测
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(NotifyError::from)
    }

    /// 关闭连接池，等待在途查询结束
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}
