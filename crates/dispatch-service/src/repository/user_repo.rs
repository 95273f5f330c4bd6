//! 用户存储
//!
//! 调度引擎只需要判断用户是否存在，账户管理由外部系统负责。

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::UserRepositoryTrait;
use notify_shared::error::Result;

/// 用户存储
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn exists(&self, user_id: i64) -> Result<bool> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(row.0)
    }
}
