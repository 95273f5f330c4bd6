//! 渠道终端存储
//!
//! (user_id, channel_type) -> 投递目的地 映射的数据访问

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::EndpointRepositoryTrait;
use crate::models::{ChannelEndpoint, ChannelType};
use notify_shared::error::Result;

/// 渠道终端存储
pub struct EndpointRepository {
    pool: PgPool,
}

impl EndpointRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EndpointRepositoryTrait for EndpointRepository {
    async fn find_by_user_and_channel(
        &self,
        user_id: i64,
        channel_type: ChannelType,
    ) -> Result<Option<ChannelEndpoint>> {
        let endpoint = sqlx::query_as::<_, ChannelEndpoint>(
            r#"
            SELECT id, user_id, channel_type, endpoint_value, created_at, updated_at
            FROM user_channel_endpoints
            WHERE user_id = $1 AND channel_type = $2
            "#,
        )
        .bind(user_id)
        .bind(channel_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(endpoint)
    }

    async fn upsert(
        &self,
        user_id: i64,
        channel_type: ChannelType,
        endpoint_value: &str,
    ) -> Result<ChannelEndpoint> {
        let endpoint = sqlx::query_as::<_, ChannelEndpoint>(
            r#"
            INSERT INTO user_channel_endpoints
                (user_id, channel_type, endpoint_value, created_at, updated_at)
            VALUES ($1, $2, $3, now(), now())
            ON CONFLICT (user_id, channel_type)
            DO UPDATE SET endpoint_value = EXCLUDED.endpoint_value, updated_at = now()
            RETURNING id, user_id, channel_type, endpoint_value, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(channel_type)
        .bind(endpoint_value)
        .fetch_one(&self.pool)
        .await?;

        Ok(endpoint)
    }
}
