//! 用户偏好闸门
//!
//! 用户可以按渠道关闭通知。没有偏好记录视为开启，
//! 只有显式 enabled = false 才否决创建。

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::PreferenceGate;
use crate::models::ChannelType;
use notify_shared::error::{NotifyError, Result};

/// 基于 user_preferences 表的偏好闸门实现
pub struct PreferenceRepository {
    pool: PgPool,
}

impl PreferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceGate for PreferenceRepository {
    async fn validate_channel_enabled(
        &self,
        user_id: i64,
        channel_type: ChannelType,
    ) -> Result<()> {
        let enabled: Option<(bool,)> = sqlx::query_as(
            r#"
            SELECT enabled FROM user_preferences
            WHERE user_id = $1 AND channel_type = $2
            "#,
        )
        .bind(user_id)
        .bind(channel_type)
        .fetch_optional(&self.pool)
        .await?;

        match enabled {
            Some((false,)) => Err(NotifyError::Validation(format!(
                "用户已关闭该渠道: user_id={user_id} channel={channel_type}"
            ))),
            _ => Ok(()),
        }
    }
}
