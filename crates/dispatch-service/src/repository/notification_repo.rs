//! 通知存储
//!
//! 通知存储的 PostgreSQL 实现。轮询器的两类选取查询
//! 依赖 (status, scheduled_at) 与 (status, next_retry_at) 两个复合索引。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::traits::NotificationRepositoryTrait;
use crate::models::{Notification, NotificationStatus};
use notify_shared::error::Result;

/// 查询返回的全部列
const COLUMNS: &str = "id, user_id, channel_type, payload, content_type, priority, \
     priority_weight, status, scheduled_at, recurrence_interval_minutes, \
     retry_count, max_retries, next_retry_at, created_at, updated_at";

/// 通知存储
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn insert_sql() -> String {
        format!(
            r#"
            INSERT INTO notifications
                (user_id, channel_type, payload, content_type, priority, priority_weight,
                 status, scheduled_at, recurrence_interval_minutes, retry_count,
                 max_retries, next_retry_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now(), now())
            RETURNING {COLUMNS}
            "#
        )
    }
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<Notification> {
        let saved = sqlx::query_as::<_, Notification>(&Self::insert_sql())
            .bind(notification.user_id)
            .bind(notification.channel_type)
            .bind(&notification.payload)
            .bind(&notification.content_type)
            .bind(notification.priority)
            .bind(notification.priority_weight)
            .bind(notification.status)
            .bind(notification.scheduled_at)
            .bind(notification.recurrence_interval_minutes)
            .bind(notification.retry_count)
            .bind(notification.max_retries)
            .bind(notification.next_retry_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(saved)
    }

    async fn create_batch(&self, notifications: &[Notification]) -> Result<Vec<Notification>> {
        if notifications.is_empty() {
            return Ok(vec![]);
        }

        // 单个事务写入整批，保证批量创建对外表现为一次写入
        let mut tx = self.pool.begin().await?;
        let sql = Self::insert_sql();
        let mut saved = Vec::with_capacity(notifications.len());

        for notification in notifications {
            let row = sqlx::query_as::<_, Notification>(&sql)
                .bind(notification.user_id)
                .bind(notification.channel_type)
                .bind(&notification.payload)
                .bind(&notification.content_type)
                .bind(notification.priority)
                .bind(notification.priority_weight)
                .bind(notification.status)
                .bind(notification.scheduled_at)
                .bind(notification.recurrence_interval_minutes)
                .bind(notification.retry_count)
                .bind(notification.max_retries)
                .bind(notification.next_retry_at)
                .fetch_one(&mut *tx)
                .await?;
            saved.push(row);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM notifications
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn update(&self, notification: &Notification) -> Result<()> {
        // 一次状态迁移的全部字段变更在一条 UPDATE 中落库
        sqlx::query(
            r#"
            UPDATE notifications
            SET status = $2,
                scheduled_at = $3,
                retry_count = $4,
                next_retry_at = $5,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(notification.id)
        .bind(notification.status)
        .bind(notification.scheduled_at)
        .bind(notification.retry_count)
        .bind(notification.next_retry_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_ready(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM notifications
            WHERE status = $1 AND scheduled_at <= $2
            ORDER BY priority_weight DESC, created_at ASC
            LIMIT $3
            "#
        ))
        .bind(NotificationStatus::Created)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn find_retry_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM notifications
            WHERE status = $1 AND next_retry_at <= $2
            ORDER BY priority_weight DESC, created_at ASC
            LIMIT $3
            "#
        ))
        .bind(NotificationStatus::Failed)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        status: Option<NotificationStatus>,
        page: i64,
        size: i64,
    ) -> Result<Vec<Notification>> {
        let offset = page * size;

        let notifications = match status {
            Some(status) => {
                sqlx::query_as::<_, Notification>(&format!(
                    r#"
                    SELECT {COLUMNS}
                    FROM notifications
                    WHERE user_id = $1 AND status = $2
                    ORDER BY created_at DESC, id DESC
                    LIMIT $3 OFFSET $4
                    "#
                ))
                .bind(user_id)
                .bind(status)
                .bind(size)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Notification>(&format!(
                    r#"
                    SELECT {COLUMNS}
                    FROM notifications
                    WHERE user_id = $1
                    ORDER BY created_at DESC, id DESC
                    LIMIT $2 OFFSET $3
                    "#
                ))
                .bind(user_id)
                .bind(size)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(notifications)
    }

    async fn count_by_user(
        &self,
        user_id: i64,
        status: Option<NotificationStatus>,
    ) -> Result<i64> {
        let count: (i64,) = match status {
            Some(status) => {
                sqlx::query_as(
                    r#"
                    SELECT COUNT(*) FROM notifications
                    WHERE user_id = $1 AND status = $2
                    "#,
                )
                .bind(user_id)
                .bind(status)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT COUNT(*) FROM notifications
                    WHERE user_id = $1
                    "#,
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(count.0)
    }
}
