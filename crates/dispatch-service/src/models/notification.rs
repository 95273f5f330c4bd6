//! 通知记录模型
//!
//! Notification 是调度引擎的工作单元，状态字段只由调度器写入。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ChannelType, NotificationPriority, NotificationStatus};

/// 通知记录
///
/// created_at / updated_at 由存储层在写入时设置和刷新，
/// 内存中构造的值仅为占位。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub channel_type: ChannelType,
    pub payload: String,
    pub content_type: String,
    pub priority: NotificationPriority,
    /// 优先级数值投影，持久化以便排序下推到查询
    pub priority_weight: i32,
    pub status: NotificationStatus,
    /// 首次可调度时间，创建时被钳制为不早于当前时间
    pub scheduled_at: DateTime<Utc>,
    /// 循环间隔（分钟）。有值时成功发送后重新排期而非终结
    pub recurrence_interval_minutes: Option<i64>,
    /// 已失败的尝试次数，只在失败迁移时递增，循环排期时清零
    pub retry_count: i32,
    /// 创建时从重试配置解析，此后不再变化
    pub max_retries: i32,
    /// 下次重试时间，当且仅当 status = FAILED 时非空
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// 构造一条新的待持久化通知
    ///
    /// scheduled_at 为空或早于当前时间时钳制为当前时间；
    /// max_retries 由调用方在创建时从重试配置解析传入。
    pub fn build(
        user_id: i64,
        channel_type: ChannelType,
        payload: String,
        priority: NotificationPriority,
        scheduled_at: Option<DateTime<Utc>>,
        recurrence_interval_minutes: Option<i64>,
        max_retries: i32,
    ) -> Self {
        let now = Utc::now();
        let scheduled_at = match scheduled_at {
            Some(t) if t > now => t,
            _ => now,
        };

        Self {
            id: 0,
            user_id,
            channel_type,
            payload,
            content_type: "text/plain".to_string(),
            priority,
            priority_weight: priority.weight(),
            status: NotificationStatus::Created,
            scheduled_at,
            recurrence_interval_minutes,
            retry_count: 0,
            max_retries,
            next_retry_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 用户渠道终端
///
/// (user_id, channel_type) 到投递目的地的映射，
/// 写入时由对应渠道的格式规则校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChannelEndpoint {
    pub id: i64,
    pub user_id: i64,
    pub channel_type: ChannelType,
    pub endpoint_value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
