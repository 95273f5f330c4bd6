//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层和调度器依赖抽象而非具体实现，支持 mock 测试。
//! NotificationRepositoryTrait 是调度引擎的通知存储，
//! 其余为终端、用户和偏好三个外部协作方。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{ChannelEndpoint, ChannelType, Notification, NotificationStatus};
use notify_shared::error::Result;

/// 通知存储接口
///
/// 调度器是 status / retry_count / next_retry_at 的唯一写入方，
/// update 必须把一次状态迁移的全部字段变更作为单条原子写入落库。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    /// 持久化一条新通知，返回带存储分配 id 和审计时间戳的记录
    async fn create(&self, notification: &Notification) -> Result<Notification>;

    /// 在单个事务中批量持久化，任何一条失败则整体回滚
    async fn create_batch(&self, notifications: &[Notification]) -> Result<Vec<Notification>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>>;

    /// 整行更新（单条 UPDATE），刷新 updated_at
    async fn update(&self, notification: &Notification) -> Result<()>;

    /// 选取最多 limit 条 status = CREATED 且 scheduled_at <= now 的通知，
    /// 按 priority_weight 降序、created_at 升序
    async fn find_ready(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Notification>>;

    /// 选取最多 limit 条 status = FAILED 且 next_retry_at <= now 的通知，
    /// 排序规则与 find_ready 相同
    async fn find_retry_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Notification>>;

    /// 按用户分页查询，可选状态过滤，page 从 0 开始
    async fn list_by_user(
        &self,
        user_id: i64,
        status: Option<NotificationStatus>,
        page: i64,
        size: i64,
    ) -> Result<Vec<Notification>>;

    async fn count_by_user(&self, user_id: i64, status: Option<NotificationStatus>) -> Result<i64>;
}

/// 渠道终端存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EndpointRepositoryTrait: Send + Sync {
    async fn find_by_user_and_channel(
        &self,
        user_id: i64,
        channel_type: ChannelType,
    ) -> Result<Option<ChannelEndpoint>>;

    /// 新增或覆盖 (user_id, channel_type) 的终端
    async fn upsert(
        &self,
        user_id: i64,
        channel_type: ChannelType,
        endpoint_value: &str,
    ) -> Result<ChannelEndpoint>;
}

/// 用户存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn exists(&self, user_id: i64) -> Result<bool>;
}

/// 用户偏好闸门
///
/// 在创建路径上否决被用户关闭的渠道；没有偏好记录视为开启。
/// 只在接入时生效，调度器内部不再检查。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceGate: Send + Sync {
    /// 渠道被用户显式关闭时返回 Validation 错误
    async fn validate_channel_enabled(&self, user_id: i64, channel_type: ChannelType)
    -> Result<()>;
}
