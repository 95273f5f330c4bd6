//! 通知调度枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 通知渠道类型
///
/// 开放集合：新增渠道时补充枚举值并注册对应的 Channel 实现即可
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelType {
    /// 邮件
    Email,
    /// 短信
    Sms,
    /// APP 推送
    Push,
}

impl ChannelType {
    /// 渠道名（与序列化形式一致，用于日志和错误信息）
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Sms => "SMS",
            Self::Push => "PUSH",
        }
    }

    /// 配置键（小写，用于重试配置的按渠道覆盖）
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通知优先级
///
/// 仅用于轮询批次内的排序，数值投影见 weight()
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    High,
    Medium,
    Low,
}

impl NotificationPriority {
    /// 优先级的数值投影，轮询器按该值降序选取
    pub fn weight(&self) -> i32 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

/// 通知状态
///
/// 状态只沿以下路径迁移，且只有调度器可以写入：
/// CREATED -> PROCESSING -> { SENT | CREATED（循环通知） | FAILED | DEAD_LETTER }
/// FAILED -> PROCESSING（重试）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    /// 已创建 - 等待首次调度（循环通知成功后也回到该状态）
    #[default]
    Created,
    /// 处理中 - 调度器已认领，发送尚未落定
    Processing,
    /// 已发送 - 终态
    Sent,
    /// 发送失败 - 等待重试
    Failed,
    /// 死信 - 重试耗尽的终态，保留记录供人工排查
    DeadLetter,
}
