//! 接入层 DTO
//!
//! 创建请求与响应的数据结构，JSON 采用 camelCase 命名。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChannelType, Notification, NotificationPriority, NotificationStatus};

/// 创建通知请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: i64,
    pub channel_type: ChannelType,
    pub payload: String,
    pub priority: NotificationPriority,
    /// 可选的首次发送时间，缺省或早于当前时间时立即可调度
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// 循环间隔（分钟），必须为正数
    #[serde(default)]
    pub recurrence_interval_minutes: Option<i64>,
}

/// 通知响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub notification_id: i64,
    pub status: NotificationStatus,
}

impl From<&Notification> for NotificationResponse {
    fn from(notification: &Notification) -> Self {
        Self {
            notification_id: notification.id,
            status: notification.status,
        }
    }
}

/// 批量创建中单个条目的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemResult {
    pub user_id: i64,
    pub channel_type: ChannelType,
    /// 仅接受的条目有值
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<i64>,
    /// 仅拒绝的条目有值
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 批量创建响应
///
/// 按条目切分接受与拒绝，单条不合法不会导致整批失败。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkNotificationResponse {
    pub total_requested: usize,
    pub total_accepted: usize,
    pub total_rejected: usize,
    pub accepted: Vec<BulkItemResult>,
    pub rejected: Vec<BulkItemResult>,
}

/// 分页响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub first: bool,
    pub last: bool,
}

impl<T> PagedResponse<T> {
    pub fn new(content: Vec<T>, page: i64, size: i64, total_elements: i64) -> Self {
        let total_pages = if size > 0 {
            (total_elements + size - 1) / size
        } else {
            0
        };

        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
            first: page == 0,
            last: page + 1 >= total_pages,
        }
    }
}
