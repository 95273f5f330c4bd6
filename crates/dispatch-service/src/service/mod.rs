//! 通知接入服务
//!
//! 面向调用方的薄接口：创建单条 / 批量通知、按 id 查询、按用户分页列表、
//! 注册渠道终端。创建路径上执行资格校验（用户存在、终端已配置、
//! 偏好未关闭），并从重试配置解析 max_retries 固化到记录。

pub mod dto;

use std::sync::Arc;

use tracing::info;

use crate::channel::ChannelRegistry;
use crate::models::{ChannelEndpoint, ChannelType, Notification, NotificationStatus};
use crate::repository::{
    EndpointRepositoryTrait, NotificationRepositoryTrait, PreferenceGate, UserRepositoryTrait,
};
use crate::retry::RetryProperties;
use dto::{
    BulkItemResult, BulkNotificationResponse, CreateNotificationRequest, NotificationResponse,
    PagedResponse,
};
use notify_shared::error::{NotifyError, Result};

/// 循环间隔上限（一年，按 366 天计）。
/// 超出该值的间隔在排期时间运算上没有意义，且会让时间加法溢出。
const MAX_RECURRENCE_INTERVAL_MINUTES: i64 = 366 * 24 * 60;

/// 通知接入服务
pub struct NotificationService {
    notification_repo: Arc<dyn NotificationRepositoryTrait>,
    user_repo: Arc<dyn UserRepositoryTrait>,
    endpoint_repo: Arc<dyn EndpointRepositoryTrait>,
    preference_gate: Arc<dyn PreferenceGate>,
    registry: Arc<ChannelRegistry>,
    retry: RetryProperties,
    max_bulk_size: usize,
}

impl NotificationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        notification_repo: Arc<dyn NotificationRepositoryTrait>,
        user_repo: Arc<dyn UserRepositoryTrait>,
        endpoint_repo: Arc<dyn EndpointRepositoryTrait>,
        preference_gate: Arc<dyn PreferenceGate>,
        registry: Arc<ChannelRegistry>,
        retry: RetryProperties,
        max_bulk_size: usize,
    ) -> Self {
        Self {
            notification_repo,
            user_repo,
            endpoint_repo,
            preference_gate,
            registry,
            retry,
            max_bulk_size,
        }
    }

    /// 创建单条通知
    pub async fn create_notification(
        &self,
        request: CreateNotificationRequest,
    ) -> Result<NotificationResponse> {
        info!(
            user_id = request.user_id,
            channel = %request.channel_type,
            "创建通知"
        );

        Self::validate_request(&request)?;
        self.check_eligibility(request.user_id, request.channel_type)
            .await?;

        let notification = self.build_notification(&request);
        let saved = self.notification_repo.create(&notification).await?;

        info!(notification_id = saved.id, "通知创建成功");

        Ok(NotificationResponse::from(&saved))
    }

    /// 批量创建通知
    ///
    /// 逐条校验，把合法条目作为一次批量写入持久化；
    /// 不合法的条目带错误信息返回，不影响其余条目。
    pub async fn create_bulk_notifications(
        &self,
        requests: Vec<CreateNotificationRequest>,
    ) -> Result<BulkNotificationResponse> {
        if requests.is_empty() {
            return Err(NotifyError::Validation("批量请求不能为空".to_string()));
        }

        if requests.len() > self.max_bulk_size {
            return Err(NotifyError::Validation(format!(
                "批量请求超过单批上限 {}",
                self.max_bulk_size
            )));
        }

        info!(size = requests.len(), "处理批量创建请求");

        let total_requested = requests.len();
        let mut valid = Vec::new();
        let mut rejected = Vec::new();

        // 校验阶段：逐条资格检查，失败的收集错误信息
        for request in &requests {
            let check = async {
                Self::validate_request(request)?;
                self.check_eligibility(request.user_id, request.channel_type)
                    .await
            };

            match check.await {
                Ok(()) => valid.push(self.build_notification(request)),
                Err(e) => rejected.push(BulkItemResult {
                    user_id: request.user_id,
                    channel_type: request.channel_type,
                    notification_id: None,
                    error: Some(e.to_string()),
                }),
            }
        }

        // 持久化阶段：全部合法条目作为一次批量写入
        let saved = if valid.is_empty() {
            vec![]
        } else {
            self.notification_repo.create_batch(&valid).await?
        };

        let accepted: Vec<BulkItemResult> = saved
            .iter()
            .map(|n| BulkItemResult {
                user_id: n.user_id,
                channel_type: n.channel_type,
                notification_id: Some(n.id),
                error: None,
            })
            .collect();

        info!(
            accepted = accepted.len(),
            rejected = rejected.len(),
            "批量创建完成"
        );

        Ok(BulkNotificationResponse {
            total_requested,
            total_accepted: accepted.len(),
            total_rejected: rejected.len(),
            accepted,
            rejected,
        })
    }

    /// 按 id 查询通知
    pub async fn get_notification(&self, id: i64) -> Result<NotificationResponse> {
        let notification = self
            .notification_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| NotifyError::NotFound {
                entity: "Notification".to_string(),
                id: id.to_string(),
            })?;

        Ok(NotificationResponse::from(&notification))
    }

    /// 按用户分页查询，可选状态过滤
    pub async fn list_notifications_by_user(
        &self,
        user_id: i64,
        status: Option<NotificationStatus>,
        page: i64,
        size: i64,
    ) -> Result<PagedResponse<NotificationResponse>> {
        if !self.user_repo.exists(user_id).await? {
            return Err(NotifyError::NotFound {
                entity: "User".to_string(),
                id: user_id.to_string(),
            });
        }

        let notifications = self
            .notification_repo
            .list_by_user(user_id, status, page, size)
            .await?;
        let total = self.notification_repo.count_by_user(user_id, status).await?;

        let content = notifications.iter().map(NotificationResponse::from).collect();

        Ok(PagedResponse::new(content, page, size, total))
    }

    /// 注册或更新用户的渠道终端
    ///
    /// 终端格式由对应渠道的规则校验；渠道未注册时直接向调用方报错。
    pub async fn register_endpoint(
        &self,
        user_id: i64,
        channel_type: ChannelType,
        endpoint_value: &str,
    ) -> Result<ChannelEndpoint> {
        if !self.user_repo.exists(user_id).await? {
            return Err(NotifyError::NotFound {
                entity: "User".to_string(),
                id: user_id.to_string(),
            });
        }

        let channel = self.registry.resolve(channel_type)?;
        channel.validate_endpoint(endpoint_value)?;

        let endpoint = self
            .endpoint_repo
            .upsert(user_id, channel_type, endpoint_value)
            .await?;

        info!(user_id, channel = %channel_type, "渠道终端已注册");

        Ok(endpoint)
    }

    /// 请求本身的静态校验
    fn validate_request(request: &CreateNotificationRequest) -> Result<()> {
        if request.payload.trim().is_empty() {
            return Err(NotifyError::Validation("payload 不能为空".to_string()));
        }

        if let Some(interval) = request.recurrence_interval_minutes
            && !(1..=MAX_RECURRENCE_INTERVAL_MINUTES).contains(&interval)
        {
            return Err(NotifyError::Validation(format!(
                "循环间隔必须在 1 到 {MAX_RECURRENCE_INTERVAL_MINUTES} 分钟之间"
            )));
        }

        Ok(())
    }

    /// 创建路径上的资格校验：用户存在、终端已配置、偏好未关闭
    async fn check_eligibility(&self, user_id: i64, channel_type: ChannelType) -> Result<()> {
        if !self.user_repo.exists(user_id).await? {
            return Err(NotifyError::NotFound {
                entity: "User".to_string(),
                id: user_id.to_string(),
            });
        }

        if self
            .endpoint_repo
            .find_by_user_and_channel(user_id, channel_type)
            .await?
            .is_none()
        {
            return Err(NotifyError::Validation(format!(
                "用户未配置该渠道的终端: channel={channel_type}"
            )));
        }

        self.preference_gate
            .validate_channel_enabled(user_id, channel_type)
            .await
    }

    /// 由请求构造待持久化的通知，max_retries 在此刻固化
    fn build_notification(&self, request: &CreateNotificationRequest) -> Notification {
        Notification::build(
            request.user_id,
            request.channel_type,
            request.payload.clone(),
            request.priority,
            request.scheduled_at,
            request.recurrence_interval_minutes,
            self.retry.max_retries_for(request.channel_type),
        )
    }
}
