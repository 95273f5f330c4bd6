//! 邮件渠道

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::NotificationChannel;
use crate::models::{ChannelType, Notification};
use crate::provider::Provider;
use crate::repository::EndpointRepositoryTrait;
use notify_shared::error::{NotifyError, Result};

/// local@domain 形式的宽松校验
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@(.+)$").expect("邮件正则非法"));

/// 邮件渠道
pub struct EmailChannel {
    provider: Arc<dyn Provider>,
    endpoint_repo: Arc<dyn EndpointRepositoryTrait>,
}

impl EmailChannel {
    pub fn new(provider: Arc<dyn Provider>, endpoint_repo: Arc<dyn EndpointRepositoryTrait>) -> Self {
        Self {
            provider,
            endpoint_repo,
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn supported_channel(&self) -> ChannelType {
        ChannelType::Email
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let endpoint = self
            .endpoint_repo
            .find_by_user_and_channel(notification.user_id, ChannelType::Email)
            .await?
            .ok_or(NotifyError::EndpointMissing {
                user_id: notification.user_id,
                channel: ChannelType::Email.to_string(),
            })?;

        self.provider
            .send(&endpoint.endpoint_value, &notification.payload)
            .await
    }

    fn validate_endpoint(&self, endpoint_value: &str) -> Result<()> {
        if !EMAIL_RE.is_match(endpoint_value) {
            return Err(NotifyError::Validation(format!(
                "邮箱格式不合法: {endpoint_value}"
            )));
        }
        Ok(())
    }
}
