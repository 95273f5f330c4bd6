//! 短信渠道

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::NotificationChannel;
use crate::models::{ChannelType, Notification};
use crate::provider::Provider;
use crate::repository::EndpointRepositoryTrait;
use notify_shared::error::{NotifyError, Result};

/// 10 到 15 位 ASCII 数字
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,15}$").expect("手机号正则非法"));

/// 短信渠道
pub struct SmsChannel {
    provider: Arc<dyn Provider>,
    endpoint_repo: Arc<dyn EndpointRepositoryTrait>,
}

impl SmsChannel {
    pub fn new(provider: Arc<dyn Provider>, endpoint_repo: Arc<dyn EndpointRepositoryTrait>) -> Self {
        Self {
            provider,
            endpoint_repo,
        }
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn supported_channel(&self) -> ChannelType {
        ChannelType::Sms
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let endpoint = self
            .endpoint_repo
            .find_by_user_and_channel(notification.user_id, ChannelType::Sms)
            .await?
            .ok_or(NotifyError::EndpointMissing {
                user_id: notification.user_id,
                channel: ChannelType::Sms.to_string(),
            })?;

        self.provider
            .send(&endpoint.endpoint_value, &notification.payload)
            .await
    }

    fn validate_endpoint(&self, endpoint_value: &str) -> Result<()> {
        if !PHONE_RE.is_match(endpoint_value) {
            return Err(NotifyError::Validation(format!(
                "手机号格式不合法: {endpoint_value}"
            )));
        }
        Ok(())
    }
}
