//! APP 推送渠道

use std::sync::Arc;

use async_trait::async_trait;

use super::NotificationChannel;
use crate::models::{ChannelType, Notification};
use crate::provider::Provider;
use crate::repository::EndpointRepositoryTrait;
use notify_shared::error::{NotifyError, Result};

/// 设备 token 的最小长度
const MIN_TOKEN_LEN: usize = 10;

/// APP 推送渠道
pub struct PushChannel {
    provider: Arc<dyn Provider>,
    endpoint_repo: Arc<dyn EndpointRepositoryTrait>,
}

impl PushChannel {
    pub fn new(provider: Arc<dyn Provider>, endpoint_repo: Arc<dyn EndpointRepositoryTrait>) -> Self {
        Self {
            provider,
            endpoint_repo,
        }
    }
}

#[async_trait]
impl NotificationChannel for PushChannel {
    fn supported_channel(&self) -> ChannelType {
        ChannelType::Push
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let endpoint = self
            .endpoint_repo
            .find_by_user_and_channel(notification.user_id, ChannelType::Push)
            .await?
            .ok_or(NotifyError::EndpointMissing {
                user_id: notification.user_id,
                channel: ChannelType::Push.to_string(),
            })?;

        self.provider
            .send(&endpoint.endpoint_value, &notification.payload)
            .await
    }

    fn validate_endpoint(&self, endpoint_value: &str) -> Result<()> {
        if endpoint_value.len() < MIN_TOKEN_LEN {
            return Err(NotifyError::Validation(format!(
                "设备 token 过短: {endpoint_value}"
            )));
        }
        Ok(())
    }
}
