//! 通知渠道
//!
//! 通过 `NotificationChannel` trait 抽象单个投递媒介的能力集：
//! 声明支持的渠道类型、执行发送、校验终端格式。
//! `ChannelRegistry` 在启动时由全部渠道实现构建一次，按渠道类型平面查找，
//! 未注册的类型立即报错。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{ChannelType, Notification};
use notify_shared::error::{NotifyError, Result};

mod email;
mod push;
mod sms;

pub use email::EmailChannel;
pub use push::PushChannel;
pub use sms::SmsChannel;

/// 通知渠道 trait
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// 该实现支持的渠道类型
    fn supported_channel(&self) -> ChannelType;

    /// 从终端协作方取得目的地并执行发送。
    /// 终端缺失与服务商拒绝同样以错误返回，由调度器走失败路径。
    async fn send(&self, notification: &Notification) -> Result<()>;

    /// 校验终端格式，同步且无副作用，格式不符返回 Validation 错误
    fn validate_endpoint(&self, endpoint_value: &str) -> Result<()>;
}

/// 渠道注册表
///
/// 构建后不可变；resolve 失败说明部署缺少对应渠道实现。
pub struct ChannelRegistry {
    channels: HashMap<ChannelType, Arc<dyn NotificationChannel>>,
}

impl ChannelRegistry {
    /// 由全部可用渠道实现构建，按 supported_channel 归并为查找表
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        let channels = channels
            .into_iter()
            .map(|c| (c.supported_channel(), c))
            .collect();

        Self { channels }
    }

    /// 解析渠道类型对应的实现
    pub fn resolve(&self, channel_type: ChannelType) -> Result<Arc<dyn NotificationChannel>> {
        self.channels
            .get(&channel_type)
            .cloned()
            .ok_or_else(|| NotifyError::UnsupportedChannel {
                channel: channel_type.to_string(),
            })
    }
}
